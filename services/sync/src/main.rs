mod error;
mod github;
mod identity;
mod jira;
mod links;
mod orchestrator;
mod outcome;
#[cfg(test)]
mod testutil;

use praxis_config::{init_tracing, AppConfig};
use praxis_db::github::pg_repository::PgGithubRepository;
use praxis_db::identity::pg_repository::PgActorRepository;
use praxis_db::integration::pg_repository::PgIntegrationRepository;
use praxis_db::jira::pg_repository::PgJiraRepository;
use praxis_db::links::pg_repository::PgWorkLinkRepository;

use crate::github::client::{GithubClient, GithubClientConfig};
use crate::github::sync::GithubSyncer;
use crate::jira::client::{JiraClient, JiraClientConfig};
use crate::jira::sync::JiraSyncer;
use crate::links::LinkScanner;
use crate::orchestrator::Orchestrator;

#[tokio::main]
async fn main() {
    init_tracing("info");
    let _ = dotenvy::dotenv();

    let config = AppConfig::from_env().expect("failed to load config");
    tracing::info!(service = "praxis-sync", "starting");

    let pool = praxis_db::create_pool(&config.database_url)
        .await
        .expect("failed to connect to database");

    let integration_repo = PgIntegrationRepository::new(pool.clone());
    let github_repo = PgGithubRepository::new(pool.clone());
    let jira_repo = PgJiraRepository::new(pool.clone());
    let actor_repo = PgActorRepository::new(pool.clone());
    let link_repo = PgWorkLinkRepository::new(pool.clone());

    let github_client =
        GithubClient::new(GithubClientConfig::from_env()).expect("failed to create github client");
    let github_syncer = GithubSyncer::new(github_client, github_repo, actor_repo.clone());

    let jira_syncer = match JiraClientConfig::from_env() {
        Some(jira_config) => {
            let client = JiraClient::new(jira_config).expect("failed to create jira client");
            Some(JiraSyncer::new(client, jira_repo.clone(), actor_repo))
        }
        None => {
            tracing::info!("no jira credentials found, jira sync disabled");
            None
        }
    };

    let link_scanner = LinkScanner::new(jira_repo, link_repo);

    let orchestrator = Orchestrator::new(
        integration_repo,
        github_syncer,
        jira_syncer,
        link_scanner,
        config.sync_interval_secs,
    );

    if config.run_once {
        let succeeded = orchestrator.tick().await;
        tracing::info!(succeeded, "single sync pass finished");
        return;
    }

    tracing::info!(
        interval_secs = config.sync_interval_secs,
        "orchestrator loop starting"
    );
    tokio::select! {
        _ = orchestrator.run() => {}
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("shutting down");
        }
    }
}
