use std::time::Duration;

use uuid::Uuid;

use praxis_db::github::repositories::GithubRepository;
use praxis_db::identity::repositories::ActorRepository;
use praxis_db::integration::models::Integration;
use praxis_db::integration::repositories::IntegrationRepository;
use praxis_db::jira::repositories::JiraRepository;
use praxis_db::links::repositories::WorkLinkRepository;

use crate::error::SyncError;
use crate::github::sync::GithubSyncer;
use crate::jira::sync::JiraSyncer;
use crate::links::LinkScanner;
use crate::outcome::IntegrationOutcome;

/// How long a `pending` marker may sit before another run may assume the
/// holder crashed and take the integration over.
const STALE_LOCK_SECS: i64 = 900;

/// Drives synchronization across all eligible integrations on a fixed
/// interval. Each integration is synced independently (one failing never
/// aborts the others) and every attempt ends with a terminal status
/// (`success`/`error` + message) on the integration row.
///
/// This is the only component that initiates syncs on its own; manual
/// "sync now" triggers call [`Orchestrator::sync_integration`] and get
/// identical semantics, including the per-integration serialization lock.
pub struct Orchestrator<I, G, J, A, W> {
    integration_repo: I,
    github_syncer: GithubSyncer<G, A>,
    /// Absent when no Jira credentials are configured; integrations with a
    /// Jira link are then skipped with a warning.
    jira_syncer: Option<JiraSyncer<J, A>>,
    link_scanner: LinkScanner<J, W>,
    interval_secs: u64,
}

impl<I, G, J, A, W> Orchestrator<I, G, J, A, W>
where
    I: IntegrationRepository,
    G: GithubRepository,
    J: JiraRepository,
    A: ActorRepository,
    W: WorkLinkRepository,
{
    pub fn new(
        integration_repo: I,
        github_syncer: GithubSyncer<G, A>,
        jira_syncer: Option<JiraSyncer<J, A>>,
        link_scanner: LinkScanner<J, W>,
        interval_secs: u64,
    ) -> Self {
        Self {
            integration_repo,
            github_syncer,
            jira_syncer,
            link_scanner,
            interval_secs,
        }
    }

    /// Resident loop: one tick per interval, forever.
    pub async fn run(&self) {
        let mut ticker = tokio::time::interval(Duration::from_secs(self.interval_secs));
        loop {
            ticker.tick().await;
            self.tick().await;
        }
    }

    /// One pass over every syncable integration. Returns how many synced
    /// successfully.
    pub async fn tick(&self) -> usize {
        let integrations = match self.integration_repo.list_syncable().await {
            Ok(list) => list,
            Err(e) => {
                tracing::error!(error = %e, "failed to enumerate integrations");
                return 0;
            }
        };

        tracing::info!(count = integrations.len(), "sync tick started");

        let mut succeeded = 0usize;
        for integration in &integrations {
            match self.sync_integration(integration.id).await {
                Ok(Some(outcome)) => {
                    succeeded += 1;
                    tracing::info!(
                        integration = %integration.id,
                        commits = outcome.commits_inserted,
                        prs_created = outcome.prs_created,
                        prs_updated = outcome.prs_updated,
                        issues_created = outcome.issues_created,
                        issues_updated = outcome.issues_updated,
                        links = outcome.links_recorded,
                        "integration sync completed"
                    );
                }
                Ok(None) => {
                    // Lock held elsewhere; nothing to record.
                }
                Err(e) => {
                    tracing::error!(
                        integration = %integration.id,
                        error = %e,
                        "integration sync failed"
                    );
                }
            }
        }

        tracing::info!(succeeded, total = integrations.len(), "sync tick finished");
        succeeded
    }

    /// Sync one integration end to end, recording the terminal status on
    /// its row. Returns `Ok(None)` when another sync already holds the
    /// integration's lock.
    pub async fn sync_integration(
        &self,
        id: Uuid,
    ) -> Result<Option<IntegrationOutcome>, SyncError> {
        let integration = match self
            .integration_repo
            .begin_sync(id, STALE_LOCK_SECS)
            .await?
        {
            Some(integration) => integration,
            None => {
                tracing::info!(integration = %id, "sync already in flight, skipping");
                return Ok(None);
            }
        };

        match self.run_sync(&integration).await {
            Ok(outcome) => {
                self.integration_repo.mark_success(id).await?;
                Ok(Some(outcome))
            }
            Err(e) => {
                if let Err(mark_err) = self
                    .integration_repo
                    .mark_error(id, &e.to_string())
                    .await
                {
                    tracing::error!(
                        integration = %id,
                        error = %mark_err,
                        "failed to record sync failure"
                    );
                }
                Err(e)
            }
        }
    }

    async fn run_sync(&self, integration: &Integration) -> Result<IntegrationOutcome, SyncError> {
        let mut outcome = IntegrationOutcome::default();

        // Issues first so fresh keys are visible to link detection.
        if let Some(jira_project_id) = integration.jira_project_id {
            match &self.jira_syncer {
                Some(syncer) => {
                    let issues = syncer
                        .sync_issues_by_id(jira_project_id, integration.last_synced_at)
                        .await?;
                    if let Some(reason) = &issues.skipped {
                        tracing::warn!(
                            integration = %integration.id,
                            reason = %reason,
                            "jira issue sync skipped"
                        );
                    }
                    outcome.issues_created = issues.created.len();
                    outcome.issues_updated = issues.updated.len();
                }
                None => {
                    tracing::warn!(
                        integration = %integration.id,
                        "integration has a jira project but no jira credentials are configured"
                    );
                }
            }
        }

        if let Some(repository_id) = integration.repository_id {
            let repo_outcome = self
                .github_syncer
                .sync_repository_by_id(repository_id, integration.last_synced_at)
                .await?;
            if let Some(reason) = &repo_outcome.skipped {
                tracing::warn!(
                    integration = %integration.id,
                    reason = %reason,
                    "github repository sync skipped"
                );
            }

            outcome.commits_inserted = repo_outcome.commits.inserted.len();
            outcome.commits_skipped = repo_outcome.commits.skipped;
            outcome.prs_created = repo_outcome.pull_requests.created.len();
            outcome.prs_updated = repo_outcome.pull_requests.updated.len();

            // Link detection over exactly what this run touched.
            outcome.links_recorded += self
                .link_scanner
                .scan_commits(repository_id, &repo_outcome.commits.inserted)
                .await?;
            outcome.links_recorded += self
                .link_scanner
                .scan_pull_requests(repository_id, &repo_outcome.pull_requests.created)
                .await?;
            outcome.links_recorded += self
                .link_scanner
                .scan_pull_requests(repository_id, &repo_outcome.pull_requests.updated)
                .await?;
        }

        Ok(outcome)
    }
}
