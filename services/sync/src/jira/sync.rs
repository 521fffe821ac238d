use chrono::{DateTime, Utc};
use uuid::Uuid;

use praxis_common::error::PraxisError;
use praxis_db::identity::models::{ActorKind, Provider};
use praxis_db::identity::repositories::ActorRepository;
use praxis_db::jira::models::{JiraIssue, JiraProject};
use praxis_db::jira::repositories::JiraRepository;

use super::client::{site_url_problem, JiraClient};
use super::models::{ApiAccountRef, ApiIssue};
use super::query::build_issue_sync_jql;
use crate::error::SyncError;
use crate::identity::IdentityResolver;
use crate::outcome::IssueSyncOutcome;

pub struct JiraSyncer<J, A> {
    client: JiraClient,
    jira_repo: J,
    actor_repo: A,
}

fn api_issue_to_db(jira_project_id: Uuid, issue: &ApiIssue) -> JiraIssue {
    let now = Utc::now();
    let f = &issue.fields;
    JiraIssue {
        id: Uuid::new_v4(),
        jira_project_id,
        issue_key: issue.key.clone(),
        summary: f.summary.clone(),
        issue_type: f.issuetype.as_ref().map(|t| t.name.clone()),
        status: f.status.name.clone(),
        priority: f.priority.as_ref().map(|p| p.name.clone()),
        assignee_account_id: f.assignee.as_ref().map(|a| a.account_id.clone()),
        reporter_account_id: f.reporter.as_ref().map(|r| r.account_id.clone()),
        created_at_jira: f.created,
        updated_at_jira: f.updated,
        created_at: now,
        updated_at: now,
    }
}

/// Carry the mutable provider fields onto an existing record; the issue
/// key and surrogate id never change.
fn apply_issue_update(existing: &JiraIssue, issue: &ApiIssue) -> JiraIssue {
    let f = &issue.fields;
    JiraIssue {
        summary: f.summary.clone(),
        issue_type: f.issuetype.as_ref().map(|t| t.name.clone()),
        status: f.status.name.clone(),
        priority: f.priority.as_ref().map(|p| p.name.clone()),
        assignee_account_id: f.assignee.as_ref().map(|a| a.account_id.clone()),
        reporter_account_id: f.reporter.as_ref().map(|r| r.account_id.clone()),
        created_at_jira: f.created,
        updated_at_jira: f.updated,
        updated_at: Utc::now(),
        ..existing.clone()
    }
}

impl<J, A> JiraSyncer<J, A>
where
    J: JiraRepository,
    A: ActorRepository,
{
    pub fn new(client: JiraClient, jira_repo: J, actor_repo: A) -> Self {
        Self {
            client,
            jira_repo,
            actor_repo,
        }
    }

    async fn resolve_account(
        resolver: &mut IdentityResolver<'_, A>,
        account: &ApiAccountRef,
    ) -> Result<Uuid, PraxisError> {
        let kind = if account.is_service_account() {
            ActorKind::Bot
        } else {
            ActorKind::Human
        };
        let login = account
            .display_name
            .as_deref()
            .unwrap_or(&account.account_id);
        resolver
            .ensure_actor(
                Provider::Jira,
                &account.account_id,
                login,
                account.display_name.as_deref(),
                kind,
            )
            .await
    }

    pub async fn sync_issues_by_id(
        &self,
        jira_project_id: Uuid,
        updated_after: Option<DateTime<Utc>>,
    ) -> Result<IssueSyncOutcome, SyncError> {
        let project = self
            .jira_repo
            .get_project(jira_project_id)
            .await?
            .ok_or_else(|| {
                SyncError::Store(PraxisError::NotFound(format!(
                    "jira project {jira_project_id}"
                )))
            })?;
        self.sync_issues(&project, updated_after).await
    }

    /// Sync a project's issues: site-URL precheck, project probe, JQL
    /// search bounded by `updated_after`, then upsert by issue key.
    ///
    /// Misconfigured site URLs and HTTP-level provider failures are
    /// absorbed (warn + clean return, zero writes); network-level failures
    /// propagate so the integration is marked failed.
    pub async fn sync_issues(
        &self,
        project: &JiraProject,
        updated_after: Option<DateTime<Utc>>,
    ) -> Result<IssueSyncOutcome, SyncError> {
        if let Some(problem) = site_url_problem(&project.site_url) {
            tracing::warn!(
                project = %project.key,
                site_url = %project.site_url,
                problem = %problem,
                "jira site url looks misconfigured, skipping sync"
            );
            return Ok(IssueSyncOutcome::skipped(problem));
        }

        match self
            .client
            .validate_project(&project.site_url, &project.key)
            .await
        {
            Ok(true) => {}
            Ok(false) => {
                tracing::warn!(
                    project = %project.key,
                    "jira project not found or not accessible, skipping sync"
                );
                return Ok(IssueSyncOutcome::skipped("project not accessible"));
            }
            Err(e) if e.is_network() => {
                tracing::error!(
                    project = %project.key,
                    site_url = %project.site_url,
                    error = %e,
                    "network failure reaching jira site"
                );
                return Err(SyncError::Transport(e.to_string()));
            }
            Err(e) => return Err(SyncError::Transport(e.to_string())),
        }

        let jql = build_issue_sync_jql(&project.key, updated_after);
        let issues = match self.client.search_issues(&project.site_url, &jql).await {
            Ok(issues) => issues,
            Err(e) if e.is_http() => {
                tracing::warn!(project = %project.key, error = %e, "issue search failed, skipping");
                return Ok(IssueSyncOutcome::skipped(e.to_string()));
            }
            Err(e) if e.is_network() => {
                tracing::error!(
                    project = %project.key,
                    site_url = %project.site_url,
                    error = %e,
                    "network failure reaching jira site"
                );
                return Err(SyncError::Transport(e.to_string()));
            }
            Err(e) => return Err(SyncError::Transport(e.to_string())),
        };

        let mut resolver = IdentityResolver::new(&self.actor_repo);
        let mut outcome = IssueSyncOutcome::default();

        for issue in &issues {
            // Keep the actor table current for every account the issue
            // references; the issue row itself stores the account keys.
            if let Some(assignee) = &issue.fields.assignee {
                Self::resolve_account(&mut resolver, assignee).await?;
            }
            if let Some(reporter) = &issue.fields.reporter {
                Self::resolve_account(&mut resolver, reporter).await?;
            }

            match self.jira_repo.find_issue_by_key(&issue.key).await? {
                Some(existing) => {
                    let updated = apply_issue_update(&existing, issue);
                    self.jira_repo.update_issue(&updated).await?;
                    outcome.updated.push(updated);
                }
                None => {
                    let new_issue = api_issue_to_db(project.id, issue);
                    self.jira_repo.insert_issue(&new_issue).await?;
                    outcome.created.push(new_issue);
                }
            }
        }

        tracing::info!(
            project = %project.key,
            fetched = issues.len(),
            created = outcome.created.len(),
            updated = outcome.updated.len(),
            "issue sync completed"
        );

        Ok(outcome)
    }
}
