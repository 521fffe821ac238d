use praxis_db::github::models::{Commit, PullRequest};
use praxis_db::jira::models::JiraIssue;

#[derive(Debug, Default)]
pub struct CommitSyncOutcome {
    /// Commits written by this run, in provider order.
    pub inserted: Vec<Commit>,
    /// Commits whose sha was already known locally.
    pub skipped: usize,
}

#[derive(Debug, Default)]
pub struct PullRequestSyncOutcome {
    pub created: Vec<PullRequest>,
    pub updated: Vec<PullRequest>,
}

#[derive(Debug, Default)]
pub struct RepoSyncOutcome {
    pub commits: CommitSyncOutcome,
    pub pull_requests: PullRequestSyncOutcome,
    /// Set when the repository could not be probed and the sync was
    /// skipped cleanly (stale link, provider-side failure).
    pub skipped: Option<String>,
}

impl RepoSyncOutcome {
    pub fn skipped(reason: impl Into<String>) -> Self {
        Self {
            skipped: Some(reason.into()),
            ..Self::default()
        }
    }
}

#[derive(Debug, Default)]
pub struct IssueSyncOutcome {
    pub created: Vec<JiraIssue>,
    pub updated: Vec<JiraIssue>,
    /// Set when the sync was skipped cleanly (misconfigured site URL,
    /// provider-side failure).
    pub skipped: Option<String>,
}

impl IssueSyncOutcome {
    pub fn skipped(reason: impl Into<String>) -> Self {
        Self {
            skipped: Some(reason.into()),
            ..Self::default()
        }
    }
}

/// Per-integration summary persisted into logs after each attempt.
#[derive(Debug, Default)]
pub struct IntegrationOutcome {
    pub commits_inserted: usize,
    pub commits_skipped: usize,
    pub prs_created: usize,
    pub prs_updated: usize,
    pub issues_created: usize,
    pub issues_updated: usize,
    pub links_recorded: usize,
}
