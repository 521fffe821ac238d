use std::sync::OnceLock;

use regex::Regex;
use uuid::Uuid;

use praxis_common::error::PraxisResult;
use praxis_db::github::models::{Commit, PullRequest};
use praxis_db::jira::repositories::JiraRepository;
use praxis_db::links::models::{ArtifactKind, WorkLink};
use praxis_db::links::repositories::WorkLinkRepository;

static ISSUE_KEY_RE: OnceLock<Regex> = OnceLock::new();

fn issue_key_re() -> &'static Regex {
    ISSUE_KEY_RE.get_or_init(|| {
        Regex::new(r"\b[A-Z][A-Z0-9]+-[0-9]+\b").expect("issue key pattern")
    })
}

/// Issue keys mentioned in a text, first-mention order, de-duplicated.
pub fn extract_issue_keys(text: &str) -> Vec<String> {
    let mut keys = Vec::new();
    for m in issue_key_re().find_iter(text) {
        let key = m.as_str().to_string();
        if !keys.contains(&key) {
            keys.push(key);
        }
    }
    keys
}

/// Detects issue↔artifact associations in the records one sync touched
/// and appends them to the work-link ledger.
///
/// Detection is intentionally conservative: only issue keys that resolve
/// to a locally-synced issue produce a link, and recording is append-only
/// with at-most-once semantics, so rescanning the same records is
/// harmless.
pub struct LinkScanner<J, W> {
    jira_repo: J,
    link_repo: W,
}

impl<J, W> LinkScanner<J, W>
where
    J: JiraRepository,
    W: WorkLinkRepository,
{
    pub fn new(jira_repo: J, link_repo: W) -> Self {
        Self {
            jira_repo,
            link_repo,
        }
    }

    /// Scan commit messages; each match links the commit sha to the issue.
    /// Returns how many new links were recorded.
    pub async fn scan_commits(
        &self,
        repository_id: Uuid,
        commits: &[Commit],
    ) -> PraxisResult<usize> {
        let mut recorded = 0usize;
        for commit in commits {
            for key in extract_issue_keys(&commit.message) {
                recorded += self
                    .record_if_known(&key, repository_id, &commit.sha, ArtifactKind::Commit)
                    .await?;
            }
        }
        Ok(recorded)
    }

    /// Scan PR titles (linking the PR number) and source branch names
    /// (linking the branch). Returns how many new links were recorded.
    pub async fn scan_pull_requests(
        &self,
        repository_id: Uuid,
        prs: &[PullRequest],
    ) -> PraxisResult<usize> {
        let mut recorded = 0usize;
        for pr in prs {
            for key in extract_issue_keys(&pr.title) {
                recorded += self
                    .record_if_known(
                        &key,
                        repository_id,
                        &pr.number.to_string(),
                        ArtifactKind::PullRequest,
                    )
                    .await?;
            }
            for key in extract_issue_keys(&pr.source_branch) {
                recorded += self
                    .record_if_known(&key, repository_id, &pr.source_branch, ArtifactKind::Branch)
                    .await?;
            }
        }
        Ok(recorded)
    }

    async fn record_if_known(
        &self,
        issue_key: &str,
        repository_id: Uuid,
        artifact_ref: &str,
        kind: ArtifactKind,
    ) -> PraxisResult<usize> {
        let issue = match self.jira_repo.find_issue_by_key(issue_key).await? {
            Some(issue) => issue,
            None => return Ok(0),
        };

        let link = WorkLink::new(issue.id, repository_id, artifact_ref, kind);
        if self.link_repo.record(&link).await? {
            tracing::debug!(
                issue = %issue_key,
                artifact = %artifact_ref,
                kind = %kind.as_str(),
                "work link recorded"
            );
            Ok(1)
        } else {
            Ok(0)
        }
    }
}
