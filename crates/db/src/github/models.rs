use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A linked GitHub repository, identified by its (owner, name) pair.
///
/// `github_id` is the provider's numeric id, unknown until the first
/// successful probe and immutable afterwards; a later mismatch means the
/// remote repository was replaced and is treated as a hard error.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GithubRepo {
    pub id: Uuid,
    pub owner: String,
    pub name: String,
    pub github_id: Option<i64>,
    pub default_branch: Option<String>,
    pub private: Option<bool>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl GithubRepo {
    pub fn full_name(&self) -> String {
        format!("{}/{}", self.owner, self.name)
    }
}

/// An observed commit. Immutable once stored; the sha is the natural key
/// within its repository. Change-size counters are nullable because the
/// list endpoint omits stats.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Commit {
    pub id: Uuid,
    pub repository_id: Uuid,
    pub sha: String,
    pub message: String,
    pub author_id: Option<Uuid>,
    pub committer_id: Option<Uuid>,
    pub committed_at: Option<DateTime<Utc>>,
    pub additions: Option<i32>,
    pub deletions: Option<i32>,
    pub created_at: DateTime<Utc>,
}

/// A pull request keyed by (repository, provider-assigned number).
/// Title, state and timestamps refresh on every sync; the author is
/// resolved once, on insert.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PullRequest {
    pub id: Uuid,
    pub repository_id: Uuid,
    pub number: i64,
    pub title: String,
    pub state: String,
    pub author_id: Option<Uuid>,
    pub source_branch: String,
    pub target_branch: String,
    pub created_at_gh: Option<DateTime<Utc>>,
    pub updated_at_gh: Option<DateTime<Utc>>,
    pub closed_at: Option<DateTime<Utc>>,
    pub merged_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
