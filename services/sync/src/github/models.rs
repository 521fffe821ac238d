use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A GitHub account as embedded in repository/commit/PR payloads.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiAccount {
    pub id: i64,
    pub login: String,
    #[serde(rename = "type")]
    pub account_type: Option<String>,
}

impl ApiAccount {
    /// Returns `true` for machine accounts (`"type": "Bot"`).
    pub fn is_bot(&self) -> bool {
        matches!(self.account_type.as_deref(), Some("Bot"))
    }
}

/// Repository metadata from `GET /repos/{owner}/{repo}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiRepository {
    pub id: i64,
    pub name: String,
    pub full_name: Option<String>,
    pub default_branch: Option<String>,
    #[serde(default)]
    pub private: Option<bool>,
}

/// The git-level signature inside a commit payload. The provider may omit
/// any part of it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiGitSignature {
    pub name: Option<String>,
    pub email: Option<String>,
    pub date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiCommitDetail {
    pub message: String,
    pub author: Option<ApiGitSignature>,
    pub committer: Option<ApiGitSignature>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiCommitStats {
    pub additions: Option<i32>,
    pub deletions: Option<i32>,
}

/// A commit list entry from `GET /repos/{owner}/{repo}/commits`.
///
/// `author`/`committer` are the GitHub accounts and are null when the git
/// identity could not be mapped to one; `stats` only appears on the
/// single-commit endpoint, never on the list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiCommit {
    pub sha: String,
    pub commit: ApiCommitDetail,
    pub author: Option<ApiAccount>,
    pub committer: Option<ApiAccount>,
    #[serde(default)]
    pub stats: Option<ApiCommitStats>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiBranchRef {
    #[serde(rename = "ref")]
    pub name: String,
}

/// A pull request from `GET /repos/{owner}/{repo}/pulls?state=all`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiPullRequest {
    pub number: i64,
    pub title: String,
    pub state: String,
    pub user: Option<ApiAccount>,
    pub head: ApiBranchRef,
    pub base: ApiBranchRef,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    pub closed_at: Option<DateTime<Utc>>,
    pub merged_at: Option<DateTime<Utc>>,
}
