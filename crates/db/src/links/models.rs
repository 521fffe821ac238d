use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    Commit,
    PullRequest,
    Branch,
}

impl ArtifactKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Commit => "commit",
            Self::PullRequest => "pull_request",
            Self::Branch => "branch",
        }
    }
}

impl FromStr for ArtifactKind {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "commit" => Ok(Self::Commit),
            "pull_request" => Ok(Self::PullRequest),
            "branch" => Ok(Self::Branch),
            _ => Err(format!("unknown artifact kind: {value}")),
        }
    }
}

/// An association between a Jira issue and a GitHub artifact (a commit sha,
/// a pull-request number, or a branch name) in one repository.
///
/// Append-only: once recorded a link is never dropped, and the
/// (issue, repository, artifact, kind) quadruple is stored at most once.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkLink {
    pub id: Uuid,
    pub jira_issue_id: Uuid,
    pub repository_id: Uuid,
    pub artifact_ref: String,
    pub kind: ArtifactKind,
    pub created_at: DateTime<Utc>,
}

impl WorkLink {
    pub fn new(
        jira_issue_id: Uuid,
        repository_id: Uuid,
        artifact_ref: impl Into<String>,
        kind: ArtifactKind,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            jira_issue_id,
            repository_id,
            artifact_ref: artifact_ref.into(),
            kind,
            created_at: Utc::now(),
        }
    }
}
