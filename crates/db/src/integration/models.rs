use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SyncStatus {
    Success,
    Error,
    Pending,
}

impl SyncStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Error => "error",
            Self::Pending => "pending",
        }
    }
}

impl FromStr for SyncStatus {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "success" => Ok(Self::Success),
            "error" => Ok(Self::Error),
            "pending" => Ok(Self::Pending),
            _ => Err(format!("unknown sync status: {value}")),
        }
    }
}

/// The link between one internal project and its external resources:
/// at most one GitHub repository and at most one Jira project.
///
/// `pending` doubles as the in-flight marker: a sync acquires the
/// integration by atomically moving it to `pending` and releases it by
/// recording the terminal outcome. Integrations are never hard-deleted
/// while the project exists.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Integration {
    pub id: Uuid,
    pub project_id: Uuid,
    pub repository_id: Option<Uuid>,
    pub jira_project_id: Option<Uuid>,
    pub last_synced_at: Option<DateTime<Utc>>,
    pub last_status: SyncStatus,
    pub last_error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewRepositoryLink {
    pub owner: String,
    pub name: String,
}

#[derive(Debug, Clone)]
pub struct NewJiraProjectLink {
    pub key: String,
    pub site_url: String,
    pub name: Option<String>,
}
