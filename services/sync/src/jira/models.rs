use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Envelope of `GET {site}/rest/api/3/search`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JiraSearchResponse {
    pub start_at: u32,
    pub max_results: u32,
    pub total: u32,
    pub issues: Vec<ApiIssue>,
}

/// Project metadata from `GET {site}/rest/api/3/project/{key}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiProject {
    pub id: String,
    pub key: String,
    pub name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiIssue {
    pub key: String,
    pub fields: ApiIssueFields,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiIssueFields {
    pub summary: String,
    pub status: ApiNamed,
    pub issuetype: Option<ApiNamed>,
    pub priority: Option<ApiNamed>,
    pub assignee: Option<ApiAccountRef>,
    pub reporter: Option<ApiAccountRef>,
    pub created: Option<DateTime<Utc>>,
    pub updated: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiNamed {
    pub name: String,
}

/// An account reference embedded in issue fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiAccountRef {
    pub account_id: String,
    pub display_name: Option<String>,
    pub account_type: Option<String>,
}

impl ApiAccountRef {
    /// Returns `true` if the account looks like a service/bot account.
    pub fn is_service_account(&self) -> bool {
        matches!(self.account_type.as_deref(), Some("app"))
    }
}
