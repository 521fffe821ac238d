use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A linked Jira project: its key plus the site the project lives on.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JiraProject {
    pub id: Uuid,
    pub key: String,
    pub site_url: String,
    pub name: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A synchronized Jira issue. The issue key is globally unique and
/// immutable; status, priority, summary and the account references are
/// refreshed on every sync.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JiraIssue {
    pub id: Uuid,
    pub jira_project_id: Uuid,
    pub issue_key: String,
    pub summary: String,
    pub issue_type: Option<String>,
    pub status: String,
    pub priority: Option<String>,
    pub assignee_account_id: Option<String>,
    pub reporter_account_id: Option<String>,
    pub created_at_jira: Option<DateTime<Utc>>,
    pub updated_at_jira: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
