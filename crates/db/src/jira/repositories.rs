use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::jira::models::{JiraIssue, JiraProject};
use praxis_common::error::PraxisResult;

#[async_trait]
pub trait JiraRepository: Send + Sync {
    async fn get_project(&self, id: Uuid) -> PraxisResult<Option<JiraProject>>;

    async fn find_project_by_key(&self, key: &str) -> PraxisResult<Option<JiraProject>>;

    async fn find_issue_by_key(&self, issue_key: &str) -> PraxisResult<Option<JiraIssue>>;

    async fn insert_issue(&self, issue: &JiraIssue) -> PraxisResult<()>;

    /// Refresh the mutable fields of an existing issue, keyed by issue key.
    async fn update_issue(&self, issue: &JiraIssue) -> PraxisResult<()>;

    async fn issue_count(
        &self,
        jira_project_id: Uuid,
        status: Option<&str>,
    ) -> PraxisResult<i64>;

    async fn last_issue_update(
        &self,
        jira_project_id: Uuid,
    ) -> PraxisResult<Option<DateTime<Utc>>>;

    async fn list_issues_paged(
        &self,
        jira_project_id: Uuid,
        page: u32,
        page_size: u32,
    ) -> PraxisResult<Vec<JiraIssue>>;
}
