use async_trait::async_trait;
use uuid::Uuid;

use crate::links::models::WorkLink;
use praxis_common::error::PraxisResult;

#[async_trait]
pub trait WorkLinkRepository: Send + Sync {
    /// Record a link with at-most-once semantics per
    /// (issue, repository, artifact, kind). Returns whether a new row was
    /// actually written.
    async fn record(&self, link: &WorkLink) -> PraxisResult<bool>;

    async fn links_for_issue(&self, jira_issue_id: Uuid) -> PraxisResult<Vec<WorkLink>>;

    async fn links_for_artifact(
        &self,
        repository_id: Uuid,
        artifact_ref: &str,
    ) -> PraxisResult<Vec<WorkLink>>;
}
