use async_trait::async_trait;
use uuid::Uuid;

use crate::integration::models::{Integration, NewJiraProjectLink, NewRepositoryLink};
use praxis_common::error::PraxisResult;

#[async_trait]
pub trait IntegrationRepository: Send + Sync {
    async fn get(&self, id: Uuid) -> PraxisResult<Option<Integration>>;

    async fn find_by_project(&self, project_id: Uuid) -> PraxisResult<Option<Integration>>;

    /// Integrations with at least one external resource attached.
    async fn list_syncable(&self) -> PraxisResult<Vec<Integration>>;

    /// Attach a GitHub repository to a project's integration, creating the
    /// repository row and the integration row as needed. Transactional: no
    /// partial state survives a failure.
    async fn link_repository(
        &self,
        project_id: Uuid,
        link: NewRepositoryLink,
    ) -> PraxisResult<Integration>;

    /// Attach a Jira project; same transactional contract as
    /// [`Self::link_repository`].
    async fn link_jira_project(
        &self,
        project_id: Uuid,
        link: NewJiraProjectLink,
    ) -> PraxisResult<Integration>;

    /// Atomically move the integration to `pending`, but only if no sync is
    /// in flight (or the in-flight marker is older than `stale_after_secs`,
    /// covering crashed runs). Returns `None` when the lock is held.
    async fn begin_sync(
        &self,
        id: Uuid,
        stale_after_secs: i64,
    ) -> PraxisResult<Option<Integration>>;

    async fn mark_success(&self, id: Uuid) -> PraxisResult<Integration>;

    async fn mark_error(&self, id: Uuid, message: &str) -> PraxisResult<Integration>;
}
