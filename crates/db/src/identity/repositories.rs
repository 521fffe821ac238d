use async_trait::async_trait;
use uuid::Uuid;

use crate::identity::models::{ExternalActor, NewActor, Provider};
use praxis_common::error::PraxisResult;

#[async_trait]
pub trait ActorRepository: Send + Sync {
    async fn get_by_id(&self, id: Uuid) -> PraxisResult<Option<ExternalActor>>;

    async fn find_by_external_id(
        &self,
        provider: Provider,
        external_id: &str,
    ) -> PraxisResult<Option<ExternalActor>>;

    /// Get-or-create keyed by (provider, external_id).
    ///
    /// Never creates a second record for the same external id and never
    /// merges two distinct external ids; login and display name are
    /// refreshed from the latest provider payload.
    async fn ensure(&self, actor: NewActor) -> PraxisResult<ExternalActor>;
}
