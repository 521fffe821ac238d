use std::collections::HashMap;

use uuid::Uuid;

use praxis_common::error::PraxisResult;
use praxis_db::identity::models::{ActorKind, NewActor, Provider};
use praxis_db::identity::repositories::ActorRepository;

/// Resolves provider accounts to local actor ids, memoizing within one
/// sync invocation so a page of commits by one author costs a single
/// store round trip. The underlying store operation is a get-or-create
/// keyed on (provider, external id), so concurrent resolutions of the
/// same account converge on one record.
pub struct IdentityResolver<'a, A> {
    repo: &'a A,
    cache: HashMap<(Provider, String), Uuid>,
}

impl<'a, A> IdentityResolver<'a, A>
where
    A: ActorRepository,
{
    pub fn new(repo: &'a A) -> Self {
        Self {
            repo,
            cache: HashMap::new(),
        }
    }

    pub async fn ensure_actor(
        &mut self,
        provider: Provider,
        external_id: &str,
        login: &str,
        display_name: Option<&str>,
        kind: ActorKind,
    ) -> PraxisResult<Uuid> {
        let key = (provider, external_id.to_string());
        if let Some(id) = self.cache.get(&key) {
            return Ok(*id);
        }

        let actor = self
            .repo
            .ensure(NewActor {
                provider,
                external_id: external_id.to_string(),
                login: login.to_string(),
                display_name: display_name.map(str::to_string),
                kind,
            })
            .await?;

        self.cache.insert(key, actor.id);
        Ok(actor.id)
    }
}
