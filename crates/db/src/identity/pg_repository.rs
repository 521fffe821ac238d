use std::str::FromStr;

use async_trait::async_trait;
use sqlx::{postgres::PgRow, PgPool, Row};
use uuid::Uuid;

use crate::identity::models::{ActorKind, ExternalActor, NewActor, Provider};
use crate::identity::repositories::ActorRepository;
use praxis_common::error::{PraxisError, PraxisResult};

#[derive(Clone)]
pub struct PgActorRepository {
    pool: PgPool,
}

impl PgActorRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn map_row(row: PgRow) -> PraxisResult<ExternalActor> {
        let provider_raw: String = row.get("provider");
        let kind_raw: String = row.get("kind");

        Ok(ExternalActor {
            id: row.get("id"),
            provider: Provider::from_str(&provider_raw).map_err(PraxisError::Internal)?,
            external_id: row.get("external_id"),
            login: row.get("login"),
            display_name: row.get("display_name"),
            kind: ActorKind::from_str(&kind_raw).map_err(PraxisError::Internal)?,
            created_at: row.get("created_at"),
            updated_at: row.get("updated_at"),
        })
    }
}

const ACTOR_COLUMNS: &str =
    "id, provider, external_id, login, display_name, kind, created_at, updated_at";

#[async_trait]
impl ActorRepository for PgActorRepository {
    async fn get_by_id(&self, id: Uuid) -> PraxisResult<Option<ExternalActor>> {
        let row = sqlx::query(&format!(
            "select {ACTOR_COLUMNS} from external_actors where id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| PraxisError::Database(e.to_string()))?;

        row.map(Self::map_row).transpose()
    }

    async fn find_by_external_id(
        &self,
        provider: Provider,
        external_id: &str,
    ) -> PraxisResult<Option<ExternalActor>> {
        let row = sqlx::query(&format!(
            "select {ACTOR_COLUMNS} from external_actors where provider = $1 and external_id = $2"
        ))
        .bind(provider.as_str())
        .bind(external_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| PraxisError::Database(e.to_string()))?;

        row.map(Self::map_row).transpose()
    }

    async fn ensure(&self, actor: NewActor) -> PraxisResult<ExternalActor> {
        let row = sqlx::query(&format!(
            "insert into external_actors (id, provider, external_id, login, display_name, kind)
             values ($1, $2, $3, $4, $5, $6)
             on conflict (provider, external_id) do update set
               login = excluded.login,
               display_name = excluded.display_name,
               updated_at = now()
             returning {ACTOR_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(actor.provider.as_str())
        .bind(&actor.external_id)
        .bind(&actor.login)
        .bind(&actor.display_name)
        .bind(actor.kind.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| PraxisError::Database(e.to_string()))?;

        Self::map_row(row)
    }
}
