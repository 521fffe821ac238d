use std::str::FromStr;

use async_trait::async_trait;
use sqlx::{postgres::PgRow, PgPool, Row};
use uuid::Uuid;

use crate::integration::models::{
    Integration, NewJiraProjectLink, NewRepositoryLink, SyncStatus,
};
use crate::integration::repositories::IntegrationRepository;
use praxis_common::error::{PraxisError, PraxisResult};

#[derive(Clone)]
pub struct PgIntegrationRepository {
    pool: PgPool,
}

const INTEGRATION_COLUMNS: &str = "id, project_id, repository_id, jira_project_id, \
     last_synced_at, last_status, last_error, created_at, updated_at";

impl PgIntegrationRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn map_row(row: PgRow) -> PraxisResult<Integration> {
        let status_raw: String = row.get("last_status");
        let last_status = SyncStatus::from_str(&status_raw).map_err(PraxisError::Internal)?;

        Ok(Integration {
            id: row.get("id"),
            project_id: row.get("project_id"),
            repository_id: row.get("repository_id"),
            jira_project_id: row.get("jira_project_id"),
            last_synced_at: row.get("last_synced_at"),
            last_status,
            last_error: row.get("last_error"),
            created_at: row.get("created_at"),
            updated_at: row.get("updated_at"),
        })
    }
}

#[async_trait]
impl IntegrationRepository for PgIntegrationRepository {
    async fn get(&self, id: Uuid) -> PraxisResult<Option<Integration>> {
        let row = sqlx::query(&format!(
            "select {INTEGRATION_COLUMNS} from integrations where id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| PraxisError::Database(e.to_string()))?;

        row.map(Self::map_row).transpose()
    }

    async fn find_by_project(&self, project_id: Uuid) -> PraxisResult<Option<Integration>> {
        let row = sqlx::query(&format!(
            "select {INTEGRATION_COLUMNS} from integrations where project_id = $1"
        ))
        .bind(project_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| PraxisError::Database(e.to_string()))?;

        row.map(Self::map_row).transpose()
    }

    async fn list_syncable(&self) -> PraxisResult<Vec<Integration>> {
        let rows = sqlx::query(&format!(
            "select {INTEGRATION_COLUMNS} from integrations
             where repository_id is not null or jira_project_id is not null
             order by created_at"
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| PraxisError::Database(e.to_string()))?;

        rows.into_iter().map(Self::map_row).collect()
    }

    async fn link_repository(
        &self,
        project_id: Uuid,
        link: NewRepositoryLink,
    ) -> PraxisResult<Integration> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| PraxisError::Database(e.to_string()))?;

        let repository_id: Uuid = sqlx::query_scalar(
            "insert into github_repos (id, owner, name)
             values ($1, $2, $3)
             on conflict (owner, name) do update set updated_at = now()
             returning id",
        )
        .bind(Uuid::new_v4())
        .bind(&link.owner)
        .bind(&link.name)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| PraxisError::Database(e.to_string()))?;

        let row = sqlx::query(&format!(
            "insert into integrations (id, project_id, repository_id)
             values ($1, $2, $3)
             on conflict (project_id) do update set
               repository_id = excluded.repository_id,
               updated_at = now()
             returning {INTEGRATION_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(project_id)
        .bind(repository_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| PraxisError::Database(e.to_string()))?;

        let integration = Self::map_row(row)?;

        tx.commit()
            .await
            .map_err(|e| PraxisError::Database(e.to_string()))?;

        Ok(integration)
    }

    async fn link_jira_project(
        &self,
        project_id: Uuid,
        link: NewJiraProjectLink,
    ) -> PraxisResult<Integration> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| PraxisError::Database(e.to_string()))?;

        let jira_project_id: Uuid = sqlx::query_scalar(
            "insert into jira_projects (id, key, site_url, name)
             values ($1, $2, $3, $4)
             on conflict (key) do update set
               site_url = excluded.site_url,
               name = excluded.name,
               updated_at = now()
             returning id",
        )
        .bind(Uuid::new_v4())
        .bind(&link.key)
        .bind(&link.site_url)
        .bind(&link.name)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| PraxisError::Database(e.to_string()))?;

        let row = sqlx::query(&format!(
            "insert into integrations (id, project_id, jira_project_id)
             values ($1, $2, $3)
             on conflict (project_id) do update set
               jira_project_id = excluded.jira_project_id,
               updated_at = now()
             returning {INTEGRATION_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(project_id)
        .bind(jira_project_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| PraxisError::Database(e.to_string()))?;

        let integration = Self::map_row(row)?;

        tx.commit()
            .await
            .map_err(|e| PraxisError::Database(e.to_string()))?;

        Ok(integration)
    }

    async fn begin_sync(
        &self,
        id: Uuid,
        stale_after_secs: i64,
    ) -> PraxisResult<Option<Integration>> {
        let row = sqlx::query(&format!(
            "update integrations
             set last_status = 'pending', last_error = null, updated_at = now()
             where id = $1
               and (last_status <> 'pending'
                    or updated_at < now() - ($2 * interval '1 second'))
             returning {INTEGRATION_COLUMNS}"
        ))
        .bind(id)
        .bind(stale_after_secs)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| PraxisError::Database(e.to_string()))?;

        row.map(Self::map_row).transpose()
    }

    async fn mark_success(&self, id: Uuid) -> PraxisResult<Integration> {
        let row = sqlx::query(&format!(
            "update integrations
             set last_status = 'success', last_synced_at = now(), last_error = null,
                 updated_at = now()
             where id = $1
             returning {INTEGRATION_COLUMNS}"
        ))
        .bind(id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| PraxisError::Database(e.to_string()))?;

        Self::map_row(row)
    }

    async fn mark_error(&self, id: Uuid, message: &str) -> PraxisResult<Integration> {
        let row = sqlx::query(&format!(
            "update integrations
             set last_status = 'error', last_error = $1, updated_at = now()
             where id = $2
             returning {INTEGRATION_COLUMNS}"
        ))
        .bind(message)
        .bind(id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| PraxisError::Database(e.to_string()))?;

        Self::map_row(row)
    }
}
