use std::str::FromStr;

use async_trait::async_trait;
use sqlx::{postgres::PgRow, PgPool, Row};
use uuid::Uuid;

use crate::links::models::{ArtifactKind, WorkLink};
use crate::links::repositories::WorkLinkRepository;
use praxis_common::error::{PraxisError, PraxisResult};

#[derive(Clone)]
pub struct PgWorkLinkRepository {
    pool: PgPool,
}

const LINK_COLUMNS: &str = "id, jira_issue_id, repository_id, artifact_ref, kind, created_at";

impl PgWorkLinkRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn map_row(row: PgRow) -> PraxisResult<WorkLink> {
        let kind_raw: String = row.get("kind");
        Ok(WorkLink {
            id: row.get("id"),
            jira_issue_id: row.get("jira_issue_id"),
            repository_id: row.get("repository_id"),
            artifact_ref: row.get("artifact_ref"),
            kind: ArtifactKind::from_str(&kind_raw).map_err(PraxisError::Internal)?,
            created_at: row.get("created_at"),
        })
    }
}

#[async_trait]
impl WorkLinkRepository for PgWorkLinkRepository {
    async fn record(&self, link: &WorkLink) -> PraxisResult<bool> {
        let result = sqlx::query(
            "insert into work_links (id, jira_issue_id, repository_id, artifact_ref, kind)
             values ($1, $2, $3, $4, $5)
             on conflict (jira_issue_id, repository_id, artifact_ref, kind) do nothing",
        )
        .bind(link.id)
        .bind(link.jira_issue_id)
        .bind(link.repository_id)
        .bind(&link.artifact_ref)
        .bind(link.kind.as_str())
        .execute(&self.pool)
        .await
        .map_err(|e| PraxisError::Database(e.to_string()))?;

        Ok(result.rows_affected() > 0)
    }

    async fn links_for_issue(&self, jira_issue_id: Uuid) -> PraxisResult<Vec<WorkLink>> {
        let rows = sqlx::query(&format!(
            "select {LINK_COLUMNS} from work_links
             where jira_issue_id = $1 order by created_at"
        ))
        .bind(jira_issue_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| PraxisError::Database(e.to_string()))?;

        rows.into_iter().map(Self::map_row).collect()
    }

    async fn links_for_artifact(
        &self,
        repository_id: Uuid,
        artifact_ref: &str,
    ) -> PraxisResult<Vec<WorkLink>> {
        let rows = sqlx::query(&format!(
            "select {LINK_COLUMNS} from work_links
             where repository_id = $1 and artifact_ref = $2 order by created_at"
        ))
        .bind(repository_id)
        .bind(artifact_ref)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| PraxisError::Database(e.to_string()))?;

        rows.into_iter().map(Self::map_row).collect()
    }
}
