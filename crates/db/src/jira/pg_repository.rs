use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{postgres::PgRow, PgPool, QueryBuilder, Row};
use uuid::Uuid;

use crate::jira::models::{JiraIssue, JiraProject};
use crate::jira::repositories::JiraRepository;
use praxis_common::error::{PraxisError, PraxisResult};

#[derive(Clone)]
pub struct PgJiraRepository {
    pool: PgPool,
}

const PROJECT_COLUMNS: &str = "id, key, site_url, name, created_at, updated_at";
const ISSUE_COLUMNS: &str = "id, jira_project_id, issue_key, summary, issue_type, status, \
     priority, assignee_account_id, reporter_account_id, created_at_jira, updated_at_jira, \
     created_at, updated_at";

impl PgJiraRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn map_project_row(row: PgRow) -> PraxisResult<JiraProject> {
        Ok(JiraProject {
            id: row.get("id"),
            key: row.get("key"),
            site_url: row.get("site_url"),
            name: row.get("name"),
            created_at: row.get("created_at"),
            updated_at: row.get("updated_at"),
        })
    }

    fn map_issue_row(row: PgRow) -> PraxisResult<JiraIssue> {
        Ok(JiraIssue {
            id: row.get("id"),
            jira_project_id: row.get("jira_project_id"),
            issue_key: row.get("issue_key"),
            summary: row.get("summary"),
            issue_type: row.get("issue_type"),
            status: row.get("status"),
            priority: row.get("priority"),
            assignee_account_id: row.get("assignee_account_id"),
            reporter_account_id: row.get("reporter_account_id"),
            created_at_jira: row.get("created_at_jira"),
            updated_at_jira: row.get("updated_at_jira"),
            created_at: row.get("created_at"),
            updated_at: row.get("updated_at"),
        })
    }
}

#[async_trait]
impl JiraRepository for PgJiraRepository {
    async fn get_project(&self, id: Uuid) -> PraxisResult<Option<JiraProject>> {
        let row = sqlx::query(&format!(
            "select {PROJECT_COLUMNS} from jira_projects where id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| PraxisError::Database(e.to_string()))?;

        row.map(Self::map_project_row).transpose()
    }

    async fn find_project_by_key(&self, key: &str) -> PraxisResult<Option<JiraProject>> {
        let row = sqlx::query(&format!(
            "select {PROJECT_COLUMNS} from jira_projects where key = $1"
        ))
        .bind(key)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| PraxisError::Database(e.to_string()))?;

        row.map(Self::map_project_row).transpose()
    }

    async fn find_issue_by_key(&self, issue_key: &str) -> PraxisResult<Option<JiraIssue>> {
        let row = sqlx::query(&format!(
            "select {ISSUE_COLUMNS} from jira_issues where issue_key = $1"
        ))
        .bind(issue_key)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| PraxisError::Database(e.to_string()))?;

        row.map(Self::map_issue_row).transpose()
    }

    async fn insert_issue(&self, issue: &JiraIssue) -> PraxisResult<()> {
        sqlx::query(
            "insert into jira_issues
             (id, jira_project_id, issue_key, summary, issue_type, status, priority,
              assignee_account_id, reporter_account_id, created_at_jira, updated_at_jira)
             values ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)",
        )
        .bind(issue.id)
        .bind(issue.jira_project_id)
        .bind(&issue.issue_key)
        .bind(&issue.summary)
        .bind(&issue.issue_type)
        .bind(&issue.status)
        .bind(&issue.priority)
        .bind(&issue.assignee_account_id)
        .bind(&issue.reporter_account_id)
        .bind(issue.created_at_jira)
        .bind(issue.updated_at_jira)
        .execute(&self.pool)
        .await
        .map_err(|e| PraxisError::Database(e.to_string()))?;
        Ok(())
    }

    async fn update_issue(&self, issue: &JiraIssue) -> PraxisResult<()> {
        let result = sqlx::query(
            "update jira_issues
             set summary = $1, issue_type = $2, status = $3, priority = $4,
                 assignee_account_id = $5, reporter_account_id = $6,
                 created_at_jira = $7, updated_at_jira = $8, updated_at = now()
             where issue_key = $9",
        )
        .bind(&issue.summary)
        .bind(&issue.issue_type)
        .bind(&issue.status)
        .bind(&issue.priority)
        .bind(&issue.assignee_account_id)
        .bind(&issue.reporter_account_id)
        .bind(issue.created_at_jira)
        .bind(issue.updated_at_jira)
        .bind(&issue.issue_key)
        .execute(&self.pool)
        .await
        .map_err(|e| PraxisError::Database(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(PraxisError::NotFound(format!(
                "jira issue {}",
                issue.issue_key
            )));
        }
        Ok(())
    }

    async fn issue_count(
        &self,
        jira_project_id: Uuid,
        status: Option<&str>,
    ) -> PraxisResult<i64> {
        let mut qb =
            QueryBuilder::new("select count(*) from jira_issues where jira_project_id = ");
        qb.push_bind(jira_project_id);
        if let Some(status) = status {
            qb.push(" and status = ").push_bind(status);
        }

        let count: i64 = qb
            .build_query_scalar()
            .fetch_one(&self.pool)
            .await
            .map_err(|e| PraxisError::Database(e.to_string()))?;
        Ok(count)
    }

    async fn last_issue_update(
        &self,
        jira_project_id: Uuid,
    ) -> PraxisResult<Option<DateTime<Utc>>> {
        sqlx::query_scalar(
            "select max(updated_at_jira) from jira_issues where jira_project_id = $1",
        )
        .bind(jira_project_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| PraxisError::Database(e.to_string()))
    }

    async fn list_issues_paged(
        &self,
        jira_project_id: Uuid,
        page: u32,
        page_size: u32,
    ) -> PraxisResult<Vec<JiraIssue>> {
        let offset = i64::from(page.saturating_sub(1)) * i64::from(page_size);
        let rows = sqlx::query(&format!(
            "select {ISSUE_COLUMNS} from jira_issues
             where jira_project_id = $1
             order by updated_at_jira desc nulls last
             limit $2 offset $3"
        ))
        .bind(jira_project_id)
        .bind(i64::from(page_size))
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| PraxisError::Database(e.to_string()))?;

        rows.into_iter().map(Self::map_issue_row).collect()
    }
}
