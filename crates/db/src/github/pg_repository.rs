use std::collections::HashSet;

use async_trait::async_trait;
use sqlx::{postgres::PgRow, PgPool, Row};
use uuid::Uuid;

use crate::github::models::{Commit, GithubRepo, PullRequest};
use crate::github::repositories::GithubRepository;
use praxis_common::error::{PraxisError, PraxisResult};

#[derive(Clone)]
pub struct PgGithubRepository {
    pool: PgPool,
}

const REPO_COLUMNS: &str =
    "id, owner, name, github_id, default_branch, private, created_at, updated_at";
const COMMIT_COLUMNS: &str = "id, repository_id, sha, message, author_id, committer_id, \
     committed_at, additions, deletions, created_at";
const PR_COLUMNS: &str = "id, repository_id, number, title, state, author_id, source_branch, \
     target_branch, created_at_gh, updated_at_gh, closed_at, merged_at, created_at, updated_at";

impl PgGithubRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn map_repo_row(row: PgRow) -> PraxisResult<GithubRepo> {
        Ok(GithubRepo {
            id: row.get("id"),
            owner: row.get("owner"),
            name: row.get("name"),
            github_id: row.get("github_id"),
            default_branch: row.get("default_branch"),
            private: row.get("private"),
            created_at: row.get("created_at"),
            updated_at: row.get("updated_at"),
        })
    }

    fn map_commit_row(row: PgRow) -> PraxisResult<Commit> {
        Ok(Commit {
            id: row.get("id"),
            repository_id: row.get("repository_id"),
            sha: row.get("sha"),
            message: row.get("message"),
            author_id: row.get("author_id"),
            committer_id: row.get("committer_id"),
            committed_at: row.get("committed_at"),
            additions: row.get("additions"),
            deletions: row.get("deletions"),
            created_at: row.get("created_at"),
        })
    }

    fn map_pr_row(row: PgRow) -> PraxisResult<PullRequest> {
        Ok(PullRequest {
            id: row.get("id"),
            repository_id: row.get("repository_id"),
            number: row.get("number"),
            title: row.get("title"),
            state: row.get("state"),
            author_id: row.get("author_id"),
            source_branch: row.get("source_branch"),
            target_branch: row.get("target_branch"),
            created_at_gh: row.get("created_at_gh"),
            updated_at_gh: row.get("updated_at_gh"),
            closed_at: row.get("closed_at"),
            merged_at: row.get("merged_at"),
            created_at: row.get("created_at"),
            updated_at: row.get("updated_at"),
        })
    }
}

#[async_trait]
impl GithubRepository for PgGithubRepository {
    async fn get_repo(&self, id: Uuid) -> PraxisResult<Option<GithubRepo>> {
        let row = sqlx::query(&format!(
            "select {REPO_COLUMNS} from github_repos where id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| PraxisError::Database(e.to_string()))?;

        row.map(Self::map_repo_row).transpose()
    }

    async fn find_repo(&self, owner: &str, name: &str) -> PraxisResult<Option<GithubRepo>> {
        let row = sqlx::query(&format!(
            "select {REPO_COLUMNS} from github_repos where owner = $1 and name = $2"
        ))
        .bind(owner)
        .bind(name)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| PraxisError::Database(e.to_string()))?;

        row.map(Self::map_repo_row).transpose()
    }

    async fn record_provider_identity(
        &self,
        id: Uuid,
        github_id: i64,
        default_branch: Option<&str>,
        private: Option<bool>,
    ) -> PraxisResult<()> {
        let result = sqlx::query(
            "update github_repos
             set github_id = $1, default_branch = $2, private = $3, updated_at = now()
             where id = $4 and (github_id is null or github_id = $1)",
        )
        .bind(github_id)
        .bind(default_branch)
        .bind(private)
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(|e| PraxisError::Database(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(PraxisError::Validation(format!(
                "refusing to overwrite provider id of repository {id}"
            )));
        }
        Ok(())
    }

    async fn existing_shas(
        &self,
        repository_id: Uuid,
        shas: &[String],
    ) -> PraxisResult<HashSet<String>> {
        if shas.is_empty() {
            return Ok(HashSet::new());
        }

        let rows = sqlx::query(
            "select sha from commits where repository_id = $1 and sha = any($2)",
        )
        .bind(repository_id)
        .bind(shas)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| PraxisError::Database(e.to_string()))?;

        Ok(rows.into_iter().map(|r| r.get("sha")).collect())
    }

    async fn insert_commits(&self, commits: &[Commit]) -> PraxisResult<usize> {
        if commits.is_empty() {
            return Ok(0);
        }

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| PraxisError::Database(e.to_string()))?;

        let mut inserted = 0usize;
        for c in commits {
            let result = sqlx::query(
                "insert into commits
                 (id, repository_id, sha, message, author_id, committer_id,
                  committed_at, additions, deletions)
                 values ($1, $2, $3, $4, $5, $6, $7, $8, $9)
                 on conflict (repository_id, sha) do nothing",
            )
            .bind(c.id)
            .bind(c.repository_id)
            .bind(&c.sha)
            .bind(&c.message)
            .bind(c.author_id)
            .bind(c.committer_id)
            .bind(c.committed_at)
            .bind(c.additions)
            .bind(c.deletions)
            .execute(&mut *tx)
            .await
            .map_err(|e| PraxisError::Database(e.to_string()))?;

            inserted += result.rows_affected() as usize;
        }

        tx.commit()
            .await
            .map_err(|e| PraxisError::Database(e.to_string()))?;

        Ok(inserted)
    }

    async fn commit_count(&self, repository_id: Uuid) -> PraxisResult<i64> {
        sqlx::query_scalar("select count(*) from commits where repository_id = $1")
            .bind(repository_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| PraxisError::Database(e.to_string()))
    }

    async fn find_pull_request(
        &self,
        repository_id: Uuid,
        number: i64,
    ) -> PraxisResult<Option<PullRequest>> {
        let row = sqlx::query(&format!(
            "select {PR_COLUMNS} from pull_requests where repository_id = $1 and number = $2"
        ))
        .bind(repository_id)
        .bind(number)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| PraxisError::Database(e.to_string()))?;

        row.map(Self::map_pr_row).transpose()
    }

    async fn insert_pull_request(&self, pr: &PullRequest) -> PraxisResult<()> {
        sqlx::query(
            "insert into pull_requests
             (id, repository_id, number, title, state, author_id, source_branch,
              target_branch, created_at_gh, updated_at_gh, closed_at, merged_at)
             values ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)",
        )
        .bind(pr.id)
        .bind(pr.repository_id)
        .bind(pr.number)
        .bind(&pr.title)
        .bind(&pr.state)
        .bind(pr.author_id)
        .bind(&pr.source_branch)
        .bind(&pr.target_branch)
        .bind(pr.created_at_gh)
        .bind(pr.updated_at_gh)
        .bind(pr.closed_at)
        .bind(pr.merged_at)
        .execute(&self.pool)
        .await
        .map_err(|e| PraxisError::Database(e.to_string()))?;
        Ok(())
    }

    async fn update_pull_request(&self, pr: &PullRequest) -> PraxisResult<()> {
        let result = sqlx::query(
            "update pull_requests
             set title = $1, state = $2, source_branch = $3, target_branch = $4,
                 created_at_gh = $5, updated_at_gh = $6, closed_at = $7,
                 merged_at = $8, updated_at = now()
             where repository_id = $9 and number = $10",
        )
        .bind(&pr.title)
        .bind(&pr.state)
        .bind(&pr.source_branch)
        .bind(&pr.target_branch)
        .bind(pr.created_at_gh)
        .bind(pr.updated_at_gh)
        .bind(pr.closed_at)
        .bind(pr.merged_at)
        .bind(pr.repository_id)
        .bind(pr.number)
        .execute(&self.pool)
        .await
        .map_err(|e| PraxisError::Database(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(PraxisError::NotFound(format!(
                "pull request #{} in repository {}",
                pr.number, pr.repository_id
            )));
        }
        Ok(())
    }

    async fn list_commits_paged(
        &self,
        repository_id: Uuid,
        page: u32,
        page_size: u32,
    ) -> PraxisResult<Vec<Commit>> {
        let offset = i64::from(page.saturating_sub(1)) * i64::from(page_size);
        let rows = sqlx::query(&format!(
            "select {COMMIT_COLUMNS} from commits
             where repository_id = $1
             order by committed_at desc nulls last
             limit $2 offset $3"
        ))
        .bind(repository_id)
        .bind(i64::from(page_size))
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| PraxisError::Database(e.to_string()))?;

        rows.into_iter().map(Self::map_commit_row).collect()
    }
}
