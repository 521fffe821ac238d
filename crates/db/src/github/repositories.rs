use std::collections::HashSet;

use async_trait::async_trait;
use uuid::Uuid;

use crate::github::models::{Commit, GithubRepo, PullRequest};
use praxis_common::error::PraxisResult;

#[async_trait]
pub trait GithubRepository: Send + Sync {
    async fn get_repo(&self, id: Uuid) -> PraxisResult<Option<GithubRepo>>;

    async fn find_repo(&self, owner: &str, name: &str) -> PraxisResult<Option<GithubRepo>>;

    /// Record the provider's numeric id and metadata after a successful
    /// probe. The numeric id is write-once; callers must verify a match
    /// before syncing when one is already recorded.
    async fn record_provider_identity(
        &self,
        id: Uuid,
        github_id: i64,
        default_branch: Option<&str>,
        private: Option<bool>,
    ) -> PraxisResult<()>;

    /// Which of the given shas already exist for this repository.
    async fn existing_shas(
        &self,
        repository_id: Uuid,
        shas: &[String],
    ) -> PraxisResult<HashSet<String>>;

    /// Insert a batch of commits as one transaction: either every commit in
    /// the batch becomes visible or none does. Re-inserting an existing sha
    /// is a no-op (unique on (repository_id, sha)).
    async fn insert_commits(&self, commits: &[Commit]) -> PraxisResult<usize>;

    async fn commit_count(&self, repository_id: Uuid) -> PraxisResult<i64>;

    async fn find_pull_request(
        &self,
        repository_id: Uuid,
        number: i64,
    ) -> PraxisResult<Option<PullRequest>>;

    async fn insert_pull_request(&self, pr: &PullRequest) -> PraxisResult<()>;

    /// Refresh the mutable fields (title, state, provider timestamps) of an
    /// existing pull request, keyed by (repository_id, number).
    async fn update_pull_request(&self, pr: &PullRequest) -> PraxisResult<()>;

    async fn list_commits_paged(
        &self,
        repository_id: Uuid,
        page: u32,
        page_size: u32,
    ) -> PraxisResult<Vec<Commit>>;
}
