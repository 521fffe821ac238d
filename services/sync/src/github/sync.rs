use chrono::{DateTime, Utc};
use uuid::Uuid;

use praxis_common::error::PraxisError;
use praxis_db::github::models::{Commit, GithubRepo, PullRequest};
use praxis_db::github::repositories::GithubRepository;
use praxis_db::identity::models::{ActorKind, Provider};
use praxis_db::identity::repositories::ActorRepository;

use super::client::GithubClient;
use super::models::{ApiAccount, ApiCommit, ApiPullRequest};
use crate::error::SyncError;
use crate::identity::IdentityResolver;
use crate::outcome::{CommitSyncOutcome, PullRequestSyncOutcome, RepoSyncOutcome};

pub struct GithubSyncer<G, A> {
    client: GithubClient,
    github_repo: G,
    actor_repo: A,
}

fn api_commit_to_db(
    repository_id: Uuid,
    c: &ApiCommit,
    author_id: Option<Uuid>,
    committer_id: Option<Uuid>,
) -> Commit {
    Commit {
        id: Uuid::new_v4(),
        repository_id,
        sha: c.sha.clone(),
        message: c.commit.message.clone(),
        author_id,
        committer_id,
        committed_at: c
            .commit
            .committer
            .as_ref()
            .and_then(|s| s.date)
            .or_else(|| c.commit.author.as_ref().and_then(|s| s.date)),
        additions: c.stats.as_ref().and_then(|s| s.additions),
        deletions: c.stats.as_ref().and_then(|s| s.deletions),
        created_at: Utc::now(),
    }
}

fn api_pr_to_db(repository_id: Uuid, pr: &ApiPullRequest, author_id: Option<Uuid>) -> PullRequest {
    let now = Utc::now();
    PullRequest {
        id: Uuid::new_v4(),
        repository_id,
        number: pr.number,
        title: pr.title.clone(),
        state: pr.state.clone(),
        author_id,
        source_branch: pr.head.name.clone(),
        target_branch: pr.base.name.clone(),
        created_at_gh: pr.created_at,
        updated_at_gh: pr.updated_at,
        closed_at: pr.closed_at,
        merged_at: pr.merged_at,
        created_at: now,
        updated_at: now,
    }
}

/// Carry the mutable fields of the provider payload onto an existing
/// record. Author and number never change after insert.
fn apply_pr_update(existing: &PullRequest, pr: &ApiPullRequest) -> PullRequest {
    PullRequest {
        title: pr.title.clone(),
        state: pr.state.clone(),
        source_branch: pr.head.name.clone(),
        target_branch: pr.base.name.clone(),
        created_at_gh: pr.created_at,
        updated_at_gh: pr.updated_at,
        closed_at: pr.closed_at,
        merged_at: pr.merged_at,
        updated_at: Utc::now(),
        ..existing.clone()
    }
}

impl<G, A> GithubSyncer<G, A>
where
    G: GithubRepository,
    A: ActorRepository,
{
    pub fn new(client: GithubClient, github_repo: G, actor_repo: A) -> Self {
        Self {
            client,
            github_repo,
            actor_repo,
        }
    }

    async fn resolve_account(
        resolver: &mut IdentityResolver<'_, A>,
        account: &ApiAccount,
    ) -> Result<Uuid, PraxisError> {
        let kind = if account.is_bot() {
            ActorKind::Bot
        } else {
            ActorKind::Human
        };
        resolver
            .ensure_actor(
                Provider::Github,
                &account.id.to_string(),
                &account.login,
                None,
                kind,
            )
            .await
    }

    pub async fn sync_repository_by_id(
        &self,
        repository_id: Uuid,
        since: Option<DateTime<Utc>>,
    ) -> Result<RepoSyncOutcome, SyncError> {
        let repo = self
            .github_repo
            .get_repo(repository_id)
            .await?
            .ok_or_else(|| {
                SyncError::Store(PraxisError::NotFound(format!(
                    "github repository {repository_id}"
                )))
            })?;
        self.sync_repository(&repo, since).await
    }

    /// Full per-repository sync: probe, verify provider identity, then
    /// commits and pull requests.
    pub async fn sync_repository(
        &self,
        repo: &GithubRepo,
        since: Option<DateTime<Utc>>,
    ) -> Result<RepoSyncOutcome, SyncError> {
        let info = match self.client.fetch_repository(&repo.owner, &repo.name).await {
            Ok(Some(info)) => info,
            Ok(None) => {
                tracing::warn!(
                    repo = %repo.full_name(),
                    "repository not found on provider, skipping sync"
                );
                return Ok(RepoSyncOutcome::skipped("repository not found"));
            }
            Err(e) if e.is_http() => {
                tracing::warn!(repo = %repo.full_name(), error = %e, "repository probe failed, skipping sync");
                return Ok(RepoSyncOutcome::skipped(e.to_string()));
            }
            Err(e) => return Err(SyncError::Transport(e.to_string())),
        };

        if let Some(expected) = repo.github_id {
            if expected != info.id {
                return Err(SyncError::IdentityConflict {
                    owner: repo.owner.clone(),
                    name: repo.name.clone(),
                    expected,
                    actual: info.id,
                });
            }
        }
        self.github_repo
            .record_provider_identity(
                repo.id,
                info.id,
                info.default_branch.as_deref(),
                info.private,
            )
            .await?;

        let commits = self.sync_commits(repo, since).await?;
        let pull_requests = self.sync_pull_requests(repo).await?;

        Ok(RepoSyncOutcome {
            commits,
            pull_requests,
            skipped: None,
        })
    }

    /// Fetch the most-recent commit page, drop shas we already have,
    /// resolve actors and insert the remainder as one batch. A zero-commit
    /// page is not an error, and re-running against unchanged provider
    /// state writes nothing.
    pub async fn sync_commits(
        &self,
        repo: &GithubRepo,
        since: Option<DateTime<Utc>>,
    ) -> Result<CommitSyncOutcome, SyncError> {
        let api_commits = match self
            .client
            .fetch_recent_commits(&repo.owner, &repo.name, since)
            .await
        {
            Ok(commits) => commits,
            Err(e) if e.is_http() => {
                tracing::warn!(repo = %repo.full_name(), error = %e, "commit fetch failed, skipping");
                return Ok(CommitSyncOutcome::default());
            }
            Err(e) => return Err(SyncError::Transport(e.to_string())),
        };

        let shas: Vec<String> = api_commits.iter().map(|c| c.sha.clone()).collect();
        let existing = self.github_repo.existing_shas(repo.id, &shas).await?;

        let mut resolver = IdentityResolver::new(&self.actor_repo);
        let mut new_commits = Vec::new();
        let mut skipped = 0usize;

        for c in &api_commits {
            if existing.contains(&c.sha) {
                skipped += 1;
                continue;
            }

            let author_id = match &c.author {
                Some(account) => Some(Self::resolve_account(&mut resolver, account).await?),
                None => None,
            };
            let committer_id = match &c.committer {
                Some(account) => Some(Self::resolve_account(&mut resolver, account).await?),
                None => None,
            };

            new_commits.push(api_commit_to_db(repo.id, c, author_id, committer_id));
        }

        let inserted = self.github_repo.insert_commits(&new_commits).await?;
        tracing::info!(
            repo = %repo.full_name(),
            fetched = api_commits.len(),
            inserted,
            skipped,
            "commit sync completed"
        );

        Ok(CommitSyncOutcome {
            inserted: new_commits,
            skipped,
        })
    }

    /// Upsert every pull request by its (repository, number) natural key:
    /// refresh mutable fields when known, insert with a resolved author
    /// when new.
    pub async fn sync_pull_requests(
        &self,
        repo: &GithubRepo,
    ) -> Result<PullRequestSyncOutcome, SyncError> {
        let api_prs = match self
            .client
            .fetch_pull_requests(&repo.owner, &repo.name)
            .await
        {
            Ok(prs) => prs,
            Err(e) if e.is_http() => {
                tracing::warn!(repo = %repo.full_name(), error = %e, "pull request fetch failed, skipping");
                return Ok(PullRequestSyncOutcome::default());
            }
            Err(e) => return Err(SyncError::Transport(e.to_string())),
        };

        let mut resolver = IdentityResolver::new(&self.actor_repo);
        let mut outcome = PullRequestSyncOutcome::default();

        for pr in &api_prs {
            match self.github_repo.find_pull_request(repo.id, pr.number).await? {
                Some(existing) => {
                    let updated = apply_pr_update(&existing, pr);
                    self.github_repo.update_pull_request(&updated).await?;
                    outcome.updated.push(updated);
                }
                None => {
                    let author_id = match &pr.user {
                        Some(account) => {
                            Some(Self::resolve_account(&mut resolver, account).await?)
                        }
                        None => None,
                    };
                    let new_pr = api_pr_to_db(repo.id, pr, author_id);
                    self.github_repo.insert_pull_request(&new_pr).await?;
                    outcome.created.push(new_pr);
                }
            }
        }

        tracing::info!(
            repo = %repo.full_name(),
            fetched = api_prs.len(),
            created = outcome.created.len(),
            updated = outcome.updated.len(),
            "pull request sync completed"
        );

        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::github::client::{GithubClient, GithubClientConfig};
    use crate::testutil::{InMemoryActorRepo, InMemoryGithubRepo};
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_client(base_url: &str) -> GithubClient {
        GithubClient::new(GithubClientConfig {
            base_url: base_url.to_string(),
            token: None,
            user_agent: "praxis-sync-tests".to_string(),
            per_page: 100,
            max_retries: 0,
            timeout_secs: 5,
        })
        .unwrap()
    }

    fn make_repo(github_id: Option<i64>) -> GithubRepo {
        let now = Utc::now();
        GithubRepo {
            id: Uuid::new_v4(),
            owner: "praxis".to_string(),
            name: "demo".to_string(),
            github_id,
            default_branch: None,
            private: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn repo_info_json(id: i64) -> serde_json::Value {
        serde_json::json!({
            "id": id,
            "name": "demo",
            "full_name": "praxis/demo",
            "default_branch": "main",
            "private": false
        })
    }

    fn commit_json(sha: &str, login: Option<&str>, message: &str) -> serde_json::Value {
        serde_json::json!({
            "sha": sha,
            "commit": {
                "message": message,
                "author": { "name": "A", "email": "a@example.edu", "date": "2026-03-01T10:00:00Z" },
                "committer": { "name": "A", "email": "a@example.edu", "date": "2026-03-01T10:00:00Z" }
            },
            "author": login.map(|l| serde_json::json!({ "id": 7, "login": l, "type": "User" })),
            "committer": null
        })
    }

    fn pr_json(number: i64, state: &str, merged_at: Option<&str>) -> serde_json::Value {
        serde_json::json!({
            "number": number,
            "title": format!("PR {number}"),
            "state": state,
            "user": { "id": 9, "login": "student-a", "type": "User" },
            "head": { "ref": "feature/work" },
            "base": { "ref": "main" },
            "created_at": "2026-03-01T10:00:00Z",
            "updated_at": "2026-03-02T10:00:00Z",
            "closed_at": merged_at,
            "merged_at": merged_at
        })
    }

    async fn mount_repo(server: &MockServer, id: i64) {
        Mock::given(method("GET"))
            .and(path("/repos/praxis/demo"))
            .respond_with(ResponseTemplate::new(200).set_body_json(repo_info_json(id)))
            .mount(server)
            .await;
    }

    async fn mount_commits(server: &MockServer, commits: &[serde_json::Value]) {
        Mock::given(method("GET"))
            .and(path("/repos/praxis/demo/commits"))
            .respond_with(ResponseTemplate::new(200).set_body_json(commits))
            .mount(server)
            .await;
    }

    async fn mount_prs(server: &MockServer, prs: &[serde_json::Value]) {
        Mock::given(method("GET"))
            .and(path("/repos/praxis/demo/pulls"))
            .respond_with(ResponseTemplate::new(200).set_body_json(prs))
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn fresh_sync_stores_commits_with_resolved_actors() {
        let server = MockServer::start().await;
        mount_repo(&server, 42).await;
        mount_commits(
            &server,
            &[
                commit_json("abc123", Some("student-a"), "first"),
                commit_json("def456", Some("student-b"), "second"),
            ],
        )
        .await;
        mount_prs(&server, &[]).await;

        let github_repo = InMemoryGithubRepo::default();
        let actor_repo = InMemoryActorRepo::default();
        let repo = make_repo(None);
        github_repo.add_repo(repo.clone());

        let syncer = GithubSyncer::new(
            test_client(&server.uri()),
            github_repo.clone(),
            actor_repo.clone(),
        );
        let outcome = syncer.sync_repository(&repo, None).await.unwrap();

        assert!(outcome.skipped.is_none());
        assert_eq!(outcome.commits.inserted.len(), 2);
        assert_eq!(github_repo.commit_count_sync(repo.id), 2);
        // Both commits carry a resolved author, and the two logins are
        // distinct local actors.
        let stored = github_repo.all_commits();
        let authors: Vec<Uuid> = stored.iter().filter_map(|c| c.author_id).collect();
        assert_eq!(authors.len(), 2);
        assert_ne!(authors[0], authors[1]);
        assert_eq!(actor_repo.len(), 2);
    }

    #[tokio::test]
    async fn second_sync_against_unchanged_provider_writes_nothing() {
        let server = MockServer::start().await;
        mount_repo(&server, 42).await;
        mount_commits(&server, &[commit_json("abc123", Some("student-a"), "one")]).await;
        mount_prs(&server, &[]).await;

        let github_repo = InMemoryGithubRepo::default();
        let actor_repo = InMemoryActorRepo::default();
        let repo = make_repo(None);
        github_repo.add_repo(repo.clone());

        let syncer = GithubSyncer::new(
            test_client(&server.uri()),
            github_repo.clone(),
            actor_repo.clone(),
        );

        syncer.sync_repository(&repo, None).await.unwrap();
        let count_after_first = github_repo.commit_count_sync(repo.id);

        let outcome = syncer.sync_repository(&repo, None).await.unwrap();
        assert_eq!(outcome.commits.inserted.len(), 0);
        assert_eq!(outcome.commits.skipped, 1);
        assert_eq!(github_repo.commit_count_sync(repo.id), count_after_first);
    }

    #[tokio::test]
    async fn same_author_across_commits_resolves_to_one_actor() {
        let server = MockServer::start().await;
        mount_repo(&server, 42).await;
        mount_commits(
            &server,
            &[
                commit_json("abc123", Some("student-a"), "one"),
                commit_json("def456", Some("student-a"), "two"),
            ],
        )
        .await;
        mount_prs(&server, &[]).await;

        let github_repo = InMemoryGithubRepo::default();
        let actor_repo = InMemoryActorRepo::default();
        let repo = make_repo(None);
        github_repo.add_repo(repo.clone());

        let syncer = GithubSyncer::new(
            test_client(&server.uri()),
            github_repo.clone(),
            actor_repo.clone(),
        );
        syncer.sync_repository(&repo, None).await.unwrap();

        let stored = github_repo.all_commits();
        assert_eq!(stored.len(), 2);
        assert_eq!(stored[0].author_id, stored[1].author_id);
        assert_eq!(actor_repo.len(), 1);
    }

    #[tokio::test]
    async fn commit_without_account_keeps_null_author() {
        let server = MockServer::start().await;
        mount_repo(&server, 42).await;
        mount_commits(&server, &[commit_json("abc123", None, "anonymous")]).await;
        mount_prs(&server, &[]).await;

        let github_repo = InMemoryGithubRepo::default();
        let repo = make_repo(None);
        github_repo.add_repo(repo.clone());

        let syncer = GithubSyncer::new(
            test_client(&server.uri()),
            github_repo.clone(),
            InMemoryActorRepo::default(),
        );
        syncer.sync_repository(&repo, None).await.unwrap();

        let stored = github_repo.all_commits();
        assert_eq!(stored.len(), 1);
        assert!(stored[0].author_id.is_none());
    }

    #[tokio::test]
    async fn pr_seen_open_then_closed_stays_one_record() {
        let server = MockServer::start().await;
        mount_repo(&server, 42).await;
        mount_commits(&server, &[]).await;

        let github_repo = InMemoryGithubRepo::default();
        let actor_repo = InMemoryActorRepo::default();
        let repo = make_repo(None);
        github_repo.add_repo(repo.clone());
        let syncer = GithubSyncer::new(
            test_client(&server.uri()),
            github_repo.clone(),
            actor_repo.clone(),
        );

        // First sync: PR #7 open.
        let open = Mock::given(method("GET"))
            .and(path("/repos/praxis/demo/pulls"))
            .respond_with(ResponseTemplate::new(200).set_body_json(vec![pr_json(7, "open", None)]))
            .up_to_n_times(1)
            .mount_as_scoped(&server)
            .await;
        let first = syncer.sync_repository(&repo, None).await.unwrap();
        assert_eq!(first.pull_requests.created.len(), 1);
        drop(open);

        // Second sync: same PR, now closed and merged.
        mount_prs(
            &server,
            &[pr_json(7, "closed", Some("2026-03-05T09:00:00Z"))],
        )
        .await;
        let second = syncer.sync_repository(&repo, None).await.unwrap();
        assert_eq!(second.pull_requests.created.len(), 0);
        assert_eq!(second.pull_requests.updated.len(), 1);

        let stored = github_repo.all_pull_requests();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].state, "closed");
        assert!(stored[0].merged_at.is_some());
        // Author resolved on insert survives the update.
        assert!(stored[0].author_id.is_some());
    }

    #[tokio::test]
    async fn missing_repository_skips_cleanly() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/repos/praxis/demo"))
            .respond_with(ResponseTemplate::new(404).set_body_string("Not Found"))
            .mount(&server)
            .await;

        let github_repo = InMemoryGithubRepo::default();
        let repo = make_repo(None);
        github_repo.add_repo(repo.clone());

        let syncer = GithubSyncer::new(
            test_client(&server.uri()),
            github_repo.clone(),
            InMemoryActorRepo::default(),
        );
        let outcome = syncer.sync_repository(&repo, None).await.unwrap();
        assert!(outcome.skipped.is_some());
        assert_eq!(github_repo.commit_count_sync(repo.id), 0);
    }

    #[tokio::test]
    async fn provider_id_mismatch_is_a_hard_error() {
        let server = MockServer::start().await;
        mount_repo(&server, 99).await;

        let github_repo = InMemoryGithubRepo::default();
        let repo = make_repo(Some(42));
        github_repo.add_repo(repo.clone());

        let syncer = GithubSyncer::new(
            test_client(&server.uri()),
            github_repo.clone(),
            InMemoryActorRepo::default(),
        );
        let err = syncer.sync_repository(&repo, None).await.unwrap_err();
        match err {
            SyncError::IdentityConflict {
                expected, actual, ..
            } => {
                assert_eq!(expected, 42);
                assert_eq!(actual, 99);
            }
            other => panic!("expected IdentityConflict, got: {other:?}"),
        }
        assert_eq!(github_repo.commit_count_sync(repo.id), 0);
    }

    #[tokio::test]
    async fn failing_store_write_leaves_no_partial_batch() {
        let server = MockServer::start().await;
        mount_repo(&server, 42).await;
        let commits: Vec<serde_json::Value> = (1..=5)
            .map(|i| commit_json(&format!("sha{i}"), Some("student-a"), "work"))
            .collect();
        mount_commits(&server, &commits).await;
        mount_prs(&server, &[]).await;

        let github_repo = InMemoryGithubRepo::default();
        github_repo.fail_on_sha("sha3");
        let repo = make_repo(None);
        github_repo.add_repo(repo.clone());

        let syncer = GithubSyncer::new(
            test_client(&server.uri()),
            github_repo.clone(),
            InMemoryActorRepo::default(),
        );
        let err = syncer.sync_repository(&repo, None).await.unwrap_err();
        assert!(matches!(err, SyncError::Store(_)));
        // The batch is all-or-nothing: commit 3 of 5 failed, so none of
        // the five are visible.
        assert_eq!(github_repo.commit_count_sync(repo.id), 0);
    }

    #[tokio::test]
    async fn commit_fetch_http_failure_is_absorbed() {
        let server = MockServer::start().await;
        mount_repo(&server, 42).await;
        Mock::given(method("GET"))
            .and(path("/repos/praxis/demo/commits"))
            .respond_with(ResponseTemplate::new(403).set_body_string("rate limited"))
            .mount(&server)
            .await;
        mount_prs(&server, &[]).await;

        let github_repo = InMemoryGithubRepo::default();
        let repo = make_repo(None);
        github_repo.add_repo(repo.clone());

        let syncer = GithubSyncer::new(
            test_client(&server.uri()),
            github_repo.clone(),
            InMemoryActorRepo::default(),
        );
        let outcome = syncer.sync_repository(&repo, None).await.unwrap();
        assert!(outcome.commits.inserted.is_empty());
        assert_eq!(github_repo.commit_count_sync(repo.id), 0);
    }
}
