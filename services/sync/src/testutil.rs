//! In-memory repository implementations for syncer and orchestrator tests.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use praxis_common::error::{PraxisError, PraxisResult};
use praxis_db::github::models::{Commit, GithubRepo, PullRequest};
use praxis_db::github::repositories::GithubRepository;
use praxis_db::identity::models::{ExternalActor, NewActor, Provider};
use praxis_db::identity::repositories::ActorRepository;
use praxis_db::integration::models::{
    Integration, NewJiraProjectLink, NewRepositoryLink, SyncStatus,
};
use praxis_db::integration::repositories::IntegrationRepository;
use praxis_db::jira::models::{JiraIssue, JiraProject};
use praxis_db::jira::repositories::JiraRepository;
use praxis_db::links::models::WorkLink;
use praxis_db::links::repositories::WorkLinkRepository;

// ── Actors ──────────────────────────────────────────────────────

#[derive(Clone, Default)]
pub struct InMemoryActorRepo {
    actors: Arc<Mutex<Vec<ExternalActor>>>,
}

impl InMemoryActorRepo {
    pub fn len(&self) -> usize {
        self.actors.lock().unwrap().len()
    }
}

#[async_trait]
impl ActorRepository for InMemoryActorRepo {
    async fn get_by_id(&self, id: Uuid) -> PraxisResult<Option<ExternalActor>> {
        Ok(self
            .actors
            .lock()
            .unwrap()
            .iter()
            .find(|a| a.id == id)
            .cloned())
    }

    async fn find_by_external_id(
        &self,
        provider: Provider,
        external_id: &str,
    ) -> PraxisResult<Option<ExternalActor>> {
        Ok(self
            .actors
            .lock()
            .unwrap()
            .iter()
            .find(|a| a.provider == provider && a.external_id == external_id)
            .cloned())
    }

    async fn ensure(&self, actor: NewActor) -> PraxisResult<ExternalActor> {
        let mut actors = self.actors.lock().unwrap();
        if let Some(existing) = actors
            .iter_mut()
            .find(|a| a.provider == actor.provider && a.external_id == actor.external_id)
        {
            existing.login = actor.login;
            existing.display_name = actor.display_name;
            existing.updated_at = Utc::now();
            return Ok(existing.clone());
        }

        let now = Utc::now();
        let created = ExternalActor {
            id: Uuid::new_v4(),
            provider: actor.provider,
            external_id: actor.external_id,
            login: actor.login,
            display_name: actor.display_name,
            kind: actor.kind,
            created_at: now,
            updated_at: now,
        };
        actors.push(created.clone());
        Ok(created)
    }
}

// ── GitHub store ────────────────────────────────────────────────

#[derive(Default)]
struct GithubState {
    repos: Vec<GithubRepo>,
    commits: Vec<Commit>,
    pull_requests: Vec<PullRequest>,
    fail_on_sha: Option<String>,
}

#[derive(Clone, Default)]
pub struct InMemoryGithubRepo {
    state: Arc<Mutex<GithubState>>,
}

impl InMemoryGithubRepo {
    pub fn add_repo(&self, repo: GithubRepo) {
        self.state.lock().unwrap().repos.push(repo);
    }

    /// Make the next commit batch containing this sha fail before any
    /// write, for atomicity tests.
    pub fn fail_on_sha(&self, sha: &str) {
        self.state.lock().unwrap().fail_on_sha = Some(sha.to_string());
    }

    pub fn commit_count_sync(&self, repository_id: Uuid) -> usize {
        self.state
            .lock()
            .unwrap()
            .commits
            .iter()
            .filter(|c| c.repository_id == repository_id)
            .count()
    }

    pub fn all_commits(&self) -> Vec<Commit> {
        self.state.lock().unwrap().commits.clone()
    }

    pub fn all_pull_requests(&self) -> Vec<PullRequest> {
        self.state.lock().unwrap().pull_requests.clone()
    }
}

#[async_trait]
impl GithubRepository for InMemoryGithubRepo {
    async fn get_repo(&self, id: Uuid) -> PraxisResult<Option<GithubRepo>> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .repos
            .iter()
            .find(|r| r.id == id)
            .cloned())
    }

    async fn find_repo(&self, owner: &str, name: &str) -> PraxisResult<Option<GithubRepo>> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .repos
            .iter()
            .find(|r| r.owner == owner && r.name == name)
            .cloned())
    }

    async fn record_provider_identity(
        &self,
        id: Uuid,
        github_id: i64,
        default_branch: Option<&str>,
        private: Option<bool>,
    ) -> PraxisResult<()> {
        let mut state = self.state.lock().unwrap();
        let repo = state
            .repos
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| PraxisError::NotFound(format!("github repository {id}")))?;
        if matches!(repo.github_id, Some(known) if known != github_id) {
            return Err(PraxisError::Validation(format!(
                "refusing to overwrite provider id of repository {id}"
            )));
        }
        repo.github_id = Some(github_id);
        repo.default_branch = default_branch.map(str::to_string);
        repo.private = private;
        Ok(())
    }

    async fn existing_shas(
        &self,
        repository_id: Uuid,
        shas: &[String],
    ) -> PraxisResult<HashSet<String>> {
        let state = self.state.lock().unwrap();
        Ok(state
            .commits
            .iter()
            .filter(|c| c.repository_id == repository_id && shas.contains(&c.sha))
            .map(|c| c.sha.clone())
            .collect())
    }

    async fn insert_commits(&self, commits: &[Commit]) -> PraxisResult<usize> {
        let mut state = self.state.lock().unwrap();

        // All-or-nothing: validate the whole batch before touching state.
        if let Some(fail_sha) = &state.fail_on_sha {
            if commits.iter().any(|c| &c.sha == fail_sha) {
                return Err(PraxisError::Database(format!(
                    "injected failure on {fail_sha}"
                )));
            }
        }

        let mut inserted = 0usize;
        for commit in commits {
            let exists = state
                .commits
                .iter()
                .any(|c| c.repository_id == commit.repository_id && c.sha == commit.sha);
            if !exists {
                state.commits.push(commit.clone());
                inserted += 1;
            }
        }
        Ok(inserted)
    }

    async fn commit_count(&self, repository_id: Uuid) -> PraxisResult<i64> {
        Ok(self.commit_count_sync(repository_id) as i64)
    }

    async fn find_pull_request(
        &self,
        repository_id: Uuid,
        number: i64,
    ) -> PraxisResult<Option<PullRequest>> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .pull_requests
            .iter()
            .find(|pr| pr.repository_id == repository_id && pr.number == number)
            .cloned())
    }

    async fn insert_pull_request(&self, pr: &PullRequest) -> PraxisResult<()> {
        let mut state = self.state.lock().unwrap();
        if state
            .pull_requests
            .iter()
            .any(|p| p.repository_id == pr.repository_id && p.number == pr.number)
        {
            return Err(PraxisError::Database(format!(
                "duplicate pull request #{}",
                pr.number
            )));
        }
        state.pull_requests.push(pr.clone());
        Ok(())
    }

    async fn update_pull_request(&self, pr: &PullRequest) -> PraxisResult<()> {
        let mut state = self.state.lock().unwrap();
        let existing = state
            .pull_requests
            .iter_mut()
            .find(|p| p.repository_id == pr.repository_id && p.number == pr.number)
            .ok_or_else(|| PraxisError::NotFound(format!("pull request #{}", pr.number)))?;
        *existing = pr.clone();
        Ok(())
    }

    async fn list_commits_paged(
        &self,
        repository_id: Uuid,
        page: u32,
        page_size: u32,
    ) -> PraxisResult<Vec<Commit>> {
        let state = self.state.lock().unwrap();
        let offset = (page.saturating_sub(1) as usize) * page_size as usize;
        Ok(state
            .commits
            .iter()
            .filter(|c| c.repository_id == repository_id)
            .skip(offset)
            .take(page_size as usize)
            .cloned()
            .collect())
    }
}

// ── Jira store ──────────────────────────────────────────────────

#[derive(Default)]
struct JiraState {
    projects: Vec<JiraProject>,
    issues: Vec<JiraIssue>,
}

#[derive(Clone, Default)]
pub struct InMemoryJiraRepo {
    state: Arc<Mutex<JiraState>>,
}

impl InMemoryJiraRepo {
    pub fn add_project(&self, project: JiraProject) {
        self.state.lock().unwrap().projects.push(project);
    }

    pub fn add_issue(&self, issue: JiraIssue) {
        self.state.lock().unwrap().issues.push(issue);
    }

    pub fn issue_count_sync(&self, jira_project_id: Uuid) -> usize {
        self.state
            .lock()
            .unwrap()
            .issues
            .iter()
            .filter(|i| i.jira_project_id == jira_project_id)
            .count()
    }

    pub fn find_issue_by_key_sync(&self, issue_key: &str) -> Option<JiraIssue> {
        self.state
            .lock()
            .unwrap()
            .issues
            .iter()
            .find(|i| i.issue_key == issue_key)
            .cloned()
    }
}

#[async_trait]
impl JiraRepository for InMemoryJiraRepo {
    async fn get_project(&self, id: Uuid) -> PraxisResult<Option<JiraProject>> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .projects
            .iter()
            .find(|p| p.id == id)
            .cloned())
    }

    async fn find_project_by_key(&self, key: &str) -> PraxisResult<Option<JiraProject>> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .projects
            .iter()
            .find(|p| p.key == key)
            .cloned())
    }

    async fn find_issue_by_key(&self, issue_key: &str) -> PraxisResult<Option<JiraIssue>> {
        Ok(self.find_issue_by_key_sync(issue_key))
    }

    async fn insert_issue(&self, issue: &JiraIssue) -> PraxisResult<()> {
        let mut state = self.state.lock().unwrap();
        if state.issues.iter().any(|i| i.issue_key == issue.issue_key) {
            return Err(PraxisError::Database(format!(
                "duplicate issue {}",
                issue.issue_key
            )));
        }
        state.issues.push(issue.clone());
        Ok(())
    }

    async fn update_issue(&self, issue: &JiraIssue) -> PraxisResult<()> {
        let mut state = self.state.lock().unwrap();
        let existing = state
            .issues
            .iter_mut()
            .find(|i| i.issue_key == issue.issue_key)
            .ok_or_else(|| PraxisError::NotFound(format!("jira issue {}", issue.issue_key)))?;
        *existing = issue.clone();
        Ok(())
    }

    async fn issue_count(
        &self,
        jira_project_id: Uuid,
        status: Option<&str>,
    ) -> PraxisResult<i64> {
        let state = self.state.lock().unwrap();
        Ok(state
            .issues
            .iter()
            .filter(|i| i.jira_project_id == jira_project_id)
            .filter(|i| status.map_or(true, |s| i.status == s))
            .count() as i64)
    }

    async fn last_issue_update(
        &self,
        jira_project_id: Uuid,
    ) -> PraxisResult<Option<DateTime<Utc>>> {
        let state = self.state.lock().unwrap();
        Ok(state
            .issues
            .iter()
            .filter(|i| i.jira_project_id == jira_project_id)
            .filter_map(|i| i.updated_at_jira)
            .max())
    }

    async fn list_issues_paged(
        &self,
        jira_project_id: Uuid,
        page: u32,
        page_size: u32,
    ) -> PraxisResult<Vec<JiraIssue>> {
        let state = self.state.lock().unwrap();
        let offset = (page.saturating_sub(1) as usize) * page_size as usize;
        Ok(state
            .issues
            .iter()
            .filter(|i| i.jira_project_id == jira_project_id)
            .skip(offset)
            .take(page_size as usize)
            .cloned()
            .collect())
    }
}

// ── Work links ──────────────────────────────────────────────────

#[derive(Clone, Default)]
pub struct InMemoryWorkLinkRepo {
    links: Arc<Mutex<Vec<WorkLink>>>,
}

impl InMemoryWorkLinkRepo {
    pub fn len(&self) -> usize {
        self.links.lock().unwrap().len()
    }

    pub fn links_for_issue_sync(&self, jira_issue_id: Uuid) -> Vec<WorkLink> {
        self.links
            .lock()
            .unwrap()
            .iter()
            .filter(|l| l.jira_issue_id == jira_issue_id)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl WorkLinkRepository for InMemoryWorkLinkRepo {
    async fn record(&self, link: &WorkLink) -> PraxisResult<bool> {
        let mut links = self.links.lock().unwrap();
        let exists = links.iter().any(|l| {
            l.jira_issue_id == link.jira_issue_id
                && l.repository_id == link.repository_id
                && l.artifact_ref == link.artifact_ref
                && l.kind == link.kind
        });
        if exists {
            return Ok(false);
        }
        links.push(link.clone());
        Ok(true)
    }

    async fn links_for_issue(&self, jira_issue_id: Uuid) -> PraxisResult<Vec<WorkLink>> {
        Ok(self.links_for_issue_sync(jira_issue_id))
    }

    async fn links_for_artifact(
        &self,
        repository_id: Uuid,
        artifact_ref: &str,
    ) -> PraxisResult<Vec<WorkLink>> {
        Ok(self
            .links
            .lock()
            .unwrap()
            .iter()
            .filter(|l| l.repository_id == repository_id && l.artifact_ref == artifact_ref)
            .cloned()
            .collect())
    }
}

// ── Integrations ────────────────────────────────────────────────

#[derive(Clone, Default)]
pub struct InMemoryIntegrationRepo {
    integrations: Arc<Mutex<Vec<Integration>>>,
}

impl InMemoryIntegrationRepo {
    pub fn add_integration(
        &self,
        repository_id: Option<Uuid>,
        jira_project_id: Option<Uuid>,
    ) -> Uuid {
        let now = Utc::now();
        let integration = Integration {
            id: Uuid::new_v4(),
            project_id: Uuid::new_v4(),
            repository_id,
            jira_project_id,
            last_synced_at: None,
            last_status: SyncStatus::Success,
            last_error: None,
            created_at: now,
            updated_at: now,
        };
        let id = integration.id;
        self.integrations.lock().unwrap().push(integration);
        id
    }

    pub fn get_sync(&self, id: Uuid) -> Integration {
        self.integrations
            .lock()
            .unwrap()
            .iter()
            .find(|i| i.id == id)
            .cloned()
            .expect("integration present")
    }

    pub fn set_status(&self, id: Uuid, status: SyncStatus) {
        let mut integrations = self.integrations.lock().unwrap();
        let integration = integrations
            .iter_mut()
            .find(|i| i.id == id)
            .expect("integration present");
        integration.last_status = status;
        integration.updated_at = Utc::now();
    }

    pub fn clear_last_synced(&self, id: Uuid) {
        let mut integrations = self.integrations.lock().unwrap();
        let integration = integrations
            .iter_mut()
            .find(|i| i.id == id)
            .expect("integration present");
        integration.last_synced_at = None;
    }
}

#[async_trait]
impl IntegrationRepository for InMemoryIntegrationRepo {
    async fn get(&self, id: Uuid) -> PraxisResult<Option<Integration>> {
        Ok(self
            .integrations
            .lock()
            .unwrap()
            .iter()
            .find(|i| i.id == id)
            .cloned())
    }

    async fn find_by_project(&self, project_id: Uuid) -> PraxisResult<Option<Integration>> {
        Ok(self
            .integrations
            .lock()
            .unwrap()
            .iter()
            .find(|i| i.project_id == project_id)
            .cloned())
    }

    async fn list_syncable(&self) -> PraxisResult<Vec<Integration>> {
        Ok(self
            .integrations
            .lock()
            .unwrap()
            .iter()
            .filter(|i| i.repository_id.is_some() || i.jira_project_id.is_some())
            .cloned()
            .collect())
    }

    async fn link_repository(
        &self,
        project_id: Uuid,
        _link: NewRepositoryLink,
    ) -> PraxisResult<Integration> {
        let mut integrations = self.integrations.lock().unwrap();
        let now = Utc::now();
        if let Some(existing) = integrations.iter_mut().find(|i| i.project_id == project_id) {
            existing.repository_id = Some(Uuid::new_v4());
            existing.updated_at = now;
            return Ok(existing.clone());
        }
        let integration = Integration {
            id: Uuid::new_v4(),
            project_id,
            repository_id: Some(Uuid::new_v4()),
            jira_project_id: None,
            last_synced_at: None,
            last_status: SyncStatus::Pending,
            last_error: None,
            created_at: now,
            updated_at: now,
        };
        integrations.push(integration.clone());
        Ok(integration)
    }

    async fn link_jira_project(
        &self,
        project_id: Uuid,
        _link: NewJiraProjectLink,
    ) -> PraxisResult<Integration> {
        let mut integrations = self.integrations.lock().unwrap();
        let now = Utc::now();
        if let Some(existing) = integrations.iter_mut().find(|i| i.project_id == project_id) {
            existing.jira_project_id = Some(Uuid::new_v4());
            existing.updated_at = now;
            return Ok(existing.clone());
        }
        let integration = Integration {
            id: Uuid::new_v4(),
            project_id,
            repository_id: None,
            jira_project_id: Some(Uuid::new_v4()),
            last_synced_at: None,
            last_status: SyncStatus::Pending,
            last_error: None,
            created_at: now,
            updated_at: now,
        };
        integrations.push(integration.clone());
        Ok(integration)
    }

    async fn begin_sync(
        &self,
        id: Uuid,
        stale_after_secs: i64,
    ) -> PraxisResult<Option<Integration>> {
        let mut integrations = self.integrations.lock().unwrap();
        let integration = match integrations.iter_mut().find(|i| i.id == id) {
            Some(i) => i,
            None => return Ok(None),
        };

        let stale_before = Utc::now() - Duration::seconds(stale_after_secs);
        if integration.last_status == SyncStatus::Pending
            && integration.updated_at >= stale_before
        {
            return Ok(None);
        }

        integration.last_status = SyncStatus::Pending;
        integration.last_error = None;
        integration.updated_at = Utc::now();
        Ok(Some(integration.clone()))
    }

    async fn mark_success(&self, id: Uuid) -> PraxisResult<Integration> {
        let mut integrations = self.integrations.lock().unwrap();
        let integration = integrations
            .iter_mut()
            .find(|i| i.id == id)
            .ok_or_else(|| PraxisError::NotFound(format!("integration {id}")))?;
        integration.last_status = SyncStatus::Success;
        integration.last_synced_at = Some(Utc::now());
        integration.last_error = None;
        integration.updated_at = Utc::now();
        Ok(integration.clone())
    }

    async fn mark_error(&self, id: Uuid, message: &str) -> PraxisResult<Integration> {
        let mut integrations = self.integrations.lock().unwrap();
        let integration = integrations
            .iter_mut()
            .find(|i| i.id == id)
            .ok_or_else(|| PraxisError::NotFound(format!("integration {id}")))?;
        integration.last_status = SyncStatus::Error;
        integration.last_error = Some(message.to_string());
        integration.updated_at = Utc::now();
        Ok(integration.clone())
    }
}
