use std::time::Duration;

use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::{Client, StatusCode};

use super::models::{ApiCommit, ApiPullRequest, ApiRepository};

const DEFAULT_BASE_URL: &str = "https://api.github.com";
const DEFAULT_USER_AGENT: &str = "praxis-sync";

#[derive(Debug, Clone)]
pub struct GithubClientConfig {
    pub base_url: String,
    /// Bearer token; unauthenticated requests work for public repositories
    /// at a lower rate limit.
    pub token: Option<String>,
    pub user_agent: String,
    pub per_page: u32,
    pub max_retries: u32,
    pub timeout_secs: u64,
}

impl GithubClientConfig {
    pub fn from_env() -> Self {
        Self {
            base_url: std::env::var("GITHUB_API_BASE_URL")
                .unwrap_or_else(|_| DEFAULT_BASE_URL.to_string()),
            token: std::env::var("GITHUB_TOKEN").ok(),
            user_agent: std::env::var("GITHUB_USER_AGENT")
                .unwrap_or_else(|_| DEFAULT_USER_AGENT.to_string()),
            per_page: std::env::var("GITHUB_PER_PAGE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(100),
            max_retries: std::env::var("GITHUB_MAX_RETRIES")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(3),
            timeout_secs: std::env::var("GITHUB_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(30),
        }
    }
}

#[derive(Clone)]
pub struct GithubClient {
    client: Client,
    config: GithubClientConfig,
}

#[derive(Debug, thiserror::Error)]
pub enum GithubClientError {
    #[error("HTTP {status}: {body}")]
    Http { status: StatusCode, body: String },

    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("unexpected response body: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("max retries exceeded after {attempts} attempts: {last_error}")]
    MaxRetriesExceeded { attempts: u32, last_error: String },
}

impl GithubClientError {
    /// The provider answered, just not with a 2xx.
    pub fn is_http(&self) -> bool {
        matches!(self, Self::Http { .. })
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Http { status, .. } if *status == StatusCode::NOT_FOUND)
    }

    /// 404 on the repository itself; 409 is what GitHub returns when
    /// listing commits of an empty repository.
    fn is_absent_or_empty(&self) -> bool {
        matches!(
            self,
            Self::Http { status, .. }
                if *status == StatusCode::NOT_FOUND || *status == StatusCode::CONFLICT
        )
    }
}

/// What the last retried attempt failed with, so exhaustion reports the
/// right error class: repeated 5xx stays an HTTP failure, repeated
/// connect/timeout stays a transport failure.
enum LastFailure {
    None,
    Http(StatusCode, String),
    Network(String),
}

impl GithubClient {
    pub fn new(config: GithubClientConfig) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self { client, config })
    }

    /// For testing: point the client at a specific base URL (e.g., wiremock).
    #[cfg(test)]
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.config.base_url = base_url.to_string();
        self
    }

    /// Probe `GET /repos/{owner}/{repo}`. Any non-2xx answer means "not
    /// usable" and maps to `false`; only transport failures are errors.
    #[allow(dead_code)] // consumed by the project-linking flow
    pub async fn validate_repository(
        &self,
        owner: &str,
        name: &str,
    ) -> Result<bool, GithubClientError> {
        match self.fetch_repository(owner, name).await {
            Ok(found) => Ok(found.is_some()),
            Err(e) if e.is_http() => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Repository metadata, or `None` on 404.
    pub async fn fetch_repository(
        &self,
        owner: &str,
        name: &str,
    ) -> Result<Option<ApiRepository>, GithubClientError> {
        let url = format!("{}/repos/{owner}/{name}", self.config.base_url);
        match self.get_with_retry(&url).await {
            Ok((body, _)) => Ok(Some(serde_json::from_str(&body)?)),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// One page of most-recent commits, optionally bounded by `since`.
    /// An empty repository yields an empty page, not an error.
    pub async fn fetch_recent_commits(
        &self,
        owner: &str,
        name: &str,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<ApiCommit>, GithubClientError> {
        let mut url = format!(
            "{}/repos/{owner}/{name}/commits?per_page={}",
            self.config.base_url, self.config.per_page
        );
        if let Some(since) = since {
            url.push_str(&format!(
                "&since={}",
                since.to_rfc3339_opts(SecondsFormat::Secs, true)
            ));
        }

        match self.get_with_retry(&url).await {
            Ok((body, _)) => Ok(serde_json::from_str(&body)?),
            Err(e) if e.is_absent_or_empty() => Ok(Vec::new()),
            Err(e) => Err(e),
        }
    }

    /// Every pull request regardless of state, following the `Link`
    /// `rel="last"` marker; no header means a single page.
    pub async fn fetch_pull_requests(
        &self,
        owner: &str,
        name: &str,
    ) -> Result<Vec<ApiPullRequest>, GithubClientError> {
        let first_url = format!(
            "{}/repos/{owner}/{name}/pulls?state=all&per_page={}&page=1",
            self.config.base_url, self.config.per_page
        );

        let (body, link) = self.get_with_retry(&first_url).await?;
        let mut all: Vec<ApiPullRequest> = serde_json::from_str(&body)?;

        let last_page = link.as_deref().and_then(parse_last_page).unwrap_or(1);
        for page in 2..=last_page {
            let url = format!(
                "{}/repos/{owner}/{name}/pulls?state=all&per_page={}&page={page}",
                self.config.base_url, self.config.per_page
            );
            let (body, _) = self.get_with_retry(&url).await?;
            let page_items: Vec<ApiPullRequest> = serde_json::from_str(&body)?;
            all.extend(page_items);
        }

        Ok(all)
    }

    /// Commit count since a bound, without fetching the commits: request a
    /// single-commit page and read the page total off `rel="last"`.
    /// Read-only; never touches local state.
    #[allow(dead_code)] // consumed by reporting collaborators
    pub async fn commit_count(
        &self,
        owner: &str,
        name: &str,
        since: Option<DateTime<Utc>>,
    ) -> Result<i64, GithubClientError> {
        let mut url = format!(
            "{}/repos/{owner}/{name}/commits?per_page=1",
            self.config.base_url
        );
        if let Some(since) = since {
            url.push_str(&format!(
                "&since={}",
                since.to_rfc3339_opts(SecondsFormat::Secs, true)
            ));
        }

        match self.get_with_retry(&url).await {
            Ok((body, link)) => {
                if let Some(last) = link.as_deref().and_then(parse_last_page) {
                    return Ok(i64::from(last));
                }
                let page: Vec<ApiCommit> = serde_json::from_str(&body)?;
                Ok(page.len() as i64)
            }
            Err(e) if e.is_absent_or_empty() => Ok(0),
            Err(e) => Err(e),
        }
    }

    /// Timestamp of the newest commit, or `None` when there is none.
    /// Read-only; never touches local state.
    #[allow(dead_code)] // consumed by reporting collaborators
    pub async fn last_commit_date(
        &self,
        owner: &str,
        name: &str,
    ) -> Result<Option<DateTime<Utc>>, GithubClientError> {
        let url = format!(
            "{}/repos/{owner}/{name}/commits?per_page=1",
            self.config.base_url
        );

        match self.get_with_retry(&url).await {
            Ok((body, _)) => {
                let page: Vec<ApiCommit> = serde_json::from_str(&body)?;
                Ok(page.first().and_then(|c| {
                    c.commit
                        .committer
                        .as_ref()
                        .and_then(|s| s.date)
                        .or_else(|| c.commit.author.as_ref().and_then(|s| s.date))
                }))
            }
            Err(e) if e.is_absent_or_empty() => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// GET with retry on transient failures, returning the body and the
    /// `Link` response header.
    async fn get_with_retry(
        &self,
        url: &str,
    ) -> Result<(String, Option<String>), GithubClientError> {
        let mut last = LastFailure::None;

        for attempt in 0..=self.config.max_retries {
            if attempt > 0 {
                let backoff_secs = std::cmp::min(1u64 << attempt, 30);
                tracing::warn!(attempt, backoff_secs, "retrying after backoff");
                tokio::time::sleep(Duration::from_secs(backoff_secs)).await;
            }

            let mut request = self
                .client
                .get(url)
                .header("User-Agent", &self.config.user_agent)
                .header("Accept", "application/vnd.github+json");
            if let Some(token) = &self.config.token {
                request = request.bearer_auth(token);
            }

            let response = match request.send().await {
                Ok(resp) => resp,
                Err(e) => {
                    if e.is_timeout() || e.is_connect() {
                        last = LastFailure::Network(e.to_string());
                        continue;
                    }
                    return Err(GithubClientError::Request(e));
                }
            };

            let status = response.status();

            if status.is_success() {
                let link = response
                    .headers()
                    .get("link")
                    .and_then(|v| v.to_str().ok())
                    .map(|s| s.to_string());
                let body = response.text().await.map_err(GithubClientError::Request)?;
                return Ok((body, link));
            }

            // Honor Retry-After header for 429
            if status == StatusCode::TOO_MANY_REQUESTS {
                if let Some(retry_after) = response
                    .headers()
                    .get("retry-after")
                    .and_then(|v| v.to_str().ok())
                    .and_then(|v| v.parse::<u64>().ok())
                {
                    let wait = std::cmp::min(retry_after, 60);
                    tracing::warn!(wait, "rate-limited, waiting Retry-After");
                    tokio::time::sleep(Duration::from_secs(wait)).await;
                }
                last = LastFailure::Http(status, "429 Too Many Requests".to_string());
                continue;
            }

            // Retry on 5xx
            if status.is_server_error() {
                let body = response.text().await.unwrap_or_default();
                last = LastFailure::Http(status, body);
                continue;
            }

            // Fail fast on 4xx (except 429 handled above)
            let body = response.text().await.unwrap_or_default();
            return Err(GithubClientError::Http { status, body });
        }

        match last {
            LastFailure::Http(status, body) => Err(GithubClientError::Http { status, body }),
            LastFailure::Network(last_error) => Err(GithubClientError::MaxRetriesExceeded {
                attempts: self.config.max_retries + 1,
                last_error,
            }),
            LastFailure::None => Err(GithubClientError::MaxRetriesExceeded {
                attempts: self.config.max_retries + 1,
                last_error: String::new(),
            }),
        }
    }
}

/// Extract the page number of the `rel="last"` entry from a `Link` header.
pub(crate) fn parse_last_page(link_header: &str) -> Option<u32> {
    for part in link_header.split(',') {
        let part = part.trim();
        if !part.contains("rel=\"last\"") {
            continue;
        }
        let url = part
            .split(';')
            .next()?
            .trim()
            .trim_start_matches('<')
            .trim_end_matches('>');
        let query = url.split('?').nth(1)?;
        for pair in query.split('&') {
            if let Some(v) = pair.strip_prefix("page=") {
                return v.parse().ok();
            }
        }
    }
    None
}
