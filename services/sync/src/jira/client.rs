use std::time::Duration;

use chrono::{DateTime, Utc};
use reqwest::{Client, StatusCode};

use super::models::{ApiIssue, ApiProject, JiraSearchResponse};
use super::query::{build_issue_count_jql, build_last_update_jql};

#[derive(Debug, Clone)]
pub struct JiraClientConfig {
    pub email: String,
    pub api_token: String,
    pub max_results: u32,
    pub max_retries: u32,
    pub timeout_secs: u64,
}

impl JiraClientConfig {
    /// Load Jira credentials from environment.
    ///
    /// Returns `None` when Jira is not configured (email / token missing);
    /// the site URL is not part of the environment: it lives on each
    /// integration and is supplied per call.
    pub fn from_env() -> Option<Self> {
        let email = std::env::var("JIRA_EMAIL").ok()?;
        let api_token = std::env::var("JIRA_API_TOKEN").ok()?;
        let max_results = std::env::var("JIRA_MAX_RESULTS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(50);
        let max_retries = std::env::var("JIRA_MAX_RETRIES")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(3);
        let timeout_secs = std::env::var("JIRA_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(30);

        Some(Self {
            email,
            api_token,
            max_results,
            max_retries,
            timeout_secs,
        })
    }
}

#[derive(Clone)]
pub struct JiraClient {
    client: Client,
    config: JiraClientConfig,
}

#[derive(Debug, thiserror::Error)]
pub enum JiraClientError {
    #[error("HTTP {status}: {body}")]
    Http { status: StatusCode, body: String },

    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("unexpected response body: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("max retries exceeded after {attempts} attempts: {last_error}")]
    MaxRetriesExceeded { attempts: u32, last_error: String },
}

impl JiraClientError {
    /// The site answered, just not with a 2xx.
    pub fn is_http(&self) -> bool {
        matches!(self, Self::Http { .. })
    }

    /// DNS/connect/timeout-level failure, meaning the site never answered. Kept
    /// distinct from [`Self::is_http`] so operators can tell a
    /// misconfigured URL from an API that returned an error.
    pub fn is_network(&self) -> bool {
        match self {
            Self::Request(e) => e.is_connect() || e.is_timeout(),
            Self::MaxRetriesExceeded { .. } => true,
            _ => false,
        }
    }
}

/// Pre-flight check of an integration's Jira site URL. Returns a human
/// description of the problem for unparseable URLs, non-http schemes and
/// RFC 2606 placeholder hosts: the classes of misconfiguration that are
/// detectable without sending a request.
pub fn site_url_problem(raw: &str) -> Option<String> {
    let parsed = match url::Url::parse(raw) {
        Ok(u) => u,
        Err(e) => return Some(format!("unparseable url: {e}")),
    };

    if !matches!(parsed.scheme(), "http" | "https") {
        return Some(format!("unsupported scheme: {}", parsed.scheme()));
    }

    let host = match parsed.host() {
        Some(h) => h,
        None => return Some("missing host".to_string()),
    };

    if let url::Host::Domain(domain) = host {
        let d = domain.to_ascii_lowercase();
        let placeholder_hosts = ["localhost", "example.com", "example.org", "example.net"];
        let placeholder_tlds = [".test", ".invalid", ".example", ".localhost"];
        let is_placeholder = placeholder_hosts
            .iter()
            .any(|h| d == *h || d.ends_with(&format!(".{h}")))
            || placeholder_tlds.iter().any(|t| d.ends_with(t));
        if is_placeholder {
            return Some(format!("placeholder host: {domain}"));
        }
    }

    None
}

enum LastFailure {
    None,
    Http(StatusCode, String),
    Network(String),
}

impl JiraClient {
    pub fn new(config: JiraClientConfig) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self { client, config })
    }

    /// Probe `GET {site}/rest/api/3/project/{key}`. Any non-2xx answer
    /// maps to `false`; only transport failures are errors.
    pub async fn validate_project(
        &self,
        site_url: &str,
        key: &str,
    ) -> Result<bool, JiraClientError> {
        let url = format!("{}/rest/api/3/project/{key}", site_url.trim_end_matches('/'));
        match self.get_with_retry(&url).await {
            Ok(body) => {
                let _: ApiProject = serde_json::from_str(&body)?;
                Ok(true)
            }
            Err(e) if e.is_http() => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// All issues matching a JQL query, following `startAt` pagination.
    pub async fn search_issues(
        &self,
        site_url: &str,
        jql: &str,
    ) -> Result<Vec<ApiIssue>, JiraClientError> {
        let base = site_url.trim_end_matches('/');
        let max_results = self.config.max_results;
        let mut start_at = 0u32;
        let mut all_issues = Vec::new();

        loop {
            let url = format!(
                "{base}/rest/api/3/search?jql={jql}&startAt={start_at}&maxResults={max_results}"
            );
            let body = self.get_with_retry(&url).await?;
            let page: JiraSearchResponse = serde_json::from_str(&body)?;

            let page_len = page.issues.len() as u32;
            all_issues.extend(page.issues);

            start_at += page_len;
            if page_len < max_results || start_at >= page.total {
                break;
            }
        }

        Ok(all_issues)
    }

    /// Number of issues in a project (optionally one status), read off the
    /// search envelope's `total` without fetching issues. Read-only; never
    /// touches local state.
    #[allow(dead_code)] // consumed by reporting collaborators
    pub async fn issue_count(
        &self,
        site_url: &str,
        key: &str,
        status: Option<&str>,
    ) -> Result<i64, JiraClientError> {
        let jql = build_issue_count_jql(key, status);
        let url = format!(
            "{}/rest/api/3/search?jql={jql}&maxResults=0",
            site_url.trim_end_matches('/')
        );
        let body = self.get_with_retry(&url).await?;
        let page: JiraSearchResponse = serde_json::from_str(&body)?;
        Ok(i64::from(page.total))
    }

    /// Update time of the most recently touched issue, or `None` for an
    /// empty project. Read-only; never touches local state.
    #[allow(dead_code)] // consumed by reporting collaborators
    pub async fn last_update_date(
        &self,
        site_url: &str,
        key: &str,
    ) -> Result<Option<DateTime<Utc>>, JiraClientError> {
        let jql = build_last_update_jql(key);
        let url = format!(
            "{}/rest/api/3/search?jql={jql}&maxResults=1",
            site_url.trim_end_matches('/')
        );
        let body = self.get_with_retry(&url).await?;
        let page: JiraSearchResponse = serde_json::from_str(&body)?;
        Ok(page.issues.first().and_then(|i| i.fields.updated))
    }

    async fn get_with_retry(&self, url: &str) -> Result<String, JiraClientError> {
        let mut last = LastFailure::None;

        for attempt in 0..=self.config.max_retries {
            if attempt > 0 {
                let backoff_secs = std::cmp::min(1u64 << attempt, 30);
                tracing::warn!(attempt, backoff_secs, "retrying after backoff");
                tokio::time::sleep(Duration::from_secs(backoff_secs)).await;
            }

            let response = match self
                .client
                .get(url)
                .basic_auth(&self.config.email, Some(&self.config.api_token))
                .send()
                .await
            {
                Ok(resp) => resp,
                Err(e) => {
                    if e.is_timeout() || e.is_connect() {
                        last = LastFailure::Network(e.to_string());
                        continue;
                    }
                    return Err(JiraClientError::Request(e));
                }
            };

            let status = response.status();

            if status.is_success() {
                return response.text().await.map_err(JiraClientError::Request);
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
            return Err(JiraClientError::Http { status, body });
        }

        match last {
            LastFailure::Http(status, body) => Err(JiraClientError::Http { status, body }),
            LastFailure::Network(last_error) => Err(JiraClientError::MaxRetriesExceeded {
                attempts: self.config.max_retries + 1,
                last_error,
            }),
            LastFailure::None => Err(JiraClientError::MaxRetriesExceeded {
                attempts: self.config.max_retries + 1,
                last_error: String::new(),
            }),
        }
    }
}
