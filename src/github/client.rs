use crate::domain::model::ApiResponse;
use crate::utils::error::{MinerError, Result};
use reqwest::header::{HeaderMap, ACCEPT, AUTHORIZATION, LINK};
use reqwest::{Client, StatusCode};
use serde_json::Value;
use std::time::Duration;

pub const GITHUB_API_URL: &str = "https://api.github.com";
pub const DEFAULT_USER_AGENT: &str = "repo-miner";
pub const MAX_PAGE_SIZE: usize = 100;

// mercy-preview returns repository topics
const GITHUB_ACCEPT: &str = "application/vnd.github.mercy-preview+json";

const RETRY_AFTER: &str = "Retry-After";
const X_RATELIMIT_RESET: &str = "X-RateLimit-Reset";

const SECONDARY_LIMIT_MESSAGE: &str = "You have exceeded a secondary rate limit.";
const PRIMARY_LIMIT_MESSAGE: &str = "API rate limit exceeded";

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub retry_wait: Duration,
    /// Sleep after a 504, GitHub's answer to a temporarily banned client.
    pub ban_wait: Duration,
    /// Added to the primary rate limit reset time for clock skew.
    pub time_divergence: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 10,
            retry_wait: Duration::from_secs(10),
            ban_wait: Duration::from_secs(600),
            time_divergence: Duration::from_secs(300),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ClientSettings {
    pub api_url: String,
    pub user_agent: String,
    pub timeout: Duration,
    pub retry: RetryPolicy,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            api_url: GITHUB_API_URL.to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            timeout: Duration::from_secs(60),
            retry: RetryPolicy::default(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct GithubClient {
    http: Client,
    settings: ClientSettings,
}

impl GithubClient {
    pub fn new(settings: ClientSettings) -> Result<Self> {
        let http = Client::builder()
            .user_agent(settings.user_agent.clone())
            .timeout(settings.timeout)
            .build()?;
        Ok(Self { http, settings })
    }

    pub fn api_url(&self) -> &str {
        self.settings.api_url.trim_end_matches('/')
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.settings.retry
    }

    /// `{api}/repos/{owner}/{name}/{path}`; an empty `path` addresses the repository itself.
    pub fn repo_url(&self, owner: &str, name: &str, path: &str) -> String {
        if path.is_empty() {
            format!("{}/repos/{}/{}", self.api_url(), owner, name)
        } else {
            format!("{}/repos/{}/{}/{}", self.api_url(), owner, name, path)
        }
    }

    /// Authenticated GET with retries. Rate limits and bans are slept through
    /// before the attempt counts as failed.
    pub async fn get(&self, token: &str, url: &str) -> Result<ApiResponse> {
        let policy = &self.settings.retry;
        let mut attempt = 0;

        loop {
            attempt += 1;
            match self.get_once(token, url).await {
                Ok(response) => return Ok(response),
                Err(e) if e.is_retryable() && attempt < policy.max_attempts => {
                    tracing::info!(
                        "Attempt {}/{} for {} failed: {}; retrying in {:?}",
                        attempt,
                        policy.max_attempts,
                        url,
                        e,
                        policy.retry_wait
                    );
                    tokio::time::sleep(policy.retry_wait).await;
                }
                Err(e) => {
                    if e.is_retryable() {
                        tracing::error!("Not processed: url {} after {} attempts", url, attempt);
                    }
                    return Err(e);
                }
            }
        }
    }

    async fn get_once(&self, token: &str, url: &str) -> Result<ApiResponse> {
        tracing::debug!("Trying to make a request: {}", url);

        let response = self
            .http
            .get(url)
            .header(AUTHORIZATION, format!("token {}", token))
            .header(ACCEPT, GITHUB_ACCEPT)
            .send()
            .await
            .map_err(|e| {
                MinerError::api(url, format!("Error happened while performing the request: {}", e))
            })?;

        match response.status() {
            StatusCode::OK => {
                let next = response
                    .headers()
                    .get(LINK)
                    .and_then(|value| value.to_str().ok())
                    .and_then(parse_next_link);
                let data: Value = response
                    .json()
                    .await
                    .map_err(|e| MinerError::api(url, format!("Invalid JSON body: {}", e)))?;
                tracing::debug!("Success");
                Ok(ApiResponse { data, next })
            }
            StatusCode::FORBIDDEN => Err(self.handle_rate_limit(url, response).await),
            StatusCode::GATEWAY_TIMEOUT => Err(self.handle_ban(url).await),
            StatusCode::NOT_FOUND
            | StatusCode::CONFLICT
            | StatusCode::UNPROCESSABLE_ENTITY
            | StatusCode::UNAVAILABLE_FOR_LEGAL_REASONS => {
                let status = response.status().as_u16();
                let body: Option<Value> = response.json().await.ok();
                let message = body
                    .as_ref()
                    .and_then(|b| b.get("message"))
                    .and_then(Value::as_str)
                    .map(str::to_string)
                    .unwrap_or_else(|| {
                        format!("No \"message\" key in response. HTTP code {}.", status)
                    });
                tracing::error!("{} for {}", message, url);
                Err(MinerError::NotRetryableError {
                    url: url.to_string(),
                    message,
                })
            }
            status => {
                let message = format!("HTTP code {}", status.as_u16());
                tracing::error!("{} for {}", message, url);
                Err(MinerError::api(url, message))
            }
        }
    }

    async fn handle_ban(&self, url: &str) -> MinerError {
        let sleep_time = self.settings.retry.ban_wait;
        tracing::warn!("Github API returned 504 for {}; sleeping for {:?}", url, sleep_time);
        tokio::time::sleep(sleep_time).await;
        MinerError::api(url, format!("Github API returned 504, slept for {:?}", sleep_time))
    }

    async fn handle_rate_limit(&self, url: &str, response: reqwest::Response) -> MinerError {
        let headers = response.headers().clone();
        let body: Option<Value> = response.json().await.ok();
        let message = body
            .as_ref()
            .and_then(|b| b.get("message"))
            .and_then(Value::as_str);

        match message {
            Some(m) if m.starts_with(SECONDARY_LIMIT_MESSAGE) => {
                let sleep_time = header_number(&headers, RETRY_AFTER)
                    .map(|secs| Duration::from_secs(secs.max(0) as u64))
                    .unwrap_or(self.settings.retry.retry_wait);
                tracing::warn!(
                    "Secondary Github API rate limit was exceeded for {}; sleeping for {:?}",
                    url,
                    sleep_time
                );
                tokio::time::sleep(sleep_time).await;
                MinerError::api(url, "Secondary Github API rate limit was exceeded")
            }
            Some(m) if m.starts_with(PRIMARY_LIMIT_MESSAGE) => {
                let now = chrono::Utc::now().timestamp();
                let reset = header_number(&headers, X_RATELIMIT_RESET).unwrap_or(now);
                let sleep_time =
                    rate_limit_wait(reset, now, self.settings.retry.time_divergence);
                tracing::warn!(
                    "Github API rate limit exceeded for {}; sleeping for {:?}",
                    url,
                    sleep_time
                );
                tokio::time::sleep(sleep_time).await;
                MinerError::api(url, "Github API rate limit exceeded")
            }
            Some(m) => {
                tracing::error!("Not a rate limiting error for {}: {}", url, m);
                MinerError::api(url, format!("Not a rate limiting error: {}", m))
            }
            None => {
                tracing::error!("No message in 403 response for {}", url);
                MinerError::api(url, "No message in response. HTTP code 403.")
            }
        }
    }

    /// Unauthenticated page fetch, for data only rendered on github.com.
    pub async fn get_html(&self, url: &str) -> Result<String> {
        let response = self.http.get(url).send().await?.error_for_status()?;
        Ok(response.text().await?)
    }

    pub fn pages<'a>(&'a self, token: &'a str, first_url: impl Into<String>) -> PageCursor<'a> {
        PageCursor {
            client: self,
            token,
            next: Some(first_url.into()),
        }
    }

    /// Follows pagination to the end and concatenates array pages.
    pub async fn collect_pages(&self, token: &str, first_url: &str) -> Result<Vec<Value>> {
        let mut items = Vec::new();
        let mut pages = self.pages(token, first_url);
        while let Some(page) = pages.next_page().await {
            match page? {
                Value::Array(values) => items.extend(values),
                other => items.push(other),
            }
        }
        Ok(items)
    }
}

/// Walks `Link: rel="next"` pages one request at a time.
pub struct PageCursor<'a> {
    client: &'a GithubClient,
    token: &'a str,
    next: Option<String>,
}

impl PageCursor<'_> {
    pub async fn next_page(&mut self) -> Option<Result<Value>> {
        let url = self.next.take()?;
        tracing::debug!("Processing: {}", url);
        match self.client.get(self.token, &url).await {
            Ok(response) => {
                self.next = response.next;
                Some(Ok(response.data))
            }
            Err(e) => Some(Err(e)),
        }
    }
}

/// Appends the listing parameters used for every collection request.
pub fn paged_url(base: &str, page_size: usize) -> String {
    let separator = if base.contains('?') { '&' } else { '?' };
    format!("{}{}per_page={}&state=all", base, separator, page_size)
}

/// Extracts the `rel="next"` target from an RFC 8288 `Link` header.
pub fn parse_next_link(header: &str) -> Option<String> {
    header.split(',').find_map(|part| {
        let mut segments = part.split(';');
        let target = segments.next()?.trim();
        let url = target.strip_prefix('<')?.strip_suffix('>')?;
        let is_next = segments.any(|param| match param.trim().split_once('=') {
            Some((key, value)) => {
                key.trim().eq_ignore_ascii_case("rel")
                    && value
                        .trim()
                        .trim_matches('"')
                        .split_whitespace()
                        .any(|rel| rel == "next")
            }
            None => false,
        });
        is_next.then(|| url.to_string())
    })
}

/// Seconds until the primary limit resets plus the skew allowance, never negative.
pub fn rate_limit_wait(reset_epoch: i64, now_epoch: i64, divergence: Duration) -> Duration {
    let divergence = i64::try_from(divergence.as_secs()).unwrap_or(i64::MAX);
    let secs = reset_epoch
        .saturating_sub(now_epoch)
        .saturating_add(divergence);
    Duration::from_secs(secs.max(0) as u64)
}

fn header_number(headers: &HeaderMap, name: &str) -> Option<i64> {
    headers
        .get(name)?
        .to_str()
        .ok()?
        .trim()
        .parse::<i64>()
        .ok()
}
