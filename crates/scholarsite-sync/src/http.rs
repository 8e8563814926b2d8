use std::sync::Arc;
use std::time::{Duration, Instant};

use reqwest::header::{ACCEPT, CONTENT_TYPE, HeaderMap, HeaderValue};
use reqwest::{RequestBuilder, Response, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::sync::Mutex;
use tokio::time::sleep;
use tracing::{debug, warn};

use crate::error::{Result, SyncError};

pub const RETRYABLE_STATUSES: [u16; 5] = [429, 500, 502, 503, 504];

// ─── RetryPolicy ──────────────────────────────────────────────────────────────

/// How many times to try a request and how long to wait in between.
///
/// The delay starts at `base_delay` and doubles after every failed attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub retryable_statuses: Vec<u16>,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts,
            base_delay,
            retryable_statuses: RETRYABLE_STATUSES.to_vec(),
        }
    }

    pub fn with_retryable_statuses(mut self, statuses: impl IntoIterator<Item = u16>) -> Self {
        self.retryable_statuses = statuses.into_iter().collect();
        self
    }

    pub fn is_retryable(&self, status: StatusCode) -> bool {
        self.retryable_statuses.contains(&status.as_u16())
    }

    /// Delay after the failed attempt number `attempt` (0-based).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.base_delay
            .saturating_mul(2u32.saturating_pow(attempt))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(5, Duration::from_millis(500))
    }
}

// ─── HttpClient ───────────────────────────────────────────────────────────────

/// JSON-over-HTTP client with retry and an optional minimum spacing
/// between requests.
pub struct HttpClient {
    client: reqwest::Client,
    policy: RetryPolicy,
    min_interval: Duration,
    last_request: Arc<Mutex<Option<Instant>>>,
}

impl HttpClient {
    pub fn new(user_agent: &str, timeout: Duration, policy: RetryPolicy) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .default_headers(headers)
            .timeout(timeout)
            .gzip(true)
            .build()?;
        Ok(Self {
            client,
            policy,
            min_interval: Duration::ZERO,
            last_request: Arc::new(Mutex::new(None)),
        })
    }

    pub fn with_min_interval(mut self, min_interval: Duration) -> Self {
        self.min_interval = min_interval;
        self
    }

    async fn wait_for_rate_limit(&self) {
        let mut last = self.last_request.lock().await;
        if let Some(t) = *last {
            let elapsed = t.elapsed();
            if elapsed < self.min_interval {
                sleep(self.min_interval - elapsed).await;
            }
        }
        *last = Some(Instant::now());
    }

    pub async fn get(&self, url: &str, headers: HeaderMap) -> Result<Response> {
        self.send_with_retry(url, || self.client.get(url).headers(headers.clone()))
            .await
    }

    pub async fn post_form<B: Serialize + ?Sized>(
        &self,
        url: &str,
        form: &B,
        headers: HeaderMap,
    ) -> Result<Response> {
        let body = serde_urlencoded::to_string(form).map_err(|e| SyncError::Parse(e.to_string()))?;
        self.send_with_retry(url, || {
            self.client
                .post(url)
                .headers(headers.clone())
                .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
                .body(body.clone())
        })
        .await
    }

    /// Send the request built by `build`, retrying transport errors and
    /// retryable statuses. Once attempts run out a transport error is
    /// returned as [`SyncError::Http`]; a retryable status is handed back as
    /// the last response so the caller can decide how to fail.
    async fn send_with_retry<F>(&self, url: &str, build: F) -> Result<Response>
    where
        F: Fn() -> RequestBuilder,
    {
        let max_attempts = self.policy.max_attempts.max(1);
        let mut attempt = 0u32;
        loop {
            self.wait_for_rate_limit().await;
            debug!(url, attempt, "sending request");
            let last_attempt = attempt + 1 >= max_attempts;
            match build().send().await {
                Ok(r) if self.policy.is_retryable(r.status()) && !last_attempt => {
                    warn!(url, attempt, status = r.status().as_u16(), "transient status, retrying");
                }
                Ok(r) => return Ok(r),
                Err(e) if !last_attempt => {
                    warn!(url, attempt, error = %e, "request failed, retrying");
                }
                Err(e) => return Err(SyncError::Http(e)),
            }
            sleep(self.policy.delay_for(attempt)).await;
            attempt += 1;
        }
    }
}

/// Pass `response` through when `accept` approves its status, otherwise fail
/// with the status and body text.
pub async fn ensure_status(
    response: Response,
    context: &str,
    accept: impl Fn(StatusCode) -> bool,
) -> Result<Response> {
    let status = response.status();
    if accept(status) {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(SyncError::ApiError(
        context.to_string(),
        format!("HTTP {}: {body}", status.as_u16()),
    ))
}

pub async fn read_json<T: DeserializeOwned>(response: Response, context: &str) -> Result<T> {
    let text = response.text().await?;
    serde_json::from_str(&text).map_err(|e| SyncError::Parse(format!("{context}: {e}")))
}
