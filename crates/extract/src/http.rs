//! JSON-over-HTTP extraction service.
//!
//! The page is posted base64-encoded; the response body is a [`ServiceResponse`]. Every
//! attempt runs under its own timeout, rate limiting honours `Retry-After`, and other
//! transient failures back off exponentially up to a bounded number of retries.

use std::time::Duration;

use async_trait::async_trait;
use base64::{engine::general_purpose, Engine as _};
use docveil_types::MimeType;
use reqwest::header::{HeaderMap, RETRY_AFTER};
use reqwest::Client;

use crate::error::{ServiceError, ServiceErrorKind};
use crate::service::{ExtractionService, ServiceResponse};

pub const DEFAULT_ATTEMPT_TIMEOUT: Duration = Duration::from_secs(30);
pub const INITIAL_BACKOFF: Duration = Duration::from_millis(500);
pub const MAX_BACKOFF: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt.
    pub max_retries: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
    pub attempt_timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_backoff: INITIAL_BACKOFF,
            max_backoff: MAX_BACKOFF,
            attempt_timeout: DEFAULT_ATTEMPT_TIMEOUT,
        }
    }
}

impl RetryPolicy {
    /// Delay before retry number `retry` (0-based): doubles each time, capped.
    pub fn backoff(&self, retry: u32) -> Duration {
        self.initial_backoff
            .saturating_mul(1u32 << retry.min(16))
            .min(self.max_backoff)
    }
}

/// `Retry-After` in delta-seconds form. HTTP dates are ignored.
fn parse_retry_after(headers: &HeaderMap) -> Option<Duration> {
    headers
        .get(RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
}

struct AttemptFailure {
    error: ServiceError,
    retry_after: Option<Duration>,
}

impl From<ServiceError> for AttemptFailure {
    fn from(error: ServiceError) -> Self {
        Self {
            error,
            retry_after: None,
        }
    }
}

pub struct HttpExtractionService {
    client: Client,
    endpoint: String,
    api_key: Option<String>,
    policy: RetryPolicy,
}

impl HttpExtractionService {
    pub fn new(
        endpoint: &str,
        api_key: Option<String>,
        policy: RetryPolicy,
    ) -> Result<Self, ServiceError> {
        let client = Client::builder()
            .connect_timeout(policy.attempt_timeout)
            .build()
            .map_err(|e| ServiceError::unknown(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            api_key: api_key.filter(|k| !k.is_empty()),
            policy,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn attempt(&self, body: &serde_json::Value) -> Result<ServiceResponse, AttemptFailure> {
        let mut request = self
            .client
            .post(&self.endpoint)
            .header("Content-Type", "application/json")
            .json(body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| ServiceError::unknown(format!("request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let retry_after = parse_retry_after(response.headers());
            let kind = ServiceErrorKind::from_status(status.as_u16());
            // only the body size is logged
            let body_len = response.bytes().await.map(|b| b.len()).unwrap_or(0);
            log::debug!(
                "[Extract] {} returned {} with a {} byte body",
                self.endpoint,
                status,
                body_len
            );
            return Err(AttemptFailure {
                error: ServiceError::new(kind, format!("HTTP {}", status.as_u16())),
                retry_after,
            });
        }

        let parsed = response
            .json::<ServiceResponse>()
            .await
            .map_err(|e| ServiceError::unknown(format!("response parse failed: {e}")))?;
        Ok(parsed)
    }
}

#[async_trait]
impl ExtractionService for HttpExtractionService {
    fn name(&self) -> &str {
        &self.endpoint
    }

    async fn analyze(&self, bytes: &[u8], mime: &MimeType) -> Result<ServiceResponse, ServiceError> {
        let body = serde_json::json!({
            "mimeType": mime.as_str(),
            "base64Source": general_purpose::STANDARD.encode(bytes),
        });

        let mut retry = 0;
        loop {
            let outcome = tokio::time::timeout(self.policy.attempt_timeout, self.attempt(&body))
                .await
                .unwrap_or_else(|_| {
                    Err(ServiceError::unknown(format!(
                        "attempt timed out after {}ms",
                        self.policy.attempt_timeout.as_millis()
                    ))
                    .into())
                });

            let failure = match outcome {
                Ok(response) => return Ok(response),
                Err(failure) => failure,
            };

            if !failure.error.is_retryable() || retry >= self.policy.max_retries {
                log::warn!(
                    "[Extract] {} gave up after {} attempt(s): {}",
                    self.endpoint,
                    retry + 1,
                    failure.error
                );
                return Err(failure.error);
            }

            let delay = failure
                .retry_after
                .unwrap_or_else(|| self.policy.backoff(retry))
                .min(self.policy.max_backoff);
            log::warn!(
                "[Extract] {} attempt {} failed ({}), retrying in {}ms",
                self.endpoint,
                retry + 1,
                failure.error.kind.as_str(),
                delay.as_millis()
            );
            tokio::time::sleep(delay).await;
            retry += 1;
        }
    }
}
