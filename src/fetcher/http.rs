//! Retrying request executor
//!
//! Every physical attempt first reserves a rate limiter slot, so retries spend
//! quota like any other request. Outcomes are classified into
//! [`RequestOutcome`] and the retry loop matches on that:
//! - Transport failures, 429, and 5xx are retried
//! - Other 4xx and undecodable bodies fail immediately

use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, error, info, warn};

use crate::downloader::config::RetryPolicy;
use crate::downloader::rate_limit::RateLimiter;
use crate::fetcher::retry_formatter::RetryContext;
use crate::fetcher::transport::{ApiRequest, HttpTransport, RawResponse, TransportError};
use crate::fetcher::{FetcherError, FetcherResult, RequestOutcome};
use crate::metrics;

/// Longest response body kept in an error message
const MAX_ERROR_BODY_CHARS: usize = 512;

/// Rate-limited, retrying client over an [`HttpTransport`]
pub struct ApiHttpClient {
    transport: Arc<dyn HttpTransport>,
    rate_limiter: Arc<RateLimiter>,
    policy: RetryPolicy,
}

impl ApiHttpClient {
    /// Create a client
    ///
    /// # Arguments
    /// * `transport` - Performs the physical exchanges
    /// * `rate_limiter` - Shared limiter consulted before every attempt
    /// * `policy` - Retry count and backoff timings
    pub fn new(
        transport: Arc<dyn HttpTransport>,
        rate_limiter: Arc<RateLimiter>,
        policy: RetryPolicy,
    ) -> Self {
        Self {
            transport,
            rate_limiter,
            policy,
        }
    }

    /// Configured retry count
    pub fn max_retries(&self) -> u32 {
        self.policy.max_retries
    }

    /// Issue one logical request, retrying transient failures.
    ///
    /// # Errors
    /// The last classified failure once a fatal outcome occurs or
    /// `max_retries + 1` attempts have been spent.
    pub async fn execute(&self, request: &ApiRequest) -> FetcherResult<Value> {
        let max_attempts = self.policy.max_attempts();
        let mut attempt: u32 = 1;

        loop {
            self.rate_limiter.reserve_slot().await;

            debug!(
                path = %request.path,
                attempt,
                max_attempts,
                "Sending upstream request"
            );

            let result = self.transport.send(request).await;
            metrics::record_request(result.as_ref().map(|r| r.status).unwrap_or(0));

            match classify(result) {
                RequestOutcome::Success(body) => {
                    if attempt > 1 {
                        info!(
                            "Retry attempt {}/{} succeeded ({})",
                            attempt, max_attempts, request.path
                        );
                    }
                    return Ok(body);
                }
                RequestOutcome::FatalFailure(reason) => {
                    let ctx = RetryContext::new(
                        attempt,
                        max_attempts,
                        &reason,
                        Duration::ZERO,
                        &request.path,
                    );
                    error!("{}", ctx.format_failure());
                    return Err(reason);
                }
                RequestOutcome::TransientFailure {
                    reason,
                    retry_after,
                } => {
                    if attempt >= max_attempts {
                        let ctx = RetryContext::new(
                            attempt,
                            max_attempts,
                            &reason,
                            Duration::ZERO,
                            &request.path,
                        );
                        error!("{}", ctx.format_failure());
                        return Err(reason);
                    }

                    let delay = match retry_after {
                        Some(hint) => self.policy.retry_after_delay(hint),
                        None => self.policy.backoff_with_jitter(attempt),
                    };
                    let ctx = RetryContext::new(attempt, max_attempts, &reason, delay, &request.path);
                    warn!(status = reason.status().unwrap_or(0), "{}", ctx.format_retry());
                    metrics::record_retry(delay);

                    sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }
}

/// Classify one exchange.
///
/// Order: no response, then status >= 400, then body decoding.
pub fn classify(result: Result<RawResponse, TransportError>) -> RequestOutcome {
    let response = match result {
        Ok(response) => response,
        Err(e) => {
            return RequestOutcome::TransientFailure {
                reason: FetcherError::Transport(e.0),
                retry_after: None,
            }
        }
    };

    let status = response.status;

    if status == 429 {
        return RequestOutcome::TransientFailure {
            reason: FetcherError::RateLimited {
                retry_after: response.retry_after,
            },
            retry_after: response.retry_after,
        };
    }

    if status >= 500 {
        return RequestOutcome::TransientFailure {
            reason: FetcherError::UpstreamUnavailable {
                status,
                message: truncate_body(&response.body),
            },
            retry_after: response.retry_after,
        };
    }

    if status >= 400 {
        return RequestOutcome::FatalFailure(FetcherError::ClientRequest {
            status,
            message: truncate_body(&response.body),
        });
    }

    match serde_json::from_str::<Value>(&response.body) {
        Ok(body) => RequestOutcome::Success(body),
        Err(e) => RequestOutcome::FatalFailure(FetcherError::MalformedResponse(format!(
            "status {status}: {e}"
        ))),
    }
}

fn truncate_body(body: &str) -> String {
    let trimmed = body.trim();
    match trimmed.char_indices().nth(MAX_ERROR_BODY_CHARS) {
        Some((idx, _)) => format!("{}...", &trimmed[..idx]),
        None => trimmed.to_string(),
    }
}
