//! Retry message formatting for the request executor.
//!
//! Turns a classified failure plus attempt counters into the log lines an operator
//! sees while a request is being retried, and a final summary when it gives up.

use std::time::Duration;

use crate::fetcher::FetcherError;

/// Classification of retry errors for user messaging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryErrorType {
    /// Connection refused, DNS failure, reset, or timeout
    Network,
    /// HTTP 429 rate limit exceeded
    RateLimit,
    /// HTTP 5xx server error
    ServerError(u16),
    /// Authentication failures (401/403)
    AuthFailed(u16),
    /// Other client errors (4xx, except 429)
    ClientError(u16),
    /// Body did not decode
    MalformedResponse,
    /// Failure raised before any request was sent
    Local,
}

impl RetryErrorType {
    /// User-friendly description string used inside retry log messages.
    pub fn description(&self) -> &'static str {
        match self {
            Self::Network => "network error",
            Self::RateLimit => "rate limit exceeded",
            Self::ServerError(code) => match code {
                500 => "internal server error",
                502 => "bad gateway",
                503 => "service unavailable",
                504 => "gateway timeout",
                _ => "server error",
            },
            Self::AuthFailed(_) => "authentication failed",
            Self::ClientError(code) => match code {
                400 => "invalid request",
                404 => "resource not found",
                _ => "client error",
            },
            Self::MalformedResponse => "malformed response",
            Self::Local => "invalid request parameters",
        }
    }

    /// Suggested remediation presented after the final failure.
    pub fn suggestion(&self) -> &'static str {
        match self {
            Self::Network => "Verify connectivity to the API host and DNS resolution",
            Self::RateLimit => "Lower --quota or raise --safety-margin to leave more headroom",
            Self::ServerError(_) => "The provider may be degraded, try again later",
            Self::AuthFailed(_) => "Check ACCESS_LOG_API_KEY and ACCESS_LOG_API_USER",
            Self::ClientError(_) => "Check the hosting id, domain, and time window",
            Self::MalformedResponse => "The API returned an unexpected payload; check --api-url",
            Self::Local => "Review the command arguments",
        }
    }

    /// Whether the error type is typically retryable.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            RetryErrorType::Network | RetryErrorType::RateLimit | RetryErrorType::ServerError(_)
        )
    }
}

impl From<&FetcherError> for RetryErrorType {
    fn from(err: &FetcherError) -> Self {
        match err {
            FetcherError::Transport(_) => Self::Network,
            FetcherError::RateLimited { .. } => Self::RateLimit,
            FetcherError::UpstreamUnavailable { status, .. } => Self::ServerError(*status),
            FetcherError::ClientRequest { status, .. } if *status == 401 || *status == 403 => {
                Self::AuthFailed(*status)
            }
            FetcherError::ClientRequest { status, .. } => Self::ClientError(*status),
            FetcherError::MalformedResponse(_) => Self::MalformedResponse,
            FetcherError::PaginationLimit { .. } | FetcherError::InvalidRequest(_) => Self::Local,
        }
    }
}

/// Context for formatting retry messages.
#[derive(Debug, Clone)]
pub struct RetryContext {
    /// Current attempt number (1-based)
    pub attempt: u32,
    /// Maximum number of attempts configured
    pub max_attempts: u32,
    /// Type of error that triggered retry
    pub error_type: RetryErrorType,
    /// Backoff duration until next attempt
    pub backoff_duration: Duration,
    /// Endpoint path that failed
    pub endpoint: String,
    /// Original error message for details
    pub error_message: String,
}

impl RetryContext {
    /// Build the context for a failed attempt
    pub fn new(
        attempt: u32,
        max_attempts: u32,
        error: &FetcherError,
        backoff_duration: Duration,
        endpoint: impl Into<String>,
    ) -> Self {
        Self {
            attempt,
            max_attempts,
            error_type: RetryErrorType::from(error),
            backoff_duration,
            endpoint: endpoint.into(),
            error_message: error.to_string(),
        }
    }

    /// Format standardized retry message with attempt counters and context.
    pub fn format_retry(&self) -> String {
        format!(
            "Retrying (attempt {}/{}) after {} - waiting {:.1} seconds... ({})",
            self.attempt + 1,
            self.max_attempts,
            self.error_type.description(),
            self.backoff_duration.as_secs_f64(),
            self.endpoint
        )
    }

    /// Format final failure summary with actionable suggestions.
    pub fn format_failure(&self) -> String {
        let mut lines = vec![
            format!("[FAILED] Request failed after {} attempt(s)", self.attempt),
            format!("  Last error: {}", self.error_message),
            format!("  Endpoint: {}", self.endpoint),
            "  Suggestions:".to_string(),
        ];

        for suggestion in self.format_suggestions() {
            lines.push(format!("    - {suggestion}"));
        }

        lines.join("\n")
    }

    /// Derive suggestions tailored to the current retry context.
    pub fn format_suggestions(&self) -> Vec<String> {
        let mut suggestions = vec![self.error_type.suggestion().to_string()];
        if self.error_type.is_retryable() {
            suggestions.push(format!(
                "Try increasing --max-retries (current: {})",
                self.max_attempts.saturating_sub(1)
            ));
        }
        suggestions
    }
}
