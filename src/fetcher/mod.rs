//! Upstream API access: transport, retrying executor, pagination, and operations

use serde_json::Value;
use std::time::Duration;

pub mod api;
pub mod http;
pub mod pagination;
pub mod retry_formatter;
pub mod transport;

pub use api::AccessLogApi;
pub use http::ApiHttpClient;
pub use pagination::{PageCursor, PaginationHelper};
pub use transport::{ApiRequest, HttpTransport, RawResponse, ReqwestTransport};

/// Fetcher errors
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FetcherError {
    /// No response was obtained (connect, DNS, reset, timeout)
    #[error("transport error: {0}")]
    Transport(String),

    /// HTTP 429
    #[error("rate limited by upstream (429){}", retry_after_suffix(.retry_after))]
    RateLimited {
        /// Server-supplied wait hint
        retry_after: Option<Duration>,
    },

    /// HTTP 5xx
    #[error("upstream unavailable ({status}): {message}")]
    UpstreamUnavailable {
        /// Response status code
        status: u16,
        /// Response body, possibly truncated
        message: String,
    },

    /// HTTP 4xx other than 429
    #[error("client request error ({status}): {message}")]
    ClientRequest {
        /// Response status code
        status: u16,
        /// Response body, possibly truncated
        message: String,
    },

    /// Successful status but a body that is not the expected structure
    #[error("malformed response: {0}")]
    MalformedResponse(String),

    /// Provider kept returning non-empty pages past the iteration ceiling
    #[error("pagination limit of {pages} pages exceeded at offset {offset}")]
    PaginationLimit {
        /// Pages fetched before giving up
        pages: usize,
        /// Offset that would have been requested next
        offset: usize,
    },

    /// Caller-supplied parameter rejected before any request
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl FetcherError {
    /// Whether the executor may repeat the request
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            FetcherError::Transport(_)
                | FetcherError::RateLimited { .. }
                | FetcherError::UpstreamUnavailable { .. }
        )
    }

    /// HTTP status associated with the failure, if one was received
    pub fn status(&self) -> Option<u16> {
        match self {
            FetcherError::RateLimited { .. } => Some(429),
            FetcherError::UpstreamUnavailable { status, .. }
            | FetcherError::ClientRequest { status, .. } => Some(*status),
            _ => None,
        }
    }
}

fn retry_after_suffix(retry_after: &Option<Duration>) -> String {
    match retry_after {
        Some(hint) => format!(", retry after {}s", hint.as_secs()),
        None => String::new(),
    }
}

/// Result type for fetcher operations
pub type FetcherResult<T> = Result<T, FetcherError>;

/// Classification of a single HTTP exchange
#[derive(Debug, Clone, PartialEq)]
pub enum RequestOutcome {
    /// Decoded JSON body of a successful response
    Success(Value),
    /// Failure expected to clear on retry
    TransientFailure {
        /// What went wrong
        reason: FetcherError,
        /// Server-supplied wait before the next attempt
        retry_after: Option<Duration>,
    },
    /// Failure that retrying cannot fix
    FatalFailure(FetcherError),
}

impl RequestOutcome {
    /// Whether the executor should try again
    pub fn is_retryable(&self) -> bool {
        matches!(self, RequestOutcome::TransientFailure { .. })
    }
}
