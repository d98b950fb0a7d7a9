//! HTTP transport seam
//!
//! [`HttpTransport`] performs exactly one physical exchange and reports either the
//! raw response or the fact that no response arrived. Retrying, rate limiting, and
//! classification live above it in [`crate::fetcher::http`].

use async_trait::async_trait;
use reqwest::header::{HeaderMap, RETRY_AFTER};
use reqwest::{Client, Method};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};

/// Header carrying the API key on every request
pub const API_KEY_HEADER: &str = "X-Api-Key";

/// Header carrying the API user identifier on every request
pub const API_USER_HEADER: &str = "X-Api-User";

/// One logical upstream call
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    /// HTTP method
    pub method: Method,
    /// Path relative to the API base URL (e.g. "/hosting/logs")
    pub path: String,
    /// JSON parameters sent as the request body, GET included
    pub body: Option<Value>,
}

impl ApiRequest {
    /// GET without parameters
    pub fn get(path: impl Into<String>) -> Self {
        Self {
            method: Method::GET,
            path: path.into(),
            body: None,
        }
    }

    /// GET with a JSON body
    pub fn get_with_body(path: impl Into<String>, body: Value) -> Self {
        Self {
            method: Method::GET,
            path: path.into(),
            body: Some(body),
        }
    }
}

/// Response as received, before classification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    /// HTTP status code
    pub status: u16,
    /// Parsed `Retry-After` (delta-seconds form only)
    pub retry_after: Option<Duration>,
    /// Response body text
    pub body: String,
}

impl RawResponse {
    /// Response with a status and body and no hint
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            retry_after: None,
            body: body.into(),
        }
    }

    /// Attach a `Retry-After` hint
    pub fn with_retry_after(mut self, retry_after: Duration) -> Self {
        self.retry_after = Some(retry_after);
        self
    }
}

/// No response could be obtained
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct TransportError(pub String);

/// Sends one request and returns whatever came back
#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// Perform a single exchange without retrying
    async fn send(&self, request: &ApiRequest) -> Result<RawResponse, TransportError>;
}

/// reqwest-backed transport adding the static credential headers
pub struct ReqwestTransport {
    client: Client,
    base_url: String,
    api_key: String,
    api_user: String,
}

impl ReqwestTransport {
    /// Create a transport for `base_url` authenticated with `api_key`/`api_user`
    pub fn new(
        client: Client,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        api_user: impl Into<String>,
    ) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            api_user: api_user.into(),
        }
    }

    /// Base URL without trailing slash
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        }
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn send(&self, request: &ApiRequest) -> Result<RawResponse, TransportError> {
        let url = self.url(&request.path);
        debug!(method = %request.method, %url, "Sending request");

        let mut builder = self
            .client
            .request(request.method.clone(), &url)
            .header(API_KEY_HEADER, &self.api_key)
            .header(API_USER_HEADER, &self.api_user);

        // The upstream reads parameters from the body on GET as well
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| TransportError(describe_reqwest_error(&e)))?;

        let status = response.status().as_u16();
        let retry_after = parse_retry_after(response.headers());
        let body = response
            .text()
            .await
            .map_err(|e| TransportError(format!("failed to read response body: {e}")))?;

        Ok(RawResponse {
            status,
            retry_after,
            body,
        })
    }
}

fn describe_reqwest_error(err: &reqwest::Error) -> String {
    if err.is_timeout() {
        format!("request timed out: {err}")
    } else if err.is_connect() {
        format!("connection failed: {err}")
    } else {
        err.to_string()
    }
}

/// Extract a `Retry-After` delta-seconds hint; HTTP-date values are ignored
pub fn parse_retry_after(headers: &HeaderMap) -> Option<Duration> {
    let raw = headers.get(RETRY_AFTER)?.to_str().ok()?.trim();

    if let Ok(secs) = raw.parse::<u64>() {
        return Some(Duration::from_secs(secs));
    }

    match raw.parse::<f64>().map(Duration::try_from_secs_f64) {
        Ok(Ok(delay)) => Some(delay),
        _ => {
            warn!("Ignoring unsupported Retry-After value '{}'", raw);
            None
        }
    }
}
