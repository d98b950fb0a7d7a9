//! # Access Log Exporter Library
//!
//! Fetches access logs from a hosting provider's quota-limited HTTP API and
//! rewrites them as Apache combined log files, one per domain and day.
//!
//! ## Features
//!
//! - **Quota Safety**: A sliding-window limiter gates every physical request,
//!   retries included, so the provider quota is never exceeded
//! - **Retries**: Transport failures, 429, and 5xx responses are retried with
//!   `Retry-After` or exponential backoff with jitter
//! - **Pagination**: Offset-based paging that stops only on an empty page
//! - **Strict Transcoding**: Every record becomes a complete combined log line
//!   or is rejected with the failing field and position
//!
//! ## Quick Start
//!
//! ```no_run
//! use access_log_exporter::downloader::{config::RetryPolicy, RateLimiter};
//! use access_log_exporter::fetcher::{AccessLogApi, ApiHttpClient, ReqwestTransport};
//! use access_log_exporter::transcoder::ApacheTranscoder;
//! use access_log_exporter::ExportWindow;
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let transport = ReqwestTransport::new(
//!     reqwest::Client::new(),
//!     "https://api.example.com",
//!     "api-key",
//!     "api-user",
//! );
//! let client = ApiHttpClient::new(
//!     Arc::new(transport),
//!     Arc::new(RateLimiter::default()),
//!     RetryPolicy::default(),
//! );
//! let api = AccessLogApi::new(client);
//!
//! let window = ExportWindow::parse("2025-10-23", "2025-10-23")?;
//! for account in api.list_hostings().await? {
//!     for domain in api.list_domains(&account.id).await? {
//!         let records = api.fetch_access_logs(&account.id, &domain, &window, 100).await?;
//!         let lines = ApacheTranscoder::convert_batch(&records)?;
//!         println!("{domain}: {} lines", lines.len());
//!     }
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! - [`downloader`] - Rate limiter, retry configuration, and the export sequence
//! - [`fetcher`] - HTTP transport, retrying executor, pagination, API operations
//! - [`transcoder`] - JSON record to Apache combined log line conversion
//! - [`output`] - Per-domain daily log files
//! - [`cli`] - Command-line interface

#![warn(missing_docs)]
#![warn(clippy::all)]

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

/// CLI command implementations
pub mod cli;

/// Rate limiting, retry policy, and export orchestration
pub mod downloader;

/// Upstream API access
pub mod fetcher;

/// Export metrics
pub mod metrics;

/// Log file writers
pub mod output;

/// Apache combined log conversion
pub mod transcoder;

/// One access-log entry as returned by the API (a JSON object)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccessLogRecord(Value);

impl AccessLogRecord {
    /// Wrap a decoded JSON value
    pub fn new(value: Value) -> Self {
        Self(value)
    }

    /// Underlying JSON
    pub fn as_value(&self) -> &Value {
        &self.0
    }

    /// Unwrap into the JSON value
    pub fn into_value(self) -> Value {
        self.0
    }
}

impl From<Value> for AccessLogRecord {
    fn from(value: Value) -> Self {
        Self(value)
    }
}

/// Hosting account identifier; numeric or textual depending on the provider
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum HostingId {
    /// Numeric id
    Number(u64),
    /// Opaque textual id
    Text(String),
}

impl fmt::Display for HostingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HostingId::Number(id) => write!(f, "{id}"),
            HostingId::Text(id) => write!(f, "{id}"),
        }
    }
}

impl FromStr for HostingId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err("hosting id must not be empty".to_string());
        }
        Ok(s.parse::<u64>()
            .map(HostingId::Number)
            .unwrap_or_else(|_| HostingId::Text(s.to_string())))
    }
}

/// Hosting account listed by the API
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostingAccount {
    /// Account identifier used by every per-account call
    pub id: HostingId,
    /// Account login name
    pub username: String,
}

/// Object-storage credentials attached to a hosting account
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageCredentials {
    /// Access key id
    #[serde(rename = "accessKey")]
    pub access_key: String,
    /// Secret access key
    #[serde(rename = "secretKey")]
    pub secret_key: String,
    /// Bucket name
    #[serde(rename = "name")]
    pub bucket: String,
}

impl fmt::Debug for StorageCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StorageCredentials")
            .field("access_key", &self.access_key)
            .field("secret_key", &"<redacted>")
            .field("bucket", &self.bucket)
            .finish()
    }
}

/// Half-open time window `[after, before)` of logs to export
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExportWindow {
    after: DateTime<Utc>,
    before: DateTime<Utc>,
}

impl ExportWindow {
    /// Create a window, rejecting empty or inverted ranges
    pub fn new(after: DateTime<Utc>, before: DateTime<Utc>) -> Result<Self, String> {
        if after >= before {
            return Err(format!(
                "window start {} must be before window end {}",
                after.to_rfc3339(),
                before.to_rfc3339()
            ));
        }
        Ok(Self { after, before })
    }

    /// Parse bounds given as `YYYY-MM-DD` or RFC 3339.
    ///
    /// A date-only `before` covers that whole day (the window ends at the next
    /// midnight UTC).
    pub fn parse(after: &str, before: &str) -> Result<Self, String> {
        let after = parse_bound(after, false)?;
        let before = parse_bound(before, true)?;
        Self::new(after, before)
    }

    /// The full UTC day preceding `now`
    pub fn previous_day(now: DateTime<Utc>) -> Self {
        let today = now.date_naive();
        let yesterday = today.pred_opt().unwrap_or(today);
        Self {
            after: midnight(yesterday),
            before: midnight(today),
        }
    }

    /// Inclusive start
    pub fn after(&self) -> DateTime<Utc> {
        self.after
    }

    /// Exclusive end
    pub fn before(&self) -> DateTime<Utc> {
        self.before
    }
}

impl fmt::Display for ExportWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} to {}", self.after.to_rfc3339(), self.before.to_rfc3339())
    }
}

fn midnight(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(chrono::NaiveTime::MIN).and_utc()
}

fn parse_bound(input: &str, is_end: bool) -> Result<DateTime<Utc>, String> {
    let input = input.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(input) {
        return Ok(dt.with_timezone(&Utc));
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(&format!("{input}Z")) {
        return Ok(dt.with_timezone(&Utc));
    }

    let date = NaiveDate::parse_from_str(input, "%Y-%m-%d")
        .map_err(|e| format!("invalid date or datetime '{input}': {e}"))?;

    if is_end {
        let next = date
            .succ_opt()
            .ok_or_else(|| format!("date out of range: {input}"))?;
        Ok(midnight(next))
    } else {
        Ok(midnight(date))
    }
}
