//! Export orchestration and rate limiting
//!
//! This module holds the request quota machinery and the export sequence that
//! drives the fetcher, transcoder, and output writers.
//!
//! # Overview
//!
//! 1. **Rate Limiting**: Every physical request passes through [`rate_limit::RateLimiter`]
//! 2. **Retry Policy**: Backoff timings live in [`config::RetryPolicy`]
//! 3. **Planning**: Accounts and domains are expanded into one [`job::ExportJob`]
//!    per (domain, UTC day)
//! 4. **Execution**: [`executor::ExportExecutor`] fetches, transcodes, and writes
//!    each job, reporting failures per domain instead of aborting
//!
//! # Quick Start
//!
//! ```no_run
//! use access_log_exporter::downloader::{ExportExecutor, ExportScope};
//! use access_log_exporter::fetcher::AccessLogApi;
//! use access_log_exporter::ExportWindow;
//!
//! # async fn example(api: AccessLogApi) -> Result<(), Box<dyn std::error::Error>> {
//! let executor = ExportExecutor::new(api, "./logs");
//! let scope = ExportScope::new(ExportWindow::parse("2025-10-22", "2025-10-23")?);
//! let summary = executor.execute(&scope).await?;
//! println!("{} files written", summary.files_written);
//! # Ok(())
//! # }
//! ```
//!
//! # Error Handling
//!
//! Failures that make the whole run meaningless (unreachable API, account lookup)
//! are returned as [`DownloadError`]. Failures confined to one domain or day are
//! collected in [`executor::ExportSummary::failures`] and the run continues.

pub mod config;
pub mod executor;
pub mod job;
pub mod rate_limit;

pub use executor::{ExportExecutor, ExportFailure, ExportScope, ExportSummary};
pub use job::{ExportJob, JobProgress, JobStatus};
pub use rate_limit::RateLimiter;

use crate::fetcher::FetcherError;
use crate::output::OutputError;
use crate::transcoder::TranscodeError;

/// Export errors
#[derive(Debug, thiserror::Error)]
pub enum DownloadError {
    /// Upstream request failed after retries
    #[error("fetcher error: {0}")]
    Fetcher(#[from] FetcherError),

    /// A record in the batch could not be converted
    #[error("transcode error: {0}")]
    Transcode(#[from] TranscodeError),

    /// Writing the log file failed
    #[error("output error: {0}")]
    Output(#[from] OutputError),

    /// Run cannot proceed with the given settings
    #[error("configuration error: {0}")]
    Configuration(String),
}
