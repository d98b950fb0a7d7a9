//! CLI error types and conversions

use crate::downloader::DownloadError;
use crate::fetcher::FetcherError;

/// CLI errors
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// Export run could not start
    #[error("download error: {0}")]
    DownloadError(#[from] DownloadError),

    /// Lookup request failed
    #[error("fetcher error: {0}")]
    FetcherError(#[from] FetcherError),

    /// Export finished but some accounts, domains, or days failed
    #[error("export incomplete: {failures} failures")]
    ExportIncomplete {
        /// Number of failed units
        failures: usize,
    },

    /// Invalid argument
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Configuration error
    #[error("configuration error: {0}")]
    ConfigurationError(String),
}
