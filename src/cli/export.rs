//! Top-level CLI definition and the export command

use crate::downloader::config::{
    RateLimiterConfig, RetryPolicy, DEFAULT_PAGE_SIZE, DEFAULT_QUOTA, DEFAULT_SAFETY_MARGIN,
    DEFAULT_WINDOW_SECS,
};
use crate::downloader::{ExportExecutor, ExportScope, ExportSummary, RateLimiter};
use crate::fetcher::pagination::MAX_PAGES;
use crate::fetcher::{AccessLogApi, ApiHttpClient, ReqwestTransport};
use crate::{ExportWindow, HostingId};
use chrono::Utc;
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use super::accounts::{AccountsCommand, DomainsCommand, PingCommand, StorageCommand};
use super::CliError;

/// Parse and validate a non-zero count
fn parse_positive(s: &str) -> Result<usize, String> {
    let value: usize = s
        .parse()
        .map_err(|_| format!("'{s}' is not a valid number"))?;

    if value == 0 {
        return Err("value must be at least 1".to_string());
    }
    Ok(value)
}

/// Export hosting access logs as Apache combined log files
#[derive(Parser, Debug)]
#[command(name = "access-log-exporter", version, about, long_about = None)]
pub struct Cli {
    /// Command to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Base URL of the hosting API
    #[arg(long, global = true, env = "ACCESS_LOG_API_URL")]
    pub api_url: Option<String>,

    /// API key sent with every request
    #[arg(long, global = true, env = "ACCESS_LOG_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// API user identifier sent with every request
    #[arg(long, global = true, env = "ACCESS_LOG_API_USER")]
    pub api_user: Option<String>,

    /// Requests allowed per rate window by the provider
    #[arg(long, global = true, env = "ACCESS_LOG_QUOTA", default_value_t = DEFAULT_QUOTA, value_parser = parse_positive)]
    pub quota: usize,

    /// Length of the provider's rate window in seconds
    #[arg(long, global = true, env = "ACCESS_LOG_WINDOW_SECS", default_value_t = DEFAULT_WINDOW_SECS, value_parser = clap::value_parser!(u64).range(1..))]
    pub window_secs: u64,

    /// Requests per window kept in reserve below the quota
    #[arg(long, global = true, env = "ACCESS_LOG_SAFETY_MARGIN", default_value_t = DEFAULT_SAFETY_MARGIN)]
    pub safety_margin: usize,

    /// Maximum number of retries for failed requests (default: 5, range: 1-20)
    #[arg(long, global = true, default_value = "5", value_parser = clap::value_parser!(u32).range(1..=20))]
    pub max_retries: u32,

    /// Serve Prometheus metrics on this address (e.g. 127.0.0.1:9000)
    #[arg(long, global = true)]
    pub metrics_addr: Option<SocketAddr>,

    /// Output format (json or human)
    #[arg(long, global = true, default_value = "human")]
    pub output_format: OutputFormat,
}

/// CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Check that the API is reachable with the given credentials
    Ping(PingCommand),

    /// List hosting accounts
    Accounts(AccountsCommand),

    /// List domains of a hosting account
    Domains(DomainsCommand),

    /// Show object-storage credentials of a hosting account
    Storage(StorageCommand),

    /// Export access logs as Apache combined log files
    Export(ExportArgs),
}

impl Cli {
    /// Run the selected command
    pub async fn execute(&self) -> Result<(), CliError> {
        if let Some(addr) = self.metrics_addr {
            crate::metrics::init_metrics(addr)
                .map_err(|e| CliError::ConfigurationError(e.to_string()))?;
        }

        match &self.command {
            Commands::Ping(cmd) => cmd.execute(self).await,
            Commands::Accounts(cmd) => cmd.execute(self).await,
            Commands::Domains(cmd) => cmd.execute(self).await,
            Commands::Storage(cmd) => cmd.execute(self).await,
            Commands::Export(args) => args.execute(self).await,
        }
    }

    /// Build the rate-limited API client from the global options
    ///
    /// # Errors
    /// `ConfigurationError` when the URL or either credential is missing.
    pub fn build_api(&self) -> Result<AccessLogApi, CliError> {
        let api_url = require(&self.api_url, "API URL", "--api-url", "ACCESS_LOG_API_URL")?;
        let api_key = require(&self.api_key, "API key", "--api-key", "ACCESS_LOG_API_KEY")?;
        let api_user = require(&self.api_user, "API user", "--api-user", "ACCESS_LOG_API_USER")?;

        let http = reqwest::Client::builder()
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| CliError::ConfigurationError(format!("Failed to build HTTP client: {e}")))?;

        let limiter = RateLimiter::new(RateLimiterConfig::new(
            self.quota,
            Duration::from_secs(self.window_secs),
            self.safety_margin,
        ));
        info!(
            quota = self.quota,
            window_secs = self.window_secs,
            effective_limit = limiter.effective_limit(),
            "Rate limiter configured"
        );

        let client = ApiHttpClient::new(
            Arc::new(ReqwestTransport::new(http, api_url, api_key, api_user)),
            Arc::new(limiter),
            RetryPolicy::with_max_retries(self.max_retries),
        );
        Ok(AccessLogApi::new(client))
    }
}

fn require(value: &Option<String>, what: &str, flag: &str, env: &str) -> Result<String, CliError> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .ok_or_else(|| CliError::ConfigurationError(format!("missing {what} (set {flag} or {env})")))
}

/// Export command arguments
#[derive(Parser, Debug)]
pub struct ExportArgs {
    /// Window start (YYYY-MM-DD or RFC 3339); defaults to the start of yesterday (UTC)
    #[arg(long, requires = "before")]
    pub after: Option<String>,

    /// Window end (YYYY-MM-DD covers that whole day, or RFC 3339)
    #[arg(long, requires = "after")]
    pub before: Option<String>,

    /// Root directory for the per-domain log folders
    #[arg(long, default_value = "logs")]
    pub output_dir: PathBuf,

    /// Records requested per page
    #[arg(long, default_value_t = DEFAULT_PAGE_SIZE, value_parser = parse_positive)]
    pub page_size: usize,

    /// Most pages fetched for one domain and day before giving up
    #[arg(long, env = "ACCESS_LOG_MAX_PAGES", default_value_t = MAX_PAGES, value_parser = parse_positive)]
    pub max_pages: usize,

    /// Only export this hosting account
    #[arg(long)]
    pub hosting_id: Option<HostingId>,

    /// Only export this domain
    #[arg(long)]
    pub domain: Option<String>,
}

impl ExportArgs {
    /// Resolve the export window
    pub fn window(&self) -> Result<ExportWindow, CliError> {
        match (&self.after, &self.before) {
            (Some(after), Some(before)) => {
                ExportWindow::parse(after, before).map_err(CliError::InvalidArgument)
            }
            (None, None) => Ok(ExportWindow::previous_day(Utc::now())),
            _ => Err(CliError::InvalidArgument(
                "--after and --before must be given together".to_string(),
            )),
        }
    }

    /// Execute the export command
    pub async fn execute(&self, cli: &Cli) -> Result<(), CliError> {
        let window = self.window()?;
        let api = cli.build_api()?;

        let scope = ExportScope::new(window)
            .with_hosting_id(self.hosting_id.clone())
            .with_domain(self.domain.clone());

        let mut executor = ExportExecutor::new(api, &self.output_dir)
            .with_page_size(self.page_size)
            .with_max_pages(self.max_pages);
        if matches!(cli.output_format, OutputFormat::Human) {
            executor = executor.with_progress_bar(create_progress_bar());
        }

        info!(window = %window, output_dir = %self.output_dir.display(), "Exporting access logs");
        let summary = executor.execute(&scope).await?;

        match cli.output_format {
            OutputFormat::Json => output_json(&window, &summary),
            OutputFormat::Human => output_human(&window, &self.output_dir, &summary),
        }

        if summary.is_success() {
            Ok(())
        } else {
            Err(CliError::ExportIncomplete {
                failures: summary.failures.len(),
            })
        }
    }
}

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// JSON output
    Json,
    /// Human-readable output
    Human,
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "json" => Ok(OutputFormat::Json),
            "human" => Ok(OutputFormat::Human),
            _ => Err(format!("Invalid output format: {s}")),
        }
    }
}

fn output_json(window: &ExportWindow, summary: &ExportSummary) {
    let output = serde_json::json!({
        "success": summary.is_success(),
        "after": window.after().to_rfc3339(),
        "before": window.before().to_rfc3339(),
        "summary": summary,
    });
    println!("{output}");
}

fn output_human(window: &ExportWindow, output_dir: &std::path::Path, summary: &ExportSummary) {
    println!("\nExport of {window}");
    println!("Output: {}", output_dir.display());
    println!("Files written: {}", summary.files_written);
    println!("Lines written: {}", summary.lines_written);
    if summary.empty_slices > 0 {
        println!("Days without logs: {}", summary.empty_slices);
    }

    if !summary.failures.is_empty() {
        eprintln!("\n{} failures:", summary.failures.len());
        for failure in &summary.failures {
            eprintln!("  {}: {}", failure.target, failure.reason);
        }
    }
}

fn create_progress_bar() -> ProgressBar {
    let pb = ProgressBar::new(0);
    if let Ok(style) = ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
    {
        pb.set_style(style.progress_chars("#>-"));
    }
    pb
}
