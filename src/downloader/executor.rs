//! Export executor
//!
//! Runs the full export sequence: connectivity probe, account lookup, domain
//! listing, then one fetch/transcode/write pass per (domain, day) slice.

use crate::downloader::config::DEFAULT_PAGE_SIZE;
use crate::downloader::{DownloadError, ExportJob, JobProgress, JobStatus};
use crate::fetcher::pagination::MAX_PAGES;
use crate::fetcher::AccessLogApi;
use crate::metrics;
use crate::output::{split_into_day_ranges, LinesWriter, LogFileWriter, OutputWriter};
use crate::transcoder::ApacheTranscoder;
use crate::{ExportWindow, HostingAccount, HostingId};
use indicatif::ProgressBar;
use serde::Serialize;
use std::path::PathBuf;
use tracing::{debug, error, info, warn, Instrument};

/// What to export
#[derive(Debug, Clone)]
pub struct ExportScope {
    /// Time window of logs
    pub window: ExportWindow,
    /// Restrict to one hosting account
    pub hosting_id: Option<HostingId>,
    /// Restrict to one domain
    pub domain: Option<String>,
}

impl ExportScope {
    /// Every account and domain within `window`
    pub fn new(window: ExportWindow) -> Self {
        Self {
            window,
            hosting_id: None,
            domain: None,
        }
    }

    /// Only export the given hosting account
    pub fn with_hosting_id(mut self, hosting_id: Option<HostingId>) -> Self {
        self.hosting_id = hosting_id;
        self
    }

    /// Only export the given domain
    pub fn with_domain(mut self, domain: Option<String>) -> Self {
        self.domain = domain;
        self
    }
}

/// A unit of work that failed without stopping the run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExportFailure {
    /// Account, domain, or domain/day that failed
    pub target: String,
    /// Human-readable reason
    pub reason: String,
}

/// Outcome of a whole export run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ExportSummary {
    /// (domain, day) slices planned
    pub jobs_total: usize,
    /// Log files written
    pub files_written: usize,
    /// Slices with no records
    pub empty_slices: usize,
    /// Records received from the API
    pub records_fetched: u64,
    /// Lines written across all files
    pub lines_written: u64,
    /// Failures confined to one account, domain, or day
    pub failures: Vec<ExportFailure>,
}

impl ExportSummary {
    /// Whether every planned unit succeeded
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    fn record_failure(&mut self, target: impl Into<String>, reason: impl ToString) {
        self.failures.push(ExportFailure {
            target: target.into(),
            reason: reason.to_string(),
        });
    }
}

/// Export executor orchestrates the complete export workflow
pub struct ExportExecutor {
    api: AccessLogApi,
    output_dir: PathBuf,
    page_size: usize,
    max_pages: usize,
    progress: ProgressBar,
}

impl ExportExecutor {
    /// Create an executor writing under `output_dir`
    pub fn new<P: Into<PathBuf>>(api: AccessLogApi, output_dir: P) -> Self {
        Self {
            api,
            output_dir: output_dir.into(),
            page_size: DEFAULT_PAGE_SIZE,
            max_pages: MAX_PAGES,
            progress: ProgressBar::hidden(),
        }
    }

    /// Set records requested per page
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }

    /// Set the page ceiling for one (domain, day) slice
    pub fn with_max_pages(mut self, max_pages: usize) -> Self {
        self.max_pages = max_pages;
        self
    }

    /// Report slice progress on `progress`
    pub fn with_progress_bar(mut self, progress: ProgressBar) -> Self {
        self.progress = progress;
        self
    }

    /// API the executor talks to
    pub fn api(&self) -> &AccessLogApi {
        &self.api
    }

    /// Run the export sequence
    ///
    /// # Errors
    /// Returns an error only when the run cannot start: the probe or the account
    /// lookup failed, or the requested account does not exist. Everything else is
    /// reported in [`ExportSummary::failures`].
    pub async fn execute(&self, scope: &ExportScope) -> Result<ExportSummary, DownloadError> {
        let span = tracing::info_span!("export", window = %scope.window);
        self.execute_scope(scope).instrument(span).await
    }

    async fn execute_scope(&self, scope: &ExportScope) -> Result<ExportSummary, DownloadError> {
        if self.page_size == 0 {
            return Err(DownloadError::Configuration(
                "page size must be greater than zero".to_string(),
            ));
        }
        if self.max_pages == 0 {
            return Err(DownloadError::Configuration(
                "page limit must be greater than zero".to_string(),
            ));
        }

        info!("Starting access log export");

        self.api.ping().await?;
        debug!("Connectivity probe succeeded");

        let accounts = self.select_accounts(scope).await?;
        let mut summary = ExportSummary::default();
        let mut jobs = self.plan_jobs(&accounts, scope, &mut summary).await;

        summary.jobs_total = jobs.len();
        self.progress.set_length(jobs.len() as u64);
        info!(jobs = jobs.len(), "Export planned");

        for job in jobs.iter_mut() {
            self.progress.set_message(job.label());

            match self.run_job(job).await {
                Ok(progress) => {
                    summary.records_fetched += progress.records_fetched;
                    summary.lines_written += progress.lines_written;
                    match job.status {
                        JobStatus::Completed => summary.files_written += 1,
                        JobStatus::Empty => summary.empty_slices += 1,
                        _ => {}
                    }
                }
                Err(e) => {
                    error!(
                        domain = %job.domain,
                        hosting_id = %job.hosting_id,
                        day = %job.range.day,
                        "Export failed: {}",
                        e
                    );
                    summary.record_failure(job.label(), &e);
                }
            }

            self.progress.inc(1);
        }

        self.progress.finish_and_clear();

        info!(
            files = summary.files_written,
            lines = summary.lines_written,
            failures = summary.failures.len(),
            "Export finished"
        );

        Ok(summary)
    }

    /// Fetch, transcode, and write one slice
    ///
    /// Nothing is written when the slice has no records or any record is invalid.
    pub async fn run_job(&self, job: &mut ExportJob) -> Result<JobProgress, DownloadError> {
        job.status = JobStatus::InProgress;

        match self.export_slice(job).await {
            Ok(()) => Ok(job.progress.clone()),
            Err(e) => {
                job.status = JobStatus::Failed;
                job.progress.error = Some(e.to_string());
                Err(e)
            }
        }
    }

    async fn export_slice(&self, job: &mut ExportJob) -> Result<(), DownloadError> {
        let records = self
            .api
            .fetch_access_logs_with_limit(
                &job.hosting_id,
                &job.domain,
                &job.range.window(),
                self.page_size,
                self.max_pages,
            )
            .await?;
        job.progress.records_fetched = records.len() as u64;

        if records.is_empty() {
            debug!(domain = %job.domain, day = %job.range.day, "No records; skipping file");
            job.status = JobStatus::Empty;
            return Ok(());
        }

        let lines = ApacheTranscoder::convert_batch(&records)?;
        metrics::record_transcoded(&job.domain, lines.len());

        let mut writer = LogFileWriter::new(&job.output_path)?;
        writer.write_lines(&lines)?;
        job.progress.lines_written = writer.lines_written();
        writer.close()?;
        metrics::record_file_written();

        job.status = JobStatus::Completed;
        Ok(())
    }

    async fn select_accounts(&self, scope: &ExportScope) -> Result<Vec<HostingAccount>, DownloadError> {
        let accounts = self.api.list_hostings().await?;

        let Some(wanted) = &scope.hosting_id else {
            return Ok(accounts);
        };

        let selected: Vec<HostingAccount> = accounts
            .into_iter()
            .filter(|account| &account.id == wanted)
            .collect();

        if selected.is_empty() {
            return Err(DownloadError::Configuration(format!(
                "hosting account {wanted} not found"
            )));
        }
        Ok(selected)
    }

    async fn plan_jobs(
        &self,
        accounts: &[HostingAccount],
        scope: &ExportScope,
        summary: &mut ExportSummary,
    ) -> Vec<ExportJob> {
        let ranges = split_into_day_ranges(&scope.window);
        let mut jobs = Vec::new();

        for account in accounts {
            let domains = match self.api.list_domains(&account.id).await {
                Ok(domains) => domains,
                Err(e) => {
                    warn!(
                        hosting_id = %account.id,
                        username = %account.username,
                        "Failed to list domains: {}",
                        e
                    );
                    summary.record_failure(format!("hosting {}", account.id), &e);
                    continue;
                }
            };

            for domain in domains {
                if scope.domain.as_ref().is_some_and(|wanted| wanted != &domain) {
                    continue;
                }

                for range in &ranges {
                    match ExportJob::new(account.id.clone(), domain.clone(), *range, &self.output_dir) {
                        Ok(job) => jobs.push(job),
                        Err(e) => {
                            warn!(domain = %domain, "Skipping domain: {}", e);
                            summary.record_failure(domain.clone(), &e);
                            break;
                        }
                    }
                }
            }
        }

        jobs
    }
}
