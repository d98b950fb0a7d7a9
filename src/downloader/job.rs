//! Export job structures and status tracking

use crate::output::{DayRange, OutputError, OutputPathBuilder};
use crate::HostingId;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// One (domain, UTC day) unit of work
#[derive(Debug, Clone)]
pub struct ExportJob {
    /// Owning hosting account
    pub hosting_id: HostingId,
    /// Domain whose logs are exported
    pub domain: String,
    /// Day slice of the export window
    pub range: DayRange,
    /// Destination log file
    pub output_path: PathBuf,
    /// Current job status
    pub status: JobStatus,
    /// Counters for this job
    pub progress: JobProgress,
}

impl ExportJob {
    /// Create a pending job writing under `output_dir`
    pub fn new(
        hosting_id: HostingId,
        domain: String,
        range: DayRange,
        output_dir: &Path,
    ) -> Result<Self, OutputError> {
        let output_path = OutputPathBuilder::new(output_dir.to_path_buf(), &domain)
            .with_day(range.day)
            .build()?;

        Ok(Self {
            hosting_id,
            domain,
            range,
            output_path,
            status: JobStatus::Pending,
            progress: JobProgress::default(),
        })
    }

    /// Short label used in logs and failure reports
    pub fn label(&self) -> String {
        format!("{} {}", self.domain, self.range.day.format("%Y-%m-%d"))
    }
}

/// Job execution status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum JobStatus {
    /// Job has not started yet
    #[default]
    Pending,
    /// Job is currently running
    InProgress,
    /// Log file written
    Completed,
    /// No records in the slice; nothing written
    Empty,
    /// Job failed with error
    Failed,
}

/// Job progress counters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct JobProgress {
    /// Records received from the API
    pub records_fetched: u64,
    /// Lines written to the output file
    pub lines_written: u64,
    /// Error message if job failed
    pub error: Option<String>,
}
