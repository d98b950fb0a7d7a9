//! Output path generation and window splitting
//!
//! Files are laid out one directory per domain, one file per UTC day:
//! `{root}/{domain}/{domain}-{YYYY-MM-DD}.log`
//!
//! # Usage Example
//!
//! ```rust
//! use access_log_exporter::output::OutputPathBuilder;
//! use chrono::NaiveDate;
//! use std::path::PathBuf;
//!
//! let path = OutputPathBuilder::new(PathBuf::from("logs"), "example.com")
//!     .with_day(NaiveDate::from_ymd_opt(2025, 10, 23).unwrap())
//!     .build()
//!     .unwrap();
//! assert_eq!(path, PathBuf::from("logs/example.com/example.com-2025-10-23.log"));
//! ```

use super::OutputError;
use crate::ExportWindow;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use std::path::PathBuf;

/// Path builder for per-domain daily log files
pub struct OutputPathBuilder {
    root_dir: PathBuf,
    domain: String,
    day: Option<NaiveDate>,
}

impl OutputPathBuilder {
    /// Create a new path builder
    ///
    /// The domain is sanitized so it cannot escape `root_dir`:
    /// `/`, `\`, `:` become `_` and `..` becomes `__`.
    pub fn new(root_dir: PathBuf, domain: &str) -> Self {
        Self {
            root_dir,
            domain: sanitize_domain(domain),
            day: None,
        }
    }

    /// Set the day the file covers
    pub fn with_day(mut self, day: NaiveDate) -> Self {
        self.day = Some(day);
        self
    }

    /// Build the complete file path
    pub fn build(&self) -> Result<PathBuf, OutputError> {
        if self.domain.is_empty() {
            return Err(OutputError::InvalidPath("domain must not be empty".to_string()));
        }
        let day = self
            .day
            .ok_or_else(|| OutputError::InvalidPath("day required for log file".to_string()))?;

        Ok(self
            .root_dir
            .join(&self.domain)
            .join(format!("{}-{}.log", self.domain, day.format("%Y-%m-%d"))))
    }
}

/// Sanitize a domain for use as a path component
fn sanitize_domain(name: &str) -> String {
    name.trim()
        .replace("..", "__")
        .replace(['/', '\\', ':'], "_")
}

/// One UTC day slice of an export window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DayRange {
    /// Calendar day of the slice
    pub day: NaiveDate,
    /// Inclusive start
    pub start: DateTime<Utc>,
    /// Exclusive end
    pub end: DateTime<Utc>,
}

impl DayRange {
    /// The slice as its own window
    pub fn window(&self) -> ExportWindow {
        // start < end holds for every slice produced by split_into_day_ranges
        ExportWindow {
            after: self.start,
            before: self.end,
        }
    }
}

/// Split a window into UTC day slices
///
/// The first and last slices are clipped to the window bounds.
pub fn split_into_day_ranges(window: &ExportWindow) -> Vec<DayRange> {
    let mut ranges = Vec::new();
    let mut current_start = window.after();

    while current_start < window.before() {
        let day = current_start.date_naive();
        let next_midnight = match day.succ_opt() {
            Some(next) => next.and_time(NaiveTime::MIN).and_utc(),
            None => window.before(),
        };
        let end = next_midnight.min(window.before());

        ranges.push(DayRange {
            day,
            start: current_start,
            end,
        });

        current_start = end;
    }

    ranges
}
