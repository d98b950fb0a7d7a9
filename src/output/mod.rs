//! Log file output

pub mod log_file;
pub mod path;

pub use log_file::LogFileWriter;
pub use path::{split_into_day_ranges, DayRange, OutputPathBuilder};

/// Output writer errors
#[derive(Debug, thiserror::Error)]
pub enum OutputError {
    /// IO error
    #[error("IO error: {0}")]
    IoError(String),

    /// Buffer flush error
    #[error("flush error: {0}")]
    FlushError(String),

    /// Path could not be built from the given inputs
    #[error("invalid output path: {0}")]
    InvalidPath(String),
}

/// Result type for output operations
pub type OutputResult<T> = Result<T, OutputError>;

/// Generic output writer trait
pub trait OutputWriter {
    /// Flush any buffered data to disk
    fn flush(&mut self) -> OutputResult<()>;

    /// Close the writer and finalize output
    fn close(self) -> OutputResult<()>;
}

/// Trait for writing pre-formatted log lines
pub trait LinesWriter: OutputWriter {
    /// Write one line; the terminator is added by the writer
    fn write_line(&mut self, line: &str) -> OutputResult<()>;

    /// Write multiple lines at once
    fn write_lines(&mut self, lines: &[String]) -> OutputResult<()> {
        for line in lines {
            self.write_line(line)?;
        }
        Ok(())
    }
}
