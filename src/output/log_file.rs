//! Buffered writer for combined log files

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use super::{LinesWriter, OutputError, OutputResult, OutputWriter};

const DEFAULT_BUFFER_SIZE: usize = 64 * 1024; // 64KB buffer

/// Flush every N lines
const FLUSH_INTERVAL: u64 = 10_000;

/// Writes newline-terminated log lines to a single file
pub struct LogFileWriter {
    writer: BufWriter<File>,
    path: PathBuf,
    lines_written: u64,
}

impl LogFileWriter {
    /// Create (or truncate) the file at `path`, creating parent directories
    pub fn new<P: AsRef<Path>>(path: P) -> OutputResult<Self> {
        Self::new_with_buffer_size(path, DEFAULT_BUFFER_SIZE)
    }

    /// Create a writer with a custom buffer size in bytes
    pub fn new_with_buffer_size<P: AsRef<Path>>(path: P, buffer_size: usize) -> OutputResult<Self> {
        let path = path.as_ref();
        debug!("Creating log writer: path={}", path.display());

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| OutputError::IoError(format!("Failed to create directory: {}", e)))?;
        }

        let file = File::create(path)
            .map_err(|e| OutputError::IoError(format!("Failed to create file: {}", e)))?;

        Ok(Self {
            writer: BufWriter::with_capacity(buffer_size, file),
            path: path.to_path_buf(),
            lines_written: 0,
        })
    }

    /// Number of lines written so far
    pub fn lines_written(&self) -> u64 {
        self.lines_written
    }

    /// Destination path
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl LinesWriter for LogFileWriter {
    fn write_line(&mut self, line: &str) -> OutputResult<()> {
        self.writer
            .write_all(line.as_bytes())
            .and_then(|_| self.writer.write_all(b"\n"))
            .map_err(|e| OutputError::IoError(format!("Failed to write line: {}", e)))?;

        self.lines_written += 1;

        if self.lines_written % FLUSH_INTERVAL == 0 {
            self.flush()?;
            debug!("Progress: {} lines written", self.lines_written);
        }

        Ok(())
    }
}

impl OutputWriter for LogFileWriter {
    fn flush(&mut self) -> OutputResult<()> {
        self.writer
            .flush()
            .map_err(|e| OutputError::FlushError(format!("Failed to flush: {}", e)))
    }

    fn close(mut self) -> OutputResult<()> {
        self.flush()?;

        let file = self
            .writer
            .into_inner()
            .map_err(|e| OutputError::IoError(format!("Failed to get file handle: {}", e)))?;

        file.sync_all()
            .map_err(|e| OutputError::IoError(format!("Failed to sync file: {}", e)))?;

        info!(
            "Log file closed: {} ({} lines)",
            self.path.display(),
            self.lines_written
        );
        Ok(())
    }
}
