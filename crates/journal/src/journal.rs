//! Append-only log files
//!
//! Each append is an independent open/write/close so a crash can lose at most the
//! line being written. Nothing is buffered in memory.

use crate::entry::LogEntry;
use crate::Result;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use wnb_core::{Config, FailureRecorder, SnapshotError};

/// A single line-oriented, append-only log file
#[derive(Debug, Clone)]
pub struct LogFile {
    path: PathBuf,
}

impl LogFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one entry stamped with the current time
    pub fn append(&self, description: &str) -> Result<()> {
        self.append_entry(&LogEntry::now(description))
    }

    /// Append a prepared entry
    pub fn append_entry(&self, entry: &LogEntry) -> Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;

        // Single write so concurrent appenders never interleave within a line
        file.write_all(entry.to_line().as_bytes())?;
        Ok(())
    }

    /// Every entry currently in the file
    pub fn entries(&self) -> Result<Vec<LogEntry>> {
        read_entries(&self.path)
    }
}

/// Read a log file back into entries, skipping lines that do not parse
///
/// A missing file reads as empty.
pub fn read_entries(path: &Path) -> Result<Vec<LogEntry>> {
    let contents = match fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e),
    };

    Ok(contents
        .lines()
        .filter_map(|line| match line.parse::<LogEntry>() {
            Ok(entry) => Some(entry),
            Err(e) => {
                debug!("Skipping {}: {}", path.display(), e);
                None
            }
        })
        .collect())
}

/// The change log and the error log
#[derive(Debug, Clone)]
pub struct Journal {
    change_log: LogFile,
    error_log: LogFile,
}

impl Journal {
    pub fn new(change_log: impl Into<PathBuf>, error_log: impl Into<PathBuf>) -> Self {
        Self {
            change_log: LogFile::new(change_log),
            error_log: LogFile::new(error_log),
        }
    }

    /// Journal at the configured log locations
    pub fn from_config(config: &Config) -> Self {
        Self::new(config.change_log_path(), config.error_log_path())
    }

    /// Record a filesystem mutation (best effort)
    pub fn record_change(&self, description: &str) {
        if let Err(e) = self.change_log.append(description) {
            warn!(
                "Failed to append to change log {}: {}",
                self.change_log.path().display(),
                e
            );
        }
    }

    /// Record a snapshot failure (best effort)
    pub fn record_error(&self, description: &str) {
        if let Err(e) = self.error_log.append(description) {
            warn!(
                "Failed to append to error log {}: {}",
                self.error_log.path().display(),
                e
            );
        }
    }

    pub fn change_log(&self) -> &LogFile {
        &self.change_log
    }

    pub fn error_log(&self) -> &LogFile {
        &self.error_log
    }
}

impl FailureRecorder for Journal {
    fn record_failure(&self, failure: &SnapshotError) {
        self.record_error(&failure.to_string());
    }
}
