//! Append-only change and error logs
//!
//! This crate provides:
//! - Timestamped log entries (`<timestamp>: <description>`)
//! - Open/append/close log files that survive crashes between writes
//! - The `Journal` pairing the change log with the error log

pub mod entry;
pub mod journal;

// Re-exports
pub use entry::{LogEntry, ParseEntryError};
pub use journal::{read_entries, Journal, LogFile};

/// Result type for journal operations
pub type Result<T> = std::result::Result<T, std::io::Error>;
