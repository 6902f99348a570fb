//! Core of wnb (Watch and Backup)
//!
//! This crate provides:
//! - The startup configuration shared by every component
//! - Timestamp-named snapshot directories
//! - The full-tree snapshot engine with per-entry failure containment

pub mod config;
pub mod error;
pub mod snapshot;

// Re-exports
pub use config::Config;
pub use error::{ConfigError, EntryKind, SnapshotError};
pub use snapshot::{FailureRecorder, SnapshotEngine, SnapshotName, SnapshotReport};
