//! Error types for the watcher

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for watcher operations
pub type Result<T> = std::result::Result<T, WatchError>;

/// Errors raised when starting a watch
#[derive(Error, Debug)]
pub enum WatchError {
    /// Root does not exist, is not a directory, or cannot be watched
    #[error("cannot watch {}: {reason}", path.display())]
    PathUnavailable { path: PathBuf, reason: String },

    /// The notification backend could not be created
    #[error("notify error: {0}")]
    Notify(#[from] notify::Error),

    /// The delivery thread could not be spawned
    #[error("failed to spawn delivery thread: {0}")]
    Spawn(#[from] std::io::Error),
}
