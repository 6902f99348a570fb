//! Error types for configuration and snapshots

use std::fmt;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while building the startup configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The folder to watch does not exist
    #[error("Folder '{}' does not exist!", .0.display())]
    PathNotFound(PathBuf),

    /// The folder to watch exists but is not a directory
    #[error("'{}' is not a directory", .0.display())]
    NotADirectory(PathBuf),

    /// A backup or log directory could not be created
    #[error("failed to create directory {}: {source}", path.display())]
    CreateDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A backup or log directory is the watched folder itself
    #[error("{} cannot be the watched folder itself", .0.display())]
    OverlapsWatchRoot(PathBuf),

    /// A path could not be resolved to its canonical form
    #[error("failed to resolve {}: {source}", path.display())]
    Resolve {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// What kind of tree entry a snapshot failure concerns
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Directory,
}

impl fmt::Display for EntryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntryKind::File => f.write_str("file"),
            EntryKind::Directory => f.write_str("directory"),
        }
    }
}

/// A failure confined to a single entry of a snapshot
///
/// These never abort a snapshot. They are recorded and the walk moves on.
#[derive(Error, Debug)]
pub enum SnapshotError {
    /// Copying a file or creating a directory failed
    #[error("Error backing up {}: {source}", path.display())]
    EntryCopy {
        path: PathBuf,
        kind: EntryKind,
        #[source]
        source: io::Error,
    },

    /// The walk itself could not read an entry (unreadable directory, vanished path)
    #[error("Error backing up {}: {source}", path.display())]
    Walk {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl SnapshotError {
    /// Source path the failure is keyed by
    pub fn path(&self) -> &std::path::Path {
        match self {
            SnapshotError::EntryCopy { path, .. } | SnapshotError::Walk { path, .. } => path,
        }
    }
}
