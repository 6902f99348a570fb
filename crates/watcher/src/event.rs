//! Mutation events delivered to handlers

use std::fmt;
use std::path::{Path, PathBuf};

/// Kind of mutation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Modified,
    Created,
    Deleted,
    Moved,
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EventKind::Modified => "modified",
            EventKind::Created => "created",
            EventKind::Deleted => "deleted",
            EventKind::Moved => "moved",
        };
        f.write_str(name)
    }
}

/// One detected mutation under the watch root
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum WatchEvent {
    /// File or directory contents or metadata changed
    Modified(PathBuf),
    /// File or directory appeared
    Created(PathBuf),
    /// File or directory disappeared
    Deleted(PathBuf),
    /// File or directory was renamed within the tree
    Moved { from: PathBuf, to: PathBuf },
}

impl WatchEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            WatchEvent::Modified(_) => EventKind::Modified,
            WatchEvent::Created(_) => EventKind::Created,
            WatchEvent::Deleted(_) => EventKind::Deleted,
            WatchEvent::Moved { .. } => EventKind::Moved,
        }
    }

    /// Path the mutation happened to (the old path for moves)
    pub fn source_path(&self) -> &Path {
        match self {
            WatchEvent::Modified(path) | WatchEvent::Created(path) | WatchEvent::Deleted(path) => {
                path
            }
            WatchEvent::Moved { from, .. } => from,
        }
    }

    /// New path of a move
    pub fn dest_path(&self) -> Option<&Path> {
        match self {
            WatchEvent::Moved { to, .. } => Some(to),
            _ => None,
        }
    }

    /// Every path the event mentions
    pub fn paths(&self) -> impl Iterator<Item = &Path> {
        std::iter::once(self.source_path()).chain(self.dest_path())
    }
}

/// Change log description: `<path> was modified`, `<path> was moved to <dest>`, ...
impl fmt::Display for WatchEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WatchEvent::Moved { from, to } => {
                write!(f, "{} was moved to {}", from.display(), to.display())
            }
            other => write!(f, "{} was {}", other.source_path().display(), other.kind()),
        }
    }
}
