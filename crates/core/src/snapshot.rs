//! Full-tree snapshots
//!
//! Every snapshot is a complete, self-contained copy of the watched tree placed in a
//! directory named after the second it was taken:
//! ```text
//! <backup root>/
//!   2024-01-03-14_30_00/
//!     notes.txt
//!     src/main.rs
//!   2024-01-03-14_31_12/
//!     ...
//! ```
//! Two snapshots taken within the same second share a directory; the later copy
//! overwrites the earlier one file by file.

use crate::config::Config;
use crate::error::{EntryKind, SnapshotError};
use chrono::{DateTime, Local, NaiveDateTime, TimeZone};
use filetime::FileTime;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};
use walkdir::WalkDir;

/// strftime pattern for snapshot directory names
pub const SNAPSHOT_NAME_FORMAT: &str = "%Y-%m-%d-%H_%M_%S";

/// Name of a snapshot directory (local time, one-second resolution)
///
/// Names sort lexicographically in creation order.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SnapshotName(String);

impl SnapshotName {
    /// Name for a snapshot taken now
    pub fn now() -> Self {
        Self::at(&Local::now())
    }

    /// Name for a snapshot taken at `time`
    pub fn at<Tz>(time: &DateTime<Tz>) -> Self
    where
        Tz: TimeZone,
        Tz::Offset: fmt::Display,
    {
        Self(time.format(SNAPSHOT_NAME_FORMAT).to_string())
    }

    /// Parse a directory name, rejecting anything that is not a snapshot name
    pub fn parse(name: &str) -> Option<Self> {
        NaiveDateTime::parse_from_str(name, SNAPSHOT_NAME_FORMAT)
            .ok()
            .map(|_| Self(name.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SnapshotName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Sink for per-entry snapshot failures
pub trait FailureRecorder: Send + Sync {
    /// Record one failure. Must not panic; recording is best effort.
    fn record_failure(&self, failure: &SnapshotError);
}

/// Discards failures (they still appear in the report)
impl FailureRecorder for () {
    fn record_failure(&self, _failure: &SnapshotError) {}
}

impl<T: FailureRecorder + ?Sized> FailureRecorder for Arc<T> {
    fn record_failure(&self, failure: &SnapshotError) {
        (**self).record_failure(failure)
    }
}

impl<T: FailureRecorder + ?Sized> FailureRecorder for &T {
    fn record_failure(&self, failure: &SnapshotError) {
        (**self).record_failure(failure)
    }
}

/// Outcome of one snapshot
#[derive(Debug)]
pub struct SnapshotReport {
    /// Directory the tree was copied into
    pub destination: PathBuf,
    /// Files copied successfully
    pub files_copied: usize,
    /// Directories mirrored successfully
    pub dirs_created: usize,
    /// Bytes written for copied files
    pub bytes_copied: u64,
    /// Entries that could not be copied
    pub failures: Vec<SnapshotError>,
}

impl SnapshotReport {
    fn new(destination: PathBuf) -> Self {
        Self {
            destination,
            files_copied: 0,
            dirs_created: 0,
            bytes_copied: 0,
            failures: Vec::new(),
        }
    }

    /// True when every entry was copied
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Copies the watched tree into timestamp-named snapshot directories
pub struct SnapshotEngine<R = ()> {
    /// Directory snapshots are created under
    backup_root: PathBuf,
    /// Subtrees never copied (the program's own output when nested in the tree)
    exclusions: Vec<PathBuf>,
    /// Where per-entry failures are reported
    recorder: R,
}

impl<R: FailureRecorder> SnapshotEngine<R> {
    /// Create an engine writing snapshots under `backup_root`
    pub fn new(backup_root: impl Into<PathBuf>, recorder: R) -> Self {
        Self {
            backup_root: backup_root.into(),
            exclusions: Vec::new(),
            recorder,
        }
    }

    /// Create an engine from the startup configuration
    pub fn from_config(config: &Config, recorder: R) -> Self {
        Self::new(config.backup_root(), recorder).with_exclusions(config.exclusions())
    }

    /// Never descend into these directories
    pub fn with_exclusions(mut self, exclusions: Vec<PathBuf>) -> Self {
        self.exclusions = exclusions;
        self
    }

    pub fn backup_root(&self) -> &Path {
        &self.backup_root
    }

    /// Snapshot `root` into a directory named after the current second
    ///
    /// Never fails: failures are recorded per entry and the walk continues.
    pub fn backup(&self, root: &Path) -> SnapshotReport {
        self.backup_as(root, &SnapshotName::now())
    }

    /// Snapshot `root` into the directory `name`, merging with any existing content
    pub fn backup_as(&self, root: &Path, name: &SnapshotName) -> SnapshotReport {
        let destination = self.backup_root.join(name.as_str());
        let mut report = SnapshotReport::new(destination.clone());

        // The root is created up front so an empty tree still yields a snapshot.
        if let Err(source) = fs::create_dir_all(&destination) {
            self.fail(
                &mut report,
                SnapshotError::EntryCopy {
                    path: destination.clone(),
                    kind: EntryKind::Directory,
                    source,
                },
            );
            return report;
        }

        let walker = WalkDir::new(root)
            .follow_links(false)
            .min_depth(1)
            .into_iter()
            .filter_entry(|entry| {
                !self.is_excluded(entry.path()) && !entry.path().starts_with(&destination)
            });

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    let path = err.path().unwrap_or(root).to_path_buf();
                    let message = err.to_string();
                    let source = err
                        .into_io_error()
                        .unwrap_or_else(|| io::Error::new(io::ErrorKind::Other, message));
                    self.fail(&mut report, SnapshotError::Walk { path, source });
                    continue;
                }
            };

            let src = entry.path();
            let relative = match src.strip_prefix(root) {
                Ok(relative) => relative,
                Err(_) => continue,
            };
            let target = destination.join(relative);

            if is_directory_like(&entry) {
                match fs::create_dir_all(&target) {
                    Ok(()) => report.dirs_created += 1,
                    Err(source) => self.fail(
                        &mut report,
                        SnapshotError::EntryCopy {
                            path: src.to_path_buf(),
                            kind: EntryKind::Directory,
                            source,
                        },
                    ),
                }
            } else {
                match copy_file(src, &target) {
                    Ok(bytes) => {
                        report.files_copied += 1;
                        report.bytes_copied += bytes;
                    }
                    Err(source) => self.fail(
                        &mut report,
                        SnapshotError::EntryCopy {
                            path: src.to_path_buf(),
                            kind: EntryKind::File,
                            source,
                        },
                    ),
                }
            }
        }

        debug!(
            "Snapshot {} finished: {} files, {} dirs, {} failures",
            destination.display(),
            report.files_copied,
            report.dirs_created,
            report.failures.len()
        );

        report
    }

    /// Existing snapshots under the backup root, oldest first
    pub fn list_snapshots(&self) -> io::Result<Vec<SnapshotName>> {
        let mut names = Vec::new();
        for entry in fs::read_dir(&self.backup_root)? {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }
            if let Some(name) = entry.file_name().to_str().and_then(SnapshotName::parse) {
                names.push(name);
            }
        }
        names.sort();
        Ok(names)
    }

    fn is_excluded(&self, path: &Path) -> bool {
        self.exclusions.iter().any(|excluded| path.starts_with(excluded))
    }

    fn fail(&self, report: &mut SnapshotReport, failure: SnapshotError) {
        warn!("{}", failure);
        self.recorder.record_failure(&failure);
        report.failures.push(failure);
    }
}

/// Directories, and symlinks pointing at directories (mirrored empty, not followed)
fn is_directory_like(entry: &walkdir::DirEntry) -> bool {
    let file_type = entry.file_type();
    if file_type.is_dir() {
        return true;
    }
    file_type.is_symlink()
        && fs::metadata(entry.path())
            .map(|meta| meta.is_dir())
            .unwrap_or(false)
}

/// Copy contents, permissions and timestamps of one file
fn copy_file(src: &Path, target: &Path) -> io::Result<u64> {
    // Opening a FIFO for reading blocks until a writer shows up, so anything
    // that is not a regular file (after following links) is refused unopened.
    let metadata = fs::metadata(src)?;
    if !metadata.is_file() {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("{} is not a regular file", special_kind(&metadata.file_type())),
        ));
    }

    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent)?;
    }

    // fs::copy follows symlinks and carries permission bits over.
    let bytes = fs::copy(src, target)?;

    filetime::set_file_times(
        target,
        FileTime::from_last_access_time(&metadata),
        FileTime::from_last_modification_time(&metadata),
    )?;

    Ok(bytes)
}

#[cfg(unix)]
fn special_kind(file_type: &fs::FileType) -> &'static str {
    use std::os::unix::fs::FileTypeExt;

    if file_type.is_fifo() {
        "named pipe"
    } else if file_type.is_socket() {
        "socket"
    } else if file_type.is_block_device() || file_type.is_char_device() {
        "device"
    } else {
        "special file"
    }
}

#[cfg(not(unix))]
fn special_kind(_file_type: &fs::FileType) -> &'static str {
    "special file"
}
