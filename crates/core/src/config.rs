//! Startup configuration
//!
//! Built once from the command line and the executable's location, then shared
//! read-only by the watcher, the snapshot engine and the journal.
//!
//! Default layout next to the executable:
//! ```text
//! wnb_backups/
//!   2024-01-03-14_30_00/   (one mirrored tree per snapshot)
//! wnb_logs/
//!   change_log.txt
//!   error_log.txt
//! ```

use crate::error::ConfigError;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Directory holding snapshots, relative to the application directory
pub const BACKUP_DIR_NAME: &str = "wnb_backups";

/// Directory holding the change and error logs, relative to the application directory
pub const LOG_DIR_NAME: &str = "wnb_logs";

/// Change log file name inside the log directory
pub const CHANGE_LOG_FILE: &str = "change_log.txt";

/// Error log file name inside the log directory
pub const ERROR_LOG_FILE: &str = "error_log.txt";

/// Paths and options for one run of the program
#[derive(Debug, Clone)]
pub struct Config {
    /// Tree under observation
    watch_root: PathBuf,
    /// Directory snapshots are created under
    backup_root: PathBuf,
    /// Directory holding the two log files
    log_dir: PathBuf,
    /// Quiet window for the opt-in debounced mode
    debounce: Option<Duration>,
}

impl Config {
    /// Create a configuration with the default layout under `app_dir`
    pub fn new(watch_root: impl Into<PathBuf>, app_dir: &Path) -> Self {
        Self {
            watch_root: watch_root.into(),
            backup_root: app_dir.join(BACKUP_DIR_NAME),
            log_dir: app_dir.join(LOG_DIR_NAME),
            debounce: None,
        }
    }

    /// Override the backup root
    pub fn with_backup_root(mut self, backup_root: impl Into<PathBuf>) -> Self {
        self.backup_root = backup_root.into();
        self
    }

    /// Override the log directory
    pub fn with_log_dir(mut self, log_dir: impl Into<PathBuf>) -> Self {
        self.log_dir = log_dir.into();
        self
    }

    /// Enable debounced delivery with the given quiet window
    pub fn with_debounce(mut self, window: Option<Duration>) -> Self {
        self.debounce = window.filter(|w| !w.is_zero());
        self
    }

    /// Validate the watch root, create the backup and log directories, and
    /// resolve every path to its canonical absolute form
    pub fn prepare(self) -> Result<Self, ConfigError> {
        if !self.watch_root.exists() {
            return Err(ConfigError::PathNotFound(self.watch_root));
        }
        if !self.watch_root.is_dir() {
            return Err(ConfigError::NotADirectory(self.watch_root));
        }

        for dir in [&self.backup_root, &self.log_dir] {
            std::fs::create_dir_all(dir).map_err(|source| ConfigError::CreateDir {
                path: dir.clone(),
                source,
            })?;
        }

        let prepared = Self {
            watch_root: canonical(&self.watch_root)?,
            backup_root: canonical(&self.backup_root)?,
            log_dir: canonical(&self.log_dir)?,
            debounce: self.debounce,
        };

        // Output written straight into the tree could not be excluded from it.
        for dir in [&prepared.backup_root, &prepared.log_dir] {
            if dir == &prepared.watch_root {
                return Err(ConfigError::OverlapsWatchRoot(dir.clone()));
            }
        }

        Ok(prepared)
    }

    pub fn watch_root(&self) -> &Path {
        &self.watch_root
    }

    pub fn backup_root(&self) -> &Path {
        &self.backup_root
    }

    pub fn log_dir(&self) -> &Path {
        &self.log_dir
    }

    pub fn debounce(&self) -> Option<Duration> {
        self.debounce
    }

    /// Path of the change log
    pub fn change_log_path(&self) -> PathBuf {
        self.log_dir.join(CHANGE_LOG_FILE)
    }

    /// Path of the error log
    pub fn error_log_path(&self) -> PathBuf {
        self.log_dir.join(ERROR_LOG_FILE)
    }

    /// Directories inside the watch root that belong to this program
    ///
    /// Snapshots must never descend into these, and events under them must not
    /// trigger new snapshots.
    pub fn exclusions(&self) -> Vec<PathBuf> {
        [&self.backup_root, &self.log_dir]
            .into_iter()
            .filter(|dir| dir.starts_with(&self.watch_root) && *dir != &self.watch_root)
            .cloned()
            .collect()
    }
}

fn canonical(path: &Path) -> Result<PathBuf, ConfigError> {
    path.canonicalize().map_err(|source| ConfigError::Resolve {
        path: path.to_path_buf(),
        source,
    })
}
