//! Shared utilities for the CLI

use anyhow::{Context, Result};
use std::path::PathBuf;

/// Directory containing the running executable
///
/// Backups and logs live next to the program, not next to the current directory.
pub fn application_dir() -> Result<PathBuf> {
    let exe = std::env::current_exe().context("Unable to determine application path")?;
    exe.parent()
        .map(|dir| dir.to_path_buf())
        .context("Unable to determine application path")
}

/// Format file size in human-readable format
pub fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}
