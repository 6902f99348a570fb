//! Program lifecycle: initial snapshot, watch, wait for interrupt, shut down

use crate::pipeline::BackupPipeline;
use crate::shutdown::ShutdownSignal;
use anyhow::{Context, Result};
use journal::Journal;
use owo_colors::OwoColorize;
use std::sync::Arc;
use tracing::info;
use watcher::{WatchOptions, Watcher};
use wnb_core::Config;

/// Console behaviour for a run
#[derive(Debug, Clone, Copy, Default)]
pub struct RunOptions {
    /// Suppress per-event and per-snapshot lines
    pub quiet: bool,
}

/// Run until interrupted
///
/// `config` is validated and its directories created here; a missing watch root is
/// the only error the caller is expected to see in normal use.
pub async fn run(config: Config, options: RunOptions) -> Result<()> {
    println!(
        "Locations: {}, {}, {}",
        config.watch_root().display(),
        config.backup_root().display(),
        config.log_dir().display()
    );

    let config = Arc::new(config.prepare()?);
    let journal = Arc::new(Journal::from_config(&config));
    let pipeline = BackupPipeline::new(Arc::clone(&config), journal).quiet(options.quiet);

    match pipeline.engine().list_snapshots() {
        Ok(existing) if !existing.is_empty() => {
            info!("{} existing snapshots in {}", existing.len(), config.backup_root().display())
        }
        _ => {}
    }

    // Registered first so an interrupt during the initial snapshot is not lost
    let shutdown = ShutdownSignal::install().context("Failed to install signal handlers")?;

    let pipeline = tokio::task::spawn_blocking(move || {
        pipeline.snapshot();
        pipeline
    })
    .await
    .context("Initial snapshot task failed")?;

    let watch_options = WatchOptions {
        recursive: true,
        debounce: config.debounce(),
        exclusions: config.exclusions(),
    };
    let mut watcher = Watcher::start(config.watch_root(), watch_options, pipeline)
        .with_context(|| format!("Failed to watch {}", config.watch_root().display()))?;

    println!(
        "Watching for changes in {}",
        config.watch_root().display().to_string().cyan()
    );
    if let Some(window) = config.debounce() {
        println!("Debounced mode: {} ms quiet window", window.as_millis());
    }

    let signal = shutdown.wait().await;
    info!("Received {:?}, stopping watcher", signal);
    println!("Stopping...");

    // Joins the delivery thread; a snapshot in progress finishes first
    tokio::task::spawn_blocking(move || watcher.stop())
        .await
        .context("Failed to stop watcher")?;

    Ok(())
}
