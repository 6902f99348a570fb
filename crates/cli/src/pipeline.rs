//! The event-to-snapshot pipeline
//!
//! Every delivered event takes one full snapshot and then appends one change log
//! line. The order matters: a crash mid-copy leaves a snapshot without its log line,
//! never a log line without its snapshot attempt.

use crate::util;
use journal::Journal;
use owo_colors::OwoColorize;
use std::sync::Arc;
use tracing::debug;
use watcher::{EventHandler, EventKind, WatchEvent};
use wnb_core::{Config, SnapshotEngine, SnapshotReport};

pub struct BackupPipeline {
    config: Arc<Config>,
    engine: SnapshotEngine<Arc<Journal>>,
    journal: Arc<Journal>,
    /// Suppress per-event console lines
    quiet: bool,
}

impl BackupPipeline {
    pub fn new(config: Arc<Config>, journal: Arc<Journal>) -> Self {
        let engine = SnapshotEngine::from_config(&config, Arc::clone(&journal));
        Self {
            config,
            engine,
            journal,
            quiet: false,
        }
    }

    pub fn quiet(mut self, quiet: bool) -> Self {
        self.quiet = quiet;
        self
    }

    pub fn engine(&self) -> &SnapshotEngine<Arc<Journal>> {
        &self.engine
    }

    pub fn journal(&self) -> &Journal {
        &self.journal
    }

    /// Take one full snapshot of the watch root
    pub fn snapshot(&self) -> SnapshotReport {
        let report = self.engine.backup(self.config.watch_root());
        self.print_report(&report);
        report
    }

    fn print_event(&self, event: &WatchEvent) {
        if self.quiet {
            return;
        }
        let kind = event.kind().to_string();
        let kind = match event.kind() {
            EventKind::Created => kind.green().to_string(),
            EventKind::Modified => kind.yellow().to_string(),
            EventKind::Deleted => kind.red().to_string(),
            EventKind::Moved => kind.cyan().to_string(),
        };
        match event.dest_path() {
            Some(dest) => println!(
                "{:>8} {} -> {}",
                kind,
                event.source_path().display(),
                dest.display()
            ),
            None => println!("{:>8} {}", kind, event.source_path().display()),
        }
    }

    fn print_report(&self, report: &SnapshotReport) {
        if self.quiet {
            return;
        }
        let name = report
            .destination
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let summary = format!(
            "{} files, {} dirs, {}",
            report.files_copied,
            report.dirs_created,
            util::format_size(report.bytes_copied)
        );
        if report.is_complete() {
            println!("Snapshot {} {}", name.bold(), summary.dimmed());
        } else {
            println!(
                "Snapshot {} {} {}",
                name.bold(),
                summary.dimmed(),
                format!("({} failed, see error log)", report.failures.len()).red()
            );
        }
    }
}

impl EventHandler for BackupPipeline {
    fn handle(&mut self, event: WatchEvent) {
        debug!("Handling {:?}", event);
        self.print_event(&event);
        self.snapshot();
        self.journal.record_change(&event.to_string());
    }

    /// Debounced mode: one snapshot for the whole batch, one log line per event
    fn handle_batch(&mut self, events: Vec<WatchEvent>) {
        if events.is_empty() {
            return;
        }
        debug!("Handling batch of {} events", events.len());
        for event in &events {
            self.print_event(event);
        }
        self.snapshot();
        for event in &events {
            self.journal.record_change(&event.to_string());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::PathBuf;
    use tempfile::TempDir;

    struct Fixture {
        _app: TempDir,
        _watched: TempDir,
        config: Arc<Config>,
        pipeline: BackupPipeline,
    }

    fn fixture() -> Fixture {
        let app = TempDir::new().unwrap();
        let watched = TempDir::new().unwrap();
        let config = Arc::new(Config::new(watched.path(), app.path()).prepare().unwrap());
        let journal = Arc::new(Journal::from_config(&config));
        let pipeline = BackupPipeline::new(Arc::clone(&config), journal).quiet(true);
        Fixture {
            _app: app,
            _watched: watched,
            config,
            pipeline,
        }
    }

    #[test]
    fn test_modification_yields_one_snapshot_and_one_log_line() {
        let mut fx = fixture();
        let file = fx.config.watch_root().join("notes.txt");
        fs::write(&file, b"edited").unwrap();

        fx.pipeline.handle(WatchEvent::Modified(file.clone()));

        let snapshots = fx.pipeline.engine().list_snapshots().unwrap();
        assert_eq!(snapshots.len(), 1);
        let copied = fx.config.backup_root().join(snapshots[0].as_str()).join("notes.txt");
        assert_eq!(fs::read(copied).unwrap(), b"edited");

        let entries = fx.pipeline.journal().change_log().entries().unwrap();
        assert_eq!(entries.len(), 1);
        assert!(entries[0].description.contains(&*file.to_string_lossy()));
        assert!(entries[0].description.contains("modified"));
        assert!(fx.pipeline.journal().error_log().entries().unwrap().is_empty());
    }

    #[test]
    fn test_every_kind_is_logged() {
        let mut fx = fixture();
        let root = fx.config.watch_root().to_path_buf();

        fx.pipeline.handle(WatchEvent::Created(root.join("a")));
        fx.pipeline.handle(WatchEvent::Deleted(root.join("a")));
        fx.pipeline.handle(WatchEvent::Moved {
            from: root.join("b"),
            to: root.join("c"),
        });

        let descriptions: Vec<_> = fx
            .pipeline
            .journal()
            .change_log()
            .entries()
            .unwrap()
            .into_iter()
            .map(|e| e.description)
            .collect();
        assert_eq!(
            descriptions,
            vec![
                format!("{} was created", root.join("a").display()),
                format!("{} was deleted", root.join("a").display()),
                format!(
                    "{} was moved to {}",
                    root.join("b").display(),
                    root.join("c").display()
                ),
            ]
        );
    }

    #[test]
    fn test_initial_snapshot_of_empty_tree() {
        let fx = fixture();

        let report = fx.pipeline.snapshot();

        assert!(report.is_complete());
        assert!(report.destination.is_dir());
        assert_eq!(fs::read_dir(&report.destination).unwrap().count(), 0);
        assert!(fx.pipeline.journal().change_log().entries().unwrap().is_empty());
    }

    #[test]
    fn test_nested_backup_root_is_not_copied() {
        let app_and_watched = TempDir::new().unwrap();
        let config = Arc::new(
            Config::new(app_and_watched.path(), app_and_watched.path())
                .prepare()
                .unwrap(),
        );
        fs::write(config.watch_root().join("data.txt"), b"data").unwrap();
        let pipeline = BackupPipeline::new(
            Arc::clone(&config),
            Arc::new(Journal::from_config(&config)),
        )
        .quiet(true);

        let report = pipeline.snapshot();

        assert!(report.is_complete());
        assert!(report.destination.join("data.txt").is_file());
        assert!(!report.destination.join("wnb_backups").exists());
        assert!(!report.destination.join("wnb_logs").exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_copy_failure_is_logged_and_event_still_recorded() {
        let mut fx = fixture();
        let root = fx.config.watch_root().to_path_buf();
        fs::write(root.join("good.txt"), b"good").unwrap();
        let broken = root.join("dangling");
        std::os::unix::fs::symlink(root.join("missing-target"), &broken).unwrap();

        fx.pipeline.handle(WatchEvent::Created(root.join("good.txt")));

        let errors = fx.pipeline.journal().error_log().entries().unwrap();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].description.starts_with("Error backing up "));
        assert!(errors[0].description.contains(&*broken.to_string_lossy()));

        assert_eq!(fx.pipeline.journal().change_log().entries().unwrap().len(), 1);
        let snapshot = fx.pipeline.engine().list_snapshots().unwrap().remove(0);
        assert!(fx
            .config
            .backup_root()
            .join(snapshot.as_str())
            .join("good.txt")
            .is_file());
    }

    #[test]
    fn test_batch_takes_one_snapshot() {
        let mut fx = fixture();
        let root = fx.config.watch_root().to_path_buf();
        let events: Vec<_> = ["x", "y", "z"]
            .iter()
            .map(|name| WatchEvent::Created(root.join(name)))
            .collect();

        fx.pipeline.handle_batch(events);
        fx.pipeline.handle_batch(Vec::new());

        assert_eq!(fx.pipeline.engine().list_snapshots().unwrap().len(), 1);
        assert_eq!(fx.pipeline.journal().change_log().entries().unwrap().len(), 3);
    }

    #[test]
    fn test_missing_root_does_not_panic() {
        let mut fx = fixture();
        let root: PathBuf = fx.config.watch_root().to_path_buf();
        fs::remove_dir_all(&root).unwrap();

        fx.pipeline.handle(WatchEvent::Deleted(root.clone()));

        assert_eq!(fx.pipeline.journal().change_log().entries().unwrap().len(), 1);
        assert_eq!(fx.pipeline.journal().error_log().entries().unwrap().len(), 1);
    }
}
