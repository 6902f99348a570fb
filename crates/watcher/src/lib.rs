//! File system watching for wnb
//!
//! This crate provides:
//! - Recursive watching of one root through the platform notify backend
//! - Translation of raw notifications into four mutation kinds
//! - A dedicated delivery thread calling the handler once per event
//! - Optional debouncing (off by default)

pub mod debounce;
pub mod error;
pub mod event;
pub mod translate;

pub use error::{Result, WatchError};
pub use event::{EventKind, WatchEvent};

use crossbeam_channel::{select, Receiver, RecvError, Sender};
use debounce::Debouncer;
use notify::{RecommendedWatcher, RecursiveMode, Watcher as _};
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};
use translate::Translator;

/// How long the delivery thread sleeps when nothing is pending
const IDLE_TIMEOUT: Duration = Duration::from_secs(1);

/// Receives delivered events on the watcher's delivery thread
pub trait EventHandler: Send + 'static {
    /// Handle one mutation
    fn handle(&mut self, event: WatchEvent);

    /// Handle a debounced batch; by default each event on its own
    fn handle_batch(&mut self, events: Vec<WatchEvent>) {
        for event in events {
            self.handle(event);
        }
    }
}

impl<F> EventHandler for F
where
    F: FnMut(WatchEvent) + Send + 'static,
{
    fn handle(&mut self, event: WatchEvent) {
        self(event)
    }
}

/// Options for a watch
#[derive(Debug, Clone)]
pub struct WatchOptions {
    /// Watch subdirectories too
    pub recursive: bool,
    /// Quiet window for debounced delivery; `None` delivers every event
    pub debounce: Option<Duration>,
    /// Events whose paths all lie under one of these are dropped
    pub exclusions: Vec<PathBuf>,
}

impl Default for WatchOptions {
    fn default() -> Self {
        Self {
            recursive: true,
            debounce: None,
            exclusions: Vec::new(),
        }
    }
}

/// A running watch over one directory tree
pub struct Watcher {
    root: PathBuf,
    /// Notify backend; dropping it ends raw notifications
    backend: Option<RecommendedWatcher>,
    shutdown_tx: Option<Sender<()>>,
    thread: Option<JoinHandle<()>>,
}

impl Watcher {
    /// Start watching `root`, delivering events to `handler` on a dedicated thread
    pub fn start<H: EventHandler>(root: &Path, options: WatchOptions, handler: H) -> Result<Self> {
        if !root.is_dir() {
            return Err(WatchError::PathUnavailable {
                path: root.to_path_buf(),
                reason: "not an existing directory".to_string(),
            });
        }

        let (raw_tx, raw_rx) = crossbeam_channel::unbounded();
        let mut backend = notify::recommended_watcher(move |res: notify::Result<notify::Event>| {
            // Receiver gone means the watcher is shutting down
            let _ = raw_tx.send(res);
        })?;

        let mode = if options.recursive {
            RecursiveMode::Recursive
        } else {
            RecursiveMode::NonRecursive
        };
        backend
            .watch(root, mode)
            .map_err(|e| WatchError::PathUnavailable {
                path: root.to_path_buf(),
                reason: e.to_string(),
            })?;

        let (shutdown_tx, shutdown_rx) = crossbeam_channel::bounded(1);
        let delivery = Delivery {
            root: root.to_path_buf(),
            translator: Translator::new(),
            debouncer: options.debounce.map(Debouncer::new),
            exclusions: options.exclusions,
            handler,
        };

        let thread = std::thread::Builder::new()
            .name("wnb-watcher".to_string())
            .spawn(move || delivery.run(raw_rx, shutdown_rx))?;

        info!("Watching {} ({:?})", root.display(), mode);

        Ok(Self {
            root: root.to_path_buf(),
            backend: Some(backend),
            shutdown_tx: Some(shutdown_tx),
            thread: Some(thread),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// True until `stop` has been called
    pub fn is_running(&self) -> bool {
        self.thread.is_some()
    }

    /// Stop delivering events and wait for the delivery thread to finish
    ///
    /// An event being handled when this is called runs to completion; events still
    /// queued behind it are discarded.
    pub fn stop(&mut self) {
        if let Some(shutdown_tx) = self.shutdown_tx.take() {
            let _ = shutdown_tx.send(());
        }
        self.backend = None;

        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                error!("Watcher delivery thread panicked");
            }
            info!("Stopped watching {}", self.root.display());
        }
    }
}

impl Drop for Watcher {
    fn drop(&mut self) {
        self.stop();
    }
}

/// State owned by the delivery thread
struct Delivery<H> {
    root: PathBuf,
    translator: Translator,
    debouncer: Option<Debouncer>,
    exclusions: Vec<PathBuf>,
    handler: H,
}

impl<H: EventHandler> Delivery<H> {
    fn run(mut self, raw_rx: Receiver<notify::Result<notify::Event>>, shutdown_rx: Receiver<()>) {
        loop {
            let timeout = self
                .next_deadline()
                .map(|deadline| deadline.saturating_duration_since(Instant::now()))
                .unwrap_or(IDLE_TIMEOUT);

            let keep_running = select! {
                recv(shutdown_rx) -> _ => false,
                recv(raw_rx) -> msg => self.on_raw(msg),
                default(timeout) => true,
            };
            if !keep_running {
                break;
            }

            let now = Instant::now();
            if let Some(event) = self.translator.flush_expired(now) {
                self.dispatch(event, now);
            }
            if let Some(batch) = self.debouncer.as_mut().and_then(|d| d.take_ready(now)) {
                self.deliver(|handler| handler.handle_batch(batch));
            }
        }
        debug!("Delivery thread for {} exiting", self.root.display());
    }

    /// Translate and dispatch one raw message; false once the backend is gone
    fn on_raw(&mut self, msg: std::result::Result<notify::Result<notify::Event>, RecvError>) -> bool {
        match msg {
            Ok(Ok(raw)) => {
                let now = Instant::now();
                for event in self.translator.translate(raw, now) {
                    self.dispatch(event, now);
                }
                true
            }
            Ok(Err(e)) => {
                warn!("Watch error on {}: {}", self.root.display(), e);
                true
            }
            Err(_) => {
                debug!("Notify backend closed");
                false
            }
        }
    }

    fn next_deadline(&self) -> Option<Instant> {
        let rename = self.translator.deadline();
        let batch = self.debouncer.as_ref().and_then(Debouncer::deadline);
        match (rename, batch) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    fn dispatch(&mut self, event: WatchEvent, now: Instant) {
        if self.is_excluded(&event) {
            return;
        }

        let root_removed = matches!(&event, WatchEvent::Deleted(path) if path == &self.root);

        match self.debouncer.as_mut() {
            Some(debouncer) => debouncer.push(event, now),
            None => self.deliver(|handler| handler.handle(event)),
        }

        if root_removed {
            warn!(
                "Watch root {} was removed; no further events will be delivered",
                self.root.display()
            );
        }
    }

    /// Run the handler, containing any panic to this one event
    fn deliver(&mut self, f: impl FnOnce(&mut H)) {
        let handler = &mut self.handler;
        if panic::catch_unwind(AssertUnwindSafe(|| f(handler))).is_err() {
            error!("Event handler panicked; continuing with the next event");
        }
    }

    fn is_excluded(&self, event: &WatchEvent) -> bool {
        !self.exclusions.is_empty()
            && event
                .paths()
                .all(|path| self.exclusions.iter().any(|ex| path.starts_with(ex)))
    }
}
