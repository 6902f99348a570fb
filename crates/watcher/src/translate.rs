//! Translation of raw notify events into watch events
//!
//! inotify reports one rename as up to three notifications: `Name(From)`,
//! `Name(To)` and `Name(Both)`, linked by a tracker cookie. They are folded into a
//! single `Moved`. A `From` that never finds its partner within the pairing
//! window was moved out of the tree and becomes `Deleted`; a lone `To` was moved
//! in and becomes `Created`.

use crate::event::WatchEvent;
use notify::event::{ModifyKind, RenameMode};
use notify::EventKind as RawKind;
use std::path::PathBuf;
use std::time::{Duration, Instant};

/// How long a `Name(From)` waits for its partner
pub const MOVE_PAIRING_WINDOW: Duration = Duration::from_millis(100);

/// Rename half waiting for its partner
#[derive(Debug)]
struct PendingMove {
    from: PathBuf,
    tracker: usize,
    since: Instant,
}

/// Stateful notify-to-watch-event translator
#[derive(Debug, Default)]
pub struct Translator {
    pending: Option<PendingMove>,
    /// Tracker of the last pair completed by `Name(To)`; its `Name(Both)` is redundant
    completed: Option<usize>,
}

impl Translator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Translate one raw event; may also release a previously held rename
    pub fn translate(&mut self, event: notify::Event, now: Instant) -> Vec<WatchEvent> {
        let mut out = Vec::new();
        let tracker = event.tracker();
        let mut paths = event.paths.into_iter();

        match event.kind {
            RawKind::Modify(ModifyKind::Name(RenameMode::From)) => {
                self.flush_into(&mut out);
                if let Some(from) = paths.next() {
                    match tracker {
                        Some(tracker) => {
                            self.pending = Some(PendingMove {
                                from,
                                tracker,
                                since: now,
                            })
                        }
                        None => out.push(WatchEvent::Deleted(from)),
                    }
                }
            }
            RawKind::Modify(ModifyKind::Name(RenameMode::To)) => {
                let Some(to) = paths.next() else {
                    return out;
                };
                match self.take_pending(tracker) {
                    Some(from) => {
                        self.completed = tracker;
                        out.push(WatchEvent::Moved { from, to });
                    }
                    None => {
                        self.flush_into(&mut out);
                        out.push(WatchEvent::Created(to));
                    }
                }
            }
            RawKind::Modify(ModifyKind::Name(RenameMode::Both)) => {
                if tracker.is_some() && tracker == self.completed {
                    self.completed = None;
                    return out;
                }
                // A pending half of this very rename is superseded by the full pair
                if self.take_pending(tracker).is_none() {
                    self.flush_into(&mut out);
                }
                out.extend(rename_or_modify(paths.collect()));
            }
            RawKind::Modify(ModifyKind::Name(_)) => {
                self.flush_into(&mut out);
                out.extend(rename_or_modify(paths.collect()));
            }
            RawKind::Create(_) => {
                self.flush_into(&mut out);
                out.extend(paths.map(WatchEvent::Created));
            }
            RawKind::Remove(_) => {
                self.flush_into(&mut out);
                out.extend(paths.map(WatchEvent::Deleted));
            }
            RawKind::Modify(_) | RawKind::Any => {
                self.flush_into(&mut out);
                out.extend(paths.map(WatchEvent::Modified));
            }
            // Reads and opaque backend notices are not mutations
            RawKind::Access(_) | RawKind::Other => {}
        }

        out
    }

    /// When the held rename half expires, if any
    pub fn deadline(&self) -> Option<Instant> {
        self.pending
            .as_ref()
            .map(|pending| pending.since + MOVE_PAIRING_WINDOW)
    }

    /// Release a held rename half whose pairing window has elapsed
    pub fn flush_expired(&mut self, now: Instant) -> Option<WatchEvent> {
        match self.deadline() {
            Some(deadline) if deadline <= now => self.flush(),
            _ => None,
        }
    }

    /// Release a held rename half unconditionally
    pub fn flush(&mut self) -> Option<WatchEvent> {
        self.pending
            .take()
            .map(|pending| WatchEvent::Deleted(pending.from))
    }

    fn flush_into(&mut self, out: &mut Vec<WatchEvent>) {
        out.extend(self.flush());
    }

    fn take_pending(&mut self, tracker: Option<usize>) -> Option<PathBuf> {
        match (&self.pending, tracker) {
            (Some(pending), Some(tracker)) if pending.tracker == tracker => {
                self.pending.take().map(|pending| pending.from)
            }
            _ => None,
        }
    }
}

fn rename_or_modify(paths: Vec<PathBuf>) -> Option<WatchEvent> {
    let mut paths = paths.into_iter();
    match (paths.next(), paths.next()) {
        (Some(from), Some(to)) => Some(WatchEvent::Moved { from, to }),
        (Some(path), None) => Some(WatchEvent::Modified(path)),
        _ => None,
    }
}
