//! Event coalescing for the change watcher.
//!
//! Pure timing and deduplication; classification and ignore filtering
//! happen before events reach the debouncer.

use std::path::PathBuf;
use std::time::{Duration, Instant};

use rustc_hash::FxHashMap;

use super::{ChangeEvent, ChangeKind};
use crate::debug;

/// Coalesces changes inside a configurable window.
///
/// A zero window disables coalescing: events become ready as soon as
/// they are recorded.
pub struct Debouncer {
    window: Duration,
    /// Path → ChangeKind (dedup is free via HashMap key uniqueness)
    changes: FxHashMap<PathBuf, ChangeKind>,
    last_event: Option<Instant>,
}

impl Debouncer {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            changes: FxHashMap::default(),
            last_event: None,
        }
    }

    /// Record one change, applying dedup rules:
    /// - Removed + Added/Modified: restored, use the new event
    /// - Modified + Removed: deleted, upgrade to Removed
    /// - Added + Removed: appeared then vanished, discard both
    /// - Same kind or other combos: first event wins
    pub fn add(&mut self, path: PathBuf, kind: ChangeKind) {
        if let Some(&existing) = self.changes.get(&path) {
            match (existing.is_removal(), kind.is_removal()) {
                (true, false) => {
                    debug!("watch"; "restore {}->{}: {}", existing.label(), kind.label(), path.display());
                    self.changes.insert(path, kind);
                }
                (false, true) if existing.is_appearance() => {
                    debug!("watch"; "discard {}+{}: {}", existing.label(), kind.label(), path.display());
                    self.changes.remove(&path);
                }
                (false, true) => {
                    debug!("watch"; "upgrade {}->{}: {}", existing.label(), kind.label(), path.display());
                    self.changes.insert(path, kind);
                }
                _ => return,
            }
            self.last_event = Some(Instant::now());
            return;
        }

        debug!("watch"; "event {}: {}", kind.label(), path.display());
        self.changes.insert(path, kind);
        self.last_event = Some(Instant::now());
    }

    /// Take the coalesced events once the window has elapsed.
    ///
    /// Events are sorted by path for deterministic delivery.
    pub fn take_if_ready(&mut self) -> Option<Vec<ChangeEvent>> {
        if !self.is_ready() {
            return None;
        }

        let changes = std::mem::take(&mut self.changes);
        self.last_event = None;

        if changes.is_empty() {
            return None;
        }

        let mut events: Vec<ChangeEvent> = changes
            .into_iter()
            .map(|(path, kind)| ChangeEvent { path, kind })
            .collect();
        events.sort_by(|a, b| a.path.cmp(&b.path));
        Some(events)
    }

    pub fn is_ready(&self) -> bool {
        let Some(last_event) = self.last_event else {
            return false;
        };

        if last_event.elapsed() < self.window {
            return false;
        }

        !self.changes.is_empty()
    }

    /// Precise sleep duration until the next possible ready time.
    pub fn sleep_duration(&self) -> Duration {
        let Some(last_event) = self.last_event else {
            return Duration::from_secs(86400);
        };

        self.window
            .saturating_sub(last_event.elapsed())
            .max(Duration::from_millis(1))
    }
}
