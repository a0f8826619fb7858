//! Quiet-period tracking for content change events.
//!
//! Editors often write a file several times per save (auto-save,
//! formatters). A content change is only diffed once the file has been quiet
//! for the configured window, so one save yields one patch.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

/// Debounces content changes by path.
#[derive(Debug)]
pub struct Debouncer {
    /// Path -> time of its latest change.
    pending: HashMap<PathBuf, Instant>,
    window: Duration,
}

impl Debouncer {
    pub fn new(debounce_ms: u64) -> Self {
        Self {
            pending: HashMap::new(),
            window: Duration::from_millis(debounce_ms),
        }
    }

    /// Record a change, restarting the quiet period for this path.
    pub fn record(&mut self, path: PathBuf) {
        self.pending.insert(path, Instant::now());
    }

    /// Forget a path, e.g. after it was deleted.
    pub fn remove(&mut self, path: &Path) {
        self.pending.remove(path);
    }

    /// Carry a pending change over to a file's new name.
    pub fn rename(&mut self, from: &Path, to: &Path) {
        if let Some(at) = self.pending.remove(from) {
            self.pending.insert(to.to_path_buf(), at);
        }
    }

    /// Remove and return paths that have been quiet for the whole window,
    /// oldest change first.
    pub fn take_ready(&mut self) -> Vec<PathBuf> {
        let now = Instant::now();
        let mut ready = Vec::new();

        self.pending.retain(|path, last_change| {
            if now.duration_since(*last_change) >= self.window {
                ready.push((*last_change, path.clone()));
                false
            } else {
                true
            }
        });

        ready.sort();
        ready.into_iter().map(|(_, path)| path).collect()
    }

    /// Remove and return everything pending, ready or not.
    pub fn drain(&mut self) -> Vec<PathBuf> {
        let mut all: Vec<(Instant, PathBuf)> =
            self.pending.drain().map(|(path, at)| (at, path)).collect();
        all.sort();
        all.into_iter().map(|(_, path)| path).collect()
    }

    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }
}
