//! Filesystem watcher feeding the change event router.

use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;

use notify::{Event, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tokio::time::{Duration, sleep};

use crate::router::{ChangeEvent, ChangeEventRouter, RouteOutcome};

use super::debouncer::Debouncer;
use super::error::WatchError;
use super::events::{EventTranslator, Translated};

/// How long a rename source waits for its destination before it is
/// treated as a move out of the repository.
const RENAME_PAIR_WINDOW: Duration = Duration::from_millis(200);

/// Counters for one watch session.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct WatchStats {
    pub recorded: usize,
    pub skipped: usize,
    pub failed: usize,
}

/// Watches one repository recursively and routes every change.
///
/// Creations, deletions and renames are routed immediately; content
/// changes are debounced and then diffed against the shadow.
pub struct RepoWatcher {
    router: Arc<ChangeEventRouter>,
    root: PathBuf,
    translator: EventTranslator,
    debouncer: Debouncer,
    event_rx: mpsc::Receiver<notify::Result<Event>>,
    watcher: notify::RecommendedWatcher,
    stats: WatchStats,
}

impl RepoWatcher {
    pub fn builder() -> RepoWatcherBuilder {
        RepoWatcherBuilder::new()
    }

    pub fn root(&self) -> &std::path::Path {
        &self.root
    }

    /// Run until `shutdown` resolves. Pending content changes are flushed
    /// before returning.
    pub async fn watch(
        mut self,
        shutdown: impl Future<Output = ()>,
    ) -> Result<WatchStats, WatchError> {
        self.watcher
            .watch(&self.root, RecursiveMode::Recursive)
            .map_err(|e| WatchError::PathWatchFailed {
                path: self.root.clone(),
                reason: e.to_string(),
            })?;
        crate::log_event!("watcher", "started", "{}", self.root.display());

        tokio::pin!(shutdown);

        loop {
            // Periodic check for debounced changes
            let tick = sleep(Duration::from_millis(100));
            tokio::pin!(tick);

            tokio::select! {
                _ = &mut shutdown => break,

                res = self.event_rx.recv() => match res {
                    Some(Ok(event)) => self.handle_event(event),
                    Some(Err(e)) => tracing::error!("[watcher] file watch error: {e}"),
                    None => return Err(WatchError::ChannelClosed),
                },

                _ = &mut tick => self.process_ready(),
            }
        }

        if let Some(Translated::Route(event)) = self.translator.flush_unpaired() {
            self.route(&event);
        }
        for path in self.debouncer.drain() {
            self.route(&ChangeEvent::Changed { path });
        }

        crate::log_event!(
            "watcher",
            "stopped",
            "{} recorded, {} skipped, {} failed",
            self.stats.recorded,
            self.stats.skipped,
            self.stats.failed
        );
        Ok(self.stats)
    }

    fn handle_event(&mut self, event: Event) {
        for translated in self.translator.translate(event) {
            match translated {
                Translated::Debounce(path) => self.debouncer.record(path),
                Translated::Route(event) => {
                    match &event {
                        ChangeEvent::Deleted { path } => self.debouncer.remove(path),
                        ChangeEvent::Renamed { from, to } => self.debouncer.rename(from, to),
                        _ => {}
                    }
                    self.route(&event);
                }
            }
        }
    }

    fn process_ready(&mut self) {
        if let Some(Translated::Route(event)) = self.translator.flush_stale(RENAME_PAIR_WINDOW) {
            self.route(&event);
        }
        for path in self.debouncer.take_ready() {
            self.route(&ChangeEvent::Changed { path });
        }
    }

    fn route(&mut self, event: &ChangeEvent) {
        match self.router.handle(event) {
            Ok(RouteOutcome::Recorded(_)) => self.stats.recorded += 1,
            Ok(RouteOutcome::Skipped(_)) => self.stats.skipped += 1,
            Err(e) => {
                tracing::error!("[watcher] failed to record {}: {e}", event.path().display());
                self.stats.failed += 1;
            }
        }
    }
}

/// Builder for [`RepoWatcher`].
pub struct RepoWatcherBuilder {
    router: Option<Arc<ChangeEventRouter>>,
    debounce_ms: u64,
}

impl RepoWatcherBuilder {
    pub fn new() -> Self {
        Self {
            router: None,
            debounce_ms: 500,
        }
    }

    pub fn router(mut self, router: Arc<ChangeEventRouter>) -> Self {
        self.router = Some(router);
        self
    }

    pub fn debounce_ms(mut self, ms: u64) -> Self {
        self.debounce_ms = ms;
        self
    }

    pub fn build(self) -> Result<RepoWatcher, WatchError> {
        let router = self.router.ok_or_else(|| WatchError::InitFailed {
            reason: "Router is required".to_string(),
        })?;
        let root = router
            .repository()
            .ok_or(WatchError::NoRepository)?
            .root()
            .to_path_buf();

        let (tx, rx) = mpsc::channel(256);
        let watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
            let _ = tx.blocking_send(res);
        })?;

        Ok(RepoWatcher {
            router,
            root,
            translator: EventTranslator::new(),
            debouncer: Debouncer::new(self.debounce_ms),
            event_rx: rx,
            watcher,
            stats: WatchStats::default(),
        })
    }
}

impl Default for RepoWatcherBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::paths::Repository;
    use crate::storage::{DiffBuffer, MirrorStore};
    use notify::EventKind;
    use notify::event::{CreateKind, DataChange, ModifyKind};
    use std::fs;
    use tempfile::TempDir;

    fn router(temp: &TempDir, repo: Option<Repository>) -> Arc<ChangeEventRouter> {
        Arc::new(ChangeEventRouter::new(
            repo,
            MirrorStore::new(temp.path().join("shadow"), temp.path().join("originals")),
            DiffBuffer::new(temp.path().join("diffs")),
        ))
    }

    #[test]
    fn test_builder_requires_router_and_repository() {
        assert!(matches!(
            RepoWatcher::builder().build(),
            Err(WatchError::InitFailed { .. })
        ));

        let temp = TempDir::new().unwrap();
        assert!(matches!(
            RepoWatcher::builder().router(router(&temp, None)).build(),
            Err(WatchError::NoRepository)
        ));
    }

    #[tokio::test]
    async fn test_events_flow_into_router() {
        let temp = TempDir::new().unwrap();
        let root = temp.path().join("repo");
        fs::create_dir_all(&root).unwrap();
        let file = root.join("a.txt");
        fs::write(&file, "one").unwrap();

        let mut watcher = RepoWatcher::builder()
            .router(router(&temp, Some(Repository::new(&root))))
            .debounce_ms(0)
            .build()
            .unwrap();

        watcher.handle_event(
            Event::new(EventKind::Create(CreateKind::File)).add_path(file.clone()),
        );
        assert_eq!(watcher.stats.recorded, 1);

        fs::write(&file, "one two").unwrap();
        watcher.handle_event(
            Event::new(EventKind::Modify(ModifyKind::Data(DataChange::Content)))
                .add_path(file.clone()),
        );
        // Debounced until the next tick
        assert_eq!(watcher.stats.recorded, 1);
        watcher.process_ready();
        assert_eq!(watcher.stats.recorded, 2);

        // Shutting down right away still drains pending changes
        fs::write(&file, "one two three").unwrap();
        watcher.handle_event(
            Event::new(EventKind::Modify(ModifyKind::Data(DataChange::Content))).add_path(file),
        );
        let stats = watcher.watch(async {}).await.unwrap();
        assert_eq!(stats.recorded, 3);
    }
}
