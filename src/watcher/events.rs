//! Translation of raw `notify` events into router events.

use std::path::PathBuf;
use std::time::{Duration, Instant};

use notify::event::{ModifyKind, RenameMode};
use notify::{Event, EventKind};

use crate::router::ChangeEvent;

/// What the watcher should do with one translated event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Translated {
    /// Route right away.
    Route(ChangeEvent),
    /// Content changed; wait for the file to go quiet.
    Debounce(PathBuf),
}

/// Stateful translator pairing split rename events.
#[derive(Debug, Default)]
pub struct EventTranslator {
    /// A rename source waiting for its destination.
    pending_from: Option<PendingFrom>,
    /// Tracker of a rename already routed from its `To` half. inotify
    /// follows the pair with a `Both` event carrying the same tracker.
    routed_tracker: Option<usize>,
}

#[derive(Debug)]
struct PendingFrom {
    tracker: Option<usize>,
    path: PathBuf,
    since: Instant,
}

impl EventTranslator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn translate(&mut self, event: Event) -> Vec<Translated> {
        let tracker = event.tracker();
        let mut out = Vec::new();

        match event.kind {
            EventKind::Create(_) => {
                out.extend(event.paths.into_iter().map(|path| {
                    Translated::Route(ChangeEvent::Created { path })
                }));
            }
            EventKind::Remove(_) => {
                out.extend(event.paths.into_iter().map(|path| {
                    Translated::Route(ChangeEvent::Deleted { path })
                }));
            }
            EventKind::Modify(ModifyKind::Name(mode)) => {
                self.rename(mode, tracker, event.paths, &mut out);
            }
            EventKind::Modify(ModifyKind::Data(_) | ModifyKind::Any | ModifyKind::Other) => {
                out.extend(event.paths.into_iter().map(Translated::Debounce));
            }
            _ => {}
        }

        out
    }

    fn rename(
        &mut self,
        mode: RenameMode,
        tracker: Option<usize>,
        paths: Vec<PathBuf>,
        out: &mut Vec<Translated>,
    ) {
        match mode {
            RenameMode::Both => {
                if tracker.is_some() && self.routed_tracker == tracker {
                    self.routed_tracker = None;
                    return;
                }
                let mut paths = paths.into_iter();
                if let (Some(from), Some(to)) = (paths.next(), paths.next()) {
                    out.push(Translated::Route(ChangeEvent::Renamed { from, to }));
                }
            }
            RenameMode::From => {
                out.extend(self.flush_unpaired());
                if let Some(path) = paths.into_iter().next() {
                    self.pending_from = Some(PendingFrom {
                        tracker,
                        path,
                        since: Instant::now(),
                    });
                }
            }
            RenameMode::To => {
                let Some(to) = paths.into_iter().next() else {
                    return;
                };
                self.routed_tracker = tracker;
                match self.pending_from.take() {
                    Some(from) if tracker.is_none() || from.tracker == tracker => {
                        out.push(Translated::Route(ChangeEvent::Renamed {
                            from: from.path,
                            to,
                        }));
                    }
                    unmatched => {
                        self.pending_from = unmatched;
                        out.push(Translated::Route(ChangeEvent::Created { path: to }));
                    }
                }
            }
            // Platforms that report each side separately without a mode
            RenameMode::Any | RenameMode::Other => {
                for path in paths {
                    let event = if path.exists() {
                        ChangeEvent::Created { path }
                    } else {
                        ChangeEvent::Deleted { path }
                    };
                    out.push(Translated::Route(event));
                }
            }
        }
    }

    /// A rename source whose destination never arrived moved out of view;
    /// report it as deleted.
    pub fn flush_unpaired(&mut self) -> Option<Translated> {
        self.pending_from
            .take()
            .map(|from| Translated::Route(ChangeEvent::Deleted { path: from.path }))
    }

    /// Like [`EventTranslator::flush_unpaired`], but only once the source has
    /// waited at least `max_wait` for its destination.
    pub fn flush_stale(&mut self, max_wait: Duration) -> Option<Translated> {
        let stale = self
            .pending_from
            .as_ref()
            .is_some_and(|from| from.since.elapsed() >= max_wait);
        if stale { self.flush_unpaired() } else { None }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::{CreateKind, DataChange, MetadataKind, RemoveKind};

    fn event(kind: EventKind, paths: &[&str]) -> Event {
        paths
            .iter()
            .fold(Event::new(kind), |e, p| e.add_path(PathBuf::from(p)))
    }

    fn route(event: ChangeEvent) -> Translated {
        Translated::Route(event)
    }

    #[test]
    fn test_create_remove_and_modify() {
        let mut t = EventTranslator::new();
        assert_eq!(
            t.translate(event(EventKind::Create(CreateKind::File), &["/r/a"])),
            vec![route(ChangeEvent::Created { path: "/r/a".into() })]
        );
        assert_eq!(
            t.translate(event(EventKind::Remove(RemoveKind::Any), &["/r/a"])),
            vec![route(ChangeEvent::Deleted { path: "/r/a".into() })]
        );
        assert_eq!(
            t.translate(event(
                EventKind::Modify(ModifyKind::Data(DataChange::Content)),
                &["/r/a"]
            )),
            vec![Translated::Debounce("/r/a".into())]
        );
        assert!(
            t.translate(event(
                EventKind::Modify(ModifyKind::Metadata(MetadataKind::Permissions)),
                &["/r/a"]
            ))
            .is_empty()
        );
    }

    #[test]
    fn test_rename_both() {
        let mut t = EventTranslator::new();
        let out = t.translate(event(
            EventKind::Modify(ModifyKind::Name(RenameMode::Both)),
            &["/r/old/p.txt", "/r/new/p.txt"],
        ));
        assert_eq!(
            out,
            vec![route(ChangeEvent::Renamed {
                from: "/r/old/p.txt".into(),
                to: "/r/new/p.txt".into(),
            })]
        );
    }

    #[test]
    fn test_rename_pairs_from_and_to() {
        let mut t = EventTranslator::new();
        let from =
            event(EventKind::Modify(ModifyKind::Name(RenameMode::From)), &["/r/a"]).set_tracker(7);
        let to =
            event(EventKind::Modify(ModifyKind::Name(RenameMode::To)), &["/r/b"]).set_tracker(7);

        assert!(t.translate(from).is_empty());
        assert_eq!(
            t.translate(to),
            vec![route(ChangeEvent::Renamed {
                from: "/r/a".into(),
                to: "/r/b".into(),
            })]
        );
        assert_eq!(t.flush_unpaired(), None);
    }

    #[test]
    fn test_inotify_rename_triple_routes_once() {
        let mut t = EventTranslator::new();
        let from = event(EventKind::Modify(ModifyKind::Name(RenameMode::From)), &["/r/old/p.txt"])
            .set_tracker(3);
        let to = event(EventKind::Modify(ModifyKind::Name(RenameMode::To)), &["/r/new/p.txt"])
            .set_tracker(3);
        let both = event(
            EventKind::Modify(ModifyKind::Name(RenameMode::Both)),
            &["/r/old/p.txt", "/r/new/p.txt"],
        )
        .set_tracker(3);

        let mut out = t.translate(from);
        out.extend(t.translate(to));
        out.extend(t.translate(both));
        assert_eq!(
            out,
            vec![route(ChangeEvent::Renamed {
                from: "/r/old/p.txt".into(),
                to: "/r/new/p.txt".into(),
            })]
        );

        // A later rename with its own tracker still goes through
        let next = event(
            EventKind::Modify(ModifyKind::Name(RenameMode::Both)),
            &["/r/new/p.txt", "/r/p.txt"],
        )
        .set_tracker(4);
        assert_eq!(t.translate(next).len(), 1);
    }

    #[test]
    fn test_unpaired_rename_sides() {
        let mut t = EventTranslator::new();
        // Destination without a source: moved in from outside
        assert_eq!(
            t.translate(event(EventKind::Modify(ModifyKind::Name(RenameMode::To)), &["/r/in"])),
            vec![route(ChangeEvent::Created { path: "/r/in".into() })]
        );

        // Source without a destination: moved out
        let out = t.translate(event(
            EventKind::Modify(ModifyKind::Name(RenameMode::From)),
            &["/r/out"],
        ));
        assert!(out.is_empty());
        assert_eq!(t.flush_stale(Duration::from_secs(60)), None);
        assert_eq!(
            t.flush_stale(Duration::ZERO),
            Some(route(ChangeEvent::Deleted { path: "/r/out".into() }))
        );
        assert_eq!(t.flush_unpaired(), None);
    }
}
