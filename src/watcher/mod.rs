//! Filesystem event source for the change event router.
//!
//! ```text
//! notify::RecommendedWatcher (recursive on the repository root)
//!         |
//!   EventTranslator   create / remove / rename pairing
//!         |
//!     Debouncer       content changes wait for a quiet period
//!         |
//!  ChangeEventRouter
//! ```

mod debouncer;
mod error;
mod events;
mod repo_watcher;

pub use debouncer::Debouncer;
pub use error::WatchError;
pub use events::{EventTranslator, Translated};
pub use repo_watcher::{RepoWatcher, RepoWatcherBuilder, WatchStats};
