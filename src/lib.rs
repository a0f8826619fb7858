//! Client-side change tracking and sync bootstrap.
//!
//! A repository is first bootstrapped: eligibility is checked against the
//! sync service, an ignore file is prepared, and two mirrors of every
//! syncable file are seeded (a one-time `originals` snapshot and a `shadow`
//! that tracks the last recorded state). Afterwards every create, delete,
//! rename and edit is turned into a diff record in an on-disk buffer that
//! an uploader drains.

pub mod bootstrap;
pub mod cli;
pub mod config;
pub mod logging;
pub mod patch;
pub mod paths;
pub mod remote;
pub mod router;
pub mod scanner;
pub mod storage;
pub mod syncignore;
pub mod upload;
pub mod watcher;

pub use bootstrap::{
    AbortReason, BootstrapOutcome, BootstrapReport, BootstrapRequest, BootstrapState,
    Bootstrapper, Collaborators, SyncMode, Trigger, Visibility,
};
pub use config::Settings;
pub use patch::{Patch, PatchError, apply_patch, compute_patch};
pub use paths::{Repository, TrackedPath, is_ignored_system_path};
pub use router::{ChangeEvent, ChangeEventRouter, RouteOutcome, SkipReason};
pub use storage::{DiffBuffer, DiffKind, DiffRecord, MirrorKind, MirrorStore, SyncConfigStore};
pub use syncignore::Syncignore;
pub use watcher::RepoWatcher;
