//! Event descriptors consumed by the router and the outcomes it reports.

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

use crate::storage::RecordId;

/// A raw change reported by the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeEvent {
    Created { path: PathBuf },
    Deleted { path: PathBuf },
    Renamed { from: PathBuf, to: PathBuf },
    /// Content changed; live text is read from disk.
    Changed { path: PathBuf },
}

impl ChangeEvent {
    pub fn path(&self) -> &Path {
        match self {
            ChangeEvent::Created { path }
            | ChangeEvent::Deleted { path }
            | ChangeEvent::Changed { path } => path,
            ChangeEvent::Renamed { to, .. } => to,
        }
    }
}

/// An open document whose content may differ from its shadow.
pub trait EditorHandle {
    /// Absolute path, `None` for buffers never saved.
    fn path(&self) -> Option<&Path>;

    /// Current full text.
    fn text(&self) -> io::Result<String>;
}

/// A file on disk standing in for an editor buffer.
#[derive(Debug, Clone)]
pub struct DiskFile {
    path: PathBuf,
}

impl DiskFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl EditorHandle for DiskFile {
    fn path(&self) -> Option<&Path> {
        Some(&self.path)
    }

    fn text(&self) -> io::Result<String> {
        std::fs::read_to_string(&self.path)
    }
}

/// An in-memory buffer, for hosts that hand over text directly.
#[derive(Debug, Clone)]
pub struct BufferSnapshot {
    pub path: Option<PathBuf>,
    pub text: String,
}

impl EditorHandle for BufferSnapshot {
    fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    fn text(&self) -> io::Result<String> {
        Ok(self.text.clone())
    }
}

/// Why an event was dropped without recording anything.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// No repository root is open.
    NoRepository,
    /// The buffer has never been saved.
    Untitled,
    OutsideRepository,
    /// Inside a reserved tooling directory.
    SystemPath,
    /// Matched by `.syncignore`.
    Syncignored,
    Directory,
    /// The file disappeared before it could be read.
    Vanished,
    /// Content is not valid UTF-8.
    NotText,
    /// No shadow exists yet for this branch.
    NotYetTracked,
    /// Live content equals the shadow.
    Unchanged,
    EmptyPatch,
    /// The branch has no seeded shadow tree and creations wait for bootstrap.
    NotBootstrapped,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            SkipReason::NoRepository => "no repository open",
            SkipReason::Untitled => "buffer has no path",
            SkipReason::OutsideRepository => "outside repository",
            SkipReason::SystemPath => "system path",
            SkipReason::Syncignored => "ignored by .syncignore",
            SkipReason::Directory => "directory",
            SkipReason::Vanished => "file vanished",
            SkipReason::NotText => "not UTF-8 text",
            SkipReason::NotYetTracked => "shadow does not exist",
            SkipReason::Unchanged => "shadow is identical to content",
            SkipReason::EmptyPatch => "diff is empty",
            SkipReason::NotBootstrapped => "branch is not bootstrapped",
        };
        f.write_str(text)
    }
}

/// What the router did with one event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteOutcome {
    Recorded(RecordId),
    Skipped(SkipReason),
}

impl RouteOutcome {
    pub fn is_recorded(&self) -> bool {
        matches!(self, RouteOutcome::Recorded(_))
    }

    pub fn skip_reason(&self) -> Option<SkipReason> {
        match self {
            RouteOutcome::Skipped(reason) => Some(*reason),
            RouteOutcome::Recorded(_) => None,
        }
    }
}
