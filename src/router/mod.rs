//! Change event router.
//!
//! Turns raw host events into diff records. Every event first passes the
//! system path classifier and the repository's `.syncignore`; events that
//! should not be tracked are dropped with a [`SkipReason`] instead of an
//! error. Only storage failures propagate.

pub mod error;
pub mod event;

pub use error::{RouterError, RouterResult};
pub use event::{BufferSnapshot, ChangeEvent, DiskFile, EditorHandle, RouteOutcome, SkipReason};

use std::io;
use std::path::Path;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::config::Settings;
use crate::paths::{
    BranchResolver, GitHeadResolver, Repository, SYNCIGNORE, TrackedPath, is_ignored_system_path,
    resolve_branch,
};
use crate::patch::compute_patch;
use crate::storage::{
    DiffBuffer, DiffKind, DiffRecord, MirrorKind, MirrorStore, RenamePayload, StorageError,
};
use crate::syncignore::Syncignore;

/// Routes change events for one open repository.
///
/// Methods take `&self`; the router can be shared across event callbacks.
pub struct ChangeEventRouter {
    repo: Option<Repository>,
    mirrors: MirrorStore,
    buffer: DiffBuffer,
    branches: Arc<dyn BranchResolver>,
    default_branch: String,
    source: String,
    syncignore: RwLock<Option<Syncignore>>,
    require_bootstrap: bool,
}

impl ChangeEventRouter {
    /// Create a router. With `repo == None` every event is skipped.
    pub fn new(repo: Option<Repository>, mirrors: MirrorStore, buffer: DiffBuffer) -> Self {
        let syncignore = repo.as_ref().map(|r| Syncignore::load(r.root()));
        Self {
            repo,
            mirrors,
            buffer,
            branches: Arc::new(GitHeadResolver),
            default_branch: "default".to_string(),
            source: "cli".to_string(),
            syncignore: RwLock::new(syncignore),
            require_bootstrap: false,
        }
    }

    /// Router wired to the mirror root and diff buffer from settings.
    pub fn from_settings(repo_root: Option<&Path>, settings: &Settings) -> Self {
        Self::new(
            repo_root.map(Repository::new),
            MirrorStore::from_settings(settings),
            DiffBuffer::from_settings(settings),
        )
        .with_default_branch(&settings.default_branch)
        .with_source(&settings.source)
    }

    pub fn with_branch_resolver(mut self, resolver: Arc<dyn BranchResolver>) -> Self {
        self.branches = resolver;
        self
    }

    pub fn with_default_branch(mut self, branch: impl Into<String>) -> Self {
        self.default_branch = branch.into();
        self
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = source.into();
        self
    }

    /// Skip creations on branches whose shadow tree was never seeded, so a
    /// stray creation cannot make a later bootstrap skip the branch.
    pub fn with_require_bootstrap(mut self, required: bool) -> Self {
        self.require_bootstrap = required;
        self
    }

    pub fn repository(&self) -> Option<&Repository> {
        self.repo.as_ref()
    }

    pub fn buffer(&self) -> &DiffBuffer {
        &self.buffer
    }

    pub fn mirrors(&self) -> &MirrorStore {
        &self.mirrors
    }

    /// Re-read `.syncignore` from the repository root.
    pub fn reload_syncignore(&self) {
        if let Some(repo) = &self.repo {
            let list = Syncignore::load(repo.root());
            crate::debug_event!("router", "syncignore reloaded", "{} patterns", list.len());
            *self.syncignore.write() = Some(list);
        }
    }

    /// Dispatch one event to the matching handler.
    pub fn handle(&self, event: &ChangeEvent) -> RouterResult<RouteOutcome> {
        match event {
            ChangeEvent::Created { path } => self.handle_file_created(path),
            ChangeEvent::Deleted { path } => self.handle_file_deleted(path),
            ChangeEvent::Renamed { from, to } => self.handle_file_renamed(from, to),
            ChangeEvent::Changed { path } => self.handle_changes(&DiskFile::new(path)),
        }
    }

    /// A file appeared: snapshot it into both mirrors and record it as new.
    pub fn handle_file_created(&self, path: &Path) -> RouterResult<RouteOutcome> {
        let (repo, rel) = match self.classify(path) {
            Ok(found) => found,
            Err(reason) => return Ok(self.skip(reason, path)),
        };
        if path.is_dir() {
            return Ok(self.skip(SkipReason::Directory, path));
        }
        let branch = self.branch(repo);
        if self.require_bootstrap
            && !self.mirrors.branch_dir(MirrorKind::Shadow, repo, &branch).is_dir()
        {
            return Ok(self.skip(SkipReason::NotBootstrapped, path));
        }

        let source_path = repo.absolute(&rel);
        for kind in [MirrorKind::Originals, MirrorKind::Shadow] {
            match self.mirrors.copy_from_working_tree(kind, repo, &branch, &rel) {
                Ok(()) => {}
                // Only the working-tree read may vanish; a missing mirror
                // directory is a storage failure
                Err(StorageError::Io {
                    path: ref failed,
                    ref source,
                }) if source.kind() == io::ErrorKind::NotFound && *failed == source_path => {
                    return Ok(self.skip(SkipReason::Vanished, path));
                }
                Err(e) => return Err(e.into()),
            }
        }

        self.record(repo, &branch, rel.to_slash(), DiffKind::NewFile)
    }

    /// A file was removed. Mirrors are left alone.
    pub fn handle_file_deleted(&self, path: &Path) -> RouterResult<RouteOutcome> {
        let (repo, rel) = match self.classify(path) {
            Ok(found) => found,
            Err(reason) => return Ok(self.skip(reason, path)),
        };
        let branch = self.branch(repo);
        self.record(repo, &branch, rel.to_slash(), DiffKind::Deleted)
    }

    /// A file moved. The record is keyed by the new path; no mirror is
    /// touched until the next content change.
    pub fn handle_file_renamed(&self, from: &Path, to: &Path) -> RouterResult<RouteOutcome> {
        let Some(repo) = &self.repo else {
            return Ok(self.skip(SkipReason::NoRepository, to));
        };
        let (Some(old_rel), Some(new_rel)) = (repo.strip_root(from), repo.strip_root(to)) else {
            return Ok(self.skip(SkipReason::OutsideRepository, to));
        };
        if is_ignored_system_path(old_rel) || is_ignored_system_path(new_rel) {
            return Ok(self.skip(SkipReason::SystemPath, to));
        }
        let (Some(old_rel), Some(new_rel)) = (TrackedPath::new(old_rel), TrackedPath::new(new_rel))
        else {
            return Ok(self.skip(SkipReason::OutsideRepository, to));
        };

        // Moving a tracked file into an ignored location still has to be
        // reported, so only skip when both sides are ignored.
        if self.is_syncignored(&old_rel, false) && self.is_syncignored(&new_rel, to.is_dir()) {
            return Ok(self.skip(SkipReason::Syncignored, to));
        }

        let branch = self.branch(repo);
        let payload = RenamePayload {
            old_abs_path: from.to_string_lossy().into_owned(),
            new_abs_path: to.to_string_lossy().into_owned(),
            old_rel_path: old_rel.to_slash(),
            new_rel_path: new_rel.to_slash(),
        };
        self.record(repo, &branch, new_rel.to_slash(), DiffKind::Rename(payload))
    }

    /// Content of an open document may have changed: diff it against its
    /// shadow and record a patch.
    pub fn handle_changes(&self, handle: &dyn EditorHandle) -> RouterResult<RouteOutcome> {
        let Some(path) = handle.path() else {
            crate::debug_event!("router", "skipped", "{}", SkipReason::Untitled);
            return Ok(RouteOutcome::Skipped(SkipReason::Untitled));
        };
        let (repo, rel) = match self.classify(path) {
            Ok(found) => found,
            Err(reason) => return Ok(self.skip(reason, path)),
        };

        let text = match handle.text() {
            Ok(text) => text,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Ok(self.skip(SkipReason::Vanished, path));
            }
            Err(e) if e.kind() == io::ErrorKind::InvalidData => {
                return Ok(self.skip(SkipReason::NotText, path));
            }
            Err(e) if path.is_dir() => {
                crate::debug_event!("router", "directory read", "{e}");
                return Ok(self.skip(SkipReason::Directory, path));
            }
            Err(source) => {
                return Err(RouterError::ReadContent {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };

        let branch = self.branch(repo);
        let Some(shadow) = self.mirrors.read_shadow(repo, &branch, &rel) else {
            return Ok(self.skip(SkipReason::NotYetTracked, path));
        };
        if shadow == text {
            return Ok(self.skip(SkipReason::Unchanged, path));
        }

        let patch = compute_patch(&shadow, &text);
        if patch.is_empty() {
            self.mirrors.write_shadow(repo, &branch, &rel, &text)?;
            return Ok(self.skip(SkipReason::EmptyPatch, path));
        }

        // Append before moving the baseline; a failed append must leave the
        // shadow untouched.
        let outcome = self.record(repo, &branch, rel.to_slash(), DiffKind::Modified(patch))?;
        self.mirrors.write_shadow(repo, &branch, &rel, &text)?;
        Ok(outcome)
    }

    /// Resolve the repository and tracked path for an absolute path, or the
    /// reason to skip it. A change to `.syncignore` reloads the list first.
    fn classify(&self, path: &Path) -> Result<(&Repository, TrackedPath), SkipReason> {
        let repo = self.repo.as_ref().ok_or(SkipReason::NoRepository)?;
        let rel = repo.strip_root(path).ok_or(SkipReason::OutsideRepository)?;
        if is_ignored_system_path(rel) {
            return Err(SkipReason::SystemPath);
        }
        let rel = TrackedPath::new(rel).ok_or(SkipReason::OutsideRepository)?;

        if rel.as_path() == Path::new(SYNCIGNORE) {
            self.reload_syncignore();
        }
        if self.is_syncignored(&rel, path.is_dir()) {
            return Err(SkipReason::Syncignored);
        }
        Ok((repo, rel))
    }

    fn is_syncignored(&self, rel: &TrackedPath, is_dir: bool) -> bool {
        self.syncignore
            .read()
            .as_ref()
            .is_some_and(|list| list.is_ignored(rel.as_path(), is_dir))
    }

    fn branch(&self, repo: &Repository) -> String {
        resolve_branch(self.branches.as_ref(), repo.root(), &self.default_branch)
    }

    fn record(
        &self,
        repo: &Repository,
        branch: &str,
        rel: String,
        kind: DiffKind,
    ) -> RouterResult<RouteOutcome> {
        let label = kind.label();
        let record = DiffRecord::new(repo.name(), branch, rel, &self.source, kind);
        let id = self.buffer.append(&record)?;
        crate::log_event!(
            "router",
            "recorded",
            "{label} {}/{}@{branch} as {id}",
            repo.name(),
            record.file_relative_path
        );
        Ok(RouteOutcome::Recorded(id))
    }

    fn skip(&self, reason: SkipReason, path: &Path) -> RouteOutcome {
        crate::debug_event!("router", "skipped", "{reason}: {}", path.display());
        RouteOutcome::Skipped(reason)
    }
}
