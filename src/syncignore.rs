//! The per-repository `.syncignore` list.
//!
//! Patterns use gitignore syntax and are matched against repository-relative
//! paths.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use ignore::gitignore::{Gitignore, GitignoreBuilder};

use crate::paths::{GITIGNORE, SYNCIGNORE};

/// Compiled ignore list for one repository.
#[derive(Debug, Clone)]
pub struct Syncignore {
    matcher: Gitignore,
    path: PathBuf,
}

impl Syncignore {
    /// Load `<repo_root>/.syncignore`. A missing or unreadable file yields an
    /// empty list; invalid lines are skipped with a warning.
    pub fn load(repo_root: &Path) -> Self {
        let path = repo_root.join(SYNCIGNORE);
        let mut builder = GitignoreBuilder::new(repo_root);

        if path.is_file() {
            if let Some(e) = builder.add(&path) {
                tracing::warn!("[syncignore] partially invalid {}: {e}", path.display());
            }
        }

        let matcher = builder.build().unwrap_or_else(|e| {
            tracing::warn!("[syncignore] ignoring {}: {e}", path.display());
            Gitignore::empty()
        });

        Self { matcher, path }
    }

    /// Build from in-memory lines (used by tests and callers that already
    /// hold the file contents).
    pub fn from_lines<'a>(repo_root: &Path, lines: impl IntoIterator<Item = &'a str>) -> Self {
        let mut builder = GitignoreBuilder::new(repo_root);
        for line in lines {
            if let Err(e) = builder.add_line(None, line) {
                tracing::warn!("[syncignore] invalid pattern '{line}': {e}");
            }
        }
        let matcher = builder.build().unwrap_or_else(|_| Gitignore::empty());
        Self {
            matcher,
            path: repo_root.join(SYNCIGNORE),
        }
    }

    /// True if the repository-relative path, or any of its parents, is ignored.
    pub fn is_ignored(&self, rel: &Path, is_dir: bool) -> bool {
        if rel.as_os_str().is_empty() || rel.has_root() {
            return false;
        }
        self.matcher
            .matched_path_or_any_parents(rel, is_dir)
            .is_ignore()
    }

    /// Number of patterns loaded.
    pub fn len(&self) -> usize {
        self.matcher.num_ignores() as usize + self.matcher.num_whitelists() as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Location of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// What [`ensure_syncignore`] found or did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncignoreSeed {
    /// A non-empty `.syncignore` was already present.
    Existing,
    /// No usable `.syncignore` and no `.gitignore`; an empty file was written.
    CreatedEmpty,
    /// `.syncignore` was absent or empty and was seeded from `.gitignore`.
    CopiedFromGitignore,
}

/// Make sure `<repo_root>/.syncignore` exists.
///
/// Copies `.gitignore` whenever `.syncignore` is absent or blank and a
/// `.gitignore` exists.
pub fn ensure_syncignore(repo_root: &Path) -> io::Result<SyncignoreSeed> {
    let syncignore = repo_root.join(SYNCIGNORE);
    let gitignore = repo_root.join(GITIGNORE);

    let existing = match fs::read_to_string(&syncignore) {
        Ok(data) => Some(data),
        Err(e) if e.kind() == io::ErrorKind::NotFound => None,
        Err(e) => return Err(e),
    };

    let blank = existing.as_deref().is_none_or(|data| data.trim().is_empty());
    if !blank {
        return Ok(SyncignoreSeed::Existing);
    }

    if gitignore.is_file() {
        fs::copy(&gitignore, &syncignore)?;
        return Ok(SyncignoreSeed::CopiedFromGitignore);
    }

    if existing.is_none() {
        fs::write(&syncignore, "")?;
    }
    Ok(SyncignoreSeed::CreatedEmpty)
}
