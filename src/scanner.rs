//! Working tree scanner producing the syncable path set.

use std::path::{Path, PathBuf};

use ignore::WalkBuilder;
use thiserror::Error;

use crate::bootstrap::{Plan, SyncablePathProvider};
use crate::config::Settings;
use crate::paths::{Repository, TrackedPath, is_ignored_system_path};
use crate::syncignore::Syncignore;

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("Repository root is not a directory: {path}")]
    MissingRoot { path: PathBuf },
}

/// Walks a repository and keeps every regular file that is neither a system
/// path, matched by `.syncignore`, nor over the size ceiling.
#[derive(Debug, Clone)]
pub struct WorkingTreeScanner {
    max_file_size: u64,
}

impl WorkingTreeScanner {
    pub fn new(max_file_size: u64) -> Self {
        Self { max_file_size }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(settings.bootstrap.max_file_size)
    }

    /// Effective ceiling: the smaller of the local limit and the plan's.
    pub fn size_limit(&self, plan: &Plan) -> u64 {
        plan.file_size
            .map_or(self.max_file_size, |limit| limit.min(self.max_file_size))
    }

    pub fn scan(
        &self,
        repo: &Repository,
        syncignore: &Syncignore,
        plan: &Plan,
    ) -> Result<Vec<TrackedPath>, ScanError> {
        let root = repo.root().to_path_buf();
        if !root.is_dir() {
            return Err(ScanError::MissingRoot { path: root });
        }
        let limit = self.size_limit(plan);

        let mut builder = WalkBuilder::new(&root);
        builder
            .standard_filters(false) // .syncignore is the only ignore list
            .follow_links(false);

        // Prune reserved and ignored directories instead of walking into them
        let list = syncignore.clone();
        let prune_root = root.clone();
        builder.filter_entry(move |entry| {
            let Ok(rel) = entry.path().strip_prefix(&prune_root) else {
                return true;
            };
            if rel.as_os_str().is_empty() {
                return true;
            }
            let is_dir = entry.file_type().is_some_and(|ft| ft.is_dir());
            !is_ignored_system_path(rel) && !list.is_ignored(rel, is_dir)
        });

        let mut paths: Vec<TrackedPath> = builder
            .build()
            .filter_map(Result::ok) // Skip entries we can't access
            .filter(|entry| entry.file_type().is_some_and(|ft| ft.is_file()))
            .filter_map(|entry| {
                let size = entry.metadata().map(|m| m.len()).unwrap_or(0);
                if size > limit {
                    crate::debug_event!(
                        "scanner",
                        "over size limit",
                        "{} ({size} > {limit} bytes)",
                        entry.path().display()
                    );
                    return None;
                }
                tracked(&root, entry.path())
            })
            .collect();

        paths.sort();
        crate::debug_event!("scanner", "scanned", "{} syncable files", paths.len());
        Ok(paths)
    }
}

fn tracked(root: &Path, abs: &Path) -> Option<TrackedPath> {
    TrackedPath::new(abs.strip_prefix(root).ok()?)
}

impl SyncablePathProvider for WorkingTreeScanner {
    fn syncable_paths(
        &self,
        repo: &Repository,
        syncignore: &Syncignore,
        plan: &Plan,
    ) -> Result<Vec<TrackedPath>, ScanError> {
        self.scan(repo, syncignore, plan)
    }
}
