//! Process-wide sync config.
//!
//! Maps repository path to its synced branches:
//!
//! ```yaml
//! repos:
//!   /home/u/app:
//!     branches:
//!       main:
//!         src/a.txt: 1042
//!         src/b.txt: null
//! ```
//!
//! Concurrency policy: one in-process cache behind a read/write lock, loaded
//! when the store is opened, reloaded explicitly via [`SyncConfigStore::reload`]
//! (bootstrap does so before every run) and flushed atomically after every
//! mutation. One writer per process.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::config::Settings;

use super::error::{StorageError, StorageResult};
use super::write_atomic;

/// Relative path → server-side file id (unknown until uploaded).
pub type BranchFiles = BTreeMap<String, Option<u64>>;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RepoEntry {
    #[serde(default)]
    pub branches: BTreeMap<String, BranchFiles>,

    /// Keys written by other tools (owner email, repo id, ...), kept as-is.
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_yaml::Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SyncConfig {
    #[serde(default)]
    pub repos: BTreeMap<String, RepoEntry>,
}

impl SyncConfig {
    pub fn is_repo_synced(&self, repo_key: &str) -> bool {
        self.repos.contains_key(repo_key)
    }

    pub fn is_branch_synced(&self, repo_key: &str, branch: &str) -> bool {
        self.repos
            .get(repo_key)
            .is_some_and(|repo| repo.branches.contains_key(branch))
    }

    fn parse(text: &str) -> StorageResult<Self> {
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(text)?)
    }
}

/// Shared handle to the persisted [`SyncConfig`].
#[derive(Debug)]
pub struct SyncConfigStore {
    path: PathBuf,
    state: RwLock<SyncConfig>,
}

impl SyncConfigStore {
    /// Open and load the config. A missing file is an empty config.
    pub fn open(path: impl Into<PathBuf>) -> StorageResult<Self> {
        let path = path.into();
        let state = RwLock::new(Self::read(&path)?);
        Ok(Self { path, state })
    }

    pub fn from_settings(settings: &Settings) -> StorageResult<Self> {
        Self::open(settings.sync_config_path())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read(path: &Path) -> StorageResult<SyncConfig> {
        match fs::read_to_string(path) {
            Ok(text) => SyncConfig::parse(&text),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(SyncConfig::default()),
            Err(e) => Err(StorageError::io(path, e)),
        }
    }

    /// Replace the cache with what is on disk.
    pub fn reload(&self) -> StorageResult<()> {
        let fresh = Self::read(&self.path)?;
        *self.state.write() = fresh;
        Ok(())
    }

    /// Copy of the cached config.
    pub fn snapshot(&self) -> SyncConfig {
        self.state.read().clone()
    }

    pub fn is_repo_synced(&self, repo_key: &str) -> bool {
        self.state.read().is_repo_synced(repo_key)
    }

    pub fn is_branch_synced(&self, repo_key: &str, branch: &str) -> bool {
        self.state.read().is_branch_synced(repo_key, branch)
    }

    /// Record a branch as synced with the given files and flush.
    ///
    /// Existing file ids for the branch are kept.
    pub fn mark_branch_synced(
        &self,
        repo_key: &str,
        branch: &str,
        files: impl IntoIterator<Item = String>,
    ) -> StorageResult<()> {
        let mut state = self.state.write();
        let entry = state
            .repos
            .entry(repo_key.to_string())
            .or_default()
            .branches
            .entry(branch.to_string())
            .or_default();
        for file in files {
            entry.entry(file).or_insert(None);
        }
        self.flush(&state)
    }

    fn flush(&self, config: &SyncConfig) -> StorageResult<()> {
        let yaml = serde_yaml::to_string(config)?;
        write_atomic(&self.path, yaml.as_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_is_empty() {
        let temp = TempDir::new().unwrap();
        let store = SyncConfigStore::open(temp.path().join("config.yml")).unwrap();
        assert!(store.snapshot().repos.is_empty());
        assert!(!store.is_repo_synced("/w/app"));
    }

    #[test]
    fn test_empty_file_is_empty() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.yml");
        fs::write(&path, "").unwrap();
        assert!(SyncConfigStore::open(&path).unwrap().snapshot().repos.is_empty());
    }

    #[test]
    fn test_reads_existing_layout() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.yml");
        fs::write(
            &path,
            "repos:\n  /w/app:\n    id: 7\n    branches:\n      main:\n        src/a.txt: 11\n",
        )
        .unwrap();

        let store = SyncConfigStore::open(&path).unwrap();
        assert!(store.is_repo_synced("/w/app"));
        assert!(store.is_branch_synced("/w/app", "main"));
        assert!(!store.is_branch_synced("/w/app", "dev"));

        let snapshot = store.snapshot();
        let repo = &snapshot.repos["/w/app"];
        assert_eq!(repo.branches["main"]["src/a.txt"], Some(11));
        assert!(repo.extra.contains_key("id"));
    }

    #[test]
    fn test_mark_branch_synced_flushes_and_preserves() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.yml");
        fs::write(
            &path,
            "repos:\n  /w/app:\n    email: u@example.com\n    branches:\n      main:\n        a.txt: 3\n",
        )
        .unwrap();

        let store = SyncConfigStore::open(&path).unwrap();
        store
            .mark_branch_synced("/w/app", "main", ["a.txt".to_string(), "b.txt".to_string()])
            .unwrap();
        store
            .mark_branch_synced("/w/app", "dev", ["a.txt".to_string()])
            .unwrap();

        let reopened = SyncConfigStore::open(&path).unwrap().snapshot();
        let repo = &reopened.repos["/w/app"];
        assert_eq!(repo.branches["main"]["a.txt"], Some(3));
        assert_eq!(repo.branches["main"]["b.txt"], None);
        assert!(repo.branches.contains_key("dev"));
        assert_eq!(
            repo.extra.get("email").and_then(|v| v.as_str()),
            Some("u@example.com")
        );
    }

    #[test]
    fn test_reload_picks_up_external_changes() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.yml");
        let store = SyncConfigStore::open(&path).unwrap();
        assert!(!store.is_repo_synced("/w/app"));

        fs::write(&path, "repos:\n  /w/app:\n    branches: {}\n").unwrap();
        assert!(!store.is_repo_synced("/w/app"));

        store.reload().unwrap();
        assert!(store.is_repo_synced("/w/app"));
    }
}
