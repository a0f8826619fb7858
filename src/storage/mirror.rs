//! Shadow and originals mirrors.
//!
//! Layout: `<root>/<repo mirror key>/<branch>/<relative path>`, one root per
//! [`MirrorKind`]. Each branch owns its own tree; nothing is shared across
//! branches.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::config::Settings;
use crate::paths::{Repository, TrackedPath};

use super::error::{StorageError, StorageResult};
use super::write_atomic;

/// Which mirror tree to address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MirrorKind {
    /// Last-synced content, the diff baseline.
    Shadow,
    /// One-time snapshot taken when a file first enters sync.
    Originals,
}

impl MirrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MirrorKind::Shadow => "shadow",
            MirrorKind::Originals => "originals",
        }
    }
}

/// Counts from a seeding pass.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SeedReport {
    /// Files copied from the working tree.
    pub copied: usize,
    /// Files skipped because a mirror entry already existed.
    pub kept: usize,
    /// Files that vanished from the working tree before they could be copied.
    pub missing: usize,
    /// The whole branch tree existed, so nothing was attempted.
    pub branch_existed: bool,
}

/// Mirror copies of tracked files, keyed by (repository, branch, path).
#[derive(Debug, Clone)]
pub struct MirrorStore {
    shadow_root: PathBuf,
    originals_root: PathBuf,
}

impl MirrorStore {
    pub fn new(shadow_root: impl Into<PathBuf>, originals_root: impl Into<PathBuf>) -> Self {
        Self {
            shadow_root: shadow_root.into(),
            originals_root: originals_root.into(),
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(settings.shadow_dir(), settings.originals_dir())
    }

    pub fn root(&self, kind: MirrorKind) -> &Path {
        match kind {
            MirrorKind::Shadow => &self.shadow_root,
            MirrorKind::Originals => &self.originals_root,
        }
    }

    /// Directory holding one branch's mirror tree.
    pub fn branch_dir(&self, kind: MirrorKind, repo: &Repository, branch: &str) -> PathBuf {
        self.root(kind).join(repo.mirror_key()).join(branch)
    }

    /// Mirror location of one tracked file.
    pub fn entry_path(
        &self,
        kind: MirrorKind,
        repo: &Repository,
        branch: &str,
        rel: &TrackedPath,
    ) -> PathBuf {
        self.branch_dir(kind, repo, branch).join(rel.as_path())
    }

    /// Read the shadow of a file.
    ///
    /// Absence is a normal result. Unreadable or non-UTF-8 shadows are also
    /// reported as absent.
    pub fn read_shadow(&self, repo: &Repository, branch: &str, rel: &TrackedPath) -> Option<String> {
        let path = self.entry_path(MirrorKind::Shadow, repo, branch, rel);
        match fs::read_to_string(&path) {
            Ok(content) => Some(content),
            Err(e) if e.kind() == io::ErrorKind::NotFound => None,
            Err(e) => {
                tracing::warn!("[shadow] unreadable {}: {e}", path.display());
                None
            }
        }
    }

    /// Replace the shadow of a file.
    pub fn write_shadow(
        &self,
        repo: &Repository,
        branch: &str,
        rel: &TrackedPath,
        content: &str,
    ) -> StorageResult<()> {
        let path = self.entry_path(MirrorKind::Shadow, repo, branch, rel);
        write_atomic(&path, content.as_bytes())
    }

    /// Copy the current working-tree bytes of one file into a mirror,
    /// overwriting any previous entry.
    pub fn copy_from_working_tree(
        &self,
        kind: MirrorKind,
        repo: &Repository,
        branch: &str,
        rel: &TrackedPath,
    ) -> StorageResult<()> {
        let source = repo.absolute(rel);
        let bytes = fs::read(&source).map_err(|e| StorageError::io(&source, e))?;
        write_atomic(&self.entry_path(kind, repo, branch, rel), &bytes)
    }

    /// Copy each path from the working tree into a mirror, skipping paths
    /// that already have an entry for this branch.
    pub fn seed_from_working_tree(
        &self,
        kind: MirrorKind,
        repo: &Repository,
        branch: &str,
        paths: &[TrackedPath],
    ) -> StorageResult<SeedReport> {
        let mut report = SeedReport::default();

        for rel in paths {
            let target = self.entry_path(kind, repo, branch, rel);
            if target.exists() {
                report.kept += 1;
                continue;
            }

            let source = repo.absolute(rel);
            let bytes = match fs::read(&source) {
                Ok(bytes) => bytes,
                Err(e) if e.kind() == io::ErrorKind::NotFound => {
                    crate::debug_event!(kind.as_str(), "vanished before seeding", "{rel}");
                    report.missing += 1;
                    continue;
                }
                Err(e) => return Err(StorageError::io(&source, e)),
            };

            write_atomic(&target, &bytes)?;
            report.copied += 1;
        }

        Ok(report)
    }

    /// Seed a branch's mirror tree unless it already exists.
    ///
    /// Safe to call repeatedly: an existing tree is left untouched.
    pub fn seed_branch(
        &self,
        kind: MirrorKind,
        repo: &Repository,
        branch: &str,
        paths: &[TrackedPath],
    ) -> StorageResult<SeedReport> {
        let dir = self.branch_dir(kind, repo, branch);
        if dir.exists() {
            crate::debug_event!(kind.as_str(), "branch already seeded", "{}", dir.display());
            return Ok(SeedReport {
                branch_existed: true,
                ..SeedReport::default()
            });
        }

        fs::create_dir_all(&dir).map_err(|e| StorageError::io(&dir, e))?;
        let report = self.seed_from_working_tree(kind, repo, branch, paths)?;
        crate::log_event!(
            kind.as_str(),
            "seeded",
            "{} files into {}",
            report.copied,
            dir.display()
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    struct Fixture {
        _temp: TempDir,
        repo: Repository,
        store: MirrorStore,
    }

    fn fixture() -> Fixture {
        let temp = TempDir::new().unwrap();
        let repo_root = temp.path().join("work").join("app");
        fs::create_dir_all(repo_root.join("src")).unwrap();
        let store = MirrorStore::new(temp.path().join("shadow"), temp.path().join("originals"));
        Fixture {
            repo: Repository::new(repo_root),
            store,
            _temp: temp,
        }
    }

    fn rel(p: &str) -> TrackedPath {
        TrackedPath::new(p).unwrap()
    }

    #[test]
    fn test_read_missing_shadow_is_none() {
        let f = fixture();
        assert_eq!(f.store.read_shadow(&f.repo, "main", &rel("src/a.txt")), None);
    }

    #[test]
    fn test_write_then_read_shadow() {
        let f = fixture();
        let path = rel("src/deep/nested/a.txt");

        f.store.write_shadow(&f.repo, "main", &path, "hello").unwrap();
        assert_eq!(
            f.store.read_shadow(&f.repo, "main", &path).as_deref(),
            Some("hello")
        );

        f.store.write_shadow(&f.repo, "main", &path, "hello world").unwrap();
        assert_eq!(
            f.store.read_shadow(&f.repo, "main", &path).as_deref(),
            Some("hello world")
        );

        // Branches do not share shadows
        assert_eq!(f.store.read_shadow(&f.repo, "dev", &path), None);
    }

    #[test]
    fn test_entry_path_layout() {
        let f = fixture();
        let path = f
            .store
            .entry_path(MirrorKind::Originals, &f.repo, "main", &rel("src/a.txt"));
        assert!(path.starts_with(f.store.root(MirrorKind::Originals)));
        assert!(path.ends_with("work/app/main/src/a.txt"));
    }

    #[test]
    fn test_seed_skips_existing_entries() {
        let f = fixture();
        fs::write(f.repo.root().join("src/a.txt"), "disk").unwrap();
        fs::write(f.repo.root().join("src/b.txt"), "b").unwrap();

        // A shadow that already reflects an in-flight edit
        f.store
            .write_shadow(&f.repo, "main", &rel("src/a.txt"), "edited")
            .unwrap();

        let report = f
            .store
            .seed_from_working_tree(
                MirrorKind::Shadow,
                &f.repo,
                "main",
                &[rel("src/a.txt"), rel("src/b.txt"), rel("src/gone.txt")],
            )
            .unwrap();

        assert_eq!(report.copied, 1);
        assert_eq!(report.kept, 1);
        assert_eq!(report.missing, 1);
        assert_eq!(
            f.store.read_shadow(&f.repo, "main", &rel("src/a.txt")).as_deref(),
            Some("edited")
        );
        assert_eq!(
            f.store.read_shadow(&f.repo, "main", &rel("src/b.txt")).as_deref(),
            Some("b")
        );
    }

    #[test]
    fn test_seed_branch_is_idempotent() {
        let f = fixture();
        fs::write(f.repo.root().join("src/a.txt"), "one").unwrap();
        let paths = [rel("src/a.txt")];

        let first = f
            .store
            .seed_branch(MirrorKind::Originals, &f.repo, "main", &paths)
            .unwrap();
        assert_eq!(first.copied, 1);

        fs::write(f.repo.root().join("src/a.txt"), "two").unwrap();
        let second = f
            .store
            .seed_branch(MirrorKind::Originals, &f.repo, "main", &paths)
            .unwrap();
        assert!(second.branch_existed);

        let original = f
            .store
            .entry_path(MirrorKind::Originals, &f.repo, "main", &paths[0]);
        assert_eq!(fs::read_to_string(original).unwrap(), "one");
    }

    #[test]
    fn test_copy_from_working_tree_overwrites() {
        let f = fixture();
        let path = rel("src/a.txt");
        fs::write(f.repo.root().join("src/a.txt"), "v1").unwrap();
        f.store
            .copy_from_working_tree(MirrorKind::Shadow, &f.repo, "main", &path)
            .unwrap();

        fs::write(f.repo.root().join("src/a.txt"), "v2").unwrap();
        f.store
            .copy_from_working_tree(MirrorKind::Shadow, &f.repo, "main", &path)
            .unwrap();

        assert_eq!(
            f.store.read_shadow(&f.repo, "main", &path).as_deref(),
            Some("v2")
        );
    }

    #[test]
    fn test_copy_missing_source_errors() {
        let f = fixture();
        let err = f
            .store
            .copy_from_working_tree(MirrorKind::Shadow, &f.repo, "main", &rel("nope.txt"))
            .unwrap_err();
        assert!(matches!(err, StorageError::Io { .. }));
    }
}
