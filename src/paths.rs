//! Repository identity, tracked paths and the system path classifier.

use std::fmt;
use std::path::{Component, Path, PathBuf};

/// Directories owned by tooling that must never be mirrored or diffed.
pub const RESERVED_DIRS: &[&str] = &[".git"];

/// Version-control ignore file seeded into the sync ignore list.
pub const GITIGNORE: &str = ".gitignore";

/// Per-repository ignore list.
pub const SYNCIGNORE: &str = ".syncignore";

/// True iff the path lies inside a reserved tooling directory.
///
/// Works on both absolute and repository-relative paths.
pub fn is_ignored_system_path(path: &Path) -> bool {
    path.components().any(|c| match c {
        Component::Normal(name) => RESERVED_DIRS.iter().any(|r| name == *r),
        _ => false,
    })
}

/// A path relative to a repository root.
///
/// Never empty and never inside a reserved directory.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TrackedPath(PathBuf);

impl TrackedPath {
    /// Validate a relative path.
    pub fn new(rel: impl Into<PathBuf>) -> Option<Self> {
        let rel = rel.into();
        if rel.as_os_str().is_empty() || rel.is_absolute() || is_ignored_system_path(&rel) {
            return None;
        }
        Some(Self(rel))
    }

    pub fn as_path(&self) -> &Path {
        &self.0
    }

    /// Forward-slash form used in records and config keys.
    pub fn to_slash(&self) -> String {
        self.0
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/")
    }
}

impl AsRef<Path> for TrackedPath {
    fn as_ref(&self) -> &Path {
        &self.0
    }
}

impl fmt::Display for TrackedPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_slash())
    }
}

/// A synced working directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Repository {
    root: PathBuf,
    name: String,
}

impl Repository {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let name = root
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self { root, name }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Last path segment of the root.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Strip the repository root from an absolute path.
    ///
    /// Returns `None` for paths outside the repository, the root itself,
    /// and system paths.
    pub fn relative(&self, abs: &Path) -> Option<TrackedPath> {
        let rel = abs.strip_prefix(&self.root).ok()?;
        TrackedPath::new(rel)
    }

    /// Like [`Repository::relative`] but keeps system paths, so callers can
    /// tell "outside" apart from "reserved".
    pub fn strip_root<'a>(&self, abs: &'a Path) -> Option<&'a Path> {
        abs.strip_prefix(&self.root)
            .ok()
            .filter(|rel| !rel.as_os_str().is_empty())
    }

    pub fn absolute(&self, rel: &TrackedPath) -> PathBuf {
        self.root.join(rel.as_path())
    }

    /// Key used to place this repository under a mirror root.
    ///
    /// The absolute root with its prefix and root components removed, so
    /// `/home/u/app` maps to `home/u/app`.
    pub fn mirror_key(&self) -> PathBuf {
        self.root
            .components()
            .filter_map(|c| match c {
                Component::Normal(part) => Some(part),
                _ => None,
            })
            .collect()
    }

    /// Path string used as the key in the sync config.
    pub fn config_key(&self) -> String {
        self.root.to_string_lossy().into_owned()
    }
}

/// Looks up the current branch of a working directory.
pub trait BranchResolver: Send + Sync {
    fn branch_name(&self, repo_root: &Path) -> Option<String>;
}

/// Resolves the branch by reading `.git/HEAD`.
#[derive(Debug, Default, Clone, Copy)]
pub struct GitHeadResolver;

impl BranchResolver for GitHeadResolver {
    fn branch_name(&self, repo_root: &Path) -> Option<String> {
        let head = std::fs::read_to_string(repo_root.join(".git").join("HEAD")).ok()?;
        let name = head.trim().strip_prefix("ref: refs/heads/")?;
        if name.is_empty() {
            None
        } else {
            Some(name.to_string())
        }
    }
}

/// Resolve a branch, falling back to `default` when the lookup fails.
pub fn resolve_branch(resolver: &dyn BranchResolver, repo_root: &Path, default: &str) -> String {
    resolver
        .branch_name(repo_root)
        .unwrap_or_else(|| default.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_system_path_detection() {
        assert!(is_ignored_system_path(Path::new(".git/HEAD")));
        assert!(is_ignored_system_path(Path::new("/work/app/.git/objects/ab")));
        assert!(is_ignored_system_path(Path::new("vendor/lib/.git/config")));
        assert!(!is_ignored_system_path(Path::new("src/main.rs")));
        assert!(!is_ignored_system_path(Path::new(".gitignore")));
        assert!(!is_ignored_system_path(Path::new("docs/.github/ci.yml")));
    }

    #[test]
    fn test_tracked_path_invariants() {
        assert!(TrackedPath::new("").is_none());
        assert!(TrackedPath::new("/abs/file").is_none());
        assert!(TrackedPath::new(".git/index").is_none());

        let p = TrackedPath::new("src/a.txt").unwrap();
        assert_eq!(p.to_slash(), "src/a.txt");
        assert_eq!(p.to_string(), "src/a.txt");
    }

    #[test]
    fn test_repository_relative() {
        let repo = Repository::new("/home/u/app");
        assert_eq!(repo.name(), "app");

        let rel = repo.relative(Path::new("/home/u/app/src/a.txt")).unwrap();
        assert_eq!(rel.as_path(), Path::new("src/a.txt"));

        assert!(repo.relative(Path::new("/home/u/other/a.txt")).is_none());
        assert!(repo.relative(Path::new("/home/u/app")).is_none());
        assert!(repo.relative(Path::new("/home/u/app/.git/HEAD")).is_none());
        assert!(repo.strip_root(Path::new("/home/u/app/.git/HEAD")).is_some());
    }

    #[test]
    fn test_mirror_key_drops_root() {
        let repo = Repository::new("/home/u/app");
        assert_eq!(repo.mirror_key(), PathBuf::from("home/u/app"));
        assert_eq!(repo.config_key(), "/home/u/app");
    }

    #[test]
    fn test_git_head_resolver() {
        let temp = TempDir::new().unwrap();
        let git = temp.path().join(".git");
        fs::create_dir_all(&git).unwrap();

        fs::write(git.join("HEAD"), "ref: refs/heads/feature/x\n").unwrap();
        assert_eq!(
            GitHeadResolver.branch_name(temp.path()),
            Some("feature/x".to_string())
        );

        // Detached HEAD falls back to the default
        fs::write(git.join("HEAD"), "3f2a9c1d\n").unwrap();
        assert_eq!(resolve_branch(&GitHeadResolver, temp.path(), "default"), "default");
    }

    #[test]
    fn test_resolver_without_git_dir() {
        let temp = TempDir::new().unwrap();
        assert_eq!(GitHeadResolver.branch_name(temp.path()), None);
    }
}
