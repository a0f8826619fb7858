//! On-disk state shared by the router and bootstrap.
//!
//! - [`MirrorStore`]: shadow and originals copies of tracked files
//! - [`DiffBuffer`]: one YAML file per pending [`DiffRecord`]
//! - [`SyncConfigStore`]: which repositories and branches are synced

pub mod buffer;
pub mod error;
pub mod mirror;
pub mod sync_config;

pub use buffer::{DiffBuffer, DiffKind, DiffRecord, RecordId, RenamePayload};
pub use error::{StorageError, StorageResult};
pub use mirror::{MirrorKind, MirrorStore, SeedReport};
pub use sync_config::{BranchFiles, RepoEntry, SyncConfig, SyncConfigStore};

use std::io::Write;
use std::path::Path;

/// Write `contents` to `target` through a temporary sibling file and an
/// atomic rename, creating parent directories as needed.
pub(crate) fn write_atomic(target: &Path, contents: &[u8]) -> StorageResult<()> {
    let parent = target.parent().ok_or_else(|| StorageError::InvalidPath {
        path: target.to_path_buf(),
    })?;
    std::fs::create_dir_all(parent).map_err(|e| StorageError::io(parent, e))?;

    let mut tmp = tempfile::NamedTempFile::new_in(parent).map_err(|e| StorageError::io(parent, e))?;
    tmp.write_all(contents)
        .map_err(|e| StorageError::io(tmp.path(), e))?;
    tmp.persist(target)?;
    Ok(())
}
