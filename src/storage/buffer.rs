//! Append-only diff buffer.
//!
//! Each [`DiffRecord`] is one YAML file named `<millis>-<seq>-<uuid>.yml`.
//! The millisecond prefix orders records in time, the process-wide sequence
//! orders records created within the same millisecond, and the UUID fragment
//! keeps names unique across processes. Consuming and deleting records is
//! the uploader's job.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::config::Settings;

use super::error::{StorageError, StorageResult};

/// Extension of buffered records.
pub const RECORD_EXT: &str = "yml";

/// `created_at` format, always UTC.
pub const CREATED_AT_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3f";

static SEQUENCE: AtomicU64 = AtomicU64::new(0);

/// Payload of a rename record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenamePayload {
    pub old_abs_path: String,
    pub new_abs_path: String,
    pub old_rel_path: String,
    pub new_rel_path: String,
}

/// The single change a record describes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiffKind {
    NewFile,
    Deleted,
    Rename(RenamePayload),
    /// Patch text against the previous shadow.
    Modified(String),
}

impl DiffKind {
    pub fn label(&self) -> &'static str {
        match self {
            DiffKind::NewFile => "new file",
            DiffKind::Deleted => "deleted",
            DiffKind::Rename(_) => "rename",
            DiffKind::Modified(_) => "modified",
        }
    }
}

/// One immutable change unit queued for transmission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "RecordWire", try_from = "RecordWire")]
pub struct DiffRecord {
    pub repo: String,
    pub branch: String,
    pub file_relative_path: String,
    pub source: String,
    pub created_at: String,
    pub kind: DiffKind,
}

impl DiffRecord {
    /// Build a record stamped with the current UTC time.
    pub fn new(
        repo: impl Into<String>,
        branch: impl Into<String>,
        file_relative_path: impl Into<String>,
        source: impl Into<String>,
        kind: DiffKind,
    ) -> Self {
        Self {
            repo: repo.into(),
            branch: branch.into(),
            file_relative_path: file_relative_path.into(),
            source: source.into(),
            created_at: Utc::now().format(CREATED_AT_FORMAT).to_string(),
            kind,
        }
    }

    /// Patch text for modification records.
    pub fn patch(&self) -> Option<&str> {
        match &self.kind {
            DiffKind::Modified(diff) => Some(diff),
            _ => None,
        }
    }
}

/// Flat on-disk shape: one boolean flag or a `diff` field per change kind.
#[derive(Debug, Serialize, Deserialize)]
struct RecordWire {
    repo: String,
    branch: String,
    file_relative_path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    is_new_file: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    is_deleted: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    is_rename: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    diff: Option<String>,
    source: String,
    created_at: String,
}

impl From<DiffRecord> for RecordWire {
    fn from(record: DiffRecord) -> Self {
        let mut wire = RecordWire {
            repo: record.repo,
            branch: record.branch,
            file_relative_path: record.file_relative_path,
            is_new_file: None,
            is_deleted: None,
            is_rename: None,
            diff: None,
            source: record.source,
            created_at: record.created_at,
        };
        match record.kind {
            DiffKind::NewFile => wire.is_new_file = Some(true),
            DiffKind::Deleted => wire.is_deleted = Some(true),
            DiffKind::Rename(payload) => {
                wire.is_rename = Some(true);
                // Serializing a struct of strings cannot fail
                wire.diff = serde_json::to_string(&payload).ok();
            }
            DiffKind::Modified(diff) => wire.diff = Some(diff),
        }
        wire
    }
}

impl TryFrom<RecordWire> for DiffRecord {
    type Error = StorageError;

    fn try_from(wire: RecordWire) -> Result<Self, Self::Error> {
        let new_file = wire.is_new_file.unwrap_or(false);
        let deleted = wire.is_deleted.unwrap_or(false);
        let rename = wire.is_rename.unwrap_or(false);

        let kind = match (new_file, deleted, rename, wire.diff) {
            (true, false, false, None) => DiffKind::NewFile,
            (false, true, false, None) => DiffKind::Deleted,
            (false, false, true, Some(diff)) => DiffKind::Rename(serde_json::from_str(&diff)?),
            (false, false, false, Some(diff)) => DiffKind::Modified(diff),
            _ => {
                return Err(StorageError::InvalidRecord {
                    reason: format!(
                        "{} must carry exactly one change kind",
                        wire.file_relative_path
                    ),
                });
            }
        };

        Ok(DiffRecord {
            repo: wire.repo,
            branch: wire.branch,
            file_relative_path: wire.file_relative_path,
            source: wire.source,
            created_at: wire.created_at,
            kind,
        })
    }
}

/// Unique, time-ordered name of a buffered record (without extension).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RecordId(String);

impl RecordId {
    /// Allocate a fresh identifier.
    pub fn generate() -> Self {
        let millis = Utc::now().timestamp_millis();
        let seq = SEQUENCE.fetch_add(1, Ordering::Relaxed);
        let nonce = uuid::Uuid::new_v4().simple().to_string();
        RecordId(format!("{millis:013}-{seq:08}-{}", &nonce[..8]))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn file_name(&self) -> String {
        format!("{}.{RECORD_EXT}", self.0)
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Durable queue of pending diff records.
#[derive(Debug, Clone)]
pub struct DiffBuffer {
    dir: PathBuf,
}

impl DiffBuffer {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(settings.diffs_dir())
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Write one new record under a fresh name.
    ///
    /// Safe to call concurrently; an existing file is never overwritten.
    pub fn append(&self, record: &DiffRecord) -> StorageResult<RecordId> {
        fs::create_dir_all(&self.dir).map_err(|e| StorageError::io(&self.dir, e))?;

        let yaml = serde_yaml::to_string(record)?;
        let id = RecordId::generate();
        let target = self.dir.join(id.file_name());

        let mut tmp =
            tempfile::NamedTempFile::new_in(&self.dir).map_err(|e| StorageError::io(&self.dir, e))?;
        std::io::Write::write_all(&mut tmp, yaml.as_bytes())
            .map_err(|e| StorageError::io(&target, e))?;

        match tmp.persist_noclobber(&target) {
            Ok(_) => Ok(id),
            Err(e) if e.error.kind() == std::io::ErrorKind::AlreadyExists => {
                Err(StorageError::Collision(id.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Read all pending records in name order, without consuming them.
    pub fn pending(&self) -> StorageResult<Vec<(RecordId, DiffRecord)>> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(StorageError::io(&self.dir, e)),
        };

        let mut records = Vec::new();
        for entry in entries {
            let path = entry.map_err(|e| StorageError::io(&self.dir, e))?.path();
            if path.extension().and_then(|e| e.to_str()) != Some(RECORD_EXT) {
                continue;
            }
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            let text = fs::read_to_string(&path).map_err(|e| StorageError::io(&path, e))?;
            records.push((RecordId(stem.to_string()), serde_yaml::from_str(&text)?));
        }

        records.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(records)
    }
}
