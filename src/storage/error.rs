use std::path::{Path, PathBuf};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("IO error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to persist temporary file: {0}")]
    Persist(#[from] tempfile::PersistError),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Path has no parent directory: {path}")]
    InvalidPath { path: PathBuf },

    #[error("Invalid diff record: {reason}")]
    InvalidRecord { reason: String },

    #[error("Record name already taken: {0}")]
    Collision(String),
}

impl StorageError {
    pub fn io(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        StorageError::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }
}

pub type StorageResult<T> = Result<T, StorageError>;
