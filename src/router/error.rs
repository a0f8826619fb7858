//! Error types for the change event router.

use std::path::PathBuf;
use thiserror::Error;

use crate::storage::StorageError;

/// Failures that must reach the host. Skips are not errors.
#[derive(Error, Debug)]
pub enum RouterError {
    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("Cannot read live content of {path}: {source}")]
    ReadContent {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub type RouterResult<T> = Result<T, RouterError>;
