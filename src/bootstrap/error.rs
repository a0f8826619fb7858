use std::path::PathBuf;
use thiserror::Error;

use crate::scanner::ScanError;
use crate::storage::StorageError;
use crate::upload::UploadError;

/// Failures that end a bootstrap run without reaching a terminal state.
///
/// Aborts are not errors; see [`super::AbortReason`].
#[derive(Error, Debug)]
pub enum BootstrapError {
    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("Failed to compute syncable paths: {0}")]
    Scan(#[from] ScanError),

    #[error("Upload failed: {0}")]
    Upload(#[from] UploadError),

    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub type BootstrapResult<T> = Result<T, BootstrapError>;
