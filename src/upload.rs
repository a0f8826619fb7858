//! Local handoff of a bootstrapped branch.
//!
//! Transmission itself belongs to the background daemon; this uploader
//! records the branch and its files in the sync config so the daemon and
//! later bootstrap runs see it as synced.

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::bootstrap::{UploadRequest, Uploader};
use crate::storage::{StorageError, SyncConfigStore};

#[derive(Error, Debug)]
pub enum UploadError {
    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("Upload rejected: {0}")]
    Rejected(String),
}

pub struct LocalUploader {
    sync_config: Arc<SyncConfigStore>,
}

impl LocalUploader {
    pub fn new(sync_config: Arc<SyncConfigStore>) -> Self {
        Self { sync_config }
    }
}

#[async_trait]
impl Uploader for LocalUploader {
    async fn upload_repo(&self, request: UploadRequest) -> Result<(), UploadError> {
        if request.branch.is_empty() {
            return Err(UploadError::Rejected("branch is not resolved".to_string()));
        }

        let key = request.repo_path.to_string_lossy().into_owned();
        self.sync_config.mark_branch_synced(
            &key,
            &request.branch,
            request.paths.iter().map(|p| p.to_slash()),
        )?;

        crate::log_event!(
            "upload",
            "queued",
            "{key}@{} ({} files, {}); transmission deferred to the daemon",
            request.branch,
            request.paths.len(),
            request.visibility
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bootstrap::{Trigger, Visibility};
    use crate::paths::TrackedPath;
    use tempfile::TempDir;

    fn request(repo: &str, branch: &str) -> UploadRequest {
        UploadRequest {
            repo_path: repo.into(),
            branch: branch.to_string(),
            token: "t".to_string(),
            paths: vec![TrackedPath::new("src/a.txt").unwrap()],
            visibility: Visibility::Private,
            is_repo_synced: false,
            trigger: Trigger::Interactive,
            email: String::new(),
        }
    }

    #[tokio::test]
    async fn test_marks_branch_synced() {
        let temp = TempDir::new().unwrap();
        let store = Arc::new(SyncConfigStore::open(temp.path().join("config.yml")).unwrap());
        let uploader = LocalUploader::new(store.clone());

        uploader.upload_repo(request("/work/app", "main")).await.unwrap();
        assert!(store.is_branch_synced("/work/app", "main"));

        let reopened = SyncConfigStore::open(temp.path().join("config.yml")).unwrap();
        let snapshot = reopened.snapshot();
        assert!(snapshot.repos["/work/app"].branches["main"].contains_key("src/a.txt"));
    }

    #[tokio::test]
    async fn test_rejects_unresolved_branch() {
        let temp = TempDir::new().unwrap();
        let store = Arc::new(SyncConfigStore::open(temp.path().join("config.yml")).unwrap());
        let err = LocalUploader::new(store)
            .upload_repo(request("/work/app", ""))
            .await
            .unwrap_err();
        assert!(matches!(err, UploadError::Rejected(_)));
    }
}
