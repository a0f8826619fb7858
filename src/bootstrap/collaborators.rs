//! Interfaces bootstrap consumes from the outside world.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::paths::{Repository, TrackedPath};
use crate::remote::RemoteError;
use crate::scanner::ScanError;
use crate::syncignore::Syncignore;
use crate::upload::UploadError;

use super::state::{Trigger, Visibility};

/// Plan limits of the account owning the token.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Plan {
    /// Repositories the plan allows; `None` means unlimited.
    #[serde(rename = "REPO_COUNT", default, skip_serializing_if = "Option::is_none")]
    pub repo_count: Option<u64>,

    /// Largest file the plan syncs, in bytes.
    #[serde(rename = "FILE_SIZE", default, skip_serializing_if = "Option::is_none")]
    pub file_size: Option<u64>,

    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    #[serde(default)]
    pub email: String,

    /// Repositories already synced by this user.
    #[serde(default)]
    pub repo_count: u64,

    #[serde(default)]
    pub plan: Plan,
}

impl UserProfile {
    /// Identity used when the server cannot be reached.
    pub fn placeholder() -> Self {
        Self::default()
    }

    /// True if syncing one more repository would exceed the plan.
    pub fn at_repo_limit(&self) -> bool {
        self.plan
            .repo_count
            .is_some_and(|limit| self.repo_count >= limit)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TokenCheck {
    Valid(UserProfile),
    Invalid,
}

/// Remote eligibility checks. Implementations bound their own timeouts.
#[async_trait]
pub trait RemoteService: Send + Sync {
    async fn is_server_down(&self) -> bool;

    async fn user_for_token(&self, token: &str) -> Result<TokenCheck, RemoteError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Confirmation {
    Continue,
    Cancel,
}

/// Host notification surface.
///
/// Prompt methods return `None` when the user dismisses the prompt.
#[async_trait]
pub trait Notifier: Send + Sync {
    fn info(&self, message: &str);

    fn warn(&self, message: &str);

    fn error(&self, message: &str);

    /// Let the user edit the ignore file, then continue or cancel.
    async fn confirm_syncignore(&self, syncignore: &Path) -> Confirmation;

    /// Ask for public or private.
    async fn choose_visibility(&self) -> Option<Visibility>;

    /// Remediation for an invalid token.
    fn offer_login(&self);
}

/// Everything the uploader needs to take over a bootstrapped branch.
#[derive(Debug, Clone, PartialEq)]
pub struct UploadRequest {
    pub repo_path: PathBuf,
    pub branch: String,
    pub token: String,
    pub paths: Vec<TrackedPath>,
    pub visibility: Visibility,
    pub is_repo_synced: bool,
    pub trigger: Trigger,
    pub email: String,
}

#[async_trait]
pub trait Uploader: Send + Sync {
    async fn upload_repo(&self, request: UploadRequest) -> Result<(), UploadError>;
}

/// Computes which working-tree files may be synced.
pub trait SyncablePathProvider: Send + Sync {
    fn syncable_paths(
        &self,
        repo: &Repository,
        syncignore: &Syncignore,
        plan: &Plan,
    ) -> Result<Vec<TrackedPath>, ScanError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_profile_wire_format() {
        let user: UserProfile = serde_json::from_str(
            r#"{"email":"a@b.c","repo_count":1,"plan":{"REPO_COUNT":1,"FILE_SIZE":1024,"NAME":"free"}}"#,
        )
        .unwrap();
        assert_eq!(user.email, "a@b.c");
        assert_eq!(user.plan.repo_count, Some(1));
        assert_eq!(user.plan.file_size, Some(1024));
        assert_eq!(user.plan.extra["NAME"], "free");
        assert!(user.at_repo_limit());
    }

    #[test]
    fn test_placeholder_has_no_limit() {
        let user = UserProfile::placeholder();
        assert!(user.email.is_empty());
        assert!(!user.at_repo_limit());
    }
}
