//! States, modes and abort reasons of the bootstrap flow.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Whether a whole repository or one more branch of a synced repository is
/// being set up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SyncMode {
    Repository,
    /// Branch-only sync: inherits visibility and bypasses the plan limit.
    Branch,
}

/// Who started the flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Trigger {
    /// A user is present to answer prompts.
    Interactive,
    /// A background job; never prompts and never blocks on the server.
    Daemon,
}

impl Trigger {
    pub fn is_interactive(&self) -> bool {
        matches!(self, Trigger::Interactive)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    Public,
    Private,
    /// Keep the repository's existing visibility.
    Inherited,
}

impl Visibility {
    /// `Some(true)` for public, `None` when inherited.
    pub fn is_public(&self) -> Option<bool> {
        match self {
            Visibility::Public => Some(true),
            Visibility::Private => Some(false),
            Visibility::Inherited => None,
        }
    }
}

impl fmt::Display for Visibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Visibility::Public => "public",
            Visibility::Private => "private",
            Visibility::Inherited => "inherited",
        })
    }
}

/// Failure class of an abort, deciding what the user can do about it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorClass {
    /// Explicit cancel; not retried.
    UserAbort,
    /// The user must act elsewhere (upgrade, pick another branch).
    PolicyReject,
    /// Safe to retry by running bootstrap again.
    TransientUnavailable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AbortReason {
    ServiceDown,
    InvalidToken,
    AlreadySynced,
    PlanLimitExceeded,
    ByUser,
}

impl AbortReason {
    pub fn class(&self) -> ErrorClass {
        match self {
            AbortReason::ServiceDown | AbortReason::InvalidToken => {
                ErrorClass::TransientUnavailable
            }
            AbortReason::AlreadySynced | AbortReason::PlanLimitExceeded => {
                ErrorClass::PolicyReject
            }
            AbortReason::ByUser => ErrorClass::UserAbort,
        }
    }

    pub fn is_retryable(&self) -> bool {
        self.class() == ErrorClass::TransientUnavailable
    }
}

impl fmt::Display for AbortReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            AbortReason::ServiceDown => "service unavailable",
            AbortReason::InvalidToken => "invalid access token",
            AbortReason::AlreadySynced => "branch already synced",
            AbortReason::PlanLimitExceeded => "plan repository limit reached",
            AbortReason::ByUser => "cancelled by user",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BootstrapState {
    ValidatingServer,
    ValidatingToken,
    CheckingSyncStatus,
    ManagingIgnoreFile,
    AwaitingUserConfirmation,
    ChoosingVisibility,
    SeedingMirrors,
    Uploading,
    Done,
    Aborted(AbortReason),
}

impl BootstrapState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, BootstrapState::Done | BootstrapState::Aborted(_))
    }
}

impl fmt::Display for BootstrapState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BootstrapState::ValidatingServer => f.write_str("ValidatingServer"),
            BootstrapState::ValidatingToken => f.write_str("ValidatingToken"),
            BootstrapState::CheckingSyncStatus => f.write_str("CheckingSyncStatus"),
            BootstrapState::ManagingIgnoreFile => f.write_str("ManagingIgnoreFile"),
            BootstrapState::AwaitingUserConfirmation => f.write_str("AwaitingUserConfirmation"),
            BootstrapState::ChoosingVisibility => f.write_str("ChoosingVisibility"),
            BootstrapState::SeedingMirrors => f.write_str("SeedingMirrors"),
            BootstrapState::Uploading => f.write_str("Uploading"),
            BootstrapState::Done => f.write_str("Done"),
            BootstrapState::Aborted(reason) => write!(f, "Aborted({reason})"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_abort_classes() {
        assert_eq!(AbortReason::ByUser.class(), ErrorClass::UserAbort);
        assert_eq!(AbortReason::PlanLimitExceeded.class(), ErrorClass::PolicyReject);
        assert_eq!(AbortReason::AlreadySynced.class(), ErrorClass::PolicyReject);
        assert!(AbortReason::ServiceDown.is_retryable());
        assert!(AbortReason::InvalidToken.is_retryable());
        assert!(!AbortReason::ByUser.is_retryable());
    }

    #[test]
    fn test_visibility_serde_is_lowercase() {
        let value: Visibility = serde_json::from_str("\"private\"").unwrap();
        assert_eq!(value, Visibility::Private);
        assert_eq!(serde_json::to_string(&Visibility::Public).unwrap(), "\"public\"");
    }

    #[test]
    fn test_terminal_states() {
        assert!(BootstrapState::Done.is_terminal());
        assert!(BootstrapState::Aborted(AbortReason::ByUser).is_terminal());
        assert!(!BootstrapState::SeedingMirrors.is_terminal());
    }
}
