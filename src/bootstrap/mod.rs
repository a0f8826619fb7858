//! Repository bootstrap.
//!
//! Sets a directory (or one more branch of it) up for sync: checks the
//! remote, prepares `.syncignore`, seeds the originals and shadow mirrors
//! and hands the file set to the uploader. The flow is an explicit state
//! machine driven by [`Bootstrapper::run`].

mod collaborators;
mod error;
mod machine;
mod state;

pub use collaborators::{
    Confirmation, Notifier, Plan, RemoteService, SyncablePathProvider, TokenCheck, UploadRequest,
    Uploader, UserProfile,
};
pub use error::{BootstrapError, BootstrapResult};
pub use machine::{
    BootstrapOutcome, BootstrapReport, BootstrapRequest, Bootstrapper, Collaborators, notice,
};
pub use state::{AbortReason, BootstrapState, ErrorClass, SyncMode, Trigger, Visibility};
