use std::path::PathBuf;
use std::sync::Arc;

use crate::config::Settings;
use crate::paths::{BranchResolver, Repository, SYNCIGNORE, TrackedPath, resolve_branch};
use crate::storage::{MirrorKind, MirrorStore, SeedReport, SyncConfigStore};
use crate::syncignore::{Syncignore, SyncignoreSeed, ensure_syncignore};

use super::collaborators::{
    Confirmation, Notifier, RemoteService, SyncablePathProvider, TokenCheck, UploadRequest,
    Uploader, UserProfile,
};
use super::error::{BootstrapError, BootstrapResult};
use super::state::{AbortReason, BootstrapState, SyncMode, Trigger, Visibility};

/// Messages shown through the [`Notifier`].
pub mod notice {
    pub const SERVICE_NOT_AVAILABLE: &str =
        "CodeSync service is unavailable. Please try again in a moment.";
    pub const AUTHENTICATION_FAILED: &str = "Authentication failed. You need to login again.";
    pub const INVALID_TOKEN: &str = "Access token is invalid or expired.";
    pub const UPGRADE_PLAN: &str =
        "Repository limit reached for your plan. Upgrade to sync more repositories.";
    pub const UPDATE_SYNCIGNORE: &str =
        "Add the paths you do not want to sync to .syncignore, then continue.";
    pub const INIT_CANCELLED: &str = "Initialization cancelled.";
    pub const SYNCIGNORE_FROM_GITIGNORE: &str = ".syncignore was created from .gitignore";

    pub fn already_synced(branch: &str) -> String {
        format!("Repo is already in sync with branch: {branch}")
    }

    pub fn branch_being_synced(branch: &str, repo: &str) -> String {
        format!("Branch: {branch} is being synced for the repo: {repo}")
    }
}

/// Input of one bootstrap run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BootstrapRequest {
    pub repo_path: PathBuf,
    pub token: String,
    pub trigger: Trigger,
    pub mode: SyncMode,
}

impl BootstrapRequest {
    /// Interactive, whole-repository request.
    pub fn new(repo_path: impl Into<PathBuf>, token: impl Into<String>) -> Self {
        Self {
            repo_path: repo_path.into(),
            token: token.into(),
            trigger: Trigger::Interactive,
            mode: SyncMode::Repository,
        }
    }

    pub fn with_trigger(mut self, trigger: Trigger) -> Self {
        self.trigger = trigger;
        self
    }

    pub fn with_mode(mut self, mode: SyncMode) -> Self {
        self.mode = mode;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootstrapOutcome {
    Done,
    Aborted(AbortReason),
}

/// What a run did and how it ended.
#[derive(Debug, Clone)]
pub struct BootstrapReport {
    pub outcome: BootstrapOutcome,
    /// Every state visited, starting with `ValidatingServer`.
    pub trail: Vec<BootstrapState>,
    /// Resolved branch, once known.
    pub branch: Option<String>,
    /// Ran without a server identity.
    pub degraded: bool,
    pub syncignore: Option<SyncignoreSeed>,
    pub visibility: Option<Visibility>,
    pub paths: Vec<TrackedPath>,
    pub originals: SeedReport,
    pub shadow: SeedReport,
}

impl BootstrapReport {
    pub fn is_done(&self) -> bool {
        self.outcome == BootstrapOutcome::Done
    }

    pub fn visited(&self, state: BootstrapState) -> bool {
        self.trail.contains(&state)
    }
}

/// Collaborators bootstrap delegates to.
#[derive(Clone)]
pub struct Collaborators {
    pub remote: Arc<dyn RemoteService>,
    pub notifier: Arc<dyn Notifier>,
    pub uploader: Arc<dyn Uploader>,
    pub scanner: Arc<dyn SyncablePathProvider>,
    pub branches: Arc<dyn BranchResolver>,
}

/// Data gathered while moving through the states.
struct Context {
    request: BootstrapRequest,
    repo: Repository,
    degraded: bool,
    user: UserProfile,
    branch: Option<String>,
    repo_synced: bool,
    syncignore: Option<SyncignoreSeed>,
    visibility: Option<Visibility>,
    paths: Vec<TrackedPath>,
    originals: SeedReport,
    shadow: SeedReport,
}

impl Context {
    fn new(request: BootstrapRequest) -> Self {
        let repo = Repository::new(&request.repo_path);
        Self {
            request,
            repo,
            degraded: false,
            user: UserProfile::placeholder(),
            branch: None,
            repo_synced: false,
            syncignore: None,
            visibility: None,
            paths: Vec::new(),
            originals: SeedReport::default(),
            shadow: SeedReport::default(),
        }
    }

    fn interactive(&self) -> bool {
        self.request.trigger.is_interactive()
    }

    fn branch(&self) -> &str {
        self.branch.as_deref().unwrap_or_default()
    }

    fn into_report(self, outcome: BootstrapOutcome, trail: Vec<BootstrapState>) -> BootstrapReport {
        BootstrapReport {
            outcome,
            trail,
            branch: self.branch,
            degraded: self.degraded,
            syncignore: self.syncignore,
            visibility: self.visibility,
            paths: self.paths,
            originals: self.originals,
            shadow: self.shadow,
        }
    }
}

/// Drives repositories through the bootstrap states.
pub struct Bootstrapper {
    remote: Arc<dyn RemoteService>,
    notifier: Arc<dyn Notifier>,
    uploader: Arc<dyn Uploader>,
    scanner: Arc<dyn SyncablePathProvider>,
    branches: Arc<dyn BranchResolver>,
    mirrors: MirrorStore,
    sync_config: Arc<SyncConfigStore>,
    default_branch: String,
    daemon_visibility: Visibility,
}

impl Bootstrapper {
    pub fn new(
        collaborators: Collaborators,
        mirrors: MirrorStore,
        sync_config: Arc<SyncConfigStore>,
    ) -> Self {
        Self {
            remote: collaborators.remote,
            notifier: collaborators.notifier,
            uploader: collaborators.uploader,
            scanner: collaborators.scanner,
            branches: collaborators.branches,
            mirrors,
            sync_config,
            default_branch: "default".to_string(),
            daemon_visibility: Visibility::Private,
        }
    }

    pub fn from_settings(
        settings: &Settings,
        collaborators: Collaborators,
        sync_config: Arc<SyncConfigStore>,
    ) -> Self {
        Self::new(
            collaborators,
            MirrorStore::from_settings(settings),
            sync_config,
        )
        .with_default_branch(&settings.default_branch)
        .with_daemon_visibility(settings.bootstrap.daemon_visibility)
    }

    pub fn with_default_branch(mut self, branch: impl Into<String>) -> Self {
        self.default_branch = branch.into();
        self
    }

    /// Visibility used for automated repository syncs.
    pub fn with_daemon_visibility(mut self, visibility: Visibility) -> Self {
        self.daemon_visibility = visibility;
        self
    }

    /// Bootstrap `repo_path`.
    pub async fn sync_repo(
        &self,
        repo_path: impl Into<PathBuf>,
        token: &str,
        trigger: Trigger,
        mode: SyncMode,
    ) -> BootstrapResult<BootstrapReport> {
        let request = BootstrapRequest::new(repo_path, token)
            .with_trigger(trigger)
            .with_mode(mode);
        self.run(request).await
    }

    /// Step from `ValidatingServer` until a terminal state.
    ///
    /// Storage, scan and upload failures end the run with an error; every
    /// other way out is an abort carried in the report.
    pub async fn run(&self, request: BootstrapRequest) -> BootstrapResult<BootstrapReport> {
        crate::log_event!(
            "bootstrap",
            "started",
            "{} ({:?}, {:?})",
            request.repo_path.display(),
            request.trigger,
            request.mode
        );

        let mut ctx = Context::new(request);
        let mut state = BootstrapState::ValidatingServer;
        let mut trail = vec![state];

        while !state.is_terminal() {
            let next = self.step(state, &mut ctx).await?;
            crate::debug_event!("bootstrap", "transition", "{state} -> {next}");
            state = next;
            trail.push(state);
        }

        let outcome = match state {
            BootstrapState::Aborted(reason) => {
                tracing::warn!(
                    "[bootstrap] aborted {}: {reason}",
                    ctx.repo.root().display()
                );
                BootstrapOutcome::Aborted(reason)
            }
            _ => {
                crate::log_event!(
                    "bootstrap",
                    "done",
                    "{}@{} with {} files",
                    ctx.repo.name(),
                    ctx.branch(),
                    ctx.paths.len()
                );
                BootstrapOutcome::Done
            }
        };

        Ok(ctx.into_report(outcome, trail))
    }

    async fn step(
        &self,
        state: BootstrapState,
        ctx: &mut Context,
    ) -> BootstrapResult<BootstrapState> {
        let next = match state {
            BootstrapState::ValidatingServer => self.validate_server(ctx).await,
            BootstrapState::ValidatingToken => self.validate_token(ctx).await,
            BootstrapState::CheckingSyncStatus => self.check_sync_status(ctx)?,
            BootstrapState::ManagingIgnoreFile => self.manage_ignore_file(ctx)?,
            BootstrapState::AwaitingUserConfirmation => self.await_confirmation(ctx).await,
            BootstrapState::ChoosingVisibility => self.choose_visibility(ctx).await,
            BootstrapState::SeedingMirrors => self.seed_mirrors(ctx)?,
            BootstrapState::Uploading => self.upload(ctx).await?,
            BootstrapState::Done | BootstrapState::Aborted(_) => state,
        };
        Ok(next)
    }

    async fn validate_server(&self, ctx: &mut Context) -> BootstrapState {
        if self.remote.is_server_down().await {
            self.service_unavailable(ctx)
        } else {
            BootstrapState::ValidatingToken
        }
    }

    /// Interactive flows stop; automated flows continue without identity.
    fn service_unavailable(&self, ctx: &mut Context) -> BootstrapState {
        if ctx.interactive() {
            self.notifier.error(notice::SERVICE_NOT_AVAILABLE);
            return BootstrapState::Aborted(AbortReason::ServiceDown);
        }
        tracing::warn!("[bootstrap] service unavailable, continuing without a user identity");
        ctx.degraded = true;
        ctx.user = UserProfile::placeholder();
        BootstrapState::CheckingSyncStatus
    }

    async fn validate_token(&self, ctx: &mut Context) -> BootstrapState {
        match self.remote.user_for_token(&ctx.request.token).await {
            Ok(TokenCheck::Valid(user)) => {
                crate::debug_event!("bootstrap", "token valid", "{}", user.email);
                ctx.user = user;
                BootstrapState::CheckingSyncStatus
            }
            Ok(TokenCheck::Invalid) => {
                if ctx.interactive() {
                    self.notifier.warn(notice::AUTHENTICATION_FAILED);
                    self.notifier.offer_login();
                } else {
                    tracing::warn!("[bootstrap] {}", notice::INVALID_TOKEN);
                }
                BootstrapState::Aborted(AbortReason::InvalidToken)
            }
            Err(e) => {
                tracing::warn!("[bootstrap] token check failed: {e}");
                self.service_unavailable(ctx)
            }
        }
    }

    fn check_sync_status(&self, ctx: &mut Context) -> BootstrapResult<BootstrapState> {
        let branch = resolve_branch(self.branches.as_ref(), ctx.repo.root(), &self.default_branch);
        self.sync_config.reload()?;

        let key = ctx.repo.config_key();
        ctx.repo_synced = self.sync_config.is_repo_synced(&key);
        let branch_synced = self.sync_config.is_branch_synced(&key, &branch);
        crate::debug_event!(
            "bootstrap",
            "sync status",
            "{key}@{branch}: repo={}, branch={branch_synced}",
            ctx.repo_synced
        );

        if ctx.repo_synced && branch_synced && ctx.interactive() {
            self.notifier.warn(&notice::already_synced(&branch));
            ctx.branch = Some(branch);
            return Ok(BootstrapState::Aborted(AbortReason::AlreadySynced));
        }
        ctx.branch = Some(branch);

        if !ctx.degraded
            && ctx.request.mode == SyncMode::Repository
            && !ctx.repo_synced
            && ctx.user.at_repo_limit()
        {
            self.notifier.error(notice::UPGRADE_PLAN);
            return Ok(BootstrapState::Aborted(AbortReason::PlanLimitExceeded));
        }

        Ok(BootstrapState::ManagingIgnoreFile)
    }

    fn manage_ignore_file(&self, ctx: &mut Context) -> BootstrapResult<BootstrapState> {
        let root = ctx.repo.root();
        let seed = ensure_syncignore(root).map_err(|source| BootstrapError::Io {
            path: root.join(SYNCIGNORE),
            source,
        })?;
        if seed == SyncignoreSeed::CopiedFromGitignore {
            self.notifier.info(notice::SYNCIGNORE_FROM_GITIGNORE);
        }
        ctx.syncignore = Some(seed);

        Ok(if ctx.interactive() {
            BootstrapState::AwaitingUserConfirmation
        } else {
            BootstrapState::ChoosingVisibility
        })
    }

    async fn await_confirmation(&self, ctx: &mut Context) -> BootstrapState {
        self.notifier.info(notice::UPDATE_SYNCIGNORE);
        let path = ctx.repo.root().join(SYNCIGNORE);
        match self.notifier.confirm_syncignore(&path).await {
            Confirmation::Continue => BootstrapState::ChoosingVisibility,
            Confirmation::Cancel => {
                self.notifier.warn(notice::INIT_CANCELLED);
                BootstrapState::Aborted(AbortReason::ByUser)
            }
        }
    }

    async fn choose_visibility(&self, ctx: &mut Context) -> BootstrapState {
        if ctx.interactive() && ctx.repo_synced {
            self.notifier
                .info(&notice::branch_being_synced(ctx.branch(), ctx.repo.name()));
        }

        let visibility = match (ctx.request.mode, ctx.request.trigger) {
            (SyncMode::Branch, _) => Visibility::Inherited,
            (SyncMode::Repository, Trigger::Daemon) => self.daemon_visibility,
            (SyncMode::Repository, Trigger::Interactive) => {
                match self.notifier.choose_visibility().await {
                    Some(choice) => choice,
                    None => {
                        self.notifier.warn(notice::INIT_CANCELLED);
                        return BootstrapState::Aborted(AbortReason::ByUser);
                    }
                }
            }
        };

        ctx.visibility = Some(visibility);
        BootstrapState::SeedingMirrors
    }

    fn seed_mirrors(&self, ctx: &mut Context) -> BootstrapResult<BootstrapState> {
        let syncignore = Syncignore::load(ctx.repo.root());
        ctx.paths = self
            .scanner
            .syncable_paths(&ctx.repo, &syncignore, &ctx.user.plan)?;

        let branch = ctx.branch().to_string();
        ctx.originals =
            self.mirrors
                .seed_branch(MirrorKind::Originals, &ctx.repo, &branch, &ctx.paths)?;
        ctx.shadow = self
            .mirrors
            .seed_branch(MirrorKind::Shadow, &ctx.repo, &branch, &ctx.paths)?;

        Ok(BootstrapState::Uploading)
    }

    async fn upload(&self, ctx: &mut Context) -> BootstrapResult<BootstrapState> {
        let request = UploadRequest {
            repo_path: ctx.repo.root().to_path_buf(),
            branch: ctx.branch().to_string(),
            token: ctx.request.token.clone(),
            paths: ctx.paths.clone(),
            visibility: ctx.visibility.unwrap_or(Visibility::Inherited),
            is_repo_synced: ctx.repo_synced,
            trigger: ctx.request.trigger,
            email: ctx.user.email.clone(),
        };
        self.uploader.upload_repo(request).await?;
        Ok(BootstrapState::Done)
    }
}
