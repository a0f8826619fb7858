//! Init command: bootstrap a repository.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context as _;
use console::style;

use crate::bootstrap::{
    BootstrapOutcome, BootstrapReport, Bootstrapper, Collaborators, Notifier, SyncMode, Trigger,
};
use crate::cli::notify::{ConsoleNotifier, LogNotifier};
use crate::config::Settings;
use crate::paths::GitHeadResolver;
use crate::remote::HttpRemote;
use crate::scanner::WorkingTreeScanner;
use crate::storage::SyncConfigStore;
use crate::upload::LocalUploader;

/// Options of `codesync init`.
#[derive(Debug, Clone)]
pub struct InitArgs {
    pub path: Option<PathBuf>,
    pub token: String,
    pub daemon: bool,
    pub branch: bool,
}

/// Resolve the repository root, defaulting to the current directory.
pub fn resolve_repo_path(path: Option<&Path>) -> anyhow::Result<PathBuf> {
    let path = match path {
        Some(path) => path.to_path_buf(),
        None => std::env::current_dir().context("cannot read current directory")?,
    };
    path.canonicalize()
        .with_context(|| format!("repository not found: {}", path.display()))
}

/// Run init command. Returns whether bootstrap completed.
pub async fn run_init(settings: &Settings, args: InitArgs) -> anyhow::Result<bool> {
    let repo_path = resolve_repo_path(args.path.as_deref())?;
    let sync_config = Arc::new(
        SyncConfigStore::from_settings(settings).context("cannot open sync config")?,
    );

    let notifier: Arc<dyn Notifier> = if args.daemon {
        Arc::new(LogNotifier)
    } else {
        Arc::new(ConsoleNotifier::new(&settings.api.base_url))
    };
    let collaborators = Collaborators {
        remote: Arc::new(HttpRemote::new(&settings.api)?),
        notifier,
        uploader: Arc::new(LocalUploader::new(sync_config.clone())),
        scanner: Arc::new(WorkingTreeScanner::from_settings(settings)),
        branches: Arc::new(GitHeadResolver),
    };

    let trigger = if args.daemon {
        Trigger::Daemon
    } else {
        Trigger::Interactive
    };
    let mode = if args.branch {
        SyncMode::Branch
    } else {
        SyncMode::Repository
    };

    let report = Bootstrapper::from_settings(settings, collaborators, sync_config)
        .sync_repo(&repo_path, &args.token, trigger, mode)
        .await?;

    print_report(&repo_path, &report);
    Ok(report.is_done())
}

fn print_report(repo_path: &Path, report: &BootstrapReport) {
    match report.outcome {
        BootstrapOutcome::Done => {
            println!(
                "{} {} on branch {}",
                style("Bootstrapped").green().bold(),
                repo_path.display(),
                report.branch.as_deref().unwrap_or_default()
            );
            println!("  Syncable files: {}", report.paths.len());
            println!(
                "  Originals:      {} copied, {} kept",
                report.originals.copied, report.originals.kept
            );
            println!(
                "  Shadow:         {} copied, {} kept",
                report.shadow.copied, report.shadow.kept
            );
            if let Some(visibility) = report.visibility {
                println!("  Visibility:     {visibility}");
            }
            if report.degraded {
                println!(
                    "  {}",
                    style("Service unreachable: ran without account checks").yellow()
                );
            }
        }
        BootstrapOutcome::Aborted(reason) => {
            eprintln!(
                "{} {reason}{}",
                style("Aborted:").red().bold(),
                if reason.is_retryable() {
                    " (try again later)"
                } else {
                    ""
                }
            );
        }
    }
}
