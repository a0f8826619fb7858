//! Watch command: route file system changes into the diff buffer.

use std::path::PathBuf;
use std::sync::Arc;

use console::style;

use crate::cli::commands::init::resolve_repo_path;
use crate::config::Settings;
use crate::paths::{GitHeadResolver, Repository, resolve_branch};
use crate::router::ChangeEventRouter;
use crate::storage::{MirrorKind, MirrorStore};
use crate::watcher::RepoWatcher;

/// Run watch command until Ctrl+C.
pub async fn run_watch(
    settings: &Settings,
    path: Option<PathBuf>,
    debounce_ms: Option<u64>,
) -> anyhow::Result<()> {
    let root = resolve_repo_path(path.as_deref())?;

    let repo = Repository::new(&root);
    let branch = resolve_branch(&GitHeadResolver, &root, &settings.default_branch);
    let shadow = MirrorStore::from_settings(settings).branch_dir(MirrorKind::Shadow, &repo, &branch);
    if !shadow.is_dir() {
        eprintln!(
            "{} no shadow for branch {branch}; run `codesync init` first. Changes will be skipped until then.",
            style("warning:").yellow().bold()
        );
    }

    let router = Arc::new(
        ChangeEventRouter::from_settings(Some(&root), settings).with_require_bootstrap(true),
    );
    let watcher = RepoWatcher::builder()
        .router(router)
        .debounce_ms(debounce_ms.unwrap_or(settings.watch.debounce_ms))
        .build()?;

    println!(
        "Watching {} (Ctrl+C to stop)",
        style(watcher.root().display()).green()
    );

    let stats = watcher
        .watch(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!("[watch] cannot listen for Ctrl+C: {e}");
                std::future::pending::<()>().await;
            }
        })
        .await?;

    println!(
        "Stopped: {} recorded, {} skipped, {} failed",
        stats.recorded, stats.skipped, stats.failed
    );
    Ok(())
}
