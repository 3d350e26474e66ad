//! Watcher lifecycle: wire the controller to the commit pipeline and run
//! until a shutdown signal arrives.

use crate::config::Settings;
use anyhow::{Context, Result};
use autocommit::{check_repository, Orchestrator};
use std::path::Path;
use tracing::{info, warn};
use watcher::{Controller, NotifyProvider};

/// Watch `settings.watch.repo_path` and auto-commit until interrupted
pub async fn run(settings: &Settings, self_name: Option<String>) -> Result<()> {
    let root = settings.watch.repo_path.clone();

    // A missing root is handled by the controller's retry loop
    if root.is_dir() {
        if let Err(e) = check_repository(&root) {
            warn!(
                "The path {} does not represent a valid Git repository. \
                 You may want to create one using `git init` ({})",
                root.display(),
                e
            );
        }
    }

    let provider = NotifyProvider::new().context("Failed to create file watcher")?;
    let orchestrator = Orchestrator::new(settings.commit_options(self_name));
    let committer = move |repo_root: &Path| orchestrator.attempt_commit(repo_root);

    info!(
        timeout_secs = settings.watch.timeout_secs,
        settle = settings.watch.settle,
        "Watching {}",
        root.display()
    );

    let mut controller = Controller::new(root, provider, committer, settings.controller_options());
    controller
        .run_until(shutdown_signal())
        .await
        .context("Watcher stopped")?;

    Ok(())
}

/// Resolves on Ctrl-C, or SIGTERM on unix
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Cannot listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!("Cannot listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Interrupted"),
        _ = terminate => info!("Terminated"),
    }
}
