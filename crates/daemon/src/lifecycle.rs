// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon assembly: startup order, shutdown order, halt policy.
//!
//! Startup: store → recovery (inside the engine) → adapters → loop →
//! control socket → tracker watcher → dashboard. Shutdown is the loop
//! ending (pause + drain + persist) followed by the listeners.

use crate::{dashboard, server};
use gf_adapters::{BdTracker, ExternalVcs, FileWatcher, TrackerAdapter, VcsGateway};
use gf_core::{Config, SystemClock};
use gf_engine::{Engine, EngineError, EngineHandle, EventBus, RunOptions};
use gf_storage::{Store, StoreError, StoreOptions, TranscriptStore};
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum DaemonError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Engine(#[from] EngineError),
    #[error("daemon io error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone, Default)]
pub struct DaemonOptions {
    /// Wipe durable state instead of refusing to start on a bad load.
    pub reinitialize: bool,
    /// Dashboard port override (`--port`); 0 disables.
    pub port: Option<u16>,
    pub run: RunOptions,
}

/// Run the engine with its control socket and dashboard until it stops.
pub async fn run_daemon(config: Config, opts: DaemonOptions) -> Result<(), DaemonError> {
    let state_dir = config.state_dir();
    std::fs::create_dir_all(&state_dir)?;

    let store = Store::open(
        &state_dir,
        StoreOptions {
            snapshot_interval: config.daemon.snapshot_interval,
            reinitialize: opts.reinitialize,
        },
    )?;

    let tracker: Arc<dyn TrackerAdapter> = Arc::new(BdTracker::new(
        config.tracker.bin.clone(),
        config.tracker_records_path(),
        config.project.repo_root.clone(),
    ));
    let vcs: Arc<dyn VcsGateway> = Arc::new(ExternalVcs::new(
        config.vcs.bin.clone(),
        config.project.repo_root.clone(),
    ));
    let bus = Arc::new(EventBus::new());
    let transcripts = TranscriptStore::new(&state_dir);

    if config.daemon.transcript_retention_days > 0 {
        let cutoff = std::time::SystemTime::now()
            - std::time::Duration::from_secs(config.daemon.transcript_retention_days * 86_400);
        let pruned = transcripts.prune_older_than(cutoff);
        if pruned > 0 {
            info!(pruned, "old transcripts removed");
        }
    }

    let (mut engine, handle) = Engine::new(
        config.clone(),
        opts.run,
        store,
        Arc::clone(&tracker),
        vcs,
        Arc::clone(&bus),
        transcripts.clone(),
        SystemClock,
    );

    // Ctrl-C maps to engine cancellation (interrupt + drain + persist).
    let signal_cancel = handle.cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("ctrl-c: shutting down");
            signal_cancel.cancel();
        }
    });

    // Tracker file watcher wakes the loop early; the loop's own tick is
    // the fallback when the watch cannot be installed.
    let wake_tx = engine.wake_sender();
    match FileWatcher::watch(&config.tracker_records_path()) {
        Ok(mut watcher) => {
            tokio::spawn(async move {
                while watcher.changed().await.is_some() {
                    if wake_tx.send(()).await.is_err() {
                        break;
                    }
                }
            });
        }
        Err(e) => warn!(error = %e, "tracker watch unavailable; polling only"),
    }

    let server_task = tokio::spawn(server::serve(
        config.socket_path(),
        handle.clone(),
        handle.cancel.clone(),
    ));

    let port = opts.port.unwrap_or(config.daemon.port);
    let dashboard_task = if port > 0 {
        let state = dashboard::DashboardState {
            reader: handle.reader.clone(),
            handle: Some(handle.clone()),
            bus: Arc::clone(&bus),
            transcripts,
        };
        Some(tokio::spawn(dashboard::serve(port, state, handle.cancel.clone())))
    } else {
        None
    };

    let result = engine.run().await;

    // The loop is gone; stop the listeners.
    handle.cancel.cancel();
    if let Ok(Err(e)) = server_task.await {
        warn!(error = %e, "control server ended with error");
    }
    if let Some(task) = dashboard_task {
        if let Ok(Err(e)) = task.await {
            warn!(error = %e, "dashboard ended with error");
        }
    }

    result.map_err(DaemonError::from)
}

/// `gaffer serve`: dashboard over an existing state directory, no engine.
pub async fn serve_dashboard_only(config: Config, port: u16) -> Result<(), DaemonError> {
    let state_dir = config.state_dir();
    let store = Store::open(
        &state_dir,
        StoreOptions { snapshot_interval: 0, reinitialize: false },
    )?;

    let state = dashboard::DashboardState {
        reader: store.reader(),
        handle: None,
        bus: Arc::new(EventBus::new()),
        transcripts: TranscriptStore::new(&state_dir),
    };

    let cancel = tokio_util::sync::CancellationToken::new();
    let signal_cancel = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            signal_cancel.cancel();
        }
    });
    dashboard::serve(port, state, cancel).await?;
    // Keep the store (and its lock) alive for the whole serve.
    drop(store);
    Ok(())
}

/// Expose the socket liveness probe for `doctor` and the CLI client.
pub use server::ping;
