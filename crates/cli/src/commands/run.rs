// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `gaffer run` and `gaffer serve`.

use super::load_config;
use crate::exit_error::ExitError;
use crate::RunArgs;
use gf_daemon::{run_daemon, serve_dashboard_only, DaemonOptions};
use gf_engine::RunOptions;
use std::path::Path;

pub(crate) async fn run(config_path: &Path, verbose: bool, args: RunArgs) -> Result<(), ExitError> {
    let mut config = load_config(config_path)?;

    // CLI flags override the config file.
    if args.no_planner {
        config.passes.planner_enabled = false;
    }
    if let Some(interval) = args.planner_interval {
        config.passes.planner_interval = interval;
    }
    if args.no_quality {
        config.passes.quality_enabled = false;
    }
    if let Some(interval) = args.quality_interval {
        config.passes.quality_interval = interval;
    }
    if let Some(timeout) = args.agent_timeout {
        config.agents.timeout_seconds = timeout;
    }

    let _log_guard = gf_daemon::logging::init(verbose, &config.state_dir().join("logs"))
        .map_err(|e| ExitError::engine(format!("logging init failed: {e}")))?;

    let opts = DaemonOptions {
        reinitialize: args.force,
        port: args.port,
        run: RunOptions {
            max_iterations: args.max_iterations,
            dry_run: args.dry_run,
            only_issue: args.issue.map(|id| id.as_str().into()),
            skip_deps: args.skip_deps,
            author: "gaffer".into(),
        },
    };

    run_daemon(config, opts).await.map_err(|e| ExitError::engine(e.to_string()))
}

pub(crate) async fn serve(config_path: &Path, verbose: bool, port: u16) -> Result<(), ExitError> {
    let config = load_config(config_path)?;
    let _log_guard = gf_daemon::logging::init(verbose, &config.state_dir().join("logs"))
        .map_err(|e| ExitError::engine(format!("logging init failed: {e}")))?;

    serve_dashboard_only(config, port).await.map_err(|e| ExitError::engine(e.to_string()))
}
