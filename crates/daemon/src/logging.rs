// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Tracing setup: env-filtered stderr plus a daily-rolling file layer.

use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Initialize global tracing. Returns the appender guard; dropping it
/// flushes the file layer.
///
/// `GAFFER_LOG` overrides the default filter (`info`, or `debug` with
/// `--verbose`).
pub fn init(verbose: bool, log_dir: &Path) -> std::io::Result<WorkerGuard> {
    std::fs::create_dir_all(log_dir)?;
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_env("GAFFER_LOG")
        .unwrap_or_else(|_| EnvFilter::new(default));

    let appender = tracing_appender::rolling::daily(log_dir, "gafferd.log");
    let (file_writer, guard) = tracing_appender::non_blocking(appender);

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .with(fmt::layer().with_writer(file_writer).with_ansi(false))
        .init();
    Ok(guard)
}
