// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `gaffer sync`: refresh the tracker mirror and print backlog counts.
//!
//! Reads the record log directly; a running engine notices the same file
//! and refreshes itself.

use super::load_config;
use crate::exit_error::ExitError;
use gf_adapters::{BdTracker, TrackerAdapter};
use gf_core::TrackerStatus;
use std::path::Path;

pub(crate) async fn run(config_path: &Path) -> Result<(), ExitError> {
    let config = load_config(config_path)?;
    let tracker = BdTracker::new(
        config.tracker.bin.clone(),
        config.tracker_records_path(),
        config.project.repo_root.clone(),
    );
    tracker
        .refresh()
        .await
        .map_err(|e| ExitError::engine(format!("tracker refresh failed: {e}")))?;

    let issues = tracker.mirror();
    let count = |status: TrackerStatus| issues.iter().filter(|i| i.status == status).count();
    println!(
        "{} issues: {} open, {} in progress, {} closed ({} ready)",
        issues.len(),
        count(TrackerStatus::Open),
        count(TrackerStatus::InProgress),
        count(TrackerStatus::Closed),
        tracker.list_ready().len(),
    );
    if config.tracker.sync {
        println!("note: remote sync is not part of the engine; records are local");
    }
    Ok(())
}
