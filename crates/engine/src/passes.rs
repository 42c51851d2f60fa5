// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Planner and quality meta-passes.
//!
//! A pass dispatches a meta agent whose job is to mutate the backlog, not
//! the code. The agent emits JSON-line proposals; each is applied through
//! the tracker adapter. Unknown proposals are logged and skipped, never
//! fatal. Passes run on the loop fiber, so dispatch pauses while one runs.

use gf_adapters::TrackerAdapter;
use gf_core::{AgentsConfig, IssueFields, PassKind, ProjectConfig};
use gf_runner::{RunnerEvent, RunnerSpec};
use serde::Deserialize;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

#[derive(Debug, Default, PartialEq, Eq)]
pub struct PassReport {
    pub proposals: u32,
    pub rejected: u32,
}

/// One backlog mutation proposed by a meta agent.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Proposal {
    File {
        title: String,
        #[serde(default)]
        body: String,
        #[serde(default)]
        labels: Vec<String>,
    },
    Comment {
        id: String,
        body: String,
    },
    Update {
        id: String,
        fields: IssueFields,
    },
}

/// Parse one agent stdout line into a proposal, if it is one.
pub fn parse_proposal(line: &str) -> Option<Proposal> {
    let value: serde_json::Value = serde_json::from_str(line).ok()?;
    if value.get("type")?.as_str()? != "propose" {
        return None;
    }
    match serde_json::from_value(value) {
        Ok(proposal) => Some(proposal),
        Err(e) => {
            warn!(error = %e, "skipping malformed proposal");
            None
        }
    }
}

/// Run one meta pass to completion and apply its proposals.
pub async fn run_pass(
    kind: PassKind,
    batch: u64,
    command: &str,
    agents: &AgentsConfig,
    project: &ProjectConfig,
    tracker: &dyn TrackerAdapter,
    cancel: &CancellationToken,
) -> PassReport {
    let mut report = PassReport::default();

    let Some(argv) = gf_runner::split_command(command).filter(|argv| !argv.is_empty()) else {
        warn!(kind = %kind, command, "unparsable pass command");
        return report;
    };

    let mut spec = RunnerSpec::new(argv, project.repo_root.clone());
    spec.wall_timeout = Duration::from_secs(agents.timeout_seconds);
    spec.idle_timeout = Duration::from_secs(agents.idle_timeout_seconds);
    spec.grace = Duration::from_secs(agents.grace_seconds);
    spec.env = vec![
        ("GAFFER_PASS".into(), kind.to_string()),
        ("GAFFER_BATCH".into(), batch.to_string()),
        ("GAFFER_BUILD_CMD".into(), project.build_cmd.clone()),
        ("GAFFER_TEST_CMD".into(), project.test_cmd.clone()),
    ];

    let mut rx = match gf_runner::spawn(spec, cancel.clone()) {
        Ok(rx) => rx,
        Err(e) => {
            warn!(kind = %kind, error = %e, "pass agent spawn failed");
            return report;
        }
    };

    while let Some(event) = rx.recv().await {
        match event {
            RunnerEvent::Line(line) => {
                let Some(proposal) = parse_proposal(&line) else { continue };
                match apply(tracker, &proposal).await {
                    Ok(()) => report.proposals += 1,
                    Err(e) => {
                        warn!(kind = %kind, error = %e, "proposal rejected by tracker");
                        report.rejected += 1;
                    }
                }
            }
            RunnerEvent::Exit(exit) => {
                if !exit.success() {
                    warn!(
                        kind = %kind,
                        reason = %exit.reason,
                        code = ?exit.code,
                        "pass agent did not exit cleanly"
                    );
                }
                break;
            }
        }
    }

    debug!(kind = %kind, batch, proposals = report.proposals, "pass finished");
    report
}

async fn apply(
    tracker: &dyn TrackerAdapter,
    proposal: &Proposal,
) -> Result<(), gf_adapters::TrackerError> {
    match proposal {
        Proposal::File { title, body, labels } => {
            tracker.create(title, body, labels).await.map(|_| ())
        }
        Proposal::Comment { id, body } => {
            tracker.comment(&id.as_str().into(), "gaffer-planner", body).await
        }
        Proposal::Update { id, fields } => tracker.update(&id.as_str().into(), fields).await,
    }
}

#[cfg(test)]
#[path = "passes_tests.rs"]
mod tests;
