// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use gf_core::IssueFields;
use serde::{Deserialize, Serialize};

/// Request from a control CLI to the engine.
///
/// Wire shape: `{op: "...", args: {...}}`; ops without arguments omit
/// `args` entirely.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "op", content = "args", rename_all = "snake_case")]
pub enum Request {
    /// Health check ping
    Ping,

    /// Status snapshot: loop flags, per-slot summary, issue counts by phase.
    /// Answered within 500 ms (degraded if the scheduler is wedged).
    Status,

    /// Suspend dispatch after in-flight work settles.
    Pause,

    /// Clear the pause flag.
    Resume,

    /// Cancel all busy slots immediately.
    Interrupt,

    /// File a new issue through the tracker.
    File {
        title: String,
        #[serde(default)]
        description: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        priority: Option<u32>,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        labels: Vec<String>,
    },

    /// Comment on an issue: tracker first, then local mirror.
    Comment { id: String, author: String, body: String },

    /// Partial field update; empty string clears a field.
    Update { id: String, fields: IssueFields },

    /// Full engine record for one issue.
    Inspect { id: String },

    /// Issue projections, optionally filtered by phase.
    List {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        phase: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        limit: Option<usize>,
    },

    /// Graceful engine shutdown: pause, drain, persist, exit.
    Shutdown,
}

impl Request {
    /// Operation name for the audit history.
    pub fn op_name(&self) -> &'static str {
        match self {
            Request::Ping => "ping",
            Request::Status => "status",
            Request::Pause => "pause",
            Request::Resume => "resume",
            Request::Interrupt => "interrupt",
            Request::File { .. } => "file",
            Request::Comment { .. } => "comment",
            Request::Update { .. } => "update",
            Request::Inspect { .. } => "inspect",
            Request::List { .. } => "list",
            Request::Shutdown => "shutdown",
        }
    }

    /// Whether the command mutates engine or tracker state (and therefore
    /// lands in the audit history).
    pub fn is_mutation(&self) -> bool {
        matches!(
            self,
            Request::Pause
                | Request::Resume
                | Request::Interrupt
                | Request::File { .. }
                | Request::Comment { .. }
                | Request::Update { .. }
                | Request::Shutdown
        )
    }
}

#[cfg(test)]
#[path = "request_tests.rs"]
mod tests;
