// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Agent stream signal grammar.
//!
//! Agents are opaque subprocesses; the engine recognizes a small set of
//! plain-text signals anywhere in their stdout stream. Unknown lines are
//! never an error (forward compatibility with agent updates).

use serde::{Deserialize, Serialize};

/// A recognized signal emitted by an agent subprocess.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "signal", rename_all = "snake_case")]
pub enum AgentSignal {
    /// Implementer finished its work and wants review.
    ReadyForReview,
    /// Reviewer verdict: accept.
    Approved,
    /// Reviewer verdict: rework, with multiline feedback.
    ChangesRequested { feedback: String },
    /// Request for context expansion: a file outside the manifest.
    NeedFile { path: String },
    /// Request for context expansion: a documentation slug.
    NeedDoc { slug: String },
}

impl AgentSignal {
    pub fn name(&self) -> &'static str {
        match self {
            AgentSignal::ReadyForReview => "READY_FOR_REVIEW",
            AgentSignal::Approved => "APPROVED",
            AgentSignal::ChangesRequested { .. } => "CHANGES_REQUESTED",
            AgentSignal::NeedFile { .. } => "NEED_FILE",
            AgentSignal::NeedDoc { .. } => "NEED_DOC",
        }
    }
}

/// Stateful line parser for agent signals.
///
/// `CHANGES_REQUESTED:` opens a multiline feedback block that runs to the
/// end of the stream; everything after it is feedback, and the signal is
/// delivered by [`SignalParser::finish`]. All other signals resolve on
/// their own line.
#[derive(Debug, Default)]
pub struct SignalParser {
    feedback: Option<Vec<String>>,
}

impl SignalParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one stdout line. Returns a signal when the line resolves to one.
    pub fn feed(&mut self, line: &str) -> Option<AgentSignal> {
        if let Some(ref mut lines) = self.feedback {
            lines.push(line.to_string());
            return None;
        }

        let trimmed = line.trim();
        if trimmed == "READY_FOR_REVIEW" {
            return Some(AgentSignal::ReadyForReview);
        }
        if trimmed == "APPROVED" {
            return Some(AgentSignal::Approved);
        }
        if let Some(rest) = trimmed.strip_prefix("CHANGES_REQUESTED:") {
            let first = rest.trim();
            let mut lines = Vec::new();
            if !first.is_empty() {
                lines.push(first.to_string());
            }
            self.feedback = Some(lines);
            return None;
        }
        if let Some(path) = trimmed.strip_prefix("NEED_FILE:") {
            let path = path.trim();
            if !path.is_empty() {
                return Some(AgentSignal::NeedFile { path: path.to_string() });
            }
        }
        if let Some(slug) = trimmed.strip_prefix("NEED_DOC:") {
            let slug = slug.trim();
            if !slug.is_empty() {
                return Some(AgentSignal::NeedDoc { slug: slug.to_string() });
            }
        }
        None
    }

    /// Flush a pending multiline signal at end of stream.
    pub fn finish(&mut self) -> Option<AgentSignal> {
        self.feedback.take().map(|lines| AgentSignal::ChangesRequested {
            feedback: lines.join("\n").trim_end().to_string(),
        })
    }
}

#[cfg(test)]
#[path = "signal_tests.rs"]
mod tests;
