// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Transcript session types.
//!
//! A session is one attempt's durable event log, keyed `<issue>/<seq>`.

use crate::issue::IssueId;
use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;

/// Transcript session id: `<issue_id>/<attempt_seq>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(pub String);

impl SessionId {
    pub fn new(issue: &IssueId, attempt_seq: u32) -> Self {
        Self(format!("{}/{}", issue, attempt_seq))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Split back into `(issue_id, attempt_seq)`; `None` if malformed.
    pub fn parts(&self) -> Option<(IssueId, u32)> {
        let (issue, seq) = self.0.rsplit_once('/')?;
        let seq = seq.parse().ok()?;
        Some((IssueId::from(issue), seq))
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for SessionId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl Borrow<str> for SessionId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// Kind of a transcript event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TranscriptEventKind {
    StdoutText,
    ToolUse,
    AssistantMessage,
    Exit,
}

crate::simple_display! {
    TranscriptEventKind {
        StdoutText => "stdout_text",
        ToolUse => "tool_use",
        AssistantMessage => "assistant_message",
        Exit => "exit",
    }
}

/// One event in a transcript session. Append-only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptEvent {
    pub seq: u64,
    pub ts_ms: u64,
    pub kind: TranscriptEventKind,
    pub payload: serde_json::Value,
}

impl TranscriptEvent {
    /// Classify a raw agent stdout line.
    ///
    /// Lines that parse as a JSON object with a `type` tag keep their
    /// structure (`tool_use` / `assistant_message`); anything else is
    /// plain stdout text.
    pub fn classify_line(seq: u64, ts_ms: u64, line: &str) -> Self {
        if let Ok(serde_json::Value::Object(obj)) = serde_json::from_str(line) {
            let kind = match obj.get("type").and_then(|v| v.as_str()) {
                Some("tool_use") => Some(TranscriptEventKind::ToolUse),
                Some("assistant_message") | Some("message") => {
                    Some(TranscriptEventKind::AssistantMessage)
                }
                _ => None,
            };
            if let Some(kind) = kind {
                return Self { seq, ts_ms, kind, payload: serde_json::Value::Object(obj) };
            }
        }
        Self {
            seq,
            ts_ms,
            kind: TranscriptEventKind::StdoutText,
            payload: serde_json::Value::String(line.to_string()),
        }
    }
}

#[cfg(test)]
#[path = "transcript_tests.rs"]
mod tests;
