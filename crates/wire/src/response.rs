// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Control responses.
//!
//! Wire shape: `{ok: true, data: {...}}` on success,
//! `{ok: false, error: <kind>, message: <text>}` on failure.

use crate::status::{IssueDetail, IssueSummary, StatusSnapshot};
use serde::{Deserialize, Serialize};

/// Machine-readable error kinds for control responses.
pub mod error_kind {
    pub const INVALID_REQUEST: &str = "invalid_request";
    pub const NOT_FOUND: &str = "not_found";
    pub const TRACKER: &str = "tracker";
    pub const ENGINE: &str = "engine";
    pub const HALTED: &str = "halted";
}

/// Response from the engine to a control CLI.
#[derive(Debug, Clone, PartialEq)]
pub enum Response {
    Pong,

    /// Command accepted. `note` flags idempotent no-ops
    /// (`already_paused`, `not_paused`).
    Ack { note: Option<String> },

    Status { status: StatusSnapshot },

    /// New issue id from `file`.
    Filed { id: String },

    Issue { issue: IssueDetail },

    Issues { issues: Vec<IssueSummary> },

    Error { kind: String, message: String },
}

impl Response {
    pub fn ok() -> Self {
        Response::Ack { note: None }
    }

    pub fn noted(note: impl Into<String>) -> Self {
        Response::Ack { note: Some(note.into()) }
    }

    pub fn error(kind: &str, message: impl Into<String>) -> Self {
        Response::Error { kind: kind.to_string(), message: message.into() }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Response::Error { .. })
    }
}

/// The `data` payload of a successful response.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "snake_case")]
enum Payload {
    Pong,
    Ack {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        note: Option<String>,
    },
    Status {
        status: StatusSnapshot,
    },
    Filed {
        id: String,
    },
    Issue {
        issue: IssueDetail,
    },
    Issues {
        issues: Vec<IssueSummary>,
    },
}

/// Flat wire envelope.
#[derive(Serialize, Deserialize)]
struct Envelope {
    ok: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    data: Option<Payload>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    message: Option<String>,
}

impl Serialize for Response {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let envelope = match self {
            Response::Error { kind, message } => Envelope {
                ok: false,
                data: None,
                error: Some(kind.clone()),
                message: Some(message.clone()),
            },
            success => Envelope {
                ok: true,
                data: Some(match success {
                    Response::Pong => Payload::Pong,
                    Response::Ack { note } => Payload::Ack { note: note.clone() },
                    Response::Status { status } => Payload::Status { status: status.clone() },
                    Response::Filed { id } => Payload::Filed { id: id.clone() },
                    Response::Issue { issue } => Payload::Issue { issue: issue.clone() },
                    Response::Issues { issues } => Payload::Issues { issues: issues.clone() },
                    Response::Error { .. } => unreachable!("handled above"),
                }),
                error: None,
                message: None,
            },
        };
        envelope.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Response {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let envelope = Envelope::deserialize(deserializer)?;
        if !envelope.ok {
            return Ok(Response::Error {
                kind: envelope.error.unwrap_or_else(|| "engine".to_string()),
                message: envelope.message.unwrap_or_default(),
            });
        }
        let payload = envelope
            .data
            .ok_or_else(|| serde::de::Error::missing_field("data"))?;
        Ok(match payload {
            Payload::Pong => Response::Pong,
            Payload::Ack { note } => Response::Ack { note },
            Payload::Status { status } => Response::Status { status },
            Payload::Filed { id } => Response::Filed { id },
            Payload::Issue { issue } => Response::Issue { issue },
            Payload::Issues { issues } => Response::Issues { issues },
        })
    }
}

#[cfg(test)]
#[path = "response_tests.rs"]
mod tests;
