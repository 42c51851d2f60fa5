// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Projection DTOs for status, inspect, and list responses.

use gf_core::{Counters, IssueRecord, WorkerSlot};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Engine status snapshot (also served at `GET /api/status`).
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct StatusSnapshot {
    pub uptime_ms: u64,
    pub paused: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub halted: Option<String>,
    pub iteration: u64,
    pub state_version: u64,
    /// True when the scheduler did not answer in time and this snapshot
    /// was assembled from the last known state.
    #[serde(default)]
    pub degraded: bool,
    pub slots: Vec<SlotEntry>,
    /// Issue counts by phase name.
    pub phases: BTreeMap<String, usize>,
    pub counters: Counters,
}

/// Slot table projection (also served at `GET /api/workers`).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SlotEntry {
    pub id: u32,
    pub state: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub issue: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at_ms: Option<u64>,
}

impl From<&WorkerSlot> for SlotEntry {
    fn from(slot: &WorkerSlot) -> Self {
        Self {
            id: slot.id.0,
            state: slot.state.to_string(),
            issue: slot.current_issue.as_ref().map(|i| i.as_str().to_string()),
            started_at_ms: slot.started_at_ms,
        }
    }
}

/// One-line issue projection for `list` (also `GET /api/issues`).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IssueSummary {
    pub id: String,
    pub title: String,
    pub phase: String,
    pub priority: u32,
    pub attempts: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assigned_slot: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
}

impl From<&IssueRecord> for IssueSummary {
    fn from(record: &IssueRecord) -> Self {
        Self {
            id: record.issue.id.as_str().to_string(),
            title: record.issue.title.clone(),
            phase: record.phase.to_string(),
            priority: record.issue.priority,
            attempts: record.attempts.len() as u32,
            assigned_slot: record.assigned_slot.map(|s| s.0),
            last_error: record.last_error_kind.map(|k| k.to_string()),
        }
    }
}

/// Per-attempt detail for `inspect`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AttemptDetail {
    pub seq: u32,
    pub tier: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outcome: Option<String>,
    pub started_at_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finished_at_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feedback: Option<String>,
    pub session: String,
}

/// Full engine record projection for `inspect`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IssueDetail {
    #[serde(flatten)]
    pub summary: IssueSummary,
    pub description: String,
    pub acceptance_criteria: String,
    pub status: String,
    pub deps: Vec<String>,
    pub attempts: Vec<AttemptDetail>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workspace: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_retry_at_ms: Option<u64>,
}

impl From<&IssueRecord> for IssueDetail {
    fn from(record: &IssueRecord) -> Self {
        Self {
            summary: IssueSummary::from(record),
            description: record.issue.description.clone(),
            acceptance_criteria: record.issue.acceptance_criteria.clone(),
            status: record.issue.status.to_string(),
            deps: record.issue.deps.iter().map(|d| d.as_str().to_string()).collect(),
            attempts: record
                .attempts
                .iter()
                .map(|a| AttemptDetail {
                    seq: a.seq,
                    tier: a.tier.to_string(),
                    outcome: a.outcome.map(|o| o.to_string()),
                    started_at_ms: a.started_at_ms,
                    finished_at_ms: a.finished_at_ms,
                    feedback: a.feedback.clone(),
                    session: a.session.as_str().to_string(),
                })
                .collect(),
            workspace: record.workspace_path.as_ref().map(|p| p.display().to_string()),
            next_retry_at_ms: record.next_retry_at_ms,
        }
    }
}

#[cfg(test)]
#[path = "status_tests.rs"]
mod tests;
