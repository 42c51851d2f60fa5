// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-process pub/sub for dashboard consumers.
//!
//! Topic-based fanout over `tokio::sync::broadcast`: best-effort delivery,
//! bounded backlog, slow subscribers observe `Lagged` and are dropped by
//! their own read loop. Not a durable queue. Session events additionally
//! keep a short in-memory tail so late subscribers see recent context.

use gf_core::{SessionId, TranscriptEvent};
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use tokio::sync::broadcast;

/// Per-topic backlog before a slow subscriber starts losing messages.
pub const BUS_CAPACITY: usize = 256;

/// In-memory tail kept per session for late subscribers.
pub const SESSION_TAIL: usize = 100;

/// One fanout message: `{type, data, ts}` on the wire.
#[derive(Debug, Clone, serde::Serialize)]
pub struct BusMessage {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub data: serde_json::Value,
    pub ts: u64,
}

pub struct EventBus {
    issues: broadcast::Sender<BusMessage>,
    state: broadcast::Sender<BusMessage>,
    workers: broadcast::Sender<BusMessage>,
    /// All session events on one topic; payload carries the session id.
    sessions: broadcast::Sender<BusMessage>,
    tails: Mutex<HashMap<SessionId, VecDeque<TranscriptEvent>>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self {
            issues: broadcast::channel(BUS_CAPACITY).0,
            state: broadcast::channel(BUS_CAPACITY).0,
            workers: broadcast::channel(BUS_CAPACITY).0,
            sessions: broadcast::channel(BUS_CAPACITY).0,
            tails: Mutex::new(HashMap::new()),
        }
    }

    pub fn publish_issue(&self, data: serde_json::Value, ts: u64) {
        let _ = self.issues.send(BusMessage { kind: "issues", data, ts });
    }

    pub fn publish_state(&self, data: serde_json::Value, ts: u64) {
        let _ = self.state.send(BusMessage { kind: "state", data, ts });
    }

    pub fn publish_worker(&self, data: serde_json::Value, ts: u64) {
        let _ = self.workers.send(BusMessage { kind: "worker", data, ts });
    }

    /// Publish a transcript event and remember it in the session tail.
    pub fn publish_session(&self, session: &SessionId, event: &TranscriptEvent) {
        {
            let mut tails = self.tails.lock();
            let tail = tails.entry(session.clone()).or_default();
            tail.push_back(event.clone());
            while tail.len() > SESSION_TAIL {
                tail.pop_front();
            }
        }
        let data = serde_json::json!({
            "session": session.as_str(),
            "event": event,
        });
        let _ = self.sessions.send(BusMessage { kind: "session", data, ts: event.ts_ms });
    }

    /// Recent events of a session (last [`SESSION_TAIL`]).
    pub fn session_tail(&self, session: &SessionId) -> Vec<TranscriptEvent> {
        self.tails
            .lock()
            .get(session)
            .map(|tail| tail.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Drop a finished session's tail.
    pub fn forget_session(&self, session: &SessionId) {
        self.tails.lock().remove(session);
    }

    pub fn subscribe_issues(&self) -> broadcast::Receiver<BusMessage> {
        self.issues.subscribe()
    }

    pub fn subscribe_state(&self) -> broadcast::Receiver<BusMessage> {
        self.state.subscribe()
    }

    pub fn subscribe_workers(&self) -> broadcast::Receiver<BusMessage> {
        self.workers.subscribe()
    }

    pub fn subscribe_sessions(&self) -> broadcast::Receiver<BusMessage> {
        self.sessions.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[path = "bus_tests.rs"]
mod tests;
