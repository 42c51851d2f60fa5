// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Read-only dashboard gateway: HTTP snapshots plus a WebSocket stream.

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path as AxumPath, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use gf_core::{IssueId, SessionId};
use gf_engine::{BusMessage, EngineHandle, EventBus};
use gf_storage::{StateReader, TranscriptStore};
use gf_wire::{IssueSummary, Request, Response, SlotEntry, StatusSnapshot};
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

#[derive(Clone)]
pub struct DashboardState {
    pub reader: StateReader,
    /// Absent in `serve`-only mode (no engine process).
    pub handle: Option<EngineHandle>,
    pub bus: Arc<EventBus>,
    pub transcripts: TranscriptStore,
}

pub fn router(state: DashboardState) -> Router {
    Router::new()
        .route("/api/status", get(get_status))
        .route("/api/issues", get(get_issues))
        .route("/api/workers", get(get_workers))
        .route("/api/sessions/:issue_id", get(get_sessions))
        .route("/ws", get(ws_upgrade))
        .with_state(state)
}

/// Serve until cancelled.
pub async fn serve(
    port: u16,
    state: DashboardState,
    shutdown: CancellationToken,
) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(("127.0.0.1", port)).await?;
    info!(port = listener.local_addr()?.port(), "dashboard listening");
    axum::serve(listener, router(state))
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await
}

async fn get_status(State(state): State<DashboardState>) -> Json<StatusSnapshot> {
    Json(current_status(&state).await)
}

async fn current_status(state: &DashboardState) -> StatusSnapshot {
    if let Some(ref handle) = state.handle {
        if let Some(Response::Status { status }) =
            tokio::time::timeout(std::time::Duration::from_millis(500), handle.submit(Request::Status))
                .await
                .ok()
                .flatten()
        {
            return status;
        }
        let mut status = handle.latest_status();
        status.degraded = true;
        return status;
    }
    // Engine-less mode: project straight from the store.
    state.reader.with(|s| StatusSnapshot {
        uptime_ms: 0,
        paused: s.paused,
        halted: s.halted.clone(),
        iteration: s.counters.total_iterations,
        state_version: state.reader.version(),
        degraded: true,
        slots: s.slots.values().map(SlotEntry::from).collect(),
        phases: s.phase_counts(),
        counters: s.counters,
    })
}

async fn get_issues(State(state): State<DashboardState>) -> Json<Vec<IssueSummary>> {
    let mut issues: Vec<IssueSummary> =
        state.reader.with(|s| s.issues.values().map(IssueSummary::from).collect());
    issues.sort_by(|a, b| (a.priority, &a.id).cmp(&(b.priority, &b.id)));
    Json(issues)
}

async fn get_workers(State(state): State<DashboardState>) -> Json<Vec<SlotEntry>> {
    Json(state.reader.with(|s| s.slots.values().map(SlotEntry::from).collect()))
}

/// Last 100 transcript events of the issue's most recent session.
async fn get_sessions(
    State(state): State<DashboardState>,
    AxumPath(issue_id): AxumPath<String>,
) -> impl IntoResponse {
    let issue = IssueId::from(issue_id.as_str());
    let sessions = state.transcripts.sessions_for_issue(&issue);
    let Some(session) = sessions.last() else {
        return (StatusCode::NOT_FOUND, Json(serde_json::json!({"error": "no sessions"})))
            .into_response();
    };

    let events = match state.transcripts.last(session, 100) {
        Ok(events) if !events.is_empty() => events,
        // Fall back to the in-memory tail for very fresh sessions.
        _ => state.bus.session_tail(session),
    };
    Json(serde_json::json!({
        "session": session.as_str(),
        "sessions": sessions.iter().map(SessionId::as_str).collect::<Vec<_>>(),
        "events": events,
    }))
    .into_response()
}

async fn ws_upgrade(
    State(state): State<DashboardState>,
    upgrade: WebSocketUpgrade,
) -> impl IntoResponse {
    upgrade.on_upgrade(move |socket| ws_stream(socket, state))
}

/// Push an init snapshot, then forward bus deltas until the client (or a
/// lag-induced drop) ends the stream.
async fn ws_stream(mut socket: WebSocket, state: DashboardState) {
    let status = current_status(&state).await;
    let issues: Vec<IssueSummary> =
        state.reader.with(|s| s.issues.values().map(IssueSummary::from).collect());
    let init = serde_json::json!({
        "type": "init",
        "data": { "status": status, "issues": issues },
        "ts": 0,
    });
    if socket.send(Message::Text(init.to_string())).await.is_err() {
        return;
    }

    let mut issues_rx = state.bus.subscribe_issues();
    let mut state_rx = state.bus.subscribe_state();
    let mut workers_rx = state.bus.subscribe_workers();
    let mut sessions_rx = state.bus.subscribe_sessions();

    loop {
        let message = tokio::select! {
            m = issues_rx.recv() => m,
            m = state_rx.recv() => m,
            m = workers_rx.recv() => m,
            m = sessions_rx.recv() => m,
            // The client closed (or sent something; either way we only
            // care about liveness).
            incoming = socket.recv() => {
                match incoming {
                    Some(Ok(_)) => continue,
                    _ => break,
                }
            }
        };
        match message {
            Ok(message) => {
                if !forward(&mut socket, &message).await {
                    break;
                }
            }
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                // Slow subscriber: drop it rather than stall the bus.
                debug!(skipped, "dropping lagged dashboard subscriber");
                break;
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
    let _ = socket.send(Message::Close(None)).await;
}

async fn forward(socket: &mut WebSocket, message: &BusMessage) -> bool {
    match serde_json::to_string(message) {
        Ok(text) => socket.send(Message::Text(text)).await.is_ok(),
        Err(_) => true,
    }
}

#[cfg(test)]
#[path = "dashboard_tests.rs"]
mod tests;
