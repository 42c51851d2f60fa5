// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Channel plumbing between the control server and the loop.

use gf_storage::StateReader;
use gf_wire::{Request, Response, StatusSnapshot};
use tokio::sync::{mpsc, oneshot, watch};
use tokio_util::sync::CancellationToken;

/// One control command awaiting a reply at the loop's next safe point.
#[derive(Debug)]
pub struct ControlMsg {
    pub request: Request,
    pub reply: oneshot::Sender<Response>,
}

/// Handle given to the control server and dashboard.
#[derive(Clone)]
pub struct EngineHandle {
    cmd_tx: mpsc::Sender<ControlMsg>,
    status_rx: watch::Receiver<StatusSnapshot>,
    pub reader: StateReader,
    pub cancel: CancellationToken,
}

impl EngineHandle {
    pub fn new(
        cmd_tx: mpsc::Sender<ControlMsg>,
        status_rx: watch::Receiver<StatusSnapshot>,
        reader: StateReader,
        cancel: CancellationToken,
    ) -> Self {
        Self { cmd_tx, status_rx, reader, cancel }
    }

    /// Submit a request and await the loop's reply.
    ///
    /// `None` means the loop is gone (shutdown race); callers map that to
    /// an engine error.
    pub async fn submit(&self, request: Request) -> Option<Response> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.cmd_tx.send(ControlMsg { request, reply: reply_tx }).await.ok()?;
        reply_rx.await.ok()
    }

    /// Latest status snapshot published by the loop.
    pub fn latest_status(&self) -> StatusSnapshot {
        self.status_rx.borrow().clone()
    }

    /// Wait for the next status publication (bounded by the caller).
    pub async fn status_changed(&mut self) -> bool {
        self.status_rx.changed().await.is_ok()
    }
}
