// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Control socket listener.
//!
//! Accepts connections on a Unix socket and handles each in a spawned
//! task without blocking the engine loop. One request, one response per
//! connection; the CLI reconnects per command.

use gf_engine::EngineHandle;
use gf_wire::{error_kind, read_message, write_message, Request, Response};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::net::{UnixListener, UnixStream};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Per-request socket timeout.
const IPC_TIMEOUT: Duration = Duration::from_secs(10);

/// Status must answer quickly even when the scheduler is wedged.
const STATUS_TIMEOUT: Duration = Duration::from_millis(500);

/// Bind and serve until cancelled. The socket file is removed on exit.
pub async fn serve(
    socket_path: PathBuf,
    handle: EngineHandle,
    shutdown: CancellationToken,
) -> std::io::Result<()> {
    if socket_path.exists() {
        // A previous run died without cleanup; the store lock guarantees
        // no live engine owns it.
        let _ = std::fs::remove_file(&socket_path);
    }
    let listener = UnixListener::bind(&socket_path)?;
    info!(socket = %socket_path.display(), "control socket listening");

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            accepted = listener.accept() => match accepted {
                Ok((stream, _)) => {
                    let handle = handle.clone();
                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(stream, handle).await {
                            debug!(error = %e, "control connection ended");
                        }
                    });
                }
                Err(e) => error!(error = %e, "control accept failed"),
            },
        }
    }

    let _ = std::fs::remove_file(&socket_path);
    Ok(())
}

async fn handle_connection(
    stream: UnixStream,
    handle: EngineHandle,
) -> Result<(), gf_wire::ProtocolError> {
    let (mut reader, mut writer) = stream.into_split();
    let request: Request = read_message(&mut reader, IPC_TIMEOUT).await?;
    debug!(op = request.op_name(), "control request");

    let response = dispatch(request, &handle).await;
    write_message(&mut writer, &response, IPC_TIMEOUT).await
}

/// Route a request to the loop, with the status fast path.
pub async fn dispatch(request: Request, handle: &EngineHandle) -> Response {
    match request {
        // Answered here: liveness must not depend on the loop.
        Request::Ping => Response::Pong,

        // Status is non-blocking: give the loop a short window, then fall
        // back to the last published snapshot marked degraded.
        Request::Status => {
            match tokio::time::timeout(STATUS_TIMEOUT, handle.submit(Request::Status)).await {
                Ok(Some(response)) => response,
                Ok(None) | Err(_) => {
                    warn!("scheduler did not answer status in time; serving degraded snapshot");
                    let mut status = handle.latest_status();
                    status.degraded = true;
                    Response::Status { status }
                }
            }
        }

        other => match handle.submit(other).await {
            Some(response) => response,
            None => Response::error(error_kind::ENGINE, "engine loop unavailable"),
        },
    }
}

/// Best-effort check whether an engine is listening on `socket_path`.
pub async fn ping(socket_path: &Path) -> bool {
    let Ok(stream) = UnixStream::connect(socket_path).await else { return false };
    let (mut reader, mut writer) = stream.into_split();
    if write_message(&mut writer, &Request::Ping, IPC_TIMEOUT).await.is_err() {
        return false;
    }
    matches!(read_message::<Response, _>(&mut reader, IPC_TIMEOUT).await, Ok(Response::Pong))
}

#[cfg(test)]
#[path = "server_tests.rs"]
mod tests;
