// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Socket client for the control protocol.

use crate::exit_error::ExitError;
use gf_wire::{error_kind, read_message, write_message, Request, Response};
use std::path::Path;
use std::time::Duration;
use tokio::net::UnixStream;

const TIMEOUT: Duration = Duration::from_secs(30);

/// Send one request to a running engine and return its response.
pub async fn send(socket: &Path, request: &Request) -> Result<Response, ExitError> {
    let stream = UnixStream::connect(socket).await.map_err(|_| {
        ExitError::not_running(format!(
            "engine not running (no socket at {})",
            socket.display()
        ))
    })?;
    let (mut reader, mut writer) = stream.into_split();

    write_message(&mut writer, request, TIMEOUT)
        .await
        .map_err(|e| ExitError::engine(format!("request failed: {e}")))?;
    read_message(&mut reader, TIMEOUT)
        .await
        .map_err(|e| ExitError::engine(format!("response failed: {e}")))
}

/// Map an error response onto the CLI exit-code contract.
pub fn check(response: Response) -> Result<Response, ExitError> {
    match response {
        Response::Error { ref kind, ref message } => {
            if kind == error_kind::INVALID_REQUEST || kind == error_kind::NOT_FOUND {
                Err(ExitError::invalid(message.clone()))
            } else {
                Err(ExitError::engine(format!("{kind}: {message}")))
            }
        }
        other => Ok(other),
    }
}
