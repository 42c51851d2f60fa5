// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Control verbs: talk to a running engine over its socket.

use super::load_config;
use crate::exit_error::ExitError;
use crate::output;
use crate::{client, Command};
use gf_core::{IssueFields, TrackerStatus};
use gf_wire::{Request, Response};
use std::path::Path;

fn parse_status(s: &str) -> Result<TrackerStatus, ExitError> {
    match s {
        "open" => Ok(TrackerStatus::Open),
        "in_progress" => Ok(TrackerStatus::InProgress),
        "closed" => Ok(TrackerStatus::Closed),
        other => Err(ExitError::invalid(format!(
            "unknown status {other:?} (expected open, in_progress, or closed)"
        ))),
    }
}

/// Build the wire request for a control verb.
fn to_request(command: Command) -> Result<Request, ExitError> {
    Ok(match command {
        Command::Status => Request::Status,
        Command::Pause => Request::Pause,
        Command::Resume => Request::Resume,
        Command::Interrupt => Request::Interrupt,
        Command::File { title, description, priority, labels } => {
            Request::File { title, description, priority, labels }
        }
        Command::Comment { id, body, author } => Request::Comment { id, author, body },
        Command::Update { id, title, description, acceptance, priority, status } => {
            let status = status.as_deref().map(parse_status).transpose()?;
            Request::Update {
                id,
                fields: IssueFields {
                    title,
                    description,
                    acceptance_criteria: acceptance,
                    priority,
                    status,
                },
            }
        }
        Command::Inspect { id } => Request::Inspect { id },
        Command::List { phase, limit } => Request::List { phase, limit },
        // Non-control commands never reach here.
        other => {
            return Err(ExitError::invalid(format!("not a control command: {other:?}")))
        }
    })
}

pub(crate) async fn run(config_path: &Path, command: Command) -> Result<(), ExitError> {
    let config = load_config(config_path)?;
    let request = to_request(command)?;

    let response = client::send(&config.socket_path(), &request).await?;
    let response = client::check(response)?;
    render(&response);
    Ok(())
}

fn render(response: &Response) {
    match response {
        Response::Pong => println!("pong"),
        Response::Ack { note: Some(note) } => println!("ok ({note})"),
        Response::Ack { note: None } => println!("ok"),
        Response::Filed { id } => println!("{id}"),
        Response::Status { status } => output::print_status(status),
        Response::Issue { issue } => output::print_issue(issue),
        Response::Issues { issues } => output::print_issues(issues),
        Response::Error { kind, message } => println!("error ({kind}): {message}"),
    }
}
