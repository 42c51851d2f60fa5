// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn session_id_round_trips_parts() {
    let id = SessionId::new(&IssueId::from("X-12"), 3);
    assert_eq!(id.as_str(), "X-12/3");
    assert_eq!(id.parts(), Some((IssueId::from("X-12"), 3)));
}

#[test]
fn malformed_session_id_has_no_parts() {
    assert_eq!(SessionId::from("no-slash").parts(), None);
    assert_eq!(SessionId::from("x/notanumber").parts(), None);
}

#[test]
fn classify_tool_use_line() {
    let event = TranscriptEvent::classify_line(1, 10, r#"{"type":"tool_use","name":"edit"}"#);
    assert_eq!(event.kind, TranscriptEventKind::ToolUse);
    assert_eq!(event.payload["name"], "edit");
}

#[test]
fn classify_assistant_message_line() {
    let event = TranscriptEvent::classify_line(1, 10, r#"{"type":"assistant_message","text":"hi"}"#);
    assert_eq!(event.kind, TranscriptEventKind::AssistantMessage);
}

#[test]
fn classify_plain_text_line() {
    let event = TranscriptEvent::classify_line(2, 10, "compiling...");
    assert_eq!(event.kind, TranscriptEventKind::StdoutText);
    assert_eq!(event.payload, serde_json::Value::String("compiling...".to_string()));
}

#[test]
fn classify_json_without_known_type_is_text() {
    let event = TranscriptEvent::classify_line(3, 10, r#"{"level":"info"}"#);
    assert_eq!(event.kind, TranscriptEventKind::StdoutText);
}
