// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn success_wraps_payload_under_ok_data() {
    let json = serde_json::to_value(Response::noted("already_paused")).unwrap();
    assert_eq!(json["ok"], true);
    assert_eq!(json["data"]["result"], "ack");
    assert_eq!(json["data"]["note"], "already_paused");
    assert!(json.get("error").is_none());

    let plain = serde_json::to_value(Response::ok()).unwrap();
    assert!(plain["data"].get("note").is_none());
}

#[test]
fn errors_use_the_flat_failure_envelope() {
    let response = Response::error(error_kind::NOT_FOUND, "issue X-404 not found");
    assert!(response.is_error());

    let json = serde_json::to_value(&response).unwrap();
    assert_eq!(json["ok"], false);
    assert_eq!(json["error"], "not_found");
    assert_eq!(json["message"], "issue X-404 not found");
    assert!(json.get("data").is_none());
}

#[test]
fn responses_round_trip() {
    for response in [
        Response::Pong,
        Response::ok(),
        Response::noted("not_paused"),
        Response::Filed { id: "T-3".into() },
        Response::error(error_kind::TRACKER, "bd create failed"),
    ] {
        let json = serde_json::to_string(&response).unwrap();
        let back: Response = serde_json::from_str(&json).unwrap();
        assert_eq!(back, response);
    }
}

#[test]
fn missing_data_on_ok_is_rejected() {
    assert!(serde_json::from_str::<Response>(r#"{"ok":true}"#).is_err());
}

#[test]
fn error_without_kind_defaults_to_engine() {
    let back: Response = serde_json::from_str(r#"{"ok":false,"message":"boom"}"#).unwrap();
    assert_eq!(back, Response::Error { kind: "engine".into(), message: "boom".into() });
}
