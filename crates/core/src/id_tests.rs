// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn generate_uses_prefix() {
    let id = CommandId::generate();
    assert!(id.as_str().starts_with("cmd-"));
    assert_eq!(id.suffix().len(), 12);
}

#[test]
fn generated_ids_are_unique() {
    let a = CommandId::generate();
    let b = CommandId::generate();
    assert_ne!(a, b);
}

#[test]
fn suffix_of_unprefixed_id_is_identity() {
    let id = CommandId::from("plain");
    assert_eq!(id.suffix(), "plain");
}

#[test]
fn short_truncates() {
    assert_eq!(short("abcdef", 3), "abc");
    assert_eq!(short("ab", 3), "ab");
    assert_eq!(short("", 3), "");
}

#[test]
fn serde_is_transparent() {
    let id = CommandId::from("cmd-xyz");
    let json = serde_json::to_string(&id).unwrap();
    assert_eq!(json, "\"cmd-xyz\"");
    let back: CommandId = serde_json::from_str(&json).unwrap();
    assert_eq!(back, id);
}
