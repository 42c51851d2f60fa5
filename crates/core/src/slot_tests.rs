// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn workspace_path_is_deterministic() {
    let root = Path::new("/repo");
    assert_eq!(SlotId(0).workspace_path(root), PathBuf::from("/repo/.worker-0"));
    assert_eq!(SlotId(7).workspace_path(root), PathBuf::from("/repo/.worker-7"));
}

#[test]
fn new_slot_starts_idle() {
    let slot = WorkerSlot::new(SlotId(2), Path::new("/repo"));
    assert!(slot.is_idle());
    assert!(slot.current_issue.is_none());
    assert_eq!(slot.workspace_path, PathBuf::from("/repo/.worker-2"));
}

#[test]
fn slot_id_displays_with_prefix() {
    assert_eq!(SlotId(3).to_string(), "slot-3");
}
