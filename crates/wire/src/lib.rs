// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! IPC protocol for control-plane communication.
//!
//! Wire format: 4-byte length prefix (big-endian) + JSON payload

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod request;
mod response;
mod status;
mod wire;

pub use request::Request;
pub use response::{error_kind, Response};
pub use status::{AttemptDetail, IssueDetail, IssueSummary, SlotEntry, StatusSnapshot};
pub use wire::{decode, encode, read_message, write_message, ProtocolError, MAX_FRAME_BYTES};

#[cfg(test)]
mod property_tests;
