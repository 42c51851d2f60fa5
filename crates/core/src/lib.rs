// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! gf-core: domain model for the Gaffer orchestration engine

pub mod macros;

pub mod clock;
pub mod config;
pub mod counters;
pub mod event;
pub mod id;
pub mod issue;
pub mod record;
pub mod signal;
pub mod slot;
pub mod transcript;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use clock::{Clock, FakeClock, SystemClock};
pub use config::{
    AgentsConfig, Config, ConfigError, DaemonConfig, PassesConfig, ProjectConfig, RetryConfig,
    TrackerConfig, VcsConfig,
};
pub use counters::Counters;
pub use event::{Event, PassKind};
pub use id::{short, CommandId};
pub use issue::{Issue, IssueFields, IssueId, TrackerStatus};
pub use record::{Attempt, IssueRecord, ModelTier, Outcome, Phase};
pub use signal::{AgentSignal, SignalParser};
pub use slot::{SlotId, SlotState, WorkerSlot, MAIN_MERGE_LOCK};
pub use transcript::{SessionId, TranscriptEvent, TranscriptEventKind};
