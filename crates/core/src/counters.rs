// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Persistent engine counters.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Counters {
    #[serde(default)]
    pub total_iterations: u64,
    #[serde(default)]
    pub successful_completions: u64,
    #[serde(default)]
    pub failed_attempts: u64,
    /// Next planner/quality batch id.
    #[serde(default)]
    pub next_batch_id: u64,
}

impl Counters {
    /// Merge a checkpoint into live counters, keeping the larger value per
    /// field so replaying a checkpoint twice is a no-op.
    pub fn merge_checkpoint(&mut self, other: &Counters) {
        self.total_iterations = self.total_iterations.max(other.total_iterations);
        self.successful_completions =
            self.successful_completions.max(other.successful_completions);
        self.failed_attempts = self.failed_attempts.max(other.failed_attempts);
        self.next_batch_id = self.next_batch_id.max(other.next_batch_id);
    }
}
