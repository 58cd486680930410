//! Stamps for formatting spans.
//!
//! Two spans may set the same attribute over overlapping text. Each span
//! carries the stamp its author's clock produced, and stamps order totally,
//! so every replica agrees on which write came last. Picking the winner stays
//! with the caller; [`crate::Text::spans_at`] only sorts.

use crate::ReplicaId;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// One replica's span clock, and the stamp it hands out.
///
/// Stamps compare by counter, then by replica id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogicalClock {
    pub replica: ReplicaId,
    pub counter: u64,
}

impl LogicalClock {
    /// A clock for `replica` that has not stamped anything yet.
    pub fn new(replica: ReplicaId) -> Self {
        Self::with_counter(replica, 0)
    }

    pub fn with_counter(replica: ReplicaId, counter: u64) -> Self {
        Self { replica, counter }
    }

    /// Advance and return the new stamp.
    pub fn tick(&mut self) -> LogicalClock {
        self.counter += 1;
        self.clone()
    }

    /// Catch up with a stamp seen from another replica, so the next local
    /// stamp orders after it.
    pub fn merge(&mut self, seen: &LogicalClock) {
        self.counter = self.counter.max(seen.counter);
    }
}

impl Ord for LogicalClock {
    fn cmp(&self, other: &Self) -> Ordering {
        self.counter
            .cmp(&other.counter)
            .then_with(|| self.replica.cmp(&other.replica))
    }
}

impl PartialOrd for LogicalClock {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
