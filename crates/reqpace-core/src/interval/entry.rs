//! Throttle state for a single identity.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Required spacing and last completion time for one identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntervalEntry {
    /// Minimum milliseconds between two completions of this identity.
    pub interval_ms: u64,
    /// Unix-epoch milliseconds of the last completion, if any is known.
    #[serde(default)]
    pub last_completed_ms: Option<u64>,
}

impl IntervalEntry {
    /// Entry with no completion recorded yet.
    pub fn new(interval_ms: u64) -> Self {
        Self {
            interval_ms,
            last_completed_ms: None,
        }
    }

    /// Entry carrying a known last completion time (e.g. restored from disk).
    pub fn with_last_completed(interval_ms: u64, last_completed_ms: u64) -> Self {
        Self {
            interval_ms,
            last_completed_ms: Some(last_completed_ms),
        }
    }

    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    /// Milliseconds still to wait at `now_ms`, or `None` when eligible.
    ///
    /// A timestamp ahead of `now_ms` (written by a host whose clock ran ahead)
    /// is treated as "just completed".
    pub fn remaining_ms(&self, now_ms: u64) -> Option<u64> {
        let last = self.last_completed_ms?.min(now_ms);
        let elapsed = now_ms - last;
        if elapsed < self.interval_ms {
            Some(self.interval_ms - elapsed)
        } else {
            None
        }
    }
}
