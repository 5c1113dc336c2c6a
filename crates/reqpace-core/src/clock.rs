//! Millisecond wall clock that never runs backwards.
//!
//! Interval entries store unix-epoch milliseconds so they can be persisted and
//! compared after a restart. Within a process the clock is anchored once and
//! advanced by tokio's monotonic `Instant`, so a wall-clock adjustment cannot
//! make a completion timestamp go backwards (and paused tokio time in tests
//! moves it deterministically).

use std::time::{SystemTime, UNIX_EPOCH};

use tokio::time::Instant;

#[derive(Debug, Clone, Copy)]
pub struct Clock {
    wall_anchor_ms: u64,
    mono_anchor: Instant,
}

impl Clock {
    /// Anchor a new clock at the current wall-clock time.
    pub fn new() -> Self {
        let wall_anchor_ms = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0);
        Self {
            wall_anchor_ms,
            mono_anchor: Instant::now(),
        }
    }

    /// Current time in unix-epoch milliseconds.
    pub fn now_ms(&self) -> u64 {
        let elapsed = Instant::now().saturating_duration_since(self.mono_anchor);
        self.wall_anchor_ms
            .saturating_add(elapsed.as_millis() as u64)
    }
}

impl Default for Clock {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test(start_paused = true)]
    async fn follows_tokio_time() {
        let clock = Clock::new();
        let t0 = clock.now_ms();
        tokio::time::advance(Duration::from_millis(1500)).await;
        assert_eq!(clock.now_ms(), t0 + 1500);
    }

    #[test]
    fn anchored_near_wall_clock() {
        let clock = Clock::new();
        let wall = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_millis() as u64;
        assert!(clock.now_ms().abs_diff(wall) < 5_000);
    }
}
