use std::time::Duration;

/// Decision returned by the retry controller after a failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Run the whole lifecycle again after the given delay.
    RetryAfter(Duration),
    /// The attempt ceiling was reached; no further attempts.
    Exhausted,
}

/// Attempt counter with a ceiling.
///
/// A ceiling of N permits exactly N attempts in total (the first one
/// included). A ceiling of 0 never exhausts.
#[derive(Debug, Clone, Copy)]
pub struct RetryController {
    attempts: u32,
    ceiling: u32,
}

impl RetryController {
    pub fn new(ceiling: u32) -> Self {
        Self { attempts: 0, ceiling }
    }

    /// Failed attempts so far.
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn ceiling(&self) -> u32 {
        self.ceiling
    }

    /// Attempts left before exhaustion; `None` when unlimited.
    pub fn remaining(&self) -> Option<u32> {
        (self.ceiling != 0).then(|| self.ceiling.saturating_sub(self.attempts))
    }

    /// Record a failed attempt and decide what happens next.
    pub fn on_failure(&mut self, delay: Duration) -> RetryDecision {
        self.attempts = self.attempts.saturating_add(1);
        if self.ceiling != 0 && self.attempts >= self.ceiling {
            RetryDecision::Exhausted
        } else {
            RetryDecision::RetryAfter(delay)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_each_failure() {
        let mut c = RetryController::new(100);
        for _ in 0..7 {
            c.on_failure(Duration::ZERO);
        }
        assert_eq!(c.attempts(), 7);
        assert_eq!(c.remaining(), Some(93));
    }

    #[test]
    fn ceiling_of_three_allows_three_attempts() {
        let mut c = RetryController::new(3);
        let d = Duration::from_millis(10);
        assert_eq!(c.on_failure(d), RetryDecision::RetryAfter(d));
        assert_eq!(c.on_failure(d), RetryDecision::RetryAfter(d));
        assert_eq!(c.on_failure(d), RetryDecision::Exhausted);
        assert_eq!(c.attempts(), 3);
    }

    #[test]
    fn ceiling_of_one_exhausts_on_first_failure() {
        let mut c = RetryController::new(1);
        assert_eq!(c.on_failure(Duration::ZERO), RetryDecision::Exhausted);
    }

    #[test]
    fn zero_ceiling_never_exhausts() {
        let mut c = RetryController::new(0);
        for _ in 0..10_000 {
            assert!(matches!(c.on_failure(Duration::ZERO), RetryDecision::RetryAfter(_)));
        }
        assert_eq!(c.remaining(), None);
    }
}
