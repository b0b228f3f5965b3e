// ── Reconnect backoff ──

use std::time::Duration;

/// Delay before the first retry after a channel drops.
pub const BACKOFF_FLOOR: Duration = Duration::from_secs(1);
/// Upper bound on any retry delay.
pub const BACKOFF_CEILING: Duration = Duration::from_secs(30);

/// Capped exponential backoff with unlimited attempts.
///
/// With `k` failures recorded since the last successful open, the next
/// failure waits `min(floor * 2^k, ceiling)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Backoff {
    attempt: u32,
    next_delay: Duration,
}

impl Backoff {
    pub const fn new() -> Self {
        Self {
            attempt: 0,
            next_delay: BACKOFF_FLOOR,
        }
    }

    /// Delay armed after `failures` prior consecutive failures.
    pub fn delay_for(failures: u32) -> Duration {
        // 2^5 already exceeds the 30x ceiling; clamp the shift to avoid overflow.
        let factor = 1u32 << failures.min(16);
        BACKOFF_FLOOR.saturating_mul(factor).min(BACKOFF_CEILING)
    }

    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    pub fn next_delay(&self) -> Duration {
        self.next_delay
    }

    /// Record a failure and return how long to wait before retrying.
    pub fn fail(&mut self) -> Duration {
        let delay = self.next_delay;
        self.attempt = self.attempt.saturating_add(1);
        self.next_delay = Self::delay_for(self.attempt);
        delay
    }

    /// The channel opened; start over from the floor.
    pub fn reset(&mut self) {
        *self = Self::new();
    }
}

impl Default for Backoff {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn doubles_from_floor_to_ceiling() {
        let mut backoff = Backoff::new();
        let delays: Vec<u64> = (0..8).map(|_| backoff.fail().as_secs()).collect();
        assert_eq!(delays, vec![1, 2, 4, 8, 16, 30, 30, 30]);
        assert_eq!(backoff.attempt(), 8);
    }

    #[test]
    fn delay_is_bounded_for_any_attempt_count() {
        for k in [0, 1, 4, 5, 31, 32, 1_000, u32::MAX] {
            let d = Backoff::delay_for(k);
            assert!(d >= BACKOFF_FLOOR && d <= BACKOFF_CEILING, "k={k} d={d:?}");
        }
        let mut backoff = Backoff::new();
        for _ in 0..10_000 {
            assert!(backoff.fail() <= BACKOFF_CEILING);
        }
    }

    #[test]
    fn reset_returns_to_floor() {
        let mut backoff = Backoff::new();
        backoff.fail();
        backoff.fail();
        backoff.reset();
        assert_eq!(backoff.attempt(), 0);
        assert_eq!(backoff.fail(), BACKOFF_FLOOR);
    }
}
