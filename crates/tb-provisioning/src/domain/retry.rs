//! Retry policy for transient provisioning failures.

use std::time::Duration;

/// Capped exponential backoff with an attempt ceiling.
#[derive(Clone, Copy, Debug)]
pub struct RetryPolicy {
    /// First retry delay.
    pub base: Duration,
    /// Upper bound on any delay.
    pub cap: Duration,
    /// Attempts allowed before the order moves to FAILED.
    pub max_attempts: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            base: Duration::from_secs(5),
            cap: Duration::from_secs(300),
            max_attempts: 5,
        }
    }
}

impl RetryPolicy {
    /// Delay before retrying after the given 1-based attempt number:
    /// `base * 2^(attempt_no - 1)`, capped. Monotone nondecreasing.
    pub fn delay_for(&self, attempt_no: u32) -> Duration {
        let exponent = attempt_no.saturating_sub(1).min(32);
        let factor = 1u64 << exponent;
        self.base
            .checked_mul(u32::try_from(factor).unwrap_or(u32::MAX))
            .map_or(self.cap, |d| d.min(self.cap))
    }

    /// True once `attempt_no` attempts have been spent.
    pub fn exhausted(&self, attempt_no: u32) -> bool {
        attempt_no >= self.max_attempts
    }
}
