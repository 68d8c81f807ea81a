use rand::Rng;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Bounds the optimistic retry loop of the counter handler.
///
/// Every attempt re-reads the record, so delays are only there to spread
/// writers apart under heavy contention; correctness does not depend on them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Total attempts, including the first one.
    pub max_attempts: u32,
    /// Backoff ceiling after the first conflict, doubled per further conflict.
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 8,
            base_delay_ms: 5,
            max_delay_ms: 100,
        }
    }
}

impl RetryPolicy {
    /// Retries immediately, without sleeping between attempts.
    pub fn without_backoff(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            base_delay_ms: 0,
            max_delay_ms: 0,
        }
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    pub fn attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }

    /// Upper bound of the delay after the `conflicts`-th conflict (1-based).
    pub fn ceiling(&self, conflicts: u32) -> Duration {
        let shift = conflicts.saturating_sub(1).min(63);
        let delay_ms = self.base_delay_ms.saturating_mul(1u64 << shift);
        Duration::from_millis(delay_ms.min(self.max_delay_ms))
    }

    /// Full jitter: uniformly random between zero and the ceiling.
    pub fn delay(&self, conflicts: u32) -> Duration {
        let ceiling = self.ceiling(conflicts).as_millis() as u64;
        if ceiling == 0 {
            return Duration::ZERO;
        }
        Duration::from_millis(rand::rng().random_range(0..=ceiling))
    }
}
