use std::time::Duration;

use serde::{Deserialize, Serialize};

pub const DEFAULT_MAX_ATTEMPTS: u32 = 4;
pub const DEFAULT_ATTEMPT_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_INITIAL_BACKOFF: Duration = Duration::from_millis(500);
pub const DEFAULT_MAX_BACKOFF: Duration = Duration::from_secs(30);

/// Bounded retry with exponential backoff.
///
/// Attempt `n` (1-based) is given `attempt_timeout` to complete. After a transient failure of attempt `n`, the caller
/// waits `initial_backoff * 2^(n-1)`, capped at `max_backoff`, before trying again. No more than `max_attempts`
/// attempts are ever made.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub attempt_timeout: Duration,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            attempt_timeout: DEFAULT_ATTEMPT_TIMEOUT,
            initial_backoff: DEFAULT_INITIAL_BACKOFF,
            max_backoff: DEFAULT_MAX_BACKOFF,
        }
    }
}

impl RetryPolicy {
    /// A policy that never waits between attempts. Handy for tests.
    pub fn immediate(max_attempts: u32, attempt_timeout: Duration) -> Self {
        Self { max_attempts, attempt_timeout, initial_backoff: Duration::ZERO, max_backoff: Duration::ZERO }
    }

    /// The delay to wait after the given (1-based) attempt has failed
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(31);
        let delay = self.initial_backoff.saturating_mul(1u32 << exponent);
        delay.min(self.max_backoff)
    }

    /// Whether another attempt is allowed after `attempt` attempts have been made
    pub fn can_retry(&self, attempt: u32) -> bool {
        attempt < self.max_attempts
    }
}
