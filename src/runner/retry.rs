// src/runner/retry.rs

//! Retry policies for recoverable daemon failures.
//!
//! The daemon only asks "how long until the next attempt, if any?". The
//! default [`FixedDelay`] retries forever every five seconds;
//! [`BoundedBackoff`] doubles the delay and eventually gives up.

use std::fmt::Debug;
use std::time::Duration;

pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(5);

/// Decides when (and whether) to re-signal the daemon after a failure.
pub trait RetryPolicy: Send + Sync + Debug {
    /// Delay before retry number `attempt` (1 for the first failure in a
    /// row). `None` means stop retrying.
    fn delay_for(&self, attempt: u32) -> Option<Duration>;
}

/// Same delay every time, no cap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedDelay {
    pub delay: Duration,
}

impl FixedDelay {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }
}

impl Default for FixedDelay {
    fn default() -> Self {
        Self::new(DEFAULT_RETRY_DELAY)
    }
}

impl RetryPolicy for FixedDelay {
    fn delay_for(&self, _attempt: u32) -> Option<Duration> {
        Some(self.delay)
    }
}

/// Exponential backoff from `base`, giving up after `max_retries` attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoundedBackoff {
    pub base: Duration,
    pub max_retries: u32,
}

impl BoundedBackoff {
    pub fn new(base: Duration, max_retries: u32) -> Self {
        Self { base, max_retries }
    }
}

impl RetryPolicy for BoundedBackoff {
    fn delay_for(&self, attempt: u32) -> Option<Duration> {
        if attempt == 0 || attempt > self.max_retries {
            return None;
        }
        let factor = 2u32.saturating_pow(attempt - 1);
        Some(self.base.saturating_mul(factor))
    }
}
