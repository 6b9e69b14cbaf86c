//! Retry backoff policy
//!
//! Exponential backoff with randomized jitter. The jitter keeps concurrent
//! callers from retrying in lockstep against an already struggling backend.

use rand::Rng;
use std::time::Duration;

/// Backoff configuration for the retry loop
#[derive(Debug, Clone, Copy)]
pub struct BackoffConfig {
    /// Maximum total attempts for one logical operation
    /// (3 means 1 initial call + 2 retries)
    pub max_attempts: usize,

    /// Delay before the first retry
    pub base_delay: Duration,

    /// Upper bound for any single delay, pre-jitter
    pub max_delay: Duration,

    /// Exponential growth factor between retries
    pub multiplier: f64,

    /// Randomize each delay within [delay/2, delay]
    pub jitter: bool,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(200),
            max_delay: Duration::from_secs(5),
            multiplier: 2.0,
            jitter: true,
        }
    }
}

impl BackoffConfig {
    /// Delay to sleep after the given failed attempt (1-based).
    pub fn delay_for(&self, attempt: usize) -> Duration {
        let capped = self.capped_delay(attempt);
        if !self.jitter || capped.is_zero() {
            return capped;
        }
        let half = capped / 2;
        half + rand::thread_rng().gen_range(Duration::ZERO..=half)
    }

    /// Exponential delay capped at `max_delay`, computed in float seconds
    /// so a large attempt count saturates instead of overflowing.
    fn capped_delay(&self, attempt: usize) -> Duration {
        let factor = self.multiplier.powi(attempt.saturating_sub(1).min(i32::MAX as usize) as i32);
        let raw_secs = self.base_delay.as_secs_f64() * factor;
        let max_secs = self.max_delay.as_secs_f64();
        if raw_secs.is_finite() && raw_secs < max_secs {
            Duration::from_secs_f64(raw_secs)
        } else {
            self.max_delay
        }
    }
}


#[cfg(test)]
impl BackoffConfig {
    fn delay_for_ceiling(&self, attempt: usize) -> Duration {
        self.capped_delay(attempt)
    }
}
