//! Bounded exponential-backoff schedule for model provider calls.
//!
//! Only transient provider failures (rate limits, timeouts, 5xx) are
//! retried; fatal rejections fail the job immediately. The classification
//! itself lives with the provider client — this module only owns the
//! delay arithmetic and the attempt bound.

use std::time::Duration;

/// Tunable parameters for the exponential-backoff strategy.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Delay before the first retry.
    pub initial_delay: Duration,
    /// Upper bound on the delay between attempts.
    pub max_delay: Duration,
    /// Factor by which the delay grows after each failure.
    pub multiplier: f64,
    /// Total attempts, including the first (so `3` means two retries).
    pub max_attempts: u32,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_secs(2),
            max_delay: Duration::from_secs(60),
            multiplier: 2.0,
            max_attempts: 4,
        }
    }
}

impl RetryConfig {
    /// Calculate the delay to wait after the given failed attempt
    /// (1-indexed), clamped to `max_delay`. Returns `None` when the
    /// attempt budget is exhausted and the caller should give up.
    pub fn delay_after(&self, attempt: u32) -> Option<Duration> {
        if attempt >= self.max_attempts {
            return None;
        }
        let factor = self.multiplier.powi(attempt.saturating_sub(1) as i32);
        let ms = (self.initial_delay.as_millis() as f64 * factor) as u64;
        Some(Duration::from_millis(ms).min(self.max_delay))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delays_grow_geometrically_and_clamp() {
        let config = RetryConfig {
            initial_delay: Duration::from_secs(2),
            max_delay: Duration::from_secs(5),
            multiplier: 2.0,
            max_attempts: 5,
        };
        assert_eq!(config.delay_after(1), Some(Duration::from_secs(2)));
        assert_eq!(config.delay_after(2), Some(Duration::from_secs(4)));
        // 8s clamps to the 5s ceiling.
        assert_eq!(config.delay_after(3), Some(Duration::from_secs(5)));
    }

    #[test]
    fn attempt_budget_is_bounded() {
        let config = RetryConfig::default();
        assert!(config.delay_after(config.max_attempts).is_none());
        assert!(config.delay_after(config.max_attempts - 1).is_some());
    }
}
