use std::time::Duration;

use docrelay_core::config::RetryConfig;

/// Exponential backoff schedule for failed completion attempts.
///
/// The delay before retry `n` (0-based) is `initial_delay * 2^n`, clamped to
/// `max_delay` when one is set.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    max_retries: u32,
    initial_delay: Duration,
    max_delay: Option<Duration>,
}

impl RetryPolicy {
    /// Uncapped doubling from `initial_delay`.
    pub fn new(max_retries: u32, initial_delay: Duration) -> Self {
        Self {
            max_retries,
            initial_delay,
            max_delay: None,
        }
    }

    pub fn with_max_delay(mut self, max_delay: Option<Duration>) -> Self {
        self.max_delay = max_delay;
        self
    }

    pub fn from_config(config: &RetryConfig) -> Self {
        let max_delay = (config.max_delay_ms > 0).then(|| Duration::from_millis(config.max_delay_ms));
        Self::new(config.max_retries, Duration::from_millis(config.initial_delay_ms))
            .with_max_delay(max_delay)
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Total attempts including the first one.
    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    pub fn delay_for(&self, retry: u32) -> Duration {
        let factor = 2u32.checked_pow(retry).unwrap_or(u32::MAX);
        let delay = self.initial_delay.saturating_mul(factor);
        match self.max_delay {
            Some(cap) => delay.min(cap),
            None => delay,
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&RetryConfig::default())
    }
}
