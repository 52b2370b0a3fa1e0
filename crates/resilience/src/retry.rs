//! Exponential backoff between retry attempts.

use std::time::Duration;

use crate::config::RetryConfig;

/// Delay sequence for retrying an idempotent call.
///
/// The first delay equals the configured initial backoff; each subsequent
/// delay is multiplied by the configured factor and capped at the maximum.
#[derive(Debug, Clone)]
pub struct ExponentialBackoff {
    current: Duration,
    multiplier: f64,
    max: Duration,
}

impl ExponentialBackoff {
    /// Creates a backoff sequence from a retry configuration.
    pub fn new(config: &RetryConfig) -> Self {
        Self {
            current: config.initial_backoff.min(config.max_backoff),
            multiplier: config.multiplier,
            max: config.max_backoff,
        }
    }

    /// Returns the next delay and advances the sequence.
    pub fn next_delay(&mut self) -> Duration {
        let delay = self.current;
        let scaled = (self.current.as_nanos() as f64 * self.multiplier).round();
        let max_nanos = self.max.as_nanos() as f64;
        self.current = if scaled.is_finite() && scaled > 0.0 && scaled < max_nanos {
            Duration::from_nanos(scaled as u64)
        } else {
            self.max
        };
        delay
    }
}

impl Iterator for ExponentialBackoff {
    type Item = Duration;

    fn next(&mut self) -> Option<Duration> {
        Some(self.next_delay())
    }
}
