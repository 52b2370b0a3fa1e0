//! Per-dependency resilience configuration.
//!
//! Configuration is read from environment variables prefixed with the
//! dependency name, e.g. `KITCHEN_SERVICE_READ_TIMEOUT_MS`:
//!
//! | suffix                           | default |
//! |----------------------------------|---------|
//! | `_CONNECT_TIMEOUT_MS`            | 2000    |
//! | `_READ_TIMEOUT_MS`               | 3000    |
//! | `_RETRY_MAX_ATTEMPTS`            | 3       |
//! | `_RETRY_BACKOFF_MS`              | 500     |
//! | `_RETRY_BACKOFF_MULTIPLIER`      | 2.0     |
//! | `_RETRY_BACKOFF_MAX_MS`          | 5000    |
//! | `_CIRCUIT_FAILURE_RATE_THRESHOLD`| 0.5     |
//! | `_CIRCUIT_WINDOW_SIZE`           | 10      |
//! | `_CIRCUIT_MINIMUM_CALLS`         | 5       |
//! | `_CIRCUIT_OPEN_DURATION_MS`      | 10000   |
//! | `_CIRCUIT_HALF_OPEN_CALLS`       | 1       |
//! | `_BULKHEAD_MAX_CONCURRENT`       | 10      |

use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Network timeouts for a dependency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Timeouts {
    pub connect: Duration,
    pub read: Duration,
}

impl Timeouts {
    /// Deadline applied to one guarded attempt.
    ///
    /// The transport is opaque, so connection setup and response read share
    /// a single budget.
    pub fn call_deadline(&self) -> Duration {
        self.connect + self.read
    }
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            connect: Duration::from_millis(2000),
            read: Duration::from_millis(3000),
        }
    }
}

/// Retry policy for idempotent operations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Total attempts including the first one.
    pub max_attempts: u32,
    /// Delay before the first retry.
    pub initial_backoff: Duration,
    /// Multiplier applied to the delay after each retry.
    pub multiplier: f64,
    /// Upper bound for a single delay.
    pub max_backoff: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_millis(500),
            multiplier: 2.0,
            max_backoff: Duration::from_millis(5000),
        }
    }
}

/// Circuit breaker thresholds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CircuitBreakerConfig {
    /// Failure rate (0.0-1.0) at or above which the circuit opens.
    pub failure_rate_threshold: f64,
    /// Number of most recent calls kept in the sliding window.
    pub sliding_window_size: u32,
    /// Minimum recorded calls before the failure rate is evaluated.
    pub minimum_calls: u32,
    /// How long the circuit stays open before allowing a trial call.
    pub open_duration: Duration,
    /// Trial calls permitted while half-open.
    pub permitted_calls_in_half_open: u32,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_rate_threshold: 0.5,
            sliding_window_size: 10,
            minimum_calls: 5,
            open_duration: Duration::from_secs(10),
            permitted_calls_in_half_open: 1,
        }
    }
}

/// Bulkhead sizing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BulkheadConfig {
    pub max_concurrent: usize,
}

impl Default for BulkheadConfig {
    fn default() -> Self {
        Self { max_concurrent: 10 }
    }
}

/// Full resilience configuration for one dependency.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ResilienceConfig {
    pub timeouts: Timeouts,
    pub retry: RetryConfig,
    pub circuit_breaker: CircuitBreakerConfig,
    pub bulkhead: BulkheadConfig,
}

impl ResilienceConfig {
    /// Loads configuration for the dependency identified by `prefix`
    /// (e.g. `"RESTAURANT_SERVICE"`), falling back to defaults.
    pub fn from_env(prefix: &str) -> Self {
        Self::from_lookup(prefix, |key| std::env::var(key).ok())
    }

    /// Loads configuration through an arbitrary key lookup.
    pub fn from_lookup(prefix: &str, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let get = |suffix: &str| {
            let key = format!("{prefix}_{suffix}");
            lookup(&key).map(|value| (key, value))
        };
        let millis = |suffix: &str, default: Duration| {
            Duration::from_millis(parse_or(get(suffix), default.as_millis() as u64))
        };

        let window_size = parse_or(
            get("CIRCUIT_WINDOW_SIZE"),
            defaults.circuit_breaker.sliding_window_size,
        )
        .max(1);

        Self {
            timeouts: Timeouts {
                connect: millis("CONNECT_TIMEOUT_MS", defaults.timeouts.connect),
                read: millis("READ_TIMEOUT_MS", defaults.timeouts.read),
            },
            retry: RetryConfig {
                max_attempts: parse_or(get("RETRY_MAX_ATTEMPTS"), defaults.retry.max_attempts)
                    .max(1),
                initial_backoff: millis("RETRY_BACKOFF_MS", defaults.retry.initial_backoff),
                multiplier: parse_or(
                    get("RETRY_BACKOFF_MULTIPLIER"),
                    defaults.retry.multiplier,
                ),
                max_backoff: millis("RETRY_BACKOFF_MAX_MS", defaults.retry.max_backoff),
            },
            circuit_breaker: CircuitBreakerConfig {
                failure_rate_threshold: parse_or(
                    get("CIRCUIT_FAILURE_RATE_THRESHOLD"),
                    defaults.circuit_breaker.failure_rate_threshold,
                ),
                sliding_window_size: window_size,
                // A full window must be able to trip the breaker.
                minimum_calls: parse_or(
                    get("CIRCUIT_MINIMUM_CALLS"),
                    defaults.circuit_breaker.minimum_calls,
                )
                .clamp(1, window_size),
                open_duration: millis(
                    "CIRCUIT_OPEN_DURATION_MS",
                    defaults.circuit_breaker.open_duration,
                ),
                permitted_calls_in_half_open: parse_or(
                    get("CIRCUIT_HALF_OPEN_CALLS"),
                    defaults.circuit_breaker.permitted_calls_in_half_open,
                )
                .max(1),
            },
            bulkhead: BulkheadConfig {
                max_concurrent: parse_or(
                    get("BULKHEAD_MAX_CONCURRENT"),
                    defaults.bulkhead.max_concurrent,
                )
                .max(1),
            },
        }
    }
}

fn parse_or<T: FromStr>(entry: Option<(String, String)>, default: T) -> T {
    match entry {
        None => default,
        Some((key, raw)) => match raw.trim().parse() {
            Ok(value) => value,
            Err(_) => {
                tracing::warn!(%key, value = %raw, "unparseable resilience setting, using default");
                default
            }
        },
    }
}
