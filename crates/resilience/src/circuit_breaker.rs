//! Circuit breaker for downstream dependencies.
//!
//! # State Machine
//!
//! ```text
//! CLOSED → OPEN        (failure rate over the sliding window >= threshold)
//! OPEN → HALF_OPEN     (open duration elapsed)
//! HALF_OPEN → CLOSED   (trial call succeeded)
//! HALF_OPEN → OPEN     (trial call failed)
//! ```
//!
//! One breaker is created per dependency at start-up and lives for the
//! process; its state is never persisted.
//!
//! Callers obtain a [`CallPermit`] before attempting a call and report the
//! outcome through it. A permit dropped without an outcome (the caller's
//! future was cancelled) releases its half-open trial slot without changing
//! state.

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};

use serde::{Deserialize, Serialize};
use tokio::time::Instant;

use crate::config::CircuitBreakerConfig;
use crate::error::FailureKind;

/// Circuit breaker state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CircuitBreakerState {
    /// Calls flow normally.
    Closed,
    /// Calls are rejected without reaching the dependency.
    Open,
    /// A limited number of trial calls decide the next state.
    HalfOpen,
}

impl CircuitBreakerState {
    /// Returns the state name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Closed => "CLOSED",
            Self::Open => "OPEN",
            Self::HalfOpen => "HALF_OPEN",
        }
    }

    fn gauge_value(&self) -> f64 {
        match self {
            Self::Closed => 0.0,
            Self::Open => 1.0,
            Self::HalfOpen => 2.0,
        }
    }
}

impl std::fmt::Display for CircuitBreakerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CallOutcome {
    Success,
    Failure,
}

#[derive(Debug)]
struct Inner {
    state: CircuitBreakerState,
    window: VecDeque<CallOutcome>,
    opened_at: Option<Instant>,
    trials_in_flight: u32,
    trial_successes: u32,
}

/// Circuit breaker guarding one dependency.
#[derive(Debug)]
pub struct CircuitBreaker {
    name: String,
    config: CircuitBreakerConfig,
    inner: Mutex<Inner>,
}

impl CircuitBreaker {
    /// Creates a closed circuit breaker.
    ///
    /// `minimum_calls` is capped at `sliding_window_size`, otherwise the
    /// window could never hold enough calls to be evaluated.
    pub fn new(name: impl Into<String>, mut config: CircuitBreakerConfig) -> Self {
        config.sliding_window_size = config.sliding_window_size.max(1);
        config.minimum_calls = config.minimum_calls.clamp(1, config.sliding_window_size);
        Self {
            name: name.into(),
            config,
            inner: Mutex::new(Inner {
                state: CircuitBreakerState::Closed,
                window: VecDeque::new(),
                opened_at: None,
                trials_in_flight: 0,
                trial_successes: 0,
            }),
        }
    }

    /// Returns the dependency name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the current state, applying any due `OPEN → HALF_OPEN`
    /// transition first.
    pub fn state(&self) -> CircuitBreakerState {
        let mut inner = self.lock();
        self.check_open_elapsed(&mut inner);
        inner.state
    }

    /// Asks permission to attempt a call.
    ///
    /// Returns `Err(FailureKind::CircuitOpen)` when the call must be
    /// short-circuited.
    pub fn try_acquire(&self) -> Result<CallPermit<'_>, FailureKind> {
        let mut inner = self.lock();
        self.check_open_elapsed(&mut inner);

        match inner.state {
            CircuitBreakerState::Closed => Ok(CallPermit::new(self, false)),
            CircuitBreakerState::Open => Err(FailureKind::CircuitOpen),
            CircuitBreakerState::HalfOpen => {
                if inner.trials_in_flight + inner.trial_successes
                    < self.config.permitted_calls_in_half_open
                {
                    inner.trials_in_flight += 1;
                    Ok(CallPermit::new(self, true))
                } else {
                    Err(FailureKind::CircuitOpen)
                }
            }
        }
    }

    /// Number of outcomes currently held in the sliding window.
    pub fn window_len(&self) -> usize {
        self.lock().window.len()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn record(&self, trial: bool, outcome: CallOutcome) {
        let mut inner = self.lock();
        if trial {
            inner.trials_in_flight = inner.trials_in_flight.saturating_sub(1);
        }

        match inner.state {
            CircuitBreakerState::Closed => {
                inner.window.push_back(outcome);
                while inner.window.len() > self.config.sliding_window_size as usize {
                    inner.window.pop_front();
                }
                self.evaluate_closed(&mut inner);
            }
            CircuitBreakerState::HalfOpen if trial => match outcome {
                CallOutcome::Failure => self.transition(&mut inner, CircuitBreakerState::Open),
                CallOutcome::Success => {
                    inner.trial_successes += 1;
                    if inner.trial_successes >= self.config.permitted_calls_in_half_open {
                        self.transition(&mut inner, CircuitBreakerState::Closed);
                    }
                }
            },
            // Outcome of a call admitted under an earlier state.
            CircuitBreakerState::HalfOpen | CircuitBreakerState::Open => {}
        }
    }

    fn release_trial(&self) {
        let mut inner = self.lock();
        inner.trials_in_flight = inner.trials_in_flight.saturating_sub(1);
    }

    fn evaluate_closed(&self, inner: &mut Inner) {
        if inner.window.len() < self.config.minimum_calls as usize {
            return;
        }
        let failures = inner
            .window
            .iter()
            .filter(|o| **o == CallOutcome::Failure)
            .count();
        let failure_rate = failures as f64 / inner.window.len() as f64;

        if failure_rate >= self.config.failure_rate_threshold {
            self.transition(inner, CircuitBreakerState::Open);
        }
    }

    fn check_open_elapsed(&self, inner: &mut Inner) {
        if inner.state == CircuitBreakerState::Open
            && let Some(opened) = inner.opened_at
            && opened.elapsed() >= self.config.open_duration
        {
            self.transition(inner, CircuitBreakerState::HalfOpen);
        }
    }

    fn transition(&self, inner: &mut Inner, to: CircuitBreakerState) {
        let from = inner.state;
        if from == to {
            return;
        }
        inner.state = to;
        inner.trials_in_flight = 0;
        inner.trial_successes = 0;

        match to {
            CircuitBreakerState::Open => {
                inner.opened_at = Some(Instant::now());
                tracing::warn!(dependency = %self.name, %from, to = %to, "circuit breaker opened");
            }
            CircuitBreakerState::HalfOpen => {
                tracing::info!(dependency = %self.name, %from, to = %to, "circuit breaker half-open, allowing trial call");
            }
            CircuitBreakerState::Closed => {
                inner.window.clear();
                inner.opened_at = None;
                tracing::info!(dependency = %self.name, %from, to = %to, "circuit breaker closed");
            }
        }

        metrics::counter!(
            "circuit_breaker_transitions_total",
            "dependency" => self.name.clone(),
            "to" => to.as_str()
        )
        .increment(1);
        metrics::gauge!("circuit_breaker_state", "dependency" => self.name.clone())
            .set(to.gauge_value());
    }
}

/// Permission to attempt one call through a [`CircuitBreaker`].
#[derive(Debug)]
#[must_use = "report the call outcome through the permit"]
pub struct CallPermit<'a> {
    breaker: &'a CircuitBreaker,
    trial: bool,
    settled: bool,
}

impl<'a> CallPermit<'a> {
    fn new(breaker: &'a CircuitBreaker, trial: bool) -> Self {
        Self {
            breaker,
            trial,
            settled: false,
        }
    }

    /// True if this is a half-open trial call.
    pub fn is_trial(&self) -> bool {
        self.trial
    }

    /// Records a successful call.
    pub fn success(mut self) {
        self.settled = true;
        self.breaker.record(self.trial, CallOutcome::Success);
    }

    /// Records a failed call.
    pub fn failure(mut self) {
        self.settled = true;
        self.breaker.record(self.trial, CallOutcome::Failure);
    }
}

impl Drop for CallPermit<'_> {
    fn drop(&mut self) {
        if !self.settled && self.trial {
            self.breaker.release_trial();
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    fn config() -> CircuitBreakerConfig {
        CircuitBreakerConfig {
            failure_rate_threshold: 0.5,
            sliding_window_size: 4,
            minimum_calls: 3,
            open_duration: Duration::from_secs(10),
            permitted_calls_in_half_open: 1,
        }
    }

    fn fail(breaker: &CircuitBreaker, times: usize) {
        for _ in 0..times {
            breaker.try_acquire().unwrap().failure();
        }
    }

    #[test]
    fn test_starts_closed() {
        let breaker = CircuitBreaker::new("svc", config());
        assert_eq!(breaker.state(), CircuitBreakerState::Closed);
        assert!(breaker.try_acquire().is_ok());
    }

    #[test]
    fn test_not_evaluated_below_minimum_calls() {
        let breaker = CircuitBreaker::new("svc", config());
        fail(&breaker, 2);
        assert_eq!(breaker.state(), CircuitBreakerState::Closed);
    }

    #[test]
    fn test_opens_at_threshold() {
        let breaker = CircuitBreaker::new("svc", config());
        breaker.try_acquire().unwrap().success();
        fail(&breaker, 2);
        // 2 of 3 failed
        assert_eq!(breaker.state(), CircuitBreakerState::Open);
        assert_eq!(breaker.try_acquire().unwrap_err(), FailureKind::CircuitOpen);
    }

    #[test]
    fn test_opens_when_minimum_calls_exceeds_window() {
        let breaker = CircuitBreaker::new(
            "svc",
            CircuitBreakerConfig {
                sliding_window_size: 3,
                minimum_calls: 5,
                ..config()
            },
        );
        fail(&breaker, 3);
        assert_eq!(breaker.window_len(), 3);
        assert_eq!(breaker.state(), CircuitBreakerState::Open);
    }

    #[test]
    fn test_sliding_window_forgets_old_failures() {
        let breaker = CircuitBreaker::new(
            "svc",
            CircuitBreakerConfig {
                failure_rate_threshold: 0.75,
                ..config()
            },
        );
        fail(&breaker, 2);
        for _ in 0..4 {
            breaker.try_acquire().unwrap().success();
        }
        assert_eq!(breaker.window_len(), 4);
        fail(&breaker, 2);
        // window is [S, S, F, F]
        assert_eq!(breaker.state(), CircuitBreakerState::Closed);
    }

    #[test]
    fn test_dropped_trial_permit_frees_slot() {
        let breaker = CircuitBreaker::new(
            "svc",
            CircuitBreakerConfig {
                open_duration: Duration::ZERO,
                ..config()
            },
        );
        fail(&breaker, 3);
        assert_eq!(breaker.state(), CircuitBreakerState::HalfOpen);

        let permit = breaker.try_acquire().unwrap();
        assert!(permit.is_trial());
        assert!(breaker.try_acquire().is_err());
        drop(permit);

        assert!(breaker.try_acquire().is_ok());
    }

    #[test]
    fn test_state_display() {
        assert_eq!(CircuitBreakerState::Closed.to_string(), "CLOSED");
        assert_eq!(CircuitBreakerState::Open.to_string(), "OPEN");
        assert_eq!(CircuitBreakerState::HalfOpen.to_string(), "HALF_OPEN");
    }
}
