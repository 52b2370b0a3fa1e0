//! Guarded execution of dependency calls.

use std::future::Future;

use crate::bulkhead::Bulkhead;
use crate::circuit_breaker::{CircuitBreaker, CircuitBreakerState};
use crate::config::ResilienceConfig;
use crate::error::{FailureKind, ServiceUnavailable, TransportError};
use crate::retry::ExponentialBackoff;

/// Whether repeating an operation is free of side effects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Idempotency {
    /// Safe to retry.
    Idempotent,
    /// Must be attempted at most once per caller request.
    NonIdempotent,
}

/// Substitute behaviour when a guarded call fails.
#[derive(Debug)]
pub enum Fallback<T> {
    /// Return a default result and let the caller proceed.
    Degrade(fn() -> T),
    /// Surface [`ServiceUnavailable`] to the caller.
    Reject,
}

impl<T> Clone for Fallback<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Fallback<T> {}

/// Static description of a guarded operation.
///
/// Declared once per client method, so the retry and fallback rules sit next
/// to the operation they govern.
#[derive(Debug)]
pub struct Operation<T> {
    pub name: &'static str,
    pub idempotency: Idempotency,
    pub fallback: Fallback<T>,
}

impl<T> Operation<T> {
    /// A critical operation: failures are surfaced to the caller.
    pub const fn reject(name: &'static str, idempotency: Idempotency) -> Self {
        Self {
            name,
            idempotency,
            fallback: Fallback::Reject,
        }
    }

    /// A non-critical operation: failures yield `default()`.
    pub const fn degrade(name: &'static str, idempotency: Idempotency, default: fn() -> T) -> Self {
        Self {
            name,
            idempotency,
            fallback: Fallback::Degrade(default),
        }
    }
}

/// Resilience policy for one dependency.
///
/// Owns the dependency's circuit breaker and bulkhead; every client method
/// for the dependency runs through [`DependencyGuard::call`].
#[derive(Debug)]
pub struct DependencyGuard {
    dependency: String,
    config: ResilienceConfig,
    breaker: CircuitBreaker,
    bulkhead: Bulkhead,
}

impl DependencyGuard {
    /// Creates a guard with a fresh (closed) breaker and empty bulkhead.
    pub fn new(dependency: impl Into<String>, config: ResilienceConfig) -> Self {
        let dependency = dependency.into();
        let breaker = CircuitBreaker::new(dependency.clone(), config.circuit_breaker.clone());
        let bulkhead = Bulkhead::new(config.bulkhead);
        tracing::info!(
            %dependency,
            connect_timeout_ms = config.timeouts.connect.as_millis() as u64,
            read_timeout_ms = config.timeouts.read.as_millis() as u64,
            retry_max_attempts = config.retry.max_attempts,
            bulkhead_max_concurrent = config.bulkhead.max_concurrent,
            "dependency guard initialized"
        );
        Self {
            dependency,
            config,
            breaker,
            bulkhead,
        }
    }

    /// Dependency name.
    pub fn dependency(&self) -> &str {
        &self.dependency
    }

    /// Configuration in force.
    pub fn config(&self) -> &ResilienceConfig {
        &self.config
    }

    /// Current breaker state.
    pub fn circuit_state(&self) -> CircuitBreakerState {
        self.breaker.state()
    }

    /// The dependency's circuit breaker.
    pub fn breaker(&self) -> &CircuitBreaker {
        &self.breaker
    }

    /// The dependency's bulkhead.
    pub fn bulkhead(&self) -> &Bulkhead {
        &self.bulkhead
    }

    /// Runs `call` under the full policy: retry (idempotent operations only)
    /// outside the circuit breaker, outside the bulkhead, outside the timeout.
    ///
    /// `call` is invoked once per attempt. An open breaker stops retrying
    /// immediately. When every attempt fails, the operation's fallback
    /// decides the result.
    pub async fn call<T, F, Fut>(&self, op: &Operation<T>, mut call: F) -> Result<T, ServiceUnavailable>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, TransportError>>,
    {
        let max_attempts = match op.idempotency {
            Idempotency::Idempotent => self.config.retry.max_attempts.max(1),
            Idempotency::NonIdempotent => 1,
        };
        let mut backoff = ExponentialBackoff::new(&self.config.retry);
        let mut attempts = 0;

        let cause = loop {
            attempts += 1;
            match self.attempt(op.name, &mut call).await {
                Ok(value) => return Ok(value),
                Err(FailureKind::CircuitOpen) => break FailureKind::CircuitOpen,
                Err(kind) if attempts >= max_attempts => break kind,
                Err(kind) => {
                    let delay = backoff.next_delay();
                    tracing::warn!(
                        dependency = %self.dependency,
                        operation = op.name,
                        attempt = attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %kind,
                        "call failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        };

        match op.fallback {
            Fallback::Degrade(default) => {
                tracing::warn!(
                    dependency = %self.dependency,
                    operation = op.name,
                    reason = %cause,
                    "fallback: dependency unavailable, returning degraded result"
                );
                metrics::counter!(
                    "resilience_fallbacks_total",
                    "dependency" => self.dependency.clone(),
                    "fallback" => "degrade"
                )
                .increment(1);
                Ok(default())
            }
            Fallback::Reject => {
                tracing::error!(
                    dependency = %self.dependency,
                    operation = op.name,
                    attempts,
                    reason = %cause,
                    "fallback: dependency unavailable, rejecting call"
                );
                metrics::counter!(
                    "resilience_fallbacks_total",
                    "dependency" => self.dependency.clone(),
                    "fallback" => "reject"
                )
                .increment(1);
                Err(ServiceUnavailable {
                    dependency: self.dependency.clone(),
                    operation: op.name,
                    attempts,
                    cause,
                })
            }
        }
    }

    async fn attempt<T, F, Fut>(&self, operation: &'static str, call: &mut F) -> Result<T, FailureKind>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, TransportError>>,
    {
        let permit = match self.breaker.try_acquire() {
            Ok(permit) => permit,
            Err(kind) => {
                self.count(operation, kind.as_str());
                return Err(kind);
            }
        };

        let Some(_slot) = self.bulkhead.try_enter() else {
            permit.failure();
            self.count(operation, FailureKind::BulkheadFull.as_str());
            return Err(FailureKind::BulkheadFull);
        };

        let deadline = self.config.timeouts.call_deadline();
        let result = match tokio::time::timeout(deadline, call()).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(err)) => Err(FailureKind::Transport(err)),
            Err(_) => Err(FailureKind::Timeout(deadline)),
        };

        match &result {
            Ok(_) => {
                permit.success();
                self.count(operation, "success");
            }
            Err(kind) => {
                permit.failure();
                self.count(operation, kind.as_str());
            }
        }
        result
    }

    fn count(&self, operation: &'static str, outcome: &'static str) {
        metrics::counter!(
            "resilience_calls_total",
            "dependency" => self.dependency.clone(),
            "operation" => operation,
            "outcome" => outcome
        )
        .increment(1);
    }
}
