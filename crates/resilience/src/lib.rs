//! Resilience policies for outbound dependency calls.
//!
//! Every call to a downstream service goes through a [`DependencyGuard`],
//! which composes, from the outside in:
//!
//! 1. retry with exponential backoff (idempotent operations only)
//! 2. circuit breaker gate
//! 3. bulkhead (concurrency limiter)
//! 4. timeout
//!
//! When the composed call fails, the operation's declared [`Fallback`]
//! decides whether the caller gets a degraded default or an explicit
//! [`ServiceUnavailable`] error.

pub mod bulkhead;
pub mod circuit_breaker;
pub mod config;
pub mod error;
pub mod guard;
pub mod retry;

pub use bulkhead::{Bulkhead, BulkheadSlot};
pub use circuit_breaker::{CallPermit, CircuitBreaker, CircuitBreakerState};
pub use config::{BulkheadConfig, CircuitBreakerConfig, ResilienceConfig, RetryConfig, Timeouts};
pub use error::{FailureKind, ServiceUnavailable, TransportError};
pub use guard::{DependencyGuard, Fallback, Idempotency, Operation};
pub use retry::ExponentialBackoff;
