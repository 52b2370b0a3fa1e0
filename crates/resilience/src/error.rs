//! Resilience error types.

use std::time::Duration;

use thiserror::Error;

/// Failure reported by the underlying transport primitive.
///
/// The transport itself (HTTP, RPC, in-process fake) is external; it only has
/// to say whether the remote call could be completed.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    /// The dependency could not be reached.
    #[error("connection failed: {0}")]
    Connect(String),

    /// The dependency was reached but failed to produce a response.
    #[error("remote failure: {0}")]
    Remote(String),
}

/// Why a single guarded attempt did not produce a result.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FailureKind {
    /// The circuit breaker rejected the call without attempting it.
    #[error("circuit breaker is open")]
    CircuitOpen,

    /// The bulkhead had no free slot.
    #[error("bulkhead is full")]
    BulkheadFull,

    /// The call did not complete within the deadline.
    #[error("call timed out after {0:?}")]
    Timeout(Duration),

    /// The transport reported a failure.
    #[error(transparent)]
    Transport(#[from] TransportError),
}

impl FailureKind {
    /// Label used for metrics.
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureKind::CircuitOpen => "circuit_open",
            FailureKind::BulkheadFull => "bulkhead_full",
            FailureKind::Timeout(_) => "timeout",
            FailureKind::Transport(_) => "transport",
        }
    }
}

/// Raised to the caller when an operation with a *reject* fallback fails.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{dependency} is currently unavailable ({operation} after {attempts} attempt(s)): {cause}")]
pub struct ServiceUnavailable {
    /// Name of the dependency, e.g. `"kitchen-service"`.
    pub dependency: String,
    /// Name of the guarded operation.
    pub operation: &'static str,
    /// How many attempts were made (zero attempts reach the network when the
    /// circuit is open, but the gate still counts as one attempt).
    pub attempts: u32,
    /// Failure of the last attempt.
    pub cause: FailureKind,
}

impl ServiceUnavailable {
    /// Returns true if the call never reached the dependency because the
    /// breaker was open.
    pub fn is_short_circuited(&self) -> bool {
        self.cause == FailureKind::CircuitOpen
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_error_converts_into_failure_kind() {
        let kind: FailureKind = TransportError::Connect("refused".into()).into();
        assert_eq!(kind.as_str(), "transport");
        assert_eq!(kind.to_string(), "connection failed: refused");
    }

    #[test]
    fn test_service_unavailable_message_names_dependency() {
        let err = ServiceUnavailable {
            dependency: "kitchen-service".into(),
            operation: "create_ticket",
            attempts: 1,
            cause: FailureKind::CircuitOpen,
        };
        assert!(err.is_short_circuited());
        assert_eq!(
            err.to_string(),
            "kitchen-service is currently unavailable (create_ticket after 1 attempt(s)): circuit breaker is open"
        );
    }
}
