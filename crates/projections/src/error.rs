//! Consumer error types.

use thiserror::Error;

/// Errors that can occur while handling a message.
#[derive(Debug, Error)]
pub enum ConsumerError {
    /// The message payload could not be decoded.
    #[error("Message error: {0}")]
    Messaging(#[from] messaging::MessagingError),

    /// Reading or writing the order failed.
    #[error("Domain error: {0}")]
    Domain(#[from] domain::DomainError),
}

/// Result type for consumer operations.
pub type Result<T> = std::result::Result<T, ConsumerError>;
