use thiserror::Error;

/// Errors raised by publishers and subscribers.
#[derive(Debug, Error)]
pub enum MessagingError {
    /// The broker did not accept the message.
    #[error("Publish to {topic} failed: {reason}")]
    PublishFailed { topic: String, reason: String },

    /// A message was built without one of its required fields.
    #[error("Message is missing required field: {0}")]
    IncompleteMessage(&'static str),

    /// A serialization/deserialization error occurred.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for messaging operations.
pub type Result<T> = std::result::Result<T, MessagingError>;
