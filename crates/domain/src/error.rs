//! Domain error types.

use common::OrderId;
use thiserror::Error;

use crate::order::{OrderStatus, Version};

/// Errors that can occur during domain operations.
#[derive(Debug, Error)]
pub enum DomainError {
    /// The requested status change is not allowed by the state machine.
    #[error("Invalid status transition for order {order_id}: cannot {action} from {from}")]
    InvalidStatusTransition {
        order_id: OrderId,
        from: OrderStatus,
        action: &'static str,
    },

    /// An order must contain at least one line item.
    #[error("Order has no items")]
    NoItems,

    /// Line item quantity must be positive.
    #[error("Invalid quantity for {item}: {quantity} (must be greater than 0)")]
    InvalidQuantity { item: String, quantity: u32 },

    /// The stored order changed since it was loaded.
    #[error(
        "Concurrency conflict for order {order_id}: expected version {expected}, found {actual}"
    )]
    ConcurrencyConflict {
        order_id: OrderId,
        expected: Version,
        actual: Version,
    },

    /// The order does not exist.
    #[error("Order not found: {0}")]
    OrderNotFound(OrderId),

    /// A stored value could not be interpreted.
    #[error("Corrupt order record {order_id}: {reason}")]
    CorruptRecord { order_id: OrderId, reason: String },

    /// A database error occurred.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A database migration error occurred.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for domain operations.
pub type Result<T> = std::result::Result<T, DomainError>;
