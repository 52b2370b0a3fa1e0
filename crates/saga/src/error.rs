//! Saga error types.

use common::{MenuItemId, OrderId, RestaurantId};
use domain::{DomainError, OrderStatus};
use resilience::ServiceUnavailable;
use thiserror::Error;

/// Errors that can occur while creating or changing an order.
#[derive(Debug, Error)]
pub enum SagaError {
    #[error("Restaurant not found: {0}")]
    RestaurantNotFound(RestaurantId),

    #[error("Restaurant {name} ({id}) is not accepting orders")]
    RestaurantClosed { id: RestaurantId, name: String },

    /// A requested menu item is unknown or belongs to another restaurant.
    #[error("Invalid menu item: {0}")]
    InvalidItem(MenuItemId),

    /// A dependency needed before the order was persisted is unavailable.
    #[error(transparent)]
    ServiceUnavailable(#[from] ServiceUnavailable),

    /// The payment call succeeded but the charge was declined.
    #[error("Payment declined for order {order_id}")]
    PaymentDeclined { order_id: OrderId },

    /// The payment could not be attempted; the order stays unpaid.
    #[error("Payment for order {order_id} could not be authorized: {source}")]
    PaymentUnavailable {
        order_id: OrderId,
        source: ServiceUnavailable,
    },

    /// A step after payment failed. The order is paid but incomplete and no
    /// compensation has been issued.
    #[error("Order {order_id} is paid but step '{step}' failed: {source}")]
    PartialFailure {
        order_id: OrderId,
        step: &'static str,
        source: ServiceUnavailable,
    },

    /// Payment went through but the order record could not be updated
    /// afterwards, so the stored order may lag behind what was charged.
    #[error("Order {order_id} is paid but step '{step}' could not be recorded: {source}")]
    StepNotRecorded {
        order_id: OrderId,
        step: &'static str,
        source: DomainError,
    },

    #[error("Order not found: {0}")]
    OrderNotFound(OrderId),

    #[error("Order {order_id} cannot be cancelled in status {status}")]
    CancellationNotAllowed {
        order_id: OrderId,
        status: OrderStatus,
    },

    #[error("Domain error: {0}")]
    Domain(#[from] DomainError),
}

impl SagaError {
    /// Label for the `orders_rejected_total` metric.
    pub fn reason(&self) -> &'static str {
        match self {
            Self::RestaurantNotFound(_) => "restaurant_not_found",
            Self::RestaurantClosed { .. } => "restaurant_closed",
            Self::InvalidItem(_) => "invalid_item",
            Self::ServiceUnavailable(_) => "service_unavailable",
            Self::PaymentDeclined { .. } => "payment_declined",
            Self::PaymentUnavailable { .. } => "payment_unavailable",
            Self::PartialFailure { .. } => "partial_failure",
            Self::StepNotRecorded { .. } => "step_not_recorded",
            Self::OrderNotFound(_) => "order_not_found",
            Self::CancellationNotAllowed { .. } => "cancellation_not_allowed",
            Self::Domain(_) => "domain",
        }
    }

    /// The order left behind by a failed saga, if one was persisted.
    pub fn order_id(&self) -> Option<OrderId> {
        match self {
            Self::PaymentDeclined { order_id }
            | Self::PaymentUnavailable { order_id, .. }
            | Self::PartialFailure { order_id, .. }
            | Self::StepNotRecorded { order_id, .. } => Some(*order_id),
            _ => None,
        }
    }
}

/// Convenience type alias for saga results.
pub type Result<T> = std::result::Result<T, SagaError>;
