//! Event payloads exchanged with other services.
//!
//! Every message is keyed by the order id so that all events for one order
//! land on the same partition.

use common::OrderId;
use serde::{Deserialize, Serialize, de::DeserializeOwned};

use crate::{Money, Order};

/// Topic names.
pub mod topics {
    /// Order lifecycle events produced by this service.
    pub const ORDER_EVENTS: &str = "order-events";
    /// Ticket status reports from the kitchen.
    pub const KITCHEN_EVENTS: &str = "kitchen-events";
    /// Delivery status reports from the courier service.
    pub const DELIVERY_EVENTS: &str = "delivery-events";
}

/// Trait for event payloads carried on the bus.
pub trait DomainEvent: Serialize + DeserializeOwned + Send + Sync + Clone {
    /// Topic the event is published on.
    const TOPIC: &'static str;

    /// Returns the event type name, recorded on the message envelope.
    fn event_type(&self) -> &'static str;

    /// The order the event is about.
    fn order_id(&self) -> OrderId;
}

/// Published once an order has been approved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderCreated {
    pub order_id: OrderId,
    pub consumer_name: String,
    pub consumer_contact: String,
    pub restaurant_name: String,
    pub total_amount: Money,
}

impl From<&Order> for OrderCreated {
    fn from(order: &Order) -> Self {
        Self {
            order_id: order.id(),
            consumer_name: order.consumer_name().to_string(),
            consumer_contact: order.consumer_contact().to_string(),
            restaurant_name: order.restaurant_name().to_string(),
            total_amount: order.total_amount(),
        }
    }
}

impl DomainEvent for OrderCreated {
    const TOPIC: &'static str = topics::ORDER_EVENTS;

    fn event_type(&self) -> &'static str {
        "OrderCreated"
    }

    fn order_id(&self) -> OrderId {
        self.order_id
    }
}

/// Kitchen report. `new_status` is the kitchen's own token, mapped by the
/// consumer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TicketStatusChanged {
    pub ticket_id: String,
    pub order_id: OrderId,
    pub new_status: String,
}

impl DomainEvent for TicketStatusChanged {
    const TOPIC: &'static str = topics::KITCHEN_EVENTS;

    fn event_type(&self) -> &'static str {
        "TicketStatusChanged"
    }

    fn order_id(&self) -> OrderId {
        self.order_id
    }
}

/// Courier report. `new_status` is the courier service's own token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryStatusChanged {
    pub delivery_id: String,
    pub order_id: OrderId,
    pub new_status: String,
}

impl DomainEvent for DeliveryStatusChanged {
    const TOPIC: &'static str = topics::DELIVERY_EVENTS;

    fn event_type(&self) -> &'static str {
        "DeliveryStatusChanged"
    }

    fn order_id(&self) -> OrderId {
        self.order_id
    }
}
