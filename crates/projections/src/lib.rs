//! Event consumers.
//!
//! Downstream services report progress on their own topics; the consumers
//! here fold those reports into the order's status one step at a time,
//! holding back any report that arrives ahead of the order:
//! - [`TicketStatusConsumer`] for `kitchen-events`
//! - [`DeliveryStatusConsumer`] for `delivery-events`
//! - [`NotificationConsumer`] sends a confirmation SMS for `order-events`
//!
//! [`ConsumerRunner`] runs one listener task per consumer. Failures are
//! logged and the message is dropped; there is no retry or dead-letter
//! queue.

pub mod consumer;
pub mod delivery;
pub mod error;
pub mod kitchen;
pub mod notification;
pub mod runner;
mod status;

pub use consumer::{ConsumeOutcome, EventConsumer};
pub use delivery::DeliveryStatusConsumer;
pub use error::{ConsumerError, Result};
pub use kitchen::TicketStatusConsumer;
pub use notification::{InMemorySmsGateway, NotificationConsumer, SmsGateway};
pub use runner::{ConsumerRunner, dispatch};
