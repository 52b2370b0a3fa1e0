//! Messaging for order events.
//!
//! Producers hand a [`Message`] to a [`Publisher`]; consumers obtain a
//! [`MessageStream`] per topic from a [`Subscriber`]. Messages carry a key
//! (the order id) that selects the partition, so all messages for one key
//! are delivered in publish order.

pub mod bus;
pub mod error;
pub mod memory;
pub mod message;

pub use bus::{MessageStream, Publisher, PublisherExt, Subscriber};
pub use error::{MessagingError, Result};
pub use memory::{DEFAULT_RETENTION, Delivered, InMemoryBus};
pub use message::{Message, MessageBuilder, MessageId};
