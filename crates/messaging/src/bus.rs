use std::pin::Pin;

use async_trait::async_trait;
use domain::DomainEvent;
use futures_core::Stream;

use crate::{Message, Result};

/// A stream of messages from one topic.
pub type MessageStream = Pin<Box<dyn Stream<Item = Message> + Send>>;

/// Sends messages to a topic.
#[async_trait]
pub trait Publisher: Send + Sync {
    /// Publishes one message. Returns once the broker has accepted it.
    async fn publish(&self, message: Message) -> Result<()>;
}

/// Opens subscriptions to topics.
#[async_trait]
pub trait Subscriber: Send + Sync {
    /// Subscribes to `topic`. The stream yields every message published
    /// after the subscription was opened and ends when the bus shuts down.
    async fn subscribe(&self, topic: &str) -> Result<MessageStream>;
}

/// Publishing helpers for typed domain events.
#[async_trait]
pub trait PublisherExt: Publisher {
    /// Publishes `event` on its topic, keyed by its order id.
    async fn publish_event<E: DomainEvent + 'static>(&self, event: &E) -> Result<()> {
        let message = Message::builder()
            .topic(E::TOPIC)
            .key(event.order_id().to_string())
            .event_type(event.event_type())
            .payload(event)?
            .build()?;
        self.publish(message).await
    }
}

impl<P: Publisher + ?Sized> PublisherExt for P {}
