use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use uuid::Uuid;

use crate::{MessagingError, Result};

/// Unique identifier for a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(Uuid);

impl MessageId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for MessageId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for MessageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A message travelling over the bus.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,

    pub topic: String,

    /// Partitioning key. All messages with the same key are delivered in
    /// the order they were published.
    pub key: String,

    /// Payload type name, e.g. `OrderCreated`. Absent for raw payloads
    /// produced by other systems.
    pub event_type: Option<String>,

    pub timestamp: DateTime<Utc>,

    /// The message body as JSON.
    pub payload: serde_json::Value,
}

impl Message {
    pub fn builder() -> MessageBuilder {
        MessageBuilder::default()
    }

    /// Deserializes the payload.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_json::from_value(self.payload.clone())?)
    }
}

/// Builder for [`Message`].
#[derive(Debug, Default)]
pub struct MessageBuilder {
    id: Option<MessageId>,
    topic: Option<String>,
    key: Option<String>,
    event_type: Option<String>,
    timestamp: Option<DateTime<Utc>>,
    payload: Option<serde_json::Value>,
}

impl MessageBuilder {
    pub fn id(mut self, id: MessageId) -> Self {
        self.id = Some(id);
        self
    }

    pub fn topic(mut self, topic: impl Into<String>) -> Self {
        self.topic = Some(topic.into());
        self
    }

    pub fn key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    pub fn event_type(mut self, event_type: impl Into<String>) -> Self {
        self.event_type = Some(event_type.into());
        self
    }

    /// Sets the timestamp. If not set, the current time will be used.
    pub fn timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    /// Sets the payload from a serializable value.
    pub fn payload<T: Serialize>(mut self, payload: &T) -> Result<Self> {
        self.payload = Some(serde_json::to_value(payload)?);
        Ok(self)
    }

    /// Sets the payload from a raw JSON value.
    pub fn payload_raw(mut self, payload: serde_json::Value) -> Self {
        self.payload = Some(payload);
        self
    }

    /// Builds the message.
    ///
    /// # Errors
    ///
    /// `IncompleteMessage` if topic, key or payload were not set.
    pub fn build(self) -> Result<Message> {
        Ok(Message {
            id: self.id.unwrap_or_default(),
            topic: self.topic.ok_or(MessagingError::IncompleteMessage("topic"))?,
            key: self.key.ok_or(MessagingError::IncompleteMessage("key"))?,
            event_type: self.event_type,
            timestamp: self.timestamp.unwrap_or_else(Utc::now),
            payload: self
                .payload
                .ok_or(MessagingError::IncompleteMessage("payload"))?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_requires_topic_key_and_payload() {
        let err = Message::builder()
            .topic("order-events")
            .payload_raw(serde_json::json!({}))
            .build()
            .unwrap_err();
        assert!(matches!(err, MessagingError::IncompleteMessage("key")));
    }

    #[test]
    fn test_decode_reads_payload() {
        #[derive(Deserialize)]
        struct Report {
            status: String,
        }

        let message = Message::builder()
            .topic("kitchen-events")
            .key("42")
            .payload_raw(serde_json::json!({ "status": "PREPARING" }))
            .build()
            .unwrap();
        assert_eq!(message.decode::<Report>().unwrap().status, "PREPARING");
        assert!(message.event_type.is_none());
    }
}
