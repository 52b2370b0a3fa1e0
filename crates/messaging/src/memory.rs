use std::collections::{HashMap, VecDeque};
use std::hash::{DefaultHasher, Hash, Hasher};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{RwLock, mpsc};

use crate::{
    Message, MessagingError, Result,
    bus::{MessageStream, Publisher, Subscriber},
};

/// Message with the partition it was routed to.
#[derive(Debug, Clone)]
pub struct Delivered {
    pub partition: u32,
    pub offset: u64,
    pub message: Message,
}

/// Default number of messages retained per partition.
pub const DEFAULT_RETENTION: usize = 1024;

/// The retained tail of one partition's log.
#[derive(Default, Clone)]
struct Partition {
    /// Offset of the oldest retained message.
    base_offset: u64,
    log: VecDeque<Message>,
}

impl Partition {
    fn append(&mut self, message: Message, retention: usize) {
        self.log.push_back(message);
        while self.log.len() > retention {
            self.log.pop_front();
            self.base_offset += 1;
        }
    }
}

#[derive(Default)]
struct Topic {
    partitions: Vec<Partition>,
    subscribers: Vec<mpsc::UnboundedSender<Message>>,
}

#[derive(Default)]
struct BusState {
    topics: HashMap<String, Topic>,
    fail_on_publish: bool,
}

/// In-memory partitioned message bus.
///
/// Keys are hashed onto a fixed number of partitions per topic, and every
/// subscriber of a topic receives each message once, in publish order.
/// Each partition keeps only its most recent messages for inspection.
/// Clones share the same bus.
#[derive(Clone)]
pub struct InMemoryBus {
    partitions: u32,
    retention: usize,
    state: Arc<RwLock<BusState>>,
}

impl Default for InMemoryBus {
    fn default() -> Self {
        Self::new(3)
    }
}

impl InMemoryBus {
    /// Creates a bus with `partitions` partitions per topic (at least one)
    /// and [`DEFAULT_RETENTION`].
    pub fn new(partitions: u32) -> Self {
        Self::with_retention(partitions, DEFAULT_RETENTION)
    }

    /// Creates a bus that keeps the last `retention` messages (at least one)
    /// of every partition.
    pub fn with_retention(partitions: u32, retention: usize) -> Self {
        Self {
            partitions: partitions.max(1),
            retention: retention.max(1),
            state: Arc::default(),
        }
    }

    pub fn partitions(&self) -> u32 {
        self.partitions
    }

    /// Partition a key is routed to.
    pub fn partition_for(&self, key: &str) -> u32 {
        let mut hasher = DefaultHasher::new();
        key.hash(&mut hasher);
        (hasher.finish() % u64::from(self.partitions)) as u32
    }

    /// Makes every subsequent publish fail until reset.
    pub async fn set_fail_on_publish(&self, fail: bool) {
        self.state.write().await.fail_on_publish = fail;
    }

    /// Retained messages of `topic`, grouped by partition and in offset
    /// order within each partition.
    pub async fn published(&self, topic: &str) -> Vec<Delivered> {
        let state = self.state.read().await;
        let Some(topic) = state.topics.get(topic) else {
            return Vec::new();
        };
        topic
            .partitions
            .iter()
            .enumerate()
            .flat_map(|(index, partition)| {
                partition
                    .log
                    .iter()
                    .zip(partition.base_offset..)
                    .map(move |(message, offset)| Delivered {
                        partition: index as u32,
                        offset,
                        message: message.clone(),
                    })
            })
            .collect()
    }

    /// Number of messages ever accepted on `topic`, trimmed ones included.
    pub async fn published_count(&self, topic: &str) -> usize {
        self.state
            .read()
            .await
            .topics
            .get(topic)
            .map(|t| {
                t.partitions
                    .iter()
                    .map(|p| p.base_offset as usize + p.log.len())
                    .sum()
            })
            .unwrap_or(0)
    }

    fn new_topic(&self) -> Topic {
        Topic {
            partitions: vec![Partition::default(); self.partitions as usize],
            subscribers: Vec::new(),
        }
    }
}

#[async_trait]
impl Publisher for InMemoryBus {
    async fn publish(&self, message: Message) -> Result<()> {
        let partition = self.partition_for(&message.key);
        let mut state = self.state.write().await;

        if state.fail_on_publish {
            return Err(MessagingError::PublishFailed {
                topic: message.topic,
                reason: "broker unavailable".to_string(),
            });
        }

        let topic = state
            .topics
            .entry(message.topic.clone())
            .or_insert_with(|| self.new_topic());

        // Subscribers whose stream was dropped are pruned here.
        topic
            .subscribers
            .retain(|tx| tx.send(message.clone()).is_ok());

        tracing::trace!(
            topic = %message.topic,
            key = %message.key,
            partition,
            "message published"
        );
        metrics::counter!("bus_messages_total", "topic" => message.topic.clone()).increment(1);
        topic.partitions[partition as usize].append(message, self.retention);
        Ok(())
    }
}

#[async_trait]
impl Subscriber for InMemoryBus {
    async fn subscribe(&self, topic: &str) -> Result<MessageStream> {
        use futures_util::stream;

        let (tx, rx) = mpsc::unbounded_channel();
        self.state
            .write()
            .await
            .topics
            .entry(topic.to_string())
            .or_insert_with(|| self.new_topic())
            .subscribers
            .push(tx);

        let stream = stream::unfold(rx, |mut rx| async move {
            rx.recv().await.map(|message| (message, rx))
        });
        Ok(Box::pin(stream))
    }
}
