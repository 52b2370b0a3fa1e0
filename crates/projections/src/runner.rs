//! Listener tasks for a set of consumers.

use std::sync::Arc;

use futures_util::StreamExt;
use messaging::{Message, Subscriber};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::Instrument;

use crate::{ConsumeOutcome, EventConsumer, Result};

/// Runs each consumer on its own task until shutdown.
pub struct ConsumerRunner {
    shutdown: watch::Sender<bool>,
    handles: Vec<JoinHandle<()>>,
}

impl ConsumerRunner {
    /// Subscribes every consumer to its topic and spawns its listener.
    ///
    /// Subscriptions are opened before this returns, so messages published
    /// afterwards are never missed.
    pub async fn start(
        subscriber: &dyn Subscriber,
        consumers: Vec<Arc<dyn EventConsumer>>,
    ) -> Result<Self> {
        let (shutdown, _) = watch::channel(false);
        let mut handles = Vec::with_capacity(consumers.len());

        for consumer in consumers {
            let mut stream = subscriber.subscribe(consumer.topic()).await?;
            let mut stop = shutdown.subscribe();
            let span = tracing::info_span!("event-consumer", consumer = consumer.name());
            tracing::info!(consumer = consumer.name(), topic = consumer.topic(), "consumer started");

            handles.push(tokio::spawn(
                async move {
                    loop {
                        tokio::select! {
                            _ = stop.changed() => break,
                            next = stream.next() => match next {
                                Some(message) => {
                                    dispatch(consumer.as_ref(), &message).await;
                                }
                                None => break,
                            },
                        }
                    }
                    tracing::info!("consumer stopped");
                }
                .instrument(span),
            ));
        }

        Ok(Self { shutdown, handles })
    }

    /// Stops all listeners and waits for them to finish their current
    /// message.
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(true);
        for handle in self.handles {
            if let Err(e) = handle.await {
                tracing::error!(error = %e, "consumer task failed");
            }
        }
    }
}

/// Handles one message. Errors are logged and the message is dropped.
pub async fn dispatch(consumer: &dyn EventConsumer, message: &Message) -> ConsumeOutcome {
    let outcome = match consumer.handle(message).await {
        Ok(outcome) => outcome,
        Err(e) => {
            tracing::error!(key = %message.key, error = %e, "failed to handle message");
            ConsumeOutcome::Dropped
        }
    };

    metrics::counter!(
        "events_consumed_total",
        "consumer" => consumer.name(),
        "outcome" => outcome.as_str()
    )
    .increment(1);
    outcome
}
