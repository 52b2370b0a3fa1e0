//! Background publication of order events.

use std::sync::{Arc, Mutex, PoisonError};

use domain::OrderCreated;
use messaging::{Publisher, PublisherExt};
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;
use tracing::Instrument;

/// Worker pool sizing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PublisherConfig {
    pub workers: usize,
    pub queue_capacity: usize,
}

impl Default for PublisherConfig {
    fn default() -> Self {
        Self {
            workers: 2,
            queue_capacity: 25,
        }
    }
}

/// Publishes `OrderCreated` events from a bounded queue on a small pool of
/// worker tasks.
///
/// Enqueueing never waits. When the queue is full the event is dropped and
/// logged; failed publishes are logged and not retried.
pub struct OrderEventPublisher {
    sender: Mutex<Option<mpsc::Sender<OrderCreated>>>,
    workers: Mutex<Vec<JoinHandle<()>>>,
}

impl OrderEventPublisher {
    /// Starts the worker pool. Must be called inside a Tokio runtime.
    pub fn spawn(publisher: Arc<dyn Publisher>, config: PublisherConfig) -> Self {
        let (sender, receiver) = mpsc::channel(config.queue_capacity.max(1));
        let receiver = Arc::new(tokio::sync::Mutex::new(receiver));

        let workers = (1..=config.workers.max(1))
            .map(|worker| {
                let publisher = publisher.clone();
                let receiver = receiver.clone();
                tokio::spawn(
                    run_worker(publisher, receiver)
                        .instrument(tracing::info_span!("event-publisher", worker)),
                )
            })
            .collect();

        Self {
            sender: Mutex::new(Some(sender)),
            workers: Mutex::new(workers),
        }
    }

    /// Queues `event` for publication. Returns `false` if it was dropped.
    pub fn publish_order_created(&self, event: OrderCreated) -> bool {
        let sender = self.sender.lock().unwrap_or_else(PoisonError::into_inner);
        let Some(sender) = sender.as_ref() else {
            tracing::error!(order_id = %event.order_id, "event publisher is shut down, dropping OrderCreated");
            metrics::counter!("events_dropped_total", "reason" => "shut_down").increment(1);
            return false;
        };

        match sender.try_send(event) {
            Ok(()) => true,
            Err(TrySendError::Full(event)) => {
                tracing::error!(order_id = %event.order_id, "event queue full, dropping OrderCreated");
                metrics::counter!("events_dropped_total", "reason" => "queue_full").increment(1);
                false
            }
            Err(TrySendError::Closed(event)) => {
                tracing::error!(order_id = %event.order_id, "event workers stopped, dropping OrderCreated");
                metrics::counter!("events_dropped_total", "reason" => "shut_down").increment(1);
                false
            }
        }
    }

    /// Stops accepting events and waits until the queued ones are handled.
    pub async fn shutdown(&self) {
        self.sender
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        let workers = std::mem::take(&mut *self.workers.lock().unwrap_or_else(PoisonError::into_inner));
        for worker in workers {
            if let Err(e) = worker.await {
                tracing::error!(error = %e, "event publisher worker panicked");
            }
        }
    }
}

async fn run_worker(
    publisher: Arc<dyn Publisher>,
    receiver: Arc<tokio::sync::Mutex<mpsc::Receiver<OrderCreated>>>,
) {
    loop {
        let next = receiver.lock().await.recv().await;
        let Some(event) = next else {
            break;
        };

        match publisher.publish_event(&event).await {
            Ok(()) => {
                tracing::debug!(order_id = %event.order_id, "OrderCreated published");
                metrics::counter!("events_published_total").increment(1);
            }
            Err(e) => {
                tracing::error!(order_id = %event.order_id, error = %e, "failed to publish OrderCreated");
                metrics::counter!("events_dropped_total", "reason" => "publish_failed").increment(1);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use async_trait::async_trait;
    use common::OrderId;
    use domain::Money;
    use messaging::{InMemoryBus, Message};
    use tokio::sync::Notify;

    use super::*;

    fn event() -> OrderCreated {
        OrderCreated {
            order_id: OrderId::new(),
            consumer_name: "Asha".into(),
            consumer_contact: "+91999".into(),
            restaurant_name: "Dosa Point".into(),
            total_amount: Money::from_minor(2000),
        }
    }

    /// Publisher that blocks until released.
    struct Gate(Arc<Notify>);

    #[async_trait]
    impl Publisher for Gate {
        async fn publish(&self, _message: Message) -> messaging::Result<()> {
            self.0.notified().await;
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_queued_events_are_published() {
        let bus = InMemoryBus::new(3);
        let publisher = OrderEventPublisher::spawn(Arc::new(bus.clone()), PublisherConfig::default());

        for _ in 0..5 {
            assert!(publisher.publish_order_created(event()));
        }
        publisher.shutdown().await;

        assert_eq!(bus.published_count("order-events").await, 5);
    }

    #[tokio::test]
    async fn test_full_queue_drops_without_blocking() {
        let gate = Arc::new(Notify::new());
        let publisher = OrderEventPublisher::spawn(
            Arc::new(Gate(gate.clone())),
            PublisherConfig {
                workers: 1,
                queue_capacity: 1,
            },
        );

        // One event is held by the worker, one fills the queue.
        assert!(publisher.publish_order_created(event()));
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(publisher.publish_order_created(event()));
        assert!(!publisher.publish_order_created(event()));

        gate.notify_one();
        gate.notify_one();
    }

    #[tokio::test]
    async fn test_publish_after_shutdown_is_dropped() {
        let bus = InMemoryBus::new(1);
        let publisher = OrderEventPublisher::spawn(Arc::new(bus), PublisherConfig::default());
        publisher.shutdown().await;
        assert!(!publisher.publish_order_created(event()));
    }

    #[tokio::test]
    async fn test_broker_failure_does_not_stop_workers() {
        let bus = InMemoryBus::new(1);
        bus.set_fail_on_publish(true).await;
        let publisher = OrderEventPublisher::spawn(
            Arc::new(bus.clone()),
            PublisherConfig {
                workers: 1,
                queue_capacity: 4,
            },
        );
        assert!(publisher.publish_order_created(event()));
        tokio::time::sleep(Duration::from_millis(20)).await;

        bus.set_fail_on_publish(false).await;
        assert!(publisher.publish_order_created(event()));
        publisher.shutdown().await;
        assert_eq!(bus.published_count("order-events").await, 1);
    }
}
