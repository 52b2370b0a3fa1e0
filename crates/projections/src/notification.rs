//! Order confirmation notifications.

use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use domain::{OrderCreated, topics};
use messaging::Message;

use crate::{ConsumeOutcome, EventConsumer, Result};

/// Outbound SMS channel.
#[async_trait]
pub trait SmsGateway: Send + Sync {
    /// Sends `text` to `recipient`. Returns whether the gateway accepted it.
    async fn send(&self, recipient: &str, text: &str) -> bool;
}

#[derive(Debug, Default)]
struct SmsState {
    sent: Vec<(String, String)>,
    failing: bool,
}

/// Records messages instead of sending them.
#[derive(Debug, Clone, Default)]
pub struct InMemorySmsGateway {
    state: Arc<Mutex<SmsState>>,
}

impl InMemorySmsGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every send fail until reset.
    pub fn set_failing(&self, failing: bool) {
        self.lock().failing = failing;
    }

    /// Accepted messages as `(recipient, text)`, oldest first.
    pub fn sent(&self) -> Vec<(String, String)> {
        self.lock().sent.clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, SmsState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl SmsGateway for InMemorySmsGateway {
    async fn send(&self, recipient: &str, text: &str) -> bool {
        let mut state = self.lock();
        if state.failing {
            return false;
        }
        state.sent.push((recipient.to_string(), text.to_string()));
        true
    }
}

/// Confirmation text for a newly approved order.
pub fn confirmation_text(event: &OrderCreated) -> String {
    format!(
        "Hi {}, your order #{} from {} (total: Rs.{}) has been confirmed!",
        event.consumer_name, event.order_id, event.restaurant_name, event.total_amount
    )
}

/// Texts the consumer when their order is created.
///
/// Duplicate deliveries produce duplicate texts.
pub struct NotificationConsumer {
    gateway: Arc<dyn SmsGateway>,
}

impl NotificationConsumer {
    pub fn new(gateway: Arc<dyn SmsGateway>) -> Self {
        Self { gateway }
    }
}

#[async_trait]
impl EventConsumer for NotificationConsumer {
    fn name(&self) -> &'static str {
        "notification"
    }

    fn topic(&self) -> &'static str {
        topics::ORDER_EVENTS
    }

    #[tracing::instrument(skip(self, message), fields(key = %message.key))]
    async fn handle(&self, message: &Message) -> Result<ConsumeOutcome> {
        let event: OrderCreated = message.decode()?;
        let text = confirmation_text(&event);

        if self.gateway.send(&event.consumer_contact, &text).await {
            tracing::info!(order_id = %event.order_id, "confirmation sent");
            metrics::counter!("notifications_sent_total").increment(1);
            Ok(ConsumeOutcome::Applied)
        } else {
            tracing::error!(order_id = %event.order_id, "failed to send confirmation");
            metrics::counter!("notifications_failed_total").increment(1);
            Ok(ConsumeOutcome::Dropped)
        }
    }
}
