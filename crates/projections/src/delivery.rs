use async_trait::async_trait;
use domain::{DeliveryStatusChanged, OrderRepository, OrderStatus, topics};
use messaging::Message;

use crate::status::{Mapping, converge};
use crate::{ConsumeOutcome, EventConsumer, Result};

pub(crate) fn map_delivery_status(token: &str) -> Mapping {
    match token {
        "PICKED_UP" => Mapping::Advance(OrderStatus::PickedUp),
        "DELIVERED" => Mapping::Advance(OrderStatus::Delivered),
        _ => Mapping::Unknown,
    }
}

/// Converges orders from courier reports.
pub struct DeliveryStatusConsumer<R: OrderRepository> {
    repository: R,
}

impl<R: OrderRepository> DeliveryStatusConsumer<R> {
    pub fn new(repository: R) -> Self {
        Self { repository }
    }
}

#[async_trait]
impl<R: OrderRepository> EventConsumer for DeliveryStatusConsumer<R> {
    fn name(&self) -> &'static str {
        "delivery-status"
    }

    fn topic(&self) -> &'static str {
        topics::DELIVERY_EVENTS
    }

    #[tracing::instrument(skip(self, message), fields(key = %message.key))]
    async fn handle(&self, message: &Message) -> Result<ConsumeOutcome> {
        let event: DeliveryStatusChanged = message.decode()?;
        tracing::info!(
            order_id = %event.order_id,
            delivery_id = %event.delivery_id,
            new_status = %event.new_status,
            "received DeliveryStatusChanged"
        );

        match map_delivery_status(&event.new_status) {
            Mapping::Advance(target) => {
                converge(&self.repository, self.name(), event.order_id, target).await
            }
            Mapping::Ignore => Ok(ConsumeOutcome::Unchanged),
            Mapping::Unknown => {
                tracing::warn!(order_id = %event.order_id, new_status = %event.new_status, "unknown delivery status");
                Ok(ConsumeOutcome::Dropped)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delivery_tokens() {
        assert_eq!(
            map_delivery_status("PICKED_UP"),
            Mapping::Advance(OrderStatus::PickedUp)
        );
        assert_eq!(
            map_delivery_status("DELIVERED"),
            Mapping::Advance(OrderStatus::Delivered)
        );
        assert_eq!(map_delivery_status("ASSIGNED"), Mapping::Unknown);
    }
}
