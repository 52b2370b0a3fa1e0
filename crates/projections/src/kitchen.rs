use async_trait::async_trait;
use domain::{OrderRepository, OrderStatus, TicketStatusChanged, topics};
use messaging::Message;

use crate::status::{Mapping, converge};
use crate::{ConsumeOutcome, EventConsumer, Result};

/// Maps a kitchen ticket status onto the order.
pub(crate) fn map_ticket_status(token: &str) -> Mapping {
    match token {
        "ACCEPTED" => Mapping::Ignore,
        "PREPARING" => Mapping::Advance(OrderStatus::Preparing),
        "READY_FOR_PICKUP" => Mapping::Advance(OrderStatus::ReadyForPickup),
        _ => Mapping::Unknown,
    }
}

/// Converges orders from kitchen ticket reports.
pub struct TicketStatusConsumer<R: OrderRepository> {
    repository: R,
}

impl<R: OrderRepository> TicketStatusConsumer<R> {
    pub fn new(repository: R) -> Self {
        Self { repository }
    }
}

#[async_trait]
impl<R: OrderRepository> EventConsumer for TicketStatusConsumer<R> {
    fn name(&self) -> &'static str {
        "ticket-status"
    }

    fn topic(&self) -> &'static str {
        topics::KITCHEN_EVENTS
    }

    #[tracing::instrument(skip(self, message), fields(key = %message.key))]
    async fn handle(&self, message: &Message) -> Result<ConsumeOutcome> {
        let event: TicketStatusChanged = message.decode()?;
        tracing::info!(
            order_id = %event.order_id,
            ticket_id = %event.ticket_id,
            new_status = %event.new_status,
            "received TicketStatusChanged"
        );

        match map_ticket_status(&event.new_status) {
            Mapping::Advance(target) => {
                converge(&self.repository, self.name(), event.order_id, target).await
            }
            Mapping::Ignore => {
                tracing::info!(order_id = %event.order_id, "ticket accepted, no order status change");
                Ok(ConsumeOutcome::Unchanged)
            }
            Mapping::Unknown => {
                tracing::warn!(order_id = %event.order_id, new_status = %event.new_status, "unknown ticket status");
                Ok(ConsumeOutcome::Dropped)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ticket_tokens() {
        assert_eq!(map_ticket_status("ACCEPTED"), Mapping::Ignore);
        assert_eq!(
            map_ticket_status("PREPARING"),
            Mapping::Advance(OrderStatus::Preparing)
        );
        assert_eq!(
            map_ticket_status("READY_FOR_PICKUP"),
            Mapping::Advance(OrderStatus::ReadyForPickup)
        );
        assert_eq!(map_ticket_status("DELIVERED"), Mapping::Unknown);
        assert_eq!(map_ticket_status("preparing"), Mapping::Unknown);
    }
}
