//! Status convergence shared by the ticket and delivery consumers.

use common::OrderId;
use domain::{Convergence, DomainError, OrderRepository, OrderRepositoryExt, OrderStatus};

use crate::{ConsumeOutcome, Result};

/// How a downstream status token maps onto the order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Mapping {
    Advance(OrderStatus),
    /// Known token that does not move the order.
    Ignore,
    Unknown,
}

/// Applies `target` to the order one step at a time, holding back reports
/// that arrive ahead of it.
pub(crate) async fn converge<R: OrderRepository>(
    repository: &R,
    consumer: &'static str,
    order_id: OrderId,
    target: OrderStatus,
) -> Result<ConsumeOutcome> {
    match repository
        .update_with(order_id, |order| Ok(order.converge(target)))
        .await
    {
        Ok((_, Convergence::Applied { from, to })) => {
            tracing::info!(consumer, %order_id, %from, %to, "order status updated");
            Ok(ConsumeOutcome::Applied)
        }
        Ok((_, Convergence::Stale { current })) => {
            tracing::debug!(consumer, %order_id, %current, %target, "status already reached, ignoring");
            Ok(ConsumeOutcome::Unchanged)
        }
        Ok((_, Convergence::Deferred { current, .. })) => {
            tracing::info!(consumer, %order_id, %current, %target, "status report deferred until order catches up");
            Ok(ConsumeOutcome::Deferred)
        }
        Ok((_, Convergence::Cancelled)) => {
            tracing::warn!(consumer, %order_id, %target, "order was cancelled, ignoring status");
            Ok(ConsumeOutcome::Unchanged)
        }
        Err(DomainError::OrderNotFound(_)) => {
            tracing::warn!(consumer, %order_id, "order not found for status update");
            Ok(ConsumeOutcome::Dropped)
        }
        Err(e) => Err(e.into()),
    }
}
