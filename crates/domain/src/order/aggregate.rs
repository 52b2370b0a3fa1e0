//! The order aggregate.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use common::{ConsumerId, OrderId, RestaurantId};
use serde::{Deserialize, Serialize};

use super::{LineItem, Money, OrderStatus, PaymentStatus, Version};
use crate::{DomainError, Result};

/// Everything needed to place an order, gathered by the orchestrator
/// before anything is persisted.
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub consumer_id: ConsumerId,
    pub consumer_name: String,
    pub consumer_contact: String,
    pub restaurant_id: RestaurantId,
    pub restaurant_name: String,
    pub delivery_address: String,
    pub payment_method: String,
    pub items: Vec<LineItem>,
}

/// Result of applying a downstream status report to an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Convergence {
    /// The status moved forward.
    Applied { from: OrderStatus, to: OrderStatus },
    /// The order is already at or beyond the reported status, or the
    /// report is already held back.
    Stale { current: OrderStatus },
    /// The report is ahead of the order and is held back until every
    /// status before it has been reached.
    Deferred {
        current: OrderStatus,
        target: OrderStatus,
    },
    /// The order was cancelled; it never leaves that state.
    Cancelled,
}

impl Convergence {
    pub const fn is_applied(&self) -> bool {
        matches!(self, Self::Applied { .. })
    }
}

/// A customer order.
///
/// The total is computed once in [`Order::place`] and never recomputed,
/// and the line items are a snapshot of the menu at that moment.
///
/// The status only ever moves one step at a time along the fulfilment path.
/// Reports that arrive ahead of that path are kept in `deferred_statuses`
/// and applied as soon as the order catches up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub(crate) id: OrderId,
    pub(crate) consumer_id: ConsumerId,
    pub(crate) consumer_name: String,
    pub(crate) consumer_contact: String,
    pub(crate) restaurant_id: RestaurantId,
    pub(crate) restaurant_name: String,
    pub(crate) delivery_address: String,
    pub(crate) payment_method: String,
    pub(crate) items: Vec<LineItem>,
    pub(crate) total_amount: Money,
    pub(crate) status: OrderStatus,
    #[serde(default)]
    pub(crate) deferred_statuses: BTreeSet<OrderStatus>,
    pub(crate) payment_status: PaymentStatus,
    pub(crate) payment_transaction_id: Option<String>,
    pub(crate) ticket_id: Option<String>,
    pub(crate) delivery_id: Option<String>,
    pub(crate) created_at: DateTime<Utc>,
    pub(crate) updated_at: DateTime<Utc>,
    pub(crate) version: Version,
}

impl Order {
    /// Builds a `PENDING` order with a fresh id.
    ///
    /// # Errors
    ///
    /// Returns `NoItems` for an empty item list and `InvalidQuantity` for
    /// any line with a zero quantity.
    pub fn place(new: NewOrder) -> Result<Self> {
        if new.items.is_empty() {
            return Err(DomainError::NoItems);
        }
        if let Some(item) = new.items.iter().find(|i| i.quantity == 0) {
            return Err(DomainError::InvalidQuantity {
                item: item.name.clone(),
                quantity: item.quantity,
            });
        }

        let total_amount = new.items.iter().map(LineItem::total_price).sum();
        let now = Utc::now();

        Ok(Self {
            id: OrderId::new(),
            consumer_id: new.consumer_id,
            consumer_name: new.consumer_name,
            consumer_contact: new.consumer_contact,
            restaurant_id: new.restaurant_id,
            restaurant_name: new.restaurant_name,
            delivery_address: new.delivery_address,
            payment_method: new.payment_method,
            items: new.items,
            total_amount,
            status: OrderStatus::Pending,
            deferred_statuses: BTreeSet::new(),
            payment_status: PaymentStatus::Pending,
            payment_transaction_id: None,
            ticket_id: None,
            delivery_id: None,
            created_at: now,
            updated_at: now,
            version: Version::initial(),
        })
    }

    pub fn id(&self) -> OrderId {
        self.id
    }

    pub fn consumer_id(&self) -> ConsumerId {
        self.consumer_id
    }

    pub fn consumer_name(&self) -> &str {
        &self.consumer_name
    }

    pub fn consumer_contact(&self) -> &str {
        &self.consumer_contact
    }

    pub fn restaurant_id(&self) -> RestaurantId {
        self.restaurant_id
    }

    pub fn restaurant_name(&self) -> &str {
        &self.restaurant_name
    }

    pub fn delivery_address(&self) -> &str {
        &self.delivery_address
    }

    pub fn payment_method(&self) -> &str {
        &self.payment_method
    }

    pub fn items(&self) -> &[LineItem] {
        &self.items
    }

    pub fn total_amount(&self) -> Money {
        self.total_amount
    }

    pub fn status(&self) -> OrderStatus {
        self.status
    }

    /// Fulfilment reports received ahead of the current status.
    pub fn deferred_statuses(&self) -> &BTreeSet<OrderStatus> {
        &self.deferred_statuses
    }

    pub fn payment_status(&self) -> PaymentStatus {
        self.payment_status
    }

    pub fn payment_transaction_id(&self) -> Option<&str> {
        self.payment_transaction_id.as_deref()
    }

    pub fn ticket_id(&self) -> Option<&str> {
        self.ticket_id.as_deref()
    }

    pub fn delivery_id(&self) -> Option<&str> {
        self.delivery_id.as_deref()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Version of the stored record this copy was loaded from.
    pub fn version(&self) -> Version {
        self.version
    }

    /// `"2x Dosa, 1x Coffee"`, as sent to the kitchen.
    pub fn items_summary(&self) -> String {
        self.items
            .iter()
            .map(LineItem::summary)
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Records an authorized payment with the gateway transaction id, if
    /// the gateway sent one.
    pub fn authorize_payment(&mut self, transaction_id: Option<String>) {
        self.payment_status = PaymentStatus::Authorized;
        self.payment_transaction_id = transaction_id;
        self.touch();
    }

    pub fn fail_payment(&mut self) {
        self.payment_status = PaymentStatus::Failed;
        self.touch();
    }

    pub fn attach_ticket(&mut self, ticket_id: impl Into<String>) {
        self.ticket_id = Some(ticket_id.into());
        self.touch();
    }

    pub fn attach_delivery(&mut self, delivery_id: impl Into<String>) {
        self.delivery_id = Some(delivery_id.into());
        self.touch();
    }

    /// `PENDING -> APPROVED`, followed by any fulfilment reports that were
    /// held back while the order was pending.
    pub fn approve(&mut self) -> Result<()> {
        if !self.status.can_approve() {
            return Err(self.invalid_transition("approve"));
        }
        self.status = OrderStatus::Approved;
        self.apply_deferred();
        self.touch();
        Ok(())
    }

    /// `PENDING | APPROVED -> CANCELLED`.
    pub fn cancel(&mut self) -> Result<()> {
        if !self.status.can_cancel() {
            return Err(self.invalid_transition("cancel"));
        }
        self.status = OrderStatus::Cancelled;
        self.deferred_statuses.clear();
        self.touch();
        Ok(())
    }

    /// Applies a fulfilment report.
    ///
    /// Kitchen and courier reports arrive on independent streams and can
    /// overtake each other or the saga itself. A report for the immediate
    /// successor of the current status is applied, together with any
    /// held-back reports it unblocks. A report further ahead, or any report
    /// while the order is still `PENDING`, is held back. Repeats, reports
    /// behind the current status, and reports for a `CANCELLED` order
    /// change nothing.
    pub fn converge(&mut self, target: OrderStatus) -> Convergence {
        let current = self.status;
        if current == OrderStatus::Cancelled {
            return Convergence::Cancelled;
        }
        if !target.is_fulfilment() || target <= current || self.deferred_statuses.contains(&target)
        {
            return Convergence::Stale { current };
        }
        if current.next() != Some(target) {
            self.deferred_statuses.insert(target);
            self.touch();
            return Convergence::Deferred { current, target };
        }

        self.status = target;
        self.apply_deferred();
        self.touch();
        Convergence::Applied {
            from: current,
            to: self.status,
        }
    }

    fn apply_deferred(&mut self) {
        while let Some(next) = self.status.next() {
            if !self.deferred_statuses.remove(&next) {
                break;
            }
            self.status = next;
        }
    }

    fn invalid_transition(&self, action: &'static str) -> DomainError {
        DomainError::InvalidStatusTransition {
            order_id: self.id,
            from: self.status,
            action,
        }
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use common::MenuItemId;

    use super::*;

    fn new_order(items: Vec<LineItem>) -> NewOrder {
        NewOrder {
            consumer_id: ConsumerId::new(1),
            consumer_name: "Asha".into(),
            consumer_contact: "+911234567890".into(),
            restaurant_id: RestaurantId::new(10),
            restaurant_name: "Dosa Point".into(),
            delivery_address: "12 MG Road".into(),
            payment_method: "CARD".into(),
            items,
        }
    }

    fn approved_order() -> Order {
        let mut order = Order::place(new_order(vec![LineItem::new(
            MenuItemId::new(1),
            "Dosa",
            Money::from_minor(500),
            1,
        )]))
        .unwrap();
        order.approve().unwrap();
        order
    }

    #[test]
    fn test_place_computes_total_once() {
        let order = Order::place(new_order(vec![
            LineItem::new(MenuItemId::new(1), "Dosa", Money::from_minor(500), 2),
            LineItem::new(MenuItemId::new(2), "Coffee", Money::from_minor(1000), 1),
        ]))
        .unwrap();

        assert_eq!(order.total_amount(), Money::from_minor(2000));
        assert_eq!(order.status(), OrderStatus::Pending);
        assert_eq!(order.payment_status(), PaymentStatus::Pending);
        assert!(order.version().is_initial());
        assert_eq!(order.items_summary(), "2x Dosa, 1x Coffee");
    }

    #[test]
    fn test_place_rejects_empty_and_zero_quantity() {
        assert!(matches!(
            Order::place(new_order(vec![])),
            Err(DomainError::NoItems)
        ));
        let err = Order::place(new_order(vec![LineItem::new(
            MenuItemId::new(1),
            "Dosa",
            Money::from_minor(500),
            0,
        )]))
        .unwrap_err();
        assert!(matches!(err, DomainError::InvalidQuantity { quantity: 0, .. }));
    }

    #[test]
    fn test_approve_only_from_pending() {
        let mut order = approved_order();
        assert!(matches!(
            order.approve(),
            Err(DomainError::InvalidStatusTransition { from: OrderStatus::Approved, .. })
        ));
    }

    #[test]
    fn test_cancel_after_preparation_is_rejected() {
        let mut order = approved_order();
        order.converge(OrderStatus::Preparing);
        assert!(order.cancel().is_err());
        assert_eq!(order.status(), OrderStatus::Preparing);
    }

    #[test]
    fn test_converge_moves_forward_and_ignores_repeats() {
        let mut order = approved_order();
        assert_eq!(
            order.converge(OrderStatus::Preparing),
            Convergence::Applied {
                from: OrderStatus::Approved,
                to: OrderStatus::Preparing
            }
        );
        assert_eq!(
            order.converge(OrderStatus::Preparing),
            Convergence::Stale {
                current: OrderStatus::Preparing
            }
        );
    }

    #[test]
    fn test_converge_never_skips_or_goes_back() {
        let mut order = approved_order();
        assert_eq!(
            order.converge(OrderStatus::Delivered),
            Convergence::Deferred {
                current: OrderStatus::Approved,
                target: OrderStatus::Delivered
            }
        );
        assert_eq!(order.status(), OrderStatus::Approved);

        assert!(order.converge(OrderStatus::Preparing).is_applied());
        assert!(order.converge(OrderStatus::ReadyForPickup).is_applied());
        assert_eq!(order.status(), OrderStatus::ReadyForPickup);
        assert!(!order.converge(OrderStatus::Preparing).is_applied());

        assert_eq!(
            order.converge(OrderStatus::PickedUp),
            Convergence::Applied {
                from: OrderStatus::ReadyForPickup,
                to: OrderStatus::Delivered
            }
        );
        assert!(order.deferred_statuses().is_empty());
    }

    #[test]
    fn test_repeated_deferred_report_is_stale() {
        let mut order = approved_order();
        assert!(matches!(
            order.converge(OrderStatus::PickedUp),
            Convergence::Deferred { .. }
        ));
        assert_eq!(
            order.converge(OrderStatus::PickedUp),
            Convergence::Stale {
                current: OrderStatus::Approved
            }
        );
        assert_eq!(order.deferred_statuses().len(), 1);
    }

    #[test]
    fn test_reports_while_pending_apply_on_approval() {
        let mut order = Order::place(new_order(vec![LineItem::new(
            MenuItemId::new(1),
            "Dosa",
            Money::from_minor(500),
            1,
        )]))
        .unwrap();
        assert_eq!(
            order.converge(OrderStatus::Preparing),
            Convergence::Deferred {
                current: OrderStatus::Pending,
                target: OrderStatus::Preparing
            }
        );
        assert_eq!(order.status(), OrderStatus::Pending);

        order.approve().unwrap();
        assert_eq!(order.status(), OrderStatus::Preparing);
        assert!(order.deferred_statuses().is_empty());
    }

    #[test]
    fn test_converge_leaves_cancelled_orders_alone() {
        let mut cancelled = approved_order();
        cancelled.converge(OrderStatus::PickedUp);
        cancelled.cancel().unwrap();
        assert!(cancelled.deferred_statuses().is_empty());
        assert_eq!(
            cancelled.converge(OrderStatus::Preparing),
            Convergence::Cancelled
        );
        assert_eq!(cancelled.status(), OrderStatus::Cancelled);
    }

    #[test]
    fn test_non_fulfilment_targets_are_stale() {
        let mut order = approved_order();
        assert!(!order.converge(OrderStatus::Approved).is_applied());
        assert!(!order.converge(OrderStatus::Cancelled).is_applied());
        assert_eq!(order.status(), OrderStatus::Approved);
    }

    #[test]
    fn test_payment_details_are_recorded() {
        let mut order = approved_order();
        order.authorize_payment(Some("TXN-1".into()));
        order.attach_ticket("TICKET-9");
        assert_eq!(order.payment_status(), PaymentStatus::Authorized);
        assert_eq!(order.payment_transaction_id(), Some("TXN-1"));
        assert_eq!(order.ticket_id(), Some("TICKET-9"));
        assert_eq!(order.delivery_id(), None);
    }

    #[test]
    fn test_authorized_payment_without_transaction_id() {
        let mut order = approved_order();
        order.authorize_payment(None);
        assert_eq!(order.payment_status(), PaymentStatus::Authorized);
        assert_eq!(order.payment_transaction_id(), None);
    }
}
