//! The order creation saga.

use std::time::Instant;

use common::{ConsumerId, OrderId};
use domain::{
    DomainError, LineItem, NewOrder, Order, OrderCreated, OrderRepository, OrderRepositoryExt,
    PaymentStatus,
};
use resilience::{CircuitBreakerState, DependencyGuard};
use serde::Serialize;

use crate::clients::DependencyClients;
use crate::error::{Result, SagaError};
use crate::publisher::OrderEventPublisher;
use crate::request::CreateOrderRequest;
use crate::services::{
    CreateDeliveryRequest, CreateTicketRequest, MenuItem, PaymentRequest, Restaurant,
};

/// Point-in-time resilience state of one dependency.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DependencyHealth {
    pub dependency: String,
    pub circuit_state: CircuitBreakerState,
    pub in_flight: usize,
    pub max_concurrent: usize,
}

impl From<&DependencyGuard> for DependencyHealth {
    fn from(guard: &DependencyGuard) -> Self {
        Self {
            dependency: guard.dependency().to_string(),
            circuit_state: guard.circuit_state(),
            in_flight: guard.bulkhead().in_flight(),
            max_concurrent: guard.bulkhead().max_concurrent(),
        }
    }
}

/// Runs the order creation saga.
///
/// Steps run sequentially, each one a possible abort point:
///
/// 1. look up the restaurant (must exist and be open)
/// 2. price the requested items
/// 3. persist the order as `PENDING`
/// 4. authorize payment
/// 5. create the kitchen ticket
/// 6. create the delivery
/// 7. queue `OrderCreated` for publication
/// 8. mark the order `APPROVED`
///
/// Nothing is persisted when steps 1-2 fail. Failures from step 4 onwards
/// leave the order in place below `APPROVED`; in particular a failure in
/// step 5 or 6, or in recording any step after payment, leaves a paid order
/// without any compensating refund. Every such error carries the order id.
pub struct OrderOrchestrator<R: OrderRepository> {
    repository: R,
    clients: DependencyClients,
    publisher: OrderEventPublisher,
}

impl<R: OrderRepository> OrderOrchestrator<R> {
    pub fn new(repository: R, clients: DependencyClients, publisher: OrderEventPublisher) -> Self {
        Self {
            repository,
            clients,
            publisher,
        }
    }

    pub fn repository(&self) -> &R {
        &self.repository
    }

    pub fn publisher(&self) -> &OrderEventPublisher {
        &self.publisher
    }

    /// Creates an order. On success the returned order is `APPROVED`, or
    /// further along if fulfilment reports overtook the saga.
    #[tracing::instrument(
        skip(self, request),
        fields(consumer_id = %request.consumer_id, restaurant_id = %request.restaurant_id)
    )]
    pub async fn create_order(&self, request: CreateOrderRequest) -> Result<Order> {
        let started = Instant::now();
        let result = self.run_saga(request).await;
        metrics::histogram!("saga_duration_seconds").record(started.elapsed().as_secs_f64());

        match &result {
            Ok(order) => {
                metrics::counter!("orders_created_total").increment(1);
                tracing::info!(order_id = %order.id(), total = %order.total_amount(), "order approved");
            }
            Err(e) => {
                metrics::counter!("orders_rejected_total", "reason" => e.reason()).increment(1);
                tracing::warn!(order_id = ?e.order_id(), error = %e, "order rejected");
            }
        }
        result
    }

    async fn run_saga(&self, request: CreateOrderRequest) -> Result<Order> {
        request.validate()?;

        // 1. Restaurant
        let restaurant = self
            .clients
            .restaurant
            .get_restaurant(request.restaurant_id)
            .await?
            .ok_or(SagaError::RestaurantNotFound(request.restaurant_id))?;
        if !restaurant.is_open {
            return Err(SagaError::RestaurantClosed {
                id: restaurant.id,
                name: restaurant.name,
            });
        }

        // 2. Prices
        let menu = self
            .clients
            .restaurant
            .get_menu_items(&request.menu_item_ids())
            .await?;
        let items = price_lines(&request, &restaurant, &menu)?;

        // 3. Persist PENDING
        let mut order = Order::place(NewOrder {
            consumer_id: request.consumer_id,
            consumer_name: request.consumer_name,
            consumer_contact: request.consumer_contact,
            restaurant_id: restaurant.id,
            restaurant_name: restaurant.name.clone(),
            delivery_address: request.delivery_address,
            payment_method: request.payment_method,
            items,
        })?;
        self.repository.save(&mut order).await?;
        let order_id = order.id();
        tracing::info!(%order_id, total = %order.total_amount(), "order persisted as PENDING");

        // 4. Payment
        let payment = self
            .clients
            .accounting
            .authorize_payment(&PaymentRequest {
                order_id,
                amount: order.total_amount(),
                payment_method: order.payment_method().to_string(),
            })
            .await;
        let transaction_id = match payment {
            Ok(response) if response.status == PaymentStatus::Authorized => {
                if response.transaction_id.is_none() {
                    tracing::warn!(%order_id, "payment authorized without a transaction id");
                }
                response.transaction_id
            }
            Ok(_) => {
                self.mark_payment_failed(order_id).await;
                return Err(SagaError::PaymentDeclined { order_id });
            }
            Err(source) => {
                self.mark_payment_failed(order_id).await;
                return Err(SagaError::PaymentUnavailable { order_id, source });
            }
        };
        self.record_step(order_id, "record_payment", |o| {
            o.authorize_payment(transaction_id.clone());
            Ok(())
        })
        .await?;

        // 5. Kitchen ticket
        let ticket = self
            .clients
            .kitchen
            .create_ticket(&CreateTicketRequest {
                order_id,
                restaurant_id: restaurant.id,
                items_summary: order.items_summary(),
            })
            .await
            .map_err(|source| self.partial_failure(order_id, "create_ticket", source))?;
        self.record_step(order_id, "record_ticket", |o| {
            o.attach_ticket(ticket.ticket_id.clone());
            Ok(())
        })
        .await?;

        // 6. Delivery
        let delivery = self
            .clients
            .delivery
            .create_delivery(&CreateDeliveryRequest {
                order_id,
                pickup_address: restaurant.address.clone(),
                delivery_address: order.delivery_address().to_string(),
            })
            .await
            .map_err(|source| self.partial_failure(order_id, "create_delivery", source))?;
        self.record_step(order_id, "record_delivery", |o| {
            o.attach_delivery(delivery.delivery_id.clone());
            Ok(())
        })
        .await?;

        // 7. Event
        self.publisher
            .publish_order_created(OrderCreated::from(&order));

        // 8. Approve
        self.record_step(order_id, "approve", |o| o.approve()).await
    }

    /// Writes a post-payment step to the order.
    async fn record_step<F>(
        &self,
        order_id: OrderId,
        step: &'static str,
        apply: F,
    ) -> Result<Order>
    where
        F: FnMut(&mut Order) -> domain::Result<()> + Send,
    {
        match self.repository.update_with(order_id, apply).await {
            Ok((order, ())) => Ok(order),
            Err(source) => {
                tracing::error!(
                    %order_id,
                    step,
                    error = %source,
                    "could not record step after payment was authorized"
                );
                metrics::counter!("saga_partial_failures_total", "step" => step).increment(1);
                Err(SagaError::StepNotRecorded {
                    order_id,
                    step,
                    source,
                })
            }
        }
    }

    async fn mark_payment_failed(&self, order_id: OrderId) {
        let result = self
            .repository
            .update_with(order_id, |o| {
                o.fail_payment();
                Ok(())
            })
            .await;
        if let Err(e) = result {
            tracing::error!(%order_id, error = %e, "could not record failed payment");
        }
    }

    fn partial_failure(
        &self,
        order_id: OrderId,
        step: &'static str,
        source: resilience::ServiceUnavailable,
    ) -> SagaError {
        tracing::error!(
            %order_id,
            step,
            error = %source,
            "step failed after payment was authorized; order left paid and incomplete"
        );
        metrics::counter!("saga_partial_failures_total", "step" => step).increment(1);
        SagaError::PartialFailure {
            order_id,
            step,
            source,
        }
    }

    /// Cancels a `PENDING` or `APPROVED` order. No downstream service is
    /// told about the cancellation.
    #[tracing::instrument(skip(self))]
    pub async fn cancel_order(&self, order_id: OrderId) -> Result<Order> {
        let result = self.repository.update_with(order_id, |o| o.cancel()).await;
        match result {
            Ok((order, ())) => {
                metrics::counter!("orders_cancelled_total").increment(1);
                tracing::info!(%order_id, "order cancelled");
                Ok(order)
            }
            Err(DomainError::OrderNotFound(id)) => Err(SagaError::OrderNotFound(id)),
            Err(DomainError::InvalidStatusTransition { from, .. }) => {
                Err(SagaError::CancellationNotAllowed {
                    order_id,
                    status: from,
                })
            }
            Err(e) => Err(e.into()),
        }
    }

    pub async fn get_order(&self, order_id: OrderId) -> Result<Order> {
        self.repository
            .find_by_id(order_id)
            .await?
            .ok_or(SagaError::OrderNotFound(order_id))
    }

    pub async fn list_orders(&self) -> Result<Vec<Order>> {
        Ok(self.repository.find_all().await?)
    }

    pub async fn orders_for_consumer(&self, consumer_id: ConsumerId) -> Result<Vec<Order>> {
        Ok(self.repository.find_by_consumer(consumer_id).await?)
    }

    /// Restaurant listing for browsing; empty when the catalog is down.
    pub async fn list_restaurants(&self) -> Vec<Restaurant> {
        self.clients.restaurant.list_restaurants().await
    }

    pub fn dependency_health(&self) -> Vec<DependencyHealth> {
        self.clients
            .guards()
            .into_iter()
            .map(DependencyHealth::from)
            .collect()
    }
}

/// Snapshots name and price for each requested line.
fn price_lines(
    request: &CreateOrderRequest,
    restaurant: &Restaurant,
    menu: &[MenuItem],
) -> Result<Vec<LineItem>> {
    request
        .items
        .iter()
        .map(|line| {
            let item = menu
                .iter()
                .find(|m| m.id == line.menu_item_id && m.restaurant_id == restaurant.id)
                .ok_or(SagaError::InvalidItem(line.menu_item_id))?;
            Ok(LineItem::new(
                item.id,
                item.name.clone(),
                item.price,
                line.quantity,
            ))
        })
        .collect()
}
