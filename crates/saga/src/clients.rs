//! Resilient clients for the downstream services.
//!
//! Each client pairs a service with its [`DependencyGuard`] and declares,
//! per operation, whether it may be retried and what happens when the
//! dependency is unavailable. Reads on the order path are retried and
//! rejected on failure; writes (payment, ticket, delivery) are attempted
//! once, because repeating them could charge twice or create duplicates.

use std::sync::Arc;

use common::{MenuItemId, RestaurantId};
use resilience::{DependencyGuard, Idempotency, Operation, ResilienceConfig, ServiceUnavailable};

use crate::services::{
    AccountingService, CreateDeliveryRequest, CreateTicketRequest, DeliveryResponse,
    DeliveryService, KitchenService, MenuItem, PaymentRequest, PaymentResponse, Restaurant,
    RestaurantService, TicketResponse,
};

pub const RESTAURANT_SERVICE: &str = "restaurant-service";
pub const ACCOUNTING_SERVICE: &str = "accounting-service";
pub const KITCHEN_SERVICE: &str = "kitchen-service";
pub const DELIVERY_SERVICE: &str = "delivery-service";

const GET_RESTAURANT: Operation<Option<Restaurant>> =
    Operation::reject("get_restaurant", Idempotency::Idempotent);
const GET_MENU_ITEMS: Operation<Vec<MenuItem>> =
    Operation::reject("get_menu_items", Idempotency::Idempotent);
const LIST_RESTAURANTS: Operation<Vec<Restaurant>> =
    Operation::degrade("list_restaurants", Idempotency::Idempotent, Vec::new);
const AUTHORIZE_PAYMENT: Operation<PaymentResponse> =
    Operation::reject("authorize_payment", Idempotency::NonIdempotent);
const CREATE_TICKET: Operation<TicketResponse> =
    Operation::reject("create_ticket", Idempotency::NonIdempotent);
const CREATE_DELIVERY: Operation<DeliveryResponse> =
    Operation::reject("create_delivery", Idempotency::NonIdempotent);

pub struct RestaurantClient {
    service: Arc<dyn RestaurantService>,
    guard: DependencyGuard,
}

impl RestaurantClient {
    pub fn new(service: Arc<dyn RestaurantService>, config: ResilienceConfig) -> Self {
        Self {
            service,
            guard: DependencyGuard::new(RESTAURANT_SERVICE, config),
        }
    }

    pub fn guard(&self) -> &DependencyGuard {
        &self.guard
    }

    #[tracing::instrument(skip(self))]
    pub async fn get_restaurant(
        &self,
        id: RestaurantId,
    ) -> Result<Option<Restaurant>, ServiceUnavailable> {
        self.guard
            .call(&GET_RESTAURANT, || self.service.get_restaurant(id))
            .await
    }

    #[tracing::instrument(skip(self))]
    pub async fn get_menu_items(
        &self,
        ids: &[MenuItemId],
    ) -> Result<Vec<MenuItem>, ServiceUnavailable> {
        self.guard
            .call(&GET_MENU_ITEMS, || self.service.get_menu_items(ids))
            .await
    }

    /// Browsing is not on the order path: when the catalog is unavailable
    /// the caller gets an empty list.
    #[tracing::instrument(skip(self))]
    pub async fn list_restaurants(&self) -> Vec<Restaurant> {
        self.guard
            .call(&LIST_RESTAURANTS, || self.service.list_restaurants())
            .await
            .unwrap_or_default()
    }
}

pub struct AccountingClient {
    service: Arc<dyn AccountingService>,
    guard: DependencyGuard,
}

impl AccountingClient {
    pub fn new(service: Arc<dyn AccountingService>, config: ResilienceConfig) -> Self {
        Self {
            service,
            guard: DependencyGuard::new(ACCOUNTING_SERVICE, config),
        }
    }

    pub fn guard(&self) -> &DependencyGuard {
        &self.guard
    }

    #[tracing::instrument(skip(self, request), fields(order_id = %request.order_id, amount = %request.amount))]
    pub async fn authorize_payment(
        &self,
        request: &PaymentRequest,
    ) -> Result<PaymentResponse, ServiceUnavailable> {
        self.guard
            .call(&AUTHORIZE_PAYMENT, || self.service.authorize_payment(request))
            .await
    }
}

pub struct KitchenClient {
    service: Arc<dyn KitchenService>,
    guard: DependencyGuard,
}

impl KitchenClient {
    pub fn new(service: Arc<dyn KitchenService>, config: ResilienceConfig) -> Self {
        Self {
            service,
            guard: DependencyGuard::new(KITCHEN_SERVICE, config),
        }
    }

    pub fn guard(&self) -> &DependencyGuard {
        &self.guard
    }

    #[tracing::instrument(skip(self, request), fields(order_id = %request.order_id))]
    pub async fn create_ticket(
        &self,
        request: &CreateTicketRequest,
    ) -> Result<TicketResponse, ServiceUnavailable> {
        self.guard
            .call(&CREATE_TICKET, || self.service.create_ticket(request))
            .await
    }
}

pub struct DeliveryClient {
    service: Arc<dyn DeliveryService>,
    guard: DependencyGuard,
}

impl DeliveryClient {
    pub fn new(service: Arc<dyn DeliveryService>, config: ResilienceConfig) -> Self {
        Self {
            service,
            guard: DependencyGuard::new(DELIVERY_SERVICE, config),
        }
    }

    pub fn guard(&self) -> &DependencyGuard {
        &self.guard
    }

    #[tracing::instrument(skip(self, request), fields(order_id = %request.order_id))]
    pub async fn create_delivery(
        &self,
        request: &CreateDeliveryRequest,
    ) -> Result<DeliveryResponse, ServiceUnavailable> {
        self.guard
            .call(&CREATE_DELIVERY, || self.service.create_delivery(request))
            .await
    }
}

/// The clients used by one orchestrator.
pub struct DependencyClients {
    pub restaurant: RestaurantClient,
    pub accounting: AccountingClient,
    pub kitchen: KitchenClient,
    pub delivery: DeliveryClient,
}

impl DependencyClients {
    pub fn guards(&self) -> [&DependencyGuard; 4] {
        [
            self.restaurant.guard(),
            self.accounting.guard(),
            self.kitchen.guard(),
            self.delivery.guard(),
        ]
    }
}
