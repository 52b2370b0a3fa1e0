//! Order creation saga.
//!
//! [`OrderOrchestrator`] drives the synchronous part of order creation
//! (restaurant lookup, pricing, payment, kitchen ticket, delivery) through
//! resilient [`clients`], persists the order, and hands `OrderCreated` to
//! the [`OrderEventPublisher`]. Status changes after approval arrive
//! asynchronously and are handled by the consumers in the `projections`
//! crate.

pub mod clients;
pub mod error;
pub mod orchestrator;
pub mod publisher;
pub mod request;
pub mod services;

pub use clients::{
    AccountingClient, DeliveryClient, DependencyClients, KitchenClient, RestaurantClient,
};
pub use error::{Result, SagaError};
pub use orchestrator::{DependencyHealth, OrderOrchestrator};
pub use publisher::{OrderEventPublisher, PublisherConfig};
pub use request::{CreateOrderRequest, OrderLine};
pub use services::{
    AccountingService, DeliveryService, FaultInjector, InMemoryAccountingService,
    InMemoryDeliveryService, InMemoryKitchenService, InMemoryRestaurantService, KitchenService,
    MenuItem, MockPaymentGateway, PaymentGateway, Restaurant, RestaurantService,
};
