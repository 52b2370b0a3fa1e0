//! HTTP API server with observability for the order service.
//!
//! Provides REST endpoints for placing and following orders, with
//! structured logging (tracing) and Prometheus metrics.

pub mod config;
pub mod error;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use domain::OrderRepository;
use messaging::{Publisher, Subscriber};
use metrics_exporter_prometheus::PrometheusHandle;
use projections::{
    ConsumerRunner, DeliveryStatusConsumer, EventConsumer, NotificationConsumer, SmsGateway,
    TicketStatusConsumer,
};
use saga::{
    AccountingClient, DeliveryClient, DependencyClients, InMemoryAccountingService,
    InMemoryDeliveryService, InMemoryKitchenService, InMemoryRestaurantService, KitchenClient,
    MockPaymentGateway, OrderEventPublisher, OrderOrchestrator, RestaurantClient,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::Config;

/// Shared application state accessible from all handlers.
pub struct AppState<R: OrderRepository> {
    pub orchestrator: OrderOrchestrator<R>,
}

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<R: OrderRepository + 'static>(
    state: Arc<AppState<R>>,
    metrics_handle: PrometheusHandle,
) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::observability::metrics))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::observability::health::<R>))
        .route("/resilience", get(routes::observability::resilience::<R>))
        .route("/restaurants", get(routes::restaurants::list::<R>))
        .route("/orders", post(routes::orders::create::<R>))
        .route("/orders", get(routes::orders::list::<R>))
        .route("/orders/{id}", get(routes::orders::get::<R>))
        .route("/orders/{id}/cancel", post(routes::orders::cancel::<R>))
        .route(
            "/consumers/{id}/orders",
            get(routes::orders::for_consumer::<R>),
        )
        .with_state(state)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}

/// In-process stand-ins for the downstream services.
#[derive(Clone)]
pub struct LocalServices {
    pub restaurants: InMemoryRestaurantService,
    pub gateway: Arc<MockPaymentGateway>,
    pub accounting: InMemoryAccountingService,
    pub kitchen: InMemoryKitchenService,
    pub delivery: InMemoryDeliveryService,
}

impl LocalServices {
    /// Services backed by the sample restaurant catalog.
    pub fn with_sample_data() -> Self {
        let gateway = Arc::new(MockPaymentGateway::new());
        Self {
            restaurants: InMemoryRestaurantService::with_sample_data(),
            accounting: InMemoryAccountingService::new(gateway.clone()),
            gateway,
            kitchen: InMemoryKitchenService::new(),
            delivery: InMemoryDeliveryService::new(),
        }
    }

    /// Guarded clients over these services.
    pub fn clients(&self, config: &Config) -> DependencyClients {
        let deps = &config.dependencies;
        DependencyClients {
            restaurant: RestaurantClient::new(
                Arc::new(self.restaurants.clone()),
                deps.restaurant.clone(),
            ),
            accounting: AccountingClient::new(
                Arc::new(self.accounting.clone()),
                deps.accounting.clone(),
            ),
            kitchen: KitchenClient::new(Arc::new(self.kitchen.clone()), deps.kitchen.clone()),
            delivery: DeliveryClient::new(Arc::new(self.delivery.clone()), deps.delivery.clone()),
        }
    }
}

/// Wires the orchestrator and starts the event publisher workers.
///
/// Must be called from within a Tokio runtime.
pub fn create_state<R: OrderRepository + 'static>(
    repository: R,
    services: &LocalServices,
    publisher: Arc<dyn Publisher>,
    config: &Config,
) -> Arc<AppState<R>> {
    let events = OrderEventPublisher::spawn(publisher, config.publisher);
    let orchestrator = OrderOrchestrator::new(repository, services.clients(config), events);
    Arc::new(AppState { orchestrator })
}

/// Starts the status and notification consumers.
pub async fn start_consumers<R: OrderRepository + Clone + 'static>(
    subscriber: &dyn Subscriber,
    repository: R,
    sms: Arc<dyn SmsGateway>,
) -> projections::Result<ConsumerRunner> {
    let consumers: Vec<Arc<dyn EventConsumer>> = vec![
        Arc::new(TicketStatusConsumer::new(repository.clone())),
        Arc::new(DeliveryStatusConsumer::new(repository)),
        Arc::new(NotificationConsumer::new(sms)),
    ];
    ConsumerRunner::start(subscriber, consumers).await
}
