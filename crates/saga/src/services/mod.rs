//! Downstream service contracts and in-memory implementations.
//!
//! The traits describe what each remote service offers; transport failures
//! surface as [`resilience::TransportError`] so the dependency clients can
//! apply their resilience policy. The in-memory implementations stand in
//! for the real services in tests and in the default binary wiring.

pub mod accounting;
pub mod delivery;
mod fault;
pub mod kitchen;
pub mod restaurant;

pub use accounting::{
    AccountingService, ChargeOutcome, InMemoryAccountingService, MockPaymentGateway,
    PaymentGateway, PaymentRequest, PaymentResponse,
};
pub use delivery::{CreateDeliveryRequest, DeliveryResponse, DeliveryService, InMemoryDeliveryService};
pub use fault::FaultInjector;
pub use kitchen::{CreateTicketRequest, InMemoryKitchenService, KitchenService, TicketResponse};
pub use restaurant::{InMemoryRestaurantService, MenuItem, Restaurant, RestaurantService};
