//! Domain layer for order orchestration.
//!
//! This crate provides:
//! - the [`Order`] aggregate with its [`OrderStatus`] state machine
//! - immutable line-item snapshots and [`Money`]
//! - the domain events exchanged with other services
//! - the [`OrderRepository`] abstraction with in-memory and PostgreSQL
//!   implementations

pub mod error;
pub mod events;
pub mod order;
pub mod repository;

pub use error::{DomainError, Result};
pub use events::{DeliveryStatusChanged, DomainEvent, OrderCreated, TicketStatusChanged, topics};
pub use order::{
    Convergence, LineItem, Money, NewOrder, Order, OrderStatus, PaymentStatus, Version,
};
pub use repository::{
    InMemoryOrderRepository, OrderRepository, OrderRepositoryExt, PostgresOrderRepository,
};
