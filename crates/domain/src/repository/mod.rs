//! Order persistence.

mod memory;
mod postgres;

use async_trait::async_trait;
use common::{ConsumerId, OrderId};

pub use memory::InMemoryOrderRepository;
pub use postgres::PostgresOrderRepository;

use crate::{DomainError, Order, Result};

/// How many times [`OrderRepositoryExt::update_with`] reloads an order
/// after losing a concurrent write.
pub const MAX_UPDATE_ATTEMPTS: u32 = 5;

/// Storage for orders.
///
/// Implementations must be thread-safe and enforce the version check in
/// [`OrderRepository::save`] atomically.
#[async_trait]
pub trait OrderRepository: Send + Sync {
    /// Stores `order`.
    ///
    /// An order at the initial version is inserted; anything else replaces
    /// the stored record only if it is still at `order.version()`. On success
    /// the order's version is advanced to the stored one.
    ///
    /// # Errors
    ///
    /// `ConcurrencyConflict` when the stored record moved on, or when
    /// inserting an id that already exists.
    async fn save(&self, order: &mut Order) -> Result<()>;

    async fn find_by_id(&self, id: OrderId) -> Result<Option<Order>>;

    /// All orders, newest first.
    async fn find_all(&self) -> Result<Vec<Order>>;

    /// Orders placed by one consumer, newest first.
    async fn find_by_consumer(&self, consumer_id: ConsumerId) -> Result<Vec<Order>>;
}

/// Convenience operations built on [`OrderRepository`].
#[async_trait]
pub trait OrderRepositoryExt: OrderRepository {
    /// Loads an order or fails with `OrderNotFound`.
    async fn get(&self, id: OrderId) -> Result<Order> {
        self.find_by_id(id)
            .await?
            .ok_or(DomainError::OrderNotFound(id))
    }

    /// Read-modify-write with optimistic concurrency.
    ///
    /// `apply` runs against a freshly loaded copy and is re-run after a
    /// version conflict, up to [`MAX_UPDATE_ATTEMPTS`] times. The record is
    /// only written when `apply` actually changed the order. Errors returned
    /// by `apply` abort the update without writing.
    async fn update_with<T, F>(&self, id: OrderId, mut apply: F) -> Result<(Order, T)>
    where
        T: Send,
        F: FnMut(&mut Order) -> Result<T> + Send,
    {
        let mut attempt = 1;
        loop {
            let loaded = self.get(id).await?;
            let mut order = loaded.clone();
            let value = apply(&mut order)?;
            if order == loaded {
                return Ok((order, value));
            }

            match self.save(&mut order).await {
                Ok(()) => return Ok((order, value)),
                Err(DomainError::ConcurrencyConflict { .. }) if attempt < MAX_UPDATE_ATTEMPTS => {
                    tracing::debug!(order_id = %id, attempt, "version conflict, reloading order");
                    metrics::counter!("order_update_conflicts_total").increment(1);
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

impl<R: OrderRepository + ?Sized> OrderRepositoryExt for R {}
