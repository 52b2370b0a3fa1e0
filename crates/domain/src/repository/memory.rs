use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use common::{ConsumerId, OrderId};
use tokio::sync::RwLock;

use super::OrderRepository;
use crate::{DomainError, Order, Result};

/// In-memory order repository.
///
/// Used by tests and by the binary when no database is configured. Clones
/// share the same storage.
#[derive(Clone, Default)]
pub struct InMemoryOrderRepository {
    orders: Arc<RwLock<HashMap<OrderId, Order>>>,
}

impl InMemoryOrderRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.orders.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.orders.read().await.is_empty()
    }
}

fn newest_first(mut orders: Vec<Order>) -> Vec<Order> {
    orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    orders
}

#[async_trait]
impl OrderRepository for InMemoryOrderRepository {
    async fn save(&self, order: &mut Order) -> Result<()> {
        let mut orders = self.orders.write().await;
        let expected = order.version;
        let actual = orders.get(&order.id).map(|o| o.version);

        match actual {
            None if expected.is_initial() => {}
            Some(actual) if actual == expected => {}
            actual => {
                return Err(DomainError::ConcurrencyConflict {
                    order_id: order.id,
                    expected,
                    actual: actual.unwrap_or_default(),
                });
            }
        }

        order.version = expected.next();
        orders.insert(order.id, order.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: OrderId) -> Result<Option<Order>> {
        Ok(self.orders.read().await.get(&id).cloned())
    }

    async fn find_all(&self) -> Result<Vec<Order>> {
        let orders = self.orders.read().await.values().cloned().collect();
        Ok(newest_first(orders))
    }

    async fn find_by_consumer(&self, consumer_id: ConsumerId) -> Result<Vec<Order>> {
        let orders = self
            .orders
            .read()
            .await
            .values()
            .filter(|o| o.consumer_id == consumer_id)
            .cloned()
            .collect();
        Ok(newest_first(orders))
    }
}
