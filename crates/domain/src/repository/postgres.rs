use std::collections::BTreeSet;

use async_trait::async_trait;
use common::{ConsumerId, OrderId, RestaurantId};
use sqlx::{PgPool, Row, postgres::PgRow};
use uuid::Uuid;

use super::OrderRepository;
use crate::{
    DomainError, LineItem, Money, Order, OrderStatus, PaymentStatus, Result, Version,
    order::UnknownStatus,
};

const SELECT_ORDERS: &str = r#"
    SELECT id, consumer_id, consumer_name, consumer_contact, restaurant_id,
           restaurant_name, delivery_address, payment_method, items, total_amount,
           status, deferred_statuses, payment_status, payment_transaction_id,
           ticket_id, delivery_id, created_at, updated_at, version
    FROM orders
"#;

/// PostgreSQL-backed order repository.
#[derive(Clone)]
pub struct PostgresOrderRepository {
    pool: PgPool,
}

impl PostgresOrderRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("../../migrations").run(&self.pool).await?;
        Ok(())
    }

    async fn stored_version(&self, id: OrderId) -> Result<Version> {
        let version: Option<i64> = sqlx::query_scalar("SELECT version FROM orders WHERE id = $1")
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;
        Ok(version.map(Version::new).unwrap_or_default())
    }

    fn row_to_order(row: PgRow) -> Result<Order> {
        let id = OrderId::from_uuid(row.try_get::<Uuid, _>("id")?);
        let corrupt = |reason: String| DomainError::CorruptRecord {
            order_id: id,
            reason,
        };

        let items: Vec<LineItem> =
            serde_json::from_value(row.try_get::<serde_json::Value, _>("items")?)?;
        let status: OrderStatus = row
            .try_get::<String, _>("status")?
            .parse()
            .map_err(|e: UnknownStatus| corrupt(e.to_string()))?;
        let deferred_statuses: BTreeSet<OrderStatus> = serde_json::from_value(
            row.try_get::<serde_json::Value, _>("deferred_statuses")?,
        )?;
        let payment_status: PaymentStatus = row
            .try_get::<String, _>("payment_status")?
            .parse()
            .map_err(|e: UnknownStatus| corrupt(e.to_string()))?;

        Ok(Order {
            id,
            consumer_id: ConsumerId::new(row.try_get("consumer_id")?),
            consumer_name: row.try_get("consumer_name")?,
            consumer_contact: row.try_get("consumer_contact")?,
            restaurant_id: RestaurantId::new(row.try_get("restaurant_id")?),
            restaurant_name: row.try_get("restaurant_name")?,
            delivery_address: row.try_get("delivery_address")?,
            payment_method: row.try_get("payment_method")?,
            items,
            total_amount: Money::from_minor(row.try_get("total_amount")?),
            status,
            deferred_statuses,
            payment_status,
            payment_transaction_id: row.try_get("payment_transaction_id")?,
            ticket_id: row.try_get("ticket_id")?,
            delivery_id: row.try_get("delivery_id")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
            version: Version::new(row.try_get("version")?),
        })
    }
}

#[async_trait]
impl OrderRepository for PostgresOrderRepository {
    #[tracing::instrument(skip(self, order), fields(order_id = %order.id, version = %order.version))]
    async fn save(&self, order: &mut Order) -> Result<()> {
        let expected = order.version;
        let next = expected.next();
        let items = serde_json::to_value(&order.items)?;
        let deferred = serde_json::to_value(&order.deferred_statuses)?;

        let result = if expected.is_initial() {
            sqlx::query(
                r#"
                INSERT INTO orders (
                    id, consumer_id, consumer_name, consumer_contact, restaurant_id,
                    restaurant_name, delivery_address, payment_method, items, total_amount,
                    status, deferred_statuses, payment_status, payment_transaction_id,
                    ticket_id, delivery_id, created_at, updated_at, version
                )
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18, $19)
                ON CONFLICT (id) DO NOTHING
                "#,
            )
            .bind(order.id.as_uuid())
            .bind(order.consumer_id.get())
            .bind(&order.consumer_name)
            .bind(&order.consumer_contact)
            .bind(order.restaurant_id.get())
            .bind(&order.restaurant_name)
            .bind(&order.delivery_address)
            .bind(&order.payment_method)
            .bind(&items)
            .bind(order.total_amount.minor())
            .bind(order.status.as_str())
            .bind(&deferred)
            .bind(order.payment_status.as_str())
            .bind(&order.payment_transaction_id)
            .bind(&order.ticket_id)
            .bind(&order.delivery_id)
            .bind(order.created_at)
            .bind(order.updated_at)
            .bind(next.as_i64())
            .execute(&self.pool)
            .await?
        } else {
            // Line items, total and creation time are immutable after insert.
            sqlx::query(
                r#"
                UPDATE orders
                SET status = $3, deferred_statuses = $4, payment_status = $5,
                    payment_transaction_id = $6, ticket_id = $7, delivery_id = $8,
                    updated_at = $9, version = $10
                WHERE id = $1 AND version = $2
                "#,
            )
            .bind(order.id.as_uuid())
            .bind(expected.as_i64())
            .bind(order.status.as_str())
            .bind(&deferred)
            .bind(order.payment_status.as_str())
            .bind(&order.payment_transaction_id)
            .bind(&order.ticket_id)
            .bind(&order.delivery_id)
            .bind(order.updated_at)
            .bind(next.as_i64())
            .execute(&self.pool)
            .await?
        };

        if result.rows_affected() == 0 {
            return Err(DomainError::ConcurrencyConflict {
                order_id: order.id,
                expected,
                actual: self.stored_version(order.id).await?,
            });
        }

        order.version = next;
        Ok(())
    }

    async fn find_by_id(&self, id: OrderId) -> Result<Option<Order>> {
        let row = sqlx::query(&format!("{SELECT_ORDERS} WHERE id = $1"))
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;
        row.map(Self::row_to_order).transpose()
    }

    async fn find_all(&self) -> Result<Vec<Order>> {
        let rows = sqlx::query(&format!("{SELECT_ORDERS} ORDER BY created_at DESC"))
            .fetch_all(&self.pool)
            .await?;
        rows.into_iter().map(Self::row_to_order).collect()
    }

    async fn find_by_consumer(&self, consumer_id: ConsumerId) -> Result<Vec<Order>> {
        let rows = sqlx::query(&format!(
            "{SELECT_ORDERS} WHERE consumer_id = $1 ORDER BY created_at DESC"
        ))
        .bind(consumer_id.get())
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(Self::row_to_order).collect()
    }
}
