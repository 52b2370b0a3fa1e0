//! Order placement and lookup endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use common::{ConsumerId, OrderId, RestaurantId};
use domain::{LineItem, Money, Order, OrderRepository, OrderStatus, PaymentStatus, Version};
use saga::CreateOrderRequest;
use serde::Serialize;

use crate::AppState;
use crate::error::ApiError;

// -- Response types --

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderResponse {
    pub id: OrderId,
    pub consumer_id: ConsumerId,
    pub consumer_name: String,
    pub restaurant_id: RestaurantId,
    pub restaurant_name: String,
    pub delivery_address: String,
    pub items: Vec<LineItem>,
    /// Minor currency units.
    pub total_amount: Money,
    pub status: OrderStatus,
    pub payment_status: PaymentStatus,
    pub payment_transaction_id: Option<String>,
    pub ticket_id: Option<String>,
    pub delivery_id: Option<String>,
    pub created_at: String,
    pub updated_at: String,
    pub version: Version,
}

impl From<&Order> for OrderResponse {
    fn from(order: &Order) -> Self {
        Self {
            id: order.id(),
            consumer_id: order.consumer_id(),
            consumer_name: order.consumer_name().to_string(),
            restaurant_id: order.restaurant_id(),
            restaurant_name: order.restaurant_name().to_string(),
            delivery_address: order.delivery_address().to_string(),
            items: order.items().to_vec(),
            total_amount: order.total_amount(),
            status: order.status(),
            payment_status: order.payment_status(),
            payment_transaction_id: order.payment_transaction_id().map(String::from),
            ticket_id: order.ticket_id().map(String::from),
            delivery_id: order.delivery_id().map(String::from),
            created_at: order.created_at().to_rfc3339(),
            updated_at: order.updated_at().to_rfc3339(),
            version: order.version(),
        }
    }
}

// -- Handlers --

/// POST /orders: runs the order creation saga.
#[tracing::instrument(skip(state, req), fields(restaurant_id = %req.restaurant_id))]
pub async fn create<R: OrderRepository + 'static>(
    State(state): State<Arc<AppState<R>>>,
    Json(req): Json<CreateOrderRequest>,
) -> Result<(StatusCode, Json<OrderResponse>), ApiError> {
    let order = state.orchestrator.create_order(req).await?;
    Ok((StatusCode::CREATED, Json(OrderResponse::from(&order))))
}

/// GET /orders: newest first.
#[tracing::instrument(skip(state))]
pub async fn list<R: OrderRepository + 'static>(
    State(state): State<Arc<AppState<R>>>,
) -> Result<Json<Vec<OrderResponse>>, ApiError> {
    let orders = state.orchestrator.list_orders().await?;
    Ok(Json(orders.iter().map(OrderResponse::from).collect()))
}

/// GET /orders/{id}
#[tracing::instrument(skip(state))]
pub async fn get<R: OrderRepository + 'static>(
    State(state): State<Arc<AppState<R>>>,
    Path(id): Path<String>,
) -> Result<Json<OrderResponse>, ApiError> {
    let order = state.orchestrator.get_order(parse_order_id(&id)?).await?;
    Ok(Json(OrderResponse::from(&order)))
}

/// POST /orders/{id}/cancel
#[tracing::instrument(skip(state))]
pub async fn cancel<R: OrderRepository + 'static>(
    State(state): State<Arc<AppState<R>>>,
    Path(id): Path<String>,
) -> Result<Json<OrderResponse>, ApiError> {
    let order = state.orchestrator.cancel_order(parse_order_id(&id)?).await?;
    Ok(Json(OrderResponse::from(&order)))
}

/// GET /consumers/{id}/orders
#[tracing::instrument(skip(state))]
pub async fn for_consumer<R: OrderRepository + 'static>(
    State(state): State<Arc<AppState<R>>>,
    Path(id): Path<i64>,
) -> Result<Json<Vec<OrderResponse>>, ApiError> {
    let orders = state
        .orchestrator
        .orders_for_consumer(ConsumerId::new(id))
        .await?;
    Ok(Json(orders.iter().map(OrderResponse::from).collect()))
}

fn parse_order_id(id: &str) -> Result<OrderId, ApiError> {
    OrderId::parse(id).map_err(|e| ApiError::BadRequest(format!("Invalid order id: {e}")))
}
