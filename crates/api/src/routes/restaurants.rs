//! Restaurant browsing.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use domain::OrderRepository;
use saga::Restaurant;

use crate::AppState;

/// GET /restaurants: the catalog, or an empty list while it is unavailable.
#[tracing::instrument(skip(state))]
pub async fn list<R: OrderRepository + 'static>(
    State(state): State<Arc<AppState<R>>>,
) -> Json<Vec<Restaurant>> {
    Json(state.orchestrator.list_restaurants().await)
}
