//! Health, resilience and metrics endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use domain::OrderRepository;
use metrics_exporter_prometheus::PrometheusHandle;
use resilience::CircuitBreakerState;
use saga::DependencyHealth;
use serde::Serialize;

use crate::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    /// Dependencies whose circuit is currently open.
    pub unavailable: Vec<String>,
}

/// GET /health: `ok`, or `degraded` while any dependency circuit is open.
pub async fn health<R: OrderRepository + 'static>(
    State(state): State<Arc<AppState<R>>>,
) -> Json<HealthResponse> {
    let unavailable: Vec<String> = state
        .orchestrator
        .dependency_health()
        .into_iter()
        .filter(|d| d.circuit_state == CircuitBreakerState::Open)
        .map(|d| d.dependency)
        .collect();

    Json(HealthResponse {
        status: if unavailable.is_empty() { "ok" } else { "degraded" },
        unavailable,
    })
}

/// GET /resilience: breaker state and bulkhead usage per dependency.
pub async fn resilience<R: OrderRepository + 'static>(
    State(state): State<Arc<AppState<R>>>,
) -> Json<Vec<DependencyHealth>> {
    Json(state.orchestrator.dependency_health())
}

/// GET /metrics: Prometheus text exposition.
pub async fn metrics(State(handle): State<PrometheusHandle>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(
            axum::http::header::CONTENT_TYPE,
            "text/plain; version=0.0.4; charset=utf-8",
        )],
        handle.render(),
    )
}
