//! Integration tests for the API server.

use std::sync::{Arc, OnceLock};

use axum::body::Body;
use axum::http::{Request, StatusCode};
use domain::InMemoryOrderRepository;
use messaging::InMemoryBus;
use metrics_exporter_prometheus::PrometheusHandle;
use serde_json::{Value, json};
use tower::ServiceExt;

use api::config::Config;
use api::{AppState, LocalServices};

static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

fn get_metrics_handle() -> PrometheusHandle {
    METRICS_HANDLE
        .get_or_init(|| {
            let builder = metrics_exporter_prometheus::PrometheusBuilder::new();
            builder
                .install_recorder()
                .expect("failed to install Prometheus recorder")
        })
        .clone()
}

struct TestApp {
    app: axum::Router,
    state: Arc<AppState<InMemoryOrderRepository>>,
    services: LocalServices,
}

fn setup() -> TestApp {
    let mut config = Config::default();
    for dependency in [
        &mut config.dependencies.restaurant,
        &mut config.dependencies.accounting,
        &mut config.dependencies.kitchen,
        &mut config.dependencies.delivery,
    ] {
        dependency.retry.initial_backoff = std::time::Duration::from_millis(5);
        dependency.circuit_breaker.minimum_calls = 2;
    }

    let services = LocalServices::with_sample_data();
    let bus = InMemoryBus::new(config.bus_partitions);
    let state = api::create_state(
        InMemoryOrderRepository::new(),
        &services,
        Arc::new(bus),
        &config,
    );
    let app = api::create_app(state.clone(), get_metrics_handle());
    TestApp {
        app,
        state,
        services,
    }
}

fn order_body(restaurant_id: i64, items: &[(i64, u32)]) -> Value {
    json!({
        "consumerId": 42,
        "consumerName": "Asha",
        "consumerContact": "+919876543210",
        "restaurantId": restaurant_id,
        "deliveryAddress": "12 MG Road",
        "paymentMethod": "CARD",
        "items": items
            .iter()
            .map(|(id, qty)| json!({ "menuItemId": id, "quantity": qty }))
            .collect::<Vec<_>>(),
    })
}

async fn send(app: &axum::Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let mut request = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(body) => {
            request = request.header("content-type", "application/json");
            Body::from(serde_json::to_string(&body).unwrap())
        }
        None => Body::empty(),
    };

    let response = app
        .clone()
        .oneshot(request.body(body).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, json)
}

#[tokio::test]
async fn test_health_check() {
    let t = setup();

    let (status, json) = send(&t.app, "GET", "/health", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "ok");
    assert_eq!(json["unavailable"], json!([]));
}

#[tokio::test]
async fn test_create_order() {
    let t = setup();

    let (status, json) = send(
        &t.app,
        "POST",
        "/orders",
        Some(order_body(1, &[(101, 2), (102, 1)])),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(json["status"], "APPROVED");
    assert_eq!(json["paymentStatus"], "AUTHORIZED");
    assert_eq!(json["totalAmount"], 28000);
    assert_eq!(json["paymentTransactionId"], "TXN-000001");
    assert_eq!(json["ticketId"], "TICKET-1");
    assert_eq!(json["deliveryId"], "DELIVERY-1");
    assert_eq!(json["items"].as_array().unwrap().len(), 2);
    t.state.orchestrator.publisher().shutdown().await;
}

#[tokio::test]
async fn test_get_and_list_orders() {
    let t = setup();
    let (_, created) = send(&t.app, "POST", "/orders", Some(order_body(1, &[(101, 1)]))).await;
    let id = created["id"].as_str().unwrap().to_string();

    let (status, json) = send(&t.app, "GET", &format!("/orders/{id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["id"], id.as_str());
    assert_eq!(json["restaurantName"], "Dosa Point");

    let (status, json) = send(&t.app, "GET", "/orders", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json.as_array().unwrap().len(), 1);

    let (status, json) = send(&t.app, "GET", "/consumers/42/orders", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json.as_array().unwrap().len(), 1);

    let (_, json) = send(&t.app, "GET", "/consumers/7/orders", None).await;
    assert_eq!(json, json!([]));
}

#[tokio::test]
async fn test_get_order_not_found() {
    let t = setup();
    let id = common::OrderId::new();

    let (status, json) = send(&t.app, "GET", &format!("/orders/{id}"), None).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(json["error"].as_str().unwrap().contains("not found"));
}

#[tokio::test]
async fn test_invalid_order_id() {
    let t = setup();

    let (status, _) = send(&t.app, "GET", "/orders/not-a-uuid", None).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_validation_errors() {
    let t = setup();

    let (status, _) = send(&t.app, "POST", "/orders", Some(order_body(1, &[]))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(&t.app, "POST", "/orders", Some(order_body(99, &[(101, 1)]))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(&t.app, "POST", "/orders", Some(order_body(3, &[(301, 1)]))).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (status, _) = send(&t.app, "POST", "/orders", Some(order_body(1, &[(201, 1)]))).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (_, json) = send(&t.app, "GET", "/orders", None).await;
    assert_eq!(json, json!([]));
}

#[tokio::test]
async fn test_payment_declined() {
    let t = setup();
    t.services.gateway.set_decline(true);

    let (status, json) = send(&t.app, "POST", "/orders", Some(order_body(1, &[(101, 1)]))).await;

    assert_eq!(status, StatusCode::PAYMENT_REQUIRED);
    let id = json["orderId"].as_str().unwrap().to_string();
    let (_, order) = send(&t.app, "GET", &format!("/orders/{id}"), None).await;
    assert_eq!(order["status"], "PENDING");
    assert_eq!(order["paymentStatus"], "FAILED");
    assert_eq!(t.services.kitchen.ticket_count(), 0);
}

#[tokio::test]
async fn test_kitchen_outage_leaves_paid_order() {
    let t = setup();
    t.services.kitchen.faults().set_unavailable(true);

    let (status, json) = send(&t.app, "POST", "/orders", Some(order_body(1, &[(101, 1)]))).await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    let id = json["orderId"].as_str().unwrap().to_string();
    let (_, order) = send(&t.app, "GET", &format!("/orders/{id}"), None).await;
    assert_eq!(order["status"], "PENDING");
    assert_eq!(order["paymentStatus"], "AUTHORIZED");
    assert_eq!(t.services.delivery.delivery_count(), 0);
}

#[tokio::test]
async fn test_restaurant_outage() {
    let t = setup();
    t.services.restaurants.faults().set_unavailable(true);

    let (status, _) = send(&t.app, "POST", "/orders", Some(order_body(1, &[(101, 1)]))).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);

    let (status, json) = send(&t.app, "GET", "/restaurants", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json, json!([]));

    let (_, json) = send(&t.app, "GET", "/resilience", None).await;
    let restaurant = json
        .as_array()
        .unwrap()
        .iter()
        .find(|d| d["dependency"] == "restaurant-service")
        .unwrap();
    assert_eq!(restaurant["circuitState"], "OPEN");

    let (_, json) = send(&t.app, "GET", "/health", None).await;
    assert_eq!(json["status"], "degraded");
    assert_eq!(json["unavailable"], json!(["restaurant-service"]));
}

#[tokio::test]
async fn test_list_restaurants() {
    let t = setup();

    let (status, json) = send(&t.app, "GET", "/restaurants", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json.as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn test_resilience_snapshot() {
    let t = setup();

    let (status, json) = send(&t.app, "GET", "/resilience", None).await;

    assert_eq!(status, StatusCode::OK);
    let deps = json.as_array().unwrap();
    assert_eq!(deps.len(), 4);
    assert!(deps.iter().all(|d| d["circuitState"] == "CLOSED"));
    assert!(deps.iter().all(|d| d["inFlight"] == 0));
}

#[tokio::test]
async fn test_cancel_order() {
    let t = setup();
    let (_, created) = send(&t.app, "POST", "/orders", Some(order_body(1, &[(101, 1)]))).await;
    let id = created["id"].as_str().unwrap().to_string();

    let (status, json) = send(&t.app, "POST", &format!("/orders/{id}/cancel"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "CANCELLED");

    let (status, _) = send(&t.app, "POST", &format!("/orders/{id}/cancel"), None).await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_metrics_endpoint() {
    let t = setup();
    send(&t.app, "POST", "/orders", Some(order_body(1, &[(101, 1)]))).await;

    let response = t
        .app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/metrics")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let text = String::from_utf8(body.to_vec()).unwrap();
    assert!(text.contains("orders_created_total"));
}
