//! API error types with HTTP response mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use domain::DomainError;
use saga::SagaError;

/// API-level error type that maps to HTTP responses.
#[derive(Debug)]
pub enum ApiError {
    /// Bad request from the client.
    BadRequest(String),
    /// Order creation or lifecycle failure.
    Saga(SagaError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message, order_id) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg, None),
            ApiError::Saga(err) => {
                let status = saga_status(&err);
                if status.is_server_error() {
                    tracing::error!(error = %err, %status, "request failed");
                }
                (status, err.to_string(), err.order_id())
            }
        };

        let mut body = serde_json::json!({ "error": message });
        if let Some(order_id) = order_id {
            body["orderId"] = serde_json::json!(order_id.to_string());
        }
        (status, axum::Json(body)).into_response()
    }
}

fn saga_status(err: &SagaError) -> StatusCode {
    match err {
        SagaError::RestaurantNotFound(_) | SagaError::OrderNotFound(_) => StatusCode::NOT_FOUND,
        SagaError::RestaurantClosed { .. } | SagaError::InvalidItem(_) => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        SagaError::PaymentDeclined { .. } => StatusCode::PAYMENT_REQUIRED,
        SagaError::ServiceUnavailable(_) | SagaError::PaymentUnavailable { .. } => {
            StatusCode::SERVICE_UNAVAILABLE
        }
        SagaError::PartialFailure { .. } => StatusCode::BAD_GATEWAY,
        SagaError::StepNotRecorded { source, .. } => match source {
            DomainError::InvalidStatusTransition { .. }
            | DomainError::ConcurrencyConflict { .. } => StatusCode::CONFLICT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        },
        SagaError::CancellationNotAllowed { .. } => StatusCode::CONFLICT,
        SagaError::Domain(err) => domain_status(err),
    }
}

fn domain_status(err: &DomainError) -> StatusCode {
    match err {
        DomainError::NoItems | DomainError::InvalidQuantity { .. } => StatusCode::BAD_REQUEST,
        DomainError::OrderNotFound(_) => StatusCode::NOT_FOUND,
        DomainError::InvalidStatusTransition { .. } | DomainError::ConcurrencyConflict { .. } => {
            StatusCode::CONFLICT
        }
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl From<SagaError> for ApiError {
    fn from(err: SagaError) -> Self {
        ApiError::Saga(err)
    }
}

#[cfg(test)]
mod tests {
    use axum::body::to_bytes;
    use common::{OrderId, RestaurantId};
    use domain::{OrderStatus, Version};
    use resilience::{FailureKind, ServiceUnavailable};

    use super::*;

    fn unavailable() -> ServiceUnavailable {
        ServiceUnavailable {
            dependency: "kitchen-service".to_string(),
            operation: "create_ticket",
            attempts: 1,
            cause: FailureKind::CircuitOpen,
        }
    }

    #[test]
    fn test_status_mapping() {
        let order_id = OrderId::new();
        let cases = [
            (
                SagaError::RestaurantNotFound(RestaurantId::new(9)),
                StatusCode::NOT_FOUND,
            ),
            (
                SagaError::RestaurantClosed {
                    id: RestaurantId::new(3),
                    name: "Night Owl".into(),
                },
                StatusCode::UNPROCESSABLE_ENTITY,
            ),
            (
                SagaError::PaymentDeclined { order_id },
                StatusCode::PAYMENT_REQUIRED,
            ),
            (
                SagaError::ServiceUnavailable(unavailable()),
                StatusCode::SERVICE_UNAVAILABLE,
            ),
            (
                SagaError::PartialFailure {
                    order_id,
                    step: "create_ticket",
                    source: unavailable(),
                },
                StatusCode::BAD_GATEWAY,
            ),
            (
                SagaError::CancellationNotAllowed {
                    order_id,
                    status: OrderStatus::Delivered,
                },
                StatusCode::CONFLICT,
            ),
            (
                SagaError::StepNotRecorded {
                    order_id,
                    step: "approve",
                    source: DomainError::InvalidStatusTransition {
                        order_id,
                        from: OrderStatus::Cancelled,
                        action: "approve",
                    },
                },
                StatusCode::CONFLICT,
            ),
            (
                SagaError::StepNotRecorded {
                    order_id,
                    step: "record_ticket",
                    source: DomainError::CorruptRecord {
                        order_id,
                        reason: "bad status".into(),
                    },
                },
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (
                SagaError::Domain(DomainError::NoItems),
                StatusCode::BAD_REQUEST,
            ),
        ];

        for (err, expected) in cases {
            assert_eq!(saga_status(&err), expected, "{err}");
        }
    }

    #[test]
    fn test_declined_payment_response() {
        let order_id = OrderId::new();
        let response = ApiError::from(SagaError::PaymentDeclined { order_id }).into_response();
        assert_eq!(response.status(), StatusCode::PAYMENT_REQUIRED);
    }

    #[tokio::test]
    async fn test_unrecorded_step_names_the_paid_order() {
        let order_id = OrderId::new();
        let response = ApiError::from(SagaError::StepNotRecorded {
            order_id,
            step: "record_payment",
            source: DomainError::ConcurrencyConflict {
                order_id,
                expected: Version::new(1),
                actual: Version::new(2),
            },
        })
        .into_response();
        assert_eq!(response.status(), StatusCode::CONFLICT);

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["orderId"], order_id.to_string());
    }
}
