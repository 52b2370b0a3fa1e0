//! Delivery service: courier assignment.

use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use common::OrderId;
use resilience::TransportError;
use serde::{Deserialize, Serialize};

use super::FaultInjector;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateDeliveryRequest {
    pub order_id: OrderId,
    pub pickup_address: String,
    pub delivery_address: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryResponse {
    pub delivery_id: String,
    pub status: String,
}

#[async_trait]
pub trait DeliveryService: Send + Sync {
    async fn create_delivery(
        &self,
        request: &CreateDeliveryRequest,
    ) -> Result<DeliveryResponse, TransportError>;
}

#[derive(Debug, Clone, Default)]
pub struct InMemoryDeliveryService {
    deliveries: Arc<Mutex<Vec<(String, CreateDeliveryRequest)>>>,
    faults: FaultInjector,
}

impl InMemoryDeliveryService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn deliveries(&self) -> Vec<(String, CreateDeliveryRequest)> {
        self.deliveries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn delivery_count(&self) -> usize {
        self.deliveries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn faults(&self) -> &FaultInjector {
        &self.faults
    }
}

#[async_trait]
impl DeliveryService for InMemoryDeliveryService {
    async fn create_delivery(
        &self,
        request: &CreateDeliveryRequest,
    ) -> Result<DeliveryResponse, TransportError> {
        self.faults.enter("delivery-service").await?;

        let mut deliveries = self
            .deliveries
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let delivery_id = format!("DELIVERY-{}", deliveries.len() + 1);
        deliveries.push((delivery_id.clone(), request.clone()));
        Ok(DeliveryResponse {
            delivery_id,
            status: "SCHEDULED".to_string(),
        })
    }
}
