//! Kitchen service: ticket creation.

use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use common::{OrderId, RestaurantId};
use resilience::TransportError;
use serde::{Deserialize, Serialize};

use super::FaultInjector;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTicketRequest {
    pub order_id: OrderId,
    pub restaurant_id: RestaurantId,
    /// e.g. `"2x Masala Dosa, 1x Filter Coffee"`
    pub items_summary: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TicketResponse {
    pub ticket_id: String,
    pub status: String,
}

#[async_trait]
pub trait KitchenService: Send + Sync {
    async fn create_ticket(
        &self,
        request: &CreateTicketRequest,
    ) -> Result<TicketResponse, TransportError>;
}

#[derive(Debug, Clone, Default)]
pub struct InMemoryKitchenService {
    tickets: Arc<Mutex<Vec<(String, CreateTicketRequest)>>>,
    faults: FaultInjector,
}

impl InMemoryKitchenService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Tickets created so far, with their ids.
    pub fn tickets(&self) -> Vec<(String, CreateTicketRequest)> {
        self.tickets
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn ticket_count(&self) -> usize {
        self.tickets
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn faults(&self) -> &FaultInjector {
        &self.faults
    }
}

#[async_trait]
impl KitchenService for InMemoryKitchenService {
    async fn create_ticket(
        &self,
        request: &CreateTicketRequest,
    ) -> Result<TicketResponse, TransportError> {
        self.faults.enter("kitchen-service").await?;

        let mut tickets = self.tickets.lock().unwrap_or_else(PoisonError::into_inner);
        let ticket_id = format!("TICKET-{}", tickets.len() + 1);
        tickets.push((ticket_id.clone(), request.clone()));
        Ok(TicketResponse {
            ticket_id,
            status: "CREATED".to_string(),
        })
    }
}
