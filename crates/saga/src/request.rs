use common::{ConsumerId, MenuItemId, RestaurantId};
use domain::DomainError;
use serde::{Deserialize, Serialize};

/// A consumer's request to place an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderRequest {
    pub consumer_id: ConsumerId,
    pub consumer_name: String,
    pub consumer_contact: String,
    pub restaurant_id: RestaurantId,
    pub delivery_address: String,
    pub payment_method: String,
    pub items: Vec<OrderLine>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderLine {
    pub menu_item_id: MenuItemId,
    pub quantity: u32,
}

impl CreateOrderRequest {
    /// Checks the request shape before any dependency is called.
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.items.is_empty() {
            return Err(DomainError::NoItems);
        }
        if let Some(line) = self.items.iter().find(|l| l.quantity == 0) {
            return Err(DomainError::InvalidQuantity {
                item: line.menu_item_id.to_string(),
                quantity: line.quantity,
            });
        }
        Ok(())
    }

    /// Requested item ids without duplicates, in request order.
    pub fn menu_item_ids(&self) -> Vec<MenuItemId> {
        let mut ids = Vec::with_capacity(self.items.len());
        for line in &self.items {
            if !ids.contains(&line.menu_item_id) {
                ids.push(line.menu_item_id);
            }
        }
        ids
    }
}
