//! Identifiers shared across the order orchestration crates.

mod types;

pub use types::{ConsumerId, MenuItemId, OrderId, RestaurantId};
