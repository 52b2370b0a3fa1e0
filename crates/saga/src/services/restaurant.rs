//! Restaurant catalog service.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use common::{MenuItemId, RestaurantId};
use domain::Money;
use resilience::TransportError;
use serde::{Deserialize, Serialize};

use super::FaultInjector;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Restaurant {
    pub id: RestaurantId,
    pub name: String,
    pub address: String,
    pub is_open: bool,
}

/// A priced menu entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MenuItem {
    pub id: MenuItemId,
    pub restaurant_id: RestaurantId,
    pub name: String,
    pub price: Money,
}

#[async_trait]
pub trait RestaurantService: Send + Sync {
    /// Looks up a restaurant. `Ok(None)` means the service answered that
    /// no such restaurant exists.
    async fn get_restaurant(&self, id: RestaurantId) -> Result<Option<Restaurant>, TransportError>;

    async fn list_restaurants(&self) -> Result<Vec<Restaurant>, TransportError>;

    /// Returns the menu items matching `ids`. Unknown ids are omitted.
    async fn get_menu_items(&self, ids: &[MenuItemId]) -> Result<Vec<MenuItem>, TransportError>;
}

#[derive(Debug, Default)]
struct Catalog {
    restaurants: HashMap<RestaurantId, Restaurant>,
    menu: HashMap<MenuItemId, MenuItem>,
}

/// In-memory restaurant catalog.
#[derive(Debug, Clone, Default)]
pub struct InMemoryRestaurantService {
    catalog: Arc<Mutex<Catalog>>,
    faults: FaultInjector,
}

impl InMemoryRestaurantService {
    pub fn new() -> Self {
        Self::default()
    }

    /// A small catalog for running the service without real dependencies.
    pub fn with_sample_data() -> Self {
        let service = Self::new();
        service.add_restaurant(
            Restaurant {
                id: RestaurantId::new(1),
                name: "Dosa Point".into(),
                address: "4 Church Street, Bengaluru".into(),
                is_open: true,
            },
            vec![
                (MenuItemId::new(101), "Masala Dosa", Money::from_minor(12000)),
                (MenuItemId::new(102), "Filter Coffee", Money::from_minor(4000)),
            ],
        );
        service.add_restaurant(
            Restaurant {
                id: RestaurantId::new(2),
                name: "Biryani House".into(),
                address: "21 Residency Road, Bengaluru".into(),
                is_open: true,
            },
            vec![
                (MenuItemId::new(201), "Chicken Biryani", Money::from_minor(28000)),
                (MenuItemId::new(202), "Raita", Money::from_minor(5000)),
            ],
        );
        service.add_restaurant(
            Restaurant {
                id: RestaurantId::new(3),
                name: "Midnight Diner".into(),
                address: "9 Brigade Road, Bengaluru".into(),
                is_open: false,
            },
            vec![(MenuItemId::new(301), "Pancakes", Money::from_minor(15000))],
        );
        service
    }

    /// Adds a restaurant together with its menu.
    pub fn add_restaurant(&self, restaurant: Restaurant, menu: Vec<(MenuItemId, &str, Money)>) {
        let mut catalog = self.lock();
        for (id, name, price) in menu {
            catalog.menu.insert(
                id,
                MenuItem {
                    id,
                    restaurant_id: restaurant.id,
                    name: name.to_string(),
                    price,
                },
            );
        }
        catalog.restaurants.insert(restaurant.id, restaurant);
    }

    pub fn set_open(&self, id: RestaurantId, open: bool) {
        if let Some(restaurant) = self.lock().restaurants.get_mut(&id) {
            restaurant.is_open = open;
        }
    }

    pub fn faults(&self) -> &FaultInjector {
        &self.faults
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Catalog> {
        self.catalog.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl RestaurantService for InMemoryRestaurantService {
    async fn get_restaurant(&self, id: RestaurantId) -> Result<Option<Restaurant>, TransportError> {
        self.faults.enter("restaurant-service").await?;
        Ok(self.lock().restaurants.get(&id).cloned())
    }

    async fn list_restaurants(&self) -> Result<Vec<Restaurant>, TransportError> {
        self.faults.enter("restaurant-service").await?;
        let mut restaurants: Vec<_> = self.lock().restaurants.values().cloned().collect();
        restaurants.sort_by_key(|r| r.id);
        Ok(restaurants)
    }

    async fn get_menu_items(&self, ids: &[MenuItemId]) -> Result<Vec<MenuItem>, TransportError> {
        self.faults.enter("restaurant-service").await?;
        let catalog = self.lock();
        Ok(ids
            .iter()
            .filter_map(|id| catalog.menu.get(id).cloned())
            .collect())
    }
}
