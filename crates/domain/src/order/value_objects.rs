//! Value objects for the order domain.

use common::MenuItemId;
use serde::{Deserialize, Serialize};

/// Money amount held in minor units (paise/cents) to avoid floating point
/// drift when totals are summed.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Money(i64);

impl Money {
    pub const fn from_minor(minor: i64) -> Self {
        Self(minor)
    }

    /// Creates an amount from whole currency units.
    pub const fn from_major(major: i64) -> Self {
        Self(major * 100)
    }

    pub const fn zero() -> Self {
        Self(0)
    }

    pub const fn minor(&self) -> i64 {
        self.0
    }

    pub const fn is_positive(&self) -> bool {
        self.0 > 0
    }

    pub const fn multiply(&self, quantity: u32) -> Money {
        Money(self.0 * quantity as i64)
    }
}

/// Renders as a plain two-decimal amount, e.g. `20.00`.
impl std::fmt::Display for Money {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        write!(f, "{sign}{}.{:02}", abs / 100, abs % 100)
    }
}

impl std::ops::Add for Money {
    type Output = Money;

    fn add(self, rhs: Self) -> Self::Output {
        Money(self.0 + rhs.0)
    }
}

impl std::ops::AddAssign for Money {
    fn add_assign(&mut self, rhs: Self) {
        self.0 += rhs.0;
    }
}

impl std::iter::Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), |acc, m| acc + m)
    }
}

/// A line item as it was priced when the order was placed.
///
/// Name and unit price are copied from the restaurant menu and never
/// refreshed afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineItem {
    pub menu_item_id: MenuItemId,
    pub name: String,
    pub unit_price: Money,
    pub quantity: u32,
}

impl LineItem {
    pub fn new(
        menu_item_id: MenuItemId,
        name: impl Into<String>,
        unit_price: Money,
        quantity: u32,
    ) -> Self {
        Self {
            menu_item_id,
            name: name.into(),
            unit_price,
            quantity,
        }
    }

    /// Returns `unit_price * quantity`.
    pub fn total_price(&self) -> Money {
        self.unit_price.multiply(self.quantity)
    }

    /// Kitchen-facing summary, e.g. `2x Masala Dosa`.
    pub fn summary(&self) -> String {
        format!("{}x {}", self.quantity, self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_money_display() {
        assert_eq!(Money::from_minor(2000).to_string(), "20.00");
        assert_eq!(Money::from_minor(1234).to_string(), "12.34");
        assert_eq!(Money::from_minor(5).to_string(), "0.05");
        assert_eq!(Money::from_minor(-1234).to_string(), "-12.34");
    }

    #[test]
    fn test_money_sum_and_multiply() {
        let total: Money = [Money::from_minor(500).multiply(2), Money::from_major(10)]
            .into_iter()
            .sum();
        assert_eq!(total, Money::from_minor(2000));
    }

    #[test]
    fn test_money_serializes_as_minor_units() {
        assert_eq!(serde_json::to_string(&Money::from_minor(1999)).unwrap(), "1999");
    }

    #[test]
    fn test_line_item_total_and_summary() {
        let item = LineItem::new(MenuItemId::new(7), "Idli", Money::from_minor(450), 3);
        assert_eq!(item.total_price(), Money::from_minor(1350));
        assert_eq!(item.summary(), "3x Idli");
    }

    #[test]
    fn test_line_item_wire_format_is_camel_case() {
        let item = LineItem::new(MenuItemId::new(1), "Vada", Money::from_minor(300), 1);
        let json = serde_json::to_value(&item).unwrap();
        assert_eq!(json["menuItemId"], 1);
        assert_eq!(json["unitPrice"], 300);
    }
}
