//! Order and payment status tokens.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Lifecycle status of an order.
///
/// ```text
/// PENDING ──► APPROVED ──► PREPARING ──► READY_FOR_PICKUP ──► PICKED_UP ──► DELIVERED
///    │            │
///    └────────────┴──► CANCELLED
/// ```
///
/// Variants are declared in fulfilment order, which is what `Ord` follows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    Pending,
    Approved,
    Preparing,
    ReadyForPickup,
    PickedUp,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Approved => "APPROVED",
            Self::Preparing => "PREPARING",
            Self::ReadyForPickup => "READY_FOR_PICKUP",
            Self::PickedUp => "PICKED_UP",
            Self::Delivered => "DELIVERED",
            Self::Cancelled => "CANCELLED",
        }
    }

    /// The status that immediately follows this one on the fulfilment path.
    pub const fn next(&self) -> Option<Self> {
        match self {
            Self::Pending => Some(Self::Approved),
            Self::Approved => Some(Self::Preparing),
            Self::Preparing => Some(Self::ReadyForPickup),
            Self::ReadyForPickup => Some(Self::PickedUp),
            Self::PickedUp => Some(Self::Delivered),
            Self::Delivered | Self::Cancelled => None,
        }
    }

    /// Statuses reported by the kitchen and the courier.
    pub const fn is_fulfilment(&self) -> bool {
        matches!(
            self,
            Self::Preparing | Self::ReadyForPickup | Self::PickedUp | Self::Delivered
        )
    }

    pub const fn can_approve(&self) -> bool {
        matches!(self, Self::Pending)
    }

    pub const fn can_cancel(&self) -> bool {
        matches!(self, Self::Pending | Self::Approved)
    }

    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Delivered | Self::Cancelled)
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A status token that does not name any known status.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown status token: {0}")]
pub struct UnknownStatus(pub String);

impl FromStr for OrderStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(Self::Pending),
            "APPROVED" => Ok(Self::Approved),
            "PREPARING" => Ok(Self::Preparing),
            "READY_FOR_PICKUP" => Ok(Self::ReadyForPickup),
            "PICKED_UP" => Ok(Self::PickedUp),
            "DELIVERED" => Ok(Self::Delivered),
            "CANCELLED" => Ok(Self::Cancelled),
            other => Err(UnknownStatus(other.to_string())),
        }
    }
}

/// Outcome of the payment authorization step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    #[default]
    Pending,
    Authorized,
    Failed,
}

impl PaymentStatus {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Authorized => "AUTHORIZED",
            Self::Failed => "FAILED",
        }
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(Self::Pending),
            "AUTHORIZED" => Ok(Self::Authorized),
            "FAILED" => Ok(Self::Failed),
            other => Err(UnknownStatus(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokens_parse_back_to_status() {
        for status in [
            OrderStatus::Pending,
            OrderStatus::Approved,
            OrderStatus::Preparing,
            OrderStatus::ReadyForPickup,
            OrderStatus::PickedUp,
            OrderStatus::Delivered,
            OrderStatus::Cancelled,
        ] {
            assert_eq!(status.as_str().parse::<OrderStatus>(), Ok(status));
        }
    }

    #[test]
    fn test_unknown_token_is_rejected() {
        let err = "ON_FIRE".parse::<OrderStatus>().unwrap_err();
        assert_eq!(err, UnknownStatus("ON_FIRE".into()));
        assert!("preparing".parse::<OrderStatus>().is_err());
    }

    #[test]
    fn test_serde_uses_wire_tokens() {
        let json = serde_json::to_string(&OrderStatus::ReadyForPickup).unwrap();
        assert_eq!(json, "\"READY_FOR_PICKUP\"");
        let payment: PaymentStatus = serde_json::from_str("\"AUTHORIZED\"").unwrap();
        assert_eq!(payment, PaymentStatus::Authorized);
    }

    #[test]
    fn test_cancellation_only_before_preparation() {
        assert!(OrderStatus::Pending.can_cancel());
        assert!(OrderStatus::Approved.can_cancel());
        assert!(!OrderStatus::Preparing.can_cancel());
        assert!(!OrderStatus::Delivered.can_cancel());
        assert!(!OrderStatus::Cancelled.can_cancel());
    }

    #[test]
    fn test_next_walks_the_path_one_step_at_a_time() {
        let mut status = OrderStatus::Pending;
        let mut path = vec![status];
        while let Some(next) = status.next() {
            assert!(next > status);
            path.push(next);
            status = next;
        }
        assert_eq!(path.len(), 6);
        assert_eq!(status, OrderStatus::Delivered);
        assert_eq!(OrderStatus::Cancelled.next(), None);
        assert!(!OrderStatus::Approved.is_fulfilment());
        assert!(OrderStatus::Preparing.is_fulfilment());
    }
}
