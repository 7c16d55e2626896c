//! The order entity.

use chrono::{DateTime, Utc};
use common::OrderId;
use serde::{Deserialize, Serialize};

use crate::error::DomainError;
use crate::value_objects::{EmailAddress, Money, SessionId};

/// The status of a persisted order.
///
/// Orders are only created once the provider confirms a completed checkout,
/// so there is no `Pending` state in this flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    /// Payment confirmed and the order recorded.
    Completed,

    /// Recorded for operator bookkeeping; not produced by the webhook flow.
    Failed,
}

impl OrderStatus {
    /// Returns the status name as stored in the database.
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Completed => "completed",
            OrderStatus::Failed => "failed",
        }
    }
}

impl std::str::FromStr for OrderStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "completed" => Ok(OrderStatus::Completed),
            "failed" => Ok(OrderStatus::Failed),
            other => Err(DomainError::UnknownStatus(other.to_string())),
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The commercial record of one fulfilled purchase.
///
/// `session_id` is unique: at most one order exists per provider checkout
/// session, regardless of how many times the event is redelivered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub customer_email: EmailAddress,
    pub session_id: SessionId,
    pub product: String,
    pub amount: Money,
    pub currency: String,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
}

/// Input for recording one completed purchase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewOrder {
    pub customer_email: EmailAddress,
    pub session_id: SessionId,
    pub product: String,
    pub amount: Money,
    pub currency: String,
}

impl NewOrder {
    /// Materializes the order record with a fresh ID at `created_at`.
    pub fn into_order(self, created_at: DateTime<Utc>) -> Order {
        Order {
            id: OrderId::new(),
            customer_email: self.customer_email,
            session_id: self.session_id,
            product: self.product,
            amount: self.amount,
            currency: self.currency,
            status: OrderStatus::Completed,
            created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn order_status_round_trips_through_str() {
        for status in [OrderStatus::Completed, OrderStatus::Failed] {
            let parsed: OrderStatus = status.as_str().parse().unwrap();
            assert_eq!(parsed, status);
        }
        assert!("pending".parse::<OrderStatus>().is_err());
    }

    #[test]
    fn new_order_materializes_as_completed() {
        let new_order = NewOrder {
            customer_email: EmailAddress::parse("buyer@example.com").unwrap(),
            session_id: SessionId::new("sess_1").unwrap(),
            product: "Copilot Pro Seat".to_string(),
            amount: Money::from_cents(1999),
            currency: "usd".to_string(),
        };
        let created_at = Utc::now();

        let order = new_order.into_order(created_at);
        assert_eq!(order.status, OrderStatus::Completed);
        assert_eq!(order.created_at, created_at);
        assert_eq!(order.amount.cents(), 1999);
        assert_eq!(order.session_id.as_str(), "sess_1");
    }
}
