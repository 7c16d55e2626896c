//! The inventory item entity and its status lifecycle.

use chrono::{DateTime, Utc};
use common::{ItemId, OrderId};
use serde::{Deserialize, Serialize};

use crate::error::DomainError;
use crate::value_objects::{Category, EmailAddress};

/// The state of an inventory item in its lifecycle.
///
/// State transitions:
/// ```text
/// Available ──► Assigned ──► Expired
/// ```
/// Restock creates items in `Available`. A successful reservation moves an
/// item to `Assigned` exactly once. The TTL sweep or a manual release moves
/// it to `Expired`; items never return to `Available` automatically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ItemStatus {
    /// The item can be reserved.
    #[default]
    Available,

    /// The item is assigned to exactly one customer.
    Assigned,

    /// The item's validity period elapsed or it was manually released
    /// (terminal state).
    Expired,
}

impl ItemStatus {
    /// Returns true if the item can be reserved in this state.
    pub fn can_assign(&self) -> bool {
        matches!(self, ItemStatus::Available)
    }

    /// Returns true if the item can be expired in this state.
    pub fn can_expire(&self) -> bool {
        matches!(self, ItemStatus::Assigned)
    }

    /// Returns true if this is a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, ItemStatus::Expired)
    }

    /// Returns the status name as stored in the database.
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemStatus::Available => "available",
            ItemStatus::Assigned => "assigned",
            ItemStatus::Expired => "expired",
        }
    }
}

impl std::str::FromStr for ItemStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "available" => Ok(ItemStatus::Available),
            "assigned" => Ok(ItemStatus::Assigned),
            "expired" => Ok(ItemStatus::Expired),
            other => Err(DomainError::UnknownStatus(other.to_string())),
        }
    }
}

impl std::fmt::Display for ItemStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A uniquely assignable credential held in stock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryItem {
    pub id: ItemId,
    pub category: Category,
    /// Login of the credential handed to the customer.
    pub login: String,
    /// Secret of the credential handed to the customer.
    pub password: String,
    pub status: ItemStatus,
    pub assigned_to: Option<EmailAddress>,
    pub assigned_at: Option<DateTime<Utc>>,
    pub order_id: Option<OrderId>,
    pub expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub notes: Option<String>,
}

impl InventoryItem {
    /// Creates a fresh item in the `Available` state with no assignment.
    pub fn available(input: NewInventoryItem, created_at: DateTime<Utc>) -> Self {
        Self {
            id: ItemId::new(),
            category: input.category,
            login: input.login,
            password: input.password,
            status: ItemStatus::Available,
            assigned_to: None,
            assigned_at: None,
            order_id: None,
            expires_at: None,
            created_at,
            notes: input.notes,
        }
    }

    /// Checks the status/assignment invariant:
    /// `Assigned` iff `assigned_to`, `assigned_at`, and `order_id` are all
    /// set; `Available` iff all three are unset.
    pub fn assignment_is_consistent(&self) -> bool {
        let populated =
            self.assigned_to.is_some() && self.assigned_at.is_some() && self.order_id.is_some();
        let empty =
            self.assigned_to.is_none() && self.assigned_at.is_none() && self.order_id.is_none();
        match self.status {
            ItemStatus::Available => empty,
            ItemStatus::Assigned => populated,
            ItemStatus::Expired => true,
        }
    }

    /// Returns true if the item is assigned and its validity period has
    /// elapsed at `now`.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.status == ItemStatus::Assigned
            && self.expires_at.is_some_and(|expires_at| now >= expires_at)
    }
}

/// Input for creating one item through a restock operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewInventoryItem {
    pub category: Category,
    pub login: String,
    pub password: String,
    pub notes: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeDelta;

    fn sample_item() -> InventoryItem {
        InventoryItem::available(
            NewInventoryItem {
                category: Category::Pro,
                login: "seat-001@pool.example.com".to_string(),
                password: "hunter2".to_string(),
                notes: None,
            },
            Utc::now(),
        )
    }

    #[test]
    fn status_transitions() {
        assert!(ItemStatus::Available.can_assign());
        assert!(!ItemStatus::Assigned.can_assign());
        assert!(!ItemStatus::Expired.can_assign());

        assert!(!ItemStatus::Available.can_expire());
        assert!(ItemStatus::Assigned.can_expire());
        assert!(!ItemStatus::Expired.can_expire());

        assert!(ItemStatus::Expired.is_terminal());
        assert!(!ItemStatus::Assigned.is_terminal());
    }

    #[test]
    fn status_round_trips_through_str() {
        for status in [
            ItemStatus::Available,
            ItemStatus::Assigned,
            ItemStatus::Expired,
        ] {
            let parsed: ItemStatus = status.as_str().parse().unwrap();
            assert_eq!(parsed, status);
        }
        assert!("reserved".parse::<ItemStatus>().is_err());
    }

    #[test]
    fn fresh_item_is_consistent_and_unassigned() {
        let item = sample_item();
        assert_eq!(item.status, ItemStatus::Available);
        assert!(item.assignment_is_consistent());
        assert!(item.assigned_to.is_none());
        assert!(item.expires_at.is_none());
    }

    #[test]
    fn partially_assigned_item_violates_invariant() {
        let mut item = sample_item();
        item.status = ItemStatus::Assigned;
        item.assigned_to = Some(EmailAddress::parse("buyer@example.com").unwrap());
        // assigned_at and order_id missing
        assert!(!item.assignment_is_consistent());

        item.assigned_at = Some(Utc::now());
        item.order_id = Some(common::OrderId::new());
        assert!(item.assignment_is_consistent());
    }

    #[test]
    fn is_expired_respects_the_deadline() {
        let now = Utc::now();
        let mut item = sample_item();
        item.status = ItemStatus::Assigned;
        item.expires_at = Some(now + TimeDelta::days(1));

        assert!(!item.is_expired(now));
        assert!(item.is_expired(now + TimeDelta::days(1)));
        assert!(item.is_expired(now + TimeDelta::days(2)));
    }

    #[test]
    fn available_item_never_reports_expired() {
        let mut item = sample_item();
        item.expires_at = Some(Utc::now() - TimeDelta::days(1));
        assert!(!item.is_expired(Utc::now()));
    }
}
