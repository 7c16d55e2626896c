//! Domain layer for the fulfillment service.
//!
//! This crate provides the entities and value objects the rest of the
//! system persists and passes around:
//! - `Order` — the commercial record of one fulfilled purchase
//! - `InventoryItem` — a uniquely assignable credential
//! - `ProcessedEvent` — the idempotency ledger entry for one provider event
//! - value objects for emails, provider identifiers, money, and categories

pub mod error;
pub mod inventory;
pub mod ledger;
pub mod order;
pub mod value_objects;

pub use error::DomainError;
pub use inventory::{InventoryItem, ItemStatus, NewInventoryItem};
pub use ledger::{ProcessedEvent, ProcessingOutcome};
pub use order::{NewOrder, Order, OrderStatus};
pub use value_objects::{Category, EmailAddress, Money, ProviderEventId, SessionId};
