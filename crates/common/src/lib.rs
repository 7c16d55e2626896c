//! Shared identifier types used across the fulfillment service crates.

pub mod types;

pub use types::{ItemId, OrderId};
