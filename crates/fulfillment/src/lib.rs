//! Fulfillment orchestration.
//!
//! One orchestrator run turns one inbound provider notification into at
//! most one order and at most one credential assignment:
//! verify → claim → persist order → reserve inventory → commit → notify.
//!
//! The ledger claim, order insert, and reservation share one storage
//! transaction; the notification runs strictly after commit and never
//! rolls anything back.

pub mod error;
pub mod notification;
pub mod orchestrator;
pub mod policy;
pub mod state;

pub use error::FulfillmentError;
pub use notification::{
    DeliveryId, InMemoryNotifier, IssuedCredential, LoggingNotifier, Notification,
    NotificationError, NotificationKind, NotificationPort,
};
pub use orchestrator::{FulfillmentOrchestrator, FulfillmentOutcome};
pub use policy::CategoryPolicy;
pub use state::FulfillmentState;
