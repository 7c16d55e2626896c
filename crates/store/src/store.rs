use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{ItemId, OrderId};
use domain::{
    Category, EmailAddress, InventoryItem, NewInventoryItem, NewOrder, Order, ProcessedEvent,
    ProcessingOutcome, ProviderEventId, SessionId,
};

use crate::Result;

/// Outcome of claiming an event id in the idempotency ledger.
///
/// `AlreadyProcessed` is not an error: it tells the caller to short-circuit
/// as a success no-op, which is what makes provider redelivery safe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClaimOutcome {
    /// The event id was claimed by this transaction.
    Claimed,
    /// A committed ledger entry already exists for this event id.
    AlreadyProcessed,
}

/// Outcome of recording an order.
///
/// `DuplicateSession` is the second idempotency guard beneath the ledger:
/// providers can emit distinct event ids that reference the same checkout
/// session, and the unique session index catches those.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrderOutcome {
    /// The order was recorded.
    Created(Order),
    /// An order already exists for this session id.
    DuplicateSession,
}

/// Outcome of reserving an inventory item.
///
/// `OutOfStock` is a normal business condition, not a failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReserveOutcome {
    /// Exactly one item was transitioned Available → Assigned.
    Allocated(InventoryItem),
    /// No available item exists in the requested category.
    OutOfStock,
}

/// Input for one reservation: who gets the item and for which order,
/// with the assignment timestamps fixed by the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReserveRequest {
    pub category: Category,
    pub customer: EmailAddress,
    pub order_id: OrderId,
    pub assigned_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// Core trait for fulfillment storage backends.
///
/// The ledger claim, order insert, and item reservation are
/// transaction-scoped: they take a `Tx` handle obtained from
/// [`FulfillmentStore::begin`] and only become visible on
/// [`FulfillmentStore::commit`]. A dropped or rolled-back transaction
/// leaves no trace, including the claim — that is what lets a redelivery
/// reclaim an event whose first attempt died mid-flight.
///
/// Maintenance operations and reads run directly against the backend.
/// All implementations must be thread-safe (Send + Sync).
#[async_trait]
pub trait FulfillmentStore: Send + Sync {
    /// Transaction handle type.
    type Tx: Send;

    /// Opens a transaction.
    async fn begin(&self) -> Result<Self::Tx>;

    /// Commits a transaction, making its writes visible atomically.
    async fn commit(&self, tx: Self::Tx) -> Result<()>;

    /// Rolls a transaction back, discarding all of its writes.
    async fn rollback(&self, tx: Self::Tx) -> Result<()>;

    /// Claims an event id in the ledger iff no entry exists.
    ///
    /// The claim is an atomic conditional insert; two concurrent claims
    /// for the same id serialize in the backend and exactly one observes
    /// `Claimed`.
    async fn claim_event(
        &self,
        tx: &mut Self::Tx,
        event_id: &ProviderEventId,
        now: DateTime<Utc>,
    ) -> Result<ClaimOutcome>;

    /// Stamps the final processing outcome on a claimed ledger entry.
    async fn record_outcome(
        &self,
        tx: &mut Self::Tx,
        event_id: &ProviderEventId,
        outcome: ProcessingOutcome,
    ) -> Result<()>;

    /// Records an order, enforcing the unique session invariant.
    async fn insert_order(
        &self,
        tx: &mut Self::Tx,
        order: NewOrder,
        now: DateTime<Utc>,
    ) -> Result<OrderOutcome>;

    /// Atomically reserves one available item in the requested category.
    ///
    /// Two racing reservations never receive the same item: the backend
    /// either locks the selected row until commit or performs a
    /// conditional update keyed on the prior status.
    async fn reserve_item(
        &self,
        tx: &mut Self::Tx,
        request: ReserveRequest,
    ) -> Result<ReserveOutcome>;

    /// Manually releases an assigned item (Assigned → Expired).
    ///
    /// Returns true if the item existed and was assigned.
    async fn release_item(&self, item_id: ItemId) -> Result<bool>;

    /// Expires assigned items whose validity elapsed at `now`.
    ///
    /// Idempotent; never touches available items. Returns the number of
    /// items transitioned.
    async fn sweep_expired(&self, now: DateTime<Utc>) -> Result<u64>;

    /// Creates fresh available items. Returns their ids.
    async fn restock(
        &self,
        items: Vec<NewInventoryItem>,
        now: DateTime<Utc>,
    ) -> Result<Vec<ItemId>>;

    /// Loads an order by id.
    async fn get_order(&self, id: OrderId) -> Result<Option<Order>>;

    /// Loads an order by its provider session id.
    async fn find_order_by_session(&self, session_id: &SessionId) -> Result<Option<Order>>;

    /// Loads an inventory item by id.
    async fn get_item(&self, id: ItemId) -> Result<Option<InventoryItem>>;

    /// Counts available items in a category.
    async fn available_count(&self, category: Category) -> Result<u64>;

    /// Loads a committed ledger entry by event id.
    async fn get_processed_event(
        &self,
        event_id: &ProviderEventId,
    ) -> Result<Option<ProcessedEvent>>;
}
