use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{ItemId, OrderId};
use domain::{
    Category, InventoryItem, ItemStatus, NewInventoryItem, NewOrder, Order, ProcessedEvent,
    ProcessingOutcome, ProviderEventId, SessionId,
};
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::{
    Result, StoreError,
    store::{ClaimOutcome, FulfillmentStore, OrderOutcome, ReserveOutcome, ReserveRequest},
};

#[derive(Debug, Clone, Default)]
struct StoreState {
    orders: Vec<Order>,
    items: HashMap<ItemId, InventoryItem>,
    ledger: HashMap<String, ProcessedEvent>,
}

/// In-memory fulfillment store for testing.
///
/// Transactions serialize on an owned mutex guard and stage their writes
/// against a copy of the state, so a rolled-back (or dropped) transaction
/// leaves no trace — including the ledger claim. This mirrors the isolation
/// the PostgreSQL implementation gets from real transactions, at the cost
/// of running one transaction at a time.
#[derive(Clone, Default)]
pub struct InMemoryFulfillmentStore {
    state: Arc<Mutex<StoreState>>,
    fail_on_insert_order: Arc<AtomicBool>,
    fail_on_reserve: Arc<AtomicBool>,
}

/// An open in-memory transaction: the lock plus the staged state.
pub struct InMemoryTx {
    guard: OwnedMutexGuard<StoreState>,
    staged: StoreState,
}

impl InMemoryFulfillmentStore {
    /// Creates a new empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Configures `insert_order` to fail until cleared. Lets tests simulate
    /// a storage fault between the ledger claim and the order commit.
    pub fn set_fail_on_insert_order(&self, fail: bool) {
        self.fail_on_insert_order.store(fail, Ordering::SeqCst);
    }

    /// Configures `reserve_item` to fail until cleared.
    pub fn set_fail_on_reserve(&self, fail: bool) {
        self.fail_on_reserve.store(fail, Ordering::SeqCst);
    }

    /// Returns the total number of committed orders.
    pub async fn order_count(&self) -> usize {
        self.state.lock().await.orders.len()
    }

    /// Returns the number of committed items in the given status.
    pub async fn item_count(&self, status: ItemStatus) -> usize {
        self.state
            .lock()
            .await
            .items
            .values()
            .filter(|item| item.status == status)
            .count()
    }

    /// Returns the number of committed ledger entries.
    pub async fn ledger_count(&self) -> usize {
        self.state.lock().await.ledger.len()
    }

    /// Returns every committed item, for invariant checks in tests.
    pub async fn all_items(&self) -> Vec<InventoryItem> {
        self.state.lock().await.items.values().cloned().collect()
    }
}

#[async_trait]
impl FulfillmentStore for InMemoryFulfillmentStore {
    type Tx = InMemoryTx;

    async fn begin(&self) -> Result<Self::Tx> {
        let guard = Arc::clone(&self.state).lock_owned().await;
        let staged = guard.clone();
        Ok(InMemoryTx { guard, staged })
    }

    async fn commit(&self, tx: Self::Tx) -> Result<()> {
        let InMemoryTx { mut guard, staged } = tx;
        *guard = staged;
        Ok(())
    }

    async fn rollback(&self, tx: Self::Tx) -> Result<()> {
        drop(tx);
        Ok(())
    }

    async fn claim_event(
        &self,
        tx: &mut Self::Tx,
        event_id: &ProviderEventId,
        now: DateTime<Utc>,
    ) -> Result<ClaimOutcome> {
        if tx.staged.ledger.contains_key(event_id.as_str()) {
            return Ok(ClaimOutcome::AlreadyProcessed);
        }
        tx.staged.ledger.insert(
            event_id.as_str().to_string(),
            ProcessedEvent {
                event_id: event_id.clone(),
                outcome: ProcessingOutcome::Pending,
                processed_at: now,
            },
        );
        Ok(ClaimOutcome::Claimed)
    }

    async fn record_outcome(
        &self,
        tx: &mut Self::Tx,
        event_id: &ProviderEventId,
        outcome: ProcessingOutcome,
    ) -> Result<()> {
        match tx.staged.ledger.get_mut(event_id.as_str()) {
            Some(entry) => {
                entry.outcome = outcome;
                Ok(())
            }
            None => Err(StoreError::Corrupt(format!(
                "no ledger claim for event {event_id}"
            ))),
        }
    }

    async fn insert_order(
        &self,
        tx: &mut Self::Tx,
        order: NewOrder,
        now: DateTime<Utc>,
    ) -> Result<OrderOutcome> {
        if self.fail_on_insert_order.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("insert_order".to_string()));
        }

        if tx
            .staged
            .orders
            .iter()
            .any(|existing| existing.session_id == order.session_id)
        {
            return Ok(OrderOutcome::DuplicateSession);
        }

        let order = order.into_order(now);
        tx.staged.orders.push(order.clone());
        Ok(OrderOutcome::Created(order))
    }

    async fn reserve_item(
        &self,
        tx: &mut Self::Tx,
        request: ReserveRequest,
    ) -> Result<ReserveOutcome> {
        if self.fail_on_reserve.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("reserve_item".to_string()));
        }

        let candidate = tx
            .staged
            .items
            .values_mut()
            .find(|item| item.category == request.category && item.status.can_assign());

        match candidate {
            Some(item) => {
                item.status = ItemStatus::Assigned;
                item.assigned_to = Some(request.customer);
                item.assigned_at = Some(request.assigned_at);
                item.order_id = Some(request.order_id);
                item.expires_at = Some(request.expires_at);
                Ok(ReserveOutcome::Allocated(item.clone()))
            }
            None => Ok(ReserveOutcome::OutOfStock),
        }
    }

    async fn release_item(&self, item_id: ItemId) -> Result<bool> {
        let mut state = self.state.lock().await;
        match state.items.get_mut(&item_id) {
            Some(item) if item.status.can_expire() => {
                item.status = ItemStatus::Expired;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn sweep_expired(&self, now: DateTime<Utc>) -> Result<u64> {
        let mut state = self.state.lock().await;
        let mut swept = 0;
        for item in state.items.values_mut() {
            if item.is_expired(now) {
                item.status = ItemStatus::Expired;
                swept += 1;
            }
        }
        Ok(swept)
    }

    async fn restock(
        &self,
        items: Vec<NewInventoryItem>,
        now: DateTime<Utc>,
    ) -> Result<Vec<ItemId>> {
        let mut state = self.state.lock().await;
        let mut ids = Vec::with_capacity(items.len());
        for input in items {
            let item = InventoryItem::available(input, now);
            ids.push(item.id);
            state.items.insert(item.id, item);
        }
        Ok(ids)
    }

    async fn get_order(&self, id: OrderId) -> Result<Option<Order>> {
        let state = self.state.lock().await;
        Ok(state.orders.iter().find(|order| order.id == id).cloned())
    }

    async fn find_order_by_session(&self, session_id: &SessionId) -> Result<Option<Order>> {
        let state = self.state.lock().await;
        Ok(state
            .orders
            .iter()
            .find(|order| &order.session_id == session_id)
            .cloned())
    }

    async fn get_item(&self, id: ItemId) -> Result<Option<InventoryItem>> {
        let state = self.state.lock().await;
        Ok(state.items.get(&id).cloned())
    }

    async fn available_count(&self, category: Category) -> Result<u64> {
        let state = self.state.lock().await;
        Ok(state
            .items
            .values()
            .filter(|item| item.category == category && item.status == ItemStatus::Available)
            .count() as u64)
    }

    async fn get_processed_event(
        &self,
        event_id: &ProviderEventId,
    ) -> Result<Option<ProcessedEvent>> {
        let state = self.state.lock().await;
        Ok(state.ledger.get(event_id.as_str()).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeDelta;
    use domain::{EmailAddress, Money};

    fn new_order(session: &str) -> NewOrder {
        NewOrder {
            customer_email: EmailAddress::parse("buyer@example.com").unwrap(),
            session_id: SessionId::new(session).unwrap(),
            product: "Copilot Pro Seat".to_string(),
            amount: Money::from_cents(1999),
            currency: "usd".to_string(),
        }
    }

    fn new_item(category: Category) -> NewInventoryItem {
        NewInventoryItem {
            category,
            login: "seat-001@pool.example.com".to_string(),
            password: "hunter2".to_string(),
            notes: None,
        }
    }

    fn reserve_request(order_id: OrderId, now: DateTime<Utc>) -> ReserveRequest {
        ReserveRequest {
            category: Category::Pro,
            customer: EmailAddress::parse("buyer@example.com").unwrap(),
            order_id,
            assigned_at: now,
            expires_at: now + TimeDelta::days(365),
        }
    }

    #[tokio::test]
    async fn claim_is_first_writer_wins() {
        let store = InMemoryFulfillmentStore::new();
        let event_id = ProviderEventId::new("evt_1").unwrap();
        let now = Utc::now();

        let mut tx = store.begin().await.unwrap();
        assert_eq!(
            store.claim_event(&mut tx, &event_id, now).await.unwrap(),
            ClaimOutcome::Claimed
        );
        store
            .record_outcome(&mut tx, &event_id, ProcessingOutcome::Fulfilled)
            .await
            .unwrap();
        store.commit(tx).await.unwrap();

        let mut tx = store.begin().await.unwrap();
        assert_eq!(
            store.claim_event(&mut tx, &event_id, now).await.unwrap(),
            ClaimOutcome::AlreadyProcessed
        );
        store.rollback(tx).await.unwrap();

        let entry = store.get_processed_event(&event_id).await.unwrap().unwrap();
        assert_eq!(entry.outcome, ProcessingOutcome::Fulfilled);
    }

    #[tokio::test]
    async fn rolled_back_claim_leaves_no_trace() {
        let store = InMemoryFulfillmentStore::new();
        let event_id = ProviderEventId::new("evt_1").unwrap();
        let now = Utc::now();

        let mut tx = store.begin().await.unwrap();
        store.claim_event(&mut tx, &event_id, now).await.unwrap();
        store.rollback(tx).await.unwrap();

        assert_eq!(store.ledger_count().await, 0);

        // A retried delivery can reclaim.
        let mut tx = store.begin().await.unwrap();
        assert_eq!(
            store.claim_event(&mut tx, &event_id, now).await.unwrap(),
            ClaimOutcome::Claimed
        );
        store.commit(tx).await.unwrap();
        assert_eq!(store.ledger_count().await, 1);
    }

    #[tokio::test]
    async fn duplicate_session_is_reported_not_inserted() {
        let store = InMemoryFulfillmentStore::new();
        let now = Utc::now();

        let mut tx = store.begin().await.unwrap();
        let outcome = store
            .insert_order(&mut tx, new_order("sess_1"), now)
            .await
            .unwrap();
        assert!(matches!(outcome, OrderOutcome::Created(_)));
        store.commit(tx).await.unwrap();

        let mut tx = store.begin().await.unwrap();
        let outcome = store
            .insert_order(&mut tx, new_order("sess_1"), now)
            .await
            .unwrap();
        assert_eq!(outcome, OrderOutcome::DuplicateSession);
        store.rollback(tx).await.unwrap();

        assert_eq!(store.order_count().await, 1);
    }

    #[tokio::test]
    async fn reserve_consumes_exactly_one_item() {
        let store = InMemoryFulfillmentStore::new();
        let now = Utc::now();
        store
            .restock(vec![new_item(Category::Pro), new_item(Category::Pro)], now)
            .await
            .unwrap();

        let mut tx = store.begin().await.unwrap();
        let outcome = store
            .reserve_item(&mut tx, reserve_request(OrderId::new(), now))
            .await
            .unwrap();
        store.commit(tx).await.unwrap();

        let item = match outcome {
            ReserveOutcome::Allocated(item) => item,
            ReserveOutcome::OutOfStock => panic!("expected an allocation"),
        };
        assert_eq!(item.status, ItemStatus::Assigned);
        assert!(item.assignment_is_consistent());
        assert_eq!(store.item_count(ItemStatus::Available).await, 1);
        assert_eq!(store.item_count(ItemStatus::Assigned).await, 1);
    }

    #[tokio::test]
    async fn reserve_reports_out_of_stock_per_category() {
        let store = InMemoryFulfillmentStore::new();
        let now = Utc::now();
        store
            .restock(vec![new_item(Category::Education)], now)
            .await
            .unwrap();

        let mut tx = store.begin().await.unwrap();
        let outcome = store
            .reserve_item(&mut tx, reserve_request(OrderId::new(), now))
            .await
            .unwrap();
        store.rollback(tx).await.unwrap();

        assert_eq!(outcome, ReserveOutcome::OutOfStock);
        assert_eq!(store.item_count(ItemStatus::Available).await, 1);
    }

    #[tokio::test]
    async fn concurrent_reserves_of_last_item_yield_one_winner() {
        let store = InMemoryFulfillmentStore::new();
        let now = Utc::now();
        store.restock(vec![new_item(Category::Pro)], now).await.unwrap();

        let mut handles = Vec::new();
        for _ in 0..8 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                let mut tx = store.begin().await.unwrap();
                let outcome = store
                    .reserve_item(&mut tx, reserve_request(OrderId::new(), now))
                    .await
                    .unwrap();
                store.commit(tx).await.unwrap();
                outcome
            }));
        }

        let mut allocated = 0;
        let mut out_of_stock = 0;
        for handle in handles {
            match handle.await.unwrap() {
                ReserveOutcome::Allocated(_) => allocated += 1,
                ReserveOutcome::OutOfStock => out_of_stock += 1,
            }
        }

        assert_eq!(allocated, 1);
        assert_eq!(out_of_stock, 7);
        assert_eq!(store.item_count(ItemStatus::Assigned).await, 1);
    }

    #[tokio::test]
    async fn sweep_expires_only_elapsed_assignments() {
        let store = InMemoryFulfillmentStore::new();
        let reserved_at = Utc::now();
        let ids = store
            .restock(
                vec![new_item(Category::Pro), new_item(Category::Pro)],
                reserved_at,
            )
            .await
            .unwrap();

        let mut tx = store.begin().await.unwrap();
        store
            .reserve_item(&mut tx, reserve_request(OrderId::new(), reserved_at))
            .await
            .unwrap();
        store.commit(tx).await.unwrap();

        // TTL is exactly 365 days from assignment.
        let just_before = reserved_at + TimeDelta::days(365) - TimeDelta::seconds(1);
        assert_eq!(store.sweep_expired(just_before).await.unwrap(), 0);

        let at_expiry = reserved_at + TimeDelta::days(365);
        assert_eq!(store.sweep_expired(at_expiry).await.unwrap(), 1);

        // Idempotent; the untouched available item stays available.
        assert_eq!(store.sweep_expired(at_expiry).await.unwrap(), 0);
        assert_eq!(store.item_count(ItemStatus::Available).await, 1);
        assert_eq!(store.item_count(ItemStatus::Expired).await, 1);
        let _ = ids;
    }

    #[tokio::test]
    async fn release_only_touches_assigned_items() {
        let store = InMemoryFulfillmentStore::new();
        let now = Utc::now();
        let ids = store
            .restock(vec![new_item(Category::Pro)], now)
            .await
            .unwrap();

        // Available items cannot be released.
        assert!(!store.release_item(ids[0]).await.unwrap());

        let mut tx = store.begin().await.unwrap();
        store
            .reserve_item(&mut tx, reserve_request(OrderId::new(), now))
            .await
            .unwrap();
        store.commit(tx).await.unwrap();

        assert!(store.release_item(ids[0]).await.unwrap());
        assert!(!store.release_item(ids[0]).await.unwrap());
        assert_eq!(store.item_count(ItemStatus::Expired).await, 1);
    }

    #[tokio::test]
    async fn all_committed_items_satisfy_assignment_invariant() {
        let store = InMemoryFulfillmentStore::new();
        let now = Utc::now();
        store
            .restock(vec![new_item(Category::Pro), new_item(Category::Pro)], now)
            .await
            .unwrap();

        let mut tx = store.begin().await.unwrap();
        store
            .reserve_item(&mut tx, reserve_request(OrderId::new(), now))
            .await
            .unwrap();
        store.commit(tx).await.unwrap();

        for item in store.all_items().await {
            assert!(item.assignment_is_consistent(), "item {:?}", item.id);
        }
    }
}
