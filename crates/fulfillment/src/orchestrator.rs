//! The fulfillment orchestrator.

use chrono::{DateTime, TimeDelta, Utc};
use common::{ItemId, OrderId};
use domain::{InventoryItem, NewOrder, Order, ProcessingOutcome, ProviderEventId};
use store::{
    ClaimOutcome, FulfillmentStore, OrderOutcome, ReserveOutcome, ReserveRequest,
};
use webhook::{CheckoutSession, EventKind, EventVerifier};

use crate::error::{FulfillmentError, Result};
use crate::notification::{IssuedCredential, Notification, NotificationPort};
use crate::policy::CategoryPolicy;
use crate::state::FulfillmentState;

/// Result of one fulfillment run, as seen by the HTTP boundary.
///
/// Every variant is a success: duplicates and stock-outs are business
/// conditions the provider must not retry. Failures surface as
/// [`FulfillmentError`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FulfillmentOutcome {
    /// The event type is not one the store acts on.
    Ignored { event_type: String },

    /// The event or its checkout session was already processed.
    Duplicate { event_id: ProviderEventId },

    /// Order recorded and a credential assigned. `notified` reports
    /// whether both outbound messages were accepted by the transport.
    Fulfilled {
        order_id: OrderId,
        item_id: ItemId,
        notified: bool,
    },

    /// Order recorded but the category pool was empty; flagged for the
    /// operator, nothing rolled back — the payment was real.
    Backordered { order_id: OrderId },
}

/// What happened inside the storage transaction.
enum TxStep {
    AlreadyProcessed,
    DuplicateSession,
    Backordered(Order),
    Fulfilled(Order, InventoryItem),
}

/// Orchestrates one fulfillment run per inbound provider event.
///
/// The run drives verify → claim → persist order → reserve inventory →
/// commit → notify. The ledger claim, order insert, and reservation share
/// one storage transaction, so no partial state survives a failure; the
/// notification runs strictly after commit and never rolls anything back.
/// Many runs may execute concurrently — every cross-run guard lives in the
/// storage layer, not here.
pub struct FulfillmentOrchestrator<S, N>
where
    S: FulfillmentStore,
    N: NotificationPort,
{
    verifier: EventVerifier,
    store: S,
    notifier: N,
    policy: CategoryPolicy,
    validity: TimeDelta,
    tx_deadline: std::time::Duration,
}

/// Default bound on the transactional part of one attempt.
const DEFAULT_TX_DEADLINE: std::time::Duration = std::time::Duration::from_secs(10);

impl<S, N> FulfillmentOrchestrator<S, N>
where
    S: FulfillmentStore,
    N: NotificationPort,
{
    /// Creates a new orchestrator.
    ///
    /// `validity` is the credential validity period applied at
    /// reservation time (expiry = assignment time + validity).
    pub fn new(
        verifier: EventVerifier,
        store: S,
        notifier: N,
        policy: CategoryPolicy,
        validity: TimeDelta,
    ) -> Self {
        Self {
            verifier,
            store,
            notifier,
            policy,
            validity,
            tx_deadline: DEFAULT_TX_DEADLINE,
        }
    }

    /// Overrides the deadline bounding the transactional part of one
    /// attempt.
    pub fn with_tx_deadline(mut self, deadline: std::time::Duration) -> Self {
        self.tx_deadline = deadline;
        self
    }

    /// Returns a reference to the underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Processes one raw delivery.
    #[tracing::instrument(skip(self, payload, signature_header))]
    pub async fn process(
        &self,
        payload: &[u8],
        signature_header: Option<&str>,
    ) -> Result<FulfillmentOutcome> {
        metrics::counter!("fulfillment_events_total").increment(1);
        let run_start = std::time::Instant::now();
        let mut state = FulfillmentState::Received;

        let event = match self.verifier.verify(payload, signature_header) {
            Ok(event) => event,
            Err(e) => {
                state = FulfillmentState::VerificationFailed;
                tracing::warn!(%state, error = %e, "webhook delivery rejected");
                return Err(e.into());
            }
        };
        state = FulfillmentState::Verified;
        tracing::debug!(event_id = %event.id, %state, "event verified");

        let session = match event.kind {
            EventKind::CheckoutCompleted(session) => session,
            EventKind::Ignored { event_type } => {
                metrics::counter!("fulfillment_ignored_total").increment(1);
                tracing::info!(event_id = %event.id, %event_type, "ignoring event type");
                return Ok(FulfillmentOutcome::Ignored { event_type });
            }
        };

        let now = Utc::now();
        let expires_at = now + self.validity;

        let mut tx = self.store.begin().await?;
        let attempt = tokio::time::timeout(
            self.tx_deadline,
            self.fulfill_in_tx(&mut tx, &event.id, &session, now, expires_at, &mut state),
        );
        let step = match attempt.await {
            Ok(Ok(step)) => step,
            Ok(Err(e)) => {
                // The claim must not survive a failed attempt; a retried
                // delivery has to be able to reclaim and complete.
                let _ = self.store.rollback(tx).await;
                return Err(FulfillmentError::Store(e));
            }
            Err(_) => {
                let _ = self.store.rollback(tx).await;
                tracing::warn!(event_id = %event.id, "attempt exceeded its deadline, rolled back");
                return Err(FulfillmentError::DeadlineExceeded);
            }
        };

        let outcome = match step {
            TxStep::AlreadyProcessed => {
                self.store.rollback(tx).await?;
                state = FulfillmentState::DuplicateSkip;
                metrics::counter!("fulfillment_duplicates_total").increment(1);
                tracing::info!(event_id = %event.id, %state, "duplicate event delivery");
                FulfillmentOutcome::Duplicate { event_id: event.id }
            }
            TxStep::DuplicateSession => {
                // Distinct event id, same checkout session. Rolling back
                // drops the claim: a ledger entry may only exist alongside
                // committed side effects.
                self.store.rollback(tx).await?;
                state = FulfillmentState::DuplicateSkip;
                metrics::counter!("fulfillment_duplicates_total").increment(1);
                tracing::info!(
                    event_id = %event.id,
                    session_id = %session.session_id,
                    %state,
                    "session already fulfilled under another event id"
                );
                FulfillmentOutcome::Duplicate { event_id: event.id }
            }
            TxStep::Backordered(order) => {
                self.store.commit(tx).await?;
                state = FulfillmentState::Completed;
                metrics::counter!("fulfillment_backorders_total").increment(1);
                tracing::warn!(
                    order_id = %order.id,
                    customer = %order.customer_email,
                    product = %order.product,
                    %state,
                    "inventory exhausted, order backordered for manual fulfillment"
                );
                FulfillmentOutcome::Backordered { order_id: order.id }
            }
            TxStep::Fulfilled(order, item) => {
                self.store.commit(tx).await?;
                let notified = self.notify(&order, &item, expires_at, &mut state).await;
                state = FulfillmentState::Completed;
                metrics::counter!("fulfillment_completed").increment(1);
                tracing::info!(
                    event_id = %event.id,
                    order_id = %order.id,
                    item_id = %item.id,
                    category = %item.category,
                    notified,
                    %state,
                    "fulfillment completed"
                );
                FulfillmentOutcome::Fulfilled {
                    order_id: order.id,
                    item_id: item.id,
                    notified,
                }
            }
        };

        metrics::histogram!("fulfillment_duration_seconds")
            .record(run_start.elapsed().as_secs_f64());
        Ok(outcome)
    }

    /// Runs the transactional middle of the state machine: claim, order,
    /// reservation, outcome stamp. The caller owns commit/rollback.
    async fn fulfill_in_tx(
        &self,
        tx: &mut S::Tx,
        event_id: &ProviderEventId,
        session: &CheckoutSession,
        now: DateTime<Utc>,
        expires_at: DateTime<Utc>,
        state: &mut FulfillmentState,
    ) -> store::Result<TxStep> {
        match self.store.claim_event(tx, event_id, now).await? {
            ClaimOutcome::AlreadyProcessed => return Ok(TxStep::AlreadyProcessed),
            ClaimOutcome::Claimed => {}
        }
        *state = FulfillmentState::Deduplicated;
        tracing::debug!(%event_id, state = %*state, "event claimed");

        let new_order = NewOrder {
            customer_email: session.customer_email.clone(),
            session_id: session.session_id.clone(),
            product: session.product.clone(),
            amount: session.amount_total,
            currency: session.currency.clone(),
        };
        let order = match self.store.insert_order(tx, new_order, now).await? {
            OrderOutcome::Created(order) => order,
            OrderOutcome::DuplicateSession => return Ok(TxStep::DuplicateSession),
        };
        *state = FulfillmentState::OrderPersisted;
        tracing::debug!(order_id = %order.id, state = %*state, "order recorded");

        let category = self.policy.resolve(&session.product);
        let request = ReserveRequest {
            category,
            customer: order.customer_email.clone(),
            order_id: order.id,
            assigned_at: now,
            expires_at,
        };
        match self.store.reserve_item(tx, request).await? {
            ReserveOutcome::Allocated(item) => {
                *state = FulfillmentState::Allocated;
                tracing::debug!(item_id = %item.id, state = %*state, "item reserved");
                self.store
                    .record_outcome(tx, event_id, ProcessingOutcome::Fulfilled)
                    .await?;
                Ok(TxStep::Fulfilled(order, item))
            }
            ReserveOutcome::OutOfStock => {
                *state = FulfillmentState::Backordered;
                tracing::debug!(%category, state = %*state, "no item available");
                self.store
                    .record_outcome(tx, event_id, ProcessingOutcome::Backordered)
                    .await?;
                Ok(TxStep::Backordered(order))
            }
        }
    }

    /// Sends the confirmation and credential messages for a fulfilled
    /// order. Best-effort: a refused delivery leaves the order and the
    /// allocation standing and is surfaced for manual resend.
    async fn notify(
        &self,
        order: &Order,
        item: &InventoryItem,
        expires_at: DateTime<Utc>,
        state: &mut FulfillmentState,
    ) -> bool {
        let confirmation =
            Notification::order_confirmation(order.customer_email.clone(), order.id);
        let credential = Notification::credential_issued(
            order.customer_email.clone(),
            order.id,
            IssuedCredential {
                login: item.login.clone(),
                password: item.password.clone(),
                category: item.category,
                expires_at,
            },
        );

        for notification in [confirmation, credential] {
            let kind = notification.kind;
            if let Err(e) = self.notifier.send(notification).await {
                *state = FulfillmentState::NotifyFailed;
                metrics::counter!("notification_failures_total").increment(1);
                tracing::warn!(
                    order_id = %order.id,
                    ?kind,
                    error = %e,
                    state = %*state,
                    "notification failed, manual resend required"
                );
                return false;
            }
        }

        *state = FulfillmentState::Notified;
        tracing::debug!(order_id = %order.id, state = %*state, "notifications sent");
        true
    }
}
