//! Notification port trait and in-memory implementation.

use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::OrderId;
use domain::{Category, EmailAddress};
use thiserror::Error;

/// Identifier the transport assigns to an accepted delivery.
pub type DeliveryId = String;

/// Errors raised by a notification transport.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NotificationError {
    /// The transport rejected or failed the delivery.
    #[error("notification transport error: {0}")]
    Transport(String),
}

/// The kind of outbound message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    /// Purchase confirmation for a recorded order.
    OrderConfirmation,
    /// Credential details for an assigned inventory item.
    CredentialIssued,
}

/// Credential fields included in a `CredentialIssued` message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedCredential {
    pub login: String,
    pub password: String,
    pub category: Category,
    pub expires_at: DateTime<Utc>,
}

/// One outbound message.
///
/// `credential` is present exactly for `CredentialIssued`; `order_id` is
/// always the persisted order's real identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub kind: NotificationKind,
    pub recipient: EmailAddress,
    pub order_id: OrderId,
    pub credential: Option<IssuedCredential>,
}

impl Notification {
    /// Builds a purchase confirmation for an order.
    pub fn order_confirmation(recipient: EmailAddress, order_id: OrderId) -> Self {
        Self {
            kind: NotificationKind::OrderConfirmation,
            recipient,
            order_id,
            credential: None,
        }
    }

    /// Builds a credential-issued message for an assignment.
    pub fn credential_issued(
        recipient: EmailAddress,
        order_id: OrderId,
        credential: IssuedCredential,
    ) -> Self {
        Self {
            kind: NotificationKind::CredentialIssued,
            recipient,
            order_id,
            credential: Some(credential),
        }
    }
}

/// Trait for the outbound notification transport.
///
/// The actual transport (email or equivalent) is an external collaborator.
/// Implementations must not be called while a storage transaction is open;
/// the orchestrator sends strictly after commit, and failures are logged,
/// never retried synchronously.
#[async_trait]
pub trait NotificationPort: Send + Sync {
    /// Sends one message; returns the transport's delivery identifier.
    async fn send(&self, notification: Notification) -> Result<DeliveryId, NotificationError>;
}

/// Notification port that logs deliveries instead of sending them.
///
/// Stands in for the external email transport in deployments where none is
/// wired up; every "delivery" is a structured log line an operator can act
/// on.
#[derive(Debug, Clone, Default)]
pub struct LoggingNotifier {
    counter: Arc<std::sync::atomic::AtomicU64>,
}

impl LoggingNotifier {
    /// Creates a new logging notifier.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl NotificationPort for LoggingNotifier {
    async fn send(&self, notification: Notification) -> Result<DeliveryId, NotificationError> {
        let n = self
            .counter
            .fetch_add(1, std::sync::atomic::Ordering::SeqCst)
            + 1;
        let delivery_id = format!("LOG-{n:04}");
        tracing::info!(
            kind = ?notification.kind,
            recipient = %notification.recipient,
            order_id = %notification.order_id,
            %delivery_id,
            "notification delivered to log transport"
        );
        Ok(delivery_id)
    }
}

#[derive(Debug, Default)]
struct InMemoryNotifierState {
    sent: Vec<Notification>,
    next_id: u32,
    fail_on_send: bool,
}

/// In-memory notification port for testing.
#[derive(Debug, Clone, Default)]
pub struct InMemoryNotifier {
    state: Arc<RwLock<InMemoryNotifierState>>,
}

impl InMemoryNotifier {
    /// Creates a new in-memory notifier.
    pub fn new() -> Self {
        Self::default()
    }

    /// Configures the notifier to fail on send until cleared.
    pub fn set_fail_on_send(&self, fail: bool) {
        self.state.write().unwrap().fail_on_send = fail;
    }

    /// Returns the number of accepted deliveries.
    pub fn sent_count(&self) -> usize {
        self.state.read().unwrap().sent.len()
    }

    /// Returns every accepted delivery.
    pub fn sent(&self) -> Vec<Notification> {
        self.state.read().unwrap().sent.clone()
    }
}

#[async_trait]
impl NotificationPort for InMemoryNotifier {
    async fn send(&self, notification: Notification) -> Result<DeliveryId, NotificationError> {
        let mut state = self.state.write().unwrap();

        if state.fail_on_send {
            return Err(NotificationError::Transport(
                "delivery refused".to_string(),
            ));
        }

        state.next_id += 1;
        let delivery_id = format!("MSG-{:04}", state.next_id);
        state.sent.push(notification);
        Ok(delivery_id)
    }
}
