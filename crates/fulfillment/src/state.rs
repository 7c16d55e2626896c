//! Fulfillment state machine.

use serde::{Deserialize, Serialize};

/// The state of one fulfillment run over one inbound event.
///
/// State transitions:
/// ```text
/// Received ──► Verified ──► Deduplicated ──► OrderPersisted ──┬──► Allocated ──┬──► Notified ─────► Completed
///     │            │                                          │                └──► NotifyFailed ─► Completed
///     │            └──► DuplicateSkip                         └──► Backordered ──────────────────► Completed
///     └──► VerificationFailed
/// ```
/// `VerificationFailed` and `DuplicateSkip` are terminal early exits;
/// everything past deduplication converges on `Completed` because the
/// caller must see success once a valid, unseen event was handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum FulfillmentState {
    /// The raw delivery arrived.
    #[default]
    Received,

    /// Signature verified, payload parsed.
    Verified,

    /// Event id claimed in the ledger.
    Deduplicated,

    /// The order row is staged in the transaction.
    OrderPersisted,

    /// An inventory item is staged as assigned.
    Allocated,

    /// Order stands without an allocation; flagged for the operator.
    Backordered,

    /// Confirmation and credential notifications went out.
    Notified,

    /// A notification failed; order and allocation stand.
    NotifyFailed,

    /// Terminal: the run finished and the caller sees success.
    Completed,

    /// Terminal early exit: bad or missing signature.
    VerificationFailed,

    /// Terminal early exit: the event (or its session) was already
    /// processed.
    DuplicateSkip,
}

impl FulfillmentState {
    /// Returns true if this is a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            FulfillmentState::Completed
                | FulfillmentState::VerificationFailed
                | FulfillmentState::DuplicateSkip
        )
    }

    /// Returns true if the run holds an open storage transaction in this
    /// state.
    pub fn in_transaction(&self) -> bool {
        matches!(
            self,
            FulfillmentState::Deduplicated
                | FulfillmentState::OrderPersisted
                | FulfillmentState::Allocated
                | FulfillmentState::Backordered
        )
    }

    /// Returns the state name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            FulfillmentState::Received => "Received",
            FulfillmentState::Verified => "Verified",
            FulfillmentState::Deduplicated => "Deduplicated",
            FulfillmentState::OrderPersisted => "OrderPersisted",
            FulfillmentState::Allocated => "Allocated",
            FulfillmentState::Backordered => "Backordered",
            FulfillmentState::Notified => "Notified",
            FulfillmentState::NotifyFailed => "NotifyFailed",
            FulfillmentState::Completed => "Completed",
            FulfillmentState::VerificationFailed => "VerificationFailed",
            FulfillmentState::DuplicateSkip => "DuplicateSkip",
        }
    }
}

impl std::fmt::Display for FulfillmentState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_state_is_received() {
        assert_eq!(FulfillmentState::default(), FulfillmentState::Received);
    }

    #[test]
    fn terminal_states() {
        assert!(FulfillmentState::Completed.is_terminal());
        assert!(FulfillmentState::VerificationFailed.is_terminal());
        assert!(FulfillmentState::DuplicateSkip.is_terminal());

        assert!(!FulfillmentState::Received.is_terminal());
        assert!(!FulfillmentState::Allocated.is_terminal());
        assert!(!FulfillmentState::NotifyFailed.is_terminal());
    }

    #[test]
    fn transaction_holding_states() {
        assert!(FulfillmentState::Deduplicated.in_transaction());
        assert!(FulfillmentState::OrderPersisted.in_transaction());
        assert!(FulfillmentState::Allocated.in_transaction());
        assert!(FulfillmentState::Backordered.in_transaction());

        // Notification must only happen after commit.
        assert!(!FulfillmentState::Notified.in_transaction());
        assert!(!FulfillmentState::NotifyFailed.in_transaction());
        assert!(!FulfillmentState::Completed.in_transaction());
    }

    #[test]
    fn display_matches_as_str() {
        assert_eq!(FulfillmentState::Backordered.to_string(), "Backordered");
        assert_eq!(FulfillmentState::DuplicateSkip.to_string(), "DuplicateSkip");
    }
}
