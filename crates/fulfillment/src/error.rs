//! Fulfillment error types.

use store::StoreError;
use thiserror::Error;
use webhook::VerificationError;

/// Errors that abort one fulfillment run.
///
/// Expected business conditions (duplicate delivery, empty pool) are not
/// errors; they are variants of the run's outcome. Only authentication
/// failures and storage faults surface here.
#[derive(Debug, Error)]
pub enum FulfillmentError {
    /// The delivery failed signature verification or payload parsing.
    /// Maps to a client error; the provider's retries of the same bytes
    /// will keep failing, and retries of a corrected delivery deduplicate
    /// downstream.
    #[error("verification failed: {0}")]
    Verification(#[from] VerificationError),

    /// The storage backend failed; the transaction (claim included) was
    /// rolled back. Maps to a server error so the provider redelivers.
    #[error("storage error: {0}")]
    Store(#[from] StoreError),

    /// The attempt exceeded its processing deadline; the transaction
    /// (claim included) was rolled back. Maps to a server error so the
    /// provider's redelivery can reclaim and complete.
    #[error("fulfillment attempt exceeded its deadline")]
    DeadlineExceeded,
}

/// Convenience type alias for fulfillment results.
pub type Result<T> = std::result::Result<T, FulfillmentError>;
