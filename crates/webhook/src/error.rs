//! Verification error types.

use thiserror::Error;

/// Errors raised while authenticating a provider notification.
///
/// Every variant maps to a client-error response: the sender either did not
/// sign the payload correctly or sent a body the endpoint cannot read. The
/// provider's automatic retries of such deliveries are harmless because
/// retried events deduplicate downstream.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VerificationError {
    /// The signature header was absent.
    #[error("missing signature header")]
    MissingHeader,

    /// The signature header did not match the `t=...,v1=...` format.
    #[error("malformed signature header: {0}")]
    MalformedHeader(String),

    /// No signature in the header matched the expected HMAC.
    #[error("signature mismatch")]
    SignatureMismatch,

    /// The signed timestamp is outside the accepted tolerance.
    #[error("signature timestamp outside tolerance: {age_secs}s")]
    StaleTimestamp { age_secs: i64 },

    /// The payload is not a readable event of the expected shape.
    #[error("invalid event payload: {0}")]
    InvalidPayload(String),
}
