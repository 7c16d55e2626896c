//! Provider webhook verification.
//!
//! Authenticates raw provider notifications (HMAC-SHA256 signature header)
//! and turns them into a closed, typed event — [`VerifiedEvent`] — for the
//! orchestrator. Event types the store does not care about are surfaced as
//! an explicit [`EventKind::Ignored`] variant rather than an error, since
//! the provider sends its full event catalog to every endpoint.

pub mod error;
pub mod event;
pub mod signature;
pub mod verifier;

pub use error::VerificationError;
pub use event::{CHECKOUT_COMPLETED, CheckoutSession, EventKind, VerifiedEvent};
pub use signature::{ParsedSignature, compute_signature, format_signature_header, parse_signature_header};
pub use verifier::{EventVerifier, SIGNATURE_HEADER};
