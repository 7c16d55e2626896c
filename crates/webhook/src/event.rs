//! Typed provider events.
//!
//! The raw provider payload is a JSON envelope with an `id`, a `type` tag,
//! and a type-specific `data.object`. Only checkout completions carry data
//! the store acts on; every other type is kept as an explicit `Ignored`
//! variant so callers must decide what to do with it.

use std::collections::HashMap;

use domain::{EmailAddress, Money, ProviderEventId, SessionId};
use serde::Deserialize;

use crate::error::VerificationError;

/// The provider event type that triggers fulfillment.
pub const CHECKOUT_COMPLETED: &str = "checkout.session.completed";

/// A notification whose signature has been verified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedEvent {
    /// Provider-assigned event identifier (ledger key).
    pub id: ProviderEventId,
    /// The typed payload.
    pub kind: EventKind,
}

/// Closed set of event payloads the orchestrator understands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventKind {
    /// A checkout session completed; fulfillment should run.
    CheckoutCompleted(CheckoutSession),

    /// Any other provider event type; accepted and dropped.
    Ignored { event_type: String },
}

/// The payload of a completed checkout session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutSession {
    pub session_id: SessionId,
    pub customer_email: EmailAddress,
    pub amount_total: Money,
    pub currency: String,
    /// Product descriptor used for category selection; empty when the
    /// provider metadata carries none.
    pub product: String,
}

#[derive(Debug, Deserialize)]
struct RawEvent {
    id: String,
    #[serde(rename = "type")]
    event_type: String,
    #[serde(default)]
    data: Option<RawData>,
}

#[derive(Debug, Deserialize)]
struct RawData {
    object: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct RawCheckoutSession {
    id: String,
    #[serde(default)]
    customer_email: Option<String>,
    #[serde(default)]
    customer_details: Option<RawCustomerDetails>,
    #[serde(default)]
    amount_total: Option<i64>,
    #[serde(default)]
    currency: Option<String>,
    #[serde(default)]
    metadata: Option<HashMap<String, String>>,
}

#[derive(Debug, Deserialize)]
struct RawCustomerDetails {
    #[serde(default)]
    email: Option<String>,
}

/// Parses a verified payload into a typed event.
pub(crate) fn parse_event(payload: &[u8]) -> Result<VerifiedEvent, VerificationError> {
    let raw: RawEvent = serde_json::from_slice(payload)
        .map_err(|e| VerificationError::InvalidPayload(e.to_string()))?;

    let id = ProviderEventId::new(raw.id)
        .map_err(|e| VerificationError::InvalidPayload(e.to_string()))?;

    if raw.event_type != CHECKOUT_COMPLETED {
        return Ok(VerifiedEvent {
            id,
            kind: EventKind::Ignored {
                event_type: raw.event_type,
            },
        });
    }

    let object = raw
        .data
        .map(|d| d.object)
        .ok_or_else(|| VerificationError::InvalidPayload("checkout event without data".into()))?;
    let session: RawCheckoutSession = serde_json::from_value(object)
        .map_err(|e| VerificationError::InvalidPayload(e.to_string()))?;

    let email = session
        .customer_email
        .or(session.customer_details.and_then(|d| d.email))
        .ok_or_else(|| {
            VerificationError::InvalidPayload("checkout session without customer email".into())
        })?;
    let customer_email = EmailAddress::parse(email)
        .map_err(|e| VerificationError::InvalidPayload(e.to_string()))?;
    let session_id = SessionId::new(session.id)
        .map_err(|e| VerificationError::InvalidPayload(e.to_string()))?;
    let amount_total = Money::from_cents(session.amount_total.ok_or_else(|| {
        VerificationError::InvalidPayload("checkout session without amount_total".into())
    })?);
    let product = session
        .metadata
        .and_then(|mut m| m.remove("product_name"))
        .unwrap_or_default();

    Ok(VerifiedEvent {
        id,
        kind: EventKind::CheckoutCompleted(CheckoutSession {
            session_id,
            customer_email,
            amount_total,
            currency: session.currency.unwrap_or_else(|| "usd".to_string()),
            product,
        }),
    })
}
