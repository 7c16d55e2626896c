//! The event verifier.

use chrono::{DateTime, TimeDelta, Utc};

use crate::error::VerificationError;
use crate::event::{VerifiedEvent, parse_event};
use crate::signature::{parse_signature_header, signature_matches};

/// HTTP header carrying the provider signature.
pub const SIGNATURE_HEADER: &str = "webhook-signature";

/// Default accepted age of a signed timestamp.
const DEFAULT_TOLERANCE_SECS: i64 = 300;

/// Authenticates raw provider notifications.
///
/// Recomputes the HMAC over the raw payload under the endpoint secret and
/// compares it in constant time against every `v1` candidate the header
/// carries. The signed timestamp must lie within the configured tolerance
/// of the current time, which bounds header replay.
#[derive(Debug, Clone)]
pub struct EventVerifier {
    secret: String,
    tolerance: TimeDelta,
}

impl EventVerifier {
    /// Creates a verifier for the given endpoint secret with the default
    /// 5-minute timestamp tolerance.
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
            tolerance: TimeDelta::seconds(DEFAULT_TOLERANCE_SECS),
        }
    }

    /// Overrides the timestamp tolerance.
    pub fn with_tolerance(mut self, tolerance: TimeDelta) -> Self {
        self.tolerance = tolerance;
        self
    }

    /// Verifies a raw delivery against its signature header and parses the
    /// payload into a typed event.
    pub fn verify(
        &self,
        payload: &[u8],
        signature_header: Option<&str>,
    ) -> Result<VerifiedEvent, VerificationError> {
        self.verify_at(payload, signature_header, Utc::now())
    }

    /// [`EventVerifier::verify`] with an explicit clock, for tests.
    pub fn verify_at(
        &self,
        payload: &[u8],
        signature_header: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<VerifiedEvent, VerificationError> {
        let header = signature_header.ok_or(VerificationError::MissingHeader)?;
        let parsed = parse_signature_header(header)?;

        let age_secs = now.timestamp() - parsed.timestamp;
        if age_secs.abs() > self.tolerance.num_seconds() {
            return Err(VerificationError::StaleTimestamp { age_secs });
        }

        let authentic = parsed.signatures.iter().any(|candidate| {
            signature_matches(&self.secret, parsed.timestamp, payload, candidate)
        });
        if !authentic {
            return Err(VerificationError::SignatureMismatch);
        }

        parse_event(payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::EventKind;
    use crate::signature::{compute_signature, format_signature_header};

    const SECRET: &str = "whsec_test_secret";

    fn payload() -> Vec<u8> {
        serde_json::to_vec(&serde_json::json!({
            "id": "evt_1",
            "type": "checkout.session.completed",
            "data": {
                "object": {
                    "id": "sess_1",
                    "customer_email": "buyer@example.com",
                    "amount_total": 1999,
                    "metadata": { "product_name": "Copilot Pro Seat" }
                }
            }
        }))
        .unwrap()
    }

    fn now() -> DateTime<Utc> {
        Utc::now()
    }

    #[test]
    fn verifies_a_correctly_signed_delivery() {
        let verifier = EventVerifier::new(SECRET);
        let body = payload();
        let header = format_signature_header(SECRET, now().timestamp(), &body);

        let event = verifier.verify_at(&body, Some(&header), now()).unwrap();
        assert_eq!(event.id.as_str(), "evt_1");
        assert!(matches!(event.kind, EventKind::CheckoutCompleted(_)));
    }

    #[test]
    fn missing_header_is_rejected() {
        let verifier = EventVerifier::new(SECRET);
        assert_eq!(
            verifier.verify_at(&payload(), None, now()),
            Err(VerificationError::MissingHeader)
        );
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let verifier = EventVerifier::new(SECRET);
        let body = payload();
        let header = format_signature_header("whsec_other", now().timestamp(), &body);

        assert_eq!(
            verifier.verify_at(&body, Some(&header), now()),
            Err(VerificationError::SignatureMismatch)
        );
    }

    #[test]
    fn tampered_body_is_rejected() {
        let verifier = EventVerifier::new(SECRET);
        let body = payload();
        let header = format_signature_header(SECRET, now().timestamp(), &body);

        let mut tampered = body.clone();
        tampered[0] ^= 0x01;
        assert_eq!(
            verifier.verify_at(&tampered, Some(&header), now()),
            Err(VerificationError::SignatureMismatch)
        );
    }

    #[test]
    fn stale_timestamp_is_rejected() {
        let verifier = EventVerifier::new(SECRET);
        let body = payload();
        let signed_at = now() - TimeDelta::minutes(10);
        let header = format_signature_header(SECRET, signed_at.timestamp(), &body);

        assert!(matches!(
            verifier.verify_at(&body, Some(&header), now()),
            Err(VerificationError::StaleTimestamp { .. })
        ));
    }

    #[test]
    fn any_matching_v1_candidate_passes() {
        let verifier = EventVerifier::new(SECRET);
        let body = payload();
        let ts = now().timestamp();
        let good = hex::encode(compute_signature(SECRET, ts, &body));
        let stale = hex::encode(compute_signature("whsec_rolled", ts, &body));
        let header = format!("t={ts},v1={stale},v1={good}");

        assert!(verifier.verify_at(&body, Some(&header), now()).is_ok());
    }

    #[test]
    fn tolerance_is_configurable() {
        let verifier = EventVerifier::new(SECRET).with_tolerance(TimeDelta::hours(1));
        let body = payload();
        let signed_at = now() - TimeDelta::minutes(10);
        let header = format_signature_header(SECRET, signed_at.timestamp(), &body);

        assert!(verifier.verify_at(&body, Some(&header), now()).is_ok());
    }
}
