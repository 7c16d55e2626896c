//! Signature header parsing and HMAC computation.
//!
//! The provider signs each delivery with a header of the form
//! `t=<unix-ts>,v1=<hex hmac>[,v1=<hex hmac>...]` where the HMAC-SHA256 is
//! computed over `"{t}.{raw body}"` under the shared endpoint secret.
//! Multiple `v1` entries appear while the provider rolls secrets; a
//! delivery is authentic if any of them matches.

use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::error::VerificationError;

type HmacSha256 = Hmac<Sha256>;

/// A parsed signature header: the signed timestamp and every `v1`
/// signature candidate, hex-decoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedSignature {
    pub timestamp: i64,
    pub signatures: Vec<Vec<u8>>,
}

/// Parses a `t=...,v1=...` signature header.
///
/// Unknown schemes (`v0=...`) are skipped; the header is malformed if the
/// timestamp is missing or no `v1` entry decodes to bytes.
pub fn parse_signature_header(header: &str) -> Result<ParsedSignature, VerificationError> {
    let mut timestamp = None;
    let mut signatures = Vec::new();

    for part in header.split(',') {
        let (key, value) = part
            .trim()
            .split_once('=')
            .ok_or_else(|| VerificationError::MalformedHeader(header.to_string()))?;
        match key {
            "t" => {
                timestamp = Some(
                    value
                        .parse::<i64>()
                        .map_err(|_| VerificationError::MalformedHeader(header.to_string()))?,
                );
            }
            "v1" => {
                let bytes = hex::decode(value)
                    .map_err(|_| VerificationError::MalformedHeader(header.to_string()))?;
                signatures.push(bytes);
            }
            _ => {}
        }
    }

    let timestamp =
        timestamp.ok_or_else(|| VerificationError::MalformedHeader(header.to_string()))?;
    if signatures.is_empty() {
        return Err(VerificationError::MalformedHeader(header.to_string()));
    }

    Ok(ParsedSignature {
        timestamp,
        signatures,
    })
}

/// Computes the expected signature for `payload` signed at `timestamp`.
pub fn compute_signature(secret: &str, timestamp: i64, payload: &[u8]) -> Vec<u8> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .expect("HMAC accepts keys of any length");
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(payload);
    mac.finalize().into_bytes().to_vec()
}

/// Checks `candidate` against the expected signature in constant time.
pub fn signature_matches(secret: &str, timestamp: i64, payload: &[u8], candidate: &[u8]) -> bool {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .expect("HMAC accepts keys of any length");
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(payload);
    mac.verify_slice(candidate).is_ok()
}

/// Formats a signature header for `payload` signed at `timestamp`.
///
/// The inverse of [`parse_signature_header`]; used by tests and by tooling
/// that replays captured deliveries.
pub fn format_signature_header(secret: &str, timestamp: i64, payload: &[u8]) -> String {
    let signature = compute_signature(secret, timestamp, payload);
    format!("t={},v1={}", timestamp, hex::encode(signature))
}
