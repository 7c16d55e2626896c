//! Value objects shared across the fulfillment domain.

use serde::{Deserialize, Serialize};

use crate::error::DomainError;

/// A customer email address.
///
/// Construction goes through [`EmailAddress::parse`], which applies the
/// minimal plausibility check the rest of the system relies on (non-empty,
/// contains exactly one `@` with text on both sides).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EmailAddress(String);

impl EmailAddress {
    /// Parses an email address, rejecting obviously malformed input.
    pub fn parse(raw: impl Into<String>) -> Result<Self, DomainError> {
        let raw = raw.into();
        let mut parts = raw.splitn(2, '@');
        let local = parts.next().unwrap_or_default();
        let host = parts.next().unwrap_or_default();
        if local.is_empty() || host.is_empty() || host.contains('@') {
            return Err(DomainError::InvalidEmail(raw));
        }
        Ok(Self(raw))
    }

    /// Returns the address as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for EmailAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for EmailAddress {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// The provider-assigned identifier of one checkout attempt.
///
/// Unique per attempted purchase; the order table enforces at most one
/// order per session regardless of how often the event is redelivered.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    /// Creates a session ID from a provider string.
    pub fn new(id: impl Into<String>) -> Result<Self, DomainError> {
        let id = id.into();
        if id.is_empty() {
            return Err(DomainError::Empty("session id"));
        }
        Ok(Self(id))
    }

    /// Returns the session ID as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The provider-assigned identifier of one delivered event.
///
/// The idempotency ledger is keyed by this value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProviderEventId(String);

impl ProviderEventId {
    /// Creates an event ID from a provider string.
    pub fn new(id: impl Into<String>) -> Result<Self, DomainError> {
        let id = id.into();
        if id.is_empty() {
            return Err(DomainError::Empty("event id"));
        }
        Ok(Self(id))
    }

    /// Returns the event ID as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ProviderEventId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Money amount represented in minor currency units to avoid floating
/// point issues.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Money {
    /// Amount in cents (e.g., 1999 = $19.99)
    cents: i64,
}

impl Money {
    /// Creates a new Money amount from cents.
    pub fn from_cents(cents: i64) -> Self {
        Self { cents }
    }

    /// Returns zero money.
    pub fn zero() -> Self {
        Self { cents: 0 }
    }

    /// Returns the amount in cents.
    pub fn cents(&self) -> i64 {
        self.cents
    }
}

impl std::fmt::Display for Money {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{:02}", self.cents / 100, (self.cents % 100).abs())
    }
}

/// Tier classification of inventory items and of the associated product.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    /// Education tier.
    Education,
    /// Pro tier.
    Pro,
    /// Business tier.
    Business,
}

impl Category {
    /// All known categories, in tier order.
    pub const ALL: [Category; 3] = [Category::Education, Category::Pro, Category::Business];

    /// Returns the category name as stored in the database.
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Education => "education",
            Category::Pro => "pro",
            Category::Business => "business",
        }
    }
}

impl std::str::FromStr for Category {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "education" => Ok(Category::Education),
            "pro" => Ok(Category::Pro),
            "business" => Ok(Category::Business),
            other => Err(DomainError::UnknownCategory(other.to_string())),
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
