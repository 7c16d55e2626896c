//! Domain error types.

use thiserror::Error;

/// Errors raised when constructing domain values from raw input.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomainError {
    /// The value is not a plausible email address.
    #[error("invalid email address: {0:?}")]
    InvalidEmail(String),

    /// A required string value was empty.
    #[error("{0} cannot be empty")]
    Empty(&'static str),

    /// The category name is not one of the known tiers.
    #[error("unknown category: {0:?}")]
    UnknownCategory(String),

    /// The status string does not name a known state.
    #[error("unknown status: {0:?}")]
    UnknownStatus(String),
}
