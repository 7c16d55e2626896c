//! The idempotency ledger entry for one provider event.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::DomainError;
use crate::value_objects::ProviderEventId;

/// The recorded outcome of processing one provider event.
///
/// `Pending` only exists inside an open transaction between the claim and
/// the outcome stamp; a committed ledger row always carries `Fulfilled` or
/// `Backordered`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProcessingOutcome {
    /// Claimed but not yet stamped; never visible outside a transaction.
    Pending,

    /// Order persisted and an inventory item assigned.
    Fulfilled,

    /// Order persisted but the category pool was empty.
    Backordered,
}

impl ProcessingOutcome {
    /// Returns the outcome name as stored in the database.
    pub fn as_str(&self) -> &'static str {
        match self {
            ProcessingOutcome::Pending => "pending",
            ProcessingOutcome::Fulfilled => "fulfilled",
            ProcessingOutcome::Backordered => "backordered",
        }
    }
}

impl std::str::FromStr for ProcessingOutcome {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(ProcessingOutcome::Pending),
            "fulfilled" => Ok(ProcessingOutcome::Fulfilled),
            "backordered" => Ok(ProcessingOutcome::Backordered),
            other => Err(DomainError::UnknownStatus(other.to_string())),
        }
    }
}

impl std::fmt::Display for ProcessingOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One committed idempotency ledger entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessedEvent {
    pub event_id: ProviderEventId,
    pub outcome: ProcessingOutcome,
    pub processed_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outcome_round_trips_through_str() {
        for outcome in [
            ProcessingOutcome::Pending,
            ProcessingOutcome::Fulfilled,
            ProcessingOutcome::Backordered,
        ] {
            let parsed: ProcessingOutcome = outcome.as_str().parse().unwrap();
            assert_eq!(parsed, outcome);
        }
        assert!("skipped".parse::<ProcessingOutcome>().is_err());
    }
}
