use domain::DomainError;
use thiserror::Error;

/// Errors that can occur when interacting with the fulfillment store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A database error occurred.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A database migration error occurred.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// A persisted row no longer parses into its domain type.
    #[error("Corrupt row: {0}")]
    Corrupt(String),

    /// The backend refused the operation (used by the in-memory store's
    /// failure injection).
    #[error("Storage unavailable: {0}")]
    Unavailable(String),
}

impl From<DomainError> for StoreError {
    fn from(e: DomainError) -> Self {
        StoreError::Corrupt(e.to_string())
    }
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
