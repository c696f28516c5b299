//! Error types for storage backends.

use thiserror::Error;

/// Errors produced by record stores.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A record failed validation before it could be appended.
    #[error("invalid record: {0}")]
    InvalidRecord(#[from] sealbook_core::CoreError),

    /// A read named an index the owner does not have.
    #[error("invalid index {index}: owner has {count} records")]
    InvalidIndex { index: u64, count: u64 },

    /// The underlying SQLite database reported an error.
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// A filesystem operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A schema migration could not be applied.
    #[error("migration error: {0}")]
    Migration(String),
}

/// Convenience alias for store results.
pub type Result<T> = std::result::Result<T, StoreError>;
