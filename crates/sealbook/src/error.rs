//! Error types for the ledger facade.

use sealbook_authz::AuthzError;
use sealbook_core::CoreError;
use sealbook_store::StoreError;
use thiserror::Error;

/// Errors that can occur during ledger operations.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// Record-level validation error.
    #[error("record error: {0}")]
    Record(#[from] CoreError),

    /// Storage error.
    #[error("storage error: {0}")]
    Store(#[from] StoreError),

    /// Authorization or encryption error.
    #[error("authorization error: {0}")]
    Authz(#[from] AuthzError),
}

/// Result type for ledger operations.
pub type Result<T> = std::result::Result<T, LedgerError>;
