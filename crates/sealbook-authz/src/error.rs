//! Error types for the authorization protocol.

use thiserror::Error;

use crate::session::SessionPhase;

/// Errors produced by encryption proofs, sessions, and the oracle.
#[derive(Debug, Error)]
pub enum AuthzError {
    /// An encryption proof failed verification.
    ///
    /// Covers every way a proof can be wrong: bad signature, wrong owner,
    /// wrong context, or a value outside the attested set.
    #[error("invalid encryption proof")]
    InvalidProof,

    /// The oracle declined to resolve a batch.
    ///
    /// Deliberately carries no detail. A caller cannot distinguish a missing
    /// capability from an unknown handle, a bad signature, or an expired
    /// authorization; the oracle logs the reason at debug level instead.
    #[error("resolution denied")]
    ResolutionDenied,

    /// A session operation was called out of order.
    #[error("session phase mismatch: expected {expected:?}, got {actual:?}")]
    PhaseMismatch {
        expected: SessionPhase,
        actual: SessionPhase,
    },

    /// The identity signer refused or failed to sign.
    #[error("signer unavailable: {0}")]
    SignerUnavailable(String),

    /// Symmetric encryption failed.
    #[error("encryption error: {0}")]
    EncryptionError(String),

    /// Symmetric decryption failed, usually a wrong key or tampered data.
    #[error("decryption error: {0}")]
    DecryptionError(String),

    /// CBOR serialization or deserialization failed.
    #[error("serialization error: {0}")]
    SerializationError(String),
}

/// Convenience alias for authorization results.
pub type Result<T> = std::result::Result<T, AuthzError>;
