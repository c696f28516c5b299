//! Error types for core operations.

use thiserror::Error;

/// Errors produced while validating or constructing core types.
#[derive(Debug, Error)]
pub enum CoreError {
    /// An item label was empty or longer than [`MAX_ITEM_LEN`] bytes.
    ///
    /// [`MAX_ITEM_LEN`]: crate::record::MAX_ITEM_LEN
    #[error("item label must be 1 to 64 bytes, got {len}")]
    InvalidItem { len: usize },

    /// A ciphertext handle carried the wrong width tag for its field.
    #[error("handle for {field} carries the wrong width tag")]
    HandleWidth { field: &'static str },

    /// A byte string could not be interpreted as an Ed25519 public key.
    #[error("invalid public key")]
    InvalidPublicKey,

    /// A signature failed verification.
    #[error("invalid signature")]
    InvalidSignature,
}

/// Convenience alias for core results.
pub type Result<T> = std::result::Result<T, CoreError>;
