//! Context identifiers.
//!
//! A [`ContextId`] names one logical store instance for authorization
//! purposes. Encryption proofs and decryption authorizations are bound to a
//! context id, so material produced for one store cannot be replayed against
//! another run by the same principal under a different label.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::crypto::Principal;

/// Domain prefix mixed into every context id derivation.
const CONTEXT_DOMAIN: &[u8] = b"sealbook-context-v0:";

/// A context identifier (32 bytes), derived from the store principal and a
/// deployment label.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContextId(pub [u8; 32]);

impl ContextId {
    /// All-zero context id, useful as a placeholder in tests.
    pub const ZERO: ContextId = ContextId([0u8; 32]);

    /// Derive the context id for the store run by `store` under `label`.
    ///
    /// The derivation is deterministic: the same principal and label always
    /// produce the same context id, so clients and the store agree on it
    /// without coordination.
    pub fn derive(store: &Principal, label: &str) -> Self {
        let mut hasher = blake3::Hasher::new();
        hasher.update(CONTEXT_DOMAIN);
        hasher.update(store.as_bytes());
        hasher.update(b":");
        hasher.update(label.as_bytes());
        Self(*hasher.finalize().as_bytes())
    }

    /// Create from raw bytes.
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// The raw id bytes.
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Hex encoding of the id bytes.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parse from a 64-character hex string.
    pub fn from_hex(s: &str) -> Result<Self, hex::FromHexError> {
        let bytes = hex::decode(s)?;
        let arr: [u8; 32] = bytes
            .try_into()
            .map_err(|_| hex::FromHexError::InvalidStringLength)?;
        Ok(Self(arr))
    }
}

impl fmt::Debug for ContextId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContextId({})", &self.to_hex()[..16])
    }
}

impl fmt::Display for ContextId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", &self.to_hex()[..16])
    }
}

impl AsRef<[u8]> for ContextId {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl From<[u8; 32]> for ContextId {
    fn from(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}
