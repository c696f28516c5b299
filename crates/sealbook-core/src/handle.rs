//! Ciphertext handles.
//!
//! A [`CiphertextHandle`] is the only thing the ledger stores for an
//! encrypted value: an opaque 32-byte reference derived from the ciphertext
//! itself. The handle reveals nothing about the plaintext beyond its logical
//! width, which is stamped into the final byte so that readers know how to
//! interpret a resolved value without consulting the oracle.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Domain prefix mixed into every handle derivation.
const HANDLE_DOMAIN: &[u8] = b"sealbook-handle-v0:";

/// The logical width of an encrypted value.
///
/// The discriminant doubles as the width tag stamped into the final byte of
/// a [`CiphertextHandle`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CipherWidth {
    /// A 32-bit unsigned integer.
    U32 = 1,
    /// A 64-bit unsigned integer.
    U64 = 2,
}

impl CipherWidth {
    /// The tag byte stamped into a handle.
    pub const fn tag(self) -> u8 {
        self as u8
    }

    /// Recover a width from a tag byte, if it is one we know.
    pub const fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            1 => Some(CipherWidth::U32),
            2 => Some(CipherWidth::U64),
            _ => None,
        }
    }

    /// The width in bits.
    pub const fn bits(self) -> u32 {
        match self {
            CipherWidth::U32 => 32,
            CipherWidth::U64 => 64,
        }
    }
}

/// An opaque reference to an encrypted value (32 bytes).
///
/// Derived as a Blake3 hash of the ciphertext, with the final byte replaced
/// by the width tag. Handles are unguessable without the ciphertext they
/// refer to, and two encryptions of equal plaintexts yield distinct handles
/// because each encryption uses a fresh nonce.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CiphertextHandle(pub [u8; 32]);

impl CiphertextHandle {
    /// All-zero handle, useful as a placeholder in tests.
    pub const ZERO: CiphertextHandle = CiphertextHandle([0u8; 32]);

    /// Derive the handle for `ciphertext` carrying a value of `width`.
    pub fn derive(ciphertext: &[u8], width: CipherWidth) -> Self {
        let mut hasher = blake3::Hasher::new();
        hasher.update(HANDLE_DOMAIN);
        hasher.update(ciphertext);
        let mut bytes = *hasher.finalize().as_bytes();
        bytes[31] = width.tag();
        Self(bytes)
    }

    /// The logical width encoded in the final byte, if the tag is valid.
    pub fn width(&self) -> Option<CipherWidth> {
        CipherWidth::from_tag(self.0[31])
    }

    /// Create from raw bytes.
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// The raw handle bytes.
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Hex encoding of the handle bytes.
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

impl fmt::Debug for CiphertextHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CiphertextHandle({})", &self.to_hex()[..16])
    }
}

impl fmt::Display for CiphertextHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", &self.to_hex()[..16])
    }
}

impl AsRef<[u8]> for CiphertextHandle {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl From<[u8; 32]> for CiphertextHandle {
    fn from(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

/// The three encrypted fields of a record, in a fixed order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HandleTriple {
    /// Encrypted user id, a 32-bit value.
    pub user_id: CiphertextHandle,
    /// Encrypted quantity, a 32-bit value.
    pub quantity: CiphertextHandle,
    /// Encrypted amount, a 64-bit value.
    pub amount: CiphertextHandle,
}

impl HandleTriple {
    /// Check that each handle carries the width tag its field requires.
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.user_id.width() != Some(CipherWidth::U32) {
            return Err(CoreError::HandleWidth { field: "user_id" });
        }
        if self.quantity.width() != Some(CipherWidth::U32) {
            return Err(CoreError::HandleWidth { field: "quantity" });
        }
        if self.amount.width() != Some(CipherWidth::U64) {
            return Err(CoreError::HandleWidth { field: "amount" });
        }
        Ok(())
    }

    /// Iterate over the three handles in field order.
    pub fn iter(&self) -> impl Iterator<Item = &CiphertextHandle> {
        [&self.user_id, &self.quantity, &self.amount].into_iter()
    }
}
