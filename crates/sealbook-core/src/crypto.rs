//! Identity cryptography: Ed25519 principals, signatures, and keypairs.
//!
//! Every party in the system (the store itself, record owners, readers) is
//! identified by an Ed25519 public key. The corresponding private key never
//! leaves the party that generated it; the store only ever sees public keys
//! and signatures.

use std::fmt;

use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// A principal: an Ed25519 public key (32 bytes) acting as an identity.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Principal(pub [u8; 32]);

impl Principal {
    /// All-zero principal, useful as a placeholder in tests.
    pub const ZERO: Principal = Principal([0u8; 32]);

    /// Create from raw bytes.
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// The raw key bytes.
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Hex encoding of the key bytes.
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

    /// Verify `signature` over `message` against this principal's key.
    pub fn verify(&self, message: &[u8], signature: &IdentitySignature) -> Result<(), CoreError> {
        let key = VerifyingKey::from_bytes(&self.0).map_err(|_| CoreError::InvalidPublicKey)?;
        let sig = Signature::from_bytes(&signature.0);
        key.verify(message, &sig)
            .map_err(|_| CoreError::InvalidSignature)
    }
}

impl fmt::Debug for Principal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Principal({})", &self.to_hex()[..16])
    }
}

impl fmt::Display for Principal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", &self.to_hex()[..16])
    }
}

impl AsRef<[u8]> for Principal {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl From<[u8; 32]> for Principal {
    fn from(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

/// An Ed25519 signature (64 bytes) produced by a principal's identity key.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct IdentitySignature(pub [u8; 64]);

// serde provides array impls only up to 32 elements, so the 64-byte
// signature serializes through manual impls matching the derive's encoding.
impl Serialize for IdentitySignature {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        use serde::ser::SerializeTuple;
        let mut tuple = serializer.serialize_tuple(64)?;
        for byte in &self.0 {
            tuple.serialize_element(byte)?;
        }
        tuple.end()
    }
}

impl<'de> Deserialize<'de> for IdentitySignature {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        struct SignatureVisitor;

        impl<'de> serde::de::Visitor<'de> for SignatureVisitor {
            type Value = IdentitySignature;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("64 signature bytes")
            }

            fn visit_seq<A>(self, mut seq: A) -> Result<Self::Value, A::Error>
            where
                A: serde::de::SeqAccess<'de>,
            {
                let mut bytes = [0u8; 64];
                for (i, slot) in bytes.iter_mut().enumerate() {
                    *slot = seq
                        .next_element()?
                        .ok_or_else(|| serde::de::Error::invalid_length(i, &self))?;
                }
                Ok(IdentitySignature(bytes))
            }
        }

        deserializer.deserialize_tuple(64, SignatureVisitor)
    }
}

impl IdentitySignature {
    /// All-zero signature, useful as a placeholder before signing.
    pub const ZERO: IdentitySignature = IdentitySignature([0u8; 64]);

    /// Create from raw bytes.
    pub const fn from_bytes(bytes: [u8; 64]) -> Self {
        Self(bytes)
    }

    /// The raw signature bytes.
    pub const fn as_bytes(&self) -> &[u8; 64] {
        &self.0
    }

    /// Hex encoding of the signature bytes.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Debug for IdentitySignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "IdentitySignature({})", &self.to_hex()[..16])
    }
}

impl AsRef<[u8]> for IdentitySignature {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl From<[u8; 64]> for IdentitySignature {
    fn from(bytes: [u8; 64]) -> Self {
        Self(bytes)
    }
}

/// An Ed25519 keypair held by a principal.
///
/// The signing key is kept private; only [`IdentityKeypair::principal`] and
/// [`IdentityKeypair::sign`] expose anything derived from it.
#[derive(Clone)]
pub struct IdentityKeypair {
    signing_key: SigningKey,
}

impl IdentityKeypair {
    /// Generate a new random keypair.
    pub fn generate() -> Self {
        let mut rng = rand::thread_rng();
        Self {
            signing_key: SigningKey::generate(&mut rng),
        }
    }

    /// Deterministic keypair from a 32-byte seed.
    pub fn from_seed(seed: &[u8; 32]) -> Self {
        Self {
            signing_key: SigningKey::from_bytes(seed),
        }
    }

    /// The public half of this keypair.
    pub fn principal(&self) -> Principal {
        Principal(self.signing_key.verifying_key().to_bytes())
    }

    /// Sign a message with the private key.
    pub fn sign(&self, message: &[u8]) -> IdentitySignature {
        IdentitySignature(self.signing_key.sign(message).to_bytes())
    }

    /// The seed bytes this keypair was built from.
    pub fn seed(&self) -> [u8; 32] {
        self.signing_key.to_bytes()
    }
}

impl fmt::Debug for IdentityKeypair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "IdentityKeypair({:?})", self.principal())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sign_and_verify() {
        let keypair = IdentityKeypair::generate();
        let sig = keypair.sign(b"hello sealbook");
        assert!(keypair.principal().verify(b"hello sealbook", &sig).is_ok());
    }

    #[test]
    fn test_verify_rejects_tampered_message() {
        let keypair = IdentityKeypair::generate();
        let sig = keypair.sign(b"original");
        assert!(keypair.principal().verify(b"tampered", &sig).is_err());
    }

    #[test]
    fn test_verify_rejects_wrong_key() {
        let alice = IdentityKeypair::generate();
        let bob = IdentityKeypair::generate();
        let sig = alice.sign(b"message");
        assert!(bob.principal().verify(b"message", &sig).is_err());
    }

    #[test]
    fn test_keypair_from_seed_is_deterministic() {
        let seed = [7u8; 32];
        let a = IdentityKeypair::from_seed(&seed);
        let b = IdentityKeypair::from_seed(&seed);
        assert_eq!(a.principal(), b.principal());
        assert_eq!(a.seed(), seed);
    }

    #[test]
    fn test_principal_hex_roundtrip() {
        let keypair = IdentityKeypair::from_seed(&[3u8; 32]);
        let principal = keypair.principal();
        let parsed = Principal::from_hex(&principal.to_hex()).unwrap();
        assert_eq!(principal, parsed);
    }

    #[test]
    fn test_principal_from_hex_rejects_bad_length() {
        assert!(Principal::from_hex("abcd").is_err());
    }

    #[test]
    fn test_debug_truncates_hex() {
        let principal = Principal::ZERO;
        let debug = format!("{:?}", principal);
        assert_eq!(debug, format!("Principal({})", "0".repeat(16)));
    }
}
