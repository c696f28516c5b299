//! Encryption proofs.
//!
//! A client submitting plaintext values for encryption must prove it is the
//! one vouching for them: it commits to each value (bound to the context),
//! signs the commitment set with its identity key, and sends the proof with
//! the values. The encryption scheme verifies the proof before encrypting
//! anything, so forged or replayed submissions die before they can mint a
//! handle. Every way a proof can be wrong collapses to the single
//! [`InvalidProof`](crate::error::AuthzError::InvalidProof) error.

use std::fmt;

use serde::{Deserialize, Serialize};

use sealbook_core::{CipherWidth, ContextId, IdentityKeypair, IdentitySignature, Principal};

use crate::canonical;
use crate::error::AuthzError;

/// Key derivation domain for value commitments.
const COMMITMENT_KDF_DOMAIN: &str = "sealbook-proof-v0-commitment";

/// A plaintext value before encryption, tagged with its logical width.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RawValue {
    /// A 32-bit unsigned integer.
    U32(u32),
    /// A 64-bit unsigned integer.
    U64(u64),
}

impl RawValue {
    /// The logical width of this value.
    pub const fn width(&self) -> CipherWidth {
        match self {
            RawValue::U32(_) => CipherWidth::U32,
            RawValue::U64(_) => CipherWidth::U64,
        }
    }

    /// The value as little-endian bytes, 4 or 8 of them.
    pub fn le_bytes(&self) -> Vec<u8> {
        match self {
            RawValue::U32(v) => v.to_le_bytes().to_vec(),
            RawValue::U64(v) => v.to_le_bytes().to_vec(),
        }
    }

    /// Commit to this value under `context`.
    ///
    /// The width tag goes into the digest, so `U32(5)` and `U64(5)` commit
    /// differently.
    pub fn commitment(&self, context: &ContextId) -> ValueCommitment {
        let mut hasher = blake3::Hasher::new_derive_key(COMMITMENT_KDF_DOMAIN);
        hasher.update(context.as_bytes());
        hasher.update(&[self.width().tag()]);
        hasher.update(&self.le_bytes());
        ValueCommitment(*hasher.finalize().as_bytes())
    }
}

/// A Blake3 commitment to one plaintext value (32 bytes).
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ValueCommitment(pub [u8; 32]);

impl ValueCommitment {
    /// Create from raw bytes.
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// The raw commitment bytes.
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Debug for ValueCommitment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ValueCommitment({})", &hex::encode(&self.0[..8]))
    }
}

/// A signed attestation covering the plaintext values of one submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptionProof {
    /// The principal vouching for the values.
    pub owner: Principal,
    /// The store context the values are destined for.
    pub context: ContextId,
    /// One commitment per attested value, in submission order.
    pub commitments: Vec<ValueCommitment>,
    /// The owner's signature over the attestation.
    pub signature: IdentitySignature,
}

impl EncryptionProof {
    /// Attest `values` for encryption under `context`.
    pub fn attest(keypair: &IdentityKeypair, context: &ContextId, values: &[RawValue]) -> Self {
        let owner = keypair.principal();
        let commitments: Vec<ValueCommitment> =
            values.iter().map(|v| v.commitment(context)).collect();
        let bytes = canonical::attestation_signing_bytes(&owner, context, &commitments);
        let signature = keypair.sign(&bytes);
        Self {
            owner,
            context: *context,
            commitments,
            signature,
        }
    }

    /// Verify that this proof covers `value`, claimed by `owner`, for
    /// `context`.
    ///
    /// Checks, in order: the claimed owner and context match the proof, the
    /// signature verifies under the owner's key, and the value's commitment
    /// is among those attested. Any failure is [`AuthzError::InvalidProof`].
    pub fn verify(
        &self,
        owner: &Principal,
        context: &ContextId,
        value: &RawValue,
    ) -> Result<(), AuthzError> {
        if self.owner != *owner || self.context != *context {
            return Err(AuthzError::InvalidProof);
        }
        let bytes = canonical::attestation_signing_bytes(&self.owner, &self.context, &self.commitments);
        self.owner
            .verify(&bytes, &self.signature)
            .map_err(|_| AuthzError::InvalidProof)?;
        if !self.commitments.contains(&value.commitment(context)) {
            return Err(AuthzError::InvalidProof);
        }
        Ok(())
    }
}
