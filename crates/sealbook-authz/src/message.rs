//! Protocol messages for decryption authorization.

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use sealbook_core::{CiphertextHandle, ContextId, IdentitySignature, Principal};

use crate::canonical;
use crate::crypto::{EncryptionNonce, EphemeralKeyPair, SessionPublicKey, SessionSecret};
use crate::error::AuthzError;
use crate::proof::RawValue;

/// Limits on resolution requests.
pub mod limits {
    /// Maximum (handle, context) pairs in one request.
    pub const MAX_RESOLUTION_PAIRS: usize = 64;

    /// Maximum context ids one authorization may put in scope.
    pub const MAX_CONTEXT_IDS: usize = 16;
}

/// The statement an identity key signs to authorize decryption.
///
/// Binds the ephemeral session key, the contexts in scope, and the validity
/// window into one signature. Nothing about the message is secret; its only
/// job is to be unforgeable and unreusable outside the window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorizationMessage {
    /// The ephemeral session key the response will be sealed to.
    pub session_public_key: SessionPublicKey,
    /// The contexts this authorization covers.
    pub context_ids: Vec<ContextId>,
    /// Start of the validity window, Unix milliseconds.
    pub issued_at: i64,
    /// Length of the validity window in milliseconds.
    pub duration_ms: i64,
}

impl AuthorizationMessage {
    /// The canonical bytes the identity key signs.
    pub fn signing_bytes(&self) -> Vec<u8> {
        canonical::authorization_signing_bytes(
            &self.session_public_key,
            &self.context_ids,
            self.issued_at,
            self.duration_ms,
        )
    }

    /// Whether `now` falls inside the half-open window
    /// `[issued_at, issued_at + duration_ms)`.
    pub fn window_contains(&self, now: i64) -> bool {
        now >= self.issued_at && now < self.expires_at()
    }

    /// The instant the window closes, saturating on overflow.
    pub fn expires_at(&self) -> i64 {
        self.issued_at.saturating_add(self.duration_ms)
    }
}

/// One handle to resolve, with the context it belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HandleContextPair {
    pub handle: CiphertextHandle,
    pub context: ContextId,
}

/// A batch resolution request submitted to the oracle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolutionRequest {
    /// The handles to resolve, each with its context.
    pub pairs: Vec<HandleContextPair>,
    /// The principal requesting resolution.
    pub principal: Principal,
    /// The signed authorization statement.
    pub message: AuthorizationMessage,
    /// The principal's identity signature over the message.
    pub signature: IdentitySignature,
}

impl ResolutionRequest {
    /// Whether the batch fits the protocol limits.
    pub fn within_limits(&self) -> bool {
        self.pairs.len() <= limits::MAX_RESOLUTION_PAIRS
            && self.message.context_ids.len() <= limits::MAX_CONTEXT_IDS
    }
}

/// The plaintext values recovered from a resolution, keyed by handle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedValues {
    values: Vec<(CiphertextHandle, RawValue)>,
}

impl ResolvedValues {
    pub(crate) fn from_pairs(values: Vec<(CiphertextHandle, RawValue)>) -> Self {
        Self { values }
    }

    /// The value for `handle`, if it was part of the batch.
    pub fn get(&self, handle: &CiphertextHandle) -> Option<RawValue> {
        self.values
            .iter()
            .find(|(h, _)| h == handle)
            .map(|(_, v)| *v)
    }

    /// The value for `handle` as a `u32`. Answers `None` for 64-bit values.
    pub fn get_u32(&self, handle: &CiphertextHandle) -> Option<u32> {
        match self.get(handle) {
            Some(RawValue::U32(v)) => Some(v),
            _ => None,
        }
    }

    /// The value for `handle` as a `u64`. Answers `None` for 32-bit values.
    pub fn get_u64(&self, handle: &CiphertextHandle) -> Option<u64> {
        match self.get(handle) {
            Some(RawValue::U64(v)) => Some(v),
            _ => None,
        }
    }

    /// Number of resolved values.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether the batch resolved nothing.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Iterate over (handle, value) pairs in request order.
    pub fn iter(&self) -> impl Iterator<Item = &(CiphertextHandle, RawValue)> {
        self.values.iter()
    }
}

/// A sealed resolution response.
///
/// The resolved values are encrypted to the session public key carried in
/// the authorization message. Only the holder of the matching session
/// secret can open the response; the transport sees ciphertext.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolutionResponse {
    /// The oracle's ephemeral public key for this response.
    pub response_public_key: SessionPublicKey,
    /// The nonce the payload was sealed with.
    pub nonce: EncryptionNonce,
    /// ChaCha20-Poly1305 ciphertext of the CBOR-encoded values.
    pub sealed: Bytes,
}

impl ResolutionResponse {
    /// Seal `values` to `recipient`, binding the sealing key to `context`.
    pub fn seal(
        values: &ResolvedValues,
        recipient: &SessionPublicKey,
        context: &ContextId,
    ) -> Result<Self, AuthzError> {
        let mut payload = Vec::new();
        ciborium::into_writer(values, &mut payload)
            .map_err(|e| AuthzError::SerializationError(e.to_string()))?;

        let ephemeral = EphemeralKeyPair::generate();
        let response_public_key = ephemeral.public_key();
        let key = ephemeral
            .diffie_hellman(recipient)
            .derive_sealing_key(context.as_bytes());
        let nonce = EncryptionNonce::generate();
        let sealed = key.encrypt(&payload, &nonce)?;

        Ok(Self {
            response_public_key,
            nonce,
            sealed: Bytes::from(sealed),
        })
    }

    /// Open the response with the session secret it was sealed to.
    pub fn open(
        &self,
        secret: &SessionSecret,
        context: &ContextId,
    ) -> Result<ResolvedValues, AuthzError> {
        let key = secret
            .diffie_hellman(&self.response_public_key)
            .derive_sealing_key(context.as_bytes());
        let payload = key.decrypt(&self.sealed, &self.nonce)?;
        ciborium::from_reader(payload.as_slice())
            .map_err(|e| AuthzError::SerializationError(e.to_string()))
    }
}
