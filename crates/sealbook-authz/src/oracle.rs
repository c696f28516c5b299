//! The encryption scheme seam and the reference decryption oracle.
//!
//! [`EncryptionScheme`] is the boundary between the ledger and whatever
//! actually holds plaintexts. [`DecryptionOracle`] is the reference
//! implementation: a single-context, in-memory vault that encrypts imported
//! values under a master key and resolves batches for principals the
//! capability registry vouches for.
//!
//! Every resolution failure leaves the oracle through one opaque error.
//! The concrete reason is logged at debug level and goes no further; a
//! caller probing for why it was denied learns nothing.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use bytes::Bytes;

use sealbook_acl::CapabilityRegistry;
use sealbook_core::{CipherWidth, CiphertextHandle, ContextId, Principal};

use crate::crypto::{EncryptionKey, EncryptionNonce};
use crate::error::AuthzError;
use crate::message::{ResolutionRequest, ResolutionResponse, ResolvedValues};
use crate::proof::{EncryptionProof, RawValue};

/// The two capability-gated operations of an encryption scheme.
#[async_trait]
pub trait EncryptionScheme: Send + Sync {
    /// Encrypt an externally supplied value and return its handle.
    ///
    /// The proof must attest `value` for `owner` under `context`. A proof
    /// that fails verification surfaces as
    /// [`AuthzError::InvalidProof`], unchanged, so callers can rely on that
    /// exact error to mean the submission was not vouched for.
    async fn from_external(
        &self,
        owner: &Principal,
        context: &ContextId,
        value: RawValue,
        proof: &EncryptionProof,
    ) -> Result<CiphertextHandle, AuthzError>;

    /// Resolve a batch of handles into plaintexts sealed to the requester.
    ///
    /// All-or-nothing: a single unauthorized pair fails the whole batch,
    /// and every failure surfaces as the opaque
    /// [`AuthzError::ResolutionDenied`].
    async fn resolve(&self, request: ResolutionRequest) -> Result<ResolutionResponse, AuthzError>;
}

/// Why a resolution was denied. Logged, never returned to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DenyReason {
    EmptyBatch,
    OverLimit,
    OutsideWindow,
    BadSignature,
    ContextMismatch,
    OutOfScope,
    UnknownHandle,
    NotGranted,
    VaultFailure,
    SealFailure,
}

impl fmt::Display for DenyReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DenyReason::EmptyBatch => "empty batch",
            DenyReason::OverLimit => "batch exceeds limits",
            DenyReason::OutsideWindow => "outside validity window",
            DenyReason::BadSignature => "signature verification failed",
            DenyReason::ContextMismatch => "pair context does not match this oracle",
            DenyReason::OutOfScope => "pair context missing from signed scope",
            DenyReason::UnknownHandle => "handle not in vault",
            DenyReason::NotGranted => "principal lacks capability",
            DenyReason::VaultFailure => "vault entry unusable",
            DenyReason::SealFailure => "response sealing failed",
        };
        f.write_str(s)
    }
}

/// Collapse a denial to the opaque error, logging the real reason.
fn deny(reason: DenyReason) -> AuthzError {
    tracing::debug!("resolution denied: {}", reason);
    AuthzError::ResolutionDenied
}

/// One encrypted value held by the oracle.
struct VaultEntry {
    width: CipherWidth,
    nonce: EncryptionNonce,
    ciphertext: Bytes,
}

/// Reference oracle: one context, one master key, an in-memory vault.
///
/// The vault and master key live only as long as the process; a restarted
/// oracle cannot resolve handles minted by its predecessor. Durable key
/// management belongs to deployments, not to this reference.
pub struct DecryptionOracle {
    context: ContextId,
    registry: Arc<CapabilityRegistry>,
    master_key: EncryptionKey,
    vault: RwLock<HashMap<CiphertextHandle, VaultEntry>>,
}

impl DecryptionOracle {
    /// Create an oracle serving `context` with a fresh random master key.
    pub fn new(context: ContextId, registry: Arc<CapabilityRegistry>) -> Self {
        Self::with_master_key(context, registry, EncryptionKey::generate())
    }

    /// Create with a caller-supplied master key.
    pub fn with_master_key(
        context: ContextId,
        registry: Arc<CapabilityRegistry>,
        master_key: EncryptionKey,
    ) -> Self {
        Self {
            context,
            registry,
            master_key,
            vault: RwLock::new(HashMap::new()),
        }
    }

    /// The context this oracle serves.
    pub fn context(&self) -> &ContextId {
        &self.context
    }

    /// Number of ciphertexts in the vault.
    pub fn vault_len(&self) -> usize {
        self.vault.read().unwrap().len()
    }

    fn entry_plaintext(&self, entry: &VaultEntry) -> Option<RawValue> {
        let bytes = self
            .master_key
            .decrypt(&entry.ciphertext, &entry.nonce)
            .ok()?;
        match entry.width {
            CipherWidth::U32 => bytes
                .try_into()
                .ok()
                .map(u32::from_le_bytes)
                .map(RawValue::U32),
            CipherWidth::U64 => bytes
                .try_into()
                .ok()
                .map(u64::from_le_bytes)
                .map(RawValue::U64),
        }
    }
}

#[async_trait]
impl EncryptionScheme for DecryptionOracle {
    async fn from_external(
        &self,
        owner: &Principal,
        context: &ContextId,
        value: RawValue,
        proof: &EncryptionProof,
    ) -> Result<CiphertextHandle, AuthzError> {
        // A proof for some other context cannot vouch for values here.
        if *context != self.context {
            return Err(AuthzError::InvalidProof);
        }
        proof.verify(owner, context, &value)?;

        let nonce = EncryptionNonce::generate();
        let ciphertext = self.master_key.encrypt(&value.le_bytes(), &nonce)?;
        let handle = CiphertextHandle::derive(&ciphertext, value.width());

        let mut vault = self.vault.write().unwrap();
        vault.insert(
            handle,
            VaultEntry {
                width: value.width(),
                nonce,
                ciphertext: Bytes::from(ciphertext),
            },
        );
        Ok(handle)
    }

    async fn resolve(&self, request: ResolutionRequest) -> Result<ResolutionResponse, AuthzError> {
        let now = now_millis();

        if request.pairs.is_empty() {
            return Err(deny(DenyReason::EmptyBatch));
        }
        if !request.within_limits() {
            return Err(deny(DenyReason::OverLimit));
        }
        if !request.message.window_contains(now) {
            return Err(deny(DenyReason::OutsideWindow));
        }
        if request
            .principal
            .verify(&request.message.signing_bytes(), &request.signature)
            .is_err()
        {
            return Err(deny(DenyReason::BadSignature));
        }

        let values = {
            let vault = self.vault.read().unwrap();
            let mut values = Vec::with_capacity(request.pairs.len());
            for pair in &request.pairs {
                if pair.context != self.context {
                    return Err(deny(DenyReason::ContextMismatch));
                }
                if !request.message.context_ids.contains(&pair.context) {
                    return Err(deny(DenyReason::OutOfScope));
                }
                let Some(entry) = vault.get(&pair.handle) else {
                    return Err(deny(DenyReason::UnknownHandle));
                };
                if !self.registry.is_granted(&pair.handle, &request.principal) {
                    return Err(deny(DenyReason::NotGranted));
                }
                let Some(value) = self.entry_plaintext(entry) else {
                    return Err(deny(DenyReason::VaultFailure));
                };
                values.push((pair.handle, value));
            }
            values
        };

        let resolved = ResolvedValues::from_pairs(values);
        ResolutionResponse::seal(&resolved, &request.message.session_public_key, &self.context)
            .map_err(|_| deny(DenyReason::SealFailure))
    }
}

fn now_millis() -> i64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}
