//! Protocol test vectors for deterministic verification.
//!
//! These vectors pin the canonical authorization-message encoding: every
//! implementation that signs the same message fields must produce the same
//! bytes, or signatures stop verifying across implementations.

use serde::Serialize;

use sealbook_authz::{AuthorizationMessage, SessionSecret};
use sealbook_core::{ContextId, IdentityKeypair, IdentitySignature};

/// A deterministic protocol vector.
#[derive(Debug, Clone)]
pub struct ProtocolVector {
    /// Human-readable name for the vector.
    pub name: &'static str,
    /// Seed for the identity keypair.
    pub identity_seed: [u8; 32],
    /// Seed for the session secret.
    pub session_seed: [u8; 32],
    /// Label the context id is derived from.
    pub context_label: &'static str,
    /// Window start, Unix milliseconds.
    pub issued_at: i64,
    /// Window length in milliseconds.
    pub duration_ms: i64,
}

/// Get all protocol vectors.
pub fn all_vectors() -> Vec<ProtocolVector> {
    vec![
        ProtocolVector {
            name: "one-hour window",
            identity_seed: [0x42; 32],
            session_seed: [0x01; 32],
            context_label: "records",
            issued_at: 1_736_870_400_000, // 2025-01-14T16:00:00Z
            duration_ms: 3_600_000,
        },
        ProtocolVector {
            name: "zero-duration window",
            identity_seed: [0x42; 32],
            session_seed: [0x02; 32],
            context_label: "records",
            issued_at: 0,
            duration_ms: 0,
        },
        ProtocolVector {
            name: "distinct identity and label",
            identity_seed: [0x07; 32],
            session_seed: [0x03; 32],
            context_label: "audit",
            issued_at: 1_736_870_400_000,
            duration_ms: 60_000,
        },
    ]
}

/// Build the authorization message a vector describes.
pub fn message_for(vector: &ProtocolVector) -> AuthorizationMessage {
    let identity = IdentityKeypair::from_seed(&vector.identity_seed);
    let session = SessionSecret::from_bytes(vector.session_seed);
    let context = ContextId::derive(&identity.principal(), vector.context_label);
    AuthorizationMessage {
        session_public_key: session.public_key(),
        context_ids: vec![context],
        issued_at: vector.issued_at,
        duration_ms: vector.duration_ms,
    }
}

/// The canonical bytes the identity key signs for a vector.
pub fn signing_bytes_for(vector: &ProtocolVector) -> Vec<u8> {
    message_for(vector).signing_bytes()
}

/// The identity signature over a vector's signing bytes.
pub fn signature_for(vector: &ProtocolVector) -> IdentitySignature {
    let identity = IdentityKeypair::from_seed(&vector.identity_seed);
    identity.sign(&signing_bytes_for(vector))
}

/// One row of the exported vector report.
#[derive(Debug, Serialize)]
pub struct VectorReport {
    pub name: String,
    pub principal: String,
    pub signing_bytes: String,
    pub signature: String,
}

/// Render every vector as hex, for cross-checking another implementation.
pub fn report() -> Vec<VectorReport> {
    all_vectors()
        .iter()
        .map(|vector| {
            let identity = IdentityKeypair::from_seed(&vector.identity_seed);
            VectorReport {
                name: vector.name.to_string(),
                principal: identity.principal().to_hex(),
                signing_bytes: hex::encode(signing_bytes_for(vector)),
                signature: signature_for(vector).to_hex(),
            }
        })
        .collect()
}
