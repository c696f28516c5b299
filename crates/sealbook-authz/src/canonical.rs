//! Canonical CBOR encoding for signed payloads.
//!
//! Authorization messages and proof attestations are signed over bytes, so
//! signer and verifier must produce the identical encoding. This module
//! implements the deterministic subset of CBOR the protocol needs: integer
//! map keys, definite lengths everywhere, smallest-possible integer heads,
//! and map entries sorted by their encoded key bytes.
//!
//! Decoding is never canonical: signed payloads are re-encoded from parsed
//! fields and compared by signature, not by byte equality.

use ciborium::value::{Integer, Value};

use sealbook_core::{ContextId, Principal};

use crate::crypto::SessionPublicKey;
use crate::proof::ValueCommitment;

/// Domain prefix for decryption authorization signatures.
pub const AUTHZ_SIGN_DOMAIN: &[u8] = b"sealbook/authz-sig/v0";

/// Domain prefix for encryption proof signatures.
pub const PROOF_SIGN_DOMAIN: &[u8] = b"sealbook/proof-sig/v0";

/// Integer keys for the authorization message map.
mod authz_keys {
    // Keys 0-23 encode as single bytes in CBOR.
    pub const SESSION_KEY: u64 = 0;
    pub const CONTEXT_IDS: u64 = 1;
    pub const ISSUED_AT: u64 = 2;
    pub const DURATION_MS: u64 = 3;
}

/// Integer keys for the proof attestation map.
mod proof_keys {
    pub const CONTEXT: u64 = 0;
    pub const OWNER: u64 = 1;
    pub const COMMITMENTS: u64 = 2;
}

/// The bytes an identity key signs to authorize decryption.
///
/// Layout: [`AUTHZ_SIGN_DOMAIN`] followed by the canonical encoding of a
/// map binding the session public key, the context ids in scope, and the
/// validity window.
pub fn authorization_signing_bytes(
    session_public_key: &SessionPublicKey,
    context_ids: &[ContextId],
    issued_at: i64,
    duration_ms: i64,
) -> Vec<u8> {
    let contexts = context_ids
        .iter()
        .map(|id| Value::Bytes(id.as_bytes().to_vec()))
        .collect();

    let value = Value::Map(vec![
        (
            Value::Integer(Integer::from(authz_keys::SESSION_KEY)),
            Value::Bytes(session_public_key.as_bytes().to_vec()),
        ),
        (
            Value::Integer(Integer::from(authz_keys::CONTEXT_IDS)),
            Value::Array(contexts),
        ),
        (
            Value::Integer(Integer::from(authz_keys::ISSUED_AT)),
            Value::Integer(Integer::from(issued_at)),
        ),
        (
            Value::Integer(Integer::from(authz_keys::DURATION_MS)),
            Value::Integer(Integer::from(duration_ms)),
        ),
    ]);

    let mut buf = AUTHZ_SIGN_DOMAIN.to_vec();
    encode_value_to(&value, &mut buf);
    buf
}

/// The bytes an owner signs to attest a set of encrypted values.
///
/// Layout: [`PROOF_SIGN_DOMAIN`] followed by the canonical encoding of a
/// map binding the context, the owner, and the value commitments in order.
pub fn attestation_signing_bytes(
    owner: &Principal,
    context: &ContextId,
    commitments: &[ValueCommitment],
) -> Vec<u8> {
    let commitment_values = commitments
        .iter()
        .map(|c| Value::Bytes(c.as_bytes().to_vec()))
        .collect();

    let value = Value::Map(vec![
        (
            Value::Integer(Integer::from(proof_keys::CONTEXT)),
            Value::Bytes(context.as_bytes().to_vec()),
        ),
        (
            Value::Integer(Integer::from(proof_keys::OWNER)),
            Value::Bytes(owner.as_bytes().to_vec()),
        ),
        (
            Value::Integer(Integer::from(proof_keys::COMMITMENTS)),
            Value::Array(commitment_values),
        ),
    ]);

    let mut buf = PROOF_SIGN_DOMAIN.to_vec();
    encode_value_to(&value, &mut buf);
    buf
}

fn encode_value_to(value: &Value, buf: &mut Vec<u8>) {
    match value {
        Value::Integer(i) => {
            let i = i128::from(*i);
            if i >= 0 {
                encode_uint(buf, 0, i as u64);
            } else {
                encode_uint(buf, 1, (-1 - i) as u64);
            }
        }
        Value::Bytes(bytes) => {
            encode_uint(buf, 2, bytes.len() as u64);
            buf.extend_from_slice(bytes);
        }
        Value::Text(text) => {
            encode_uint(buf, 3, text.len() as u64);
            buf.extend_from_slice(text.as_bytes());
        }
        Value::Array(items) => {
            encode_uint(buf, 4, items.len() as u64);
            for item in items {
                encode_value_to(item, buf);
            }
        }
        Value::Map(entries) => encode_map_canonical(buf, entries),
        Value::Null => buf.push(0xf6),
        _ => panic!("unsupported value in canonical encoding"),
    }
}

/// Encode an integer head with the smallest possible width.
fn encode_uint(buf: &mut Vec<u8>, major: u8, n: u64) {
    let major = major << 5;
    if n < 24 {
        buf.push(major | n as u8);
    } else if n <= 0xff {
        buf.push(major | 24);
        buf.push(n as u8);
    } else if n <= 0xffff {
        buf.push(major | 25);
        buf.extend_from_slice(&(n as u16).to_be_bytes());
    } else if n <= 0xffff_ffff {
        buf.push(major | 26);
        buf.extend_from_slice(&(n as u32).to_be_bytes());
    } else {
        buf.push(major | 27);
        buf.extend_from_slice(&n.to_be_bytes());
    }
}

/// Encode a map with entries sorted by their encoded key bytes.
fn encode_map_canonical(buf: &mut Vec<u8>, entries: &[(Value, Value)]) {
    let mut encoded: Vec<(Vec<u8>, Vec<u8>)> = entries
        .iter()
        .map(|(key, value)| {
            let mut key_bytes = Vec::new();
            encode_value_to(key, &mut key_bytes);
            let mut value_bytes = Vec::new();
            encode_value_to(value, &mut value_bytes);
            (key_bytes, value_bytes)
        })
        .collect();
    encoded.sort_by(|a, b| a.0.cmp(&b.0));

    encode_uint(buf, 5, encoded.len() as u64);
    for (key_bytes, value_bytes) in encoded {
        buf.extend_from_slice(&key_bytes);
        buf.extend_from_slice(&value_bytes);
    }
}
