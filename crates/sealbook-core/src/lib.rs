//! # Sealbook Core
//!
//! Core types for the Sealbook encrypted-record ledger: principals and
//! identity signatures, ciphertext handles, context ids, and the record
//! model shared by every other crate in the workspace.
//!
//! ## Key Types
//!
//! - [`Principal`]: an Ed25519 public key acting as an identity.
//! - [`IdentityKeypair`]: the private half, used for signing proofs and
//!   decryption authorizations.
//! - [`CiphertextHandle`]: an opaque 32-byte reference to an encrypted
//!   value, width-tagged in its final byte.
//! - [`ContextId`]: binds cryptographic material to one store deployment.
//! - [`Record`]: one append-only entry, a plaintext item label plus a
//!   [`HandleTriple`] of encrypted values.
//!
//! ## Design Notes
//!
//! This crate holds no I/O and no async code. Everything here is cheap to
//! clone, serializable, and safe to share between the store, the
//! authorization protocol, and client code.

pub mod crypto;
pub mod error;
pub mod handle;
pub mod record;
pub mod types;

pub use crypto::{IdentityKeypair, IdentitySignature, Principal};
pub use error::{CoreError, Result};
pub use handle::{CipherWidth, CiphertextHandle, HandleTriple};
pub use record::{validate_item, Record, RecordAppended, MAX_ITEM_LEN};
pub use types::ContextId;
