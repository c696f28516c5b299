//! # Sealbook
//!
//! A capability-gated ledger of encrypted records: append-only histories
//! whose confidential fields are stored as opaque ciphertext handles, with
//! decryption mediated by explicit capability grants.
//!
//! ## Overview
//!
//! Sealbook provides a portable library for:
//!
//! - **Records**: Immutable entries with a plaintext item label and three
//!   encrypted fields (user id, quantity, amount)
//! - **Capabilities**: (handle, principal) grants issued at write time,
//!   checked at resolution time, never revoked
//! - **Authorization**: A session protocol for turning handles back into
//!   values, sealed to an ephemeral per-session key
//! - **Notifications**: A broadcast of appends carrying only what a plain
//!   read would reveal
//!
//! ## Key Concepts
//!
//! - **Record**: Immutable. Never edited. Corrections are new records.
//! - **Handle**: Opaque 32-byte reference to a ciphertext; reveals only
//!   the value's logical width.
//! - **Context**: The scope a value was encrypted under; derived from the
//!   ledger identity and a label.
//! - **Proof**: An owner's signed attestation of the values it submits.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use sealbook::acl::CapabilityRegistry;
//! use sealbook::authz::DecryptionOracle;
//! use sealbook::core::{ContextId, IdentityKeypair};
//! use sealbook::store::SqliteStore;
//! use sealbook::{Ledger, LedgerConfig};
//!
//! async fn example() {
//!     // One identity for the ledger, one registry shared with the oracle.
//!     let keypair = IdentityKeypair::generate();
//!     let registry = Arc::new(CapabilityRegistry::new());
//!
//!     let config = LedgerConfig::default();
//!     let context = ContextId::derive(&keypair.principal(), &config.context_label);
//!     let oracle = Arc::new(DecryptionOracle::new(context, Arc::clone(&registry)));
//!
//!     let store = SqliteStore::open("ledger.db").unwrap();
//!     let ledger = Ledger::new(keypair, store, registry, oracle, config);
//!
//!     let owner = IdentityKeypair::generate();
//!     let count = ledger.get_record_count(&owner.principal()).await.unwrap();
//!     assert_eq!(count, 0);
//! }
//! ```
//!
//! ## Re-exports
//!
//! This crate re-exports the component crates for convenience:
//!
//! - `sealbook::core` - Core types (Record, Principal, handles, identity)
//! - `sealbook::store` - Storage abstraction, memory and SQLite backends
//! - `sealbook::acl` - The capability grant registry
//! - `sealbook::authz` - The decryption authorization protocol

pub mod error;
pub mod ledger;

// Re-export component crates
pub use sealbook_acl as acl;
pub use sealbook_authz as authz;
pub use sealbook_core as core;
pub use sealbook_store as store;

// Re-export main types for convenience
pub use error::{LedgerError, Result};
pub use ledger::{AppendReceipt, Ledger, LedgerConfig, RecordValues, MAX_LIST_RECENT};

// Re-export commonly used component types
pub use sealbook_acl::CapabilityRegistry;
pub use sealbook_authz::{
    DecryptionOracle, DecryptionSession, EncryptionProof, EncryptionScheme, LocalSigner,
    ResolvedValues, SessionPhase,
};
pub use sealbook_core::{
    CipherWidth, CiphertextHandle, ContextId, HandleTriple, IdentityKeypair, Principal, Record,
    RecordAppended,
};
