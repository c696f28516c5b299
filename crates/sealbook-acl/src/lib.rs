//! # Sealbook ACL
//!
//! The capability grant registry: which principals may request decryption
//! of which ciphertext handles.
//!
//! Capabilities are granted at write time, when a record's values are
//! imported into the store, and only ever to the store principal and the
//! record owner. The relation is append-only from the outside; the single
//! removal hook exists so a failed append can unwind its own grants before
//! anyone could have observed them.
//!
//! ## Usage
//!
//! ```rust
//! use sealbook_acl::{CapabilityRegistry, GrantOutcome};
//! use sealbook_core::{CipherWidth, CiphertextHandle, Principal};
//!
//! let registry = CapabilityRegistry::new();
//! let handle = CiphertextHandle::derive(b"ciphertext", CipherWidth::U32);
//! let reader = Principal::from_bytes([7u8; 32]);
//!
//! assert_eq!(registry.grant(handle, reader), GrantOutcome::Granted);
//! assert!(registry.is_granted(&handle, &reader));
//! ```

pub mod registry;

pub use registry::{CapabilityRegistry, GrantOutcome};
