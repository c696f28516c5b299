//! The record model.
//!
//! A record pairs one plaintext item label with three encrypted values. The
//! label is readable by anyone who can reach the store; the values are only
//! ever present as [ciphertext handles](crate::handle::CiphertextHandle).
//! Records are append-only: once stored they are never modified or removed,
//! and each owner's records are indexed densely from zero in append order.

use serde::{Deserialize, Serialize};

use crate::crypto::Principal;
use crate::error::CoreError;
use crate::handle::HandleTriple;

/// Maximum length of an item label in bytes.
pub const MAX_ITEM_LEN: usize = 64;

/// Check that an item label is between 1 and [`MAX_ITEM_LEN`] bytes.
///
/// The limit is on UTF-8 bytes, not characters, so multi-byte labels hit it
/// sooner than their character count suggests.
pub fn validate_item(item: &str) -> Result<(), CoreError> {
    let len = item.len();
    if len == 0 || len > MAX_ITEM_LEN {
        return Err(CoreError::InvalidItem { len });
    }
    Ok(())
}

/// One stored record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    /// The principal this record belongs to.
    pub owner: Principal,
    /// Position in the owner's sequence, dense from zero.
    pub index: u64,
    /// Plaintext item label, 1 to [`MAX_ITEM_LEN`] bytes.
    pub item: String,
    /// Handles for the three encrypted values.
    pub handles: HandleTriple,
    /// Store-assigned timestamp in Unix milliseconds.
    pub timestamp: i64,
}

impl Record {
    /// The notification emitted when this record was appended.
    pub fn notification(&self) -> RecordAppended {
        RecordAppended {
            owner: self.owner,
            index: self.index,
            item: self.item.clone(),
            timestamp: self.timestamp,
        }
    }
}

/// Notification that a record was appended.
///
/// This is the only externally observable event the store emits. It carries
/// no handles and no encrypted material, only what a plain read of the
/// record would reveal anyway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordAppended {
    /// The principal the record belongs to.
    pub owner: Principal,
    /// The index the record was assigned.
    pub index: u64,
    /// The plaintext item label.
    pub item: String,
    /// The store-assigned timestamp in Unix milliseconds.
    pub timestamp: i64,
}
