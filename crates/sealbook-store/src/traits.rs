//! The storage trait implemented by every backend.

use async_trait::async_trait;
use sealbook_core::{HandleTriple, Principal, Record, RecordAppended};
use tokio::sync::broadcast;

use crate::error::Result;

/// Append-only record storage.
///
/// Implementations must preserve two invariants. Indices are dense: the
/// record appended when an owner holds `n` records is assigned index `n`,
/// with no gaps and no reuse. Records are immutable: nothing stored is ever
/// modified or removed.
#[async_trait]
pub trait RecordStore: Send + Sync {
    // ─────────────────────────────────────────────────────────────────────────
    // Append
    // ─────────────────────────────────────────────────────────────────────────

    /// Append a record for `owner` and return its assigned index.
    ///
    /// Validates the item label and the handle width tags, assigns the next
    /// dense index, and emits a [`RecordAppended`] notification once the
    /// record is durable.
    ///
    /// # Arguments
    ///
    /// * `owner` - The principal the record belongs to.
    /// * `item` - Plaintext item label, 1 to 64 bytes.
    /// * `handles` - The three ciphertext handles, width tags intact.
    /// * `timestamp` - Store-assigned timestamp in Unix milliseconds.
    ///
    /// # Returns
    ///
    /// The index assigned to the record: the owner's record count before
    /// this append.
    async fn append(
        &self,
        owner: &Principal,
        item: &str,
        handles: HandleTriple,
        timestamp: i64,
    ) -> Result<u64>;

    // ─────────────────────────────────────────────────────────────────────────
    // Reads
    // ─────────────────────────────────────────────────────────────────────────

    /// Number of records stored for `owner`.
    ///
    /// Owners with no records answer zero; this never fails for an unknown
    /// owner.
    async fn count(&self, owner: &Principal) -> Result<u64>;

    /// Fetch the record at `index` in `owner`'s sequence.
    ///
    /// Fails with [`StoreError::InvalidIndex`] when the index is at or past
    /// the owner's record count.
    ///
    /// [`StoreError::InvalidIndex`]: crate::error::StoreError::InvalidIndex
    async fn get(&self, owner: &Principal, index: u64) -> Result<Record>;

    /// The owner's most recent records, highest index first.
    ///
    /// Returns at most `limit` records; owners with fewer records get all
    /// of them. Callers enforce any protocol-level cap before calling.
    async fn list_recent(&self, owner: &Principal, limit: usize) -> Result<Vec<Record>>;

    /// Every principal that owns at least one record.
    async fn owners(&self) -> Result<Vec<Principal>>;

    // ─────────────────────────────────────────────────────────────────────────
    // Notifications
    // ─────────────────────────────────────────────────────────────────────────

    /// Subscribe to append notifications.
    ///
    /// Each successful [`append`](RecordStore::append) sends one
    /// [`RecordAppended`] to every open receiver. Slow receivers may observe
    /// lag and miss events; the store itself never blocks on them.
    fn subscribe(&self) -> broadcast::Receiver<RecordAppended>;
}
