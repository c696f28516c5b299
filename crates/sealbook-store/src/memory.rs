//! In-memory record store.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use sealbook_core::{validate_item, HandleTriple, Principal, Record, RecordAppended};
use tokio::sync::broadcast;

use crate::error::{Result, StoreError};
use crate::traits::RecordStore;

/// Capacity of the append notification channel.
const EVENT_CAPACITY: usize = 256;

/// In-memory store, for tests and ephemeral deployments.
///
/// Records live in a `HashMap` keyed by owner; each owner's `Vec` position
/// is the record's index, so density holds by construction.
pub struct MemoryStore {
    inner: RwLock<MemoryStoreInner>,
    events: broadcast::Sender<RecordAppended>,
}

struct MemoryStoreInner {
    /// Records per owner, in append order.
    records: HashMap<Principal, Vec<Record>>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            inner: RwLock::new(MemoryStoreInner {
                records: HashMap::new(),
            }),
            events,
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn append(
        &self,
        owner: &Principal,
        item: &str,
        handles: HandleTriple,
        timestamp: i64,
    ) -> Result<u64> {
        validate_item(item)?;
        handles.validate()?;

        let record = {
            let mut inner = self.inner.write().unwrap();
            let records = inner.records.entry(*owner).or_default();
            let record = Record {
                owner: *owner,
                index: records.len() as u64,
                item: item.to_string(),
                handles,
                timestamp,
            };
            records.push(record.clone());
            record
        };

        // No receivers is fine; the event is best-effort.
        let _ = self.events.send(record.notification());
        Ok(record.index)
    }

    async fn count(&self, owner: &Principal) -> Result<u64> {
        let inner = self.inner.read().unwrap();
        Ok(inner.records.get(owner).map_or(0, |r| r.len() as u64))
    }

    async fn get(&self, owner: &Principal, index: u64) -> Result<Record> {
        let inner = self.inner.read().unwrap();
        let records = inner.records.get(owner);
        let count = records.map_or(0, |r| r.len() as u64);
        records
            .and_then(|r| r.get(index as usize))
            .cloned()
            .ok_or(StoreError::InvalidIndex { index, count })
    }

    async fn list_recent(&self, owner: &Principal, limit: usize) -> Result<Vec<Record>> {
        let inner = self.inner.read().unwrap();
        Ok(inner
            .records
            .get(owner)
            .map(|records| records.iter().rev().take(limit).cloned().collect())
            .unwrap_or_default())
    }

    async fn owners(&self) -> Result<Vec<Principal>> {
        let inner = self.inner.read().unwrap();
        Ok(inner.records.keys().copied().collect())
    }

    fn subscribe(&self) -> broadcast::Receiver<RecordAppended> {
        self.events.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sealbook_core::{CipherWidth, CiphertextHandle};

    fn handles(seed: u8) -> HandleTriple {
        HandleTriple {
            user_id: CiphertextHandle::derive(&[seed, 1], CipherWidth::U32),
            quantity: CiphertextHandle::derive(&[seed, 2], CipherWidth::U32),
            amount: CiphertextHandle::derive(&[seed, 3], CipherWidth::U64),
        }
    }

    fn owner(seed: u8) -> Principal {
        Principal::from_bytes([seed; 32])
    }

    #[tokio::test]
    async fn test_append_assigns_dense_indices() {
        let store = MemoryStore::new();
        let alice = owner(1);
        assert_eq!(store.append(&alice, "a", handles(1), 10).await.unwrap(), 0);
        assert_eq!(store.append(&alice, "b", handles(2), 11).await.unwrap(), 1);
        assert_eq!(store.append(&alice, "c", handles(3), 12).await.unwrap(), 2);
        assert_eq!(store.count(&alice).await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_owners_are_independent() {
        let store = MemoryStore::new();
        store.append(&owner(1), "a", handles(1), 10).await.unwrap();
        store.append(&owner(1), "b", handles(2), 11).await.unwrap();
        assert_eq!(store.append(&owner(2), "c", handles(3), 12).await.unwrap(), 0);
        assert_eq!(store.count(&owner(1)).await.unwrap(), 2);
        assert_eq!(store.count(&owner(2)).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_count_unknown_owner_is_zero() {
        let store = MemoryStore::new();
        assert_eq!(store.count(&owner(9)).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_get_returns_stored_record() {
        let store = MemoryStore::new();
        let alice = owner(1);
        store.append(&alice, "Coffee", handles(1), 99).await.unwrap();
        let record = store.get(&alice, 0).await.unwrap();
        assert_eq!(record.owner, alice);
        assert_eq!(record.index, 0);
        assert_eq!(record.item, "Coffee");
        assert_eq!(record.timestamp, 99);
    }

    #[tokio::test]
    async fn test_get_invalid_index() {
        let store = MemoryStore::new();
        let alice = owner(1);
        store.append(&alice, "a", handles(1), 10).await.unwrap();
        match store.get(&alice, 1).await {
            Err(StoreError::InvalidIndex { index, count }) => {
                assert_eq!(index, 1);
                assert_eq!(count, 1);
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_get_unknown_owner_reports_zero_count() {
        let store = MemoryStore::new();
        match store.get(&owner(9), 0).await {
            Err(StoreError::InvalidIndex { index, count }) => {
                assert_eq!(index, 0);
                assert_eq!(count, 0);
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_list_recent_is_newest_first() {
        let store = MemoryStore::new();
        let alice = owner(1);
        for (i, item) in ["a", "b", "c"].iter().enumerate() {
            store.append(&alice, item, handles(i as u8), i as i64).await.unwrap();
        }
        let recent = store.list_recent(&alice, 2).await.unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].index, 2);
        assert_eq!(recent[1].index, 1);
    }

    #[tokio::test]
    async fn test_list_recent_handles_short_histories() {
        let store = MemoryStore::new();
        let alice = owner(1);
        store.append(&alice, "only", handles(1), 5).await.unwrap();
        assert_eq!(store.list_recent(&alice, 10).await.unwrap().len(), 1);
        assert!(store.list_recent(&owner(9), 10).await.unwrap().is_empty());
        assert!(store.list_recent(&alice, 0).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_append_rejects_invalid_item() {
        let store = MemoryStore::new();
        let err = store.append(&owner(1), "", handles(1), 0).await.unwrap_err();
        assert!(matches!(err, StoreError::InvalidRecord(_)));
        assert_eq!(store.count(&owner(1)).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_append_rejects_bad_width_tags() {
        let store = MemoryStore::new();
        let bad = HandleTriple {
            user_id: CiphertextHandle::derive(b"u", CipherWidth::U64),
            quantity: CiphertextHandle::derive(b"q", CipherWidth::U32),
            amount: CiphertextHandle::derive(b"a", CipherWidth::U64),
        };
        let err = store.append(&owner(1), "item", bad, 0).await.unwrap_err();
        assert!(matches!(err, StoreError::InvalidRecord(_)));
    }

    #[tokio::test]
    async fn test_append_notifies_subscribers() {
        let store = MemoryStore::new();
        let mut rx = store.subscribe();
        store.append(&owner(1), "Coffee", handles(1), 42).await.unwrap();
        let event = rx.recv().await.unwrap();
        assert_eq!(event.owner, owner(1));
        assert_eq!(event.index, 0);
        assert_eq!(event.item, "Coffee");
        assert_eq!(event.timestamp, 42);
    }

    #[tokio::test]
    async fn test_failed_append_emits_nothing() {
        let store = MemoryStore::new();
        let mut rx = store.subscribe();
        let _ = store.append(&owner(1), "", handles(1), 0).await;
        assert!(matches!(
            rx.try_recv(),
            Err(broadcast::error::TryRecvError::Empty)
        ));
    }
}
