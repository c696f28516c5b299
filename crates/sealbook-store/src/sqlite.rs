//! SQLite-backed record store.

use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};
use sealbook_core::{
    validate_item, CiphertextHandle, HandleTriple, Principal, Record, RecordAppended,
};
use tokio::sync::broadcast;

use crate::error::{Result, StoreError};
use crate::migration;
use crate::traits::RecordStore;

/// Capacity of the append notification channel.
const EVENT_CAPACITY: usize = 256;

/// SQLite-backed store.
///
/// The connection sits behind a mutex and all database work runs on the
/// blocking thread pool via `tokio::task::spawn_blocking`, so the async
/// executor never blocks on SQLite.
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
    events: broadcast::Sender<RecordAppended>,
}

impl SqliteStore {
    /// Open (or create) a store at `path`, applying pending migrations.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let mut conn = Connection::open(path)?;
        migration::migrate(&mut conn)?;
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            events,
        })
    }

    /// Open an in-memory store, mainly for tests.
    pub fn open_memory() -> Result<Self> {
        let mut conn = Connection::open_in_memory()?;
        migration::migrate(&mut conn)?;
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            events,
        })
    }
}

/// A poisoned connection mutex, reported as a database error.
fn poisoned_lock<E: std::fmt::Display>(e: E) -> StoreError {
    StoreError::Database(rusqlite::Error::SqliteFailure(
        rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_LOCKED),
        Some(format!("mutex poisoned: {}", e)),
    ))
}

/// A blocking task that panicked or was cancelled before completing.
fn join_failed<E: std::fmt::Display>(e: E) -> StoreError {
    StoreError::Database(rusqlite::Error::SqliteFailure(
        rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_ERROR),
        Some(format!("spawn_blocking failed: {}", e)),
    ))
}

fn blob32(idx: usize, name: &str, blob: Vec<u8>) -> rusqlite::Result<[u8; 32]> {
    blob.try_into().map_err(|_| {
        rusqlite::Error::InvalidColumnType(idx, name.to_string(), rusqlite::types::Type::Blob)
    })
}

fn row_to_record(row: &rusqlite::Row<'_>) -> rusqlite::Result<Record> {
    let owner = blob32(0, "owner", row.get(0)?)?;
    let index: i64 = row.get(1)?;
    let item: String = row.get(2)?;
    let user_id = blob32(3, "user_id_handle", row.get(3)?)?;
    let quantity = blob32(4, "quantity_handle", row.get(4)?)?;
    let amount = blob32(5, "amount_handle", row.get(5)?)?;
    let timestamp: i64 = row.get(6)?;

    Ok(Record {
        owner: Principal::from_bytes(owner),
        index: index as u64,
        item,
        handles: HandleTriple {
            user_id: CiphertextHandle::from_bytes(user_id),
            quantity: CiphertextHandle::from_bytes(quantity),
            amount: CiphertextHandle::from_bytes(amount),
        },
        timestamp,
    })
}

const SELECT_COLUMNS: &str =
    "owner, idx, item, user_id_handle, quantity_handle, amount_handle, timestamp";

#[async_trait]
impl RecordStore for SqliteStore {
    async fn append(
        &self,
        owner: &Principal,
        item: &str,
        handles: HandleTriple,
        timestamp: i64,
    ) -> Result<u64> {
        validate_item(item)?;
        handles.validate()?;

        let conn = Arc::clone(&self.conn);
        let owner = *owner;
        let item = item.to_string();
        let stored_item = item.clone();

        let index = tokio::task::spawn_blocking(move || -> Result<u64> {
            let mut conn = conn.lock().map_err(poisoned_lock)?;
            let tx = conn.transaction()?;

            // Dense index: the count before this append.
            let index: i64 = tx.query_row(
                "SELECT COUNT(*) FROM records WHERE owner = ?1",
                params![owner.as_bytes().as_slice()],
                |row| row.get(0),
            )?;

            tx.execute(
                "INSERT INTO records \
                 (owner, idx, item, user_id_handle, quantity_handle, amount_handle, timestamp) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    owner.as_bytes().as_slice(),
                    index,
                    stored_item,
                    handles.user_id.as_bytes().as_slice(),
                    handles.quantity.as_bytes().as_slice(),
                    handles.amount.as_bytes().as_slice(),
                    timestamp,
                ],
            )?;

            tx.commit()?;
            Ok(index as u64)
        })
        .await
        .map_err(join_failed)??;

        // Notify only after the transaction committed.
        let _ = self.events.send(RecordAppended {
            owner,
            index,
            item,
            timestamp,
        });
        Ok(index)
    }

    async fn count(&self, owner: &Principal) -> Result<u64> {
        let conn = Arc::clone(&self.conn);
        let owner = *owner;

        tokio::task::spawn_blocking(move || -> Result<u64> {
            let conn = conn.lock().map_err(poisoned_lock)?;
            let count: i64 = conn.query_row(
                "SELECT COUNT(*) FROM records WHERE owner = ?1",
                params![owner.as_bytes().as_slice()],
                |row| row.get(0),
            )?;
            Ok(count as u64)
        })
        .await
        .map_err(join_failed)?
    }

    async fn get(&self, owner: &Principal, index: u64) -> Result<Record> {
        let conn = Arc::clone(&self.conn);
        let owner = *owner;

        tokio::task::spawn_blocking(move || -> Result<Record> {
            let conn = conn.lock().map_err(poisoned_lock)?;
            let record = conn
                .query_row(
                    &format!(
                        "SELECT {} FROM records WHERE owner = ?1 AND idx = ?2",
                        SELECT_COLUMNS
                    ),
                    params![owner.as_bytes().as_slice(), index as i64],
                    row_to_record,
                )
                .optional()?;

            match record {
                Some(record) => Ok(record),
                None => {
                    let count: i64 = conn.query_row(
                        "SELECT COUNT(*) FROM records WHERE owner = ?1",
                        params![owner.as_bytes().as_slice()],
                        |row| row.get(0),
                    )?;
                    Err(StoreError::InvalidIndex {
                        index,
                        count: count as u64,
                    })
                }
            }
        })
        .await
        .map_err(join_failed)?
    }

    async fn list_recent(&self, owner: &Principal, limit: usize) -> Result<Vec<Record>> {
        let conn = Arc::clone(&self.conn);
        let owner = *owner;

        tokio::task::spawn_blocking(move || -> Result<Vec<Record>> {
            let conn = conn.lock().map_err(poisoned_lock)?;
            let mut stmt = conn.prepare(&format!(
                "SELECT {} FROM records WHERE owner = ?1 ORDER BY idx DESC LIMIT ?2",
                SELECT_COLUMNS
            ))?;
            let records = stmt
                .query_map(
                    params![owner.as_bytes().as_slice(), limit as i64],
                    row_to_record,
                )?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(records)
        })
        .await
        .map_err(join_failed)?
    }

    async fn owners(&self) -> Result<Vec<Principal>> {
        let conn = Arc::clone(&self.conn);

        tokio::task::spawn_blocking(move || -> Result<Vec<Principal>> {
            let conn = conn.lock().map_err(poisoned_lock)?;
            let mut stmt = conn.prepare("SELECT DISTINCT owner FROM records")?;
            let owners = stmt
                .query_map([], |row| {
                    blob32(0, "owner", row.get(0)?).map(Principal::from_bytes)
                })?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(owners)
        })
        .await
        .map_err(join_failed)?
    }

    fn subscribe(&self) -> broadcast::Receiver<RecordAppended> {
        self.events.subscribe()
    }
}
