//! # Sealbook Store
//!
//! Append-only record storage for the Sealbook ledger.
//!
//! Two backends implement the [`RecordStore`] trait: [`MemoryStore`] for
//! tests and ephemeral use, and [`SqliteStore`] for durable single-node
//! deployments. Both enforce the same invariants: per-owner indices are
//! dense from zero, stored records are never modified, and every successful
//! append emits exactly one [`RecordAppended`] notification.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use sealbook_store::{RecordStore, SqliteStore};
//!
//! # async fn example() -> Result<(), sealbook_store::StoreError> {
//! let store = SqliteStore::open("records.db")?;
//! let owner = sealbook_core::Principal::from_bytes([1u8; 32]);
//! let count = store.count(&owner).await?;
//! println!("{} records for {}", count, owner);
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod memory;
pub mod migration;
pub mod sqlite;
pub mod traits;

pub use error::{Result, StoreError};
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;
pub use traits::RecordStore;

// Re-exported for convenience: the notification type gets used by every
// store consumer.
pub use sealbook_core::RecordAppended;
