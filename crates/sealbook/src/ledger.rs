//! The Ledger: unified API for the Sealbook system.
//!
//! The Ledger brings together storage, capability grants, and the
//! encryption scheme into a cohesive interface for recording and reading
//! encrypted records.

use std::sync::Arc;

use tokio::sync::{broadcast, Mutex};

use sealbook_acl::{CapabilityRegistry, GrantOutcome};
use sealbook_authz::{EncryptionProof, EncryptionScheme, RawValue};
use sealbook_core::{
    validate_item, CiphertextHandle, ContextId, HandleTriple, IdentityKeypair, Principal, Record,
    RecordAppended,
};
use sealbook_store::RecordStore;

use crate::error::Result;

/// Most records a single `list_recent` call will return.
pub const MAX_LIST_RECENT: usize = 200;

/// Configuration for the Ledger.
#[derive(Debug, Clone)]
pub struct LedgerConfig {
    /// Label the ledger's context id is derived from.
    pub context_label: String,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            context_label: "records".to_string(),
        }
    }
}

/// The three confidential fields of a record, in the clear.
///
/// These exist only on the way in: the ledger encrypts them immediately and
/// stores nothing but the resulting handles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordValues {
    pub user_id: u32,
    pub quantity: u32,
    pub amount: u64,
}

impl RecordValues {
    /// The fields as raw values, in handle order.
    pub fn as_raw_values(&self) -> [RawValue; 3] {
        [
            RawValue::U32(self.user_id),
            RawValue::U32(self.quantity),
            RawValue::U64(self.amount),
        ]
    }
}

/// What a successful append returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AppendReceipt {
    /// The owner the record was appended for.
    pub owner: Principal,
    /// The dense index the record was assigned.
    pub index: u64,
    /// The store-assigned timestamp, Unix milliseconds.
    pub timestamp: i64,
}

/// Serializes appends and keeps assigned timestamps non-decreasing.
struct WriteCursor {
    last_timestamp: i64,
}

impl WriteCursor {
    fn next_timestamp(&mut self, now: i64) -> i64 {
        let ts = now.max(self.last_timestamp);
        self.last_timestamp = ts;
        ts
    }
}

/// The main Ledger struct.
///
/// Provides a unified API for:
/// - Appending encrypted records
/// - Granting decryption capabilities at write time
/// - Reading records and counts back
/// - Observing appends as they happen
pub struct Ledger<S: RecordStore> {
    /// The identity keypair of the ledger itself.
    keypair: IdentityKeypair,
    /// The storage backend.
    store: Arc<S>,
    /// Capability grants, shared with the encryption scheme.
    registry: Arc<CapabilityRegistry>,
    /// The encryption scheme values pass through.
    scheme: Arc<dyn EncryptionScheme>,
    /// The context all of this ledger's values belong to.
    context: ContextId,
    /// Append serialization and timestamp ordering.
    write_lock: Mutex<WriteCursor>,
}

impl<S: RecordStore> Ledger<S> {
    /// Create a new ledger instance.
    ///
    /// The registry must be the same one the encryption scheme consults,
    /// and the scheme must serve the context this ledger derives from its
    /// keypair and `config.context_label`; otherwise grants recorded here
    /// are invisible to resolution.
    pub fn new(
        keypair: IdentityKeypair,
        store: S,
        registry: Arc<CapabilityRegistry>,
        scheme: Arc<dyn EncryptionScheme>,
        config: LedgerConfig,
    ) -> Self {
        let context = ContextId::derive(&keypair.principal(), &config.context_label);
        Self {
            keypair,
            store: Arc::new(store),
            registry,
            scheme,
            context,
            write_lock: Mutex::new(WriteCursor { last_timestamp: 0 }),
        }
    }

    /// The ledger's own principal: the store identity grants are issued to.
    pub fn principal(&self) -> Principal {
        self.keypair.principal()
    }

    /// The context id this ledger's values belong to.
    pub fn context_id(&self) -> &ContextId {
        &self.context
    }

    /// Get the store reference.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Get the capability registry.
    pub fn capabilities(&self) -> &CapabilityRegistry {
        &self.registry
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Write Path
    // ─────────────────────────────────────────────────────────────────────────

    /// Append a record for `owner`.
    ///
    /// Runs the four-step write path: validate the item label, encrypt the
    /// three values under the owner's proof, grant decryption capabilities
    /// to the ledger and the owner, then append. The steps are atomic as
    /// observed from outside: a failure at any step leaves counts, indices,
    /// and resolvable grants exactly as they were. A proof that does not
    /// cover the submitted values surfaces as
    /// [`AuthzError::InvalidProof`](sealbook_authz::AuthzError::InvalidProof)
    /// unchanged.
    pub async fn add_record(
        &self,
        owner: &Principal,
        item: &str,
        values: &RecordValues,
        proof: &EncryptionProof,
    ) -> Result<AppendReceipt> {
        // Step 1: reject bad labels before touching any state.
        validate_item(item)?;

        // One append at a time; the cursor also keeps timestamps ordered.
        let mut cursor = self.write_lock.lock().await;

        // Step 2: encrypt all three values.
        let [user_raw, quantity_raw, amount_raw] = values.as_raw_values();
        let handles = HandleTriple {
            user_id: self.encrypt(owner, user_raw, proof).await?,
            quantity: self.encrypt(owner, quantity_raw, proof).await?,
            amount: self.encrypt(owner, amount_raw, proof).await?,
        };

        // Step 3: grant capabilities to the ledger and the owner, tracking
        // which pairs are new so a failed append can unwind exactly those.
        let mut granted: Vec<(CiphertextHandle, Principal)> = Vec::with_capacity(6);
        for handle in handles.iter() {
            for principal in [self.principal(), *owner] {
                if self.registry.grant(*handle, principal) == GrantOutcome::Granted {
                    granted.push((*handle, principal));
                }
            }
        }

        // Step 4: append. The store assigns the index; we assign the time.
        let timestamp = cursor.next_timestamp(now_millis());
        let index = match self.store.append(owner, item, handles, timestamp).await {
            Ok(index) => index,
            Err(e) => {
                for (handle, principal) in &granted {
                    self.registry.retract(handle, principal);
                }
                return Err(e.into());
            }
        };

        tracing::debug!("record appended for {} at index {}", owner, index);
        Ok(AppendReceipt {
            owner: *owner,
            index,
            timestamp,
        })
    }

    async fn encrypt(
        &self,
        owner: &Principal,
        value: RawValue,
        proof: &EncryptionProof,
    ) -> Result<CiphertextHandle> {
        Ok(self
            .scheme
            .from_external(owner, &self.context, value, proof)
            .await?)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Read Path
    // ─────────────────────────────────────────────────────────────────────────

    /// Number of records stored for `owner`. Unknown owners answer zero.
    pub async fn get_record_count(&self, owner: &Principal) -> Result<u64> {
        Ok(self.store.count(owner).await?)
    }

    /// Fetch the record at `index` in `owner`'s sequence.
    pub async fn get_record(&self, owner: &Principal, index: u64) -> Result<Record> {
        Ok(self.store.get(owner, index).await?)
    }

    /// The owner's most recent records, highest index first.
    ///
    /// Returns at most `max_count` records, capped at [`MAX_LIST_RECENT`]
    /// regardless of what the caller asks for.
    pub async fn list_recent(&self, owner: &Principal, max_count: usize) -> Result<Vec<Record>> {
        let limit = max_count.min(MAX_LIST_RECENT);
        Ok(self.store.list_recent(owner, limit).await?)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Notifications
    // ─────────────────────────────────────────────────────────────────────────

    /// Subscribe to append notifications.
    ///
    /// Exactly one [`RecordAppended`] is sent per successful append, after
    /// the record is durable. Failed appends send nothing.
    pub fn subscribe(&self) -> broadcast::Receiver<RecordAppended> {
        self.store.subscribe()
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Capability Maintenance
    // ─────────────────────────────────────────────────────────────────────────

    /// Re-grant capabilities for every record the store holds.
    ///
    /// The registry is in-memory, so after reopening a durable store the
    /// grants must be replayed before anything can resolve again. Also
    /// lifts the write cursor past the newest stored timestamp, so records
    /// appended after a restart keep the non-decreasing timestamp order.
    ///
    /// Returns the number of (handle, principal) pairs newly granted.
    pub async fn rebuild_capabilities(&self) -> Result<usize> {
        let mut newly_granted = 0;
        let mut newest_timestamp = 0i64;

        for owner in self.store.owners().await? {
            let count = self.store.count(&owner).await?;
            for index in 0..count {
                let record = self.store.get(&owner, index).await?;
                for handle in record.handles.iter() {
                    for principal in [self.principal(), owner] {
                        if self.registry.grant(*handle, principal) == GrantOutcome::Granted {
                            newly_granted += 1;
                        }
                    }
                }
                newest_timestamp = newest_timestamp.max(record.timestamp);
            }
        }

        let mut cursor = self.write_lock.lock().await;
        cursor.last_timestamp = cursor.last_timestamp.max(newest_timestamp);

        tracing::debug!("capability rebuild granted {} pairs", newly_granted);
        Ok(newly_granted)
    }
}

/// Get current time in milliseconds.
fn now_millis() -> i64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}
