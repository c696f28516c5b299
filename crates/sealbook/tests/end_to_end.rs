//! End-to-end tests driving the full write and read paths through the
//! public `sealbook` API: ledger, store, registry, oracle, and sessions
//! wired together the way an application would wire them.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::broadcast;

use sealbook::authz::{
    AuthorizationSigner, AuthzError, DecryptionOracle, DecryptionSession, EncryptionProof,
    LocalSigner, ResolvedValues,
};
use sealbook::core::{ContextId, CoreError, HandleTriple, IdentityKeypair, Principal, Record};
use sealbook::store::{MemoryStore, RecordStore, SqliteStore, StoreError};
use sealbook::{
    CapabilityRegistry, CiphertextHandle, Ledger, LedgerConfig, LedgerError, RecordAppended,
    RecordValues, MAX_LIST_RECENT,
};

const LEDGER_SEED: [u8; 32] = [7u8; 32];

struct TestLedger {
    ledger: Ledger<MemoryStore>,
    oracle: Arc<DecryptionOracle>,
    registry: Arc<CapabilityRegistry>,
    context: ContextId,
}

fn setup() -> TestLedger {
    let keypair = IdentityKeypair::from_seed(&LEDGER_SEED);
    let registry = Arc::new(CapabilityRegistry::new());
    let config = LedgerConfig::default();
    let context = ContextId::derive(&keypair.principal(), &config.context_label);
    let oracle = Arc::new(DecryptionOracle::new(context, Arc::clone(&registry)));
    let scheme = Arc::clone(&oracle);
    let ledger = Ledger::new(
        keypair,
        MemoryStore::new(),
        Arc::clone(&registry),
        scheme,
        config,
    );
    TestLedger {
        ledger,
        oracle,
        registry,
        context,
    }
}

fn alice() -> IdentityKeypair {
    IdentityKeypair::from_seed(&[1u8; 32])
}

fn bob() -> IdentityKeypair {
    IdentityKeypair::from_seed(&[2u8; 32])
}

fn values() -> RecordValues {
    RecordValues {
        user_id: 1001,
        quantity: 2,
        amount: 700,
    }
}

fn proof_for(owner: &IdentityKeypair, context: &ContextId, values: &RecordValues) -> EncryptionProof {
    EncryptionProof::attest(owner, context, &values.as_raw_values())
}

/// Drive a full decryption session for `handles` as `signer`.
async fn resolve_as(
    oracle: &DecryptionOracle,
    signer: &LocalSigner,
    context: ContextId,
    handles: Vec<CiphertextHandle>,
) -> Result<ResolvedValues, AuthzError> {
    let mut session = DecryptionSession::new(signer.principal(), context, handles);
    session.generate_keypair()?;
    session.construct_message(now_millis() - 1_000, 60_000)?;
    session.sign(signer).await?;
    session.submit(oracle).await
}

fn now_millis() -> i64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}

#[tokio::test]
async fn test_write_then_authorized_read_roundtrip() {
    let t = setup();
    let alice = alice();
    let proof = proof_for(&alice, &t.context, &values());

    let receipt = t
        .ledger
        .add_record(&alice.principal(), "Coffee", &values(), &proof)
        .await
        .unwrap();
    assert_eq!(receipt.owner, alice.principal());
    assert_eq!(receipt.index, 0);

    let record = t.ledger.get_record(&alice.principal(), 0).await.unwrap();
    assert_eq!(record.item, "Coffee");
    assert_eq!(record.timestamp, receipt.timestamp);

    // The owner resolves all three handles back to the submitted values.
    let signer = LocalSigner::new(alice);
    let resolved = resolve_as(
        &t.oracle,
        &signer,
        t.context,
        vec![
            record.handles.user_id,
            record.handles.quantity,
            record.handles.amount,
        ],
    )
    .await
    .unwrap();
    assert_eq!(resolved.get_u32(&record.handles.user_id), Some(1001));
    assert_eq!(resolved.get_u32(&record.handles.quantity), Some(2));
    assert_eq!(resolved.get_u64(&record.handles.amount), Some(700));
}

#[tokio::test]
async fn test_ledger_identity_can_also_resolve() {
    let t = setup();
    let alice = alice();
    let proof = proof_for(&alice, &t.context, &values());
    t.ledger
        .add_record(&alice.principal(), "Coffee", &values(), &proof)
        .await
        .unwrap();
    let record = t.ledger.get_record(&alice.principal(), 0).await.unwrap();

    // Write-time grants cover the ledger identity as well as the owner.
    let signer = LocalSigner::new(IdentityKeypair::from_seed(&LEDGER_SEED));
    let resolved = resolve_as(&t.oracle, &signer, t.context, vec![record.handles.user_id])
        .await
        .unwrap();
    assert_eq!(resolved.get_u32(&record.handles.user_id), Some(1001));
}

#[tokio::test]
async fn test_other_principals_are_denied() {
    // One test wires up debug logging so denial reasons land in the log.
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();

    let t = setup();
    let alice = alice();
    let proof = proof_for(&alice, &t.context, &values());
    t.ledger
        .add_record(&alice.principal(), "Coffee", &values(), &proof)
        .await
        .unwrap();
    let record = t.ledger.get_record(&alice.principal(), 0).await.unwrap();

    // Bob signs a perfectly valid authorization, but holds no grant.
    let signer = LocalSigner::new(bob());
    let err = resolve_as(&t.oracle, &signer, t.context, vec![record.handles.user_id])
        .await
        .unwrap_err();
    assert!(matches!(err, AuthzError::ResolutionDenied));
}

#[tokio::test]
async fn test_expired_authorization_is_denied() {
    let t = setup();
    let alice = alice();
    let proof = proof_for(&alice, &t.context, &values());
    t.ledger
        .add_record(&alice.principal(), "Coffee", &values(), &proof)
        .await
        .unwrap();
    let record = t.ledger.get_record(&alice.principal(), 0).await.unwrap();

    let signer = LocalSigner::new(alice);
    let mut session = DecryptionSession::new(
        signer.principal(),
        t.context,
        vec![record.handles.user_id],
    );
    session.generate_keypair().unwrap();
    // A 1-second window that closed 9 seconds ago.
    session
        .construct_message(now_millis() - 10_000, 1_000)
        .unwrap();
    session.sign(&signer).await.unwrap();
    let err = session.submit(t.oracle.as_ref()).await.unwrap_err();
    assert!(matches!(err, AuthzError::ResolutionDenied));
}

#[tokio::test]
async fn test_invalid_item_fails_before_any_state_change() {
    let t = setup();
    let alice = alice();
    let proof = proof_for(&alice, &t.context, &values());

    for item in ["", &"x".repeat(65)] {
        let err = t
            .ledger
            .add_record(&alice.principal(), item, &values(), &proof)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            LedgerError::Record(CoreError::InvalidItem { .. })
        ));
    }

    assert_eq!(
        t.ledger.get_record_count(&alice.principal()).await.unwrap(),
        0
    );
    assert_eq!(t.registry.pair_count(), 0);
    assert_eq!(t.oracle.vault_len(), 0);
}

#[tokio::test]
async fn test_invalid_proof_fails_atomically() {
    let t = setup();
    let alice = alice();

    // The proof attests different values than the ones submitted.
    let other = RecordValues {
        user_id: 9,
        quantity: 9,
        amount: 9,
    };
    let proof = proof_for(&alice, &t.context, &other);

    let err = t
        .ledger
        .add_record(&alice.principal(), "Coffee", &values(), &proof)
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::Authz(AuthzError::InvalidProof)));

    assert_eq!(
        t.ledger.get_record_count(&alice.principal()).await.unwrap(),
        0
    );
    assert_eq!(t.registry.pair_count(), 0);
}

#[tokio::test]
async fn test_proof_from_another_identity_is_rejected() {
    let t = setup();
    let alice = alice();

    // Bob attests the values, but the record claims alice as owner.
    let proof = proof_for(&bob(), &t.context, &values());
    let err = t
        .ledger
        .add_record(&alice.principal(), "Coffee", &values(), &proof)
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::Authz(AuthzError::InvalidProof)));
}

#[tokio::test]
async fn test_owners_keep_independent_dense_indices() {
    let t = setup();
    let alice = alice();
    let bob = bob();
    let alice_proof = proof_for(&alice, &t.context, &values());
    let bob_proof = proof_for(&bob, &t.context, &values());

    let a0 = t
        .ledger
        .add_record(&alice.principal(), "a0", &values(), &alice_proof)
        .await
        .unwrap();
    let b0 = t
        .ledger
        .add_record(&bob.principal(), "b0", &values(), &bob_proof)
        .await
        .unwrap();
    let a1 = t
        .ledger
        .add_record(&alice.principal(), "a1", &values(), &alice_proof)
        .await
        .unwrap();

    assert_eq!((a0.index, b0.index, a1.index), (0, 0, 1));
    assert_eq!(
        t.ledger.get_record_count(&alice.principal()).await.unwrap(),
        2
    );
    assert_eq!(t.ledger.get_record_count(&bob.principal()).await.unwrap(), 1);
    assert_eq!(
        t.ledger
            .get_record(&bob.principal(), 0)
            .await
            .unwrap()
            .item,
        "b0"
    );
}

#[tokio::test]
async fn test_get_record_invalid_index() {
    let t = setup();
    let alice = alice();
    let proof = proof_for(&alice, &t.context, &values());
    t.ledger
        .add_record(&alice.principal(), "only", &values(), &proof)
        .await
        .unwrap();

    match t.ledger.get_record(&alice.principal(), 3).await {
        Err(LedgerError::Store(StoreError::InvalidIndex { index, count })) => {
            assert_eq!(index, 3);
            assert_eq!(count, 1);
        }
        other => panic!("unexpected: {:?}", other),
    }
}

#[tokio::test]
async fn test_list_recent_orders_and_caps() {
    let t = setup();
    let alice = alice();
    let proof = proof_for(&alice, &t.context, &values());

    for i in 0..5 {
        t.ledger
            .add_record(&alice.principal(), &format!("item-{}", i), &values(), &proof)
            .await
            .unwrap();
    }

    let recent = t.ledger.list_recent(&alice.principal(), 3).await.unwrap();
    let indices: Vec<u64> = recent.iter().map(|r| r.index).collect();
    assert_eq!(indices, vec![4, 3, 2]);

    // Asking for more than exists returns everything, newest first.
    let all = t.ledger.list_recent(&alice.principal(), 100).await.unwrap();
    assert_eq!(all.len(), 5);
    assert_eq!(all[0].index, 4);

    // Zero means zero.
    assert!(t
        .ledger
        .list_recent(&alice.principal(), 0)
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn test_list_recent_enforces_protocol_cap() {
    let t = setup();
    let alice = alice();
    let proof = proof_for(&alice, &t.context, &values());

    for i in 0..(MAX_LIST_RECENT + 5) {
        t.ledger
            .add_record(&alice.principal(), &format!("item-{}", i), &values(), &proof)
            .await
            .unwrap();
    }

    let recent = t
        .ledger
        .list_recent(&alice.principal(), MAX_LIST_RECENT + 100)
        .await
        .unwrap();
    assert_eq!(recent.len(), MAX_LIST_RECENT);
    assert_eq!(recent[0].index, (MAX_LIST_RECENT + 4) as u64);
}

#[tokio::test]
async fn test_appends_notify_subscribers() {
    let t = setup();
    let mut rx = t.ledger.subscribe();
    let alice = alice();
    let proof = proof_for(&alice, &t.context, &values());

    let receipt = t
        .ledger
        .add_record(&alice.principal(), "Coffee", &values(), &proof)
        .await
        .unwrap();

    let event: RecordAppended = rx.recv().await.unwrap();
    assert_eq!(event.owner, alice.principal());
    assert_eq!(event.index, receipt.index);
    assert_eq!(event.item, "Coffee");
    assert_eq!(event.timestamp, receipt.timestamp);

    // A failed append sends nothing.
    let bad = proof_for(&alice, &t.context, &RecordValues {
        user_id: 0,
        quantity: 0,
        amount: 0,
    });
    let _ = t
        .ledger
        .add_record(&alice.principal(), "Coffee", &values(), &bad)
        .await;
    assert!(matches!(
        rx.try_recv(),
        Err(broadcast::error::TryRecvError::Empty)
    ));
}

/// Store wrapper whose next append fails once, to exercise grant unwind.
struct FailingStore {
    inner: MemoryStore,
    fail_next_append: AtomicBool,
}

#[async_trait]
impl RecordStore for FailingStore {
    async fn append(
        &self,
        owner: &Principal,
        item: &str,
        handles: HandleTriple,
        timestamp: i64,
    ) -> Result<u64, StoreError> {
        if self.fail_next_append.swap(false, Ordering::SeqCst) {
            return Err(StoreError::Io(std::io::Error::other(
                "synthetic append failure",
            )));
        }
        self.inner.append(owner, item, handles, timestamp).await
    }

    async fn count(&self, owner: &Principal) -> Result<u64, StoreError> {
        self.inner.count(owner).await
    }

    async fn get(&self, owner: &Principal, index: u64) -> Result<Record, StoreError> {
        self.inner.get(owner, index).await
    }

    async fn list_recent(&self, owner: &Principal, limit: usize) -> Result<Vec<Record>, StoreError> {
        self.inner.list_recent(owner, limit).await
    }

    async fn owners(&self) -> Result<Vec<Principal>, StoreError> {
        self.inner.owners().await
    }

    fn subscribe(&self) -> broadcast::Receiver<RecordAppended> {
        self.inner.subscribe()
    }
}

#[tokio::test]
async fn test_failed_append_retracts_write_time_grants() {
    let keypair = IdentityKeypair::from_seed(&LEDGER_SEED);
    let registry = Arc::new(CapabilityRegistry::new());
    let config = LedgerConfig::default();
    let context = ContextId::derive(&keypair.principal(), &config.context_label);
    let oracle = Arc::new(DecryptionOracle::new(context, Arc::clone(&registry)));
    let store = FailingStore {
        inner: MemoryStore::new(),
        fail_next_append: AtomicBool::new(true),
    };
    let ledger = Ledger::new(keypair, store, Arc::clone(&registry), oracle, config);

    let alice = alice();
    let proof = proof_for(&alice, &context, &values());

    let err = ledger
        .add_record(&alice.principal(), "Coffee", &values(), &proof)
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::Store(_)));

    // The grants made before the append were unwound with it.
    assert_eq!(registry.pair_count(), 0);
    assert_eq!(ledger.get_record_count(&alice.principal()).await.unwrap(), 0);

    // The next attempt succeeds and grants to ledger and owner.
    let receipt = ledger
        .add_record(&alice.principal(), "Coffee", &values(), &proof)
        .await
        .unwrap();
    assert_eq!(receipt.index, 0);
    assert_eq!(registry.pair_count(), 6);
}

#[tokio::test]
async fn test_sqlite_records_survive_restart_grants_do_not() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ledger.db");
    let alice = alice();

    {
        let keypair = IdentityKeypair::from_seed(&LEDGER_SEED);
        let registry = Arc::new(CapabilityRegistry::new());
        let config = LedgerConfig::default();
        let context = ContextId::derive(&keypair.principal(), &config.context_label);
        let oracle = Arc::new(DecryptionOracle::new(context, Arc::clone(&registry)));
        let store = SqliteStore::open(&path).unwrap();
        let ledger = Ledger::new(keypair, store, registry, oracle, config);

        let proof = proof_for(&alice, &context, &values());
        ledger
            .add_record(&alice.principal(), "Espresso", &values(), &proof)
            .await
            .unwrap();
        ledger
            .add_record(&alice.principal(), "Espresso", &values(), &proof)
            .await
            .unwrap();
    }

    // Same identity, fresh registry and oracle.
    let keypair = IdentityKeypair::from_seed(&LEDGER_SEED);
    let registry = Arc::new(CapabilityRegistry::new());
    let config = LedgerConfig::default();
    let context = ContextId::derive(&keypair.principal(), &config.context_label);
    let oracle = Arc::new(DecryptionOracle::new(context, Arc::clone(&registry)));
    let store = SqliteStore::open(&path).unwrap();
    let scheme = Arc::clone(&oracle);
    let ledger = Ledger::new(
        keypair,
        store,
        Arc::clone(&registry),
        scheme,
        config,
    );

    // Records survived; grants did not.
    assert_eq!(ledger.get_record_count(&alice.principal()).await.unwrap(), 2);
    let record = ledger.get_record(&alice.principal(), 1).await.unwrap();
    assert_eq!(record.item, "Espresso");
    assert_eq!(registry.pair_count(), 0);

    // Replaying grants: 2 records x 3 handles x 2 principals.
    assert_eq!(ledger.rebuild_capabilities().await.unwrap(), 12);
    assert_eq!(registry.pair_count(), 12);
    assert_eq!(ledger.rebuild_capabilities().await.unwrap(), 0);

    // The vault was ephemeral: even with grants replayed, the fresh oracle
    // holds no ciphertexts for pre-restart handles.
    let signer = LocalSigner::new(alice);
    let err = resolve_as(&oracle, &signer, context, vec![record.handles.user_id])
        .await
        .unwrap_err();
    assert!(matches!(err, AuthzError::ResolutionDenied));

    // New appends continue the dense sequence and resolve normally.
    let alice = IdentityKeypair::from_seed(&[1u8; 32]);
    let proof = proof_for(&alice, &context, &values());
    let receipt = ledger
        .add_record(&alice.principal(), "Espresso", &values(), &proof)
        .await
        .unwrap();
    assert_eq!(receipt.index, 2);

    let record = ledger.get_record(&alice.principal(), 2).await.unwrap();
    let signer = LocalSigner::new(alice);
    let resolved = resolve_as(&oracle, &signer, context, vec![record.handles.amount])
        .await
        .unwrap();
    assert_eq!(resolved.get_u64(&record.handles.amount), Some(700));
}

#[tokio::test]
async fn test_timestamps_never_decrease() {
    let t = setup();
    let alice = alice();
    let proof = proof_for(&alice, &t.context, &values());

    let mut last = 0i64;
    for i in 0..10 {
        let receipt = t
            .ledger
            .add_record(&alice.principal(), &format!("item-{}", i), &values(), &proof)
            .await
            .unwrap();
        assert!(receipt.timestamp >= last);
        last = receipt.timestamp;
    }
}
