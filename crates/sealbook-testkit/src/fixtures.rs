//! Test fixtures and helpers.
//!
//! Common setup code for integration tests: a fully wired ledger over an
//! in-memory store, with the oracle and registry already agreeing on one
//! context.

use std::sync::Arc;

use sealbook::{AppendReceipt, Ledger, LedgerConfig, LedgerError, RecordValues};
use sealbook_acl::CapabilityRegistry;
use sealbook_authz::{
    AuthzError, DecryptionOracle, DecryptionSession, EncryptionProof, LocalSigner, ResolvedValues,
};
use sealbook_core::{CiphertextHandle, ContextId, IdentityKeypair};
use sealbook_store::MemoryStore;

/// A fully wired test ledger.
///
/// Records appended through [`TestBench::add`] are immediately resolvable
/// through [`TestBench::resolve_all`]: the bench attests proofs itself and
/// the oracle shares the ledger's registry and context.
pub struct TestBench {
    /// The ledger's own identity.
    pub keypair: IdentityKeypair,
    pub ledger: Ledger<MemoryStore>,
    pub registry: Arc<CapabilityRegistry>,
    pub oracle: Arc<DecryptionOracle>,
    pub context: ContextId,
}

impl TestBench {
    /// Create a bench with a random ledger identity.
    pub fn new() -> Self {
        Self::with_seed(rand::random())
    }

    /// Create with a deterministic ledger identity from a seed.
    pub fn with_seed(seed: [u8; 32]) -> Self {
        let keypair = IdentityKeypair::from_seed(&seed);
        let registry = Arc::new(CapabilityRegistry::new());
        let config = LedgerConfig::default();
        let context = ContextId::derive(&keypair.principal(), &config.context_label);
        let oracle = Arc::new(DecryptionOracle::new(context, Arc::clone(&registry)));
        let scheme = Arc::clone(&oracle);
        let ledger = Ledger::new(
            keypair.clone(),
            MemoryStore::new(),
            Arc::clone(&registry),
            scheme,
            config,
        );
        Self {
            keypair,
            ledger,
            registry,
            oracle,
            context,
        }
    }

    /// Append a record for `owner`, attesting the proof on their behalf.
    pub async fn add(
        &self,
        owner: &IdentityKeypair,
        item: &str,
        values: RecordValues,
    ) -> Result<AppendReceipt, LedgerError> {
        let proof = EncryptionProof::attest(owner, &self.context, &values.as_raw_values());
        self.ledger
            .add_record(&owner.principal(), item, &values, &proof)
            .await
    }

    /// Resolve `handles` as `owner` by driving a full decryption session.
    pub async fn resolve_all(
        &self,
        owner: &IdentityKeypair,
        handles: Vec<CiphertextHandle>,
    ) -> Result<ResolvedValues, AuthzError> {
        let signer = LocalSigner::new(owner.clone());
        let mut session = DecryptionSession::new(owner.principal(), self.context, handles);
        session.generate_keypair()?;
        session.construct_message(now_millis() - 1_000, 60_000)?;
        session.sign(&signer).await?;
        session.submit(self.oracle.as_ref()).await
    }
}

impl Default for TestBench {
    fn default() -> Self {
        Self::new()
    }
}

/// Deterministic keypair for the numbered test party.
pub fn party(index: u8) -> IdentityKeypair {
    let mut seed = [0u8; 32];
    seed[0] = index;
    IdentityKeypair::from_seed(&seed)
}

/// Get current time in milliseconds.
fn now_millis() -> i64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}
