//! The capability grant registry.
//!
//! The registry is a set of (handle, principal) pairs. A pair being present
//! means the principal is permitted to request decryption of the handle.
//! Grants accumulate monotonically: there is no revocation operation, and
//! granting an already-granted pair is a no-op rather than an error.

use std::collections::{HashMap, HashSet};
use std::sync::RwLock;

use sealbook_core::{CiphertextHandle, Principal};

/// Outcome of a [`CapabilityRegistry::grant`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GrantOutcome {
    /// The pair was newly recorded.
    Granted,
    /// The pair was already present. Not an error.
    AlreadyGranted,
}

/// In-memory set of (handle, principal) capability grants.
///
/// Safe to share behind an `Arc`: all methods take `&self` and synchronize
/// internally.
pub struct CapabilityRegistry {
    inner: RwLock<RegistryInner>,
}

struct RegistryInner {
    /// Principals permitted to decrypt each handle.
    permits: HashMap<CiphertextHandle, HashSet<Principal>>,
    /// Total number of (handle, principal) pairs across all handles.
    pair_count: usize,
}

impl CapabilityRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(RegistryInner {
                permits: HashMap::new(),
                pair_count: 0,
            }),
        }
    }

    /// Record that `principal` may decrypt `handle`.
    ///
    /// Idempotent: granting a pair that is already present returns
    /// [`GrantOutcome::AlreadyGranted`] and changes nothing.
    pub fn grant(&self, handle: CiphertextHandle, principal: Principal) -> GrantOutcome {
        let mut inner = self.inner.write().unwrap();
        if inner.permits.entry(handle).or_default().insert(principal) {
            inner.pair_count += 1;
            GrantOutcome::Granted
        } else {
            GrantOutcome::AlreadyGranted
        }
    }

    /// Whether `principal` is permitted to decrypt `handle`.
    ///
    /// Unknown handles and unknown principals both answer `false`.
    pub fn is_granted(&self, handle: &CiphertextHandle, principal: &Principal) -> bool {
        let inner = self.inner.read().unwrap();
        inner
            .permits
            .get(handle)
            .is_some_and(|principals| principals.contains(principal))
    }

    /// Remove a pair recorded by an append that did not commit.
    ///
    /// This exists solely so the write path can unwind grants when the
    /// storage append fails after step three. It is not a revocation
    /// mechanism: nothing else in the system removes grants, and the pair
    /// must have been added by the same failed append being unwound.
    pub fn retract(&self, handle: &CiphertextHandle, principal: &Principal) -> bool {
        let mut inner = self.inner.write().unwrap();
        let Some(principals) = inner.permits.get_mut(handle) else {
            return false;
        };
        let removed = principals.remove(principal);
        if principals.is_empty() {
            inner.permits.remove(handle);
        }
        if removed {
            inner.pair_count -= 1;
        }
        removed
    }

    /// Total number of (handle, principal) pairs.
    pub fn pair_count(&self) -> usize {
        self.inner.read().unwrap().pair_count
    }

    /// Number of distinct handles with at least one grant.
    pub fn handle_count(&self) -> usize {
        self.inner.read().unwrap().permits.len()
    }

    /// The principals permitted to decrypt `handle`, in no particular order.
    pub fn principals_for(&self, handle: &CiphertextHandle) -> Vec<Principal> {
        let inner = self.inner.read().unwrap();
        inner
            .permits
            .get(handle)
            .map(|principals| principals.iter().copied().collect())
            .unwrap_or_default()
    }
}

impl Default for CapabilityRegistry {
    fn default() -> Self {
        Self::new()
    }
}
