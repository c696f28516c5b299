//! Proptest generators for property-based testing.

use proptest::prelude::*;

use sealbook::RecordValues;
use sealbook_authz::RawValue;
use sealbook_core::{CipherWidth, CiphertextHandle, ContextId, IdentityKeypair, Principal};

/// Generate a random identity keypair.
pub fn identity_keypair() -> impl Strategy<Value = IdentityKeypair> {
    any::<[u8; 32]>().prop_map(|seed| IdentityKeypair::from_seed(&seed))
}

/// Generate a random principal.
pub fn principal() -> impl Strategy<Value = Principal> {
    identity_keypair().prop_map(|kp| kp.principal())
}

/// Generate a random context id.
pub fn context_id() -> impl Strategy<Value = ContextId> {
    any::<[u8; 32]>().prop_map(ContextId::from_bytes)
}

/// Generate a cipher width.
pub fn cipher_width() -> impl Strategy<Value = CipherWidth> {
    prop_oneof![Just(CipherWidth::U32), Just(CipherWidth::U64)]
}

/// Generate a handle with a valid width tag.
pub fn ciphertext_handle() -> impl Strategy<Value = CiphertextHandle> {
    (prop::collection::vec(any::<u8>(), 1..64), cipher_width())
        .prop_map(|(ciphertext, width)| CiphertextHandle::derive(&ciphertext, width))
}

/// Generate a raw value of either width.
pub fn raw_value() -> impl Strategy<Value = RawValue> {
    prop_oneof![
        any::<u32>().prop_map(RawValue::U32),
        any::<u64>().prop_map(RawValue::U64),
    ]
}

/// Generate a valid item label: 1 to 64 bytes of printable ASCII.
pub fn item() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9 ]{1,64}".prop_map(String::from)
}

/// Generate record values.
pub fn record_values() -> impl Strategy<Value = RecordValues> {
    (any::<u32>(), any::<u32>(), any::<u64>()).prop_map(|(user_id, quantity, amount)| {
        RecordValues {
            user_id,
            quantity,
            amount,
        }
    })
}

/// Generate a reasonable timestamp.
pub fn timestamp() -> impl Strategy<Value = i64> {
    0i64..=i64::MAX / 2
}
