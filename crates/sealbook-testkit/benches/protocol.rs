//! Microbenchmarks for the hot protocol paths: canonical signing bytes,
//! capability checks, and value commitments.

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use sealbook_acl::CapabilityRegistry;
use sealbook_authz::{AuthorizationMessage, RawValue, SessionSecret};
use sealbook_core::{CipherWidth, CiphertextHandle, ContextId, IdentityKeypair, Principal};

fn bench_signing_bytes(c: &mut Criterion) {
    let identity = IdentityKeypair::from_seed(&[1u8; 32]);
    let session = SessionSecret::from_bytes([2u8; 32]);
    let context = ContextId::derive(&identity.principal(), "records");
    let message = AuthorizationMessage {
        session_public_key: session.public_key(),
        context_ids: vec![context],
        issued_at: 1_736_870_400_000,
        duration_ms: 60_000,
    };

    c.bench_function("authorization_signing_bytes", |b| {
        b.iter(|| black_box(&message).signing_bytes())
    });
}

fn bench_sign_and_verify(c: &mut Criterion) {
    let identity = IdentityKeypair::from_seed(&[1u8; 32]);
    let session = SessionSecret::from_bytes([2u8; 32]);
    let context = ContextId::derive(&identity.principal(), "records");
    let message = AuthorizationMessage {
        session_public_key: session.public_key(),
        context_ids: vec![context],
        issued_at: 1_736_870_400_000,
        duration_ms: 60_000,
    };
    let bytes = message.signing_bytes();
    let signature = identity.sign(&bytes);

    c.bench_function("authorization_verify", |b| {
        b.iter(|| {
            identity
                .principal()
                .verify(black_box(&bytes), &signature)
                .unwrap()
        })
    });
}

fn bench_capability_check(c: &mut Criterion) {
    let registry = CapabilityRegistry::new();
    let principal = Principal::from_bytes([3u8; 32]);
    let mut handles = Vec::new();
    for i in 0..1024u32 {
        let handle = CiphertextHandle::derive(&i.to_le_bytes(), CipherWidth::U32);
        registry.grant(handle, principal);
        handles.push(handle);
    }

    c.bench_function("registry_is_granted", |b| {
        let mut i = 0;
        b.iter(|| {
            i = (i + 1) % handles.len();
            black_box(registry.is_granted(&handles[i], &principal))
        })
    });
}

fn bench_commitment(c: &mut Criterion) {
    let context = ContextId::from_bytes([4u8; 32]);
    c.bench_function("value_commitment", |b| {
        b.iter(|| RawValue::U64(black_box(700)).commitment(&context))
    });
}

criterion_group!(
    benches,
    bench_signing_bytes,
    bench_sign_and_verify,
    bench_capability_check,
    bench_commitment
);
criterion_main!(benches);
