//! Session key agreement and response sealing.
//!
//! Resolved plaintexts travel from the oracle to the requesting client
//! sealed under a key only the client's ephemeral session secret can
//! recover: X25519 key agreement, a Blake3 key derivation bound to the
//! context, then ChaCha20-Poly1305.

use std::fmt;

use chacha20poly1305::aead::{Aead, KeyInit};
use chacha20poly1305::{ChaCha20Poly1305, Nonce};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use x25519_dalek::{EphemeralSecret, PublicKey, StaticSecret};

use crate::error::AuthzError;

/// Key derivation domain for sealing keys.
const SEALING_KDF_DOMAIN: &str = "sealbook-authz-v0-sealing";

/// An X25519 public key (32 bytes) used in the authorization exchange.
///
/// Both sides of the protocol use this type: the client's session public
/// key travels in the signed authorization message, and the oracle's
/// per-response public key travels in the sealed response.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionPublicKey(pub [u8; 32]);

impl SessionPublicKey {
    /// Create from raw bytes.
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// The raw key bytes.
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Hex encoding of the key bytes.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    fn to_dalek(self) -> PublicKey {
        PublicKey::from(self.0)
    }
}

impl From<PublicKey> for SessionPublicKey {
    fn from(key: PublicKey) -> Self {
        Self(key.to_bytes())
    }
}

impl fmt::Debug for SessionPublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SessionPublicKey({})", &self.to_hex()[..16])
    }
}

/// The client's per-session X25519 secret.
///
/// Generated fresh for each decryption session and discarded when the
/// session reaches a terminal phase. Within the session it can perform any
/// number of exchanges, which is what lets the client unseal the response
/// after the request round-trip.
pub struct SessionSecret(StaticSecret);

impl SessionSecret {
    /// Generate a random secret.
    pub fn generate() -> Self {
        let mut rng = rand::thread_rng();
        let mut bytes = [0u8; 32];
        rng.fill_bytes(&mut bytes);
        Self(StaticSecret::from(bytes))
    }

    /// Deterministic secret from raw bytes.
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(StaticSecret::from(bytes))
    }

    /// The matching public key.
    pub fn public_key(&self) -> SessionPublicKey {
        SessionPublicKey(PublicKey::from(&self.0).to_bytes())
    }

    /// Diffie-Hellman exchange with a peer public key.
    pub fn diffie_hellman(&self, peer: &SessionPublicKey) -> SharedKey {
        SharedKey(*self.0.diffie_hellman(&peer.to_dalek()).as_bytes())
    }
}

impl fmt::Debug for SessionSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SessionSecret({:?})", self.public_key())
    }
}

/// The raw output of an X25519 exchange. Not used directly as a cipher key.
pub struct SharedKey([u8; 32]);

impl SharedKey {
    /// Derive the sealing key for this exchange, bound to `context`.
    pub fn derive_sealing_key(&self, context: &[u8]) -> EncryptionKey {
        let mut hasher = blake3::Hasher::new_derive_key(SEALING_KDF_DOMAIN);
        hasher.update(&self.0);
        hasher.update(context);
        EncryptionKey(*hasher.finalize().as_bytes())
    }
}

/// A ChaCha20-Poly1305 key (32 bytes).
pub struct EncryptionKey([u8; 32]);

impl EncryptionKey {
    /// Generate a random key.
    pub fn generate() -> Self {
        let mut rng = rand::thread_rng();
        let mut bytes = [0u8; 32];
        rng.fill_bytes(&mut bytes);
        Self(bytes)
    }

    /// Create from raw bytes.
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Encrypt `plaintext` under this key with `nonce`.
    ///
    /// The returned ciphertext includes the Poly1305 tag.
    pub fn encrypt(&self, plaintext: &[u8], nonce: &EncryptionNonce) -> Result<Vec<u8>, AuthzError> {
        let cipher = ChaCha20Poly1305::new_from_slice(&self.0)
            .map_err(|e| AuthzError::EncryptionError(e.to_string()))?;
        cipher
            .encrypt(Nonce::from_slice(&nonce.0), plaintext)
            .map_err(|e| AuthzError::EncryptionError(e.to_string()))
    }

    /// Decrypt `ciphertext` under this key with `nonce`.
    ///
    /// Fails when the key is wrong or the ciphertext was modified.
    pub fn decrypt(&self, ciphertext: &[u8], nonce: &EncryptionNonce) -> Result<Vec<u8>, AuthzError> {
        let cipher = ChaCha20Poly1305::new_from_slice(&self.0)
            .map_err(|e| AuthzError::DecryptionError(e.to_string()))?;
        cipher
            .decrypt(Nonce::from_slice(&nonce.0), ciphertext)
            .map_err(|e| AuthzError::DecryptionError(e.to_string()))
    }
}

impl fmt::Debug for EncryptionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Never print key material.
        write!(f, "EncryptionKey(..)")
    }
}

/// A ChaCha20-Poly1305 nonce (12 bytes). Fresh for every encryption.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptionNonce(pub [u8; 12]);

impl EncryptionNonce {
    /// Generate a random nonce.
    pub fn generate() -> Self {
        let mut rng = rand::thread_rng();
        let mut bytes = [0u8; 12];
        rng.fill_bytes(&mut bytes);
        Self(bytes)
    }

    /// Create from raw bytes.
    pub const fn from_bytes(bytes: [u8; 12]) -> Self {
        Self(bytes)
    }

    /// The raw nonce bytes.
    pub const fn as_bytes(&self) -> &[u8; 12] {
        &self.0
    }
}

/// An ephemeral X25519 keypair, consumed by its single exchange.
///
/// The oracle generates one per response; the type system enforces that the
/// secret cannot outlive the exchange.
pub struct EphemeralKeyPair {
    secret: EphemeralSecret,
    public: SessionPublicKey,
}

impl EphemeralKeyPair {
    /// Generate a fresh keypair.
    pub fn generate() -> Self {
        let secret = EphemeralSecret::random_from_rng(rand::thread_rng());
        let public = SessionPublicKey(PublicKey::from(&secret).to_bytes());
        Self { secret, public }
    }

    /// The public half, safe to transmit.
    pub fn public_key(&self) -> SessionPublicKey {
        self.public
    }

    /// Diffie-Hellman exchange with a peer public key, consuming the pair.
    pub fn diffie_hellman(self, peer: &SessionPublicKey) -> SharedKey {
        SharedKey(*self.secret.diffie_hellman(&peer.to_dalek()).as_bytes())
    }
}
