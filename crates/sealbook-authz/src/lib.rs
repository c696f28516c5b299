//! # Sealbook Authz
//!
//! The decryption authorization protocol: how a principal turns opaque
//! ciphertext handles back into values it is permitted to see.
//!
//! A reader never decrypts directly. It opens a [`DecryptionSession`],
//! which generates a fresh X25519 keypair for that session alone, then
//! constructs an [`AuthorizationMessage`] binding the session public key
//! to a set of context ids and a validity window. The principal's identity
//! key signs the message (via an [`AuthorizationSigner`], so the private
//! key can live in external custody), and the signed request with its
//! (handle, context) pairs goes to an [`EncryptionScheme`].
//!
//! The reference scheme, [`DecryptionOracle`], checks the window and the
//! signature, then checks every pair against the capability registry.
//! Resolution is all-or-nothing: one unauthorized pair fails the whole
//! batch. On success the plaintexts come back sealed to the session public
//! key, so only the holder of this session's secret can open them; on
//! failure the caller sees a single opaque denial with no reason attached.
//!
//! Values enter the scheme through [`EncryptionProof`]s: an owner attests
//! the values it is submitting, and the scheme refuses anything the proof
//! does not cover.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use sealbook_authz::{AuthorizationSigner, DecryptionOracle, DecryptionSession, LocalSigner};
//! use sealbook_core::{ContextId, IdentityKeypair};
//!
//! # async fn example(
//! #     oracle: DecryptionOracle,
//! #     context: ContextId,
//! #     handles: Vec<sealbook_core::CiphertextHandle>,
//! # ) -> Result<(), sealbook_authz::AuthzError> {
//! let keypair = IdentityKeypair::generate();
//! let signer = LocalSigner::new(keypair);
//!
//! let mut session = DecryptionSession::new(signer.principal(), context, handles);
//! session.generate_keypair()?;
//! session.construct_message(now_millis(), 60_000)?;
//! session.sign(&signer).await?;
//! let values = session.submit(&oracle).await?;
//! # Ok(())
//! # }
//! # fn now_millis() -> i64 { 0 }
//! ```

pub mod canonical;
pub mod crypto;
pub mod error;
pub mod message;
pub mod oracle;
pub mod proof;
pub mod session;

pub use crypto::{EncryptionKey, EncryptionNonce, SessionPublicKey, SessionSecret};
pub use error::{AuthzError, Result};
pub use message::{
    limits, AuthorizationMessage, HandleContextPair, ResolutionRequest, ResolutionResponse,
    ResolvedValues,
};
pub use oracle::{DecryptionOracle, EncryptionScheme};
pub use proof::{EncryptionProof, RawValue, ValueCommitment};
pub use session::{AuthorizationSigner, DecryptionSession, LocalSigner, SessionPhase};
