//! Client-side decryption sessions.
//!
//! A session walks a fixed phase order: `Init`, `KeypairGenerated`,
//! `MessageConstructed`, `Signed`, `Submitted`, and then one of the two
//! terminal phases `Resolved` or `Rejected`. Calling an operation out of
//! order fails with a phase mismatch and changes nothing; once a session is
//! terminal it stays terminal and its ephemeral key material is gone.

use async_trait::async_trait;

use sealbook_core::{CiphertextHandle, ContextId, IdentityKeypair, IdentitySignature, Principal};

use crate::crypto::{SessionPublicKey, SessionSecret};
use crate::error::AuthzError;
use crate::message::{AuthorizationMessage, HandleContextPair, ResolutionRequest, ResolvedValues};
use crate::oracle::EncryptionScheme;

/// Phases of a decryption session, in protocol order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    /// Created; nothing generated yet.
    Init,
    /// The ephemeral session keypair exists.
    KeypairGenerated,
    /// The authorization message is built, awaiting a signature.
    MessageConstructed,
    /// The identity signature is attached.
    Signed,
    /// The request went to the oracle and no outcome arrived.
    Submitted,
    /// Terminal: values recovered.
    Resolved,
    /// Terminal: denied, refused, or aborted.
    Rejected,
}

impl SessionPhase {
    /// Whether the session can make no further progress.
    pub fn is_terminal(&self) -> bool {
        matches!(self, SessionPhase::Resolved | SessionPhase::Rejected)
    }
}

/// Produces identity signatures for one principal.
///
/// [`LocalSigner`] covers keys held in process; hardware tokens or remote
/// wallets implement the same trait. A signer is allowed to refuse, which
/// terminally rejects the session that asked.
#[async_trait]
pub trait AuthorizationSigner: Send + Sync {
    /// The principal whose signatures this signer produces.
    fn principal(&self) -> Principal;

    /// Sign `message` with the principal's identity key.
    async fn sign(&self, message: &[u8]) -> Result<IdentitySignature, AuthzError>;
}

/// A signer backed by an in-process identity keypair.
pub struct LocalSigner {
    keypair: IdentityKeypair,
}

impl LocalSigner {
    pub fn new(keypair: IdentityKeypair) -> Self {
        Self { keypair }
    }
}

#[async_trait]
impl AuthorizationSigner for LocalSigner {
    fn principal(&self) -> Principal {
        self.keypair.principal()
    }

    async fn sign(&self, message: &[u8]) -> Result<IdentitySignature, AuthzError> {
        Ok(self.keypair.sign(message))
    }
}

/// Session state, holding exactly the material each phase has produced.
#[derive(Debug)]
enum SessionState {
    Init,
    KeypairGenerated {
        secret: SessionSecret,
    },
    MessageConstructed {
        secret: SessionSecret,
        message: AuthorizationMessage,
    },
    Signed {
        secret: SessionSecret,
        message: AuthorizationMessage,
        signature: IdentitySignature,
    },
    Submitted,
    Resolved,
    Rejected,
}

impl SessionState {
    fn phase(&self) -> SessionPhase {
        match self {
            SessionState::Init => SessionPhase::Init,
            SessionState::KeypairGenerated { .. } => SessionPhase::KeypairGenerated,
            SessionState::MessageConstructed { .. } => SessionPhase::MessageConstructed,
            SessionState::Signed { .. } => SessionPhase::Signed,
            SessionState::Submitted => SessionPhase::Submitted,
            SessionState::Resolved => SessionPhase::Resolved,
            SessionState::Rejected => SessionPhase::Rejected,
        }
    }
}

/// A client-side decryption session for one batch of handles.
///
/// The session owns the ephemeral keypair and releases it on every exit
/// path: resolution, rejection, and abort all drop the secret.
#[derive(Debug)]
pub struct DecryptionSession {
    principal: Principal,
    context: ContextId,
    handles: Vec<CiphertextHandle>,
    state: SessionState,
}

impl DecryptionSession {
    /// Start a session for `principal` to resolve `handles` under `context`.
    pub fn new(principal: Principal, context: ContextId, handles: Vec<CiphertextHandle>) -> Self {
        Self {
            principal,
            context,
            handles,
            state: SessionState::Init,
        }
    }

    /// The current phase.
    pub fn phase(&self) -> SessionPhase {
        self.state.phase()
    }

    /// The principal this session authorizes for.
    pub fn principal(&self) -> &Principal {
        &self.principal
    }

    /// The context the batch belongs to.
    pub fn context(&self) -> &ContextId {
        &self.context
    }

    /// The handles this session will request.
    pub fn handles(&self) -> &[CiphertextHandle] {
        &self.handles
    }

    /// Take the state, leaving the terminal placeholder. Every path through
    /// a transition writes a real state back before returning.
    fn take_state(&mut self) -> SessionState {
        std::mem::replace(&mut self.state, SessionState::Rejected)
    }

    fn phase_mismatch(&mut self, expected: SessionPhase, state: SessionState) -> AuthzError {
        let actual = state.phase();
        self.state = state;
        AuthzError::PhaseMismatch { expected, actual }
    }

    /// Generate the ephemeral session keypair.
    ///
    /// `Init` to `KeypairGenerated`. Returns the public key the response
    /// will be sealed to.
    pub fn generate_keypair(&mut self) -> Result<SessionPublicKey, AuthzError> {
        match self.take_state() {
            SessionState::Init => {
                let secret = SessionSecret::generate();
                let public = secret.public_key();
                self.state = SessionState::KeypairGenerated { secret };
                Ok(public)
            }
            other => Err(self.phase_mismatch(SessionPhase::Init, other)),
        }
    }

    /// Build the authorization message for the validity window
    /// `[issued_at, issued_at + duration_ms)`.
    ///
    /// `KeypairGenerated` to `MessageConstructed`. The returned copy is what
    /// the signer will be shown.
    pub fn construct_message(
        &mut self,
        issued_at: i64,
        duration_ms: i64,
    ) -> Result<AuthorizationMessage, AuthzError> {
        match self.take_state() {
            SessionState::KeypairGenerated { secret } => {
                let message = AuthorizationMessage {
                    session_public_key: secret.public_key(),
                    context_ids: vec![self.context],
                    issued_at,
                    duration_ms,
                };
                self.state = SessionState::MessageConstructed {
                    secret,
                    message: message.clone(),
                };
                Ok(message)
            }
            other => Err(self.phase_mismatch(SessionPhase::KeypairGenerated, other)),
        }
    }

    /// Ask `signer` for the identity signature over the message.
    ///
    /// `MessageConstructed` to `Signed` on success. A signer failure is a
    /// refusal: the session terminally rejects and the error propagates.
    pub async fn sign(&mut self, signer: &dyn AuthorizationSigner) -> Result<(), AuthzError> {
        let (secret, message) = match self.take_state() {
            SessionState::MessageConstructed { secret, message } => (secret, message),
            other => return Err(self.phase_mismatch(SessionPhase::MessageConstructed, other)),
        };

        match signer.sign(&message.signing_bytes()).await {
            Ok(signature) => {
                self.state = SessionState::Signed {
                    secret,
                    message,
                    signature,
                };
                Ok(())
            }
            Err(e) => {
                // Refusal is terminal; the ephemeral secret dies here.
                self.state = SessionState::Rejected;
                Err(e)
            }
        }
    }

    /// Submit the batch to `scheme` and wait for the outcome.
    ///
    /// `Signed` to `Submitted`, then terminally to `Resolved` with the
    /// recovered values or `Rejected` with the oracle's opaque denial.
    /// Single-shot: after either outcome the session cannot be resubmitted.
    pub async fn submit(
        &mut self,
        scheme: &dyn EncryptionScheme,
    ) -> Result<ResolvedValues, AuthzError> {
        let (secret, message, signature) = match self.take_state() {
            SessionState::Signed {
                secret,
                message,
                signature,
            } => (secret, message, signature),
            other => return Err(self.phase_mismatch(SessionPhase::Signed, other)),
        };
        self.state = SessionState::Submitted;

        let request = ResolutionRequest {
            pairs: self
                .handles
                .iter()
                .map(|&handle| HandleContextPair {
                    handle,
                    context: self.context,
                })
                .collect(),
            principal: self.principal,
            message,
            signature,
        };

        let outcome = match scheme.resolve(request).await {
            Ok(response) => response.open(&secret, &self.context),
            Err(e) => Err(e),
        };

        match outcome {
            Ok(values) => {
                self.state = SessionState::Resolved;
                Ok(values)
            }
            Err(e) => {
                self.state = SessionState::Rejected;
                Err(e)
            }
        }
    }

    /// Abandon the session from any phase. Terminal; any ephemeral key
    /// material is dropped.
    pub fn abort(&mut self) {
        self.state = SessionState::Rejected;
    }
}
