//! Authentication gate: suspends a decryption behind a user-presence
//! challenge and resumes it once.
//!
//! # States
//! - `Idle`: no challenge outstanding
//! - `AwaitingAuthentication`: one `PendingDecryption` captured, the
//!   authenticator has the prompt up
//!
//! Resolution (retry succeeded, retry failed, challenge aborted) always
//! clears the slot back to `Idle` before the caller is answered, so the
//! caller may start a new decryption from inside its continuation.
//!
//! While a challenge is outstanding, further requests that need
//! authentication are rejected with `AuthenticationInProgress`; the first
//! caller keeps its continuation.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

use crate::authenticator::{Authenticator, ChallengeId, ChallengeResponder, PromptInfo};
use crate::cipher::Cipher;
use crate::outcome::{DecryptionResult, PendingResult};
use credvault_common::{Error, Result};
use credvault_keystore::ManagedKey;

/// A decryption parked until its challenge resolves.
struct PendingDecryption {
    challenge: ChallengeId,
    sink: oneshot::Sender<Result<DecryptionResult>>,
    key: ManagedKey,
    encrypted_username: Vec<u8>,
    encrypted_password: Vec<u8>,
}

enum GateState {
    Idle,
    AwaitingAuthentication(PendingDecryption),
}

pub(crate) struct GateShared {
    state: Mutex<GateState>,
    authenticator: RwLock<Option<Arc<dyn Authenticator>>>,
    cipher: Cipher,
    prompt: PromptInfo,
}

impl GateShared {
    fn state(&self) -> MutexGuard<'_, GateState> {
        // Every transition is a single assignment, so a poisoned slot still
        // holds a consistent state.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Take the pending decryption if it belongs to `challenge`.
    fn take_pending(&self, challenge: ChallengeId) -> Option<PendingDecryption> {
        let mut state = self.state();
        let owned = matches!(
            &*state,
            GateState::AwaitingAuthentication(pending) if pending.challenge == challenge
        );
        if !owned {
            return None;
        }

        match std::mem::replace(&mut *state, GateState::Idle) {
            GateState::AwaitingAuthentication(pending) => Some(pending),
            GateState::Idle => None,
        }
    }

    /// `AwaitingAuthentication -> Resuming -> Resolved`.
    pub(crate) fn resume(&self, challenge: ChallengeId) {
        let Some(pending) = self.take_pending(challenge) else {
            debug!(challenge = %challenge, "Ignoring success for a challenge that is no longer pending");
            return;
        };

        let outcome = self
            .cipher
            .decrypt_credentials(
                &pending.key,
                &pending.encrypted_username,
                &pending.encrypted_password,
            )
            .map_err(|e| match e {
                // The authorization lapsed before the retry; never surface
                // the internal signal.
                Error::AuthenticationRequired(_) => Error::AuthenticationFailed(
                    "Authorization expired before the key could be used".to_string(),
                ),
                other => other,
            });

        match &outcome {
            Ok(_) => info!(challenge = %challenge, alias = %pending.key.alias(), "Decryption resumed after authentication"),
            Err(e) => warn!(challenge = %challenge, alias = %pending.key.alias(), error = %e, "Decryption failed after authentication"),
        }

        if pending.sink.send(outcome).is_err() {
            debug!(challenge = %challenge, "Caller stopped waiting for the result");
        }
    }

    /// `AwaitingAuthentication -> Aborted`.
    pub(crate) fn abort(&self, challenge: ChallengeId, message: String) {
        let Some(pending) = self.take_pending(challenge) else {
            debug!(challenge = %challenge, "Ignoring error for a challenge that is no longer pending");
            return;
        };

        info!(challenge = %challenge, alias = %pending.key.alias(), reason = %message, "Authentication aborted");
        let _ = pending.sink.send(Err(Error::AuthenticationFailed(message)));
    }
}

/// Single-slot state machine guarding authenticated decryptions.
pub struct AuthenticationGate {
    shared: Arc<GateShared>,
}

impl AuthenticationGate {
    /// Create an idle gate that retries decryptions with `cipher`.
    pub fn new(cipher: Cipher, prompt: PromptInfo) -> Self {
        Self {
            shared: Arc::new(GateShared {
                state: Mutex::new(GateState::Idle),
                authenticator: RwLock::new(None),
                cipher,
                prompt,
            }),
        }
    }

    /// Register the interactive context that runs challenges.
    pub fn set_authenticator(&self, authenticator: Arc<dyn Authenticator>) {
        *self
            .shared
            .authenticator
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(authenticator);
    }

    /// Detach the interactive context. An outstanding challenge keeps
    /// running; new ones fail with `AuthenticationUnavailable`.
    pub fn clear_authenticator(&self) {
        *self
            .shared
            .authenticator
            .write()
            .unwrap_or_else(PoisonError::into_inner) = None;
    }

    /// Whether an interactive context is registered.
    pub fn has_authenticator(&self) -> bool {
        self.shared
            .authenticator
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// Whether a challenge is outstanding.
    pub fn is_awaiting(&self) -> bool {
        matches!(*self.shared.state(), GateState::AwaitingAuthentication(_))
    }

    /// `Idle -> AwaitingAuthentication`: park a decryption and start a
    /// challenge.
    ///
    /// # Preconditions
    /// - Decrypting with `key` just failed with `AuthenticationRequired`
    ///
    /// # Postconditions
    /// - On `Ok`, exactly one answer will be delivered through the handle
    /// - On `Err`, the gate is back to (or still in) its prior state
    ///
    /// # Errors
    /// - `AuthenticationUnavailable` if no authenticator is registered, it
    ///   is not available, or it failed to start the challenge
    /// - `AuthenticationInProgress` if another challenge is outstanding
    pub(crate) fn begin(
        &self,
        key: ManagedKey,
        encrypted_username: Vec<u8>,
        encrypted_password: Vec<u8>,
    ) -> Result<PendingResult> {
        let authenticator = self
            .shared
            .authenticator
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .ok_or_else(|| {
                Error::AuthenticationUnavailable(
                    "No authenticator registered; set an interactive context first".to_string(),
                )
            })?;

        if !authenticator.is_available() {
            return Err(Error::AuthenticationUnavailable(
                "Authenticator cannot start a challenge".to_string(),
            ));
        }

        let challenge = ChallengeId::new();
        let (sink, receiver) = oneshot::channel();
        let alias = key.alias().clone();

        {
            let mut state = self.shared.state();
            if let GateState::AwaitingAuthentication(current) = &*state {
                warn!(alias = %alias, outstanding = %current.challenge, "Rejecting decryption while a challenge is outstanding");
                return Err(Error::AuthenticationInProgress(format!(
                    "Challenge {} has not resolved yet",
                    current.challenge
                )));
            }
            *state = GateState::AwaitingAuthentication(PendingDecryption {
                challenge,
                sink,
                key,
                encrypted_username,
                encrypted_password,
            });
        }

        info!(alias = %alias, challenge = %challenge, "Starting user-presence challenge");

        // The lock is released: the authenticator may answer synchronously.
        let responder = ChallengeResponder::new(Arc::downgrade(&self.shared), challenge);
        if let Err(e) = authenticator.begin_challenge(&self.shared.prompt, responder) {
            self.shared.take_pending(challenge);
            warn!(alias = %alias, challenge = %challenge, error = %e, "Could not start challenge");
            return Err(Error::AuthenticationUnavailable(format!(
                "Could not start authentication: {}",
                e
            )));
        }

        Ok(PendingResult::new(challenge, receiver))
    }
}
