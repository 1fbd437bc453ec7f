//! External user-presence authenticator contract.
//!
//! The vault never renders a prompt itself. It hands an [`Authenticator`] a
//! [`PromptInfo`] and a [`ChallengeResponder`]; the authenticator runs the
//! challenge (biometric sheet, PIN pad, terminal confirmation) and reports
//! back through the responder, from any thread.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Weak;
use tracing::debug;
use uuid::Uuid;

use crate::gate::GateShared;
use credvault_common::Result;

/// Text shown by the authenticator's prompt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PromptInfo {
    /// Prompt title.
    pub title: String,
    /// Line under the title.
    pub subtitle: String,
    /// Label of the button that cancels the prompt.
    pub negative_button: String,
}

impl Default for PromptInfo {
    fn default() -> Self {
        Self {
            title: "Authentication required".to_string(),
            subtitle: "Please use biometric authentication to unlock the app".to_string(),
            negative_button: "Cancel".to_string(),
        }
    }
}

/// Identifier of one user-presence challenge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChallengeId(Uuid);

impl ChallengeId {
    pub(crate) fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for ChallengeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Live user-presence challenge provider.
///
/// Registered with a vault as its interactive context. Implementations
/// must eventually call exactly one of [`ChallengeResponder::succeeded`] or
/// [`ChallengeResponder::error`], or drop the responder.
pub trait Authenticator: Send + Sync {
    /// Whether a challenge can be started right now (secure lock screen
    /// configured, permission granted, UI attached).
    fn is_available(&self) -> bool {
        true
    }

    /// Start a challenge. Must not block waiting for the user.
    ///
    /// # Errors
    /// - Any error means the challenge never started; the vault reports it
    ///   as `AuthenticationUnavailable`
    fn begin_challenge(&self, prompt: &PromptInfo, responder: ChallengeResponder) -> Result<()>;
}

/// Continuation for one challenge.
///
/// Resolving consumes the responder, so a challenge resolves at most once.
/// Dropping an unresolved responder aborts the challenge, so the waiting
/// caller is always answered.
pub struct ChallengeResponder {
    gate: Option<Weak<GateShared>>,
    challenge: ChallengeId,
}

impl ChallengeResponder {
    pub(crate) fn new(gate: Weak<GateShared>, challenge: ChallengeId) -> Self {
        Self {
            gate: Some(gate),
            challenge,
        }
    }

    /// Identifier of the challenge this responder answers.
    pub fn challenge_id(&self) -> ChallengeId {
        self.challenge
    }

    /// The user proved presence; the vault retries the decryption.
    pub fn succeeded(mut self) {
        if let Some(gate) = self.gate.take().and_then(|gate| gate.upgrade()) {
            gate.resume(self.challenge);
        }
    }

    /// One attempt was rejected (e.g. unrecognized fingerprint) but the
    /// prompt stays up and the user can try again. Does not resolve.
    pub fn attempt_failed(&self) {
        debug!(challenge = %self.challenge, "Authentication attempt rejected, waiting for retry");
    }

    /// The challenge ended without success (cancel, lockout, hardware
    /// error). The caller receives `AuthenticationFailed(message)`.
    pub fn error(mut self, message: impl Into<String>) {
        if let Some(gate) = self.gate.take().and_then(|gate| gate.upgrade()) {
            gate.abort(self.challenge, message.into());
        }
    }
}

impl Drop for ChallengeResponder {
    fn drop(&mut self) {
        if let Some(gate) = self.gate.take().and_then(|gate| gate.upgrade()) {
            gate.abort(
                self.challenge,
                "Authentication prompt closed without a result".to_string(),
            );
        }
    }
}

impl fmt::Debug for ChallengeResponder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChallengeResponder")
            .field("challenge", &self.challenge)
            .field("resolved", &self.gate.is_none())
            .finish()
    }
}
