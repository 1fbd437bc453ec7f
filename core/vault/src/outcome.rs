//! Results of a decrypt call.

use std::fmt;
use tokio::sync::oneshot;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::authenticator::ChallengeId;
use credvault_common::{Error, Result, SecurityLevel};

/// A decrypted credential. Zeroized on drop.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct DecryptionResult {
    username: String,
    password: String,
    #[zeroize(skip)]
    security_level: SecurityLevel,
}

impl DecryptionResult {
    pub(crate) fn new(username: String, password: String, security_level: SecurityLevel) -> Self {
        Self {
            username,
            password,
            security_level,
        }
    }

    /// The stored username.
    pub fn username(&self) -> &str {
        &self.username
    }

    /// The stored password.
    pub fn password(&self) -> &str {
        &self.password
    }

    /// Protection the key actually provided.
    pub fn security_level(&self) -> SecurityLevel {
        self.security_level
    }
}

impl fmt::Debug for DecryptionResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DecryptionResult")
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .field("security_level", &self.security_level)
            .finish()
    }
}

/// Answer of a decrypt call that did not fail outright.
#[derive(Debug)]
pub enum DecryptOutcome {
    /// Decrypted without user interaction.
    Decrypted(DecryptionResult),
    /// A user-presence challenge is running; the answer arrives through
    /// the handle.
    Pending(PendingResult),
}

impl DecryptOutcome {
    /// Whether the answer is deferred.
    pub fn is_pending(&self) -> bool {
        matches!(self, DecryptOutcome::Pending(_))
    }

    /// Wait for the final answer, whichever branch was taken.
    pub async fn resolve(self) -> Result<DecryptionResult> {
        match self {
            DecryptOutcome::Decrypted(result) => Ok(result),
            DecryptOutcome::Pending(pending) => pending.wait().await,
        }
    }
}

/// Receiving end of a deferred decryption.
///
/// Exactly one answer is delivered per handle: the retried decryption, or
/// the reason the challenge failed.
pub struct PendingResult {
    challenge: ChallengeId,
    receiver: oneshot::Receiver<Result<DecryptionResult>>,
}

impl PendingResult {
    pub(crate) fn new(challenge: ChallengeId, receiver: oneshot::Receiver<Result<DecryptionResult>>) -> Self {
        Self { challenge, receiver }
    }

    /// Identifier of the challenge this answer waits on.
    pub fn challenge_id(&self) -> ChallengeId {
        self.challenge
    }

    /// Wait for the answer.
    pub async fn wait(self) -> Result<DecryptionResult> {
        self.receiver.await.map_err(|_| abandoned())?
    }

    /// Wait for the answer, blocking the current thread.
    ///
    /// # Panics
    /// Panics if called from within an asynchronous execution context.
    pub fn blocking_wait(self) -> Result<DecryptionResult> {
        self.receiver.blocking_recv().map_err(|_| abandoned())?
    }

    /// Take the answer if it has already arrived.
    pub fn try_take(&mut self) -> Option<Result<DecryptionResult>> {
        match self.receiver.try_recv() {
            Ok(result) => Some(result),
            Err(oneshot::error::TryRecvError::Empty) => None,
            Err(oneshot::error::TryRecvError::Closed) => Some(Err(abandoned())),
        }
    }
}

impl fmt::Debug for PendingResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PendingResult")
            .field("challenge", &self.challenge)
            .finish()
    }
}

fn abandoned() -> Error {
    Error::AuthenticationFailed("Vault closed before authentication completed".to_string())
}
