//! Scriptable authenticator for tests and headless tools.
//!
//! Holds the responder of the current challenge until the test decides the
//! outcome. Approving records user presence in the [`SoftwareKeystore`]
//! first, as a real biometric prompt would unlock the key.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use crate::authenticator::{Authenticator, ChallengeResponder, PromptInfo};
use credvault_common::{Error, Result};
use credvault_keystore::SoftwareKeystore;

/// Authenticator whose challenges are resolved by explicit calls.
pub struct ManualAuthenticator {
    keystore: Arc<SoftwareKeystore>,
    responder: Mutex<Option<ChallengeResponder>>,
    last_prompt: Mutex<Option<PromptInfo>>,
    available: AtomicBool,
    fail_to_start: AtomicBool,
    started: AtomicUsize,
}

impl ManualAuthenticator {
    /// Create an authenticator that unlocks keys in `keystore` on approval.
    pub fn new(keystore: Arc<SoftwareKeystore>) -> Self {
        Self {
            keystore,
            responder: Mutex::new(None),
            last_prompt: Mutex::new(None),
            available: AtomicBool::new(true),
            fail_to_start: AtomicBool::new(false),
            started: AtomicUsize::new(0),
        }
    }

    /// Toggle the availability precondition.
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// Make `begin_challenge` fail.
    pub fn set_fail_to_start(&self, fail: bool) {
        self.fail_to_start.store(fail, Ordering::SeqCst);
    }

    /// Number of challenges started so far.
    pub fn challenges_started(&self) -> usize {
        self.started.load(Ordering::SeqCst)
    }

    /// Prompt of the most recent challenge.
    pub fn last_prompt(&self) -> Option<PromptInfo> {
        self.last_prompt
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Take the responder of the open challenge without resolving it.
    pub fn take_responder(&self) -> Option<ChallengeResponder> {
        self.responder
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }

    /// Report success. Returns false if no challenge was open.
    pub fn approve(&self) -> bool {
        let Some(responder) = self.take_responder() else {
            return false;
        };
        self.keystore.record_user_presence();
        responder.succeeded();
        true
    }

    /// Report an error or cancellation. Returns false if no challenge was open.
    pub fn cancel(&self, message: &str) -> bool {
        match self.take_responder() {
            Some(responder) => {
                responder.error(message);
                true
            }
            None => false,
        }
    }

    /// Report a rejected attempt; the challenge stays open. Returns false
    /// if no challenge was open.
    pub fn reject_attempt(&self) -> bool {
        match &*self.responder.lock().unwrap_or_else(PoisonError::into_inner) {
            Some(responder) => {
                responder.attempt_failed();
                true
            }
            None => false,
        }
    }
}

impl Authenticator for ManualAuthenticator {
    fn is_available(&self) -> bool {
        self.available.load(Ordering::SeqCst)
    }

    fn begin_challenge(&self, prompt: &PromptInfo, responder: ChallengeResponder) -> Result<()> {
        if self.fail_to_start.load(Ordering::SeqCst) {
            return Err(Error::AuthenticationUnavailable(
                "Prompt could not be shown".to_string(),
            ));
        }

        *self
            .last_prompt
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(prompt.clone());
        *self.responder.lock().unwrap_or_else(PoisonError::into_inner) = Some(responder);
        self.started.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
