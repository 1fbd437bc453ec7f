//! Common error types for credvault.
//!
//! Every failure raised by a key backend or a cipher is re-classified into
//! one of these variants at the component boundary.

use thiserror::Error;

/// Top-level error type for credvault operations.
#[derive(Debug, Error)]
pub enum Error {
    /// The secure key backend could not be opened, loaded or written.
    #[error("Key access error: {0}")]
    KeyAccess(String),

    /// No key exists under the requested alias.
    #[error("Key not found: {0}")]
    KeyNotFound(String),

    /// The key is locked behind a fresh user-presence check.
    ///
    /// Raised by backends when a cipher is opened against a key that needs
    /// re-authentication. The vault consumes it and starts a challenge; it
    /// never reaches callers.
    #[error("User authentication required: {0}")]
    AuthenticationRequired(String),

    /// No authenticator is registered, or it cannot start a challenge.
    #[error("Authentication unavailable: {0}")]
    AuthenticationUnavailable(String),

    /// The authenticator reported an error or the user cancelled.
    ///
    /// Carries the authenticator's message verbatim.
    #[error("{0}")]
    AuthenticationFailed(String),

    /// A challenge is already outstanding for this vault.
    #[error("Authentication already in progress: {0}")]
    AuthenticationInProgress(String),

    /// The key's authorization was permanently revoked.
    ///
    /// Terminal: the alias has to be removed and the credential encrypted
    /// again under a fresh key.
    #[error("Key permanently invalidated: {0}")]
    KeyInvalidated(String),

    /// Malformed ciphertext or a failed transform.
    #[error("Cryptographic operation failed: {0}")]
    CryptoFailed(String),

    /// I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization or deserialization failed.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Invalid input provided.
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl Error {
    /// Whether this error is the internal "needs authentication" signal.
    pub fn is_authentication_required(&self) -> bool {
        matches!(self, Error::AuthenticationRequired(_))
    }

    /// Whether retrying the same operation can never succeed.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Error::KeyInvalidated(_))
    }
}

/// Result type alias using the common Error.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_authentication_failed_message_is_verbatim() {
        let err = Error::AuthenticationFailed("user cancelled".to_string());
        assert_eq!(err.to_string(), "user cancelled");
    }

    #[test]
    fn test_classification_helpers() {
        assert!(Error::AuthenticationRequired("k".into()).is_authentication_required());
        assert!(!Error::CryptoFailed("k".into()).is_authentication_required());
        assert!(Error::KeyInvalidated("k".into()).is_terminal());
        assert!(!Error::KeyNotFound("k".into()).is_terminal());
    }
}
