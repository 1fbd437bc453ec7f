//! Cipher storage interface shared by both key families.

use std::sync::Arc;

use crate::authenticator::Authenticator;
use crate::entry::VaultEntry;
use crate::outcome::DecryptOutcome;
use credvault_common::{Result, SecurityLevel};
use credvault_keystore::KeyFamily;

/// Storage name of the asymmetric (sealed box) variant.
pub const ASYMMETRIC_STORAGE_NAME: &str = "KeystoreX25519Sealed";

/// Storage name of the symmetric variant.
pub const SYMMETRIC_STORAGE_NAME: &str = "KeystoreXChaCha20Poly1305";

/// Storage name reported for a key family.
pub fn storage_name(family: KeyFamily) -> &'static str {
    match family {
        KeyFamily::Asymmetric => ASYMMETRIC_STORAGE_NAME,
        KeyFamily::Symmetric => SYMMETRIC_STORAGE_NAME,
    }
}

/// Encrypt/decrypt contract of a credential storage.
///
/// Implementations own one key family. Callers choosing among several
/// storages use the capability queries, which have no side effects.
pub trait CipherStorage: Send + Sync {
    /// Identifier written into every entry this storage produces.
    fn storage_name(&self) -> &'static str;

    /// Whether keys can be bound to a biometric or other presence check.
    fn biometry_supported(&self) -> bool;

    /// Whether an authenticator must be registered before decrypting.
    fn requires_interactive_context(&self) -> bool;

    /// Register the live interactive context.
    fn set_authenticator(&self, authenticator: Arc<dyn Authenticator>);

    /// Encrypt a credential under the key for `service`, creating the key
    /// on first use.
    ///
    /// # Errors
    /// - `KeyAccess` if the backend cannot be reached
    /// - `InvalidInput` if `level` cannot be provided by this storage
    /// - `CryptoFailed` if the transform fails
    fn encrypt(
        &self,
        service: &str,
        username: &str,
        password: &str,
        level: SecurityLevel,
    ) -> Result<VaultEntry>;

    /// Decrypt a credential. Either answers immediately or starts a
    /// presence challenge and answers through the returned handle.
    ///
    /// # Errors
    /// - `KeyNotFound` if nothing was encrypted under `service`
    /// - `KeyInvalidated` if the key was permanently revoked
    /// - `CryptoFailed` if the ciphertexts are not this key's
    /// - `AuthenticationUnavailable` if a challenge is needed but cannot
    ///   be started
    /// - `AuthenticationInProgress` if another challenge is outstanding
    fn decrypt(
        &self,
        service: &str,
        encrypted_username: &[u8],
        encrypted_password: &[u8],
    ) -> Result<DecryptOutcome>;

    /// Delete the key for `service`. Idempotent.
    ///
    /// # Errors
    /// - `KeyAccess` if the backend cannot be written
    fn remove_key(&self, service: &str) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_names_are_distinct() {
        assert_eq!(storage_name(KeyFamily::Asymmetric), "KeystoreX25519Sealed");
        assert_eq!(storage_name(KeyFamily::Symmetric), "KeystoreXChaCha20Poly1305");
    }
}
