//! Secure key backend trait definition.

use crate::handle::{Direction, ManagedKey};
use crate::spec::KeySpec;
use credvault_common::{Result, ServiceAlias};

/// A cipher opened by a backend for one key and one direction.
///
/// The key material stays behind this object; callers only feed bytes in
/// and get bytes out. A cipher may process several messages, all covered by
/// the authorization that was checked when it was opened.
pub trait SealedCipher: Send {
    /// Transform one complete message.
    ///
    /// # Errors
    /// - `CryptoFailed` if the input is not a ciphertext this key produced
    fn process(&mut self, input: &[u8]) -> Result<Vec<u8>>;
}

/// Secure key backend.
///
/// Implementations wrap a platform key store. Every backend-native failure
/// must be reported through the common error taxonomy.
pub trait KeyBackend: Send + Sync {
    /// Get the backend name (e.g., "software", "android-keystore").
    fn name(&self) -> &str;

    /// Whether the backend can bind keys to user-presence checks.
    fn supports_user_presence(&self) -> bool;

    /// Check whether a key exists under `alias`.
    ///
    /// # Errors
    /// - `KeyAccess` if the store cannot be read
    fn contains_alias(&self, alias: &ServiceAlias) -> Result<bool>;

    /// Generate a key under `alias`.
    ///
    /// # Postconditions
    /// - Exactly one key exists under `alias`. If one already existed, or a
    ///   concurrent caller won the race, that key's handle is returned.
    ///
    /// # Errors
    /// - `KeyAccess` if the store cannot be written
    /// - `InvalidInput` if the spec asks for something the backend lacks
    fn generate_key(&self, alias: &ServiceAlias, spec: &KeySpec) -> Result<ManagedKey>;

    /// Resolve the handle of an existing key, `None` if absent.
    ///
    /// # Errors
    /// - `KeyAccess` if the store cannot be read
    fn fetch_key(&self, alias: &ServiceAlias) -> Result<Option<ManagedKey>>;

    /// Delete the key under `alias`.
    ///
    /// # Errors
    /// - `KeyNotFound` if absent
    /// - `KeyAccess` if the store cannot be written
    fn delete_key(&self, alias: &ServiceAlias) -> Result<()>;

    /// Open a cipher for `key` in `direction`.
    ///
    /// # Errors
    /// - `AuthenticationRequired` if the key needs a fresh user-presence
    ///   check before it can be used
    /// - `KeyInvalidated` if the key's authorization was permanently revoked
    /// - `KeyNotFound` if the key was deleted after the handle was issued
    /// - `KeyAccess` if the store cannot be read
    fn open_cipher(&self, direction: Direction, key: &ManagedKey) -> Result<Box<dyn SealedCipher>>;
}
