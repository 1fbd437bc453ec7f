//! Key manager: alias-level key lifecycle over a backend.

use std::sync::Arc;
use tracing::{debug, info};

use crate::backend::KeyBackend;
use crate::handle::ManagedKey;
use crate::spec::KeySpec;
use credvault_common::{Error, Result, ServiceAlias};

/// Creates, resolves and deletes keys by alias.
///
/// Holds no key state of its own: uniqueness of the key under an alias is
/// guaranteed by the backend.
#[derive(Clone)]
pub struct KeyManager {
    backend: Arc<dyn KeyBackend>,
}

impl KeyManager {
    /// Create a manager over a backend.
    pub fn new(backend: Arc<dyn KeyBackend>) -> Self {
        Self { backend }
    }

    /// Get the backend.
    pub fn backend(&self) -> &Arc<dyn KeyBackend> {
        &self.backend
    }

    /// Return the key under `alias`, generating it with `spec` if absent.
    ///
    /// # Postconditions
    /// - A key exists under `alias`
    /// - The backend is only mutated when no key existed
    ///
    /// # Errors
    /// - `KeyAccess` if the backend cannot be read or written
    /// - `CryptoFailed` if the existing key belongs to another family
    /// - `InvalidInput` if the spec needs presence and the backend lacks it
    pub fn ensure_key(&self, alias: &ServiceAlias, spec: &KeySpec) -> Result<ManagedKey> {
        if let Some(key) = self.backend.fetch_key(alias)? {
            if key.family() != spec.family {
                return Err(Error::CryptoFailed(format!(
                    "Key {} is {}, expected {}",
                    alias,
                    key.family(),
                    spec.family
                )));
            }
            debug!(alias = %alias, "Reusing existing key");
            return Ok(key);
        }

        if spec.user_presence_required && !self.backend.supports_user_presence() {
            return Err(Error::InvalidInput(format!(
                "Backend {} cannot bind keys to user presence",
                self.backend.name()
            )));
        }

        let key = self.backend.generate_key(alias, spec)?;
        info!(alias = %alias, backend = self.backend.name(), "Provisioned key");
        Ok(key)
    }

    /// Resolve the key under an existing alias.
    ///
    /// # Errors
    /// - `KeyNotFound` if nothing was ever encrypted under `alias`
    /// - `KeyAccess` if the backend cannot be read
    pub fn fetch_key(&self, alias: &ServiceAlias) -> Result<ManagedKey> {
        self.backend
            .fetch_key(alias)?
            .ok_or_else(|| Error::KeyNotFound(format!("No key under alias {}", alias)))
    }

    /// Delete the key under `alias`. A missing key is not an error.
    ///
    /// # Errors
    /// - `KeyAccess` if the backend cannot be written
    pub fn delete_key(&self, alias: &ServiceAlias) -> Result<()> {
        if !self.backend.contains_alias(alias)? {
            debug!(alias = %alias, "No key to delete");
            return Ok(());
        }

        match self.backend.delete_key(alias) {
            // Lost a race with another deleter.
            Ok(()) | Err(Error::KeyNotFound(_)) => {
                info!(alias = %alias, "Deleted key");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::software::SoftwareKeystore;
    use crate::spec::{AuthValidity, KeyFamily};
    use credvault_common::SecurityLevel;

    fn manager() -> KeyManager {
        KeyManager::new(Arc::new(SoftwareKeystore::new()))
    }

    fn any_spec(family: KeyFamily) -> KeySpec {
        KeySpec::for_level(family, SecurityLevel::Any, AuthValidity::default())
    }

    #[test]
    fn test_ensure_key_provisions_once() {
        let manager = manager();
        let alias = ServiceAlias::new("github");

        let first = manager.ensure_key(&alias, &any_spec(KeyFamily::Asymmetric)).unwrap();
        let second = manager.ensure_key(&alias, &any_spec(KeyFamily::Asymmetric)).unwrap();

        assert_eq!(first, second);
    }

    #[test]
    fn test_ensure_key_family_mismatch() {
        let manager = manager();
        let alias = ServiceAlias::new("github");

        manager.ensure_key(&alias, &any_spec(KeyFamily::Symmetric)).unwrap();
        assert!(matches!(
            manager.ensure_key(&alias, &any_spec(KeyFamily::Asymmetric)),
            Err(Error::CryptoFailed(_))
        ));
    }

    #[test]
    fn test_fetch_missing_key() {
        let manager = manager();
        assert!(matches!(
            manager.fetch_key(&ServiceAlias::new("never")),
            Err(Error::KeyNotFound(_))
        ));
    }

    #[test]
    fn test_delete_is_idempotent() {
        let manager = manager();
        let alias = ServiceAlias::new("github");

        manager.delete_key(&alias).unwrap();

        manager.ensure_key(&alias, &any_spec(KeyFamily::Symmetric)).unwrap();
        manager.delete_key(&alias).unwrap();
        manager.delete_key(&alias).unwrap();

        assert!(matches!(manager.fetch_key(&alias), Err(Error::KeyNotFound(_))));
    }
}
