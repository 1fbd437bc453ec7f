//! Credential vault: the encrypt/decrypt contract over one key family.

use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::authenticator::Authenticator;
use crate::cipher::Cipher;
use crate::config::VaultConfig;
use crate::entry::VaultEntry;
use crate::gate::AuthenticationGate;
use crate::outcome::DecryptOutcome;
use crate::storage::{self, CipherStorage};
use credvault_common::{Error, Result, SecurityLevel, ServiceAlias};
use credvault_keystore::{Direction, KeyBackend, KeyFamily, KeyManager, KeySpec};

/// Stores (username, password) pairs encrypted under per-service keys.
///
/// Decryption against a key bound to user presence suspends behind the
/// [`AuthenticationGate`]; everything else answers synchronously.
pub struct CredentialVault {
    config: VaultConfig,
    keys: KeyManager,
    cipher: Cipher,
    gate: AuthenticationGate,
}

impl CredentialVault {
    /// Create a vault over a key backend.
    ///
    /// # Errors
    /// - `InvalidInput` if the configuration version is incompatible
    pub fn new(backend: Arc<dyn KeyBackend>, config: VaultConfig) -> Result<Self> {
        if !config.version.is_compatible() {
            return Err(Error::InvalidInput(format!(
                "Incompatible configuration version: {}.{}",
                config.version.major, config.version.minor
            )));
        }

        let cipher = Cipher::new(backend.clone(), config.family);
        let gate = AuthenticationGate::new(cipher.clone(), config.prompt.clone());

        debug!(
            family = %config.family,
            backend = backend.name(),
            transformation = cipher.transformation(),
            "Opened credential vault"
        );

        Ok(Self {
            keys: KeyManager::new(backend),
            config,
            cipher,
            gate,
        })
    }

    /// Get the vault configuration.
    pub fn config(&self) -> &VaultConfig {
        &self.config
    }

    /// Get the authentication gate.
    pub fn gate(&self) -> &AuthenticationGate {
        &self.gate
    }

    /// Get the key manager.
    pub fn key_manager(&self) -> &KeyManager {
        &self.keys
    }

    /// Detach the interactive context.
    pub fn clear_authenticator(&self) {
        self.gate.clear_authenticator();
    }

    /// Normalize a service name, substituting the configured default alias
    /// for an empty one.
    pub fn resolve_alias(&self, service: &str) -> ServiceAlias {
        if service.is_empty() {
            self.config.default_alias.clone()
        } else {
            ServiceAlias::new(service)
        }
    }

    /// Decrypt a persisted entry.
    ///
    /// # Errors
    /// - `CryptoFailed` if the entry was produced by another storage
    /// - Otherwise as [`CipherStorage::decrypt`]
    pub fn decrypt_entry(&self, service: &str, entry: &VaultEntry) -> Result<DecryptOutcome> {
        let (encrypted_username, encrypted_password, storage_name) = entry.decode();

        if storage_name != self.storage_name() {
            warn!(
                service = %self.resolve_alias(service),
                entry_storage = storage_name,
                vault_storage = self.storage_name(),
                "Entry was produced by another storage"
            );
            return Err(Error::CryptoFailed(format!(
                "Entry was written by {}, this vault is {}",
                storage_name,
                self.storage_name()
            )));
        }

        self.decrypt(service, encrypted_username, encrypted_password)
    }
}

impl CipherStorage for CredentialVault {
    fn storage_name(&self) -> &'static str {
        storage::storage_name(self.config.family)
    }

    fn biometry_supported(&self) -> bool {
        self.config.family == KeyFamily::Asymmetric && self.keys.backend().supports_user_presence()
    }

    fn requires_interactive_context(&self) -> bool {
        self.config.family == KeyFamily::Asymmetric
    }

    fn set_authenticator(&self, authenticator: Arc<dyn Authenticator>) {
        self.gate.set_authenticator(authenticator);
    }

    fn encrypt(
        &self,
        service: &str,
        username: &str,
        password: &str,
        level: SecurityLevel,
    ) -> Result<VaultEntry> {
        let alias = self.resolve_alias(service);

        if level.requires_presence() && !self.biometry_supported() {
            return Err(Error::InvalidInput(format!(
                "{} cannot provide {}",
                self.storage_name(),
                level
            )));
        }

        let spec = KeySpec::for_level(self.config.family, level, self.config.auth_validity);
        let key = self.keys.ensure_key(&alias, &spec)?;

        // A presence-bound key made elsewhere on a shared backend cannot be
        // used by a storage without biometry.
        if key.requires_user_presence() && !self.biometry_supported() {
            return Err(Error::InvalidInput(format!(
                "Key {} requires user presence, which {} cannot provide",
                alias,
                self.storage_name()
            )));
        }

        if !key.security_level().satisfies(level) {
            warn!(
                alias = %alias,
                requested = %level,
                provided = %key.security_level(),
                "Existing key is weaker than requested"
            );
        }

        let encrypted_username = self.cipher.transform(Direction::Encrypt, &key, username.as_bytes())?;
        let encrypted_password = self.cipher.transform(Direction::Encrypt, &key, password.as_bytes())?;

        debug!(alias = %alias, "Encrypted credential");
        Ok(VaultEntry::encode(
            encrypted_username,
            encrypted_password,
            self.storage_name(),
        ))
    }

    fn decrypt(
        &self,
        service: &str,
        encrypted_username: &[u8],
        encrypted_password: &[u8],
    ) -> Result<DecryptOutcome> {
        let alias = self.resolve_alias(service);
        let key = self.keys.fetch_key(&alias)?;

        match self
            .cipher
            .decrypt_credentials(&key, encrypted_username, encrypted_password)
        {
            Ok(result) => {
                debug!(alias = %alias, "Decrypted credential");
                Ok(DecryptOutcome::Decrypted(result))
            }
            Err(e) if e.is_authentication_required() => {
                debug!(alias = %alias, "Key is locked behind user presence");
                let pending = self.gate.begin(
                    key,
                    encrypted_username.to_vec(),
                    encrypted_password.to_vec(),
                )?;
                Ok(DecryptOutcome::Pending(pending))
            }
            Err(e) => Err(e),
        }
    }

    fn remove_key(&self, service: &str) -> Result<()> {
        let alias = self.resolve_alias(service);
        self.keys.delete_key(&alias)?;
        info!(alias = %alias, "Removed credential key");
        Ok(())
    }
}
