//! Software key store with simulated user-presence enforcement.
//!
//! Stands in for a hardware keystore during development and testing. It
//! enforces the same access rules a platform keystore would: keys bound to
//! user presence only open for decryption inside the validity window of the
//! last recorded presence check, single-use keys consume that check, and
//! invalidated keys never open again.
//!
//! Keys live in memory, optionally mirrored to a JSON file. The file holds
//! raw key material and is only as safe as the directory it sits in.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};
use zeroize::Zeroize;

use crate::backend::{KeyBackend, SealedCipher};
use crate::handle::{Direction, ManagedKey};
use crate::spec::{AuthValidity, KeyFamily, KeySpec};
use credvault_common::{Error, Result, ServiceAlias};
use credvault_crypto::{aead, sealed, KeyPair, SymmetricKey};

/// On-disk format version.
const STORE_VERSION: u32 = 1;

/// How long an unconsumed single-use grant stays redeemable.
const SINGLE_USE_GRANT_TTL: Duration = Duration::from_secs(1);

#[derive(Clone)]
enum KeyMaterial {
    Symmetric(SymmetricKey),
    Asymmetric(KeyPair),
}

impl KeyMaterial {
    fn generate(family: KeyFamily) -> Self {
        match family {
            KeyFamily::Symmetric => KeyMaterial::Symmetric(SymmetricKey::generate()),
            KeyFamily::Asymmetric => KeyMaterial::Asymmetric(KeyPair::generate()),
        }
    }

    fn from_secret(family: KeyFamily, secret: &[u8]) -> Result<Self> {
        match family {
            KeyFamily::Symmetric => SymmetricKey::from_slice(secret).map(KeyMaterial::Symmetric),
            KeyFamily::Asymmetric => KeyPair::from_secret_slice(secret).map(KeyMaterial::Asymmetric),
        }
    }

    fn public_key(&self) -> Option<Vec<u8>> {
        match self {
            KeyMaterial::Symmetric(_) => None,
            KeyMaterial::Asymmetric(pair) => Some(pair.public_bytes().to_vec()),
        }
    }

    fn encoded_secret(&self) -> String {
        let mut secret = match self {
            KeyMaterial::Symmetric(key) => *key.as_bytes(),
            KeyMaterial::Asymmetric(pair) => pair.secret_bytes(),
        };
        let encoded = STANDARD.encode(secret);
        secret.zeroize();
        encoded
    }
}

struct StoredKey {
    spec: KeySpec,
    material: KeyMaterial,
    created_at: DateTime<Utc>,
    invalidated: bool,
}

impl StoredKey {
    fn handle(&self, alias: &ServiceAlias) -> ManagedKey {
        ManagedKey::new(alias.clone(), self.spec, self.material.public_key())
    }
}

#[derive(Serialize, Deserialize)]
struct PersistedKey {
    alias: ServiceAlias,
    spec: KeySpec,
    secret: String,
    created_at: DateTime<Utc>,
    #[serde(default)]
    invalidated: bool,
}

#[derive(Serialize, Deserialize)]
struct PersistedStore {
    version: u32,
    keys: Vec<PersistedKey>,
}

/// Outcome of the most recent user-presence check.
#[derive(Debug, Default)]
struct PresenceState {
    authenticated_at: Option<Instant>,
    single_use_granted_at: Option<Instant>,
}

/// Cipher opened by [`SoftwareKeystore`]. Holds a copy of the key material,
/// zeroized on drop.
struct SoftwareCipher {
    direction: Direction,
    material: KeyMaterial,
}

impl SealedCipher for SoftwareCipher {
    fn process(&mut self, input: &[u8]) -> Result<Vec<u8>> {
        match (&self.material, self.direction) {
            (KeyMaterial::Symmetric(key), Direction::Encrypt) => aead::encrypt(key.as_bytes(), input),
            (KeyMaterial::Symmetric(key), Direction::Decrypt) => aead::decrypt(key.as_bytes(), input),
            (KeyMaterial::Asymmetric(pair), Direction::Encrypt) => sealed::seal(&pair.public_bytes(), input),
            (KeyMaterial::Asymmetric(pair), Direction::Decrypt) => sealed::open(pair, input),
        }
    }
}

/// Software key store.
///
/// Thread-safe. Alias uniqueness is first-writer-wins: generation checks and
/// inserts under one write lock.
pub struct SoftwareKeystore {
    keys: RwLock<HashMap<ServiceAlias, StoredKey>>,
    presence: Mutex<PresenceState>,
    path: Option<PathBuf>,
}

impl SoftwareKeystore {
    /// Create an empty in-memory keystore.
    pub fn new() -> Self {
        Self {
            keys: RwLock::new(HashMap::new()),
            presence: Mutex::new(PresenceState::default()),
            path: None,
        }
    }

    /// Open a keystore mirrored to a JSON file.
    ///
    /// # Postconditions
    /// - Keys already in the file are loaded
    /// - The parent directory exists
    ///
    /// # Errors
    /// - `KeyAccess` if the file cannot be read or parsed, or was written by
    ///   an incompatible version
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                Error::KeyAccess(format!("Could not create keystore directory: {}", e))
            })?;
        }

        let keys = if path.exists() {
            Self::load(&path)?
        } else {
            HashMap::new()
        };

        debug!(path = %path.display(), keys = keys.len(), "Opened software keystore");

        Ok(Self {
            keys: RwLock::new(keys),
            presence: Mutex::new(PresenceState::default()),
            path: Some(path),
        })
    }

    /// Record a successful user-presence check.
    ///
    /// Keys with a validity window become usable until the window lapses;
    /// one single-use opening is granted, redeemable only shortly after.
    pub fn record_user_presence(&self) {
        let mut presence = self.presence.lock().unwrap_or_else(|e| e.into_inner());
        let now = Instant::now();
        presence.authenticated_at = Some(now);
        presence.single_use_granted_at = Some(now);
        debug!("User presence recorded");
    }

    /// Permanently revoke a key's authorization, as a platform keystore does
    /// when the enrolled biometric set changes.
    ///
    /// # Errors
    /// - `KeyNotFound` if no key exists under `alias`
    /// - `KeyAccess` if the store cannot be written
    pub fn invalidate_key(&self, alias: &ServiceAlias) -> Result<()> {
        let mut keys = self.write_keys()?;
        let stored = keys
            .get_mut(alias)
            .ok_or_else(|| Error::KeyNotFound(format!("No key under alias {}", alias)))?;
        if stored.invalidated {
            return Ok(());
        }
        stored.invalidated = true;

        if let Err(e) = self.persist(&keys) {
            if let Some(stored) = keys.get_mut(alias) {
                stored.invalidated = false;
            }
            return Err(e);
        }

        warn!(alias = %alias, "Key invalidated");
        Ok(())
    }

    /// List the aliases currently holding a key.
    ///
    /// # Errors
    /// - `KeyAccess` if the store cannot be read
    pub fn aliases(&self) -> Result<Vec<ServiceAlias>> {
        let mut aliases: Vec<ServiceAlias> = self.read_keys()?.keys().cloned().collect();
        aliases.sort_by(|a, b| a.as_str().cmp(b.as_str()));
        Ok(aliases)
    }

    /// Creation time of the key under `alias`.
    ///
    /// # Errors
    /// - `KeyAccess` if the store cannot be read
    pub fn created_at(&self, alias: &ServiceAlias) -> Result<Option<DateTime<Utc>>> {
        Ok(self.read_keys()?.get(alias).map(|stored| stored.created_at))
    }

    fn read_keys(&self) -> Result<RwLockReadGuard<'_, HashMap<ServiceAlias, StoredKey>>> {
        self.keys
            .read()
            .map_err(|_| Error::KeyAccess("Keystore lock poisoned".to_string()))
    }

    fn write_keys(&self) -> Result<RwLockWriteGuard<'_, HashMap<ServiceAlias, StoredKey>>> {
        self.keys
            .write()
            .map_err(|_| Error::KeyAccess("Keystore lock poisoned".to_string()))
    }

    fn authorize_use(&self, alias: &ServiceAlias, validity: AuthValidity) -> Result<()> {
        let mut presence = self
            .presence
            .lock()
            .map_err(|_| Error::KeyAccess("Presence state lock poisoned".to_string()))?;

        let authorized = match validity.window() {
            None => presence
                .single_use_granted_at
                .take()
                .map(|at| at.elapsed() < SINGLE_USE_GRANT_TTL)
                .unwrap_or(false),
            Some(window) => presence
                .authenticated_at
                .map(|at| at.elapsed() < window)
                .unwrap_or(false),
        };

        if authorized {
            Ok(())
        } else {
            Err(Error::AuthenticationRequired(format!(
                "Key {} requires user authentication",
                alias
            )))
        }
    }

    fn load(path: &Path) -> Result<HashMap<ServiceAlias, StoredKey>> {
        let bytes = std::fs::read(path)
            .map_err(|e| Error::KeyAccess(format!("Could not read keystore: {}", e)))?;
        let store: PersistedStore = serde_json::from_slice(&bytes)
            .map_err(|e| Error::KeyAccess(format!("Could not parse keystore: {}", e)))?;

        if store.version != STORE_VERSION {
            return Err(Error::KeyAccess(format!(
                "Unsupported keystore version: {}",
                store.version
            )));
        }

        let mut keys = HashMap::with_capacity(store.keys.len());
        for persisted in store.keys {
            let mut secret = STANDARD
                .decode(&persisted.secret)
                .map_err(|e| Error::KeyAccess(format!("Corrupt key {}: {}", persisted.alias, e)))?;
            let material = KeyMaterial::from_secret(persisted.spec.family, &secret);
            secret.zeroize();

            let material = material
                .map_err(|e| Error::KeyAccess(format!("Corrupt key {}: {}", persisted.alias, e)))?;
            keys.insert(
                persisted.alias,
                StoredKey {
                    spec: persisted.spec,
                    material,
                    created_at: persisted.created_at,
                    invalidated: persisted.invalidated,
                },
            );
        }

        Ok(keys)
    }

    /// Mirror `keys` to the backing file. Called with the write lock held so
    /// that writes land in mutation order.
    fn persist(&self, keys: &HashMap<ServiceAlias, StoredKey>) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        let store = PersistedStore {
            version: STORE_VERSION,
            keys: keys
                .iter()
                .map(|(alias, stored)| PersistedKey {
                    alias: alias.clone(),
                    spec: stored.spec,
                    secret: stored.material.encoded_secret(),
                    created_at: stored.created_at,
                    invalidated: stored.invalidated,
                })
                .collect(),
        };

        let mut bytes = serde_json::to_vec_pretty(&store)
            .map_err(|e| Error::KeyAccess(format!("Could not serialize keystore: {}", e)))?;

        let tmp_path = path.with_extension("tmp");
        let written = write_private(&tmp_path, &bytes).and_then(|_| std::fs::rename(&tmp_path, path));
        bytes.zeroize();

        written.map_err(|e| Error::KeyAccess(format!("Could not write keystore: {}", e)))
    }
}

impl Default for SoftwareKeystore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(unix)]
fn write_private(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    use std::io::Write;
    use std::os::unix::fs::OpenOptionsExt;

    let mut file = std::fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(0o600)
        .open(path)?;
    file.write_all(bytes)?;
    file.sync_all()
}

#[cfg(not(unix))]
fn write_private(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    std::fs::write(path, bytes)
}

impl KeyBackend for SoftwareKeystore {
    fn name(&self) -> &str {
        "software"
    }

    fn supports_user_presence(&self) -> bool {
        true
    }

    fn contains_alias(&self, alias: &ServiceAlias) -> Result<bool> {
        Ok(self.read_keys()?.contains_key(alias))
    }

    fn generate_key(&self, alias: &ServiceAlias, spec: &KeySpec) -> Result<ManagedKey> {
        if spec.key_size != spec.family.key_size() {
            return Err(Error::InvalidInput(format!(
                "Unsupported {} key size: {}",
                spec.family, spec.key_size
            )));
        }
        if !spec.randomized_encryption {
            return Err(Error::InvalidInput(
                "Deterministic encryption is not supported".to_string(),
            ));
        }

        let mut keys = self.write_keys()?;
        if let Some(existing) = keys.get(alias) {
            debug!(alias = %alias, "Key already present, keeping first writer");
            return Ok(existing.handle(alias));
        }

        let stored = StoredKey {
            spec: *spec,
            material: KeyMaterial::generate(spec.family),
            created_at: Utc::now(),
            invalidated: false,
        };
        let handle = stored.handle(alias);
        keys.insert(alias.clone(), stored);

        if let Err(e) = self.persist(&keys) {
            keys.remove(alias);
            return Err(e);
        }

        info!(alias = %alias, family = %spec.family, presence = spec.user_presence_required, "Generated key");
        Ok(handle)
    }

    fn fetch_key(&self, alias: &ServiceAlias) -> Result<Option<ManagedKey>> {
        Ok(self.read_keys()?.get(alias).map(|stored| stored.handle(alias)))
    }

    fn delete_key(&self, alias: &ServiceAlias) -> Result<()> {
        let mut keys = self.write_keys()?;
        let Some(removed) = keys.remove(alias) else {
            return Err(Error::KeyNotFound(format!("No key under alias {}", alias)));
        };

        if let Err(e) = self.persist(&keys) {
            keys.insert(alias.clone(), removed);
            return Err(e);
        }
        Ok(())
    }

    fn open_cipher(&self, direction: Direction, key: &ManagedKey) -> Result<Box<dyn SealedCipher>> {
        let keys = self.read_keys()?;
        let stored = keys
            .get(key.alias())
            .ok_or_else(|| Error::KeyNotFound(format!("No key under alias {}", key.alias())))?;

        if stored.invalidated {
            return Err(Error::KeyInvalidated(format!(
                "Key {} was permanently invalidated",
                key.alias()
            )));
        }

        // Public-key encryption never touches the secret half.
        let public_use = stored.spec.family == KeyFamily::Asymmetric && direction == Direction::Encrypt;
        if stored.spec.user_presence_required && !public_use {
            self.authorize_use(key.alias(), stored.spec.validity)?;
        }

        Ok(Box::new(SoftwareCipher {
            direction,
            material: stored.material.clone(),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use credvault_common::SecurityLevel;
    use std::sync::Arc;

    fn spec(family: KeyFamily, level: SecurityLevel, validity: AuthValidity) -> KeySpec {
        KeySpec::for_level(family, level, validity)
    }

    fn roundtrip(store: &SoftwareKeystore, key: &ManagedKey, plaintext: &[u8]) -> Result<Vec<u8>> {
        let ciphertext = store.open_cipher(Direction::Encrypt, key)?.process(plaintext)?;
        store.open_cipher(Direction::Decrypt, key)?.process(&ciphertext)
    }

    #[test]
    fn test_generate_and_fetch() {
        let store = SoftwareKeystore::new();
        let alias = ServiceAlias::new("github");

        assert!(!store.contains_alias(&alias).unwrap());
        let key = store
            .generate_key(&alias, &spec(KeyFamily::Asymmetric, SecurityLevel::Any, AuthValidity::default()))
            .unwrap();

        assert!(store.contains_alias(&alias).unwrap());
        assert!(key.public_key().is_some());
        assert_eq!(store.fetch_key(&alias).unwrap(), Some(key));
    }

    #[test]
    fn test_generate_is_first_writer_wins() {
        let store = SoftwareKeystore::new();
        let alias = ServiceAlias::new("github");

        let first = store
            .generate_key(&alias, &spec(KeyFamily::Asymmetric, SecurityLevel::Any, AuthValidity::default()))
            .unwrap();
        let second = store
            .generate_key(&alias, &spec(KeyFamily::Asymmetric, SecurityLevel::Any, AuthValidity::default()))
            .unwrap();

        assert_eq!(first.public_key(), second.public_key());
    }

    #[test]
    fn test_concurrent_generation_yields_one_key() {
        let store = Arc::new(SoftwareKeystore::new());
        let alias = ServiceAlias::new("shared");

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = store.clone();
                let alias = alias.clone();
                std::thread::spawn(move || {
                    store
                        .generate_key(&alias, &spec(KeyFamily::Asymmetric, SecurityLevel::Any, AuthValidity::default()))
                        .unwrap()
                })
            })
            .collect();

        let keys: Vec<ManagedKey> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert!(keys.windows(2).all(|w| w[0].public_key() == w[1].public_key()));
        assert_eq!(store.aliases().unwrap().len(), 1);
    }

    #[test]
    fn test_rejects_unsupported_spec() {
        let store = SoftwareKeystore::new();
        let mut bad = spec(KeyFamily::Symmetric, SecurityLevel::Any, AuthValidity::default());
        bad.key_size = 128;
        assert!(matches!(
            store.generate_key(&ServiceAlias::new("x"), &bad),
            Err(Error::InvalidInput(_))
        ));

        let mut deterministic = spec(KeyFamily::Symmetric, SecurityLevel::Any, AuthValidity::default());
        deterministic.randomized_encryption = false;
        assert!(store.generate_key(&ServiceAlias::new("x"), &deterministic).is_err());
    }

    #[test]
    fn test_both_families_roundtrip_without_presence() {
        let store = SoftwareKeystore::new();
        for (name, family) in [("sym", KeyFamily::Symmetric), ("asym", KeyFamily::Asymmetric)] {
            let key = store
                .generate_key(&ServiceAlias::new(name), &spec(family, SecurityLevel::Any, AuthValidity::default()))
                .unwrap();
            assert_eq!(roundtrip(&store, &key, b"s3cret").unwrap(), b"s3cret");
        }
    }

    #[test]
    fn test_presence_key_requires_authentication_to_decrypt() {
        let store = SoftwareKeystore::new();
        let key = store
            .generate_key(
                &ServiceAlias::new("bio"),
                &spec(KeyFamily::Asymmetric, SecurityLevel::RequiresPresence, AuthValidity::Seconds(30)),
            )
            .unwrap();

        // Public encryption is never gated.
        let ciphertext = store
            .open_cipher(Direction::Encrypt, &key)
            .unwrap()
            .process(b"alice")
            .unwrap();

        assert!(matches!(
            store.open_cipher(Direction::Decrypt, &key),
            Err(Error::AuthenticationRequired(_))
        ));

        store.record_user_presence();
        let mut cipher = store.open_cipher(Direction::Decrypt, &key).unwrap();
        assert_eq!(cipher.process(&ciphertext).unwrap(), b"alice");
    }

    #[test]
    fn test_zero_window_never_authorizes() {
        let store = SoftwareKeystore::new();
        let key = store
            .generate_key(
                &ServiceAlias::new("bio"),
                &spec(KeyFamily::Asymmetric, SecurityLevel::RequiresPresence, AuthValidity::Seconds(0)),
            )
            .unwrap();

        store.record_user_presence();
        assert!(matches!(
            store.open_cipher(Direction::Decrypt, &key),
            Err(Error::AuthenticationRequired(_))
        ));
    }

    #[test]
    fn test_single_use_authorization_is_consumed() {
        let store = SoftwareKeystore::new();
        let key = store
            .generate_key(
                &ServiceAlias::new("bio"),
                &spec(KeyFamily::Asymmetric, SecurityLevel::RequiresPresence, AuthValidity::SingleUse),
            )
            .unwrap();

        store.record_user_presence();
        let ciphertext = store.open_cipher(Direction::Encrypt, &key).unwrap().process(b"a").unwrap();
        let mut cipher = store.open_cipher(Direction::Decrypt, &key).unwrap();

        // One opening covers several messages.
        assert_eq!(cipher.process(&ciphertext).unwrap(), b"a");
        assert_eq!(cipher.process(&ciphertext).unwrap(), b"a");

        assert!(matches!(
            store.open_cipher(Direction::Decrypt, &key),
            Err(Error::AuthenticationRequired(_))
        ));
    }

    #[test]
    fn test_invalidated_key_never_opens() {
        let store = SoftwareKeystore::new();
        let alias = ServiceAlias::new("bio");
        let key = store
            .generate_key(&alias, &spec(KeyFamily::Asymmetric, SecurityLevel::RequiresPresence, AuthValidity::Seconds(30)))
            .unwrap();

        store.invalidate_key(&alias).unwrap();
        store.record_user_presence();

        assert!(matches!(
            store.open_cipher(Direction::Decrypt, &key),
            Err(Error::KeyInvalidated(_))
        ));
        assert!(matches!(
            store.invalidate_key(&ServiceAlias::new("missing")),
            Err(Error::KeyNotFound(_))
        ));
    }

    #[test]
    fn test_delete_key() {
        let store = SoftwareKeystore::new();
        let alias = ServiceAlias::new("github");
        let key = store
            .generate_key(&alias, &spec(KeyFamily::Symmetric, SecurityLevel::Any, AuthValidity::default()))
            .unwrap();

        store.delete_key(&alias).unwrap();
        assert!(!store.contains_alias(&alias).unwrap());
        assert!(matches!(store.delete_key(&alias), Err(Error::KeyNotFound(_))));
        assert!(matches!(
            store.open_cipher(Direction::Decrypt, &key),
            Err(Error::KeyNotFound(_))
        ));
    }

    #[test]
    fn test_wrong_ciphertext_fails_cleanly() {
        let store = SoftwareKeystore::new();
        let key = store
            .generate_key(&ServiceAlias::new("a"), &spec(KeyFamily::Symmetric, SecurityLevel::Any, AuthValidity::default()))
            .unwrap();

        let result = store.open_cipher(Direction::Decrypt, &key).unwrap().process(b"garbage");
        assert!(matches!(result, Err(Error::CryptoFailed(_))));
    }

    #[test]
    fn test_file_persistence() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("keys").join("keystore.json");
        let alias = ServiceAlias::new("github");

        let ciphertext = {
            let store = SoftwareKeystore::open(&path).unwrap();
            let key = store
                .generate_key(&alias, &spec(KeyFamily::Asymmetric, SecurityLevel::Any, AuthValidity::default()))
                .unwrap();
            store.open_cipher(Direction::Encrypt, &key).unwrap().process(b"s3cret").unwrap()
        };

        let reopened = SoftwareKeystore::open(&path).unwrap();
        let key = reopened.fetch_key(&alias).unwrap().unwrap();
        assert!(reopened.created_at(&alias).unwrap().is_some());

        let plaintext = reopened
            .open_cipher(Direction::Decrypt, &key)
            .unwrap()
            .process(&ciphertext)
            .unwrap();
        assert_eq!(plaintext, b"s3cret");
    }

    #[test]
    fn test_file_persists_invalidation_and_deletion() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("keystore.json");

        {
            let store = SoftwareKeystore::open(&path).unwrap();
            for name in ["keep", "drop"] {
                store
                    .generate_key(&ServiceAlias::new(name), &spec(KeyFamily::Symmetric, SecurityLevel::Any, AuthValidity::default()))
                    .unwrap();
            }
            store.invalidate_key(&ServiceAlias::new("keep")).unwrap();
            store.delete_key(&ServiceAlias::new("drop")).unwrap();
        }

        let reopened = SoftwareKeystore::open(&path).unwrap();
        assert_eq!(reopened.aliases().unwrap(), vec![ServiceAlias::new("keep")]);

        let key = reopened.fetch_key(&ServiceAlias::new("keep")).unwrap().unwrap();
        assert!(matches!(
            reopened.open_cipher(Direction::Decrypt, &key),
            Err(Error::KeyInvalidated(_))
        ));
    }

    /// Occupy the temporary path with a directory so the atomic write fails.
    fn block_writes(path: &Path) {
        std::fs::create_dir(path.with_extension("tmp")).unwrap();
    }

    #[test]
    fn test_failed_delete_keeps_key() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("keystore.json");
        let alias = ServiceAlias::new("github");

        let store = SoftwareKeystore::open(&path).unwrap();
        store
            .generate_key(&alias, &spec(KeyFamily::Symmetric, SecurityLevel::Any, AuthValidity::default()))
            .unwrap();
        block_writes(&path);

        assert!(matches!(store.delete_key(&alias), Err(Error::KeyAccess(_))));
        assert!(store.contains_alias(&alias).unwrap());

        let reopened = SoftwareKeystore::open(&path).unwrap();
        assert!(reopened.contains_alias(&alias).unwrap());
    }

    #[test]
    fn test_failed_invalidation_leaves_key_usable() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("keystore.json");
        let alias = ServiceAlias::new("bio");

        let store = SoftwareKeystore::open(&path).unwrap();
        let key = store
            .generate_key(&alias, &spec(KeyFamily::Asymmetric, SecurityLevel::RequiresPresence, AuthValidity::Seconds(30)))
            .unwrap();
        block_writes(&path);

        assert!(matches!(store.invalidate_key(&alias), Err(Error::KeyAccess(_))));

        // Memory agrees with disk: the key was never revoked.
        store.record_user_presence();
        assert!(store.open_cipher(Direction::Decrypt, &key).is_ok());

        std::fs::remove_dir(path.with_extension("tmp")).unwrap();
        store.invalidate_key(&alias).unwrap();

        let reopened = SoftwareKeystore::open(&path).unwrap();
        reopened.record_user_presence();
        assert!(matches!(
            reopened.open_cipher(Direction::Decrypt, &key),
            Err(Error::KeyInvalidated(_))
        ));
    }

    #[test]
    fn test_stale_single_use_grant_is_not_redeemable() {
        let store = SoftwareKeystore::new();
        let key = store
            .generate_key(
                &ServiceAlias::new("bio"),
                &spec(KeyFamily::Asymmetric, SecurityLevel::RequiresPresence, AuthValidity::SingleUse),
            )
            .unwrap();

        store.record_user_presence();
        {
            let mut presence = store.presence.lock().unwrap();
            let backdated = Instant::now()
                .checked_sub(SINGLE_USE_GRANT_TTL * 2)
                .unwrap();
            presence.single_use_granted_at = Some(backdated);
        }

        assert!(matches!(
            store.open_cipher(Direction::Decrypt, &key),
            Err(Error::AuthenticationRequired(_))
        ));
    }

    #[test]
    fn test_corrupt_file_is_key_access_error() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("keystore.json");
        std::fs::write(&path, b"not json").unwrap();

        assert!(matches!(SoftwareKeystore::open(&path), Err(Error::KeyAccess(_))));
    }
}
