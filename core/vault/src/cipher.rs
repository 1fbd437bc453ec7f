//! Byte transform under a managed key.

use std::sync::Arc;

use crate::outcome::DecryptionResult;
use credvault_common::{Error, Result, SensitiveBytes};
use credvault_crypto::sealed;
use credvault_keystore::{Direction, KeyBackend, KeyFamily, ManagedKey, SealedCipher};

/// Encrypts and decrypts byte sequences with one fixed transformation.
///
/// Every input is one complete message of any length; the caller never
/// sees block sizes or padding.
#[derive(Clone)]
pub struct Cipher {
    backend: Arc<dyn KeyBackend>,
    family: KeyFamily,
}

impl Cipher {
    /// Create a cipher for one key family.
    pub fn new(backend: Arc<dyn KeyBackend>, family: KeyFamily) -> Self {
        Self { backend, family }
    }

    /// Key family this cipher accepts.
    pub fn family(&self) -> KeyFamily {
        self.family
    }

    /// Name of the transformation.
    pub fn transformation(&self) -> &'static str {
        match self.family {
            KeyFamily::Asymmetric => "X25519/BLAKE2b/XChaCha20-Poly1305",
            KeyFamily::Symmetric => "XChaCha20-Poly1305",
        }
    }

    /// Transform `input` under `key`.
    ///
    /// # Errors
    /// - `AuthenticationRequired` if decrypting needs a fresh presence check
    /// - `KeyInvalidated` if the key's authorization was revoked
    /// - `KeyNotFound` if the key was deleted
    /// - `CryptoFailed` if the key belongs to another family, or `input`
    ///   is not a ciphertext produced under `key`
    pub fn transform(&self, direction: Direction, key: &ManagedKey, input: &[u8]) -> Result<Vec<u8>> {
        self.check_family(key)?;

        match (self.family, direction) {
            (KeyFamily::Asymmetric, Direction::Encrypt) => {
                let public_key = key.public_key().ok_or_else(|| {
                    Error::CryptoFailed(format!("Key {} has no public half", key.alias()))
                })?;
                sealed::seal(public_key, input)
            }
            _ => self.backend.open_cipher(direction, key)?.process(input),
        }
    }

    /// Open a decryptor once; every message it processes is covered by the
    /// same authorization.
    ///
    /// # Errors
    /// Same as [`Cipher::transform`] for opening.
    pub fn open_decryptor(&self, key: &ManagedKey) -> Result<Box<dyn SealedCipher>> {
        self.check_family(key)?;
        self.backend.open_cipher(Direction::Decrypt, key)
    }

    /// Decrypt both halves of a credential under one opening.
    pub(crate) fn decrypt_credentials(
        &self,
        key: &ManagedKey,
        encrypted_username: &[u8],
        encrypted_password: &[u8],
    ) -> Result<DecryptionResult> {
        let mut decryptor = self.open_decryptor(key)?;
        let username = SensitiveBytes::new(decryptor.process(encrypted_username)?);
        let password = SensitiveBytes::new(decryptor.process(encrypted_password)?);

        Ok(DecryptionResult::new(
            username.to_utf8()?,
            password.to_utf8()?,
            key.security_level(),
        ))
    }

    fn check_family(&self, key: &ManagedKey) -> Result<()> {
        if key.family() != self.family {
            return Err(Error::CryptoFailed(format!(
                "Key {} is {}, cipher expects {}",
                key.alias(),
                key.family(),
                self.family
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use credvault_common::{SecurityLevel, ServiceAlias};
    use credvault_keystore::{AuthValidity, KeySpec, SoftwareKeystore};

    fn setup(family: KeyFamily, level: SecurityLevel) -> (Arc<SoftwareKeystore>, Cipher, ManagedKey) {
        let keystore = Arc::new(SoftwareKeystore::new());
        let key = keystore
            .generate_key(
                &ServiceAlias::new("github"),
                &KeySpec::for_level(family, level, AuthValidity::Seconds(30)),
            )
            .unwrap();
        let cipher = Cipher::new(keystore.clone(), family);
        (keystore, cipher, key)
    }

    #[test]
    fn test_roundtrip_both_families() {
        for family in [KeyFamily::Asymmetric, KeyFamily::Symmetric] {
            let (_, cipher, key) = setup(family, SecurityLevel::Any);

            let ciphertext = cipher.transform(Direction::Encrypt, &key, b"s3cret").unwrap();
            assert_ne!(ciphertext.as_slice(), b"s3cret");
            assert_eq!(cipher.transform(Direction::Decrypt, &key, &ciphertext).unwrap(), b"s3cret");
        }
    }

    #[test]
    fn test_length_agnostic() {
        let (_, cipher, key) = setup(KeyFamily::Asymmetric, SecurityLevel::Any);

        for len in [0usize, 1, 245, 256, 4096] {
            let plaintext = vec![0x5a; len];
            let ciphertext = cipher.transform(Direction::Encrypt, &key, &plaintext).unwrap();
            assert_eq!(cipher.transform(Direction::Decrypt, &key, &ciphertext).unwrap(), plaintext);
        }
    }

    #[test]
    fn test_foreign_ciphertext_is_crypto_failure() {
        let (_, cipher, key) = setup(KeyFamily::Asymmetric, SecurityLevel::Any);
        let (_, other_cipher, other_key) = setup(KeyFamily::Asymmetric, SecurityLevel::Any);

        let foreign = other_cipher.transform(Direction::Encrypt, &other_key, b"alice").unwrap();
        assert!(matches!(
            cipher.transform(Direction::Decrypt, &key, &foreign),
            Err(Error::CryptoFailed(_))
        ));
        assert!(matches!(
            cipher.transform(Direction::Decrypt, &key, b"short"),
            Err(Error::CryptoFailed(_))
        ));
    }

    #[test]
    fn test_family_mismatch() {
        let (keystore, _, key) = setup(KeyFamily::Symmetric, SecurityLevel::Any);
        let cipher = Cipher::new(keystore, KeyFamily::Asymmetric);

        assert!(matches!(
            cipher.transform(Direction::Encrypt, &key, b"alice"),
            Err(Error::CryptoFailed(_))
        ));
    }

    #[test]
    fn test_presence_key_signals_authentication_required() {
        let (keystore, cipher, key) = setup(KeyFamily::Asymmetric, SecurityLevel::RequiresPresence);

        let username = cipher.transform(Direction::Encrypt, &key, b"alice").unwrap();
        let password = cipher.transform(Direction::Encrypt, &key, b"s3cret").unwrap();

        assert!(matches!(
            cipher.decrypt_credentials(&key, &username, &password),
            Err(Error::AuthenticationRequired(_))
        ));

        keystore.record_user_presence();
        let result = cipher.decrypt_credentials(&key, &username, &password).unwrap();
        assert_eq!(result.username(), "alice");
        assert_eq!(result.password(), "s3cret");
        assert_eq!(result.security_level(), SecurityLevel::RequiresPresence);
    }

    #[test]
    fn test_one_opening_covers_both_halves() {
        let keystore = Arc::new(SoftwareKeystore::new());
        let key = keystore
            .generate_key(
                &ServiceAlias::new("bio"),
                &KeySpec::for_level(KeyFamily::Asymmetric, SecurityLevel::RequiresPresence, AuthValidity::SingleUse),
            )
            .unwrap();
        let cipher = Cipher::new(keystore.clone(), KeyFamily::Asymmetric);

        let username = cipher.transform(Direction::Encrypt, &key, b"alice").unwrap();
        let password = cipher.transform(Direction::Encrypt, &key, b"s3cret").unwrap();

        keystore.record_user_presence();
        assert!(cipher.decrypt_credentials(&key, &username, &password).is_ok());
        assert!(matches!(
            cipher.decrypt_credentials(&key, &username, &password),
            Err(Error::AuthenticationRequired(_))
        ));
    }

    #[test]
    fn test_invalid_utf8_is_crypto_failure() {
        let (_, cipher, key) = setup(KeyFamily::Symmetric, SecurityLevel::Any);

        let username = cipher.transform(Direction::Encrypt, &key, &[0xff, 0xfe]).unwrap();
        let password = cipher.transform(Direction::Encrypt, &key, b"ok").unwrap();

        assert!(matches!(
            cipher.decrypt_credentials(&key, &username, &password),
            Err(Error::CryptoFailed(_))
        ));
    }
}
