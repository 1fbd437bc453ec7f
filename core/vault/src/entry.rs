//! Persisted credential entry.

use serde::{Deserialize, Serialize};

use credvault_common::{Error, Result};

/// The persisted unit of one credential: two ciphertexts produced under the
/// same key, tagged with the storage that produced them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VaultEntry {
    #[serde(with = "base64_bytes")]
    encrypted_username: Vec<u8>,
    #[serde(with = "base64_bytes")]
    encrypted_password: Vec<u8>,
    storage_name: String,
}

impl VaultEntry {
    /// Bundle two ciphertexts with the name of the storage that made them.
    pub fn encode(
        encrypted_username: Vec<u8>,
        encrypted_password: Vec<u8>,
        storage_name: impl Into<String>,
    ) -> Self {
        Self {
            encrypted_username,
            encrypted_password,
            storage_name: storage_name.into(),
        }
    }

    /// Borrow the parts: `(encrypted_username, encrypted_password, storage_name)`.
    pub fn decode(&self) -> (&[u8], &[u8], &str) {
        (
            &self.encrypted_username,
            &self.encrypted_password,
            &self.storage_name,
        )
    }

    /// Ciphertext of the username.
    pub fn encrypted_username(&self) -> &[u8] {
        &self.encrypted_username
    }

    /// Ciphertext of the password.
    pub fn encrypted_password(&self) -> &[u8] {
        &self.encrypted_password
    }

    /// Storage that produced the entry.
    pub fn storage_name(&self) -> &str {
        &self.storage_name
    }

    /// Serialize to JSON bytes.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        serde_json::to_vec(self).map_err(|e| Error::Serialization(e.to_string()))
    }

    /// Deserialize from JSON bytes.
    ///
    /// # Errors
    /// - `Serialization` if the bytes are not an entry
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        serde_json::from_slice(bytes).map_err(|e| Error::Serialization(e.to_string()))
    }
}

mod base64_bytes {
    use base64::{engine::general_purpose::STANDARD, Engine as _};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        STANDARD.decode(encoded).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_returns_parts() {
        let entry = VaultEntry::encode(vec![1, 2, 3], vec![4, 5], "KeystoreX25519Sealed");
        let (username, password, storage) = entry.decode();

        assert_eq!(username, &[1, 2, 3]);
        assert_eq!(password, &[4, 5]);
        assert_eq!(storage, "KeystoreX25519Sealed");
    }

    #[test]
    fn test_json_fields_are_base64() {
        let entry = VaultEntry::encode(vec![0xff, 0x00], Vec::new(), "KeystoreXChaCha20Poly1305");
        let json: serde_json::Value = serde_json::from_slice(&entry.to_bytes().unwrap()).unwrap();

        assert_eq!(json["encrypted_username"], "/wA=");
        assert_eq!(json["encrypted_password"], "");
        assert_eq!(json["storage_name"], "KeystoreXChaCha20Poly1305");

        assert_eq!(VaultEntry::from_bytes(&entry.to_bytes().unwrap()).unwrap(), entry);
    }

    #[test]
    fn test_malformed_input() {
        assert!(matches!(
            VaultEntry::from_bytes(b"{\"encrypted_username\":\"***\"}"),
            Err(Error::Serialization(_))
        ));
        assert!(VaultEntry::from_bytes(b"").is_err());
    }
}
