//! Common types used throughout credvault.

use serde::{Deserialize, Serialize};
use std::fmt;
use zeroize::Zeroize;

/// Alias substituted for an empty service name.
pub const DEFAULT_SERVICE: &str = "RN_KEYCHAIN_DEFAULT_ALIAS";

/// Identifier of one vault entry and of the backend key protecting it.
///
/// Always non-empty: an empty service name is normalized to
/// [`DEFAULT_SERVICE`]. The inner string is used verbatim as the key alias
/// in the secure backend.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct ServiceAlias(String);

impl ServiceAlias {
    /// Normalize a caller-supplied service name into an alias.
    ///
    /// # Postconditions
    /// - The returned alias is never empty
    /// - Non-empty input is kept verbatim
    pub fn new(service: impl Into<String>) -> Self {
        let service = service.into();
        if service.is_empty() {
            Self(DEFAULT_SERVICE.to_string())
        } else {
            Self(service)
        }
    }

    /// Get the inner string value.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether this alias is the default substituted for an empty service.
    pub fn is_default(&self) -> bool {
        self.0 == DEFAULT_SERVICE
    }
}

impl Default for ServiceAlias {
    fn default() -> Self {
        Self(DEFAULT_SERVICE.to_string())
    }
}

impl From<String> for ServiceAlias {
    fn from(service: String) -> Self {
        Self::new(service)
    }
}

impl From<&str> for ServiceAlias {
    fn from(service: &str) -> Self {
        Self::new(service)
    }
}

impl From<ServiceAlias> for String {
    fn from(alias: ServiceAlias) -> Self {
        alias.0
    }
}

impl fmt::Display for ServiceAlias {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Protection a caller asks for, and the protection actually obtained.
///
/// Ordered from weakest to strongest so that an achieved level can be
/// checked against a requested one with [`SecurityLevel::satisfies`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SecurityLevel {
    /// Encrypted at rest, no user-presence requirement.
    Any,
    /// Every decryption must be preceded by a live user-presence check.
    RequiresPresence,
}

impl SecurityLevel {
    /// Whether this (achieved) level meets the `requested` level.
    pub fn satisfies(self, requested: SecurityLevel) -> bool {
        self >= requested
    }

    /// Whether keys for this level must demand re-authentication.
    pub fn requires_presence(self) -> bool {
        self == SecurityLevel::RequiresPresence
    }
}

impl Default for SecurityLevel {
    fn default() -> Self {
        SecurityLevel::Any
    }
}

impl fmt::Display for SecurityLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SecurityLevel::Any => write!(f, "ANY"),
            SecurityLevel::RequiresPresence => write!(f, "REQUIRES_PRESENCE"),
        }
    }
}

/// Sensitive data wrapper that zeroizes on drop.
#[derive(Clone, Zeroize)]
#[zeroize(drop)]
pub struct SensitiveBytes(Vec<u8>);

impl SensitiveBytes {
    /// Create new sensitive bytes.
    pub fn new(data: Vec<u8>) -> Self {
        Self(data)
    }

    /// Get a reference to the inner bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Get the length.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Check if empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Interpret the bytes as UTF-8 text.
    ///
    /// # Errors
    /// - Returns `CryptoFailed` if the bytes are not valid UTF-8, which for
    ///   decrypted output means the ciphertext did not hold a credential
    pub fn to_utf8(&self) -> crate::Result<String> {
        std::str::from_utf8(&self.0)
            .map(str::to_owned)
            .map_err(|e| crate::Error::CryptoFailed(format!("Decrypted value is not UTF-8: {}", e)))
    }
}

impl fmt::Debug for SensitiveBytes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SensitiveBytes([REDACTED; {} bytes])", self.0.len())
    }
}
