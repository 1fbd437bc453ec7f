//! Key generation parameters.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

use credvault_common::SecurityLevel;

/// Algorithm family of a managed key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyFamily {
    /// X25519 key pair; encryption uses the public half.
    Asymmetric,
    /// XChaCha20-Poly1305 secret key.
    Symmetric,
}

impl KeyFamily {
    /// Fixed key size in bits for this family.
    pub fn key_size(self) -> u32 {
        match self {
            KeyFamily::Asymmetric => 256,
            KeyFamily::Symmetric => 256,
        }
    }
}

impl fmt::Display for KeyFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyFamily::Asymmetric => write!(f, "asymmetric"),
            KeyFamily::Symmetric => write!(f, "symmetric"),
        }
    }
}

/// How long a successful user-presence check keeps a key usable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthValidity {
    /// The authorization covers exactly one cipher opening.
    SingleUse,
    /// The authorization lasts this many seconds. Zero never authorizes.
    Seconds(u64),
}

impl AuthValidity {
    /// The window as a duration, `None` for single use.
    pub fn window(self) -> Option<Duration> {
        match self {
            AuthValidity::SingleUse => None,
            AuthValidity::Seconds(secs) => Some(Duration::from_secs(secs)),
        }
    }
}

impl Default for AuthValidity {
    fn default() -> Self {
        AuthValidity::Seconds(1)
    }
}

/// Parameters a key is generated with.
///
/// Fixed per family apart from the presence requirement, which follows the
/// caller's [`SecurityLevel`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeySpec {
    /// Algorithm family.
    pub family: KeyFamily,
    /// Key size in bits.
    pub key_size: u32,
    /// Whether every decryption needs a live user-presence check.
    pub user_presence_required: bool,
    /// How long one presence check keeps the key usable.
    pub validity: AuthValidity,
    /// Whether encryption must be randomized. Always true for generated keys.
    pub randomized_encryption: bool,
}

impl KeySpec {
    /// Build the spec for a family and a requested security level.
    pub fn for_level(family: KeyFamily, level: SecurityLevel, validity: AuthValidity) -> Self {
        Self {
            family,
            key_size: family.key_size(),
            user_presence_required: level.requires_presence(),
            validity,
            randomized_encryption: true,
        }
    }

    /// The security level a key with this spec actually provides.
    pub fn security_level(&self) -> SecurityLevel {
        if self.user_presence_required {
            SecurityLevel::RequiresPresence
        } else {
            SecurityLevel::Any
        }
    }
}
