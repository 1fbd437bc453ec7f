//! Handles to backend-resident keys.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::spec::{KeyFamily, KeySpec};
use credvault_common::{SecurityLevel, ServiceAlias};

/// Direction of a cipher transform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    /// Plaintext to ciphertext.
    Encrypt,
    /// Ciphertext to plaintext.
    Decrypt,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Encrypt => write!(f, "encrypt"),
            Direction::Decrypt => write!(f, "decrypt"),
        }
    }
}

/// Handle to a key living in a secure backend.
///
/// Carries only public information: the alias, the generation spec and,
/// for asymmetric keys, the public half. Secret material stays in the
/// backend that issued the handle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManagedKey {
    alias: ServiceAlias,
    spec: KeySpec,
    public_key: Option<Vec<u8>>,
}

impl ManagedKey {
    /// Create a handle. Called by backends.
    pub fn new(alias: ServiceAlias, spec: KeySpec, public_key: Option<Vec<u8>>) -> Self {
        Self {
            alias,
            spec,
            public_key,
        }
    }

    /// Alias the key is stored under.
    pub fn alias(&self) -> &ServiceAlias {
        &self.alias
    }

    /// Generation parameters.
    pub fn spec(&self) -> &KeySpec {
        &self.spec
    }

    /// Algorithm family.
    pub fn family(&self) -> KeyFamily {
        self.spec.family
    }

    /// Whether decryption needs a fresh user-presence check.
    pub fn requires_user_presence(&self) -> bool {
        self.spec.user_presence_required
    }

    /// Security level this key provides.
    pub fn security_level(&self) -> SecurityLevel {
        self.spec.security_level()
    }

    /// Public half of an asymmetric key.
    pub fn public_key(&self) -> Option<&[u8]> {
        self.public_key.as_deref()
    }
}
