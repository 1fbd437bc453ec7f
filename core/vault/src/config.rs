//! Vault configuration.

use serde::{Deserialize, Serialize};

use crate::authenticator::PromptInfo;
use credvault_common::{Error, Result, ServiceAlias};
use credvault_keystore::{AuthValidity, KeyFamily};

/// Configuration format version for migration support.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigVersion {
    pub major: u32,
    pub minor: u32,
}

impl ConfigVersion {
    /// Current configuration format version.
    pub const CURRENT: Self = Self { major: 1, minor: 0 };

    /// Check if this version is compatible with the current version.
    pub fn is_compatible(&self) -> bool {
        self.major == Self::CURRENT.major
    }
}

impl Default for ConfigVersion {
    fn default() -> Self {
        Self::CURRENT
    }
}

/// Vault configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VaultConfig {
    /// Configuration format version.
    pub version: ConfigVersion,
    /// Key family, which selects the storage variant.
    pub family: KeyFamily,
    /// Alias used when a caller passes an empty service.
    pub default_alias: ServiceAlias,
    /// How long one presence check keeps a new key usable.
    pub auth_validity: AuthValidity,
    /// Prompt text handed to the authenticator.
    pub prompt: PromptInfo,
}

impl VaultConfig {
    /// Configuration for one key family with default settings.
    pub fn for_family(family: KeyFamily) -> Self {
        Self {
            family,
            ..Self::default()
        }
    }

    /// Serialize configuration to JSON.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| Error::Serialization(e.to_string()))
    }

    /// Deserialize configuration from JSON.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| Error::Serialization(e.to_string()))
    }

    /// Serialize to bytes for storage.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        serde_json::to_vec(self).map_err(|e| Error::Serialization(e.to_string()))
    }

    /// Deserialize from bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        serde_json::from_slice(bytes).map_err(|e| Error::Serialization(e.to_string()))
    }
}

impl Default for VaultConfig {
    fn default() -> Self {
        Self {
            version: ConfigVersion::CURRENT,
            family: KeyFamily::Asymmetric,
            default_alias: ServiceAlias::default(),
            auth_validity: AuthValidity::default(),
            prompt: PromptInfo::default(),
        }
    }
}

/// Configuration file name in the data directory.
pub const CONFIG_FILENAME: &str = "config.json";
