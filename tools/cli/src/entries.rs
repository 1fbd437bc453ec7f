//! Entry files in the data directory, one JSON file per service.

use anyhow::{Context, Result};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use std::path::{Path, PathBuf};

use credvault_common::ServiceAlias;
use credvault_vault::VaultEntry;

/// Directory of persisted vault entries.
pub struct EntryStore {
    dir: PathBuf,
}

impl EntryStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// File holding the entry for `alias`. The alias is encoded so that any
    /// service name maps to a valid, unique file name.
    fn path_for(&self, alias: &ServiceAlias) -> PathBuf {
        self.dir
            .join(format!("{}.json", URL_SAFE_NO_PAD.encode(alias.as_str())))
    }

    pub fn save(&self, alias: &ServiceAlias, entry: &VaultEntry) -> Result<()> {
        std::fs::create_dir_all(&self.dir)
            .with_context(|| format!("Failed to create {}", self.dir.display()))?;

        let path = self.path_for(alias);
        std::fs::write(&path, entry.to_bytes()?)
            .with_context(|| format!("Failed to write {}", path.display()))
    }

    pub fn load(&self, alias: &ServiceAlias) -> Result<Option<VaultEntry>> {
        let path = self.path_for(alias);
        if !path.exists() {
            return Ok(None);
        }

        let bytes = std::fs::read(&path).with_context(|| format!("Failed to read {}", path.display()))?;
        Ok(Some(VaultEntry::from_bytes(&bytes)?))
    }

    /// Delete the entry for `alias`. Returns whether one existed.
    pub fn remove(&self, alias: &ServiceAlias) -> Result<bool> {
        let path = self.path_for(alias);
        if !path.exists() {
            return Ok(false);
        }

        std::fs::remove_file(&path).with_context(|| format!("Failed to remove {}", path.display()))?;
        Ok(true)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}
