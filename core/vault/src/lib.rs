//! Credential vault for credvault.
//!
//! This module provides:
//! - Envelope encryption of (username, password) pairs under per-service
//!   backend keys
//! - The persisted entry codec
//! - An authentication gate that suspends decryption behind a
//!   user-presence challenge and resumes it exactly once
//!
//! # Architecture
//! The vault sits between the caller and a [`credvault_keystore::KeyBackend`].
//! Key material never leaves the backend; the vault holds handles and asks
//! the backend to open ciphers. When the backend refuses to open a cipher
//! until the user proves presence, the gate takes over and answers through
//! a [`PendingResult`].

pub mod authenticator;
pub mod cipher;
pub mod config;
pub mod entry;
pub mod gate;
pub mod outcome;
pub mod storage;
pub mod testing;
pub mod vault;

pub use authenticator::{Authenticator, ChallengeId, ChallengeResponder, PromptInfo};
pub use cipher::Cipher;
pub use config::{ConfigVersion, VaultConfig, CONFIG_FILENAME};
pub use entry::VaultEntry;
pub use gate::AuthenticationGate;
pub use outcome::{DecryptOutcome, DecryptionResult, PendingResult};
pub use storage::{storage_name, CipherStorage, ASYMMETRIC_STORAGE_NAME, SYMMETRIC_STORAGE_NAME};
pub use vault::CredentialVault;
