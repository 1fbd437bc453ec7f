//! Secure key backend abstraction for credvault.
//!
//! This module provides a trait-based interface over hardware- or
//! OS-backed key stores (Android Keystore, Secure Enclave, TPM) and a
//! software implementation for development and testing.
//!
//! # Design Principles
//! - Key material never leaves the backend: callers hold [`ManagedKey`]
//!   handles and ask the backend to open a cipher for them
//! - Access control is the backend's job: opening a cipher against a key
//!   that needs a fresh user-presence check fails with
//!   `Error::AuthenticationRequired`, and against a revoked key with
//!   `Error::KeyInvalidated`
//! - Alias uniqueness is the backend's job: concurrent generation under the
//!   same alias yields a single key

pub mod backend;
pub mod handle;
pub mod manager;
pub mod software;
pub mod spec;

pub use backend::{KeyBackend, SealedCipher};
pub use handle::{Direction, ManagedKey};
pub use manager::KeyManager;
pub use software::SoftwareKeystore;
pub use spec::{AuthValidity, KeyFamily, KeySpec};
