//! Cryptographic primitives for credvault.
//!
//! This module provides:
//! - Authenticated encryption using XChaCha20-Poly1305
//! - Sealed boxes (ephemeral X25519 + BLAKE2b + XChaCha20-Poly1305) for
//!   public-key encryption of short secrets
//! - Key types with automatic zeroization
//!
//! # Security Guarantees
//! - All key material is automatically zeroized on drop
//! - No plaintext or key material is ever logged
//! - Every encryption is randomized; equal plaintexts never produce equal
//!   ciphertexts

pub mod aead;
pub mod keys;
pub mod sealed;

pub use aead::{decrypt, encrypt};
pub use keys::{KeyPair, SymmetricKey, KEY_LENGTH, PUBLIC_KEY_LENGTH};
pub use sealed::{open, seal};
