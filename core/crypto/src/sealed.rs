//! Sealed boxes: public-key encryption of short secrets.
//!
//! Anyone holding the recipient's public key can seal; only the holder of
//! the secret key can open. Each seal uses a fresh ephemeral X25519 key, so
//! the output is randomized even for identical plaintexts.
//!
//! # Format
//! `ephemeral_public (32) || nonce (24) || ciphertext || tag (16)`
//!
//! The AEAD key is `BLAKE2b-256(shared || ephemeral_public ||
//! recipient_public || "credvault-sealed-v1")`.

use blake2::digest::consts::U32;
use blake2::{Blake2b, Digest};
use chacha20poly1305::aead::OsRng;
use x25519_dalek::{EphemeralSecret, PublicKey, SharedSecret};
use zeroize::Zeroize;

use crate::aead::{self, NONCE_SIZE, TAG_SIZE};
use crate::keys::{KeyPair, KEY_LENGTH, PUBLIC_KEY_LENGTH};
use credvault_common::{Error, Result};

const DOMAIN: &[u8] = b"credvault-sealed-v1";

/// Smallest valid sealed box (empty plaintext).
pub const MIN_SEALED_SIZE: usize = PUBLIC_KEY_LENGTH + NONCE_SIZE + TAG_SIZE;

fn derive_box_key(
    shared: &SharedSecret,
    ephemeral: &PublicKey,
    recipient: &PublicKey,
) -> Result<[u8; KEY_LENGTH]> {
    if !shared.was_contributory() {
        return Err(Error::CryptoFailed(
            "Key agreement produced a non-contributory secret".to_string(),
        ));
    }

    let mut hasher = Blake2b::<U32>::new();
    hasher.update(shared.as_bytes());
    hasher.update(ephemeral.as_bytes());
    hasher.update(recipient.as_bytes());
    hasher.update(DOMAIN);

    let mut key = [0u8; KEY_LENGTH];
    key.copy_from_slice(&hasher.finalize());
    Ok(key)
}

/// Seal plaintext to a recipient public key.
///
/// # Errors
/// - Returns `CryptoFailed` if the public key is malformed or low-order
pub fn seal(recipient_public: &[u8], plaintext: &[u8]) -> Result<Vec<u8>> {
    let recipient: [u8; PUBLIC_KEY_LENGTH] = recipient_public.try_into().map_err(|_| {
        Error::CryptoFailed(format!(
            "Invalid public key length: expected {}, got {}",
            PUBLIC_KEY_LENGTH,
            recipient_public.len()
        ))
    })?;
    let recipient = PublicKey::from(recipient);

    let ephemeral_secret = EphemeralSecret::random_from_rng(OsRng);
    let ephemeral_public = PublicKey::from(&ephemeral_secret);
    let shared = ephemeral_secret.diffie_hellman(&recipient);

    let mut key = derive_box_key(&shared, &ephemeral_public, &recipient)?;
    let sealed = aead::encrypt(&key, plaintext);
    key.zeroize();
    let sealed = sealed?;

    let mut result = Vec::with_capacity(PUBLIC_KEY_LENGTH + sealed.len());
    result.extend_from_slice(ephemeral_public.as_bytes());
    result.extend_from_slice(&sealed);
    Ok(result)
}

/// Open a sealed box with the recipient key pair.
///
/// # Errors
/// - Returns `CryptoFailed` if the box is truncated, was sealed to another
///   key, or has been tampered with
pub fn open(recipient: &KeyPair, sealed: &[u8]) -> Result<Vec<u8>> {
    if sealed.len() < MIN_SEALED_SIZE {
        return Err(Error::CryptoFailed("Sealed box too short".to_string()));
    }

    let (ephemeral_bytes, ciphertext) = sealed.split_at(PUBLIC_KEY_LENGTH);
    let mut ephemeral = [0u8; PUBLIC_KEY_LENGTH];
    ephemeral.copy_from_slice(ephemeral_bytes);
    let ephemeral_public = PublicKey::from(ephemeral);
    let recipient_public = PublicKey::from(recipient.public_bytes());

    let shared = recipient.secret().diffie_hellman(&ephemeral_public);
    let mut key = derive_box_key(&shared, &ephemeral_public, &recipient_public)?;
    let plaintext = aead::decrypt(&key, ciphertext);
    key.zeroize();
    plaintext
}
