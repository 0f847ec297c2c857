//! Cryptographic primitives for KeyVault.
//!
//! This module provides:
//! - PBKDF2-HMAC-SHA256 password-based key derivation (`kdf`)
//! - AES-256-CBC encryption and decryption (`encryption`)
//! - HKDF-based MAC key derivation and the zeroizing key wrapper (`keys`)
//! - Whole-vault envelope sealing and opening (`cipher`)

pub mod cipher;
pub mod encryption;
pub mod kdf;
pub mod keys;

// Re-export the most commonly used items so callers can write:
//   use crate::crypto::{VaultCipher, VaultEnvelope, derive_key, ...};
pub use cipher::{VaultCipher, VaultEnvelope};
pub use encryption::{decrypt, encrypt, generate_iv};
pub use kdf::{derive_key, derive_key_with_params, generate_salt, Pbkdf2Params};
pub use keys::{derive_mac_key, DerivedKey};
