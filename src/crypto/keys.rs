//! Key helpers built on HKDF-SHA256.
//!
//! The PBKDF2 output is used directly as the AES key (that keeps the
//! ciphertext readable by any tool that understands the plain envelope).
//! A separate MAC key is expanded from it so the envelope integrity tag
//! never reuses the encryption key.

use hkdf::Hkdf;
use sha2::Sha256;
use zeroize::Zeroize;

use crate::errors::{KeyVaultError, Result};

use super::kdf::KEY_LEN;

/// HKDF `info` string binding the sub-key to envelope authentication.
const MAC_KEY_INFO: &[u8] = b"keyvault-envelope-mac";

/// Derive the envelope MAC key from a derived vault key.
pub fn derive_mac_key(vault_key: &[u8]) -> Result<[u8; KEY_LEN]> {
    hkdf_derive(vault_key, MAC_KEY_INFO)
}

/// Internal helper: run HKDF-SHA256 expand with the given `info`.
///
/// The input already came out of PBKDF2, so no extract salt is used.
fn hkdf_derive(ikm: &[u8], info: &[u8]) -> Result<[u8; KEY_LEN]> {
    let hk = Hkdf::<Sha256>::new(None, ikm);

    let mut okm = [0u8; KEY_LEN];
    hk.expand(info, &mut okm)
        .map_err(|e| KeyVaultError::KeyDerivationFailed(format!("HKDF expand failed: {e}")))?;

    Ok(okm)
}

/// A 32-byte key derived from the master password.
///
/// Zeroes its memory when dropped so the key cannot linger after the
/// single operation it was derived for.
#[derive(Zeroize)]
#[zeroize(drop)]
pub struct DerivedKey {
    bytes: [u8; KEY_LEN],
}

impl DerivedKey {
    /// Wrap raw key bytes.
    pub fn new(bytes: [u8; KEY_LEN]) -> Self {
        Self { bytes }
    }

    /// Access the raw key bytes.
    pub fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.bytes
    }

    /// Derive the envelope MAC key from this key.
    pub fn derive_mac_key(&self) -> Result<[u8; KEY_LEN]> {
        derive_mac_key(&self.bytes)
    }
}

impl std::fmt::Debug for DerivedKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("DerivedKey([REDACTED])")
    }
}
