//! AES-256-CBC encryption with PKCS#7 padding.
//!
//! CBC carries no authentication tag of its own; integrity is provided
//! one level up by the envelope MAC (see `cipher`).  A wrong key usually
//! shows up here as a padding error, which is reported as
//! `DecryptionFailed`.

use aes::cipher::block_padding::Pkcs7;
use aes::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use rand::RngCore;

use crate::errors::{KeyVaultError, Result};

type Aes256CbcEnc = cbc::Encryptor<aes::Aes256>;
type Aes256CbcDec = cbc::Decryptor<aes::Aes256>;

/// Size of the CBC initialization vector in bytes.
pub const IV_LEN: usize = 16;

/// Generate a fresh random 16-byte IV.
pub fn generate_iv() -> [u8; IV_LEN] {
    let mut iv = [0u8; IV_LEN];
    rand::rng().fill_bytes(&mut iv);
    iv
}

/// Encrypt `plaintext` with a 32-byte `key` and 16-byte `iv`.
pub fn encrypt(key: &[u8], iv: &[u8], plaintext: &[u8]) -> Result<Vec<u8>> {
    let cipher = Aes256CbcEnc::new_from_slices(key, iv)
        .map_err(|e| KeyVaultError::EncryptionFailed(format!("invalid key or IV length: {e}")))?;

    Ok(cipher.encrypt_padded_vec_mut::<Pkcs7>(plaintext))
}

/// Decrypt data produced by `encrypt` with the same key and IV.
pub fn decrypt(key: &[u8], iv: &[u8], ciphertext: &[u8]) -> Result<Vec<u8>> {
    // Whole blocks only; anything else cannot have come from `encrypt`.
    if ciphertext.is_empty() || ciphertext.len() % IV_LEN != 0 {
        return Err(KeyVaultError::DecryptionFailed);
    }

    let cipher =
        Aes256CbcDec::new_from_slices(key, iv).map_err(|_| KeyVaultError::DecryptionFailed)?;

    cipher
        .decrypt_padded_vec_mut::<Pkcs7>(ciphertext)
        .map_err(|_| KeyVaultError::DecryptionFailed)
}
