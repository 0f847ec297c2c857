//! Whole-document vault encryption.
//!
//! `VaultCipher::encrypt` turns an opaque payload into a self-contained
//! `VaultEnvelope`: a fresh random salt and IV on every call, a key
//! derived with PBKDF2, AES-256-CBC over the payload, and an
//! HMAC-SHA256 tag over `iv || ciphertext` (encrypt-then-MAC).
//!
//! On disk the envelope is JSON with hex-encoded fields:
//!
//! ```text
//! { "encrypted": "<hex>", "salt": "<hex>", "iv": "<hex>", "iterations": 100000, "mac": "<hex>" }
//! ```
//!
//! `iterations` and `mac` are optional on read.  Envelopes that only
//! carry the first three fields decrypt with 100 000 iterations and no
//! integrity check, in which case a bad padding byte is the only signal
//! of a wrong password.

use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use zeroize::Zeroize;

use crate::errors::{KeyVaultError, Result};

use super::encryption::{self, generate_iv, IV_LEN};
use super::kdf::{derive_key_with_params, generate_salt, Pbkdf2Params, SALT_LEN};
use super::keys::DerivedKey;

/// The encrypted, serializable form of a vault document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VaultEnvelope {
    /// AES-256-CBC ciphertext of the document JSON.
    #[serde(serialize_with = "hex_encode", deserialize_with = "hex_decode")]
    pub encrypted: Vec<u8>,

    /// PBKDF2 salt (32 bytes).
    #[serde(serialize_with = "hex_encode", deserialize_with = "hex_decode")]
    pub salt: Vec<u8>,

    /// CBC initialization vector (16 bytes).
    #[serde(serialize_with = "hex_encode", deserialize_with = "hex_decode")]
    pub iv: Vec<u8>,

    /// PBKDF2 iteration count.  Absent in envelopes written by older
    /// tools, which always used 100 000.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iterations: Option<u32>,

    /// HMAC-SHA256 over `iv || encrypted`.  Absent in older envelopes.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        serialize_with = "hex_encode_opt",
        deserialize_with = "hex_decode_opt"
    )]
    pub mac: Option<Vec<u8>>,
}

impl VaultEnvelope {
    /// PBKDF2 params this envelope was sealed with.
    ///
    /// Counts below the minimum are refused so a tampered file cannot
    /// downgrade the KDF.
    fn params(&self) -> Result<Pbkdf2Params> {
        match self.iterations {
            None => Ok(Pbkdf2Params::default()),
            Some(n) => Pbkdf2Params::new(n).map_err(|_| KeyVaultError::DecryptionFailed),
        }
    }
}

/// Encrypts and decrypts whole vault payloads under a master password.
#[derive(Debug, Clone, Copy, Default)]
pub struct VaultCipher {
    params: Pbkdf2Params,
}

impl VaultCipher {
    /// Create a cipher that seals new envelopes with `params`.
    pub fn new(params: Pbkdf2Params) -> Self {
        Self { params }
    }

    /// PBKDF2 params used for new envelopes.
    pub fn params(&self) -> Pbkdf2Params {
        self.params
    }

    /// Encrypt `plaintext` under `password` with a fresh salt and IV.
    pub fn encrypt(&self, plaintext: &[u8], password: &[u8]) -> Result<VaultEnvelope> {
        let salt = generate_salt();
        let iv = generate_iv();
        let key = DerivedKey::new(derive_key_with_params(password, &salt, &self.params));

        let encrypted = encryption::encrypt(key.as_bytes(), &iv, plaintext)?;
        let mac = compute_mac(&key, &iv, &encrypted)?;

        Ok(VaultEnvelope {
            encrypted,
            salt: salt.to_vec(),
            iv: iv.to_vec(),
            iterations: Some(self.params.iterations),
            mac: Some(mac),
        })
    }

    /// Decrypt an envelope with `password`.
    ///
    /// Re-derives the key from the envelope's own salt and iteration
    /// count.  Every failure is `DecryptionFailed`: a wrong password and
    /// a damaged envelope are deliberately indistinguishable.
    pub fn decrypt(&self, envelope: &VaultEnvelope, password: &[u8]) -> Result<Vec<u8>> {
        if envelope.salt.len() != SALT_LEN || envelope.iv.len() != IV_LEN {
            return Err(KeyVaultError::DecryptionFailed);
        }

        let params = envelope.params()?;
        let key = DerivedKey::new(derive_key_with_params(password, &envelope.salt, &params));

        if let Some(ref expected) = envelope.mac {
            verify_mac(&key, &envelope.iv, &envelope.encrypted, expected)?;
        }

        encryption::decrypt(key.as_bytes(), &envelope.iv, &envelope.encrypted)
    }
}

/// Compute HMAC-SHA256 over `iv || ciphertext` with the key's MAC sub-key.
fn compute_mac(key: &DerivedKey, iv: &[u8], ciphertext: &[u8]) -> Result<Vec<u8>> {
    let mac = keyed_mac(key, iv, ciphertext)?;
    Ok(mac.finalize().into_bytes().to_vec())
}

/// Verify the envelope tag in constant time.
fn verify_mac(key: &DerivedKey, iv: &[u8], ciphertext: &[u8], expected: &[u8]) -> Result<()> {
    keyed_mac(key, iv, ciphertext)?
        .verify_slice(expected)
        .map_err(|_| KeyVaultError::DecryptionFailed)
}

fn keyed_mac(key: &DerivedKey, iv: &[u8], ciphertext: &[u8]) -> Result<Hmac<Sha256>> {
    let mut mac_key = key.derive_mac_key()?;
    let mac = Hmac::<Sha256>::new_from_slice(&mac_key);
    mac_key.zeroize();

    let mut mac = mac.map_err(|e| KeyVaultError::EncryptionFailed(format!("invalid MAC key: {e}")))?;
    mac.update(iv);
    mac.update(ciphertext);
    Ok(mac)
}

// ---------------------------------------------------------------------------
// Serde helpers for hex-encoded Vec<u8> fields
// ---------------------------------------------------------------------------

fn hex_encode<S>(data: &[u8], serializer: S) -> std::result::Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    serializer.serialize_str(&hex::encode(data))
}

fn hex_decode<'de, D>(deserializer: D) -> std::result::Result<Vec<u8>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    hex::decode(s).map_err(serde::de::Error::custom)
}

fn hex_encode_opt<S>(data: &Option<Vec<u8>>, serializer: S) -> std::result::Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    match data {
        Some(bytes) => serializer.serialize_some(&hex::encode(bytes)),
        None => serializer.serialize_none(),
    }
}

fn hex_decode_opt<'de, D>(deserializer: D) -> std::result::Result<Option<Vec<u8>>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer)?
        .map(|s| hex::decode(s).map_err(serde::de::Error::custom))
        .transpose()
}
