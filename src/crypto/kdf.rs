//! Password-based key derivation using PBKDF2-HMAC-SHA256.
//!
//! PBKDF2 is deliberately slow: every guess at the master password costs
//! the attacker the full iteration count.  The iteration count is stored
//! in the envelope so existing vaults keep opening after the default is
//! raised.

use pbkdf2::pbkdf2_hmac;
use rand::RngCore;
use sha2::Sha256;

use crate::errors::{KeyVaultError, Result};

/// Length of the salt in bytes (256 bits).
pub const SALT_LEN: usize = 32;

/// Length of the derived key in bytes (256 bits, for AES-256).
pub const KEY_LEN: usize = 32;

/// Default and minimum PBKDF2 iteration count.
pub const MIN_ITERATIONS: u32 = 100_000;

/// Configurable PBKDF2 parameters.
///
/// Maps to `pbkdf2_iterations` in `Settings` so the CLI can pass
/// whatever the user configured in `.keyvault.toml`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pbkdf2Params {
    /// Number of HMAC-SHA256 rounds (default: 100 000).
    pub iterations: u32,
}

impl Default for Pbkdf2Params {
    fn default() -> Self {
        Self {
            iterations: MIN_ITERATIONS,
        }
    }
}

impl Pbkdf2Params {
    /// Build params, rejecting iteration counts below `MIN_ITERATIONS`.
    pub fn new(iterations: u32) -> Result<Self> {
        if iterations < MIN_ITERATIONS {
            return Err(KeyVaultError::KeyDerivationFailed(format!(
                "PBKDF2 iterations must be at least {MIN_ITERATIONS} (got {iterations})"
            )));
        }
        Ok(Self { iterations })
    }
}

/// Derive a 32-byte key from a password and salt with the default params.
///
/// The same password + salt will always produce the same key.
pub fn derive_key(password: &[u8], salt: &[u8]) -> [u8; KEY_LEN] {
    derive_key_with_params(password, salt, &Pbkdf2Params::default())
}

/// Derive a 32-byte key with explicit PBKDF2 parameters.
pub fn derive_key_with_params(password: &[u8], salt: &[u8], params: &Pbkdf2Params) -> [u8; KEY_LEN] {
    let mut key = [0u8; KEY_LEN];
    pbkdf2_hmac::<Sha256>(password, salt, params.iterations, &mut key);
    key
}

/// Generate a cryptographically random 32-byte salt.
pub fn generate_salt() -> [u8; SALT_LEN] {
    let mut salt = [0u8; SALT_LEN];
    rand::rng().fill_bytes(&mut salt);
    salt
}
