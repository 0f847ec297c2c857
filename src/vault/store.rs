//! High-level vault operations used by the CLI and the HTTP service.
//!
//! `VaultStore` owns the single envelope file.  Every operation is a
//! self-contained load → mutate → save cycle: the document is decrypted,
//! changed in memory, re-encrypted under a fresh salt and IV, and written
//! back atomically.  Nothing stays unlocked between calls.
//!
//! All cycles run under one in-process mutex, so a store shared behind an
//! `Arc` can serve concurrent callers without losing updates.

use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::Utc;
use zeroize::Zeroize;

use crate::crypto::{Pbkdf2Params, VaultCipher};
use crate::errors::{KeyVaultError, Result};

use super::document::{validate_name, KeyListing, KeyOptions, KeyRecord, VaultDocument};
use super::format;

/// Minimum length, in characters, of a newly chosen master password.
pub const MIN_PASSWORD_LEN: usize = 8;

/// Enforce the policy for newly chosen master passwords.
///
/// Applied by `initialize` and `change_password`; existing vaults still
/// unlock with whatever password they were created with.
pub fn check_new_password(password: &str) -> Result<()> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(KeyVaultError::Validation(format!(
            "password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    Ok(())
}

/// Handle on one vault file.
#[derive(Debug)]
pub struct VaultStore {
    /// Path to the envelope file on disk.
    path: PathBuf,

    /// Seals new envelopes (carries the configured PBKDF2 params).
    cipher: VaultCipher,

    /// Serializes load-mutate-save cycles.
    lock: Mutex<()>,
}

impl VaultStore {
    // ------------------------------------------------------------------
    // Construction
    // ------------------------------------------------------------------

    /// Open a handle on `path` using the default PBKDF2 params.
    ///
    /// No file access happens here; the file may not exist yet.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self::with_params(path, Pbkdf2Params::default())
    }

    /// Open a handle that seals new envelopes with `params`.
    pub fn with_params(path: impl Into<PathBuf>, params: Pbkdf2Params) -> Self {
        Self {
            path: path.into(),
            cipher: VaultCipher::new(params),
            lock: Mutex::new(()),
        }
    }

    // ------------------------------------------------------------------
    // Document lifecycle
    // ------------------------------------------------------------------

    /// Returns `true` if the vault file exists.  Nothing is decrypted.
    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Decrypt and return the whole document.
    ///
    /// A missing file yields a fresh empty document; that is how callers
    /// detect a vault that still needs initializing.  Any failure while
    /// reading, parsing, or decrypting is reported as `VaultUnlock`.
    pub fn load(&self, password: &[u8]) -> Result<VaultDocument> {
        let _guard = self.guard();
        self.load_unlocked(password)
    }

    /// Encrypt `document` under `password` and replace the vault file.
    pub fn save(&self, document: &VaultDocument, password: &[u8]) -> Result<()> {
        let _guard = self.guard();
        self.save_unlocked(document, password)
    }

    /// Create the vault file with an empty document.
    pub fn initialize(&self, password: &[u8]) -> Result<VaultDocument> {
        check_new_password(&String::from_utf8_lossy(password))?;

        let _guard = self.guard();

        if self.exists() {
            return Err(KeyVaultError::CommandFailed(format!(
                "vault already exists at {}",
                self.path.display()
            )));
        }

        let document = VaultDocument::new();
        self.save_unlocked(&document, password)?;
        tracing::info!(path = %self.path.display(), "vault initialized");
        Ok(document)
    }

    // ------------------------------------------------------------------
    // Key operations
    // ------------------------------------------------------------------

    /// Add or replace the key `(provider, key_name)`.
    ///
    /// Replacing a key starts its lifecycle over: new `created`, no
    /// `lastUsed`, usage count zero.
    pub fn add_key(
        &self,
        provider: &str,
        key_name: &str,
        secret: &str,
        password: &[u8],
        options: KeyOptions,
    ) -> Result<()> {
        validate_name("provider", provider)?;
        validate_name("key name", key_name)?;
        if secret.is_empty() {
            return Err(KeyVaultError::Validation("API key cannot be empty".into()));
        }

        let _guard = self.guard();
        let mut document = self.load_unlocked(password)?;

        let now = Utc::now();
        document.upsert(provider, key_name, KeyRecord::new(secret, options, now));
        document.touch(now);

        self.save_unlocked(&document, password)?;
        tracing::debug!(provider, key_name, "API key stored");
        Ok(())
    }

    /// Return the secret for `(provider, key_name)`.
    ///
    /// Fails if the key is missing, disabled, or expired.  A successful
    /// read stamps `lastUsed`, bumps the usage count, and saves the vault.
    pub fn get_key(&self, provider: &str, key_name: &str, password: &[u8]) -> Result<String> {
        let _guard = self.guard();
        let mut document = self.load_unlocked(password)?;

        let now = Utc::now();
        let record = document
            .get_mut(provider, key_name)
            .ok_or_else(|| KeyVaultError::KeyNotFound {
                provider: provider.to_string(),
                key_name: key_name.to_string(),
            })?;

        record.ensure_usable(key_name, now)?;
        record.record_use(now);
        let secret = record.secret.clone();
        let usage_count = record.usage_count;

        self.save_unlocked(&document, password)?;
        tracing::debug!(provider, key_name, usage_count, "API key retrieved");
        Ok(secret)
    }

    /// List every key, grouped by provider, without secret values.
    pub fn list_keys(&self, password: &[u8]) -> Result<KeyListing> {
        Ok(self.load(password)?.summaries())
    }

    /// Remove `(provider, key_name)`.
    ///
    /// Returns `false` when there was nothing to remove; the file is only
    /// rewritten when a record was actually deleted.
    pub fn delete_key(&self, provider: &str, key_name: &str, password: &[u8]) -> Result<bool> {
        let _guard = self.guard();
        let mut document = self.load_unlocked(password)?;

        if document.remove(provider, key_name).is_none() {
            return Ok(false);
        }

        document.touch(Utc::now());
        self.save_unlocked(&document, password)?;
        tracing::debug!(provider, key_name, "API key deleted");
        Ok(true)
    }

    /// Re-encrypt the whole vault under `new_password`.
    ///
    /// The old envelope (salt, IV, ciphertext) is discarded entirely.
    pub fn change_password(&self, old_password: &[u8], new_password: &[u8]) -> Result<()> {
        check_new_password(&String::from_utf8_lossy(new_password))?;

        let _guard = self.guard();
        let document = self.load_unlocked(old_password)?;
        self.save_unlocked(&document, new_password)?;

        tracing::info!(
            path = %self.path.display(),
            keys = document.key_count(),
            "master password changed"
        );
        Ok(())
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    /// Returns the path to the vault file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    // ------------------------------------------------------------------
    // Internals (caller holds the lock)
    // ------------------------------------------------------------------

    fn guard(&self) -> MutexGuard<'_, ()> {
        // The mutex guards no data, so a poisoned lock is still usable.
        self.lock.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn load_unlocked(&self, password: &[u8]) -> Result<VaultDocument> {
        if !self.exists() {
            return Ok(VaultDocument::new());
        }

        self.decrypt_document(password).map_err(|e| {
            // Keep the cause out of user-facing errors.
            tracing::debug!(path = %self.path.display(), error = %e, "vault unlock failed");
            KeyVaultError::VaultUnlock
        })
    }

    fn decrypt_document(&self, password: &[u8]) -> Result<VaultDocument> {
        let envelope = format::read_envelope(&self.path)?;
        let mut plaintext = self.cipher.decrypt(&envelope, password)?;

        let parsed = serde_json::from_slice(&plaintext)
            .map_err(|e| KeyVaultError::SerializationError(format!("vault document: {e}")));
        plaintext.zeroize();
        parsed
    }

    fn save_unlocked(&self, document: &VaultDocument, password: &[u8]) -> Result<()> {
        let mut plaintext = serde_json::to_vec_pretty(document)
            .map_err(|e| KeyVaultError::SerializationError(format!("vault document: {e}")))?;

        let envelope = self.cipher.encrypt(&plaintext, password);
        plaintext.zeroize();

        format::write_envelope(&self.path, &envelope?)
    }
}
