use std::path::PathBuf;
use thiserror::Error;

/// All errors that can occur in KeyVault.
#[derive(Debug, Error)]
pub enum KeyVaultError {
    // --- Crypto errors ---
    #[error("Encryption failed: {0}")]
    EncryptionFailed(String),

    #[error("Decryption failed — wrong password or corrupted data")]
    DecryptionFailed,

    #[error("Key derivation failed: {0}")]
    KeyDerivationFailed(String),

    // --- Vault errors ---
    /// Covers both a wrong master password and a damaged envelope.
    #[error("Failed to unlock vault — invalid master password or corrupted file")]
    VaultUnlock,

    #[error("API key '{key_name}' not found for provider '{provider}'")]
    KeyNotFound { provider: String, key_name: String },

    #[error("API key '{key_name}' expired on {expired_on}")]
    KeyExpired { key_name: String, expired_on: String },

    #[error("API key '{0}' is currently disabled")]
    KeyDisabled(String),

    #[error("Storage error at {path}: {message}")]
    Storage { path: PathBuf, message: String },

    // --- Session errors ---
    #[error("Invalid master password")]
    Authentication,

    #[error("Session expired or invalid — log in again")]
    SessionExpired,

    // --- Input errors ---
    #[error("Validation failed: {0}")]
    Validation(String),

    // --- Config errors ---
    #[error("Config file error: {0}")]
    ConfigError(String),

    // --- IO errors ---
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // --- Serialization errors ---
    #[error("Serialization error: {0}")]
    SerializationError(String),

    // --- CLI errors ---
    #[error("Command failed: {0}")]
    CommandFailed(String),

    // --- Server errors ---
    #[error("Server error: {0}")]
    Server(String),
}

impl KeyVaultError {
    /// Build a `Storage` error for `path` from any displayable cause.
    pub fn storage(path: impl Into<PathBuf>, cause: impl std::fmt::Display) -> Self {
        Self::Storage {
            path: path.into(),
            message: cause.to_string(),
        }
    }
}

/// Convenience type alias for KeyVault results.
pub type Result<T> = std::result::Result<T, KeyVaultError>;
