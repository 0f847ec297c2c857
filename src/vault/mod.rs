//! Vault module: the encrypted key store.
//!
//! This module provides:
//! - `VaultDocument`, `KeyRecord` and the listing types (`document`)
//! - Envelope file reading and atomic writing (`format`)
//! - High-level `VaultStore` with the key CRUD API (`store`)

pub mod document;
pub mod format;
pub mod store;

// Re-export the most commonly used items.
pub use document::{
    parse_timestamp, DocumentMetadata, Expiration, KeyListing, KeyOptions, KeyRecord, KeySummary,
    VaultDocument,
};
pub use format::DEFAULT_VAULT_FILE;
pub use store::{check_new_password, VaultStore, MIN_PASSWORD_LEN};
