//! The decrypted vault document and its key records.
//!
//! A `VaultDocument` only ever exists in memory for the duration of one
//! vault operation.  Its JSON shape is:
//!
//! ```text
//! { "keys": { provider: { keyName: KeyRecord } }, "metadata": { "created": ..., "modified": ... } }
//! ```
//!
//! Field names follow the camelCase shape existing vaults were written
//! with, so documents decrypted from older files parse unchanged.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

use crate::errors::{KeyVaultError, Result};

/// Key records of one provider, by key name.
pub type ProviderKeys = BTreeMap<String, KeyRecord>;

/// Per-provider listing returned by `VaultStore::list_keys`.
pub type KeyListing = BTreeMap<String, Vec<KeySummary>>;

/// Maximum length of a provider or key name.
const MAX_NAME_LEN: usize = 256;

// ---------------------------------------------------------------------------
// VaultDocument
// ---------------------------------------------------------------------------

/// The plaintext vault: every stored key record plus document timestamps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VaultDocument {
    /// provider -> key name -> record.  Never holds an empty provider map.
    #[serde(default)]
    pub keys: BTreeMap<String, ProviderKeys>,

    pub metadata: DocumentMetadata,
}

/// Creation and last-modification timestamps of the document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentMetadata {
    pub created: DateTime<Utc>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modified: Option<DateTime<Utc>>,
}

impl Default for VaultDocument {
    fn default() -> Self {
        Self::new()
    }
}

impl VaultDocument {
    /// A fresh, empty document stamped with the current time.
    pub fn new() -> Self {
        Self {
            keys: BTreeMap::new(),
            metadata: DocumentMetadata {
                created: Utc::now(),
                modified: None,
            },
        }
    }

    /// Insert or replace the record for `(provider, key_name)`.
    pub fn upsert(&mut self, provider: &str, key_name: &str, record: KeyRecord) {
        self.keys
            .entry(provider.to_string())
            .or_default()
            .insert(key_name.to_string(), record);
    }

    /// Look up a record.
    pub fn get(&self, provider: &str, key_name: &str) -> Option<&KeyRecord> {
        self.keys.get(provider)?.get(key_name)
    }

    /// Look up a record for mutation.
    pub fn get_mut(&mut self, provider: &str, key_name: &str) -> Option<&mut KeyRecord> {
        self.keys.get_mut(provider)?.get_mut(key_name)
    }

    /// Remove a record, dropping the provider entry once it is empty.
    pub fn remove(&mut self, provider: &str, key_name: &str) -> Option<KeyRecord> {
        let provider_keys = self.keys.get_mut(provider)?;
        let removed = provider_keys.remove(key_name);

        if provider_keys.is_empty() {
            self.keys.remove(provider);
        }

        removed
    }

    /// Record that the document was changed at `now`.
    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.metadata.modified = Some(now);
    }

    /// Total number of key records across all providers.
    pub fn key_count(&self) -> usize {
        self.keys.values().map(BTreeMap::len).sum()
    }

    /// Project every record into a secret-free summary, sorted by
    /// provider and key name.
    pub fn summaries(&self) -> KeyListing {
        self.keys
            .iter()
            .map(|(provider, records)| {
                let list = records
                    .iter()
                    .map(|(name, record)| record.summary(name))
                    .collect();
                (provider.clone(), list)
            })
            .collect()
    }
}

// ---------------------------------------------------------------------------
// KeyRecord
// ---------------------------------------------------------------------------

/// One stored API key plus its lifecycle metadata.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyRecord {
    /// The raw key material.
    #[serde(rename = "key")]
    pub secret: String,

    /// Set once at insertion.
    pub created: DateTime<Utc>,

    /// Unreadable values load as `None`.
    #[serde(default, deserialize_with = "tolerant_timestamp_opt")]
    pub last_used: Option<DateTime<Utc>>,

    #[serde(default)]
    pub usage_count: u64,

    #[serde(default, deserialize_with = "stored_expiration_opt")]
    pub expiration_date: Option<Expiration>,

    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub tags: Vec<String>,

    #[serde(default = "default_active")]
    pub is_active: bool,

    #[serde(default = "default_environment")]
    pub environment: String,

    /// The options object the record was created with, kept verbatim.
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

fn default_active() -> bool {
    true
}

fn default_environment() -> String {
    "development".to_string()
}

impl std::fmt::Debug for KeyRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyRecord")
            .field("secret", &"[REDACTED]")
            .field("created", &self.created)
            .field("last_used", &self.last_used)
            .field("usage_count", &self.usage_count)
            .field("expiration_date", &self.expiration_date)
            .field("is_active", &self.is_active)
            .field("environment", &self.environment)
            .finish_non_exhaustive()
    }
}

impl KeyRecord {
    /// Build a brand-new record: never used, usage count zero.
    pub fn new(secret: &str, options: KeyOptions, now: DateTime<Utc>) -> Self {
        let metadata = match serde_json::to_value(&options) {
            Ok(Value::Object(map)) => map,
            _ => Map::new(),
        };

        Self {
            secret: secret.to_string(),
            created: now,
            last_used: None,
            usage_count: 0,
            expiration_date: options.expiration_date.map(Expiration::At),
            description: options.description.unwrap_or_default(),
            tags: options.tags,
            is_active: options.is_active.unwrap_or(true),
            environment: options.environment.unwrap_or_else(default_environment),
            metadata,
        }
    }

    /// The expiration instant, if the stored date could be read.
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.expiration_date.as_ref().and_then(Expiration::instant)
    }

    /// `true` once `now` is past the expiration date.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at().is_some_and(|exp| now > exp)
    }

    /// Check that the record may be handed out at `now`.
    ///
    /// A disabled record is reported as disabled even when it has also
    /// expired.
    pub fn ensure_usable(&self, key_name: &str, now: DateTime<Utc>) -> Result<()> {
        if !self.is_active {
            return Err(KeyVaultError::KeyDisabled(key_name.to_string()));
        }

        if let Some(exp) = self.expires_at().filter(|_| self.is_expired(now)) {
            return Err(KeyVaultError::KeyExpired {
                key_name: key_name.to_string(),
                expired_on: exp.format("%Y-%m-%d").to_string(),
            });
        }

        Ok(())
    }

    /// Stamp a successful retrieval.
    pub fn record_use(&mut self, now: DateTime<Utc>) {
        self.last_used = Some(now);
        self.usage_count = self.usage_count.saturating_add(1);
    }

    /// Secret-free projection of this record.
    pub fn summary(&self, name: &str) -> KeySummary {
        KeySummary {
            name: name.to_string(),
            created: self.created,
            last_used: self.last_used,
            usage_count: self.usage_count,
            is_active: self.is_active,
            expiration_date: self.expires_at(),
            metadata: self.metadata.clone(),
        }
    }
}

// ---------------------------------------------------------------------------
// Expiration
// ---------------------------------------------------------------------------

/// A stored `expirationDate`.
///
/// Vaults may hold dates in any shape a client once sent. Text that does
/// not parse is kept as written and never expires.
#[derive(Debug, Clone, PartialEq)]
pub enum Expiration {
    At(DateTime<Utc>),
    Unparsed(String),
}

impl Expiration {
    /// Read a stored value; `None` for an empty string.
    pub fn from_stored(raw: &str) -> Option<Self> {
        if raw.trim().is_empty() {
            return None;
        }
        Some(match parse_timestamp(raw) {
            Some(ts) => Self::At(ts),
            None => {
                tracing::debug!(value = raw, "unreadable expirationDate, key treated as non-expiring");
                Self::Unparsed(raw.to_string())
            }
        })
    }

    pub fn instant(&self) -> Option<DateTime<Utc>> {
        match self {
            Self::At(ts) => Some(*ts),
            Self::Unparsed(_) => None,
        }
    }
}

impl Serialize for Expiration {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Self::At(ts) => ts.serialize(serializer),
            Self::Unparsed(raw) => serializer.serialize_str(raw),
        }
    }
}

// ---------------------------------------------------------------------------
// KeyOptions / KeySummary
// ---------------------------------------------------------------------------

/// Optional descriptive fields supplied when adding a key.
///
/// Unknown fields are kept in `extra` and end up in the record's
/// free-form `metadata`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyOptions {
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient_timestamp_opt"
    )]
    pub expiration_date: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub environment: Option<String>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Lightweight view of a key record (no secret value).
///
/// Returned by `VaultStore::list_keys` so callers can display key
/// names and lifecycle data without touching any key material.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeySummary {
    pub name: String,
    pub created: DateTime<Utc>,
    pub last_used: Option<DateTime<Utc>>,
    pub usage_count: u64,
    pub is_active: bool,
    pub expiration_date: Option<DateTime<Utc>>,
    pub metadata: Map<String, Value>,
}

// ---------------------------------------------------------------------------
// Names and timestamps
// ---------------------------------------------------------------------------

/// Validate a provider or key name: non-empty, at most 256 characters,
/// no control characters.
pub fn validate_name(kind: &str, name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(KeyVaultError::Validation(format!("{kind} cannot be empty")));
    }
    if name.chars().count() > MAX_NAME_LEN {
        return Err(KeyVaultError::Validation(format!(
            "{kind} cannot exceed {MAX_NAME_LEN} characters"
        )));
    }
    if name.chars().any(char::is_control) {
        return Err(KeyVaultError::Validation(format!(
            "{kind} '{}' contains control characters",
            name.escape_debug()
        )));
    }
    Ok(())
}

/// ISO 8601 date-times without an offset, as `datetime-local` inputs send.
const NAIVE_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
];

/// Parse an ISO 8601 timestamp.
///
/// Accepts RFC 3339, a date-time without offset (read as UTC), or a bare
/// `YYYY-MM-DD` date (midnight UTC).
pub fn parse_timestamp(input: &str) -> Option<DateTime<Utc>> {
    let input = input.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(input) {
        return Some(ts.with_timezone(&Utc));
    }
    if let Some(naive) = NAIVE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(input, fmt).ok())
    {
        return Some(naive.and_utc());
    }
    NaiveDate::parse_from_str(input, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
}

/// Stored records: any JSON value is accepted, see `Expiration`.
fn stored_expiration_opt<'de, D>(deserializer: D) -> std::result::Result<Option<Expiration>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Null => None,
        Value::String(raw) => Expiration::from_stored(&raw),
        other => Expiration::from_stored(&other.to_string()),
    })
}

/// Stored records: unreadable timestamps become `None`.
fn tolerant_timestamp_opt<'de, D>(deserializer: D) -> std::result::Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(raw) => parse_timestamp(&raw),
        _ => None,
    })
}

/// Incoming options: `null`, `""` or a timestamp `parse_timestamp` accepts.
fn lenient_timestamp_opt<'de, D>(deserializer: D) -> std::result::Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<String>::deserialize(deserializer)? {
        None => Ok(None),
        Some(s) if s.trim().is_empty() => Ok(None),
        Some(s) => parse_timestamp(&s)
            .map(Some)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp '{s}'"))),
    }
}
