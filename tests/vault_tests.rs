//! Integration tests for the KeyVault vault module.

use std::fs;
use std::sync::Arc;
use std::thread;

use chrono::{Duration, Utc};
use keyvault::crypto::{derive_key, encrypt, generate_iv, generate_salt};
use keyvault::errors::KeyVaultError;
use keyvault::vault::{KeyOptions, VaultStore};
use tempfile::TempDir;

const PW: &[u8] = b"test-password";

/// Helper: a store on a vault path inside a fresh temp dir.
fn store() -> (TempDir, VaultStore) {
    let dir = TempDir::new().expect("create temp dir");
    let store = VaultStore::new(dir.path().join("keys.encrypted.json"));
    (dir, store)
}

/// Helper: write `document` the way older tools did (three hex fields,
/// 100k PBKDF2 rounds, no MAC).
fn write_legacy_vault(store: &VaultStore, document: &serde_json::Value) {
    let salt = generate_salt();
    let iv = generate_iv();
    let key = derive_key(PW, &salt);
    let ciphertext = encrypt(&key, &iv, document.to_string().as_bytes()).unwrap();
    let envelope = serde_json::json!({
        "encrypted": hex::encode(&ciphertext),
        "salt": hex::encode(salt),
        "iv": hex::encode(iv),
    });
    fs::write(store.path(), envelope.to_string()).unwrap();
}

fn add(store: &VaultStore, provider: &str, name: &str, secret: &str) {
    store
        .add_key(provider, name, secret, PW, KeyOptions::default())
        .expect("add key");
}

// ---------------------------------------------------------------------------
// Lifecycle
// ---------------------------------------------------------------------------

#[test]
fn initialize_creates_empty_vault() {
    let (_dir, store) = store();
    assert!(!store.exists());

    let doc = store.initialize(PW).expect("initialize");
    assert_eq!(doc.key_count(), 0);
    assert!(store.exists());
    assert!(store.list_keys(PW).unwrap().is_empty());
}

#[test]
fn initialize_twice_fails() {
    let (_dir, store) = store();
    store.initialize(PW).unwrap();
    assert!(matches!(
        store.initialize(PW),
        Err(KeyVaultError::CommandFailed(_))
    ));
}

#[test]
fn missing_vault_loads_as_empty_document() {
    let (_dir, store) = store();
    let doc = store.load(PW).expect("load missing vault");
    assert_eq!(doc.key_count(), 0);
    assert!(!store.exists(), "loading must not create the file");
}

#[test]
fn first_add_creates_the_vault() {
    let (_dir, store) = store();
    add(&store, "OpenAI", "personal", "sk-first");
    assert!(store.exists());
    assert_eq!(store.get_key("OpenAI", "personal", PW).unwrap(), "sk-first");
}

// ---------------------------------------------------------------------------
// Add / get
// ---------------------------------------------------------------------------

#[test]
fn add_and_get_roundtrip() {
    let (_dir, store) = store();
    add(&store, "OpenAI", "personal", "sk-abc123");
    add(&store, "Anthropic", "work", "sk-ant-api03-xyz");

    assert_eq!(store.get_key("OpenAI", "personal", PW).unwrap(), "sk-abc123");
    assert_eq!(
        store.get_key("Anthropic", "work", PW).unwrap(),
        "sk-ant-api03-xyz"
    );
}

#[test]
fn get_records_usage() {
    let (_dir, store) = store();
    add(&store, "OpenAI", "personal", "sk-abc");

    let before = Utc::now();
    store.get_key("OpenAI", "personal", PW).unwrap();
    store.get_key("OpenAI", "personal", PW).unwrap();

    let listing = store.list_keys(PW).unwrap();
    let summary = &listing["OpenAI"][0];
    assert_eq!(summary.usage_count, 2);
    assert!(summary.last_used.unwrap() >= before);
}

#[test]
fn re_adding_a_key_resets_its_lifecycle() {
    let (_dir, store) = store();
    add(&store, "OpenAI", "personal", "sk-old");
    store.get_key("OpenAI", "personal", PW).unwrap();

    add(&store, "OpenAI", "personal", "sk-new");

    let listing = store.list_keys(PW).unwrap();
    assert_eq!(listing["OpenAI"].len(), 1);
    assert_eq!(listing["OpenAI"][0].usage_count, 0);
    assert!(listing["OpenAI"][0].last_used.is_none());
    assert_eq!(store.get_key("OpenAI", "personal", PW).unwrap(), "sk-new");
}

#[test]
fn get_missing_key_is_not_found() {
    let (_dir, store) = store();
    add(&store, "OpenAI", "personal", "sk-abc");

    assert!(matches!(
        store.get_key("OpenAI", "work", PW),
        Err(KeyVaultError::KeyNotFound { .. })
    ));
    assert!(matches!(
        store.get_key("Groq", "personal", PW),
        Err(KeyVaultError::KeyNotFound { .. })
    ));
}

#[test]
fn disabled_key_is_refused() {
    let (_dir, store) = store();
    let options = KeyOptions {
        is_active: Some(false),
        ..KeyOptions::default()
    };
    store
        .add_key("OpenAI", "old", "sk-off", PW, options)
        .unwrap();

    assert!(matches!(
        store.get_key("OpenAI", "old", PW),
        Err(KeyVaultError::KeyDisabled(_))
    ));
}

#[test]
fn expired_key_is_refused_and_usage_untouched() {
    let (_dir, store) = store();
    let options = KeyOptions {
        expiration_date: Some(Utc::now() - Duration::days(1)),
        ..KeyOptions::default()
    };
    store
        .add_key("OpenAI", "stale", "sk-stale", PW, options)
        .unwrap();

    assert!(matches!(
        store.get_key("OpenAI", "stale", PW),
        Err(KeyVaultError::KeyExpired { .. })
    ));
    assert_eq!(store.list_keys(PW).unwrap()["OpenAI"][0].usage_count, 0);
}

#[test]
fn disabled_takes_precedence_over_expired() {
    let (_dir, store) = store();
    let options = KeyOptions {
        is_active: Some(false),
        expiration_date: Some(Utc::now() - Duration::days(1)),
        ..KeyOptions::default()
    };
    store.add_key("OpenAI", "both", "sk-x", PW, options).unwrap();

    assert!(matches!(
        store.get_key("OpenAI", "both", PW),
        Err(KeyVaultError::KeyDisabled(_))
    ));
}

#[test]
fn future_expiration_is_still_usable() {
    let (_dir, store) = store();
    let options = KeyOptions {
        expiration_date: Some(Utc::now() + Duration::days(30)),
        ..KeyOptions::default()
    };
    store.add_key("OpenAI", "fresh", "sk-ok", PW, options).unwrap();
    assert_eq!(store.get_key("OpenAI", "fresh", PW).unwrap(), "sk-ok");
}

#[test]
fn add_rejects_empty_fields() {
    let (_dir, store) = store();
    for (provider, name, secret) in [("", "n", "s"), ("p", " ", "s"), ("p", "n", "")] {
        assert!(matches!(
            store.add_key(provider, name, secret, PW, KeyOptions::default()),
            Err(KeyVaultError::Validation(_))
        ));
    }
    assert!(!store.exists(), "rejected adds must not touch the file");
}

// ---------------------------------------------------------------------------
// List / delete
// ---------------------------------------------------------------------------

#[test]
fn list_groups_by_provider_without_secrets() {
    let (_dir, store) = store();
    add(&store, "OpenAI", "a", "sk-secret-a");
    add(&store, "OpenAI", "b", "sk-secret-b");
    add(&store, "Groq", "main", "gsk-secret");

    let listing = store.list_keys(PW).unwrap();
    assert_eq!(listing.len(), 2);
    assert_eq!(listing["OpenAI"].len(), 2);

    let json = serde_json::to_string(&listing).unwrap();
    assert!(!json.contains("sk-secret-a"));
    assert!(!json.contains("gsk-secret"));
    assert!(json.contains("usageCount"));
}

#[test]
fn delete_reports_whether_anything_was_removed() {
    let (_dir, store) = store();
    add(&store, "OpenAI", "a", "sk-a");

    assert!(!store.delete_key("OpenAI", "missing", PW).unwrap());
    assert!(store.delete_key("OpenAI", "a", PW).unwrap());
    assert!(!store.delete_key("OpenAI", "a", PW).unwrap());
}

#[test]
fn deleting_last_key_prunes_provider() {
    let (_dir, store) = store();
    add(&store, "OpenAI", "a", "sk-a");
    add(&store, "Groq", "b", "gsk-b");

    store.delete_key("OpenAI", "a", PW).unwrap();

    let listing = store.list_keys(PW).unwrap();
    assert!(!listing.contains_key("OpenAI"));
    assert!(listing.contains_key("Groq"));
}

// ---------------------------------------------------------------------------
// Passwords and corruption
// ---------------------------------------------------------------------------

#[test]
fn wrong_password_fails_to_unlock() {
    let (_dir, store) = store();
    add(&store, "OpenAI", "a", "sk-a");

    assert!(matches!(
        store.list_keys(b"wrong-password"),
        Err(KeyVaultError::VaultUnlock)
    ));
    assert!(matches!(
        store.get_key("OpenAI", "a", b"wrong-password"),
        Err(KeyVaultError::VaultUnlock)
    ));
}

#[test]
fn corrupted_file_fails_like_wrong_password() {
    let (_dir, store) = store();
    add(&store, "OpenAI", "a", "sk-a");

    fs::write(store.path(), "this is not json").unwrap();
    assert!(matches!(store.load(PW), Err(KeyVaultError::VaultUnlock)));
}

#[test]
fn change_password_reencrypts_everything() {
    let (_dir, store) = store();
    add(&store, "OpenAI", "a", "sk-a");
    store
        .add_key(
            "Anthropic",
            "work",
            "sk-ant-b",
            PW,
            KeyOptions {
                expiration_date: Some(Utc::now() + Duration::days(30)),
                tags: vec!["team".into()],
                ..KeyOptions::default()
            },
        )
        .unwrap();
    store.get_key("OpenAI", "a", PW).unwrap();

    let document_before = store.load(PW).unwrap();
    let envelope_before: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(store.path()).unwrap()).unwrap();

    store.change_password(PW, b"new-password").unwrap();

    let envelope_after: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(store.path()).unwrap()).unwrap();
    assert_ne!(envelope_before["salt"], envelope_after["salt"]);
    assert_ne!(envelope_before["iv"], envelope_after["iv"]);

    assert!(matches!(store.load(PW), Err(KeyVaultError::VaultUnlock)));
    // Timestamps, usage counts and options come through untouched.
    assert_eq!(store.load(b"new-password").unwrap(), document_before);
}

#[test]
fn change_password_with_wrong_old_password_changes_nothing() {
    let (_dir, store) = store();
    add(&store, "OpenAI", "a", "sk-a");
    let before = fs::read(store.path()).unwrap();

    assert!(store.change_password(b"nope", b"new-password").is_err());
    assert_eq!(fs::read(store.path()).unwrap(), before);
}

#[test]
fn change_password_enforces_minimum_length() {
    let (_dir, store) = store();
    store.initialize(PW).unwrap();
    let before = fs::read(store.path()).unwrap();

    for weak in [&b""[..], b"short", b"1234567"] {
        assert!(matches!(
            store.change_password(PW, weak),
            Err(KeyVaultError::Validation(_))
        ));
    }
    assert_eq!(fs::read(store.path()).unwrap(), before);

    store.change_password(PW, b"12345678").unwrap();
    assert!(store.load(b"12345678").is_ok());
}

#[test]
fn initialize_enforces_minimum_length() {
    let (_dir, store) = store();
    assert!(matches!(
        store.initialize(b"pw"),
        Err(KeyVaultError::Validation(_))
    ));
    assert!(!store.exists());
}

// ---------------------------------------------------------------------------
// On-disk format
// ---------------------------------------------------------------------------

#[test]
fn file_never_contains_plaintext() {
    let (dir, store) = store();
    add(&store, "OpenAI", "personal", "sk-super-secret-value");

    let raw = fs::read_to_string(store.path()).unwrap();
    assert!(!raw.contains("sk-super-secret-value"));
    assert!(!raw.contains("personal"));

    // No staging files left behind.
    let leftovers: Vec<_> = fs::read_dir(dir.path())
        .unwrap()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
        .collect();
    assert!(leftovers.is_empty());
}

#[cfg(unix)]
#[test]
fn vault_file_is_owner_only() {
    use std::os::unix::fs::PermissionsExt;

    let (_dir, store) = store();
    store.initialize(PW).unwrap();
    let mode = fs::metadata(store.path()).unwrap().permissions().mode();
    assert_eq!(mode & 0o777, 0o600);
}

#[test]
fn legacy_vault_file_is_readable_and_upgraded_on_write() {
    let (_dir, store) = store();

    // A vault as older tools wrote it: three hex fields, camelCase records.
    let document = serde_json::json!({
        "keys": {
            "OpenAI": {
                "personal": {
                    "key": "sk-legacy",
                    "created": "2024-01-01T00:00:00.000Z",
                    "lastUsed": null,
                    "usageCount": 3,
                    "expirationDate": "",
                    "description": "",
                    "tags": [],
                    "isActive": true,
                    "environment": "development",
                    "metadata": {}
                }
            }
        },
        "metadata": { "created": "2024-01-01T00:00:00.000Z" }
    });
    write_legacy_vault(&store, &document);

    assert_eq!(store.get_key("OpenAI", "personal", PW).unwrap(), "sk-legacy");
    assert_eq!(store.list_keys(PW).unwrap()["OpenAI"][0].usage_count, 4);

    let rewritten: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(store.path()).unwrap()).unwrap();
    assert!(rewritten.get("mac").is_some());
    assert_eq!(rewritten["iterations"], 100_000);
}

#[test]
fn legacy_vault_with_free_form_expiration_dates_still_opens() {
    let (_dir, store) = store();

    let record = |secret: &str, expiration: serde_json::Value| {
        serde_json::json!({
            "key": secret,
            "created": "2024-01-01T00:00:00.000Z",
            "lastUsed": null,
            "usageCount": 0,
            "expirationDate": expiration,
            "isActive": true,
            "metadata": { "expirationDate": expiration }
        })
    };
    let document = serde_json::json!({
        "keys": {
            "OpenAI": {
                "a": record("sk-a", "2030-06-01T12:00".into()),
                "b": record("sk-b", serde_json::Value::Null),
                "c": record("sk-c", "when the contract ends".into()),
                "d": record("sk-d", "2001-02-03T04:05".into())
            }
        },
        "metadata": { "created": "2024-01-01T00:00:00.000Z" }
    });
    write_legacy_vault(&store, &document);

    assert_eq!(store.get_key("OpenAI", "b", PW).unwrap(), "sk-b");
    assert_eq!(store.get_key("OpenAI", "a", PW).unwrap(), "sk-a");
    assert_eq!(store.get_key("OpenAI", "c", PW).unwrap(), "sk-c");
    assert!(matches!(
        store.get_key("OpenAI", "d", PW),
        Err(KeyVaultError::KeyExpired { .. })
    ));

    let listing = store.list_keys(PW).unwrap();
    let a = listing["OpenAI"].iter().find(|k| k.name == "a").unwrap();
    assert_eq!(
        a.expiration_date.unwrap().to_rfc3339(),
        "2030-06-01T12:00:00+00:00"
    );

    // The unreadable date survives the rewrites above.
    let doc = store.load(PW).unwrap();
    assert_eq!(
        serde_json::to_value(doc.get("OpenAI", "c").unwrap()).unwrap()["expirationDate"],
        "when the contract ends"
    );
}

// ---------------------------------------------------------------------------
// Concurrency
// ---------------------------------------------------------------------------

#[test]
fn concurrent_adds_do_not_lose_updates() {
    let (_dir, store) = store();
    store.initialize(PW).unwrap();
    let store = Arc::new(store);

    let handles: Vec<_> = (0..6)
        .map(|i| {
            let store = Arc::clone(&store);
            thread::spawn(move || {
                store
                    .add_key("OpenAI", &format!("key-{i}"), &format!("sk-{i}"), PW, KeyOptions::default())
                    .unwrap();
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    let listing = store.list_keys(PW).unwrap();
    assert_eq!(listing["OpenAI"].len(), 6);
    for i in 0..6 {
        assert_eq!(
            store.get_key("OpenAI", &format!("key-{i}"), PW).unwrap(),
            format!("sk-{i}")
        );
    }
}
