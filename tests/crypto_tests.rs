//! Integration tests for the KeyVault crypto module.

use keyvault::crypto::kdf::{MIN_ITERATIONS, SALT_LEN};
use keyvault::crypto::{
    decrypt, derive_key, encrypt, generate_iv, generate_salt, Pbkdf2Params, VaultCipher,
    VaultEnvelope,
};
use keyvault::errors::KeyVaultError;

// ---------------------------------------------------------------------------
// Block cipher round-trip
// ---------------------------------------------------------------------------

#[test]
fn cbc_encrypt_decrypt_roundtrip() {
    let key = [0xABu8; 32];
    let iv = generate_iv();
    let plaintext = b"{\"keys\":{}}";

    let ciphertext = encrypt(&key, &iv, plaintext).expect("encrypt should succeed");

    // PKCS#7 always pads to a whole block.
    assert_eq!(ciphertext.len() % 16, 0);
    assert!(ciphertext.len() > plaintext.len());

    let recovered = decrypt(&key, &iv, &ciphertext).expect("decrypt should succeed");
    assert_eq!(recovered, plaintext);
}

#[test]
fn cbc_rejects_truncated_ciphertext() {
    let key = [0xAAu8; 32];
    let iv = [0u8; 16];
    assert!(decrypt(&key, &iv, &[0u8; 5]).is_err());
    assert!(decrypt(&key, &iv, &[]).is_err());
}

// ---------------------------------------------------------------------------
// Key derivation
// ---------------------------------------------------------------------------

#[test]
fn derive_key_is_deterministic_per_salt() {
    let salt = generate_salt();
    assert_eq!(salt.len(), SALT_LEN);

    let k1 = derive_key(b"password", &salt);
    let k2 = derive_key(b"password", &salt);
    assert_eq!(k1, k2);

    let other = derive_key(b"password", &generate_salt());
    assert_ne!(k1, other, "a different salt must give a different key");
}

#[test]
fn pbkdf2_params_refuse_weak_iteration_counts() {
    assert!(Pbkdf2Params::new(MIN_ITERATIONS - 1).is_err());
    assert!(Pbkdf2Params::new(MIN_ITERATIONS).is_ok());
    assert_eq!(Pbkdf2Params::default().iterations, MIN_ITERATIONS);
}

// ---------------------------------------------------------------------------
// Envelope encryption
// ---------------------------------------------------------------------------

#[test]
fn envelope_roundtrip() {
    let cipher = VaultCipher::default();
    let envelope = cipher
        .encrypt(b"{\"hello\":\"world\"}", b"master-pw")
        .expect("encrypt");

    assert_eq!(envelope.salt.len(), 32);
    assert_eq!(envelope.iv.len(), 16);
    assert_eq!(envelope.iterations, Some(MIN_ITERATIONS));
    assert!(envelope.mac.is_some());

    let plaintext = cipher.decrypt(&envelope, b"master-pw").expect("decrypt");
    assert_eq!(plaintext, b"{\"hello\":\"world\"}");
}

#[test]
fn each_encryption_uses_fresh_salt_and_iv() {
    let cipher = VaultCipher::default();
    let a = cipher.encrypt(b"same payload", b"pw").unwrap();
    let b = cipher.encrypt(b"same payload", b"pw").unwrap();

    assert_ne!(a.salt, b.salt);
    assert_ne!(a.iv, b.iv);
    assert_ne!(a.encrypted, b.encrypted);
}

#[test]
fn wrong_password_fails_with_decryption_error() {
    let cipher = VaultCipher::default();
    let envelope = cipher.encrypt(b"payload", b"right").unwrap();

    assert!(matches!(
        cipher.decrypt(&envelope, b"wrong"),
        Err(KeyVaultError::DecryptionFailed)
    ));
}

#[test]
fn tampered_ciphertext_is_detected() {
    let cipher = VaultCipher::default();
    let mut envelope = cipher.encrypt(b"payload that spans blocks....", b"pw").unwrap();

    let last = envelope.encrypted.len() - 1;
    envelope.encrypted[last] ^= 0x01;

    assert!(matches!(
        cipher.decrypt(&envelope, b"pw"),
        Err(KeyVaultError::DecryptionFailed)
    ));
}

#[test]
fn tampered_iv_is_detected() {
    let cipher = VaultCipher::default();
    let mut envelope = cipher.encrypt(b"payload", b"pw").unwrap();
    envelope.iv[0] ^= 0x80;

    assert!(cipher.decrypt(&envelope, b"pw").is_err());
}

#[test]
fn downgraded_iteration_count_is_refused() {
    let cipher = VaultCipher::default();
    let mut envelope = cipher.encrypt(b"payload", b"pw").unwrap();
    envelope.iterations = Some(1_000);

    assert!(matches!(
        cipher.decrypt(&envelope, b"pw"),
        Err(KeyVaultError::DecryptionFailed)
    ));
}

#[test]
fn envelope_records_configured_iterations() {
    let params = Pbkdf2Params::new(150_000).unwrap();
    let sealing = VaultCipher::new(params);
    let envelope = sealing.encrypt(b"payload", b"pw").unwrap();
    assert_eq!(envelope.iterations, Some(150_000));

    // Any cipher can open it: the count travels with the envelope.
    let opened = VaultCipher::default().decrypt(&envelope, b"pw").unwrap();
    assert_eq!(opened, b"payload");
}

// ---------------------------------------------------------------------------
// Envelope JSON and legacy interop
// ---------------------------------------------------------------------------

#[test]
fn envelope_json_uses_hex_fields() {
    let envelope = VaultCipher::default().encrypt(b"payload", b"pw").unwrap();
    let json: serde_json::Value = serde_json::to_value(&envelope).unwrap();

    let salt = json["salt"].as_str().unwrap();
    assert_eq!(salt.len(), 64);
    assert!(salt.chars().all(|c| c.is_ascii_hexdigit()));
    assert_eq!(json["iv"].as_str().unwrap().len(), 32);
    assert_eq!(json["iterations"], 100_000);
    assert_eq!(json["mac"].as_str().unwrap().len(), 64);
}

#[test]
fn legacy_three_field_envelope_decrypts() {
    // Older files carry only encrypted/salt/iv and always used 100k rounds.
    let salt = generate_salt();
    let iv = generate_iv();
    let key = derive_key(b"legacy-pw", &salt);
    let ciphertext = encrypt(&key, &iv, b"{\"keys\":{}}").unwrap();

    let json = serde_json::json!({
        "encrypted": hex::encode(&ciphertext),
        "salt": hex::encode(salt),
        "iv": hex::encode(iv),
    });
    let envelope: VaultEnvelope = serde_json::from_value(json).unwrap();
    assert!(envelope.iterations.is_none());
    assert!(envelope.mac.is_none());

    let plaintext = VaultCipher::default().decrypt(&envelope, b"legacy-pw").unwrap();
    assert_eq!(plaintext, b"{\"keys\":{}}");
}

#[test]
fn malformed_hex_is_a_parse_error() {
    let json = serde_json::json!({
        "encrypted": "zz",
        "salt": "00",
        "iv": "00",
    });
    assert!(serde_json::from_value::<VaultEnvelope>(json).is_err());
}

#[test]
fn short_salt_is_rejected() {
    let mut envelope = VaultCipher::default().encrypt(b"payload", b"pw").unwrap();
    envelope.salt.truncate(8);

    assert!(matches!(
        VaultCipher::default().decrypt(&envelope, b"pw"),
        Err(KeyVaultError::DecryptionFailed)
    ));
}
