//! Envelope file I/O.
//!
//! The vault file is a small pretty-printed JSON document holding one
//! `VaultEnvelope`.  Writes are **atomic**: the new envelope goes to a
//! hidden temp file next to the target, is flushed to disk, and is then
//! renamed over the target, so a crash never leaves a half-written vault.

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::crypto::VaultEnvelope;
use crate::errors::{KeyVaultError, Result};

/// Default vault file name, relative to the project directory.
pub const DEFAULT_VAULT_FILE: &str = "keys.encrypted.json";

/// Read and parse the envelope stored at `path`.
pub fn read_envelope(path: &Path) -> Result<VaultEnvelope> {
    let data = fs::read(path)?;

    serde_json::from_slice(&data)
        .map_err(|e| KeyVaultError::SerializationError(format!("envelope JSON: {e}")))
}

/// Write `envelope` to `path` atomically.
///
/// 1. Serialize the envelope to pretty JSON.
/// 2. Write it to a temp file in the same directory and fsync it.
/// 3. Restrict permissions to the owner (Unix).
/// 4. Rename the temp file over the target path.
pub fn write_envelope(path: &Path, envelope: &VaultEnvelope) -> Result<()> {
    let bytes = serde_json::to_vec_pretty(envelope)
        .map_err(|e| KeyVaultError::SerializationError(format!("envelope: {e}")))?;

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent).map_err(|e| KeyVaultError::storage(parent, e))?;
        }
    }

    // Same directory as the target so the rename stays on one filesystem.
    let tmp_path = temp_path_for(path);

    let result = write_synced(&tmp_path, &bytes).and_then(|()| {
        fs::rename(&tmp_path, path).map_err(|e| KeyVaultError::storage(path, e))
    });

    if result.is_err() {
        let _ = fs::remove_file(&tmp_path);
    }

    result
}

/// Hidden sibling path used as the staging file for atomic writes.
fn temp_path_for(path: &Path) -> PathBuf {
    let parent = path.parent().unwrap_or(Path::new("."));
    parent.join(format!(
        ".{}.tmp",
        path.file_name().unwrap_or_default().to_string_lossy()
    ))
}

fn write_synced(path: &Path, bytes: &[u8]) -> Result<()> {
    let mut file = File::create(path).map_err(|e| KeyVaultError::storage(path, e))?;
    file.write_all(bytes)
        .and_then(|()| file.sync_all())
        .map_err(|e| KeyVaultError::storage(path, e))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let perms = fs::Permissions::from_mode(0o600);
        fs::set_permissions(path, perms).map_err(|e| KeyVaultError::storage(path, e))?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn sample_envelope() -> VaultEnvelope {
        VaultEnvelope {
            encrypted: vec![1, 2, 3],
            salt: vec![4; 32],
            iv: vec![5; 16],
            iterations: None,
            mac: None,
        }
    }

    #[test]
    fn write_then_read_returns_same_envelope() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(DEFAULT_VAULT_FILE);

        write_envelope(&path, &sample_envelope()).unwrap();
        assert_eq!(read_envelope(&path).unwrap(), sample_envelope());
    }

    #[test]
    fn write_leaves_no_temp_file_behind() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(DEFAULT_VAULT_FILE);

        write_envelope(&path, &sample_envelope()).unwrap();

        let names: Vec<String> = fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec![DEFAULT_VAULT_FILE.to_string()]);
    }

    #[test]
    fn write_creates_missing_parent_directory() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("vault.json");

        write_envelope(&path, &sample_envelope()).unwrap();
        assert!(path.exists());
    }

    #[cfg(unix)]
    #[test]
    fn written_file_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let path = dir.path().join(DEFAULT_VAULT_FILE);
        write_envelope(&path, &sample_envelope()).unwrap();

        let mode = fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn read_rejects_non_json() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(DEFAULT_VAULT_FILE);
        fs::write(&path, "not json").unwrap();

        assert!(matches!(
            read_envelope(&path),
            Err(KeyVaultError::SerializationError(_))
        ));
    }
}
