use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::crypto::kdf::{Pbkdf2Params, MIN_ITERATIONS};
use crate::errors::{KeyVaultError, Result};

/// Per-project options read from `.keyvault.toml`.
///
/// All fields are optional in the file; omitted ones fall back to the
/// `default_*` functions below.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Vault file (relative to the project root).
    #[serde(default = "default_vault_file")]
    pub vault_file: String,

    /// PBKDF2 iteration count for newly written envelopes.
    #[serde(default = "default_pbkdf2_iterations")]
    pub pbkdf2_iterations: u32,

    /// Lifetime of an HTTP session in seconds.
    #[serde(default = "default_session_ttl_secs")]
    pub session_ttl_secs: u64,

    /// How often expired sessions are swept, in seconds.
    #[serde(default = "default_session_sweep_secs")]
    pub session_sweep_secs: u64,

    /// Address the HTTP service binds to.
    #[serde(default = "default_host")]
    pub host: String,

    /// Port the HTTP service binds to.
    #[serde(default = "default_port")]
    pub port: u16,
}

// ── Defaults ─────────────────────────────────────────────────────────

fn default_vault_file() -> String {
    crate::vault::DEFAULT_VAULT_FILE.to_string()
}

fn default_pbkdf2_iterations() -> u32 {
    MIN_ITERATIONS
}

fn default_session_ttl_secs() -> u64 {
    crate::session::DEFAULT_SESSION_TTL.as_secs()
}

fn default_session_sweep_secs() -> u64 {
    60
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            vault_file: default_vault_file(),
            pbkdf2_iterations: default_pbkdf2_iterations(),
            session_ttl_secs: default_session_ttl_secs(),
            session_sweep_secs: default_session_sweep_secs(),
            host: default_host(),
            port: default_port(),
        }
    }
}

impl Settings {
    pub const FILE_NAME: &'static str = ".keyvault.toml";

    /// Read `<project_dir>/.keyvault.toml`, or the defaults when there is
    /// no such file. Unparseable or out-of-range values are a `ConfigError`.
    pub fn load(project_dir: &Path) -> Result<Self> {
        let path = project_dir.join(Self::FILE_NAME);

        let raw = match std::fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => return Err(e.into()),
        };

        let settings: Self = toml::from_str(&raw)
            .map_err(|e| KeyVaultError::ConfigError(format!("{}: {e}", path.display())))?;
        settings.validate()?;

        tracing::debug!(path = %path.display(), "loaded settings");
        Ok(settings)
    }

    /// Reject settings that would weaken the vault or break the server.
    pub fn validate(&self) -> Result<()> {
        if self.pbkdf2_iterations < MIN_ITERATIONS {
            return Err(KeyVaultError::ConfigError(format!(
                "pbkdf2_iterations must be at least {MIN_ITERATIONS} (got {})",
                self.pbkdf2_iterations
            )));
        }
        if self.vault_file.trim().is_empty() {
            return Err(KeyVaultError::ConfigError("vault_file cannot be empty".into()));
        }
        if self.session_ttl_secs == 0 {
            return Err(KeyVaultError::ConfigError(
                "session_ttl_secs must be greater than zero".into(),
            ));
        }
        if self.session_sweep_secs == 0 {
            return Err(KeyVaultError::ConfigError(
                "session_sweep_secs must be greater than zero".into(),
            ));
        }
        Ok(())
    }

    /// `vault_file` resolved against `project_dir`.
    pub fn vault_path(&self, project_dir: &Path) -> PathBuf {
        project_dir.join(&self.vault_file)
    }

    /// Convert the iteration setting into crypto-layer params.
    pub fn pbkdf2_params(&self) -> Result<Pbkdf2Params> {
        Pbkdf2Params::new(self.pbkdf2_iterations)
            .map_err(|e| KeyVaultError::ConfigError(e.to_string()))
    }

    pub fn session_ttl(&self) -> Duration {
        Duration::from_secs(self.session_ttl_secs)
    }

    pub fn session_sweep_interval(&self) -> Duration {
        Duration::from_secs(self.session_sweep_secs)
    }
}
