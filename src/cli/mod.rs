//! CLI module: Clap argument parser, output helpers, and command implementations.

pub mod commands;
pub mod gitignore;
pub mod output;

use std::path::PathBuf;

use clap::Parser;

use zeroize::Zeroizing;

use crate::config::Settings;
use crate::errors::{KeyVaultError, Result};
use crate::vault::VaultStore;

pub use crate::vault::{check_new_password, MIN_PASSWORD_LEN};

/// Env var read before prompting for the master password.
pub const PASSWORD_ENV: &str = "KEYVAULT_PASSWORD";

/// Env var read before prompting for a replacement master password.
pub const NEW_PASSWORD_ENV: &str = "KEYVAULT_NEW_PASSWORD";

/// KeyVault CLI: encrypted API key manager for LLM providers.
#[derive(Parser)]
#[command(
    name = "keyvault",
    about = "Encrypted API key manager for LLM providers",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Vault file (default: `vault_file` from .keyvault.toml)
    #[arg(long, global = true)]
    pub vault_file: Option<String>,
}

/// All available subcommands.
#[derive(clap::Subcommand)]
pub enum Commands {
    /// Create a new, empty vault
    Init,

    /// Add an API key (replaces an existing key with the same name)
    Add {
        /// Provider name (see `keyvault providers`)
        provider: String,
        /// Key name (e.g. "personal", "work")
        name: String,
        /// API key value (omit for interactive prompt)
        value: Option<String>,
        /// Free-text description
        #[arg(long)]
        description: Option<String>,
        /// Environment label (default: development)
        #[arg(long)]
        environment: Option<String>,
        /// Tag to attach (repeatable)
        #[arg(long = "tag")]
        tags: Vec<String>,
        /// Expiration date (YYYY-MM-DD or RFC 3339)
        #[arg(long)]
        expires: Option<String>,
        /// Store the key disabled
        #[arg(long)]
        inactive: bool,
    },

    /// List stored keys (values are never shown)
    List,

    /// Print an API key's value
    Get {
        /// Provider name
        provider: String,
        /// Key name
        name: String,
    },

    /// Delete an API key
    Delete {
        /// Provider name
        provider: String,
        /// Key name
        name: String,
        /// Skip confirmation prompt
        #[arg(short, long)]
        force: bool,
    },

    /// Change the vault's master password
    ChangePassword,

    /// Show the supported providers
    Providers,

    /// Export keys as a sourceable shell script
    Export {
        /// Output file path (prints to stdout if omitted)
        #[arg(short, long)]
        output: Option<String>,
    },

    /// Run the HTTP service
    Serve {
        /// Bind address (default: `host` from .keyvault.toml)
        #[arg(long)]
        host: Option<String>,
        /// Bind port (default: `port` from .keyvault.toml)
        #[arg(short, long, env = "PORT")]
        port: Option<u16>,
    },

    /// Menu-driven session
    Interactive,

    /// Generate shell completion scripts
    Completions {
        /// Target shell
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

// ---------------------------------------------------------------------------
// Shared helpers used by multiple commands
// ---------------------------------------------------------------------------

/// Get the master password, trying in order:
/// 1. `KEYVAULT_PASSWORD` env var (CI/CD)
/// 2. Interactive prompt
///
/// Returns `Zeroizing<String>` so the password is wiped from memory on drop.
pub fn prompt_password() -> Result<Zeroizing<String>> {
    if let Some(pw) = password_from_env(PASSWORD_ENV) {
        return Ok(pw);
    }

    let pw = dialoguer::Password::new()
        .with_prompt("Enter master password")
        .interact()
        .map_err(|e| KeyVaultError::CommandFailed(format!("password prompt: {e}")))?;
    Ok(Zeroizing::new(pw))
}

/// Prompt for a new password with confirmation (used by `init`).
///
/// Also respects `KEYVAULT_PASSWORD` for scripted/CI usage.
pub fn prompt_new_password() -> Result<Zeroizing<String>> {
    choose_password(PASSWORD_ENV, "Create master password")
}

/// Prompt for a replacement password (used by `change-password`).
///
/// Respects `KEYVAULT_NEW_PASSWORD` for scripted/CI usage.
pub fn prompt_replacement_password() -> Result<Zeroizing<String>> {
    choose_password(NEW_PASSWORD_ENV, "New master password")
}

fn choose_password(env_var: &str, prompt: &str) -> Result<Zeroizing<String>> {
    if let Some(pw) = password_from_env(env_var) {
        check_new_password(&pw)?;
        return Ok(pw);
    }

    loop {
        let password = dialoguer::Password::new()
            .with_prompt(prompt)
            .with_confirmation(
                "Confirm master password",
                "Passwords do not match, try again",
            )
            .interact()
            .map_err(|e| KeyVaultError::CommandFailed(format!("password prompt: {e}")))?;
        let password = Zeroizing::new(password);

        if let Err(e) = check_new_password(&password) {
            output::warning(&e.to_string());
            continue;
        }

        return Ok(password);
    }
}

fn password_from_env(var: &str) -> Option<Zeroizing<String>> {
    std::env::var(var)
        .ok()
        .filter(|pw| !pw.is_empty())
        .map(Zeroizing::new)
}

/// Resolve the vault file: `--vault-file` wins over `.keyvault.toml`.
///
/// Example: `<cwd>/keys.encrypted.json`
pub fn vault_path(cli: &Cli, settings: &Settings) -> Result<PathBuf> {
    let cwd = std::env::current_dir()?;
    Ok(match &cli.vault_file {
        Some(file) => cwd.join(file),
        None => settings.vault_path(&cwd),
    })
}

/// Load settings from the working directory and open the vault they name.
pub fn open_store(cli: &Cli) -> Result<(Settings, VaultStore)> {
    let cwd = std::env::current_dir()?;
    let settings = Settings::load(&cwd)?;
    let path = vault_path(cli, &settings)?;
    let store = VaultStore::with_params(path, settings.pbkdf2_params()?);
    Ok((settings, store))
}

/// Fail early, with a hint, when the vault file has not been created.
pub fn require_vault(store: &VaultStore) -> Result<()> {
    if store.exists() {
        return Ok(());
    }
    Err(KeyVaultError::CommandFailed(format!(
        "no vault at {} (run `keyvault init` first)",
        store.path().display()
    )))
}
