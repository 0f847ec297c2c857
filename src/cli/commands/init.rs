//! `keyvault init`: create a new, empty vault.

use crate::cli::{gitignore, output};
use crate::cli::{open_store, prompt_new_password, Cli};
use crate::errors::{KeyVaultError, Result};

/// Default file written by `keyvault export --output`.
const SHELL_EXPORT_FILE: &str = "api_keys.sh";

/// Execute the `init` command.
pub fn execute(cli: &Cli) -> Result<()> {
    let cwd = std::env::current_dir()?;
    let (_settings, store) = open_store(cli)?;

    // 1. Refuse to clobber an existing vault.
    if store.exists() {
        output::tip("Use `keyvault add` to add keys to the existing vault.");
        return Err(KeyVaultError::CommandFailed(format!(
            "vault already exists at {}",
            store.path().display()
        )));
    }

    // 2. Prompt for a new password (with confirmation) and write the vault.
    let password = prompt_new_password()?;
    store.initialize(password.as_bytes())?;
    output::success(&format!("Vault created at {}", store.path().display()));

    // 3. Keep the vault and plaintext exports out of git.
    let relative = store
        .path()
        .strip_prefix(&cwd)
        .ok()
        .map(|p| p.to_string_lossy().into_owned());
    let mut entries = vec![SHELL_EXPORT_FILE];
    if let Some(relative) = relative.as_deref() {
        entries.insert(0, relative);
    }
    gitignore::ignore_entries(&cwd, &entries);

    // 4. Show helpful tips.
    output::tip("Run `keyvault providers` to see supported providers.");
    output::tip("Run `keyvault add <provider> <name>` to add a key.");
    output::tip("Run `keyvault serve` to start the HTTP service.");

    Ok(())
}
