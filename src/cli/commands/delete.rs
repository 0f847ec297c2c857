//! `keyvault delete`: remove an API key from the vault.

use dialoguer::Confirm;

use crate::cli::output;
use crate::cli::{open_store, prompt_password, require_vault, Cli};
use crate::errors::{KeyVaultError, Result};

/// Execute the `delete` command.
pub fn execute(cli: &Cli, provider: &str, name: &str, force: bool) -> Result<()> {
    let (_settings, store) = open_store(cli)?;
    require_vault(&store)?;

    // Unless --force is set, ask for confirmation before deleting.
    if !force {
        let confirmed = Confirm::new()
            .with_prompt(format!("Delete API key '{provider}/{name}'?"))
            .default(false)
            .interact()
            .map_err(|e| KeyVaultError::CommandFailed(format!("confirm prompt: {e}")))?;

        if !confirmed {
            output::info("Cancelled.");
            return Ok(());
        }
    }

    let password = prompt_password()?;
    if !store.delete_key(provider, name, password.as_bytes())? {
        return Err(KeyVaultError::KeyNotFound {
            provider: provider.to_string(),
            key_name: name.to_string(),
        });
    }

    output::success(&format!("Deleted API key '{provider}/{name}'"));

    Ok(())
}
