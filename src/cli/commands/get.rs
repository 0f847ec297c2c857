//! `keyvault get`: retrieve and print a single key's value.

use crate::cli::{open_store, prompt_password, require_vault, Cli};
use crate::errors::Result;

/// Execute the `get` command.
pub fn execute(cli: &Cli, provider: &str, name: &str) -> Result<()> {
    let (_settings, store) = open_store(cli)?;
    require_vault(&store)?;

    // Decrypt and print the key to stdout (usage is recorded).
    let password = prompt_password()?;
    let api_key = store.get_key(provider, name, password.as_bytes())?;
    println!("{api_key}");

    Ok(())
}
