//! `keyvault list`: display all stored keys in a table.

use crate::cli::output;
use crate::cli::{open_store, prompt_password, require_vault, Cli};
use crate::errors::Result;

/// Execute the `list` command.
pub fn execute(cli: &Cli) -> Result<()> {
    let (_settings, store) = open_store(cli)?;
    require_vault(&store)?;

    let password = prompt_password()?;
    let listing = store.list_keys(password.as_bytes())?;

    let count: usize = listing.values().map(Vec::len).sum();
    output::info(&format!(
        "{} key(s) across {} provider(s)",
        count,
        listing.len()
    ));

    output::print_keys_table(&listing);

    Ok(())
}
