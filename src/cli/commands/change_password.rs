//! `keyvault change-password`: re-encrypt the vault under a new master password.
//!
//! The old password is checked before the new one is asked for; the
//! rewrite uses a fresh salt and IV and replaces the file atomically.

use crate::cli::output;
use crate::cli::{open_store, prompt_password, prompt_replacement_password, require_vault, Cli};
use crate::errors::Result;

/// Execute the `change-password` command.
pub fn execute(cli: &Cli) -> Result<()> {
    let (_settings, store) = open_store(cli)?;
    require_vault(&store)?;

    // 1. Verify the current password.
    output::info("Enter your current master password.");
    let old_password = prompt_password()?;
    let document = store.load(old_password.as_bytes())?;

    // 2. Choose the new one.
    output::info("Choose your new master password.");
    let new_password = prompt_replacement_password()?;

    // 3. Re-encrypt and save atomically.
    store.change_password(old_password.as_bytes(), new_password.as_bytes())?;

    output::success(&format!(
        "Master password changed ({} key(s) re-encrypted)",
        document.key_count()
    ));

    Ok(())
}
