//! `keyvault export`: write keys as a sourceable shell script.
//!
//! Every key of a known provider becomes
//! `export <ENV_VAR>_<KEY_NAME>="..."`; keys that cannot be read
//! (disabled, expired) are left as comments.

use std::fs;
use std::path::Path;

use crate::cli::output;
use crate::cli::{open_store, prompt_password, require_vault, Cli};
use crate::errors::{KeyVaultError, Result};
use crate::providers;

/// Execute the `export` command.
pub fn execute(cli: &Cli, output_path: Option<&str>) -> Result<()> {
    let (_settings, store) = open_store(cli)?;
    require_vault(&store)?;

    let password = prompt_password()?;
    let listing = store.list_keys(password.as_bytes())?;
    let script = providers::export_shell(&listing, |provider, key_name| {
        store.get_key(provider, key_name, password.as_bytes())
    });

    let exported = script
        .lines()
        .filter(|line| line.starts_with("export "))
        .count();

    // Write to file or stdout.
    match output_path {
        Some(dest) => {
            let dest_path = Path::new(dest);

            // Safety: refuse to export over the vault itself.
            if same_file(dest_path, store.path()) {
                return Err(KeyVaultError::CommandFailed(
                    "refusing to export over the vault file".into(),
                ));
            }

            write_private(dest_path, &script).map_err(|e| {
                KeyVaultError::CommandFailed(format!("failed to write export file: {e}"))
            })?;

            output::success(&format!("Exported {exported} key(s) to {dest}"));
            output::tip(&format!("Load them with: source {dest}"));
        }
        None => {
            // Write to stdout (no success message, just raw output).
            print!("{script}");
        }
    }

    Ok(())
}

fn same_file(a: &Path, b: &Path) -> bool {
    match (fs::canonicalize(a), fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => a == b,
    }
}

/// The script holds plaintext keys, so keep it owner-only on Unix.
fn write_private(path: &Path, contents: &str) -> std::io::Result<()> {
    fs::write(path, contents)?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path, fs::Permissions::from_mode(0o600))?;
    }

    Ok(())
}
