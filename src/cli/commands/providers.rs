//! `keyvault providers`: show the provider catalogue.

use crate::cli::output;
use crate::errors::Result;
use crate::providers::PROVIDERS;

/// Execute the `providers` command.
pub fn execute() -> Result<()> {
    output::info(&format!("{} supported providers", PROVIDERS.len()));
    output::print_providers_table(PROVIDERS);
    output::tip("Keys for unlisted providers can still be stored; their format is not checked.");
    Ok(())
}
