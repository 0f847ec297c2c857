//! `keyvault add`: store an API key, replacing any key with the same name.

use std::io::{self, IsTerminal, Read};

use zeroize::Zeroizing;

use crate::cli::output;
use crate::cli::{open_store, prompt_password, require_vault, Cli};
use crate::errors::{KeyVaultError, Result};
use crate::providers;
use crate::vault::{parse_timestamp, KeyOptions};

/// Optional record fields collected from the command line.
#[derive(Debug, Default)]
pub struct AddFlags<'a> {
    pub description: Option<&'a str>,
    pub environment: Option<&'a str>,
    pub tags: &'a [String],
    pub expires: Option<&'a str>,
    pub inactive: bool,
}

impl AddFlags<'_> {
    /// Convert the flags into vault key options.
    pub fn to_options(&self) -> Result<KeyOptions> {
        let expiration_date = match self.expires {
            Some(raw) => Some(parse_timestamp(raw).ok_or_else(|| {
                KeyVaultError::Validation(format!(
                    "invalid expiration date '{raw}' (use YYYY-MM-DD or RFC 3339)"
                ))
            })?),
            None => None,
        };

        Ok(KeyOptions {
            expiration_date,
            description: self.description.map(str::to_string),
            tags: self.tags.to_vec(),
            is_active: self.inactive.then_some(false),
            environment: self.environment.map(str::to_string),
            ..KeyOptions::default()
        })
    }
}

/// Execute the `add` command.
pub fn execute(
    cli: &Cli,
    provider: &str,
    name: &str,
    value: Option<&str>,
    flags: &AddFlags<'_>,
) -> Result<()> {
    let options = flags.to_options()?;

    if providers::provider(provider).is_none() {
        output::warning(&format!(
            "'{provider}' is not a known provider; the key format will not be checked."
        ));
    }

    let (_settings, store) = open_store(cli)?;
    require_vault(&store)?;

    // Determine the key value from one of three sources.
    let api_key = Zeroizing::new(if let Some(v) = value {
        // Source 1: Inline value on the command line.
        output::warning("Value provided on command line — it may appear in shell history.");
        v.to_string()
    } else if !io::stdin().is_terminal() {
        // Source 2: Piped input (stdin is not a terminal).
        let mut buf = String::new();
        io::stdin().read_to_string(&mut buf)?;
        buf.trim().to_string()
    } else {
        // Source 3: Interactive secure prompt (default).
        dialoguer::Password::new()
            .with_prompt(format!("Enter API key for {provider}/{name}"))
            .interact()
            .map_err(|e| KeyVaultError::CommandFailed(format!("input prompt: {e}")))?
    });

    check_format(provider, &api_key)?;

    let password = prompt_password()?;
    store.add_key(provider, name, &api_key, password.as_bytes(), options)?;

    output::success(&format!("API key '{name}' added for {provider}"));
    output::tip(&format!("Run `keyvault get {provider} {name}` to read it back."));

    Ok(())
}

/// Reject values that do not match the provider's documented key format.
pub fn check_format(provider: &str, api_key: &str) -> Result<()> {
    if providers::validate_format(provider, api_key) {
        return Ok(());
    }

    if let Some(info) = providers::provider(provider) {
        output::tip(&format!("Expected something like: {}", info.example));
    }
    Err(KeyVaultError::Validation(format!(
        "invalid API key format for {provider}"
    )))
}
