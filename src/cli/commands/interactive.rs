//! `keyvault interactive`: menu-driven session.
//!
//! The master password is asked for once.  Errors from individual
//! actions are printed and the menu comes back; only a failed unlock at
//! startup ends the session.

use dialoguer::{Confirm, Input, Select};
use zeroize::Zeroizing;

use crate::cli::commands::add::check_format;
use crate::cli::output;
use crate::cli::{open_store, prompt_new_password, prompt_password, prompt_replacement_password, Cli};
use crate::errors::{KeyVaultError, Result};
use crate::providers;
use crate::vault::{KeyOptions, VaultStore};

const OTHER_PROVIDER: &str = "Other";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Action {
    Add,
    List,
    Get,
    Delete,
    ChangePassword,
    Exit,
}

impl Action {
    const ALL: [Action; 6] = [
        Action::Add,
        Action::List,
        Action::Get,
        Action::Delete,
        Action::ChangePassword,
        Action::Exit,
    ];

    fn label(self) -> &'static str {
        match self {
            Action::Add => "Add API key",
            Action::List => "List API keys",
            Action::Get => "Get API key",
            Action::Delete => "Delete API key",
            Action::ChangePassword => "Change master password",
            Action::Exit => "Exit",
        }
    }
}

/// Execute the `interactive` command.
pub fn execute(cli: &Cli) -> Result<()> {
    let (_settings, store) = open_store(cli)?;
    let mut password = unlock_or_create(&store)?;

    loop {
        let labels: Vec<&str> = Action::ALL.iter().map(|a| a.label()).collect();
        let choice = Select::new()
            .with_prompt("What would you like to do?")
            .items(&labels)
            .default(0)
            .interact()
            .map_err(prompt_error)?;

        let result = match Action::ALL[choice] {
            Action::Add => add_key(&store, &password),
            Action::List => list_keys(&store, &password),
            Action::Get => get_key(&store, &password),
            Action::Delete => delete_key(&store, &password),
            Action::ChangePassword => change_password(&store, &mut password),
            Action::Exit => {
                output::info("Goodbye!");
                return Ok(());
            }
        };

        if let Err(e) = result {
            output::error(&e.to_string());
        }
    }
}

/// Create the vault on first run, otherwise prove the password unlocks it.
fn unlock_or_create(store: &VaultStore) -> Result<Zeroizing<String>> {
    if !store.exists() {
        output::info("No vault found. Creating a new one.");
        let password = prompt_new_password()?;
        store.initialize(password.as_bytes())?;
        output::success(&format!("Vault created at {}", store.path().display()));
        return Ok(password);
    }

    let password = prompt_password()?;
    store.load(password.as_bytes())?;
    output::success("Vault unlocked.");
    Ok(password)
}

fn add_key(store: &VaultStore, password: &str) -> Result<()> {
    let mut names: Vec<&str> = providers::provider_names().collect();
    names.push(OTHER_PROVIDER);

    let choice = Select::new()
        .with_prompt("Provider")
        .items(&names)
        .default(0)
        .interact()
        .map_err(prompt_error)?;

    let provider = if names[choice] == OTHER_PROVIDER {
        non_empty_input("Provider name")?
    } else {
        names[choice].to_string()
    };
    let key_name = non_empty_input("Key name (e.g. personal, work)")?;

    let api_key = Zeroizing::new(
        dialoguer::Password::new()
            .with_prompt("API key")
            .interact()
            .map_err(prompt_error)?,
    );
    if api_key.trim().is_empty() {
        return Err(KeyVaultError::Validation("API key cannot be empty".into()));
    }
    check_format(&provider, &api_key)?;

    store.add_key(
        &provider,
        &key_name,
        &api_key,
        password.as_bytes(),
        KeyOptions::default(),
    )?;
    output::success(&format!("API key '{key_name}' added for {provider}"));
    Ok(())
}

fn list_keys(store: &VaultStore, password: &str) -> Result<()> {
    let listing = store.list_keys(password.as_bytes())?;
    output::print_keys_table(&listing);
    Ok(())
}

fn get_key(store: &VaultStore, password: &str) -> Result<()> {
    let Some((provider, key_name)) = pick_key(store, password, "Select a key to view")? else {
        return Ok(());
    };

    let api_key = Zeroizing::new(store.get_key(&provider, &key_name, password.as_bytes())?);
    println!("\n{}\n", api_key.as_str());
    output::warning("Key shown on screen. Handle it securely!");
    Ok(())
}

fn delete_key(store: &VaultStore, password: &str) -> Result<()> {
    let Some((provider, key_name)) = pick_key(store, password, "Select a key to delete")? else {
        return Ok(());
    };

    let confirmed = Confirm::new()
        .with_prompt(format!("Delete '{provider}/{key_name}'?"))
        .default(false)
        .interact()
        .map_err(prompt_error)?;
    if !confirmed {
        output::info("Cancelled.");
        return Ok(());
    }

    if store.delete_key(&provider, &key_name, password.as_bytes())? {
        output::success("API key deleted.");
    } else {
        output::warning("Key not found.");
    }
    Ok(())
}

fn change_password(store: &VaultStore, password: &mut Zeroizing<String>) -> Result<()> {
    let current = Zeroizing::new(
        dialoguer::Password::new()
            .with_prompt("Current master password")
            .interact()
            .map_err(prompt_error)?,
    );
    if current.as_str() != password.as_str() {
        return Err(KeyVaultError::Authentication);
    }

    let new_password = prompt_replacement_password()?;
    store.change_password(password.as_bytes(), new_password.as_bytes())?;
    *password = new_password;

    output::success("Master password changed.");
    Ok(())
}

/// Let the user choose one stored key; `None` when the vault is empty.
fn pick_key(store: &VaultStore, password: &str, prompt: &str) -> Result<Option<(String, String)>> {
    let listing = store.list_keys(password.as_bytes())?;
    let entries: Vec<(String, String)> = listing
        .iter()
        .flat_map(|(provider, keys)| {
            keys.iter()
                .map(move |k| (provider.clone(), k.name.clone()))
        })
        .collect();

    if entries.is_empty() {
        output::info("No API keys stored yet.");
        return Ok(None);
    }

    let labels: Vec<String> = entries
        .iter()
        .map(|(provider, name)| format!("{provider} - {name}"))
        .collect();
    let choice = Select::new()
        .with_prompt(prompt)
        .items(&labels)
        .default(0)
        .interact()
        .map_err(prompt_error)?;

    Ok(entries.into_iter().nth(choice))
}

fn non_empty_input(prompt: &str) -> Result<String> {
    Input::<String>::new()
        .with_prompt(prompt)
        .validate_with(|input: &String| -> std::result::Result<(), &str> {
            if input.trim().is_empty() {
                Err("cannot be empty")
            } else {
                Ok(())
            }
        })
        .interact_text()
        .map(|s| s.trim().to_string())
        .map_err(prompt_error)
}

fn prompt_error(e: dialoguer::Error) -> KeyVaultError {
    KeyVaultError::CommandFailed(format!("prompt: {e}"))
}
