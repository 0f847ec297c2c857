//! `keyvault serve`: run the HTTP service until interrupted.

use crate::cli::output;
use crate::cli::{open_store, Cli};
use crate::errors::{KeyVaultError, Result};
use crate::server::{self, AppState, ServerConfig};

/// Execute the `serve` command.
pub fn execute(cli: &Cli, host: Option<&str>, port: Option<u16>) -> Result<()> {
    let (settings, store) = open_store(cli)?;

    let config = ServerConfig {
        host: host.map_or_else(|| settings.host.clone(), str::to_string),
        port: port.unwrap_or(settings.port),
        sweep_interval: settings.session_sweep_interval(),
    };

    if !store.exists() {
        output::info("No vault yet; the first key added over HTTP creates it.");
    }
    output::info(&format!(
        "KeyVault API running at http://{}:{}",
        config.host, config.port
    ));

    let state = AppState::new(store, settings.session_ttl());

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| KeyVaultError::Server(format!("failed to start runtime: {e}")))?;

    runtime.block_on(server::serve(&config, state))
}
