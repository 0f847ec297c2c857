//! `keyvault completions`: print a shell completion script to stdout.
//!
//!   keyvault completions bash > ~/.local/share/bash-completion/completions/keyvault
//!   keyvault completions zsh > "${fpath[1]}/_keyvault"

use std::io::{self, Write};

use clap::CommandFactory;
use clap_complete::Shell;

use crate::cli::Cli;
use crate::errors::Result;

/// Binary name the generated script completes.
const BIN_NAME: &str = "keyvault";

/// Execute the `completions` command.
pub fn execute(shell: Shell) -> Result<()> {
    let mut stdout = io::stdout().lock();
    write_script(shell, &mut stdout);
    stdout.flush()?;
    Ok(())
}

fn write_script(shell: Shell, out: &mut dyn Write) {
    let mut cmd = Cli::command();
    clap_complete::generate(shell, &mut cmd, BIN_NAME, out);
}
