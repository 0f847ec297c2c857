use clap::Parser;
use keyvault::cli::commands::add::AddFlags;
use keyvault::cli::{Cli, Commands};

fn main() {
    let cli = Cli::parse();

    // `serve` logs request activity; everything else stays quiet.
    let log_level = match cli.command {
        Commands::Serve { .. } => "info",
        _ => "warn",
    };
    init_tracing(log_level);

    let result = match cli.command {
        Commands::Init => keyvault::cli::commands::init::execute(&cli),
        Commands::Add {
            ref provider,
            ref name,
            ref value,
            ref description,
            ref environment,
            ref tags,
            ref expires,
            inactive,
        } => {
            let flags = AddFlags {
                description: description.as_deref(),
                environment: environment.as_deref(),
                tags,
                expires: expires.as_deref(),
                inactive,
            };
            keyvault::cli::commands::add::execute(&cli, provider, name, value.as_deref(), &flags)
        }
        Commands::List => keyvault::cli::commands::list::execute(&cli),
        Commands::Get {
            ref provider,
            ref name,
        } => keyvault::cli::commands::get::execute(&cli, provider, name),
        Commands::Delete {
            ref provider,
            ref name,
            force,
        } => keyvault::cli::commands::delete::execute(&cli, provider, name, force),
        Commands::ChangePassword => keyvault::cli::commands::change_password::execute(&cli),
        Commands::Providers => keyvault::cli::commands::providers::execute(),
        Commands::Export { ref output } => {
            keyvault::cli::commands::export::execute(&cli, output.as_deref())
        }
        Commands::Serve { ref host, port } => {
            keyvault::cli::commands::serve::execute(&cli, host.as_deref(), port)
        }
        Commands::Interactive => keyvault::cli::commands::interactive::execute(&cli),
        Commands::Completions { shell } => keyvault::cli::commands::completions::execute(shell),
    };

    if let Err(e) = result {
        keyvault::cli::output::error(&e.to_string());
        std::process::exit(1);
    }
}

/// Initializes the tracing subscriber; `RUST_LOG` overrides `log_level`.
fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("keyvault={log_level},tower_http={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .init();
}
