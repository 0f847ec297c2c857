//! Colored terminal output helpers.
//!
//! All user-facing output goes through these functions so we get
//! consistent styling across every command.

use chrono::{DateTime, Local, Utc};
use comfy_table::{ContentArrangement, Table};
use console::style;

use crate::providers::ProviderInfo;
use crate::vault::{KeyListing, KeySummary};

/// Print a green success message: "check_mark {msg}"
pub fn success(msg: &str) {
    println!("{} {}", style("\u{2713}").green().bold(), msg);
}

/// Print a red error message: "x_mark {msg}"
pub fn error(msg: &str) {
    eprintln!("{} {}", style("\u{2717}").red().bold(), msg);
}

/// Print a yellow warning: "warning_sign {msg}"
pub fn warning(msg: &str) {
    eprintln!("{} {}", style("\u{26a0}").yellow().bold(), msg);
}

/// Print a blue info message: "info_sign {msg}"
pub fn info(msg: &str) {
    println!("{} {}", style("\u{2139}").blue().bold(), msg);
}

/// Print a dim tip/hint: "arrow {msg}"
pub fn tip(msg: &str) {
    println!("{} {}", style("\u{2192}").dim(), style(msg).dim());
}

/// Print a table of stored keys (Provider, Name, Created, Last Used, Uses, Status).
pub fn print_keys_table(listing: &KeyListing) {
    if listing.is_empty() {
        info("No API keys stored yet.");
        tip("Run `keyvault add <provider> <name>` to add your first key.");
        return;
    }

    let now = Utc::now();
    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![
        "Provider",
        "Name",
        "Created",
        "Last Used",
        "Uses",
        "Status",
    ]);

    for (provider, keys) in listing {
        for key in keys {
            table.add_row(vec![
                provider.clone(),
                key.name.clone(),
                local_time(&key.created),
                key.last_used
                    .as_ref()
                    .map(local_time)
                    .unwrap_or_else(|| "Never".to_string()),
                key.usage_count.to_string(),
                status_label(key, now),
            ]);
        }
    }

    println!("{table}");
}

/// Print the provider catalogue (Provider, Name, Env Var, Category).
pub fn print_providers_table(providers: &[ProviderInfo]) {
    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["Provider", "Name", "Env Var", "Category"]);

    for p in providers {
        table.add_row(vec![p.name, p.display_name, p.env_var, p.category]);
    }

    println!("{table}");
}

fn local_time(ts: &DateTime<Utc>) -> String {
    ts.with_timezone(&Local)
        .format("%Y-%m-%d %H:%M:%S")
        .to_string()
}

/// "active", "disabled", or "expired YYYY-MM-DD".
fn status_label(key: &KeySummary, now: DateTime<Utc>) -> String {
    if !key.is_active {
        return "disabled".to_string();
    }
    match key.expiration_date {
        Some(exp) if now > exp => format!("expired {}", exp.format("%Y-%m-%d")),
        Some(exp) => format!("expires {}", exp.format("%Y-%m-%d")),
        None => "active".to_string(),
    }
}
