mod accounts;
mod cli;
mod converter;
mod error;
mod extractors;
mod fmt;
mod models;
mod normalize;
mod resolver;
mod settings;
mod sheet;
mod writer;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use cli::convert::ConvertArgs;
use cli::{Cli, Commands, ConfigCommands};

/// Diagnostics go to stderr, filtered by `RAZAO_LOG` (default `warn`).
fn init_tracing() {
    let filter = EnvFilter::try_from_env("RAZAO_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() {
    init_tracing();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Convert {
            kind,
            export,
            accounts,
            debit_prefixes,
            credit_prefixes,
            output,
            lookback,
        } => cli::convert::run(ConvertArgs {
            kind: &kind,
            export: &export,
            accounts: &accounts,
            debit_prefixes: &debit_prefixes,
            credit_prefixes: &credit_prefixes,
            output: output.as_deref(),
            lookback,
        }),
        Commands::Resolve {
            text,
            accounts,
            prefixes,
        } => cli::resolve::run(&text, &accounts, &prefixes),
        Commands::Accounts { file, prefixes } => cli::accounts::list(&file, &prefixes),
        Commands::Formats => {
            cli::formats::run();
            Ok(())
        }
        Commands::Config { command } => match command {
            ConfigCommands::Show => cli::config::show(),
            ConfigCommands::Init { force } => cli::config::init(force),
        },
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
