pub mod accounts;
pub mod config;
pub mod convert;
pub mod formats;
pub mod resolve;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "razao",
    version,
    about = "Converts bank and accounting exports into ledger import files."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Convert an export into a ledger import file.
    Convert {
        /// Conversion key (see `razao formats`)
        kind: String,
        /// Export to convert (.csv, .xls or .xlsx)
        export: String,
        /// Chart of accounts: code;classification;description
        #[arg(long)]
        accounts: String,
        /// Classification prefix scoping debit-side accounts (repeatable)
        #[arg(long = "debit-prefix")]
        debit_prefixes: Vec<String>,
        /// Classification prefix scoping credit-side accounts (repeatable)
        #[arg(long = "credit-prefix")]
        credit_prefixes: Vec<String>,
        /// Output path (default: <output_dir>/LancamentosFinal_YYYYMMDD_HHMMSS.csv)
        #[arg(long, short)]
        output: Option<String>,
        /// Rows searched backwards for a missing date or payer
        #[arg(long)]
        lookback: Option<usize>,
    },
    /// Show which account a description resolves to.
    Resolve {
        /// Free-text description
        text: String,
        /// Chart of accounts: code;classification;description
        #[arg(long)]
        accounts: String,
        /// Classification prefix to scope the lookup (repeatable)
        #[arg(long = "prefix")]
        prefixes: Vec<String>,
    },
    /// List a chart of accounts as the resolver sees it.
    Accounts {
        /// Chart of accounts: code;classification;description
        file: String,
        /// Only show classifications starting with this prefix (repeatable)
        #[arg(long = "prefix")]
        prefixes: Vec<String>,
    },
    /// List the supported conversions.
    Formats,
    /// Show or initialize settings.
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Print the effective settings.
    Show,
    /// Write a settings file with defaults.
    Init {
        /// Overwrite an existing settings file
        #[arg(long)]
        force: bool,
    },
}
