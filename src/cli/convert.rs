use std::path::{Path, PathBuf};

use colored::Colorize;

use crate::converter::convert;
use crate::error::{ConvertError, Result};
use crate::extractors::get_by_key;
use crate::fmt::brl;
use crate::settings::{load_settings, shellexpand_path};

pub struct ConvertArgs<'a> {
    pub kind: &'a str,
    pub export: &'a str,
    pub accounts: &'a str,
    pub debit_prefixes: &'a [String],
    pub credit_prefixes: &'a [String],
    pub output: Option<&'a str>,
    pub lookback: Option<usize>,
}

pub fn default_output_name() -> String {
    let stamp = chrono::Local::now().format("%Y%m%d_%H%M%S");
    format!("LancamentosFinal_{stamp}.csv")
}

pub fn run(args: ConvertArgs) -> Result<()> {
    let kind = get_by_key(args.kind).ok_or_else(|| ConvertError::UnknownKind(args.kind.to_string()))?;
    let settings = load_settings();
    let mut opts = settings.convert_options(args.debit_prefixes, args.credit_prefixes);
    if let Some(rows) = args.lookback {
        opts.extract.lookback_rows = rows;
    }

    let export = std::fs::read(args.export)?;
    let accounts = std::fs::read(args.accounts)?;
    let filename = Path::new(args.export)
        .file_name()
        .map(|f| f.to_string_lossy().to_string())
        .unwrap_or_else(|| args.export.to_string());

    let result = convert(kind, &export, &filename, &accounts, &opts)?;

    let dest = match args.output {
        Some(p) => PathBuf::from(shellexpand_path(p)),
        None => {
            let dir = PathBuf::from(shellexpand_path(&settings.output_dir));
            std::fs::create_dir_all(&dir)?;
            dir.join(default_output_name())
        }
    };
    std::fs::write(&dest, &result.bytes)?;

    let stats = &result.stats;
    println!("{} {}", "Converted".green().bold(), kind.name());
    println!("Rows read:     {}", stats.rows_scanned);
    println!("Transactions:  {}", stats.transactions);
    println!("Ledger lines:  {}", result.output_rows);
    println!("Debits:        {}", brl(result.debit_total));
    println!("Credits:       {}", brl(result.credit_total));
    if stats.skipped_rows > 0 {
        println!("Skipped rows:  {}", stats.skipped_rows.to_string().yellow());
    }
    if stats.unresolved > 0 {
        println!(
            "Unresolved:    {} (posted to {})",
            stats.unresolved.to_string().red(),
            opts.fallback_code
        );
    }
    println!("Saved to {}", dest.display());
    Ok(())
}
