use tracing::{debug, info, warn};

use crate::accounts::AccountIndex;
use crate::error::{ConvertError, Result};
use crate::extractors::{ExtractOptions, ExtractorKind};
use crate::fmt::{parse_amount, round2};
use crate::models::{ConversionStats, Operation};
use crate::resolver::{Resolver, FALLBACK_CODE};
use crate::sheet::{load_rows, SourceFormat};
use crate::writer::write_ledger;

#[derive(Debug, Clone, PartialEq)]
pub struct ConvertOptions {
    /// Code assigned when no account can be found.
    pub fallback_code: String,
    pub extract: ExtractOptions,
}

impl Default for ConvertOptions {
    fn default() -> Self {
        Self {
            fallback_code: FALLBACK_CODE.to_string(),
            extract: ExtractOptions::default(),
        }
    }
}

#[derive(Debug)]
pub struct Conversion {
    /// Encoded ledger file, header included.
    pub bytes: Vec<u8>,
    pub stats: ConversionStats,
    pub output_rows: usize,
    pub debit_total: f64,
    pub credit_total: f64,
}

/// Run one conversion end to end. Every piece of state (account index,
/// resolver caches) lives for this call only; on error nothing is returned.
pub fn convert(
    kind: ExtractorKind,
    export: &[u8],
    export_filename: &str,
    accounts: &[u8],
    opts: &ConvertOptions,
) -> Result<Conversion> {
    let format = SourceFormat::from_filename(export_filename)?;
    let rows = load_rows(export, format)?;
    let index = AccountIndex::load(accounts).map_err(|e| match e {
        ConvertError::Accounts(_) => e,
        other => ConvertError::Accounts(other.to_string()),
    })?;
    if index.is_empty() {
        return Err(ConvertError::Accounts("no usable account rows".to_string()));
    }

    let mut resolver = Resolver::new(&index, opts.fallback_code.as_str());
    let extraction = kind.extract(&rows, &mut resolver, &opts.extract);
    debug!(cached = resolver.memoized(), "resolver cache");
    let bytes = write_ledger(&extraction.rows)?;

    let total = |op: Operation| {
        round2(
            extraction
                .rows
                .iter()
                .filter(|r| r.operation == op)
                .filter_map(|r| parse_amount(&r.amount))
                .sum(),
        )
    };
    let debit_total = total(Operation::Debit);
    let credit_total = total(Operation::Credit);

    let stats = extraction.stats;
    info!(
        kind = kind.key(),
        rows = stats.rows_scanned,
        transactions = stats.transactions,
        skipped = stats.skipped_rows,
        lines = extraction.rows.len(),
        "conversion finished"
    );
    if stats.unresolved > 0 {
        warn!(
            unresolved = stats.unresolved,
            fallback = %opts.fallback_code,
            "some descriptions matched no account"
        );
    }

    Ok(Conversion {
        bytes,
        output_rows: extraction.rows.len(),
        stats,
        debit_total,
        credit_total,
    })
}
