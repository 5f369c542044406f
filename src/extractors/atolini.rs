//! Atolini payment/receipt reports: blocks headed by a payment date, each
//! holding a "Histórico" section whose rows are the individual entries.

use chrono::NaiveDate;
use tracing::debug;

use crate::fmt::parse_date_dmy;
use crate::models::{Extraction, Operation, OutputRow};
use crate::normalize::normalize;
use crate::resolver::Resolver;
use crate::sheet::Row;

use super::{amount_cell, date_in_row, is_numeric_cell, look_back, ExtractOptions};

/// Labels are looked for in this many leading columns.
const LABEL_COLUMNS: usize = 4;

const DATE_LABELS: &[&str] = &["DATA DO PAGAMENTO", "DATA DE PAGAMENTO", "DATA PAGAMENTO"];
const NARRATIVE_START: &str = "HISTORICO";
const NARRATIVE_TOTAL: &str = "TOTAL";

const AMOUNT_COLUMN: usize = 6;
const AMOUNT_FALLBACK_COLUMNS: &[usize] = &[7, 5];

/// Normalized fragments that identify the bank an entry went through.
const BANK_KEYWORDS: &[&str] = &[
    "SICREDI",
    "BRADESCO",
    "ITAU",
    "SANTANDER",
    "CAIXA",
    "BANCO DO BRASIL",
    "SICOOB",
    "UNICRED",
    "INTER",
    "NUBANK",
    "SAFRA",
    "BANRISUL",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Supplier is debited, bank credited.
    Payments,
    /// Bank is debited, customer credited.
    Receipts,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    OutsideBlock,
    InBlock,
    InNarrative,
}

fn leading_labels(row: &Row) -> impl Iterator<Item = String> + '_ {
    row.iter().take(LABEL_COLUMNS).map(|c| normalize(c))
}

fn is_date_label(row: &Row) -> bool {
    leading_labels(row).any(|l| DATE_LABELS.iter().any(|d| l.starts_with(d)))
}

fn is_narrative_start(row: &Row) -> bool {
    leading_labels(row).any(|l| l == NARRATIVE_START)
}

// "Total", "Total do dia", "Total geral": the word TOTAL opens the label and
// every other cell is blank, numeric or a date. Payees such as "TOTALTEC" or
// "Total Distribuidora" with a document column are entries.
fn is_narrative_total(row: &Row) -> bool {
    let Some(label_at) = leading_labels(row).position(|l| {
        l.split(' ').next() == Some(NARRATIVE_TOTAL)
    }) else {
        return false;
    };
    row.iter().enumerate().all(|(i, c)| {
        let c = c.trim();
        i == label_at || c.is_empty() || is_numeric_cell(c) || parse_date_dmy(c).is_some()
    })
}

/// Bank named in a cell, matched on whole words.
pub fn detect_bank(text: &str) -> bool {
    let padded = format!(" {} ", normalize(text));
    BANK_KEYWORDS
        .iter()
        .any(|kw| padded.contains(&format!(" {kw} ")))
}

// Preferred column, then the documented fallbacks, then the rightmost
// numeric cell.
fn entry_amount(row: &Row) -> Option<f64> {
    std::iter::once(AMOUNT_COLUMN)
        .chain(AMOUNT_FALLBACK_COLUMNS.iter().copied())
        .find_map(|i| row.get(i).and_then(|c| amount_cell(c)))
        .or_else(|| row.iter().rev().find_map(|c| amount_cell(c)))
}

struct Entry {
    date: NaiveDate,
    payee: String,
    bank: String,
    amount: f64,
}

enum Step {
    Nothing,
    Entry(Entry),
    /// A narrative line that could not be dated.
    Dropped,
}

struct BlockScanner<'o> {
    opts: &'o ExtractOptions,
    section: Section,
    block_date: Option<NaiveDate>,
    block_bank: Option<String>,
}

impl<'o> BlockScanner<'o> {
    fn new(opts: &'o ExtractOptions) -> Self {
        Self {
            opts,
            section: Section::OutsideBlock,
            block_date: None,
            block_bank: None,
        }
    }

    /// Advance over one row.
    fn step(&mut self, rows: &[Row], at: usize) -> Step {
        let row = &rows[at];
        if is_date_label(row) {
            self.section = Section::InBlock;
            self.block_date = date_in_row(row);
            self.block_bank = None;
            return Step::Nothing;
        }
        if is_narrative_start(row) {
            self.section = Section::InNarrative;
            return Step::Nothing;
        }
        if is_narrative_total(row) {
            if self.section == Section::InNarrative {
                self.section = Section::InBlock;
            }
            return Step::Nothing;
        }
        if self.section != Section::InNarrative {
            return Step::Nothing;
        }

        let Some(amount) = entry_amount(row).filter(|a| *a != 0.0) else {
            return Step::Nothing;
        };
        let Some((payee_at, payee)) = row
            .iter()
            .map(|c| c.trim())
            .enumerate()
            .find(|(_, c)| !c.is_empty() && !is_numeric_cell(c) && parse_date_dmy(c).is_none())
        else {
            return Step::Nothing;
        };

        let named_bank = row
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != payee_at)
            .map(|(_, c)| c.trim())
            .find(|c| detect_bank(c));
        if let Some(bank) = named_bank {
            self.block_bank = Some(bank.to_string());
        }
        let bank = self
            .block_bank
            .clone()
            .unwrap_or_else(|| self.opts.default_bank.clone());

        let date = self
            .block_date
            .or_else(|| look_back(rows, at, self.opts.lookback_rows, date_in_row));
        let Some(date) = date else {
            debug!(line = at, payee, "dropping entry with no payment date in reach");
            return Step::Dropped;
        };

        Step::Entry(Entry {
            date,
            payee: payee.to_string(),
            bank,
            amount: amount.abs(),
        })
    }
}

pub fn extract(
    rows: &[Row],
    resolver: &mut Resolver,
    opts: &ExtractOptions,
    direction: Direction,
) -> Extraction {
    let mut extraction = Extraction::default();
    extraction.stats.rows_scanned = rows.len();
    let mut scanner = BlockScanner::new(opts);

    for at in 0..rows.len() {
        let entry = match scanner.step(rows, at) {
            Step::Entry(entry) => entry,
            Step::Nothing => continue,
            Step::Dropped => {
                extraction.stats.skipped_rows += 1;
                continue;
            }
        };
        extraction.stats.transactions += 1;

        let (debit_text, credit_text, narrative) = match direction {
            Direction::Payments => (&entry.payee, &entry.bank, format!("PAGAMENTO A {}", entry.payee)),
            Direction::Receipts => (&entry.bank, &entry.payee, format!("RECEBIMENTO DE {}", entry.payee)),
        };
        let debit = resolver.resolve(debit_text, &opts.debit_prefixes);
        let credit = resolver.resolve(credit_text, &opts.credit_prefixes);
        extraction.stats.unresolved += usize::from(!debit.is_resolved()) + usize::from(!credit.is_resolved());

        extraction.rows.push(OutputRow::new(
            Operation::Debit,
            entry.date,
            &debit.code,
            debit_text,
            entry.amount,
            &narrative,
        ));
        extraction.rows.push(OutputRow::new(
            Operation::Credit,
            entry.date,
            &credit.code,
            credit_text,
            entry.amount,
            &narrative,
        ));
    }

    extraction
}
