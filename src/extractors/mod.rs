pub mod acisa;
pub mod atolini;
pub mod francesinha;

use chrono::NaiveDate;

use crate::fmt::{parse_amount, parse_date_dmy};
use crate::models::Extraction;
use crate::resolver::Resolver;
use crate::sheet::Row;

/// Rows searched backwards for a date or payer when a transaction shows up
/// before its marker.
pub const DEFAULT_LOOKBACK_ROWS: usize = 10;

/// Knobs shared by every extractor.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractOptions {
    /// Classification prefixes scoping the debit-side lookup.
    pub debit_prefixes: Vec<String>,
    /// Classification prefixes scoping the credit-side lookup.
    pub credit_prefixes: Vec<String>,
    /// Account receiving the daily aggregate debit in the francesinha layout.
    pub clearing_code: String,
    pub lookback_rows: usize,
    /// Bank description used when a payment block never names its bank.
    pub default_bank: String,
    pub interest_account: String,
    pub discount_account: String,
    pub bank_fee_account: String,
    pub notary_fee_account: String,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            debit_prefixes: Vec::new(),
            credit_prefixes: Vec::new(),
            clearing_code: crate::resolver::FALLBACK_CODE.to_string(),
            lookback_rows: DEFAULT_LOOKBACK_ROWS,
            default_bank: "BANCO".to_string(),
            interest_account: "JUROS RECEBIDOS".to_string(),
            discount_account: "DESCONTOS CONCEDIDOS".to_string(),
            bank_fee_account: "DESPESAS BANCARIAS".to_string(),
            notary_fee_account: "DESPESAS DE CARTORIO".to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Extractor kinds
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractorKind {
    Francesinha,
    AtoliniPagamentos,
    AtoliniRecebimentos,
    AcisaReceitas,
}

impl ExtractorKind {
    pub fn key(&self) -> &'static str {
        match self {
            Self::Francesinha => "francesinha",
            Self::AtoliniPagamentos => "atolini-pagamentos",
            Self::AtoliniRecebimentos => "atolini-recebimentos",
            Self::AcisaReceitas => "receitas-acisa",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Francesinha => "Sicredi francesinha (settled collection slips)",
            Self::AtoliniPagamentos => "Atolini payments report",
            Self::AtoliniRecebimentos => "Atolini receipts report",
            Self::AcisaReceitas => "ACISA receipts report",
        }
    }

    /// Which side each prefix list scopes, for help output.
    pub fn sides(&self) -> (&'static str, &'static str) {
        match self {
            Self::Francesinha => ("clearing account (fixed)", "payer"),
            Self::AtoliniPagamentos => ("supplier", "bank"),
            Self::AtoliniRecebimentos => ("bank", "customer"),
            Self::AcisaReceitas => ("payer", "customer"),
        }
    }

    pub fn extract(&self, rows: &[Row], resolver: &mut Resolver, opts: &ExtractOptions) -> Extraction {
        match self {
            Self::Francesinha => francesinha::extract(rows, resolver, opts),
            Self::AtoliniPagamentos => atolini::extract(rows, resolver, opts, atolini::Direction::Payments),
            Self::AtoliniRecebimentos => {
                atolini::extract(rows, resolver, opts, atolini::Direction::Receipts)
            }
            Self::AcisaReceitas => acisa::extract(rows, resolver, opts),
        }
    }
}

pub const ALL_EXTRACTORS: &[ExtractorKind] = &[
    ExtractorKind::Francesinha,
    ExtractorKind::AtoliniPagamentos,
    ExtractorKind::AtoliniRecebimentos,
    ExtractorKind::AcisaReceitas,
];

pub fn get_by_key(key: &str) -> Option<ExtractorKind> {
    ALL_EXTRACTORS.iter().find(|k| k.key() == key).copied()
}

// ---------------------------------------------------------------------------
// Row helpers shared by the scanners
// ---------------------------------------------------------------------------

/// Trimmed cell text, empty when the row is short.
pub(crate) fn cell(row: &Row, idx: usize) -> &str {
    row.get(idx).map_or("", |c| c.trim())
}

/// First non-empty cell to the right of `idx`.
pub(crate) fn next_filled(row: &Row, idx: usize) -> Option<&str> {
    row.iter()
        .skip(idx + 1)
        .map(|c| c.trim())
        .find(|c| !c.is_empty())
}

/// A cell made only of digits, separators, signs and currency marks.
pub(crate) fn is_numeric_cell(text: &str) -> bool {
    let t = text.trim();
    t.chars().any(|c| c.is_ascii_digit())
        && t.chars()
            .all(|c| c.is_ascii_digit() || matches!(c, '.' | ',' | '-' | '(' | ')' | '$' | 'R' | ' '))
}

/// Amount of a purely numeric cell; text that merely contains digits is not
/// an amount.
pub(crate) fn amount_cell(text: &str) -> Option<f64> {
    if is_numeric_cell(text) && parse_date_dmy(text).is_none() {
        parse_amount(text)
    } else {
        None
    }
}

/// First date found in any cell, including dates embedded after a label.
pub(crate) fn date_in_row(row: &Row) -> Option<NaiveDate> {
    row.iter().find_map(|c| {
        c.split(|ch: char| ch.is_whitespace() || ch == ':')
            .find_map(parse_date_dmy)
    })
}

/// Scan up to `window` rows before `at`, nearest first.
pub(crate) fn look_back<T>(
    rows: &[Row],
    at: usize,
    window: usize,
    mut found: impl FnMut(&Row) -> Option<T>,
) -> Option<T> {
    (1..=window.min(at)).find_map(|back| found(&rows[at - back]))
}

#[cfg(test)]
pub(crate) fn rows(lines: &[&[&str]]) -> Vec<Row> {
    lines
        .iter()
        .map(|l| l.iter().map(|c| c.to_string()).collect())
        .collect()
}
