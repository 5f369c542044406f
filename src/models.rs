use chrono::NaiveDate;

use crate::fmt::{comma_decimal, format_dmy, round2};

/// A transaction read off an export before account assignment.
#[derive(Debug, Clone, PartialEq)]
pub struct Transaction {
    pub date: NaiveDate,
    pub description: String,
    pub amount: f64,
    pub ancillary_text: String,
}

impl Transaction {
    pub fn new(date: NaiveDate, description: &str, amount: f64, ancillary_text: String) -> Self {
        Self {
            date,
            description: description.trim().to_string(),
            amount: round2(amount),
            ancillary_text,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Debit,
    Credit,
}

impl Operation {
    pub fn code(&self) -> &'static str {
        match self {
            Self::Debit => "D",
            Self::Credit => "C",
        }
    }
}

/// One line of the ledger export, already in the import format.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputRow {
    pub operation: Operation,
    pub date: String,
    pub account_code: String,
    pub counterparty_description: String,
    pub amount: String,
    pub narrative: String,
}

impl OutputRow {
    pub fn new(
        operation: Operation,
        date: NaiveDate,
        account_code: &str,
        counterparty_description: &str,
        amount: f64,
        narrative: &str,
    ) -> Self {
        Self {
            operation,
            date: format_dmy(date),
            account_code: account_code.to_string(),
            counterparty_description: counterparty_description.to_string(),
            amount: comma_decimal(amount),
            narrative: narrative.to_string(),
        }
    }
}

/// What a conversion saw and produced.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConversionStats {
    pub rows_scanned: usize,
    pub transactions: usize,
    pub skipped_rows: usize,
    pub unresolved: usize,
}

/// Extractor output: ledger lines plus counters.
#[derive(Debug, Clone, Default)]
pub struct Extraction {
    pub rows: Vec<OutputRow>,
    pub stats: ConversionStats,
}
