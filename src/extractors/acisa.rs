//! ACISA receipts report. Marker rows set the current date ("Data:") and
//! payer ("Pagador"); every `<number> - <customer>` row after them is one
//! receipt, followed by its amount columns.

use std::sync::OnceLock;

use chrono::NaiveDate;
use regex::Regex;
use tracing::debug;

use crate::fmt::{parse_date_dmy, round2};
use crate::models::{Extraction, Operation, OutputRow};
use crate::normalize::normalize;
use crate::resolver::{MatchResult, Resolver};
use crate::sheet::Row;

use super::{amount_cell, date_in_row, look_back, next_filled, ExtractOptions};

const DATE_LABEL: &str = "DATA";
const PAYER_LABEL: &str = "PAGADOR";
/// Longest first, so the bare label never leaves "do Pagamento" behind.
const PAYER_LABELS: &[&str] = &["PAGADOR DO PAGAMENTO", "PAGADOR"];

/// Principal, interest, discount, bank fee, notary fee, net paid.
const AMOUNT_FIELDS: usize = 6;

fn entry_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\s*(\d+)\s*-\s*(.+?)\s*$").expect("valid entry pattern"))
}

fn residual_number() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\d+\s*-\s*").expect("valid prefix pattern"))
}

fn first_date(text: &str) -> Option<NaiveDate> {
    text.split_whitespace().find_map(parse_date_dmy)
}

/// "Data: 05/01/2026", or "Data:" with the date in the next filled cell.
fn date_marker(row: &Row) -> Option<Option<NaiveDate>> {
    row.iter().enumerate().find_map(|(i, c)| {
        let (label, value) = c.split_once(':')?;
        let label = normalize(label);
        if label != DATE_LABEL && !label.starts_with("DATA ") {
            return None;
        }
        let value = value.trim();
        let value = if value.is_empty() { next_filled(row, i).unwrap_or("") } else { value };
        Some(first_date(value))
    })
}

fn strip_payer_label(text: &str) -> &str {
    let t = text.trim();
    for label in PAYER_LABELS {
        if t.get(..label.len()).is_some_and(|head| head.eq_ignore_ascii_case(label)) {
            return t[label.len()..].trim_start_matches(|c: char| c == ':' || c == '-' || c.is_whitespace());
        }
    }
    t
}

fn payer_value<'r>(row: &'r Row, at: usize, value: &'r str) -> Option<&'r str> {
    let value = value.trim();
    if value.is_empty() {
        next_filled(row, at)
    } else {
        Some(value)
    }
}

/// A cell opening with the payer label. Yields the payer text, or `None`
/// inside when the marker carries no name.
fn payer_marker(row: &Row) -> Option<Option<&str>> {
    row.iter().enumerate().find_map(|(i, c)| {
        normalize(c)
            .starts_with(PAYER_LABEL)
            .then(|| payer_value(row, i, strip_payer_label(c)))
    })
}

/// Looser match for the lookback: any cell mentioning a payer.
fn payer_mention(row: &Row) -> Option<&str> {
    row.iter().enumerate().find_map(|(i, c)| {
        if !normalize(c).contains(PAYER_LABEL) {
            return None;
        }
        let after = c.rsplit_once(':').map_or("", |(_, v)| v);
        payer_value(row, i, after)
    })
}

struct Entry<'r> {
    number: &'r str,
    customer: String,
    column: usize,
}

fn entry_cell(row: &Row) -> Option<Entry<'_>> {
    row.iter().enumerate().find_map(|(column, c)| {
        if parse_date_dmy(c).is_some() {
            return None;
        }
        let caps = entry_pattern().captures(c)?;
        let number = caps.get(1)?.as_str();
        let rest = caps.get(2)?.as_str();
        if !rest.chars().any(char::is_alphabetic) {
            return None;
        }
        let customer = residual_number().replace(rest, "").trim().to_string();
        Some(Entry { number, customer, column })
    })
}

fn is_structural(row: &Row) -> bool {
    date_marker(row).is_some() || payer_marker(row).is_some() || entry_cell(row).is_some()
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct Amounts {
    principal: f64,
    interest: f64,
    discount: f64,
    bank_fee: f64,
    notary_fee: f64,
    net_paid: f64,
}

impl Amounts {
    fn read(row: &Row, column: usize) -> Option<Self> {
        let fields: Vec<Option<f64>> = (1..=AMOUNT_FIELDS)
            .map(|k| row.get(column + k).and_then(|c| amount_cell(c)))
            .collect();
        if fields.iter().all(Option::is_none) {
            return None;
        }
        let v = |k: usize| fields[k].map_or(0.0, |a| round2(a.abs()));
        let mut amounts = Self {
            principal: v(0),
            interest: v(1),
            discount: v(2),
            bank_fee: v(3),
            notary_fee: v(4),
            net_paid: v(5),
        };
        if fields[5].is_none() {
            amounts.net_paid = round2(
                amounts.principal + amounts.interest - amounts.discount - amounts.bank_fee - amounts.notary_fee,
            )
            .abs();
        }
        Some(amounts)
    }

    fn is_zero(&self) -> bool {
        [self.principal, self.interest, self.discount, self.bank_fee, self.notary_fee, self.net_paid]
            .iter()
            .all(|a| *a == 0.0)
    }
}

struct Payer {
    description: String,
    account: MatchResult,
}

pub fn extract(rows: &[Row], resolver: &mut Resolver, opts: &ExtractOptions) -> Extraction {
    let mut extraction = Extraction::default();
    extraction.stats.rows_scanned = rows.len();

    let mut current_date: Option<NaiveDate> = None;
    let mut payer: Option<Payer> = None;

    for (at, row) in rows.iter().enumerate() {
        let mut marker = false;
        if let Some(date) = date_marker(row) {
            marker = true;
            if date.is_some() {
                current_date = date;
            }
        }
        if let Some(name) = payer_marker(row) {
            marker = true;
            payer = name.map(|n| Payer {
                description: n.to_string(),
                account: resolver.resolve(n, &opts.debit_prefixes),
            });
        }
        if marker {
            continue;
        }

        let Some(entry) = entry_cell(row) else { continue };

        // Amounts sometimes wrap onto the line below the customer.
        let amounts = Amounts::read(row, entry.column).or_else(|| {
            rows.get(at + 1)
                .filter(|next| !is_structural(next))
                .and_then(|next| Amounts::read(next, entry.column))
        });
        let Some(amounts) = amounts.filter(|a| !a.is_zero()) else {
            debug!(line = at, number = entry.number, "skipping receipt without amounts");
            extraction.stats.skipped_rows += 1;
            continue;
        };

        let date = current_date.or_else(|| look_back(rows, at, opts.lookback_rows, date_in_row));
        let Some(date) = date else {
            debug!(line = at, number = entry.number, "dropping receipt with no date in reach");
            extraction.stats.skipped_rows += 1;
            continue;
        };

        if payer.is_none() {
            payer = look_back(rows, at, opts.lookback_rows, |r| payer_mention(r).map(str::to_string)).map(|n| {
                let account = resolver.resolve(&n, &opts.debit_prefixes);
                Payer { description: n, account }
            });
        }
        let (payer_description, payer_code, payer_resolved) = match &payer {
            Some(p) => (p.description.as_str(), p.account.code.clone(), p.account.is_resolved()),
            None => ("", resolver.fallback_code().to_string(), false),
        };

        extraction.stats.transactions += 1;
        let narrative = format!("RECEBIMENTO {} - {}", entry.number, entry.customer);
        let customer = resolver.resolve(&entry.customer, &opts.credit_prefixes);
        extraction.stats.unresolved += usize::from(!payer_resolved) + usize::from(!customer.is_resolved());

        let mut post = |op: Operation, code: &str, description: &str, amount: f64| {
            if amount != 0.0 {
                extraction
                    .rows
                    .push(OutputRow::new(op, date, code, description, amount, &narrative));
            }
        };
        post(Operation::Debit, &payer_code, payer_description, amounts.net_paid);
        post(Operation::Credit, &customer.code, &entry.customer, amounts.principal);

        let auxiliary = [
            (Operation::Credit, &opts.interest_account, amounts.interest),
            (Operation::Debit, &opts.discount_account, amounts.discount),
            (Operation::Debit, &opts.bank_fee_account, amounts.bank_fee),
            (Operation::Debit, &opts.notary_fee_account, amounts.notary_fee),
        ];
        for (op, description, amount) in auxiliary {
            if amount == 0.0 {
                continue;
            }
            let account = resolver.resolve(description, &[]);
            if !account.is_resolved() {
                extraction.stats.unresolved += 1;
            }
            post(op, &account.code, description, amount);
        }
    }

    extraction
}
