//! Sicredi "francesinha": one settled collection slip per row.
//!
//! Slips are grouped by settlement date. Each day becomes one debit to the
//! clearing account, dated the following day, then one credit per payer.

use tracing::debug;

use crate::fmt::{parse_amount, parse_date_dmy, round2};
use crate::models::{ConversionStats, Extraction, Operation, OutputRow, Transaction};
use crate::resolver::Resolver;
use crate::sheet::Row;

use super::{cell, ExtractOptions};

const ROW_TAG: &str = "SIMPLES";
const MIN_FIELDS: usize = 9;

const COL_DOCUMENT: usize = 1;
const COL_OUR_NUMBER: usize = 2;
const COL_PAYER: usize = 4;
const COL_DUE_DATE: usize = 5;
const COL_SETTLED: usize = 6;
const COL_AMOUNT: usize = 8;

pub const DAILY_NARRATIVE: &str = "Títulos recebidos na data";

fn is_tagged(row: &Row) -> bool {
    cell(row, 0).to_uppercase().starts_with(ROW_TAG)
}

fn read_slip(row: &Row) -> Option<Transaction> {
    if row.len() < MIN_FIELDS || !is_tagged(row) {
        return None;
    }
    let settled = parse_date_dmy(cell(row, COL_SETTLED))?;
    let amount = parse_amount(cell(row, COL_AMOUNT)).unwrap_or(0.0);
    let payer = cell(row, COL_PAYER);
    let narrative = format!(
        "RECEBIMENTO DE {payer} CONFORME BOLETO {} COM VENCIMENTO EM {} REFERENTE DOCUMENTO {}",
        cell(row, COL_OUR_NUMBER),
        cell(row, COL_DUE_DATE),
        cell(row, COL_DOCUMENT),
    );
    Some(Transaction::new(settled, payer, amount, narrative))
}

pub fn extract(rows: &[Row], resolver: &mut Resolver, opts: &ExtractOptions) -> Extraction {
    let mut stats = ConversionStats {
        rows_scanned: rows.len(),
        ..Default::default()
    };

    let mut slips = Vec::new();
    for (line, row) in rows.iter().enumerate() {
        match read_slip(row) {
            Some(slip) => slips.push(slip),
            None if is_tagged(row) => {
                debug!(line, "skipping slip without a settlement date");
                stats.skipped_rows += 1;
            }
            None => {}
        }
    }
    // Stable: slips settled the same day keep file order.
    slips.sort_by_key(|s| s.date);
    stats.transactions = slips.len();

    let mut out = Vec::with_capacity(slips.len() + 16);
    for group in slips.chunk_by(|a, b| a.date == b.date) {
        let settled = group[0].date;
        let Some(posting) = settled.succ_opt() else {
            stats.skipped_rows += group.len();
            continue;
        };
        let total = round2(group.iter().map(|s| s.amount).sum());
        out.push(OutputRow::new(
            Operation::Debit,
            posting,
            &opts.clearing_code,
            "",
            total,
            DAILY_NARRATIVE,
        ));
        for slip in group {
            let account = resolver.resolve(&slip.description, &opts.credit_prefixes);
            if !account.is_resolved() {
                stats.unresolved += 1;
            }
            out.push(OutputRow::new(
                Operation::Credit,
                posting,
                &account.code,
                &slip.description,
                slip.amount,
                &slip.ancillary_text,
            ));
        }
    }

    Extraction { rows: out, stats }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accounts::AccountIndex;
    use crate::extractors::rows;
    use crate::resolver::FALLBACK_CODE;

    fn slip(doc: &str, payer: &str, settled: &str, amount: &str) -> Vec<String> {
        vec![
            "SIMPLES".into(),
            doc.into(),
            format!("NN{doc}"),
            "x".into(),
            payer.into(),
            "10/01/2026".into(),
            settled.into(),
            "".into(),
            amount.into(),
        ]
    }

    fn chart() -> AccountIndex {
        AccountIndex::load("9487;1.1.2;ACME LTDA\n9500;1.1.2;BETA COMERCIO\n9473;2.1.1;ACME LTDA\n".as_bytes())
            .unwrap()
    }

    #[test]
    fn test_daily_group_debit_is_sum_dated_next_day() {
        let index = chart();
        let mut resolver = Resolver::new(&index, FALLBACK_CODE);
        let sheet = vec![
            slip("1", "ACME LTDA", "15/01/2026", "10,00"),
            slip("2", "BETA COMERCIO", "15/01/2026", "20,00"),
            slip("3", "ACME LTDA", "15/01/2026", "5,00"),
        ];
        let result = extract(&sheet, &mut resolver, &ExtractOptions::default());
        assert_eq!(result.rows.len(), 4);
        let debit = &result.rows[0];
        assert_eq!(debit.operation, Operation::Debit);
        assert_eq!(debit.amount, "35,00");
        assert_eq!(debit.date, "16/01/2026");
        assert_eq!(debit.account_code, FALLBACK_CODE);
        assert_eq!(debit.narrative, DAILY_NARRATIVE);
        assert!(result.rows[1..].iter().all(|r| r.operation == Operation::Credit && r.date == "16/01/2026"));
        assert_eq!(result.stats.transactions, 3);
    }

    #[test]
    fn test_groups_sorted_by_settlement_date() {
        let index = chart();
        let mut resolver = Resolver::new(&index, FALLBACK_CODE);
        let sheet = vec![
            slip("1", "ACME LTDA", "20/01/2026", "1,00"),
            slip("2", "BETA COMERCIO", "15/01/2026", "2,00"),
            slip("3", "ACME LTDA", "20/01/2026", "3,00"),
        ];
        let result = extract(&sheet, &mut resolver, &ExtractOptions::default());
        let summary: Vec<(&str, &str, &str)> = result
            .rows
            .iter()
            .map(|r| (r.operation.code(), r.date.as_str(), r.amount.as_str()))
            .collect();
        assert_eq!(
            summary,
            vec![
                ("D", "16/01/2026", "2,00"),
                ("C", "16/01/2026", "2,00"),
                ("D", "21/01/2026", "4,00"),
                ("C", "21/01/2026", "1,00"),
                ("C", "21/01/2026", "3,00"),
            ]
        );
    }

    #[test]
    fn test_credit_rows_resolve_with_credit_scope() {
        let index = chart();
        let mut resolver = Resolver::new(&index, FALLBACK_CODE);
        let opts = ExtractOptions {
            credit_prefixes: vec!["2.1.1".to_string()],
            ..Default::default()
        };
        let sheet = vec![slip("7", "Acme Ltda.", "15/01/2026", "1.000,00")];
        let result = extract(&sheet, &mut resolver, &opts);
        let credit = &result.rows[1];
        assert_eq!(credit.account_code, "9473");
        assert_eq!(credit.counterparty_description, "Acme Ltda.");
        assert_eq!(credit.amount, "1000,00");
        assert_eq!(
            credit.narrative,
            "RECEBIMENTO DE Acme Ltda. CONFORME BOLETO NN7 COM VENCIMENTO EM 10/01/2026 REFERENTE DOCUMENTO 7"
        );
    }

    #[test]
    fn test_malformed_rows_are_skipped_not_fatal() {
        let index = chart();
        let mut resolver = Resolver::new(&index, FALLBACK_CODE);
        let mut sheet = rows(&[
            &["Relatorio francesinha"],
            &["Carteira", "Documento", "Nosso numero"],
            &["SIMPLES", "short row"],
        ]);
        sheet.push(slip("9", "ACME LTDA", "sem data", "5,00"));
        sheet.push(slip("10", "ACME LTDA", "15/01/2026", "valor?"));
        let result = extract(&sheet, &mut resolver, &ExtractOptions::default());
        assert_eq!(result.stats.transactions, 1);
        assert_eq!(result.stats.skipped_rows, 2);
        assert_eq!(result.rows[1].amount, "0,00");
    }

    #[test]
    fn test_unresolved_payers_are_counted() {
        let index = chart();
        let mut resolver = Resolver::new(&index, "999");
        let opts = ExtractOptions {
            credit_prefixes: vec!["7".to_string()],
            ..Default::default()
        };
        let sheet = vec![slip("1", "ACME LTDA", "15/01/2026", "1,00")];
        let result = extract(&sheet, &mut resolver, &opts);
        assert_eq!(result.stats.unresolved, 1);
        assert_eq!(result.rows[1].account_code, "999");
    }

    #[test]
    fn test_empty_input() {
        let index = chart();
        let mut resolver = Resolver::new(&index, FALLBACK_CODE);
        let result = extract(&[], &mut resolver, &ExtractOptions::default());
        assert!(result.rows.is_empty());
        assert_eq!(result.stats, ConversionStats::default());
    }
}
