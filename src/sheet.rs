use std::path::Path;

use encoding_rs::WINDOWS_1252;
use tracing::debug;

use crate::error::{ConvertError, Result};

/// One ingested row: cells as text, positions relative to column A.
pub type Row = Vec<String>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    Csv,
    Xls,
    Xlsx,
}

impl SourceFormat {
    /// Select the reader from a filename extension (case-insensitive).
    pub fn from_filename(filename: &str) -> Result<Self> {
        let ext = Path::new(filename)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_default();
        match ext.as_str() {
            "csv" => Ok(Self::Csv),
            "xls" => Ok(Self::Xls),
            "xlsx" => Ok(Self::Xlsx),
            "" => Err(ConvertError::UnsupportedFormat(format!(
                "{filename} has no extension (expected .csv, .xls or .xlsx)"
            ))),
            other => Err(ConvertError::UnsupportedFormat(format!(
                ".{other} (expected .csv, .xls or .xlsx)"
            ))),
        }
    }
}

/// Decode legacy exports. Windows-1252 is the superset of Latin-1 that the
/// accounting systems actually emit; a UTF-8 BOM switches to UTF-8.
pub fn decode_legacy(bytes: &[u8]) -> String {
    let (text, _, _) = WINDOWS_1252.decode(bytes);
    text.into_owned()
}

/// Split `;`-delimited legacy text into rows. Records the CSV reader cannot
/// frame are skipped.
pub fn read_delimited(bytes: &[u8]) -> Vec<Row> {
    let text = decode_legacy(bytes);
    let mut rdr = csv::ReaderBuilder::new()
        .delimiter(b';')
        .has_headers(false)
        .flexible(true)
        .from_reader(text.as_bytes());
    let mut rows = Vec::new();
    for (line, result) in rdr.records().enumerate() {
        let Ok(record) = result else {
            debug!(line, "skipping unreadable delimited record");
            continue;
        };
        rows.push(record.iter().map(str::to_string).collect());
    }
    rows
}

/// Load an export into rows regardless of its container format.
pub fn load_rows(bytes: &[u8], format: SourceFormat) -> Result<Vec<Row>> {
    match format {
        SourceFormat::Csv => Ok(read_delimited(bytes)),
        SourceFormat::Xls => read_xls(bytes),
        SourceFormat::Xlsx => read_xlsx(bytes),
    }
}

#[cfg(feature = "spreadsheet")]
fn read_xls(bytes: &[u8]) -> Result<Vec<Row>> {
    use calamine::{Xls, Xlsx};

    match read_workbook::<Xls<_>>(bytes) {
        Ok(rows) => Ok(rows),
        Err(xls_err) => {
            // Exports are regularly saved as .xlsx under a .xls name.
            debug!(error = %xls_err, "binary workbook reader failed, trying XML workbook reader");
            read_workbook::<Xlsx<_>>(bytes).map_err(|xlsx_err| {
                ConvertError::Spreadsheet(format!(
                    "not a readable .xls ({xls_err}) nor .xlsx ({xlsx_err})"
                ))
            })
        }
    }
}

#[cfg(feature = "spreadsheet")]
fn read_xlsx(bytes: &[u8]) -> Result<Vec<Row>> {
    read_workbook::<calamine::Xlsx<_>>(bytes).map_err(ConvertError::Spreadsheet)
}

#[cfg(not(feature = "spreadsheet"))]
fn read_xls(_bytes: &[u8]) -> Result<Vec<Row>> {
    Err(ConvertError::UnsupportedFormat(
        ".xls (built without spreadsheet support)".to_string(),
    ))
}

#[cfg(not(feature = "spreadsheet"))]
fn read_xlsx(_bytes: &[u8]) -> Result<Vec<Row>> {
    Err(ConvertError::UnsupportedFormat(
        ".xlsx (built without spreadsheet support)".to_string(),
    ))
}

#[cfg(feature = "spreadsheet")]
fn read_workbook<W>(bytes: &[u8]) -> std::result::Result<Vec<Row>, String>
where
    W: calamine::Reader<std::io::Cursor<Vec<u8>>>,
    W::Error: std::fmt::Display,
{
    let mut workbook = W::new(std::io::Cursor::new(bytes.to_vec())).map_err(|e| e.to_string())?;
    let mut rows = Vec::new();
    for name in workbook.sheet_names() {
        let range = match workbook.worksheet_range(&name) {
            Ok(range) => range,
            Err(e) => {
                debug!(sheet = %name, error = %e, "skipping unreadable sheet");
                continue;
            }
        };
        // calamine ranges start at the first used cell; pad back to column A.
        let pad = range.start().map_or(0, |(_, col)| col as usize);
        for row in range.rows() {
            let mut cells = vec![String::new(); pad];
            cells.extend(row.iter().map(render_cell));
            rows.push(cells);
        }
    }
    Ok(rows)
}

/// Render a workbook cell the way the delimited exports spell it: dates as
/// dd/mm/yyyy, whole numbers without a fraction, other numbers to cents.
#[cfg(feature = "spreadsheet")]
pub fn render_cell(cell: &calamine::Data) -> String {
    use calamine::Data;

    match cell {
        Data::Empty | Data::Error(_) => String::new(),
        Data::String(s) => s.clone(),
        Data::Int(i) => i.to_string(),
        Data::Float(f) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", *f as i64),
        Data::Float(f) => format!("{f:.2}"),
        Data::Bool(b) => b.to_string(),
        Data::DateTime(dt) => excel_serial_to_date(dt.as_f64())
            .map(crate::fmt::format_dmy)
            .unwrap_or_default(),
        Data::DateTimeIso(s) => crate::fmt::parse_date_dmy(s)
            .map(crate::fmt::format_dmy)
            .unwrap_or_else(|| s.clone()),
        Data::DurationIso(s) => s.clone(),
    }
}

#[cfg(any(feature = "spreadsheet", test))]
pub fn excel_serial_to_date(serial: f64) -> Option<chrono::NaiveDate> {
    // Excel epoch is 1899-12-30 (accounting for the 1900 leap year bug)
    let base = chrono::NaiveDate::from_ymd_opt(1899, 12, 30)?;
    base.checked_add_signed(chrono::Duration::days(serial.floor() as i64))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_from_filename() {
        assert_eq!(SourceFormat::from_filename("janeiro.csv").unwrap(), SourceFormat::Csv);
        assert_eq!(SourceFormat::from_filename("JANEIRO.XLS").unwrap(), SourceFormat::Xls);
        assert_eq!(SourceFormat::from_filename("dir/report.v2.xlsx").unwrap(), SourceFormat::Xlsx);
    }

    #[test]
    fn test_format_rejects_unsupported() {
        let err = SourceFormat::from_filename("extrato.pdf").unwrap_err();
        assert!(matches!(err, ConvertError::UnsupportedFormat(_)));
        assert!(err.to_string().contains(".pdf"));
        assert!(SourceFormat::from_filename("noextension").is_err());
    }

    #[test]
    fn test_decode_legacy_latin1() {
        assert_eq!(decode_legacy(b"Jo\xe3o A\xe7\xfacar"), "João Açúcar");
        assert_eq!(decode_legacy("\u{feff}Ação".as_bytes()), "Ação");
    }

    #[test]
    fn test_read_delimited_flexible_and_quoted() {
        let bytes = b"1;2;3\nA;\"B;C\"\n\nSIMPLES;x;y;z;Jos\xe9\n";
        let rows = read_delimited(bytes);
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0], vec!["1", "2", "3"]);
        assert_eq!(rows[1], vec!["A", "B;C"]);
        assert_eq!(rows[2][4], "José");
    }

    #[test]
    fn test_load_rows_csv() {
        let rows = load_rows(b"a;b\nc;d;e\n", SourceFormat::Csv).unwrap();
        assert_eq!(rows, vec![vec!["a", "b"], vec!["c", "d", "e"]]);
    }

    #[test]
    fn test_excel_serial_to_date() {
        assert_eq!(
            excel_serial_to_date(45667.0),
            chrono::NaiveDate::from_ymd_opt(2025, 1, 10)
        );
        assert_eq!(
            excel_serial_to_date(45667.75),
            chrono::NaiveDate::from_ymd_opt(2025, 1, 10)
        );
    }

    #[cfg(feature = "spreadsheet")]
    #[test]
    fn test_render_cell() {
        use calamine::Data;

        assert_eq!(render_cell(&Data::Empty), "");
        assert_eq!(render_cell(&Data::String("ACME".into())), "ACME");
        assert_eq!(render_cell(&Data::Int(42)), "42");
        assert_eq!(render_cell(&Data::Float(1234.0)), "1234");
        assert_eq!(render_cell(&Data::Float(1234.5)), "1234.50");
        assert_eq!(render_cell(&Data::Bool(true)), "true");
        assert_eq!(render_cell(&Data::DateTimeIso("2026-01-15T00:00:00".into())), "15/01/2026");
    }

    #[cfg(feature = "spreadsheet")]
    #[test]
    fn test_rendered_float_parses_back_as_amount() {
        let text = render_cell(&calamine::Data::Float(1234.567));
        assert_eq!(crate::fmt::parse_amount(&text), Some(1234.57));
    }

    // Two sheets; the first one's data starts at column C.
    #[cfg(feature = "spreadsheet")]
    fn two_sheet_workbook() -> Vec<u8> {
        let mut workbook = rust_xlsxwriter::Workbook::new();
        {
            let sheet = workbook.add_worksheet();
            sheet.set_name("Janeiro").unwrap();
            sheet.write_string(0, 2, "Pagador").unwrap();
            sheet.write_string(0, 3, "Valor").unwrap();
            sheet.write_string(1, 2, "ACME LTDA").unwrap();
            sheet.write_number(1, 3, 1234.5).unwrap();
        }
        {
            let sheet = workbook.add_worksheet();
            sheet.set_name("Fevereiro").unwrap();
            sheet.write_string(0, 0, "Total").unwrap();
            sheet.write_number(0, 1, 10.0).unwrap();
        }
        workbook.save_to_buffer().unwrap()
    }

    #[cfg(feature = "spreadsheet")]
    #[test]
    fn test_load_rows_xlsx_flattens_sheets_padded_to_column_a() {
        let rows = load_rows(&two_sheet_workbook(), SourceFormat::Xlsx).unwrap();
        assert_eq!(
            rows,
            vec![
                vec!["", "", "Pagador", "Valor"],
                vec!["", "", "ACME LTDA", "1234.50"],
                vec!["Total", "10"],
            ]
        );
    }

    #[cfg(feature = "spreadsheet")]
    #[test]
    fn test_xlsx_named_xls_is_read_through_fallback() {
        let bytes = two_sheet_workbook();
        let via_xls = load_rows(&bytes, SourceFormat::Xls).unwrap();
        assert_eq!(via_xls, load_rows(&bytes, SourceFormat::Xlsx).unwrap());
        assert_eq!(via_xls.len(), 3);
    }

    #[cfg(feature = "spreadsheet")]
    #[test]
    fn test_xls_falls_back_then_reports_both_readers() {
        let err = load_rows(b"definitely not a workbook", SourceFormat::Xls).unwrap_err();
        match err {
            ConvertError::Spreadsheet(msg) => {
                assert!(msg.contains(".xls"));
                assert!(msg.contains(".xlsx"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[cfg(feature = "spreadsheet")]
    #[test]
    fn test_xlsx_garbage_is_fatal() {
        let err = load_rows(b"PK not really", SourceFormat::Xlsx).unwrap_err();
        assert!(matches!(err, ConvertError::Spreadsheet(_)));
    }
}
