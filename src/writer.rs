use encoding_rs::WINDOWS_1252;

use crate::error::{ConvertError, Result};
use crate::models::OutputRow;

pub const HEADER: [&str; 6] = [
    "Operação",
    "Data",
    "Descrição Credito",
    "Conta Credito",
    "Valor",
    "Historico",
];

/// Strip tab/LF/CR, turn any other control character into a space, trim.
pub fn sanitize(field: &str) -> String {
    let cleaned: String = field
        .chars()
        .filter(|c| !matches!(c, '\t' | '\n' | '\r'))
        .map(|c| if c.is_control() { ' ' } else { c })
        .collect();
    cleaned.trim().to_string()
}

/// Serialize ledger lines into the `;`-delimited Windows-1252 import file.
/// Nothing is returned unless every row encodes.
pub fn write_ledger(rows: &[OutputRow]) -> Result<Vec<u8>> {
    let mut wtr = csv::WriterBuilder::new()
        .delimiter(b';')
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(Vec::new());
    wtr.write_record(HEADER.map(sanitize))?;
    for row in rows {
        let record = [
            row.operation.code(),
            row.date.as_str(),
            row.counterparty_description.as_str(),
            row.account_code.as_str(),
            row.amount.as_str(),
            row.narrative.as_str(),
        ]
        .map(sanitize);
        wtr.write_record(&record)?;
    }
    let utf8 = wtr.into_inner().map_err(|e| ConvertError::Io(e.into_error()))?;
    let text = String::from_utf8(utf8).map_err(|e| ConvertError::Encoding(e.to_string()))?;
    encode_legacy(&text)
}

/// Encode to Windows-1252, refusing characters the code page cannot hold.
pub fn encode_legacy(text: &str) -> Result<Vec<u8>> {
    let (bytes, _, had_errors) = WINDOWS_1252.encode(text);
    if had_errors {
        let offending = text
            .chars()
            .find(|c| WINDOWS_1252.encode(c.encode_utf8(&mut [0; 4])).2)
            .unwrap_or(char::REPLACEMENT_CHARACTER);
        return Err(ConvertError::Encoding(format!(
            "character {offending:?} (U+{:04X}) has no Windows-1252 representation",
            offending as u32
        )));
    }
    Ok(bytes.into_owned())
}
