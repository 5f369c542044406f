use chrono::NaiveDate;

/// Round to cents, half away from zero.
pub fn round2(val: f64) -> f64 {
    (val * 100.0).round() / 100.0
}

/// Parse Brazilian or dot-decimal money text. `None` means the cell held no
/// usable number; callers treat that as zero.
pub fn parse_amount(raw: &str) -> Option<f64> {
    let s = raw.trim().trim_matches('"').trim();
    let s = s.strip_prefix("R$").unwrap_or(s).trim_start();
    let (s, parenthesized) = match s.strip_prefix('(').and_then(|v| v.strip_suffix(')')) {
        Some(inner) => (inner, true),
        None => (s, false),
    };
    let kept: String = s
        .chars()
        .filter(|c| c.is_ascii_digit() || matches!(c, '.' | ',' | '-'))
        .collect();
    let negative = parenthesized || kept.starts_with('-') || kept.ends_with('-');
    let body: String = kept.chars().filter(|c| *c != '-').collect();
    if !body.chars().any(|c| c.is_ascii_digit()) {
        return None;
    }

    let decimal_at = decimal_separator_position(&body);
    let (int_part, frac_part) = match decimal_at {
        Some(pos) => (&body[..pos], &body[pos + 1..]),
        None => (body.as_str(), ""),
    };
    let int_digits: String = int_part.chars().filter(char::is_ascii_digit).collect();
    let frac_digits: String = frac_part.chars().filter(char::is_ascii_digit).collect();

    let whole: u128 = if int_digits.is_empty() {
        0
    } else {
        int_digits.parse().ok()?
    };
    let frac: Vec<u32> = frac_digits.chars().filter_map(|c| c.to_digit(10)).collect();
    let mut cents = whole.checked_mul(100)?
        + u128::from(frac.first().copied().unwrap_or(0) * 10 + frac.get(1).copied().unwrap_or(0));
    if frac.get(2).copied().unwrap_or(0) >= 5 {
        cents += 1;
    }

    let value = cents as f64 / 100.0;
    Some(if negative && value != 0.0 { -value } else { value })
}

// Byte index of the decimal point in a string of digits, dots and commas.
fn decimal_separator_position(body: &str) -> Option<usize> {
    let last_dot = body.rfind('.');
    let last_comma = body.rfind(',');
    match (last_dot, last_comma) {
        (Some(d), Some(c)) => Some(d.max(c)),
        (Some(d), None) => lone_separator(body, '.', d),
        (None, Some(c)) => lone_separator(body, ',', c),
        (None, None) => None,
    }
}

// A separator kind that appears alone is a decimal point only when it occurs
// once. A single comma is always decimal; a single dot followed by exactly
// three digits after a non-zero leading part is a thousands group.
fn lone_separator(body: &str, sep: char, pos: usize) -> Option<usize> {
    if body.matches(sep).count() > 1 {
        return None;
    }
    let trailing = body.len() - pos - 1;
    if sep == '.' && trailing == 3 && pos > 0 && !body.starts_with('0') {
        None
    } else {
        Some(pos)
    }
}

/// Parse dd/mm/yyyy (also dd/mm/yy, dd-mm-yyyy, dd.mm.yyyy and ISO
/// yyyy-mm-dd), ignoring a trailing time component. Dotted dates must be
/// dd.mm.yyyy so grouped amounts like `1.012.025` stay amounts.
pub fn parse_date_dmy(raw: &str) -> Option<NaiveDate> {
    let token = raw.trim().split_whitespace().next()?;
    let token = token.split('T').next()?;
    let parts: Vec<&str> = token.split(['/', '-', '.']).collect();
    if parts.len() != 3 || parts.iter().any(|p| p.is_empty() || !p.bytes().all(|b| b.is_ascii_digit())) {
        return None;
    }
    let (d, m, y) = if parts[0].len() == 4 {
        (parts[2], parts[1], parts[0])
    } else {
        (parts[0], parts[1], parts[2])
    };
    if token.contains('.') && !(parts[0].len() <= 2 && parts[1].len() <= 2 && parts[2].len() == 4) {
        return None;
    }
    let d: u32 = d.parse().ok()?;
    let m: u32 = m.parse().ok()?;
    let mut y: i32 = y.parse().ok()?;
    if y < 100 {
        y += 2000;
    }
    NaiveDate::from_ymd_opt(y, m, d)
}

pub fn format_dmy(date: NaiveDate) -> String {
    date.format("%d/%m/%Y").to_string()
}

/// Ledger amount: two decimals, comma separator, no grouping.
pub fn comma_decimal(val: f64) -> String {
    let mut rounded = round2(val);
    if rounded == 0.0 {
        rounded = 0.0;
    }
    format!("{rounded:.2}").replace('.', ",")
}

/// Display amount with thousands separators: R$ 1.234,56
pub fn brl(val: f64) -> String {
    let negative = val < 0.0;
    let cents = format!("{:.2}", round2(val).abs());
    let (int_part, dec_part) = cents.split_once('.').unwrap_or((cents.as_str(), "00"));

    let mut grouped = String::new();
    for (i, c) in int_part.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(c);
    }
    let grouped: String = grouped.chars().rev().collect();

    if negative && cents != "0.00" {
        format!("-R$ {grouped},{dec_part}")
    } else {
        format!("R$ {grouped},{dec_part}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_amount_brazilian() {
        assert_eq!(parse_amount("1.234,56"), Some(1234.56));
        assert_eq!(parse_amount("1.234.567,89"), Some(1234567.89));
        assert_eq!(parse_amount("10,5"), Some(10.5));
        assert_eq!(parse_amount("R$ 2.000,00"), Some(2000.0));
    }

    #[test]
    fn test_parse_amount_dot_decimal() {
        assert_eq!(parse_amount("1234.56"), Some(1234.56));
        assert_eq!(parse_amount("1,234.56"), Some(1234.56));
        assert_eq!(parse_amount("42"), Some(42.0));
    }

    #[test]
    fn test_parse_amount_negatives() {
        assert_eq!(parse_amount("(10,00)"), Some(-10.0));
        assert_eq!(parse_amount("-42,50"), Some(-42.5));
        assert_eq!(parse_amount("150,00-"), Some(-150.0));
        assert_eq!(parse_amount("\"(1.234,56)\""), Some(-1234.56));
        assert_eq!(parse_amount("-0,00"), Some(0.0));
    }

    #[test]
    fn test_parse_amount_thousands_group_alone() {
        assert_eq!(parse_amount("1.234"), Some(1234.0));
        assert_eq!(parse_amount("12.345.678"), Some(12345678.0));
        assert_eq!(parse_amount("1,234,567"), Some(1234567.0));
        assert_eq!(parse_amount("0,123"), Some(0.12));
    }

    #[test]
    fn test_parse_amount_lone_comma_is_decimal() {
        assert_eq!(parse_amount("10,500"), Some(10.5));
        assert_eq!(parse_amount("1,234"), Some(1.23));
        assert_eq!(parse_amount("R$ 250,125"), Some(250.13));
    }

    #[test]
    fn test_parse_amount_rounds_half_away_from_zero() {
        assert_eq!(parse_amount("1,0050"), Some(1.01));
        assert_eq!(parse_amount("2.675"), Some(2675.0));
        assert_eq!(parse_amount("0,004"), Some(0.0));
        assert_eq!(parse_amount("-1,0050"), Some(-1.01));
        assert_eq!(parse_amount("1.000,125"), Some(1000.13));
    }

    #[test]
    fn test_parse_amount_failures() {
        assert_eq!(parse_amount(""), None);
        assert_eq!(parse_amount("   "), None);
        assert_eq!(parse_amount("not a number"), None);
        assert_eq!(parse_amount("R$"), None);
        assert_eq!(parse_amount("").unwrap_or(0.0), 0.0);
    }

    #[test]
    fn test_parse_date_dmy() {
        let d = NaiveDate::from_ymd_opt(2026, 1, 15).unwrap();
        assert_eq!(parse_date_dmy("15/01/2026"), Some(d));
        assert_eq!(parse_date_dmy(" 15/01/26 "), Some(d));
        assert_eq!(parse_date_dmy("15/01/2026 00:00:00"), Some(d));
        assert_eq!(parse_date_dmy("15-01-2026"), Some(d));
        assert_eq!(parse_date_dmy("2026-01-15"), Some(d));
        assert_eq!(parse_date_dmy("15.01.2026"), Some(d));
    }

    #[test]
    fn test_parse_date_dmy_rejects_invalid() {
        assert_eq!(parse_date_dmy("31/02/2026"), None);
        assert_eq!(parse_date_dmy("15/13/2026"), None);
        assert_eq!(parse_date_dmy("DATA"), None);
        assert_eq!(parse_date_dmy("1.234,56"), None);
        assert_eq!(parse_date_dmy("1.012.025"), None);
        assert_eq!(parse_date_dmy("15.01.26"), None);
        assert_eq!(parse_date_dmy("2025.012.1"), None);
        assert_eq!(parse_date_dmy(""), None);
    }

    #[test]
    fn test_comma_decimal() {
        assert_eq!(comma_decimal(35.0), "35,00");
        assert_eq!(comma_decimal(1234.5), "1234,50");
        assert_eq!(comma_decimal(-10.0), "-10,00");
        assert_eq!(comma_decimal(-0.001), "0,00");
    }

    #[test]
    fn test_brl_formatting() {
        assert_eq!(brl(1234.56), "R$ 1.234,56");
        assert_eq!(brl(-500.0), "-R$ 500,00");
        assert_eq!(brl(0.0), "R$ 0,00");
        assert_eq!(brl(1000000.99), "R$ 1.000.000,99");
    }
}
