//! Locale-tolerant parsing of user-typed amounts.

use std::str::FromStr;

use num_traits::ToPrimitive;
use rust_decimal::Decimal;
use serde_json::{Number, Value};

/// Currency markers accepted around an amount, longest first.
const CURRENCY_MARKERS: &[&str] = &["US$", "R$", "BRL", "USD", "EUR", "$", "€", "£"];

/// Parses amounts such as `R$ 1.234,56`, `$1,234.56`, `-10,5` or `(300)`.
///
/// Returns `None` for blank input or anything that is not an amount.
pub fn parse_locale_number(input: &str) -> Option<Decimal> {
    let mut rest = input.trim().replace('\u{a0}', " ");

    let mut negative = false;
    if rest.starts_with('(') && rest.ends_with(')') {
        negative = true;
        rest = rest[1..rest.len() - 1].trim().to_string();
    }
    if let Some(stripped) = rest.strip_prefix('-') {
        negative = !negative;
        rest = stripped.trim().to_string();
    }

    let rest = strip_currency(&rest);
    let (negative, rest) = match rest.strip_prefix('-') {
        Some(stripped) => (!negative, stripped.trim()),
        None => (negative, rest),
    };

    if rest.is_empty()
        || !rest.chars().any(|c| c.is_ascii_digit())
        || !rest
            .chars()
            .all(|c| c.is_ascii_digit() || c == '.' || c == ',' || c == ' ')
    {
        return None;
    }

    let compact: String = rest.chars().filter(|c| *c != ' ').collect();
    let normalized = match (compact.rfind('.'), compact.rfind(',')) {
        (Some(dot), Some(comma)) if comma > dot => compact.replace('.', "").replace(',', "."),
        (Some(_), Some(_)) => compact.replace(',', ""),
        (None, Some(_)) => resolve_single_separator(&compact, ','),
        (Some(_), None) => resolve_single_separator(&compact, '.'),
        (None, None) => compact,
    };

    let value = Decimal::from_str(&normalized).ok()?;
    Some(if negative { -value } else { value })
}

/// Parses an amount into a JSON number, or JSON null when it cannot.
pub fn numeric_value(input: &str) -> Value {
    parse_locale_number(input)
        .and_then(|d| d.to_f64())
        .and_then(Number::from_f64)
        .map(Value::Number)
        .unwrap_or(Value::Null)
}

fn strip_currency(input: &str) -> &str {
    let mut rest = input.trim();
    for marker in CURRENCY_MARKERS {
        if let Some(stripped) = rest.strip_prefix(marker) {
            rest = stripped.trim();
            break;
        }
    }
    for marker in CURRENCY_MARKERS {
        if let Some(stripped) = rest.strip_suffix(marker) {
            rest = stripped.trim();
            break;
        }
    }
    rest
}

/// With only one kind of separator present, a lone separator followed by
/// exactly three digits is a thousands separator; anything else is decimal.
fn resolve_single_separator(input: &str, separator: char) -> String {
    let occurrences = input.matches(separator).count();
    let digits_after = input
        .rfind(separator)
        .map(|idx| input.len() - idx - 1)
        .unwrap_or(0);

    if occurrences > 1 || digits_after == 3 {
        input.replace(separator, "")
    } else {
        input.replace(separator, ".")
    }
}
