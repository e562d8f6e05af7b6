//! Typing of leaf text into tagged values.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use tp_core::Value;

/// Infer the value of element `tag`'s text.
///
/// Compact `YYYYMMDD` dates are only recognized under date tags (`DATE`,
/// `EFFECTIVEDATE`, ...); elsewhere eight digits are a number, as in voucher
/// numbers. Everything else follows [`infer`].
#[must_use]
pub fn infer_field(tag: &str, raw: &str) -> Value {
    if is_date_tag(tag) {
        if let Some(date) = compact_date(raw.trim()) {
            return Value::Date(date);
        }
    }
    infer(raw)
}

/// Infer the most specific value for a piece of source text.
///
/// Rules are tried in order: empty, yes/no, integer, decimal, ISO date,
/// `D-Mon-YYYY` date, timestamp, then text.
#[must_use]
pub fn infer(raw: &str) -> Value {
    let text = raw.trim();
    if text.is_empty() {
        return Value::Null;
    }
    if text.eq_ignore_ascii_case("yes") {
        return Value::Boolean(true);
    }
    if text.eq_ignore_ascii_case("no") {
        return Value::Boolean(false);
    }
    if is_integer(text) {
        if let Ok(i) = text.parse::<i64>() {
            return Value::Integer(i);
        }
        // too wide for i64, keep the digits losslessly
        return Value::Decimal(text.to_string());
    }
    if is_decimal(text) {
        return Value::Decimal(text.to_string());
    }
    if let Ok(date) = NaiveDate::parse_from_str(text, "%Y-%m-%d") {
        return Value::Date(date);
    }
    if let Ok(date) = NaiveDate::parse_from_str(text, "%d-%b-%Y") {
        return Value::Date(date);
    }
    if let Ok(ts) = DateTime::parse_from_rfc3339(text) {
        return Value::Timestamp(ts.with_timezone(&Utc));
    }
    if let Ok(ts) = NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S") {
        return Value::Timestamp(ts.and_utc());
    }
    Value::Text(text.to_string())
}

fn is_date_tag(tag: &str) -> bool {
    tag.to_ascii_uppercase().ends_with("DATE")
}

/// `YYYYMMDD` with a plausible year, the source's native date format.
fn compact_date(text: &str) -> Option<NaiveDate> {
    if text.len() != 8 || !text.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let year: i32 = text[..4].parse().ok()?;
    if !(1900..=2100).contains(&year) {
        return None;
    }
    NaiveDate::parse_from_str(text, "%Y%m%d").ok()
}

/// Optional minus sign, then digits without a leading zero (codes such as
/// `007` or pincodes with a leading zero stay text).
fn is_integer(text: &str) -> bool {
    let digits = text.strip_prefix('-').unwrap_or(text);
    !digits.is_empty()
        && digits.bytes().all(|b| b.is_ascii_digit())
        && (digits == "0" || !digits.starts_with('0'))
}

fn is_decimal(text: &str) -> bool {
    let unsigned = text.strip_prefix('-').unwrap_or(text);
    let Some((whole, frac)) = unsigned.split_once('.') else {
        return false;
    };
    !whole.is_empty()
        && !frac.is_empty()
        && whole.bytes().all(|b| b.is_ascii_digit())
        && frac.bytes().all(|b| b.is_ascii_digit())
}
