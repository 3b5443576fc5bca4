use crate::utils::constants::NA_VALUES;
use chrono::{DateTime, NaiveDate, NaiveDateTime};

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
    "%d.%m.%Y %H:%M:%S",
    "%d.%m.%Y %H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%d/%m/%Y %H:%M:%S",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d.%m.%Y", "%Y/%m/%d"];

/// Returns `None` for empty cells and the usual NA markers.
pub fn normalize_missing(raw: Option<&str>) -> Option<&str> {
    let value = raw?.trim();
    if NA_VALUES.contains(&value) {
        None
    } else {
        Some(value)
    }
}

/// Best-effort integer parse.
///
/// Accepts plain integers, integral floats (`"12.0"`, `"1e3"`) and a leading `+`.
/// Fractional values are truncated towards zero.
pub fn parse_integer(raw: &str) -> Option<i64> {
    let value = raw.trim();
    if let Ok(n) = value.parse::<i64>() {
        return Some(n);
    }
    let float = value.parse::<f64>().ok()?;
    if !float.is_finite() || float.abs() >= i64::MAX as f64 {
        return None;
    }
    Some(float.trunc() as i64)
}

/// Parse a timestamp in any of the layouts seen in the exports.
///
/// Offsets (RFC 3339) are dropped after conversion to UTC; bare dates map to midnight.
pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let value = raw.trim();
    if value.is_empty() {
        return None;
    }
    if let Ok(ts) = DateTime::parse_from_rfc3339(value) {
        return Some(ts.naive_utc());
    }
    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
        .or_else(|| {
            DATE_FORMATS
                .iter()
                .find_map(|fmt| NaiveDate::parse_from_str(value, fmt).ok())
                .and_then(|date| date.and_hms_opt(0, 0, 0))
        })
}

/// Cut a string to at most `max_chars` characters. Returns whether it was cut.
pub fn truncate_chars(value: &mut String, max_chars: usize) -> bool {
    match value.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => {
            value.truncate(byte_idx);
            true
        }
        None => false,
    }
}
