//! Byte-size and timestamp formatting for listings.
//!
//! Sizes are computed in binary multiples (1024) but labelled `MB`/`GB`/`TB`,
//! which is what the listing UI has always shown.

use std::cmp::Ordering;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

use crate::types::SizeValue;

/// Bytes in one KiB
pub const KIB: f64 = 1024.0;
/// Bytes in one MiB
pub const MIB: f64 = KIB * 1024.0;
/// Bytes in one GiB
pub const GIB: f64 = MIB * 1024.0;
/// Bytes in one TiB
pub const TIB: f64 = GIB * 1024.0;

/// Parses a size string such as `"2.5 GB"` or `"700MiB"` into bytes.
///
/// The leading number is read leniently (trailing text ignored) and the unit is
/// made of the string's ASCII letters, case-insensitive. `kb`, `mb`, `gb`,
/// `mib` and `gib` scale by powers of 1024; anything else leaves the number
/// unscaled. Returns `NaN` when the string does not start with a number.
#[must_use]
pub fn bytes_from_size_string(value: &str) -> f64 {
    let numeric = parse_float_prefix(value);
    if numeric.is_nan() {
        return numeric;
    }

    let unit: String = value
        .to_lowercase()
        .chars()
        .filter(char::is_ascii_lowercase)
        .collect();

    match unit.as_str() {
        "kb" => numeric * KIB,
        "mb" | "mib" => numeric * MIB,
        "gb" | "gib" => numeric * GIB,
        _ => numeric,
    }
}

/// Sort comparator over two size strings.
///
/// Pairs that cannot be ordered (either side is not a number) compare equal.
#[must_use]
pub fn compare_sizes(a: &str, b: &str) -> Ordering {
    bytes_from_size_string(a)
        .partial_cmp(&bytes_from_size_string(b))
        .unwrap_or(Ordering::Equal)
}

/// Renders a byte count as `"<x.x> GB"` from 1 GiB upwards, `"<x.x> MB"` below.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn format_file_size(bytes: u64) -> String {
    format_file_size_f64(bytes as f64)
}

pub(crate) fn format_file_size_f64(bytes: f64) -> String {
    let gib = bytes / GIB;
    if gib >= 1.0 {
        format!("{} GB", to_fixed(gib, 1))
    } else {
        format!("{} MB", to_fixed(bytes / MIB, 1))
    }
}

/// Converts a byte count to GiB without rounding.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn bytes_to_gib(bytes: u64) -> f64 {
    bytes as f64 / GIB
}

/// Renders a byte count in TiB with two decimals, e.g. `"1.50 TB"`.
///
/// Zero is rendered as the literal `"0 TiB"`. String input is read with the
/// same lenient number parse as [`bytes_from_size_string`].
#[must_use]
pub fn bytes_to_tib_string(value: impl Into<SizeValue>) -> String {
    let bytes = match value.into() {
        SizeValue::Bytes(n) => n,
        SizeValue::Text(s) => parse_float_prefix(&s),
    };

    if bytes == 0.0 {
        return "0 TiB".to_string();
    }

    format!("{} TB", to_fixed(bytes / TIB, 2))
}

/// Renders a creation timestamp as `"Mon, Jan 15, 2024, 10:30:00 AM UTC"`.
///
/// Accepts RFC 3339 / ISO-8601 strings or Unix milliseconds. Empty or absent
/// input yields an empty string; unparseable input yields `"Invalid Date"`.
#[must_use]
pub fn format_creation_time(timestamp: Option<&str>) -> String {
    let Some(raw) = timestamp.map(str::trim).filter(|s| !s.is_empty()) else {
        return String::new();
    };

    match parse_timestamp(raw) {
        Some(dt) => dt.format("%a, %b %-d, %Y, %-I:%M:%S %p UTC").to_string(),
        None => "Invalid Date".to_string(),
    }
}

/// Renders a date as `"05 Jan 2024"`.
#[must_use]
pub fn format_short_date(dt: &DateTime<Utc>) -> String {
    dt.format("%d %b %Y").to_string()
}

pub(crate) fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();

    if let Ok(millis) = raw.parse::<i64>() {
        return DateTime::from_timestamp_millis(millis);
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }

    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(naive.and_utc());
        }
    }

    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// Reads the longest numeric prefix of `value` as a float.
///
/// Leading whitespace is skipped; sign, decimal point, exponent and
/// `Infinity` are recognised. Returns `NaN` when no digits lead the string.
pub(crate) fn parse_float_prefix(value: &str) -> f64 {
    let s = value.trim_start();
    let bytes = s.as_bytes();
    let mut end = 0;

    if matches!(bytes.first(), Some(b'+' | b'-')) {
        end = 1;
    }

    if s[end..].starts_with("Infinity") {
        return if s.starts_with('-') {
            f64::NEG_INFINITY
        } else {
            f64::INFINITY
        };
    }

    let int_start = end;
    while end < bytes.len() && bytes[end].is_ascii_digit() {
        end += 1;
    }
    let mut digits = end - int_start;

    if end < bytes.len() && bytes[end] == b'.' {
        let frac_start = end + 1;
        let mut frac_end = frac_start;
        while frac_end < bytes.len() && bytes[frac_end].is_ascii_digit() {
            frac_end += 1;
        }
        digits += frac_end - frac_start;
        end = frac_end;
    }

    if digits == 0 {
        return f64::NAN;
    }

    if end < bytes.len() && bytes[end].eq_ignore_ascii_case(&b'e') {
        let mut exp_end = end + 1;
        if matches!(bytes.get(exp_end), Some(b'+' | b'-')) {
            exp_end += 1;
        }
        let exp_digits = exp_end;
        while exp_end < bytes.len() && bytes[exp_end].is_ascii_digit() {
            exp_end += 1;
        }
        if exp_end > exp_digits {
            end = exp_end;
        }
    }

    s[..end].parse().unwrap_or(f64::NAN)
}

/// Fixed-point rendering with ties rounded up on the magnitude.
///
/// `format!("{:.1}")` rounds ties to even, which would render 1.25 GiB as
/// `1.2`; listings have always shown `1.3`.
pub(crate) fn to_fixed(value: f64, digits: u8) -> String {
    if value.is_nan() {
        return "NaN".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
    }

    let scale = 10f64.powi(i32::from(digits));
    let scaled = value.abs() * scale;
    let floor = scaled.floor();
    let rounded = if scaled - floor >= 0.5 {
        floor + 1.0
    } else {
        floor
    };
    let sign = if value < 0.0 { "-" } else { "" };

    format!("{sign}{:.*}", usize::from(digits), rounded / scale)
}
