//! Timestamp parsing and normalization.
//!
//! Upstream endpoints disagree on how they report time: ISO-8601 strings with
//! or without an offset, Unix seconds, Unix milliseconds. Everything is turned
//! into a UTC `DateTime` here.

use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Utc};
use serde_json::Value;

/// Epoch values at or above this magnitude are milliseconds (year 5138 in seconds).
const EPOCH_MILLIS_THRESHOLD: i64 = 100_000_000_000;

/// Numeric offsets without a colon, which RFC 3339 parsing rejects
const OFFSET_DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f%z",
    "%Y-%m-%d %H:%M:%S%.f%z",
    "%Y/%m/%d %H:%M:%S %z",
];

/// Digit-only strings shorter than this are never epoch values.
const MIN_EPOCH_DIGITS: usize = 9;

const NAIVE_DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y/%m/%d %H:%M:%S",
];

/// Parses a timestamp from a JSON value, either a string or an epoch number.
pub fn parse_value(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::String(text) => parse_str(text),
        Value::Number(number) => {
            if let Some(integer) = number.as_i64() {
                return from_epoch(integer);
            }
            // Fractional epoch, e.g. 1704103200.5
            number.as_f64().and_then(from_fractional_epoch)
        }
        _ => None,
    }
}

/// Parses an ISO-8601 string. Values without an offset are taken as UTC.
///
/// Also accepts compact `YYYYMMDD` dates and epoch values written as text.
pub fn parse_str(text: &str) -> Option<DateTime<Utc>> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    if let Ok(parsed) = DateTime::parse_from_rfc3339(text) {
        return Some(parsed.with_timezone(&Utc));
    }

    if let Some(parsed) = OFFSET_DATETIME_FORMATS
        .iter()
        .find_map(|format| DateTime::parse_from_str(text, format).ok())
    {
        return Some(parsed.with_timezone(&Utc));
    }

    if let Some(naive) = NAIVE_DATETIME_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(text, format).ok())
    {
        return Some(naive.and_utc());
    }

    if let Ok(date) = NaiveDate::parse_from_str(text, "%Y-%m-%d") {
        return date.and_hms_opt(0, 0, 0).map(|naive| naive.and_utc());
    }

    if text.bytes().all(|b| b.is_ascii_digit()) {
        if text.len() == 8 {
            return NaiveDate::parse_from_str(text, "%Y%m%d")
                .ok()
                .and_then(|date| date.and_hms_opt(0, 0, 0))
                .map(|naive| naive.and_utc());
        }
        if text.len() < MIN_EPOCH_DIGITS {
            return None;
        }
        return text.parse::<i64>().ok().and_then(from_epoch);
    }

    // Fractional epoch kept as text, e.g. "1704103200.5"
    let (whole, fraction) = text.split_once('.')?;
    let is_digits = |part: &str| !part.is_empty() && part.bytes().all(|b| b.is_ascii_digit());
    if whole.len() >= MIN_EPOCH_DIGITS && is_digits(whole) && is_digits(fraction) {
        return text.parse::<f64>().ok().and_then(from_fractional_epoch);
    }

    None
}

/// Converts a Unix epoch value in seconds or milliseconds.
pub fn from_epoch(value: i64) -> Option<DateTime<Utc>> {
    if value.abs() >= EPOCH_MILLIS_THRESHOLD {
        DateTime::from_timestamp_millis(value)
    } else {
        DateTime::from_timestamp(value, 0)
    }
}

fn from_fractional_epoch(value: f64) -> Option<DateTime<Utc>> {
    if !value.is_finite() {
        return None;
    }
    if value.abs() >= EPOCH_MILLIS_THRESHOLD as f64 {
        DateTime::from_timestamp_millis(value as i64)
    } else {
        DateTime::from_timestamp_millis((value * 1000.0) as i64)
    }
}

/// Truncates `timestamp` down to a multiple of `precision_secs` seconds.
///
/// Sub-second digits are always dropped, so `10:00:00.250Z` and
/// `10:00:00Z` normalize to the same instant.
pub fn normalize(timestamp: DateTime<Utc>, precision_secs: u32) -> DateTime<Utc> {
    let precision = i64::from(precision_secs.max(1));
    let truncated = timestamp.timestamp().div_euclid(precision) * precision;
    DateTime::from_timestamp(truncated, 0).unwrap_or(timestamp)
}

/// Renders a timestamp the way every report column does.
pub fn format(timestamp: &DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::Secs, true)
}
