//! String formats, byte strings and unix time

use base64::engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD};
use base64::Engine;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde_json::Value;
use url::Url;
use uuid::Uuid;

use super::{type_error, DataValue};
use crate::error::ValidationError;

/// A recognized `format` of string data
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StringFormat {
    Uuid,
    DateTime,
    Date,
    Time,
    Uri,
}

impl StringFormat {
    /// Look up a format by its name; unknown formats are plain strings
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "uuid" => Some(StringFormat::Uuid),
            "date-time" => Some(StringFormat::DateTime),
            "date" => Some(StringFormat::Date),
            "time" => Some(StringFormat::Time),
            "uri" => Some(StringFormat::Uri),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            StringFormat::Uuid => "uuid",
            StringFormat::DateTime => "date-time",
            StringFormat::Date => "date",
            StringFormat::Time => "time",
            StringFormat::Uri => "uri",
        }
    }

    /// Parse text in this format
    pub fn parse(&self, text: &str, path: &str) -> Result<DataValue, ValidationError> {
        let parsed = match self {
            StringFormat::Uuid => Uuid::parse_str(text).ok().map(DataValue::Uuid),
            StringFormat::DateTime => DateTime::parse_from_rfc3339(text).ok().map(DataValue::DateTime),
            StringFormat::Date => NaiveDate::parse_from_str(text, "%Y-%m-%d").ok().map(DataValue::Date),
            StringFormat::Time => parse_time(text).map(DataValue::Time),
            StringFormat::Uri => Url::parse(text).ok().map(DataValue::Uri),
        };
        parsed.ok_or_else(|| {
            ValidationError::invalid(path, format!("'{}' is not a valid {}", text, self.as_str()))
        })
    }
}

/// `HH:MM:SS[.fff]` with an optional `Z` or numeric offset, which is dropped
fn parse_time(text: &str) -> Option<NaiveTime> {
    let local = text.strip_suffix(|c: char| c == 'Z' || c == 'z').unwrap_or(text);
    let local = match local.get(8..).and_then(|rest| rest.find(|c: char| c == '+' || c == '-')) {
        Some(offset) => &local[..8 + offset],
        None => local,
    };
    NaiveTime::parse_from_str(local, "%H:%M:%S%.f").ok()
}

/// Decode a byte string (base64url, padding optional; standard base64 accepted)
pub fn decode_bytes(text: &str) -> Option<Vec<u8>> {
    URL_SAFE_NO_PAD
        .decode(text.trim_end_matches('='))
        .or_else(|_| STANDARD.decode(text))
        .ok()
}

/// Encode bytes as unpadded base64url
pub fn encode_bytes(bytes: &[u8]) -> String {
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Read a unix time given as epoch seconds or RFC 3339 text
pub fn parse_timestamp(input: &Value, path: &str) -> Result<DateTime<Utc>, ValidationError> {
    match input {
        Value::Number(n) => n
            .as_f64()
            .and_then(timestamp_from_seconds)
            .ok_or_else(|| ValidationError::invalid(path, format!("{} is not a valid unix time", n))),
        Value::String(s) => DateTime::parse_from_rfc3339(s)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|_| ValidationError::invalid(path, format!("'{}' is not a valid date-time", s))),
        other => Err(type_error(path, "a unix time", other)),
    }
}

fn timestamp_from_seconds(seconds: f64) -> Option<DateTime<Utc>> {
    if !seconds.is_finite() {
        return None;
    }
    let whole = seconds.floor();
    let mut nanos = ((seconds - whole) * 1e9).round() as u32;
    let mut whole = whole as i64;
    if nanos >= 1_000_000_000 {
        whole += 1;
        nanos -= 1_000_000_000;
    }
    DateTime::from_timestamp(whole, nanos)
}

/// Seconds since the epoch, with fraction
pub fn epoch_seconds(ts: &DateTime<Utc>) -> f64 {
    ts.timestamp() as f64 + f64::from(ts.timestamp_subsec_nanos()) / 1e9
}
