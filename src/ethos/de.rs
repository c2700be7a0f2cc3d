//! Lenient field decoders used at the ingestion boundary.
//!
//! The Ethos API is not consistent about field presence or representation, so
//! every decoder here maps an absent, `null`, or wrongly-typed value to `None`
//! instead of failing the whole response.

use chrono::{DateTime, TimeZone, Utc};
use serde::de::{Deserialize, DeserializeOwned, Deserializer};
use serde_json::Value;

/// Values at or above this are taken to be milliseconds rather than seconds.
const MILLIS_THRESHOLD: i64 = 1_000_000_000_000;

pub(crate) fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Value::deserialize(deserializer)?;

    Ok(serde_json::from_value(value).ok())
}

/// Decodes a list, dropping elements that do not decode instead of failing it.
pub(crate) fn lenient_vec<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    Ok(lenient_list(deserializer)?.unwrap_or_default())
}

/// Like [`lenient_vec`], but a value that is not a list is `None`.
pub(crate) fn lenient_list<'de, D, T>(deserializer: D) -> Result<Option<Vec<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    match Value::deserialize(deserializer)? {
        Value::Array(values) => Ok(Some(
            values
                .into_iter()
                .filter_map(|value| serde_json::from_value(value).ok())
                .collect(),
        )),
        _ => Ok(None),
    }
}

/// Accepts unix seconds, unix milliseconds, numeric strings, or RFC 3339 dates,
/// and normalizes to unix seconds.
pub(crate) fn lenient_timestamp<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<i64>, D::Error> {
    Ok(as_timestamp(&Value::deserialize(deserializer)?))
}

/// Truncates a float to an integer, or `None` when it does not fit in an `i64`.
fn float_to_i64(value: f64) -> Option<i64> {
    // `i64::MAX as f64` rounds up to 2^63, which is itself out of range.
    if value.is_finite() && value >= i64::MIN as f64 && value < i64::MAX as f64 {
        Some(value as i64)
    } else {
        None
    }
}

pub(crate) fn as_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Number(number) => number
            .as_i64()
            .or_else(|| number.as_f64().and_then(float_to_i64)),
        Value::String(input) => {
            let trimmed = input.trim();
            trimmed
                .parse::<i64>()
                .ok()
                .or_else(|| trimmed.parse::<f64>().ok().and_then(float_to_i64))
        }
        _ => None,
    }
}

/// Unix seconds, or `None` for numbers outside the representable date range.
pub(crate) fn as_timestamp(value: &Value) -> Option<i64> {
    let numeric = as_i64(value).map(|v| {
        if v >= MILLIS_THRESHOLD {
            v / 1000
        } else {
            v
        }
    });

    match numeric {
        Some(seconds) => Utc
            .timestamp_opt(seconds, 0)
            .single()
            .map(|date| date.timestamp()),
        None => value
            .as_str()
            .and_then(|input| DateTime::parse_from_rfc3339(input.trim()).ok())
            .map(|date| date.timestamp()),
    }
}
