use chrono::{DateTime, Local, SecondsFormat, Utc};
use serde_json::Value;

const PROFILE_BASE: &str = "https://app.ethos.network/profile/x";
const ACTIVITY_BASE: &str = "https://app.ethos.network/activity";
const X_BASE: &str = "https://x.com";

const WEI_PER_ETH: f64 = 1e18;

pub fn profile_url(username: &str) -> String {
    format!("{}/{}", PROFILE_BASE, username)
}

pub fn x_url(username: &str) -> String {
    format!("{}/{}", X_BASE, username)
}

pub fn activity_url(kind: &str, id: &Value) -> String {
    let id = match id {
        Value::String(value) => value.clone(),
        other => other.to_string(),
    };
    format!("{}/{}/{}", ACTIVITY_BASE, kind, id)
}

/// Millisecond-precision UTC timestamp, as written in snapshot envelopes.
pub fn iso_timestamp(time: DateTime<Utc>) -> String {
    time.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Local wall-clock time, day first, for human-facing `lastUpdated` fields.
pub fn local_timestamp(time: DateTime<Utc>) -> String {
    time.with_timezone(&Local)
        .format("%d/%m/%Y %H:%M:%S")
        .to_string()
}

/// Short relative age of a unix timestamp: `"42s ago"` up to `"3mo ago"`.
pub fn time_ago(timestamp: i64, now: DateTime<Utc>) -> String {
    let diff = now.timestamp().saturating_sub(timestamp).max(0);

    if diff < 60 {
        format!("{}s ago", diff)
    } else if diff < 3_600 {
        format!("{}m ago", diff / 60)
    } else if diff < 86_400 {
        format!("{}h ago", diff / 3_600)
    } else if diff < 2_592_000 {
        format!("{}d ago", diff / 86_400)
    } else {
        format!("{}mo ago", diff / 2_592_000)
    }
}

/// Coarse relative age for profile creation times, without seconds.
pub fn age(timestamp: i64, now: DateTime<Utc>) -> String {
    let diff = now.timestamp().saturating_sub(timestamp).max(0);

    if diff >= 86_400 {
        format!("{}d ago", diff / 86_400)
    } else if diff >= 3_600 {
        format!("{}h ago", diff / 3_600)
    } else if diff >= 60 {
        format!("{}m ago", diff / 60)
    } else {
        "Just now".to_string()
    }
}

/// Formats a wei amount (a decimal string or number) as ETH with three decimals.
pub fn wei_to_eth(wei: &Value) -> String {
    let amount = match wei {
        Value::String(value) => leading_digits(value)
            .parse::<u128>()
            .map(|v| v as f64)
            .unwrap_or(0.0),
        Value::Number(number) => number.as_f64().unwrap_or(0.0),
        _ => 0.0,
    };

    format!("{:.3}", amount / WEI_PER_ETH)
}

/// Formats a decimal ETH amount with three decimals.
pub fn eth(amount: &Value) -> String {
    let value = match amount {
        Value::String(value) => value.trim().parse::<f64>().unwrap_or(0.0),
        Value::Number(number) => number.as_f64().unwrap_or(0.0),
        _ => 0.0,
    };

    format!("{:.3}", value)
}

fn leading_digits(input: &str) -> &str {
    let trimmed = input.trim();
    let end = trimmed
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(trimmed.len());
    &trimmed[..end]
}

/// Uppercases the first character.
pub fn capitalize(input: &str) -> String {
    let mut chars = input.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
