//! Captured network exchange model

use crate::history::timestamp;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use std::collections::BTreeMap;

/// One captured request/response exchange, as persisted by the collector.
///
/// Every field is optional on disk: a record with nothing but a `url` is still
/// an envelope, it just contributes nothing.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RawEnvelope {
    #[serde(default, deserialize_with = "null_as_default")]
    pub url: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub method: Option<String>,
    #[serde(default, deserialize_with = "lenient_status")]
    pub status: Option<u16>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub status_text: Option<String>,
    #[serde(default, deserialize_with = "lenient_headers")]
    pub headers: BTreeMap<String, String>,
    /// Capture time as written by the collector. Usually ISO-8601, epoch
    /// numbers are kept in their decimal text form.
    #[serde(default, deserialize_with = "lenient_text")]
    pub timestamp: Option<String>,
    /// Response body. `None` when absent or `null`.
    #[serde(default)]
    pub data: Option<Value>,
}

impl RawEnvelope {
    /// Capture time, if the stored value parses.
    pub fn captured_at(&self) -> Option<DateTime<Utc>> {
        self.timestamp.as_deref().and_then(timestamp::parse_str)
    }

    pub fn content_type(&self) -> Option<&str> {
        self.headers
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case("content-type"))
            .map(|(_, value)| value.as_str())
    }
}

fn null_as_default<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(lenient_text(deserializer)?.unwrap_or_default())
}

/// Strings pass through, numbers and booleans keep their JSON text form and
/// anything else reads as absent.
fn lenient_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(text) => Some(text),
        value @ (Value::Number(_) | Value::Bool(_)) => Some(value.to_string()),
        _ => None,
    })
}

/// Accepts `200` as well as `"200"`. Out of range or non-numeric is absent.
fn lenient_status<'de, D>(deserializer: D) -> Result<Option<u16>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Number(number) => number.as_u64().and_then(|code| u16::try_from(code).ok()),
        Value::String(text) => text.trim().parse().ok(),
        _ => None,
    })
}

/// Header values are meant to be strings but some captures store numbers or
/// lists. Non-string values are kept in their JSON text form. A headers field
/// that is not an object reads as empty.
fn lenient_headers<'de, D>(deserializer: D) -> Result<BTreeMap<String, String>, D::Error>
where
    D: Deserializer<'de>,
{
    let Value::Object(raw) = Value::deserialize(deserializer)? else {
        return Ok(BTreeMap::new());
    };
    Ok(raw
        .into_iter()
        .map(|(name, value)| {
            let value = match value {
                Value::String(text) => text,
                Value::Null => String::new(),
                other => other.to_string(),
            };
            (name, value)
        })
        .collect())
}
