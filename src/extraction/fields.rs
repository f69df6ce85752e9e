//! Field-presence contracts for upstream payload objects.
//!
//! Nothing in the upstream responses is versioned, so every probe here is
//! by key name and value type. All key lists are ordered by preference.

use crate::history::{is_placeholder, timestamp, TrackId};
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

pub type JsonObject = Map<String, Value>;

/// Keys under which upstream responses nest lists of items.
pub const COLLECTION_KEYS: &[&str] = &["collection", "tracks", "items"];
/// Key of the object a play-history entry wraps its track in.
pub const NESTED_TRACK_KEY: &str = "track";
/// Key under which the collector stores bodies it could not parse.
pub const RAW_CONTENT_KEY: &str = "raw_content";

const TRACK_ID_KEYS: &[&str] = &["id", "track_id"];
const WRAPPER_ID_KEYS: &[&str] = &["track_id"];
const TITLE_KEYS: &[&str] = &["title"];
const URL_KEYS: &[&str] = &["permalink_url"];
const ARTIST_OWNER_KEY: &str = "user";
const ARTIST_NAME_KEYS: &[&str] = &["username", "full_name"];
const PLAYED_AT_KEYS: &[&str] = &["played_at", "timestamp"];
const COUNTER_KEYS: &[&str] = &["play_count", "count", "playback_count"];
const KIND_KEY: &str = "kind";
const TRACK_KIND: &str = "track";

pub fn nested_track(item: &JsonObject) -> Option<&JsonObject> {
    item.get(NESTED_TRACK_KEY).and_then(Value::as_object)
}

fn has_title(object: &JsonObject) -> bool {
    text(object, TITLE_KEYS).is_some()
}

/// True when the object nests its own list under one of the collection keys.
pub fn has_nested_collection(object: &JsonObject) -> bool {
    COLLECTION_KEYS
        .iter()
        .any(|key| matches!(object.get(*key), Some(Value::Array(_))))
}

fn is_foreign_kind(object: &JsonObject) -> bool {
    object
        .get(KIND_KEY)
        .and_then(Value::as_str)
        .map(|kind| !kind.eq_ignore_ascii_case(TRACK_KIND))
        .unwrap_or(false)
}

/// Whether an object looks like a track or play item.
///
/// Two shapes qualify:
/// - a track object carrying its own title, unless it is a container
///   (non-track `kind`, or a nested collection of its own);
/// - a play wrapper around a titled `track` object that carries play
///   evidence itself (a timestamp-like field or `track_id`).
///
/// The identifier is deliberately not part of this check: an item without
/// one is still an item, just a malformed one.
pub fn looks_like_item(object: &JsonObject) -> bool {
    if let Some(track) = nested_track(object) {
        let has_play_evidence = PLAYED_AT_KEYS
            .iter()
            .chain(WRAPPER_ID_KEYS)
            .any(|key| object.get(*key).is_some_and(|v| !v.is_null()));
        if has_title(track) && has_play_evidence {
            return true;
        }
    }

    has_title(object) && !is_foreign_kind(object) && !has_nested_collection(object)
}

/// Reads an identifier from a JSON value. Numbers and non-blank strings qualify.
pub fn id_from_value(value: &Value) -> Option<TrackId> {
    match value {
        Value::Number(number) => {
            if let Some(unsigned) = number.as_u64() {
                Some(TrackId::Numeric(unsigned))
            } else if let Some(signed) = number.as_i64() {
                Some(TrackId::Text(signed.to_string()))
            } else {
                number
                    .as_f64()
                    .filter(|f| f.is_finite() && f.fract() == 0.0 && *f >= 0.0)
                    .map(|f| TrackId::Numeric(f as u64))
            }
        }
        Value::String(text) => TrackId::parse(text),
        _ => None,
    }
}

fn first_id(object: &JsonObject, keys: &[&str]) -> Option<TrackId> {
    keys.iter()
        .find_map(|key| object.get(*key).and_then(id_from_value))
}

/// Identifier of the track an item refers to.
pub fn identifier(item: &JsonObject) -> Option<TrackId> {
    match nested_track(item) {
        Some(track) => first_id(item, WRAPPER_ID_KEYS)
            .or_else(|| first_id(track, &["id"]))
            .or_else(|| first_id(item, &["id"])),
        None => first_id(item, TRACK_ID_KEYS),
    }
}

/// First non-placeholder textual value among `keys`. Numbers are accepted
/// and rendered as text.
pub fn text(object: &JsonObject, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| match object.get(*key)? {
        Value::String(text) if !is_placeholder(text) => Some(text.trim().to_string()),
        Value::Number(number) => Some(number.to_string()),
        _ => None,
    })
}

pub fn title(object: &JsonObject) -> Option<String> {
    text(object, TITLE_KEYS)
}

pub fn url(object: &JsonObject) -> Option<String> {
    text(object, URL_KEYS)
}

/// Artist name from the owning `user` sub-object, if present.
pub fn artist(object: &JsonObject) -> Option<String> {
    object
        .get(ARTIST_OWNER_KEY)
        .and_then(Value::as_object)
        .and_then(|owner| text(owner, ARTIST_NAME_KEYS))
}

pub fn played_at(item: &JsonObject) -> Option<DateTime<Utc>> {
    PLAYED_AT_KEYS
        .iter()
        .find_map(|key| item.get(*key).and_then(timestamp::parse_value))
}

/// First positive upstream play counter the element reports.
pub fn reported_count(object: &JsonObject) -> Option<u64> {
    COUNTER_KEYS.iter().find_map(|key| {
        object
            .get(*key)
            .and_then(Value::as_u64)
            .filter(|count| *count > 0)
    })
}
