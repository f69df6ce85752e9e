//! Listening history data models

use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};
use std::fmt;

/// Display values that carry no information and may always be replaced.
const PLACEHOLDER_VALUES: &[&str] = &["unknown", "unknown artist"];

/// Stable upstream identifier of a track.
///
/// Upstream payloads report ids either as JSON numbers or as strings. Numeric
/// ids order numerically and before textual ones, so `9` sorts before `10`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TrackId {
    Numeric(u64),
    Text(String),
}

impl TrackId {
    /// Parses an identifier from its textual form. Blank input is not an id.
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        if raw.is_empty() {
            return None;
        }
        // "007" and "7" are different upstream ids, keep the zero-padded one verbatim.
        let canonical_number = raw.len() == 1 || !raw.starts_with('0');
        match raw.parse::<u64>() {
            Ok(number) if canonical_number => Some(TrackId::Numeric(number)),
            _ => Some(TrackId::Text(raw.to_string())),
        }
    }
}

impl From<u64> for TrackId {
    fn from(value: u64) -> Self {
        TrackId::Numeric(value)
    }
}

impl fmt::Display for TrackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrackId::Numeric(number) => write!(f, "{}", number),
            TrackId::Text(text) => f.write_str(text),
        }
    }
}

impl Serialize for TrackId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Returns true when a display value should be treated as missing.
pub fn is_placeholder(value: &str) -> bool {
    let value = value.trim();
    value.is_empty()
        || PLACEHOLDER_VALUES
            .iter()
            .any(|placeholder| value.eq_ignore_ascii_case(placeholder))
}

/// A display value together with the capture time of the sighting that set it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DisplayField {
    value: Option<String>,
    observed_at: Option<DateTime<Utc>>,
}

impl DisplayField {
    pub fn value(&self) -> Option<&str> {
        self.value.as_deref()
    }

    /// Merges an incoming value observed at `observed_at`.
    ///
    /// Empty and placeholder values never replace anything. A real value fills
    /// an empty field, and replaces a known one only when it was observed
    /// strictly later. The result does not depend on the order of merges.
    pub fn merge(&mut self, incoming: Option<&str>, observed_at: Option<DateTime<Utc>>) {
        let Some(incoming) = incoming.map(str::trim).filter(|v| !is_placeholder(v)) else {
            return;
        };

        let replace = match (&self.value, self.observed_at, observed_at) {
            (None, _, _) => true,
            (Some(_), None, Some(_)) => true,
            (Some(_), Some(current), Some(new)) if new > current => true,
            // Same observation time: pick the greater value so any merge order agrees.
            (Some(current), current_at, new_at) if current_at == new_at => {
                incoming > current.as_str()
            }
            _ => false,
        };

        if replace {
            self.value = Some(incoming.to_string());
            self.observed_at = observed_at;
        }
    }
}

/// A distinct piece of media content with its accumulated statistics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Track {
    pub id: TrackId,
    pub title: DisplayField,
    pub artist: DisplayField,
    pub url: DisplayField,
    /// Number of distinct play events referencing this track
    pub play_count: u64,
    pub first_seen: Option<DateTime<Utc>>,
    pub last_seen: Option<DateTime<Utc>>,
    /// Highest play counter the upstream service reported for this track, if any.
    /// Informational only, never mixed into `play_count`.
    pub reported_play_count: Option<u64>,
}

impl Track {
    pub fn new(id: TrackId) -> Self {
        Self {
            id,
            title: DisplayField::default(),
            artist: DisplayField::default(),
            url: DisplayField::default(),
            play_count: 0,
            first_seen: None,
            last_seen: None,
            reported_play_count: None,
        }
    }

    pub fn title(&self) -> Option<&str> {
        self.title.value()
    }

    pub fn artist(&self) -> Option<&str> {
        self.artist.value()
    }

    pub fn url(&self) -> Option<&str> {
        self.url.value()
    }

    /// Applies the display fields and counters of a sighting, keeping the identity.
    pub fn absorb(&mut self, sighting: &TrackSighting) {
        self.title.merge(sighting.title.as_deref(), sighting.observed_at);
        self.artist.merge(sighting.artist.as_deref(), sighting.observed_at);
        self.url.merge(sighting.url.as_deref(), sighting.observed_at);
        if let Some(reported) = sighting.reported_play_count {
            self.reported_play_count =
                Some(self.reported_play_count.map_or(reported, |c| c.max(reported)));
        }
    }

    /// Accounts for one new distinct play at `played_at`.
    pub fn record_play(&mut self, played_at: DateTime<Utc>) {
        self.play_count += 1;
        self.first_seen = Some(self.first_seen.map_or(played_at, |t| t.min(played_at)));
        self.last_seen = Some(self.last_seen.map_or(played_at, |t| t.max(played_at)));
    }
}

/// What a single payload element says about a track.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackSighting {
    pub id: TrackId,
    pub title: Option<String>,
    pub artist: Option<String>,
    pub url: Option<String>,
    pub reported_play_count: Option<u64>,
    /// Capture time of the envelope the sighting came from
    pub observed_at: Option<DateTime<Utc>>,
}

/// One instance of a track being played.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayEvent {
    pub track_id: TrackId,
    /// Normalized to the dedup precision
    pub played_at: DateTime<Utc>,
    /// URL of the envelope that first reported this play
    pub source_url: String,
}

impl PlayEvent {
    pub fn key(&self) -> PlayKey {
        PlayKey {
            track_id: self.track_id.clone(),
            played_at: self.played_at,
        }
    }
}

/// Identity of a real-world play: the same pair reported by several
/// endpoints is the same play.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PlayKey {
    pub track_id: TrackId,
    pub played_at: DateTime<Utc>,
}
