//! The running listening history built from extracted records.
//!
//! Upstream pagination windows overlap, so the same play shows up in many
//! captured responses. Every play is keyed by (track id, normalized played-at)
//! and only the first sighting of a key becomes a [`PlayEvent`]. Folding is
//! commutative and idempotent per key: the resulting counts and bounds do not
//! depend on envelope order, and folding the same records twice changes nothing.

use super::models::{PlayEvent, PlayKey, Track, TrackId, TrackSighting};
use super::timestamp;
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashSet};

/// A normalized record ready to be folded into the history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedRecord {
    pub sighting: TrackSighting,
    /// `None` when the element carried no timestamp and the undated policy
    /// decided not to date it.
    pub played_at: Option<DateTime<Utc>>,
    pub source_url: String,
}

/// What folding a single record did to the state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FoldOutcome {
    /// A new distinct play was recorded
    NewPlay,
    /// The play was already known, only display fields may have changed
    DuplicatePlay,
    /// The record had no play time, only the track was updated
    TrackOnly,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregateState {
    precision_secs: u32,
    tracks: BTreeMap<TrackId, Track>,
    seen: HashSet<PlayKey>,
    events: Vec<PlayEvent>,
}

impl Default for AggregateState {
    fn default() -> Self {
        Self::new(1)
    }
}

impl AggregateState {
    /// Creates an empty state whose dedup key uses `precision_secs` granularity.
    pub fn new(precision_secs: u32) -> Self {
        Self {
            precision_secs: precision_secs.max(1),
            tracks: BTreeMap::new(),
            seen: HashSet::new(),
            events: Vec::new(),
        }
    }

    pub fn precision_secs(&self) -> u32 {
        self.precision_secs
    }

    /// Folds one record. Counters only ever grow.
    pub fn fold(&mut self, record: ExtractedRecord) -> FoldOutcome {
        let ExtractedRecord {
            sighting,
            played_at,
            source_url,
        } = record;

        let track = self
            .tracks
            .entry(sighting.id.clone())
            .or_insert_with(|| Track::new(sighting.id.clone()));
        track.absorb(&sighting);

        let Some(played_at) = played_at else {
            return FoldOutcome::TrackOnly;
        };

        let event = PlayEvent {
            track_id: sighting.id,
            played_at: timestamp::normalize(played_at, self.precision_secs),
            source_url,
        };
        if !self.seen.insert(event.key()) {
            return FoldOutcome::DuplicatePlay;
        }

        track.record_play(event.played_at);
        self.events.push(event);
        FoldOutcome::NewPlay
    }

    /// Folds every record of an envelope, in order.
    pub fn fold_all<I>(&mut self, records: I) -> FoldTally
    where
        I: IntoIterator<Item = ExtractedRecord>,
    {
        let mut tally = FoldTally::default();
        for record in records {
            match self.fold(record) {
                FoldOutcome::NewPlay => tally.new_plays += 1,
                FoldOutcome::DuplicatePlay => tally.duplicate_plays += 1,
                FoldOutcome::TrackOnly => tally.undated += 1,
            }
        }
        tally
    }

    pub fn get_tracks_count(&self) -> usize {
        self.tracks.len()
    }

    pub fn get_plays_count(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    pub fn get_track(&self, id: &TrackId) -> Option<&Track> {
        self.tracks.get(id)
    }

    /// Tracks in identifier order.
    pub fn iter_tracks(&self) -> impl Iterator<Item = &Track> {
        self.tracks.values()
    }

    /// Unique play events in the order they were first seen.
    pub fn events(&self) -> &[PlayEvent] {
        &self.events
    }

    pub fn contains_play(&self, track_id: &TrackId, played_at: DateTime<Utc>) -> bool {
        self.seen.contains(&PlayKey {
            track_id: track_id.clone(),
            played_at: timestamp::normalize(played_at, self.precision_secs),
        })
    }

    /// Earliest and latest play across all events.
    pub fn covered_period(&self) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
        let first = self.events.iter().map(|e| e.played_at).min()?;
        let last = self.events.iter().map(|e| e.played_at).max()?;
        Some((first, last))
    }
}

/// Per-envelope fold counters.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct FoldTally {
    pub new_plays: usize,
    pub duplicate_plays: usize,
    pub undated: usize,
}
