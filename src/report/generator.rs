//! Renders the aggregated history into report artifacts.

use super::models::{ArtistPlays, CoveredPeriod, PlayRow, Summary, TrackRow};
use super::sink::{ReportSink, SinkError};
use crate::history::{timestamp, AggregateState, Track};
use std::collections::HashMap;
use tracing::debug;

/// Artist name used for tracks whose artist was never observed.
pub const UNKNOWN_ARTIST: &str = "Unknown Artist";

/// All three artifacts, ready to be handed to a sink.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Report {
    pub tracks: Vec<TrackRow>,
    pub plays: Vec<PlayRow>,
    pub summary: Summary,
}

impl Report {
    pub fn write_to(&self, sink: &mut dyn ReportSink) -> Result<(), SinkError> {
        sink.write_track_table(&self.tracks)?;
        sink.write_play_log(&self.plays)?;
        sink.write_summary(&self.summary)?;
        debug!(
            "Report written: {} track rows, {} play rows",
            self.tracks.len(),
            self.plays.len()
        );
        Ok(())
    }
}

/// Builds the report for `state`, listing at most `top_artists` artists.
pub fn generate(state: &AggregateState, top_artists: usize) -> Report {
    Report {
        tracks: ranked_tracks(state),
        plays: play_log(state),
        summary: summary(state, top_artists),
    }
}

/// Tracks by play count descending, ties by identifier ascending.
pub fn ranked_tracks(state: &AggregateState) -> Vec<TrackRow> {
    let mut tracks: Vec<&Track> = state.iter_tracks().collect();
    tracks.sort_by(|a, b| b.play_count.cmp(&a.play_count).then_with(|| a.id.cmp(&b.id)));

    tracks
        .into_iter()
        .map(|track| TrackRow {
            track_id: track.id.to_string(),
            title: track.title().unwrap_or_default().to_string(),
            artist: track.artist().unwrap_or_default().to_string(),
            play_count: track.play_count,
            first_seen: track
                .first_seen
                .as_ref()
                .map(timestamp::format)
                .unwrap_or_default(),
            last_seen: track
                .last_seen
                .as_ref()
                .map(timestamp::format)
                .unwrap_or_default(),
            url: track.url().unwrap_or_default().to_string(),
        })
        .collect()
}

/// Unique plays by time ascending, ties by identifier ascending.
pub fn play_log(state: &AggregateState) -> Vec<PlayRow> {
    let mut events: Vec<_> = state.events().iter().collect();
    events.sort_by(|a, b| {
        a.played_at
            .cmp(&b.played_at)
            .then_with(|| a.track_id.cmp(&b.track_id))
    });

    events
        .into_iter()
        .map(|event| {
            let track = state.get_track(&event.track_id);
            PlayRow {
                played_at: timestamp::format(&event.played_at),
                track_id: event.track_id.to_string(),
                title: track
                    .and_then(Track::title)
                    .unwrap_or_default()
                    .to_string(),
                artist: track
                    .and_then(Track::artist)
                    .unwrap_or_default()
                    .to_string(),
                source_url: event.source_url.clone(),
            }
        })
        .collect()
}

pub fn summary(state: &AggregateState, top_artists: usize) -> Summary {
    let reported: Vec<u64> = state
        .iter_tracks()
        .filter_map(|track| track.reported_play_count)
        .collect();

    let period = match state.covered_period() {
        Some((start, end)) => CoveredPeriod {
            start: Some(timestamp::format(&start)),
            end: Some(timestamp::format(&end)),
        },
        None => CoveredPeriod::default(),
    };

    Summary {
        total_tracks: state.get_tracks_count() as u64,
        total_plays: state.get_plays_count() as u64,
        tracks_with_reported_count: reported.len() as u64,
        reported_play_count_total: reported.iter().sum(),
        period,
        top_artists: rank_artists(state, top_artists),
    }
}

/// Artists by summed play count descending, ties by name ascending.
/// Artists without a single play are left out.
pub fn rank_artists(state: &AggregateState, limit: usize) -> Vec<ArtistPlays> {
    let mut plays_by_artist: HashMap<&str, u64> = HashMap::new();
    for track in state.iter_tracks().filter(|t| t.play_count > 0) {
        let artist = track.artist().unwrap_or(UNKNOWN_ARTIST);
        *plays_by_artist.entry(artist).or_insert(0) += track.play_count;
    }

    let mut ranked: Vec<ArtistPlays> = plays_by_artist
        .into_iter()
        .map(|(artist, play_count)| ArtistPlays {
            artist: artist.to_string(),
            play_count,
        })
        .collect();
    ranked.sort_by(|a, b| {
        b.play_count
            .cmp(&a.play_count)
            .then_with(|| a.artist.cmp(&b.artist))
    });
    ranked.truncate(limit);
    ranked
}
