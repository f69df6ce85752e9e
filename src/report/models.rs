use serde::Serialize;

// ============================================================================
// Tabular Rows
// ============================================================================

/// One row of the ranked track table (`top_tracks.csv`)
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct TrackRow {
    pub track_id: String,
    pub title: String,
    pub artist: String,
    pub play_count: u64,
    /// Empty when the track has no dated play
    pub first_seen: String,
    pub last_seen: String,
    pub url: String,
}

impl TrackRow {
    pub const HEADER: [&'static str; 7] = [
        "track_id",
        "title",
        "artist",
        "play_count",
        "first_seen",
        "last_seen",
        "url",
    ];
}

/// One row of the play-event log (`listening_history.csv`)
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct PlayRow {
    pub played_at: String,
    pub track_id: String,
    pub title: String,
    pub artist: String,
    pub source_url: String,
}

impl PlayRow {
    pub const HEADER: [&'static str; 5] = ["played_at", "track_id", "title", "artist", "source_url"];
}

// ============================================================================
// Summary
// ============================================================================

/// An artist with the plays of all its tracks
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct ArtistPlays {
    pub artist: String,
    pub play_count: u64,
}

/// Earliest and latest play. Both `None` when there are no plays.
#[derive(Serialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct CoveredPeriod {
    pub start: Option<String>,
    pub end: Option<String>,
}

/// Global statistics (`stats.json`)
#[derive(Serialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct Summary {
    pub total_tracks: u64,
    pub total_plays: u64,
    /// Tracks for which the upstream service reported a play counter
    pub tracks_with_reported_count: u64,
    /// Sum of those upstream counters. Not comparable with `total_plays`.
    pub reported_play_count_total: u64,
    pub period: CoveredPeriod,
    pub top_artists: Vec<ArtistPlays>,
}
