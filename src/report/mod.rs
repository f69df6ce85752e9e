mod generator;
mod models;
mod sink;

pub use generator::{
    generate, play_log, rank_artists, ranked_tracks, summary, Report, UNKNOWN_ARTIST,
};
pub use models::{ArtistPlays, CoveredPeriod, PlayRow, Summary, TrackRow};
pub use sink::{
    DirectoryReportSink, MemoryReportSink, ReportSink, SinkError, PLAY_LOG_FILE, SUMMARY_FILE,
    TRACK_TABLE_FILE,
};
