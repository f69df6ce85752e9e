mod aggregate;
mod models;
pub mod timestamp;

pub use aggregate::{AggregateState, ExtractedRecord, FoldOutcome, FoldTally};
pub use models::{
    is_placeholder, DisplayField, PlayEvent, PlayKey, Track, TrackId, TrackSighting,
};
