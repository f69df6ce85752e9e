//! Pezzottify History Import Library
//!
//! Rebuilds a listening history from captured API responses: envelopes are
//! read from a dump directory, classified and mined for track/play records,
//! deduplicated into an aggregate, and rendered as reports.

pub mod config;
pub mod envelope;
pub mod extraction;
pub mod history;
pub mod pipeline;
pub mod report;

// Re-export commonly used types for convenience
pub use envelope::{EnvelopeReader, RawEnvelope};
pub use extraction::UndatedPolicy;
pub use history::{AggregateState, PlayEvent, Track, TrackId};
pub use pipeline::{Pipeline, PipelineOptions, RunOutcome, RunStats};
pub use report::{DirectoryReportSink, ReportSink, SinkError};
