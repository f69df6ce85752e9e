//! Batch driver: read, extract, fold, report.
//!
//! Envelopes are read in batches. Extraction of a batch may run on the rayon
//! pool since it is pure per envelope; folding into the [`AggregateState`]
//! always happens on the calling thread, one envelope at a time, in reader
//! order.

use crate::envelope::{EnvelopeReader, LoadedEnvelope};
use crate::extraction::{extract_envelope, EnvelopeExtraction, ShapeKind, UndatedPolicy};
use crate::history::AggregateState;
use crate::report::{generate, Report, ReportSink, SinkError};
use rayon::prelude::*;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

#[derive(Debug, Clone)]
pub struct PipelineOptions {
    pub undated_policy: UndatedPolicy,
    pub dedup_precision_secs: u32,
    pub batch_size: usize,
    pub parallel: bool,
    pub top_artists: usize,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            undated_policy: UndatedPolicy::default(),
            dedup_precision_secs: 1,
            batch_size: 64,
            parallel: true,
            top_artists: 10,
        }
    }
}

/// Counters describing one run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RunStats {
    pub files_scanned: usize,
    pub files_skipped: usize,
    /// Envelopes whose records made it into the state
    pub envelopes_folded: usize,
    pub envelopes_with_records: usize,
    pub envelopes_without_records: usize,
    pub unrecognized_payloads: usize,
    pub records_extracted: usize,
    pub malformed_elements: usize,
    pub new_plays: usize,
    pub duplicate_plays: usize,
    pub undated_records: usize,
}

impl RunStats {
    fn absorb(&mut self, extraction: &EnvelopeExtraction) {
        self.envelopes_folded += 1;
        if extraction.is_empty() {
            self.envelopes_without_records += 1;
        } else {
            self.envelopes_with_records += 1;
        }
        if extraction.shape == ShapeKind::Unrecognized {
            self.unrecognized_payloads += 1;
        }
        self.records_extracted += extraction.records.len();
        self.malformed_elements += extraction.malformed;
        self.undated_records += extraction.undated;
    }

    pub fn log(&self) {
        info!("");
        info!("Run Summary");
        info!("===========");
        info!("Files scanned: {}", self.files_scanned);
        if self.files_skipped > 0 {
            warn!("Files skipped (unreadable): {}", self.files_skipped);
        }
        info!("Envelopes folded: {}", self.envelopes_folded);
        info!("Envelopes with records: {}", self.envelopes_with_records);
        info!(
            "Envelopes without records: {} ({} unrecognized payloads)",
            self.envelopes_without_records, self.unrecognized_payloads
        );
        info!("Records extracted: {}", self.records_extracted);
        info!("Malformed elements skipped: {}", self.malformed_elements);
        info!("Distinct plays: {}", self.new_plays);
        info!("Duplicate plays collapsed: {}", self.duplicate_plays);
        info!("Undated records: {}", self.undated_records);
    }
}

/// Result of the read/extract/fold phase.
#[derive(Debug, Clone)]
pub struct Aggregation {
    pub state: AggregateState,
    pub stats: RunStats,
    /// True when the run was cancelled before every envelope was folded
    pub interrupted: bool,
}

/// Result of a complete run, reports included.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub state: AggregateState,
    pub stats: RunStats,
    pub interrupted: bool,
    pub report: Report,
}

pub struct Pipeline {
    options: PipelineOptions,
    cancel: Option<Arc<AtomicBool>>,
}

impl Pipeline {
    pub fn new(options: PipelineOptions) -> Self {
        Self {
            options,
            cancel: None,
        }
    }

    /// Stops the run before the next fold once `flag` is set.
    pub fn with_cancel_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = Some(flag);
        self
    }

    pub fn options(&self) -> &PipelineOptions {
        &self.options
    }

    fn is_cancelled(&self) -> bool {
        self.cancel
            .as_ref()
            .map(|flag| flag.load(Ordering::Relaxed))
            .unwrap_or(false)
    }

    /// Reads every envelope under `reader` and folds it into a fresh state.
    ///
    /// Unreadable files are logged and counted, never fatal. On cancellation
    /// the returned state holds every envelope folded so far.
    pub fn aggregate(&self, reader: &EnvelopeReader) -> Aggregation {
        let batch_size = self.options.batch_size.max(1);
        let mut state = AggregateState::new(self.options.dedup_precision_secs);
        let mut stats = RunStats::default();
        let mut interrupted = false;

        info!("Reading envelopes from {}...", reader.root().display());

        let mut envelopes = reader.envelopes();
        let mut batch: Vec<LoadedEnvelope> = Vec::with_capacity(batch_size);
        loop {
            batch.clear();
            for result in envelopes.by_ref() {
                stats.files_scanned += 1;
                match result {
                    Ok(loaded) => batch.push(loaded),
                    Err(err) => {
                        warn!("Skipping envelope: {}", err);
                        stats.files_skipped += 1;
                    }
                }
                if batch.len() >= batch_size {
                    break;
                }
            }
            if batch.is_empty() {
                break;
            }

            let extractions = self.extract_batch(&batch);
            for (loaded, extraction) in batch.iter().zip(extractions) {
                if self.is_cancelled() {
                    interrupted = true;
                    break;
                }
                debug!(
                    "{}: {:?} payload, {} records, {} malformed",
                    loaded.path.display(),
                    extraction.shape,
                    extraction.records.len(),
                    extraction.malformed
                );
                stats.absorb(&extraction);
                let tally = state.fold_all(extraction.records);
                stats.new_plays += tally.new_plays;
                stats.duplicate_plays += tally.duplicate_plays;
            }
            if interrupted {
                warn!(
                    "Interrupted after folding {} envelopes, keeping the history folded so far",
                    stats.envelopes_folded
                );
                break;
            }
        }

        info!(
            "Aggregated {} tracks and {} plays from {} files",
            state.get_tracks_count(),
            state.get_plays_count(),
            stats.files_scanned
        );

        Aggregation {
            state,
            stats,
            interrupted,
        }
    }

    fn extract_batch(&self, batch: &[LoadedEnvelope]) -> Vec<EnvelopeExtraction> {
        let policy = self.options.undated_policy;
        if self.options.parallel {
            batch
                .par_iter()
                .map(|loaded| extract_envelope(&loaded.envelope, policy))
                .collect()
        } else {
            batch
                .iter()
                .map(|loaded| extract_envelope(&loaded.envelope, policy))
                .collect()
        }
    }

    /// Aggregates `reader` and writes the reports to `sink`, also after an
    /// interruption. Only a sink failure is an error.
    pub fn run(
        &self,
        reader: &EnvelopeReader,
        sink: &mut dyn ReportSink,
    ) -> Result<RunOutcome, SinkError> {
        let Aggregation {
            state,
            stats,
            interrupted,
        } = self.aggregate(reader);

        info!("Generating reports...");
        let report = generate(&state, self.options.top_artists);
        report.write_to(sink)?;

        Ok(RunOutcome {
            state,
            stats,
            interrupted,
            report,
        })
    }
}
