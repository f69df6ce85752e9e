//! Destinations for report artifacts.

use super::models::{PlayRow, Summary, TrackRow};
use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

pub const TRACK_TABLE_FILE: &str = "top_tracks.csv";
pub const PLAY_LOG_FILE: &str = "listening_history.csv";
pub const SUMMARY_FILE: &str = "stats.json";

/// Failure to persist a report. Unlike everything upstream of it, this is
/// fatal for a run.
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("Cannot write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Cannot write table {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("Cannot serialize summary {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Contract of a report destination: ordered rows for the two tables and
/// one summary record.
pub trait ReportSink {
    fn write_track_table(&mut self, rows: &[TrackRow]) -> Result<(), SinkError>;
    fn write_play_log(&mut self, rows: &[PlayRow]) -> Result<(), SinkError>;
    fn write_summary(&mut self, summary: &Summary) -> Result<(), SinkError>;
}

/// Writes the artifacts as files into a directory, creating it if needed.
#[derive(Debug, Clone)]
pub struct DirectoryReportSink {
    output_dir: PathBuf,
}

impl DirectoryReportSink {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn track_table_path(&self) -> PathBuf {
        self.output_dir.join(TRACK_TABLE_FILE)
    }

    pub fn play_log_path(&self) -> PathBuf {
        self.output_dir.join(PLAY_LOG_FILE)
    }

    pub fn summary_path(&self) -> PathBuf {
        self.output_dir.join(SUMMARY_FILE)
    }

    fn create(&self, path: &Path) -> Result<BufWriter<File>, SinkError> {
        let io_error = |source| SinkError::Io {
            path: path.to_path_buf(),
            source,
        };
        std::fs::create_dir_all(&self.output_dir).map_err(io_error)?;
        File::create(path).map(BufWriter::new).map_err(io_error)
    }

    /// Header is written explicitly so that an empty table still has one.
    fn write_table<R: Serialize>(
        &self,
        path: &Path,
        header: &[&str],
        rows: &[R],
    ) -> Result<(), SinkError> {
        let csv_error = |source| SinkError::Csv {
            path: path.to_path_buf(),
            source,
        };

        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(self.create(path)?);
        writer.write_record(header).map_err(csv_error)?;
        for row in rows {
            writer.serialize(row).map_err(csv_error)?;
        }
        writer.flush().map_err(|source| SinkError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        info!("Wrote {} rows to {}", rows.len(), path.display());
        Ok(())
    }
}

impl ReportSink for DirectoryReportSink {
    fn write_track_table(&mut self, rows: &[TrackRow]) -> Result<(), SinkError> {
        self.write_table(&self.track_table_path(), &TrackRow::HEADER, rows)
    }

    fn write_play_log(&mut self, rows: &[PlayRow]) -> Result<(), SinkError> {
        self.write_table(&self.play_log_path(), &PlayRow::HEADER, rows)
    }

    fn write_summary(&mut self, summary: &Summary) -> Result<(), SinkError> {
        let path = self.summary_path();
        let mut writer = self.create(&path)?;
        serde_json::to_writer_pretty(&mut writer, summary).map_err(|source| SinkError::Json {
            path: path.clone(),
            source,
        })?;
        writer
            .write_all(b"\n")
            .and_then(|_| writer.flush())
            .map_err(|source| SinkError::Io {
                path: path.clone(),
                source,
            })?;

        info!("Wrote summary to {}", path.display());
        Ok(())
    }
}

/// Keeps the artifacts in memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryReportSink {
    pub tracks: Vec<TrackRow>,
    pub plays: Vec<PlayRow>,
    pub summary: Option<Summary>,
}

impl ReportSink for MemoryReportSink {
    fn write_track_table(&mut self, rows: &[TrackRow]) -> Result<(), SinkError> {
        self.tracks = rows.to_vec();
        Ok(())
    }

    fn write_play_log(&mut self, rows: &[PlayRow]) -> Result<(), SinkError> {
        self.plays = rows.to_vec();
        Ok(())
    }

    fn write_summary(&mut self, summary: &Summary) -> Result<(), SinkError> {
        self.summary = Some(summary.clone());
        Ok(())
    }
}
