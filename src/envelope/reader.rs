//! Reads captured envelopes from a dump directory.
//!
//! Files are visited in lexical file-name order, which for collector dumps is
//! also capture order (names start with the capture timestamp). Reading is
//! lazy and side-effect free, so iterating twice yields the same sequence.

use super::models::RawEnvelope;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::warn;
use walkdir::WalkDir;

/// Extension of the files written by the collector.
pub const ENVELOPE_EXTENSION: &str = "json";

/// Reasons a single dump file could not become an envelope. None of them is
/// fatal for a run.
#[derive(Debug, Error)]
pub enum EnvelopeError {
    #[error("Cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid envelope in {path}: {source}")]
    InvalidJson {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Envelope in {path} is not a JSON object")]
    NotAnObject { path: PathBuf },

    #[error("Cannot list dump directory: {0}")]
    Walk(#[from] walkdir::Error),
}

impl EnvelopeError {
    pub fn path(&self) -> Option<&Path> {
        match self {
            EnvelopeError::Io { path, .. }
            | EnvelopeError::InvalidJson { path, .. }
            | EnvelopeError::NotAnObject { path } => Some(path),
            EnvelopeError::Walk(err) => err.path(),
        }
    }
}

/// An envelope together with the file it came from.
#[derive(Debug, Clone)]
pub struct LoadedEnvelope {
    pub path: PathBuf,
    pub envelope: RawEnvelope,
}

#[derive(Debug, Clone)]
pub struct EnvelopeReader {
    root: PathBuf,
    max_depth: usize,
}

impl EnvelopeReader {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            max_depth: 1,
        }
    }

    /// Also descend into subdirectories, up to `max_depth` levels below the root.
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth.max(1);
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Lazily yields every envelope under the root. Unreadable files come out
    /// as `Err` items so the caller can count and skip them.
    ///
    /// A missing root directory yields nothing.
    pub fn envelopes(&self) -> Box<dyn Iterator<Item = Result<LoadedEnvelope, EnvelopeError>> + '_> {
        if !self.root.is_dir() {
            warn!(
                "Dump directory {} does not exist or is not a directory, nothing to read",
                self.root.display()
            );
            return Box::new(std::iter::empty());
        }

        let walker = WalkDir::new(&self.root)
            .min_depth(1)
            .max_depth(self.max_depth)
            .sort_by_file_name()
            .into_iter();

        Box::new(walker.filter_map(|entry| match entry {
            Ok(entry) if entry.file_type().is_file() && is_envelope_file(entry.path()) => {
                Some(load_envelope(entry.path()))
            }
            Ok(_) => None,
            Err(err) => Some(Err(EnvelopeError::from(err))),
        }))
    }
}

fn is_envelope_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case(ENVELOPE_EXTENSION))
        .unwrap_or(false)
}

/// Loads one envelope file.
pub fn load_envelope(path: &Path) -> Result<LoadedEnvelope, EnvelopeError> {
    let text = std::fs::read_to_string(path).map_err(|source| EnvelopeError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let invalid = |source| EnvelopeError::InvalidJson {
        path: path.to_path_buf(),
        source,
    };
    let value: serde_json::Value = serde_json::from_str(&text).map_err(invalid)?;
    if !value.is_object() {
        return Err(EnvelopeError::NotAnObject {
            path: path.to_path_buf(),
        });
    }
    let envelope: RawEnvelope = serde_json::from_value(value).map_err(invalid)?;
    Ok(LoadedEnvelope {
        path: path.to_path_buf(),
        envelope,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write(dir: &Path, name: &str, content: &str) {
        fs::write(dir.join(name), content).unwrap();
    }

    fn envelope_json(url: &str) -> String {
        format!(
            r#"{{"url": "{}", "method": "GET", "status": 200, "status_text": "OK",
                "headers": {{}}, "timestamp": "2024-01-01T10:00:00", "data": null}}"#,
            url
        )
    }

    #[test]
    fn test_reads_in_lexical_order() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "20240101_000003_b.json", &envelope_json("third"));
        write(dir.path(), "20240101_000001_a.json", &envelope_json("first"));
        write(dir.path(), "20240101_000002_c.json", &envelope_json("second"));

        let reader = EnvelopeReader::new(dir.path());
        let urls: Vec<String> = reader
            .envelopes()
            .map(|e| e.unwrap().envelope.url)
            .collect();
        assert_eq!(urls, vec!["first", "second", "third"]);
    }

    #[test]
    fn test_rereading_yields_same_sequence() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "a.json", &envelope_json("a"));
        write(dir.path(), "b.json", &envelope_json("b"));

        let reader = EnvelopeReader::new(dir.path());
        let first: Vec<PathBuf> = reader.envelopes().map(|e| e.unwrap().path).collect();
        let second: Vec<PathBuf> = reader.envelopes().map(|e| e.unwrap().path).collect();
        assert_eq!(first, second);
        assert_eq!(first.len(), 2);
    }

    #[test]
    fn test_corrupt_files_are_reported_not_fatal() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "1_good.json", &envelope_json("good"));
        write(dir.path(), "2_truncated.json", r#"{"url": "half", "data": {"colle"#);
        write(dir.path(), "3_array.json", "[1, 2, 3]");
        write(dir.path(), "4_good.json", &envelope_json("also good"));

        let reader = EnvelopeReader::new(dir.path());
        let results: Vec<_> = reader.envelopes().collect();
        assert_eq!(results.len(), 4);
        assert!(results[0].is_ok());
        assert!(matches!(
            results[1],
            Err(EnvelopeError::InvalidJson { .. })
        ));
        assert!(matches!(
            results[2],
            Err(EnvelopeError::NotAnObject { .. })
        ));
        assert_eq!(
            results[1].as_ref().unwrap_err().path(),
            Some(dir.path().join("2_truncated.json").as_path())
        );
        assert_eq!(results[3].as_ref().unwrap().envelope.url, "also good");
    }

    #[test]
    fn test_off_type_metadata_keeps_the_payload() {
        let dir = TempDir::new().unwrap();
        write(
            dir.path(),
            "1_string_status.json",
            r#"{"url": "a", "status": "200", "timestamp": "2024-01-01T10:00:00",
                "data": {"collection": [{"id": 1, "title": "One"}]}}"#,
        );
        write(
            dir.path(),
            "2_epoch_timestamp.json",
            r#"{"url": "b", "status": 200, "timestamp": 1704103200,
                "data": {"collection": [{"id": 2, "title": "Two"}]}}"#,
        );

        let reader = EnvelopeReader::new(dir.path());
        let loaded: Vec<LoadedEnvelope> = reader.envelopes().map(|e| e.unwrap()).collect();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[0].envelope.status, Some(200));
        assert!(loaded[0].envelope.data.is_some());
        assert_eq!(
            loaded[1].envelope.captured_at().map(|t| t.timestamp()),
            Some(1704103200)
        );
        assert!(loaded[1].envelope.data.is_some());
    }

    #[test]
    fn test_ignores_non_json_files_and_subdirectories() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "notes.txt", "hello");
        write(dir.path(), "a.JSON", &envelope_json("upper"));
        fs::create_dir(dir.path().join("nested")).unwrap();
        write(&dir.path().join("nested"), "b.json", &envelope_json("nested"));

        let shallow: Vec<_> = EnvelopeReader::new(dir.path())
            .envelopes()
            .map(|e| e.unwrap().envelope.url)
            .collect();
        assert_eq!(shallow, vec!["upper"]);

        let deep: Vec<_> = EnvelopeReader::new(dir.path())
            .with_max_depth(2)
            .envelopes()
            .map(|e| e.unwrap().envelope.url)
            .collect();
        assert_eq!(deep.len(), 2);
    }

    #[test]
    fn test_missing_directory_is_empty() {
        let dir = TempDir::new().unwrap();
        let reader = EnvelopeReader::new(dir.path().join("does-not-exist"));
        assert_eq!(reader.envelopes().count(), 0);
    }

    #[test]
    fn test_empty_directory_is_empty() {
        let dir = TempDir::new().unwrap();
        assert_eq!(EnvelopeReader::new(dir.path()).envelopes().count(), 0);
    }
}
