//! Dump directory and payload fixtures

#![allow(dead_code)]

use super::constants::CAPTURE_TIME;
use serde_json::{json, Value};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// A temporary dump directory with its own output directory next to it.
pub struct DumpDir {
    dir: TempDir,
    written: usize,
}

impl DumpDir {
    pub fn new() -> Self {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("dump")).unwrap();
        Self { dir, written: 0 }
    }

    pub fn path(&self) -> PathBuf {
        self.dir.path().join("dump")
    }

    pub fn output_path(&self) -> PathBuf {
        self.dir.path().join("output")
    }

    /// Writes an envelope the way the collector names them: capture order
    /// prefix, then a slug of the endpoint.
    pub fn add_envelope(&mut self, url: &str, data: Value) -> PathBuf {
        self.add_envelope_at(url, CAPTURE_TIME, data)
    }

    pub fn add_envelope_at(&mut self, url: &str, captured_at: &str, data: Value) -> PathBuf {
        let envelope = json!({
            "url": url,
            "method": "GET",
            "status": 200,
            "status_text": "OK",
            "headers": {"content-type": "application/json; charset=utf-8"},
            "timestamp": captured_at,
            "data": data,
        });
        self.add_raw(&serde_json::to_string_pretty(&envelope).unwrap())
    }

    /// Writes arbitrary file content as the next envelope file.
    pub fn add_raw(&mut self, content: &str) -> PathBuf {
        self.written += 1;
        let path = self
            .path()
            .join(format!("20240201_{:06}_capture.json", self.written));
        fs::write(&path, content).unwrap();
        path
    }

    pub fn copy_file(&mut self, from: &Path) -> PathBuf {
        let content = fs::read_to_string(from).unwrap();
        self.add_raw(&content)
    }
}

/// A track object as returned by track and collection endpoints.
pub fn track_json(id: u64, title: &str, artist: &str) -> Value {
    json!({
        "kind": "track",
        "id": id,
        "title": title,
        "permalink_url": format!("https://example.com/{}/{}", artist, id),
        "user": {"username": artist, "full_name": format!("{} Full", artist)},
    })
}

/// A play-history entry wrapping a track, timestamped in epoch milliseconds.
pub fn history_item(played_at_ms: i64, track: Value) -> Value {
    json!({
        "played_at": played_at_ms,
        "track_id": track["id"].clone(),
        "track": track,
    })
}

/// Reads a CSV report as header plus rows of fields.
pub fn read_csv(path: &Path) -> (Vec<String>, Vec<Vec<String>>) {
    let mut reader = csv::Reader::from_path(path).unwrap();
    let header = reader
        .headers()
        .unwrap()
        .iter()
        .map(str::to_string)
        .collect();
    let rows = reader
        .records()
        .map(|record| record.unwrap().iter().map(str::to_string).collect())
        .collect();
    (header, rows)
}
