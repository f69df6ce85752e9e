use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct FileConfig {
    // Input / output (can override CLI)
    pub dump_dir: Option<String>,
    pub output_dir: Option<String>,
    /// Also read envelopes from subdirectories, up to this depth
    pub max_depth: Option<usize>,

    // Aggregation
    pub undated_policy: Option<String>,
    pub dedup_precision_secs: Option<u32>,
    pub top_artists: Option<usize>,

    // Execution
    pub batch_size: Option<usize>,
    pub parallel: Option<bool>,
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        toml::from_str(&content).with_context(|| format!("Failed to parse config file: {:?}", path))
    }
}
