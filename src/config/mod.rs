mod file_config;

pub use file_config::FileConfig;

use crate::envelope::EnvelopeReader;
use crate::extraction::UndatedPolicy;
use crate::pipeline::PipelineOptions;
use crate::report::DirectoryReportSink;
use anyhow::{anyhow, bail, Result};
use clap::ValueEnum;
use std::path::PathBuf;

pub const DEFAULT_OUTPUT_DIR: &str = "output";
pub const DEFAULT_TOP_ARTISTS: usize = 10;
pub const DEFAULT_DEDUP_PRECISION_SECS: u32 = 1;
pub const DEFAULT_BATCH_SIZE: usize = 64;

/// CLI arguments that can be used for config resolution.
/// This struct mirrors the CLI arguments that can be overridden by TOML config.
#[derive(Debug, Clone)]
pub struct CliConfig {
    pub dump_dir: Option<PathBuf>,
    pub output_dir: PathBuf,
    pub max_depth: usize,
    pub undated_policy: UndatedPolicy,
    pub dedup_precision_secs: u32,
    pub top_artists: usize,
    pub batch_size: usize,
    pub parallel: bool,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            dump_dir: None,
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            max_depth: 1,
            undated_policy: UndatedPolicy::default(),
            dedup_precision_secs: DEFAULT_DEDUP_PRECISION_SECS,
            top_artists: DEFAULT_TOP_ARTISTS,
            batch_size: DEFAULT_BATCH_SIZE,
            parallel: true,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub dump_dir: PathBuf,
    pub output_dir: PathBuf,
    pub max_depth: usize,
    pub undated_policy: UndatedPolicy,
    pub dedup_precision_secs: u32,
    pub top_artists: usize,
    pub batch_size: usize,
    pub parallel: bool,
}

impl AppConfig {
    /// Resolve configuration from CLI arguments and optional TOML file config.
    /// TOML values override CLI values where present.
    pub fn resolve(cli: &CliConfig, file_config: Option<FileConfig>) -> Result<Self> {
        let file = file_config.unwrap_or_default();

        let dump_dir = file
            .dump_dir
            .map(PathBuf::from)
            .or_else(|| cli.dump_dir.clone())
            .ok_or_else(|| anyhow!("dump_dir must be specified via --dump-dir or in config file"))?;

        // A missing dump directory is empty input, but a file is a mistake
        if dump_dir.exists() && !dump_dir.is_dir() {
            bail!("dump_dir is not a directory: {:?}", dump_dir);
        }

        let output_dir = file
            .output_dir
            .map(PathBuf::from)
            .unwrap_or_else(|| cli.output_dir.clone());
        if output_dir.is_file() {
            bail!("output_dir is not a directory: {:?}", output_dir);
        }

        let undated_policy = match file.undated_policy {
            Some(value) => parse_undated_policy(&value)
                .ok_or_else(|| anyhow!("Invalid undated_policy in config file: {}", value))?,
            None => cli.undated_policy,
        };

        let max_depth = file.max_depth.unwrap_or(cli.max_depth);
        let dedup_precision_secs = file
            .dedup_precision_secs
            .unwrap_or(cli.dedup_precision_secs);
        let top_artists = file.top_artists.unwrap_or(cli.top_artists);
        let batch_size = file.batch_size.unwrap_or(cli.batch_size);
        let parallel = file.parallel.unwrap_or(cli.parallel);

        if max_depth == 0 {
            bail!("max_depth must be greater than 0");
        }
        if dedup_precision_secs == 0 {
            bail!("dedup_precision_secs must be greater than 0");
        }
        if top_artists == 0 {
            bail!("top_artists must be greater than 0");
        }
        if batch_size == 0 {
            bail!("batch_size must be greater than 0");
        }

        Ok(Self {
            dump_dir,
            output_dir,
            max_depth,
            undated_policy,
            dedup_precision_secs,
            top_artists,
            batch_size,
            parallel,
        })
    }

    pub fn envelope_reader(&self) -> EnvelopeReader {
        EnvelopeReader::new(&self.dump_dir).with_max_depth(self.max_depth)
    }

    pub fn report_sink(&self) -> DirectoryReportSink {
        DirectoryReportSink::new(&self.output_dir)
    }

    pub fn pipeline_options(&self) -> PipelineOptions {
        PipelineOptions {
            undated_policy: self.undated_policy,
            dedup_precision_secs: self.dedup_precision_secs,
            batch_size: self.batch_size,
            parallel: self.parallel,
            top_artists: self.top_artists,
        }
    }
}

/// Parses an undated policy name, using clap's ValueEnum trait.
fn parse_undated_policy(s: &str) -> Option<UndatedPolicy> {
    UndatedPolicy::from_str(s, true).ok()
}
