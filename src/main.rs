use anyhow::{Context, Result};
use clap::Parser;
use pezzottify_history_import::config::{
    AppConfig, CliConfig, FileConfig, DEFAULT_BATCH_SIZE, DEFAULT_DEDUP_PRECISION_SECS,
    DEFAULT_OUTPUT_DIR, DEFAULT_TOP_ARTISTS,
};
use pezzottify_history_import::{Pipeline, UndatedPolicy};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{info, level_filters::LevelFilter, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Number of tracks listed in the console summary.
const CONSOLE_TOP_TRACKS: usize = 10;

fn parse_path(s: &str) -> Result<PathBuf> {
    let path_buf = PathBuf::from(s);
    let original_path = match path_buf.canonicalize() {
        Ok(path) => path,
        Err(msg) => {
            if msg.kind() == std::io::ErrorKind::NotFound {
                path_buf
            } else {
                return Err(msg).with_context(|| format!("Error resolving path: {}", s));
            }
        }
    };
    if original_path.is_absolute() {
        return Ok(original_path);
    }
    let cwd = std::env::current_dir()?;
    Ok(cwd.join(original_path))
}

#[derive(Parser, Debug)]
#[command(name = "history-import")]
#[command(about = "Rebuild a listening history from captured API responses")]
struct CliArgs {
    /// Directory containing the captured envelope files.
    #[clap(value_parser = parse_path)]
    pub dump_dir: Option<PathBuf>,

    /// Path to a TOML config file. Its values override the command line.
    #[clap(long, value_parser = parse_path)]
    pub config: Option<PathBuf>,

    /// Directory the reports are written to.
    #[clap(short, long, value_parser = parse_path, default_value = DEFAULT_OUTPUT_DIR)]
    pub output_dir: PathBuf,

    /// How many directory levels below the dump directory to read.
    #[clap(long, default_value_t = 1)]
    pub max_depth: usize,

    /// How to date records that carry no play time.
    #[clap(long, value_enum, default_value_t = UndatedPolicy::CaptureTime)]
    pub undated_policy: UndatedPolicy,

    /// Plays of the same track within this many seconds count once.
    #[clap(long, default_value_t = DEFAULT_DEDUP_PRECISION_SECS)]
    pub dedup_precision_secs: u32,

    /// Number of artists listed in the summary.
    #[clap(long, default_value_t = DEFAULT_TOP_ARTISTS)]
    pub top_artists: usize,

    /// Number of envelopes extracted together before folding.
    #[clap(long, default_value_t = DEFAULT_BATCH_SIZE)]
    pub batch_size: usize,

    /// Extract envelopes one at a time on the main thread.
    #[clap(long)]
    pub sequential: bool,
}

impl CliArgs {
    fn to_cli_config(&self) -> CliConfig {
        CliConfig {
            dump_dir: self.dump_dir.clone(),
            output_dir: self.output_dir.clone(),
            max_depth: self.max_depth,
            undated_policy: self.undated_policy,
            dedup_precision_secs: self.dedup_precision_secs,
            top_artists: self.top_artists,
            batch_size: self.batch_size,
            parallel: !self.sequential,
        }
    }
}

fn main() -> Result<()> {
    let cli_args = CliArgs::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .with_env_var("LOG_LEVEL")
                .from_env_lossy(),
        )
        .try_init()
        .context("Failed to initialize logging")?;

    let file_config = match &cli_args.config {
        Some(path) => {
            info!("Loading config from {:?}...", path);
            Some(FileConfig::load(path)?)
        }
        None => None,
    };
    let config = AppConfig::resolve(&cli_args.to_cli_config(), file_config)?;

    info!("History Import");
    info!("==============");
    info!("Dump directory: {}", config.dump_dir.display());
    info!("Output directory: {}", config.output_dir.display());

    let cancel = Arc::new(AtomicBool::new(false));
    let handler_flag = cancel.clone();
    ctrlc::set_handler(move || {
        warn!("Interrupt received, stopping after the current envelope...");
        handler_flag.store(true, Ordering::Relaxed);
    })
    .context("Failed to install Ctrl-C handler")?;

    let pipeline = Pipeline::new(config.pipeline_options()).with_cancel_flag(cancel);
    let mut sink = config.report_sink();
    let outcome = pipeline
        .run(&config.envelope_reader(), &mut sink)
        .with_context(|| format!("Failed to write reports to {:?}", config.output_dir))?;

    outcome.stats.log();

    if outcome.state.is_empty() {
        warn!("No tracks found, reports are empty");
    } else {
        info!("");
        info!("Top {} tracks:", CONSOLE_TOP_TRACKS);
        for (rank, row) in outcome
            .report
            .tracks
            .iter()
            .take(CONSOLE_TOP_TRACKS)
            .enumerate()
        {
            info!(
                "  {}. {} - {} ({} plays)",
                rank + 1,
                row.artist,
                row.title,
                row.play_count
            );
        }
    }

    info!("");
    if outcome.interrupted {
        warn!(
            "Run interrupted, reports in {} cover only part of the dump",
            sink.output_dir().display()
        );
    } else {
        info!(
            "Import completed, reports written to {}",
            sink.output_dir().display()
        );
    }

    Ok(())
}
