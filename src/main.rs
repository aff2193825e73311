//! Camera parameter generator
//!
//! Usage:
//! ```bash
//! cargo run --release -- \
//!   --intrinsics-file intrinsics.txt \
//!   --pose-dir poses \
//!   --output-dir images
//! ```
//!
//! Use `--extrinsics-dir` instead of `--pose-dir` when the per-image matrices
//! are already world-to-camera, and `--mode merged` to update the `meta.ini`
//! of every directory under `--output-dir` instead of writing `.cam` files.

use cam_params::pipeline::{self, RunConfig};
use cam_params::OutputMode;
use clap::Parser;
use flexi_logger::{colored_detailed_format, detailed_format, Duplicate, FileSpec, Logger};
use log::{error, info};
use std::path::PathBuf;

/// Generate per-image camera parameter files from poses or extrinsics
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Intrinsics file: a whitespace matrix K, or a pinhole YAML (.yaml/.yml)
    #[arg(long, default_value = "intrinsics.txt")]
    intrinsics_file: PathBuf,

    /// Directory of camera-to-world pose matrices, one file per image
    #[arg(long, conflicts_with = "extrinsics_dir")]
    pose_dir: Option<PathBuf>,

    /// Directory of world-to-camera extrinsics matrices, one file per image
    #[arg(long)]
    extrinsics_dir: Option<PathBuf>,

    /// Output directory (standalone) or directory of per-image folders (merged)
    #[arg(short = 'o', long, default_value = "images")]
    output_dir: PathBuf,

    /// Output discipline
    #[arg(short = 'm', long, value_enum, default_value_t = OutputMode::Standalone)]
    mode: OutputMode,

    /// Fail on rotations that are not orthonormal with determinant one
    #[arg(long)]
    strict_rigid: bool,

    /// Write a run summary (JSON, or YAML for .yaml/.yml)
    #[arg(long)]
    manifest: Option<PathBuf>,

    /// Log level used when RUST_LOG is not set
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Also write the log to a file in this directory
    #[arg(long)]
    log_dir: Option<PathBuf>,
}

impl From<Cli> for RunConfig {
    fn from(cli: Cli) -> Self {
        RunConfig {
            intrinsics_file: cli.intrinsics_file,
            pose_dir: cli.pose_dir,
            extrinsics_dir: cli.extrinsics_dir,
            output_dir: cli.output_dir,
            mode: cli.mode,
            strict_rigid: cli.strict_rigid,
            manifest: cli.manifest,
        }
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let logger = Logger::try_with_env_or_str(&cli.log_level)?;
    let logger = match &cli.log_dir {
        Some(dir) => logger
            .log_to_file(
                FileSpec::default()
                    .directory(dir)
                    .suppress_timestamp()
                    .suffix("log"),
            )
            .duplicate_to_stdout(Duplicate::All)
            .format_for_files(detailed_format)
            .format_for_stdout(colored_detailed_format),
        None => logger.format(colored_detailed_format),
    };
    // error;warn;info;debug;trace
    let _logger_handle = logger.set_palette("196;208;76;39;178".to_string()).start()?;

    let config = RunConfig::from(cli);
    info!("Output mode: {:?}", config.mode);
    info!("Output directory: {:?}", config.output_dir);

    let summary = pipeline::run(&config).inspect_err(|e| error!("{e}"))?;
    info!("Generated {} camera records", summary.views.len());
    Ok(())
}
