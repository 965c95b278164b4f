//! CLI argument definitions and shared statics.

use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;
use std::sync::OnceLock;

pub static FILE_GUARD: OnceLock<tracing_appender::non_blocking::WorkerGuard> = OnceLock::new();
/// Whether the user asked for JSON output (controls structured error output).
pub static JSON_MODE: OnceLock<bool> = OnceLock::new();

#[derive(Parser, Debug)]
#[command(name = "lapse", version, about = "Layer-synchronized printer timelapse trigger")]
pub struct Cli {
    /// Path to config TOML; built-in defaults are used if the file is missing
    #[arg(long, value_name = "FILE", default_value = "etc/lapse.toml")]
    pub config: PathBuf,

    /// Print results and errors as JSON, and log as JSON lines
    #[arg(long, action = ArgAction::SetTrue)]
    pub json: bool,

    /// Console log level (error|warn|info|debug|trace); overrides [logging] level
    #[arg(long = "log-level", value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Command to execute
    #[command(subcommand)]
    pub cmd: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Ingest printer telemetry (one JSON object per line) and drive the camera
    Run {
        /// Telemetry source: a JSON-lines file, or `-` for stdin
        #[arg(long, value_name = "FILE|-", default_value = "-")]
        telemetry: String,
        /// Delay between lines, for replaying recorded telemetry in real time
        #[arg(long = "pace-ms", value_name = "MS")]
        pace_ms: Option<u64>,
        /// Evaluate and log triggers without firing the camera
        #[arg(long = "dry-run", action = ArgAction::SetTrue)]
        dry_run: bool,
    },
    /// Load and validate the config, then print the effective values
    CheckConfig,
}
