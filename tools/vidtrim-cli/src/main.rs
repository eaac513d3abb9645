//! vidtrim CLI: trim a window out of a video with live color adjustments.
//!
//! Usage:
//!   vidtrim trim <INPUT> [OPTIONS]   Export a window of a video
//!   vidtrim info <INPUT>             Show media information
//!   vidtrim check                    Check GStreamer capabilities
//!   vidtrim config                   Show the effective configuration

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use vidtrim_common::config::AppConfig;

mod commands;

#[derive(Parser)]
#[command(
    name = "vidtrim",
    about = "Trim, color-adjust, and export a window of a video",
    version,
    author
)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Export the window [start, end] of a video
    Trim(TrimArgs),

    /// Show media information
    Info {
        /// Path to the video file
        input: PathBuf,

        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Check GStreamer capabilities
    Check,

    /// Show the effective configuration
    Config {
        /// Write the effective configuration to the config file
        #[arg(long)]
        write: bool,
    },
}

#[derive(Args)]
pub struct TrimArgs {
    /// Path to the video file
    pub input: PathBuf,

    /// Window start (seconds)
    #[arg(short, long)]
    pub start: Option<f64>,

    /// Window end (seconds); defaults to start plus the default window length
    #[arg(short, long)]
    pub end: Option<f64>,

    /// Brightness multiplier [0, 2]
    #[arg(long, default_value = "1.0")]
    pub brightness: f64,

    /// Saturation multiplier [0, 2]
    #[arg(long, default_value = "1.0")]
    pub saturation: f64,

    /// Contrast multiplier [0, 2]
    #[arg(long, default_value = "1.0")]
    pub contrast: f64,

    /// Output directory
    #[arg(short, long, default_value = ".")]
    pub output: PathBuf,

    /// Output file name (defaults to the configured name)
    #[arg(long)]
    pub filename: Option<String>,

    /// Also write a JSON sidecar with the artifact metadata
    #[arg(long)]
    pub metadata: bool,

    /// Display sink launch fragment, e.g. "autovideosink"
    #[arg(long)]
    pub video_sink: Option<String>,

    /// Run against simulated media instead of GStreamer
    #[arg(long)]
    pub simulate: bool,

    /// Duration of the simulated media (seconds)
    #[arg(long, default_value = "30.0", requires = "simulate")]
    pub sim_duration: f64,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let mut config = AppConfig::load();

    if cli.verbose {
        config.logging.level = "debug".to_string();
    }
    if cli.json_logs {
        config.logging.json = true;
    }
    vidtrim_common::logging::init_logging(&config.logging);
    config.validate()?;

    match cli.command {
        Commands::Trim(args) => commands::trim::run(args, &config).await,
        Commands::Info { input, json } => commands::info::run(input, json),
        Commands::Check => commands::check::run(&config),
        Commands::Config { write } => commands::config::run(&config, write),
    }
}
