// SPDX-License-Identifier: GPL-3.0-only

use clap::{Parser, Subcommand};
use detect_camera::Config;
use std::path::PathBuf;

mod cli;

#[derive(Parser)]
#[command(name = "detect-camera")]
#[command(about = "Capture or pick media and run it through a detection service")]
#[command(version = env!("GIT_VERSION"))]
struct Cli {
    #[command(flatten)]
    options: cli::GlobalOptions,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Submit an image or video file
    Detect {
        /// Image or video to submit
        file: PathBuf,
    },

    /// Take a photo with the camera and submit it
    Photo,

    /// Record a clip with the camera and submit it (Ctrl+C stops early)
    Video {
        /// Maximum recording length in milliseconds
        #[arg(short, long)]
        duration: Option<u64>,
    },

    /// List available cameras
    List,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    // Set RUST_LOG environment variable to control log level
    // Examples: RUST_LOG=debug, RUST_LOG=detect_camera=debug, RUST_LOG=info
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_target(true)
        .with_level(true)
        .init();

    let cli = Cli::parse();
    let open_result = cli.options.open;
    let mut config = cli.options.apply(Config::load());

    // Single-threaded event loop; every pipeline step is async
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    match cli.command {
        Commands::List => cli::list_cameras(&config),
        Commands::Detect { file } => runtime.block_on(cli::detect_file(config, file, open_result)),
        Commands::Photo => runtime.block_on(cli::take_photo(config, open_result)),
        Commands::Video { duration } => {
            if let Some(ms) = duration {
                config.max_recording_ms = ms;
            }
            runtime.block_on(cli::record_video(config, open_result))
        }
    }
}
