// SPDX-License-Identifier: GPL-3.0-only

use clap::{Parser, Subcommand};
use pixelize::Config;
use std::path::PathBuf;

mod cli;

#[derive(Parser)]
#[command(name = "pixelize")]
#[command(about = "Live camera pixelation pipeline")]
#[command(version)]
#[command(subcommand_required = false)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the pipeline against the synthetic capture source
    Run {
        /// Capture resolution width
        #[arg(long)]
        width: Option<u32>,

        /// Capture resolution height
        #[arg(long)]
        height: Option<u32>,

        /// Capture framerate
        #[arg(long)]
        fps: Option<u32>,

        /// Stop after this many seconds (default: run until Ctrl-C)
        #[arg(short, long)]
        duration: Option<u64>,

        /// Start with the pixelation effect enabled
        #[arg(short, long)]
        pixelate: bool,

        /// Mosaic tile side in source-texture pixels
        #[arg(short, long)]
        block_size: Option<f32>,

        /// Save a snapshot of the displayed image before exiting
        #[arg(short, long)]
        snapshot: bool,

        /// Snapshot path (default: ~/Pictures/pixelize/snapshot_TIMESTAMP.png)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Persist pipeline settings as the new defaults
    Configure {
        /// Capture resolution width
        #[arg(long)]
        width: Option<u32>,

        /// Capture resolution height
        #[arg(long)]
        height: Option<u32>,

        /// Capture framerate
        #[arg(long)]
        fps: Option<u32>,

        /// Enable the pixelation effect by default
        #[arg(short, long)]
        pixelate: Option<bool>,

        /// Mosaic tile side in source-texture pixels
        #[arg(short, long)]
        block_size: Option<f32>,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    // Set RUST_LOG environment variable to control log level
    // Examples: RUST_LOG=debug, RUST_LOG=pixelize=debug, RUST_LOG=info
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_target(true)
        .with_level(true)
        .init();

    let parsed = Cli::parse();
    let config = Config::load()?;

    match parsed.command {
        Some(Commands::Run {
            width,
            height,
            fps,
            duration,
            pixelate,
            block_size,
            snapshot,
            output,
        }) => cli::run(cli::RunOptions {
            width: width.unwrap_or(config.capture_width),
            height: height.unwrap_or(config.capture_height),
            fps: fps.unwrap_or(config.capture_fps),
            duration_secs: duration,
            pixelate: pixelate || config.effect_enabled,
            block_size: block_size.unwrap_or(config.block_size),
            snapshot,
            output,
        }),
        Some(Commands::Configure {
            width,
            height,
            fps,
            pixelate,
            block_size,
        }) => cli::configure(config, width, height, fps, pixelate, block_size),
        None => cli::run(cli::RunOptions {
            width: config.capture_width,
            height: config.capture_height,
            fps: config.capture_fps,
            duration_secs: None,
            pixelate: config.effect_enabled,
            block_size: config.block_size,
            snapshot: false,
            output: None,
        }),
    }
}
