//! FrameKit CLI: command-line interface for filtering images and exporting videos.
//!
//! Usage:
//!   framekit image <INPUT> -o <OUTPUT>   Filter a still image
//!   framekit video <INPUT>               Export a filtered video
//!   framekit filters                     List available filters
//!   framekit check                       Check the host setup

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use framekit_common::config::FramekitConfig;
use framekit_media_model::color::Color;
use framekit_media_model::filter_type::FilterType;

mod commands;

#[derive(Parser)]
#[command(
    name = "framekit",
    about = "Filter and overlay pipeline for still images and video",
    version,
    author
)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Processing applied to every frame.
#[derive(Args, Debug, Clone)]
struct ProcessingArgs {
    /// Filter to apply (see `framekit filters`)
    #[arg(short, long, default_value = "passthrough")]
    filter: FilterType,

    /// Overlay image, drawn in the order given
    #[arg(long = "overlay")]
    overlays: Vec<PathBuf>,

    /// Background fill: #RRGGBB, #RRGGBBAA, clear, black, or white
    #[arg(short, long, default_value = "clear")]
    background: Color,
}

#[derive(Subcommand)]
enum Commands {
    /// Filter a still image
    Image {
        /// Source image
        input: PathBuf,

        /// Destination image (format from extension)
        #[arg(short, long)]
        output: PathBuf,

        /// Presentation time of the frame, in seconds
        #[arg(long, default_value = "0.0")]
        time: f64,

        #[command(flatten)]
        processing: ProcessingArgs,
    },

    /// Export a video through the filter pipeline
    Video {
        /// Source video
        input: PathBuf,

        /// Directory for the exported file (defaults to the configured one)
        #[arg(long)]
        output_dir: Option<PathBuf>,

        /// Title written into the output metadata
        #[arg(long)]
        title: Option<String>,

        /// Author written into the output metadata
        #[arg(long)]
        author: Option<String>,

        /// Description written into the output metadata
        #[arg(long)]
        description: Option<String>,

        #[command(flatten)]
        processing: ProcessingArgs,
    },

    /// List available filters
    Filters,

    /// Check ffmpeg availability and configuration
    Check,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = FramekitConfig::load();
    let mut logging = config.logging.clone();
    if cli.verbose {
        logging.level = "debug".to_string();
    }
    framekit_common::logging::init_logging(&logging);

    match cli.command {
        Commands::Image {
            input,
            output,
            time,
            processing,
        } => commands::image::run(config, input, output, time, processing),
        Commands::Video {
            input,
            output_dir,
            title,
            author,
            description,
            processing,
        } => {
            commands::video::run(
                config,
                input,
                output_dir,
                commands::video::MetadataArgs {
                    title,
                    author,
                    description,
                },
                processing,
            )
            .await
        }
        Commands::Filters => commands::filters::run(),
        Commands::Check => commands::check::run(&config),
    }
}
