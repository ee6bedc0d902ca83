use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Configuration file path
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Combine a local image and audio file into a video
    Compose {
        /// Input image (png, jpg, jpeg, gif)
        #[arg(short, long)]
        image: PathBuf,

        /// Input audio (mp3, wav, aac, m4a)
        #[arg(short, long)]
        audio: PathBuf,

        /// Output video file (defaults to a unique name in the output directory)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Video codec passed to ffmpeg
        #[arg(long)]
        video_codec: Option<String>,

        /// Audio codec passed to ffmpeg
        #[arg(long)]
        audio_codec: Option<String>,

        /// Also copy the result here as merged_video_<timestamp>.mp4
        #[arg(long)]
        export_dir: Option<PathBuf>,
    },

    /// Download an image and audio file by URL and combine them into a video
    Fetch {
        /// Image URL
        #[arg(long)]
        image_url: String,

        /// Audio URL
        #[arg(long)]
        audio_url: String,

        /// Output video file (defaults to a unique name in the output directory)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Video codec passed to ffmpeg
        #[arg(long)]
        video_codec: Option<String>,

        /// Audio codec passed to ffmpeg
        #[arg(long)]
        audio_codec: Option<String>,

        /// Also copy the result here as merged_video_<timestamp>.mp4
        #[arg(long)]
        export_dir: Option<PathBuf>,
    },

    /// Remove stale files from the upload and output directories
    Cleanup {
        /// Override the configured retention, in seconds
        #[arg(long)]
        retention_secs: Option<u64>,
    },

    /// Check that ffmpeg and ffprobe are available
    Check,

    /// Write the default configuration to a file
    InitConfig {
        /// Destination file
        #[arg(short, long, default_value = "config.toml")]
        path: PathBuf,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}
