//! Stillframe - still image + audio track to MP4
//!
//! Entry point of the `stillframe` command line tool. Inputs are validated,
//! handed to ffmpeg, and the resulting video path is printed.

use anyhow::Result;
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tracing::{info, Level};
use tracing_appender::{non_blocking, non_blocking::WorkerGuard, rolling};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use stillframe::cli::{Args, Commands};
use stillframe::config::Config;
use stillframe::error::StillframeError;
use stillframe::media::{ComposedVideo, MediaFactory};
use stillframe::workflow::{CodecOverrides, Workflow};

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let _log_guard = setup_logging(args.verbose)?;
    info!("Starting Stillframe");

    // Explicit --config, then ./config.toml, then built-in defaults
    let config = match &args.config {
        Some(config_path) => Config::from_file(config_path)?,
        None => {
            if Path::new("config.toml").exists() {
                info!("Using config.toml from the working directory");
                Config::from_file("config.toml")?
            } else {
                Config::default()
            }
        }
    };

    match args.command {
        Commands::Compose { image, audio, output, video_codec, audio_codec, export_dir } => {
            info!("Composing {} + {}", image.display(), audio.display());
            let workflow = Workflow::new(config)?;
            let codecs = CodecOverrides { video_codec, audio_codec };

            let spinner = spinner("Encoding video...")?;
            let result = workflow.compose_local(&image, &audio, output, &codecs).await;
            spinner.finish_and_clear();

            report_video(&workflow, result?, export_dir.as_deref()).await?;
        }
        Commands::Fetch { image_url, audio_url, output, video_codec, audio_codec, export_dir } => {
            info!("Composing from URLs {} + {}", image_url, audio_url);
            let workflow = Workflow::new(config)?;
            let codecs = CodecOverrides { video_codec, audio_codec };

            let spinner = spinner("Downloading and encoding...")?;
            let result = workflow.compose_from_urls(&image_url, &audio_url, output, &codecs).await;
            spinner.finish_and_clear();

            report_video(&workflow, result?, export_dir.as_deref()).await?;
        }
        Commands::Cleanup { retention_secs } => {
            let retention = retention_secs
                .map(Duration::from_secs)
                .unwrap_or_else(|| config.storage.retention());
            let workflow = Workflow::new(config)?;

            let report = workflow.cleanup_with_retention(SystemTime::now(), retention);
            println!(
                "Cleanup completed: {} removed, {} kept, {} failed",
                report.removed.len(),
                report.kept,
                report.failed
            );
            for path in &report.removed {
                println!("  removed {}", path.display());
            }
        }
        Commands::Check => {
            let composer = MediaFactory::create_composer(config.media.clone());
            let tools = composer.availability();

            let ffmpeg_ok = tools.is_available().await;
            let ffprobe_ok = tools.is_probe_available().await;

            println!("{:<10} {:<30} {:<10}", "Tool", "Path", "Status");
            println!("{}", "-".repeat(52));
            println!("{:<10} {:<30} {:<10}", "ffmpeg", config.media.ffmpeg_path, status(ffmpeg_ok));
            println!("{:<10} {:<30} {:<10}", "ffprobe", config.media.ffprobe_path, status(ffprobe_ok));

            if ffmpeg_ok {
                println!("\n{}", tools.version_info().await?);
            }
            if !(ffmpeg_ok && ffprobe_ok) {
                return Err(StillframeError::Media("Required tools are missing".to_string()).into());
            }
        }
        Commands::InitConfig { path, force } => {
            if path.exists() && !force {
                return Err(StillframeError::Config(format!(
                    "{} already exists, use --force to overwrite",
                    path.display()
                ))
                .into());
            }
            config.save_to_file(&path)?;
            println!("Wrote configuration to {}", path.display());
        }
    }

    info!("Stillframe completed successfully");
    Ok(())
}

/// Print the composed video and optionally export a copy
async fn report_video(workflow: &Workflow, video: ComposedVideo, export_dir: Option<&Path>) -> Result<()> {
    println!("Video created successfully: {}", video.output_path.display());
    println!(
        "  {} | {:.2}s | {:.2} MB",
        video.dimensions,
        video.duration,
        video.size_bytes as f64 / 1024.0 / 1024.0
    );

    if let Some(dir) = export_dir {
        let exported: PathBuf = workflow.export(&video, dir).await?;
        println!("Exported to {}", exported.display());
    }
    Ok(())
}

fn spinner(message: &'static str) -> Result<ProgressBar> {
    let pb = ProgressBar::new_spinner();
    pb.set_style(ProgressStyle::default_spinner().template("{spinner:.green} [{elapsed_precise}] {msg}")?);
    pb.set_message(message);
    pb.enable_steady_tick(Duration::from_millis(120));
    Ok(pb)
}

fn status(available: bool) -> &'static str {
    if available { "OK" } else { "Missing" }
}

/// Log to stderr and to a daily file under `.stillframe/log`
fn setup_logging(verbose: bool) -> Result<WorkerGuard> {
    let log_dir = std::env::current_dir()?.join(".stillframe").join("log");
    std::fs::create_dir_all(&log_dir)?;

    let file_appender = rolling::daily(&log_dir, "stillframe.log");
    let (non_blocking_file, guard) = non_blocking(file_appender);

    let log_level = if verbose { Level::DEBUG } else { Level::INFO };

    let console_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_file(true)
        .with_line_number(true);

    let file_layer = fmt::layer()
        .with_writer(non_blocking_file)
        .with_target(false)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .with_ansi(false);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env().add_directive(log_level.into()))
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Cannot install log subscriber: {}", e))?;

    info!(
        "Logging initialized - console: {}, file: {}",
        log_level,
        log_dir.join("stillframe.log").display()
    );

    Ok(guard)
}
