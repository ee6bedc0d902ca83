use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Semaphore;
use tracing::{error, info, warn};

use super::{
    dimensions, CommandExecutor, Dimensions, MediaCommandBuilder, MediaProbe, StillVideoParams,
    ToolAvailability,
};
use crate::config::MediaConfig;

/// Role of an input file in a composition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MediaKind {
    Image,
    Audio,
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MediaKind::Image => write!(f, "Image"),
            MediaKind::Audio => write!(f, "Audio"),
        }
    }
}

/// A still image and an audio track to be combined into `output_path`
#[derive(Debug, Clone, PartialEq)]
pub struct CompositionRequest {
    pub image_path: PathBuf,
    pub audio_path: PathBuf,
    pub output_path: PathBuf,
    pub video_codec: String,
    pub audio_codec: String,
}

impl CompositionRequest {
    /// Request using the default H.264/AAC codec pair
    pub fn new<P1, P2, P3>(image_path: P1, audio_path: P2, output_path: P3) -> Self
    where
        P1: Into<PathBuf>,
        P2: Into<PathBuf>,
        P3: Into<PathBuf>,
    {
        Self {
            image_path: image_path.into(),
            audio_path: audio_path.into(),
            output_path: output_path.into(),
            video_codec: "libx264".to_string(),
            audio_codec: "aac".to_string(),
        }
    }

    pub fn with_video_codec<S: Into<String>>(mut self, codec: S) -> Self {
        self.video_codec = codec.into();
        self
    }

    pub fn with_audio_codec<S: Into<String>>(mut self, codec: S) -> Self {
        self.audio_codec = codec.into();
        self
    }
}

/// A video that existed with non-zero size when composition returned
#[derive(Debug, Clone, PartialEq)]
pub struct ComposedVideo {
    pub output_path: PathBuf,
    pub size_bytes: u64,
    pub duration: f64,
    pub dimensions: Dimensions,
}

/// Why a composition failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureReason {
    ToolMissing,
    InputNotFound,
    ProbeFailed,
    ToolExecutionFailed,
    OutputMissingOrEmpty,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CompositionError {
    #[error("FFmpeg is not installed or not available")]
    ToolMissing,

    #[error("{kind} file not found: {}", path.display())]
    InputNotFound { kind: MediaKind, path: PathBuf },

    #[error("Could not determine audio duration of {}", path.display())]
    ProbeFailed { path: PathBuf },

    #[error("{}", execution_message(*exit_code, diagnostic))]
    ToolExecutionFailed {
        exit_code: Option<i32>,
        diagnostic: String,
    },

    #[error("Output file was not created or is empty: {}: {diagnostic}", path.display())]
    OutputMissingOrEmpty { path: PathBuf, diagnostic: String },
}

fn execution_message(exit_code: Option<i32>, diagnostic: &str) -> String {
    let mut message = match exit_code {
        Some(code) => format!("FFmpeg failed with return code {}", code),
        None => "FFmpeg did not complete".to_string(),
    };
    let diagnostic = diagnostic.trim();
    if !diagnostic.is_empty() {
        message.push_str(": ");
        message.push_str(diagnostic);
    }
    message
}

impl CompositionError {
    pub fn reason(&self) -> FailureReason {
        match self {
            CompositionError::ToolMissing => FailureReason::ToolMissing,
            CompositionError::InputNotFound { .. } => FailureReason::InputNotFound,
            CompositionError::ProbeFailed { .. } => FailureReason::ProbeFailed,
            CompositionError::ToolExecutionFailed { .. } => FailureReason::ToolExecutionFailed,
            CompositionError::OutputMissingOrEmpty { .. } => FailureReason::OutputMissingOrEmpty,
        }
    }
}

pub type CompositionResult = std::result::Result<ComposedVideo, CompositionError>;

/// Combines a still image and an audio track into an MP4 with ffmpeg
pub struct VideoComposer {
    config: MediaConfig,
    executor: Arc<dyn CommandExecutor>,
    commands: MediaCommandBuilder,
    availability: ToolAvailability,
    probe: MediaProbe,
    permits: Semaphore,
}

impl VideoComposer {
    pub fn new(config: MediaConfig, executor: Arc<dyn CommandExecutor>) -> Self {
        let commands = MediaCommandBuilder::new(&config.ffmpeg_path, &config.ffprobe_path);
        let availability = ToolAvailability::new(executor.clone(), commands.clone());
        let probe = MediaProbe::new(executor.clone(), commands.clone());
        let permits = Semaphore::new(
            config
                .max_concurrent_compositions
                .clamp(1, Semaphore::MAX_PERMITS),
        );

        Self {
            config,
            executor,
            commands,
            availability,
            probe,
            permits,
        }
    }

    /// Request for the given paths using the configured codecs
    pub fn request<P1, P2, P3>(&self, image_path: P1, audio_path: P2, output_path: P3) -> CompositionRequest
    where
        P1: Into<PathBuf>,
        P2: Into<PathBuf>,
        P3: Into<PathBuf>,
    {
        CompositionRequest::new(image_path, audio_path, output_path)
            .with_video_codec(&self.config.video_codec)
            .with_audio_codec(&self.config.audio_codec)
    }

    pub fn availability(&self) -> &ToolAvailability {
        &self.availability
    }

    pub fn probe(&self) -> &MediaProbe {
        &self.probe
    }

    /// Compose the video described by `request`.
    ///
    /// Checks run in order and stop at the first failure: tool presence, input
    /// existence, audio duration. An unreadable image size falls back to the
    /// configured default instead of failing.
    pub async fn compose(&self, request: &CompositionRequest) -> CompositionResult {
        if !self.availability.is_available().await {
            return Err(CompositionError::ToolMissing);
        }

        check_input(MediaKind::Image, &request.image_path)?;
        check_input(MediaKind::Audio, &request.audio_path)?;

        let duration = self
            .probe
            .probe_audio_duration(&request.audio_path)
            .await
            .ok_or_else(|| CompositionError::ProbeFailed {
                path: request.audio_path.clone(),
            })?;
        info!("Creating video with duration: {} seconds", duration);

        let probed = self.probe.probe_image_dimensions(&request.image_path).await;
        let dimensions = dimensions::normalize(probed, self.config.fallback_dimensions());
        info!("Using dimensions: {}", dimensions);

        ensure_parent_dir(&request.output_path).await?;

        let command = self.commands.still_video(&StillVideoParams {
            image_path: &request.image_path,
            audio_path: &request.audio_path,
            output_path: &request.output_path,
            video_codec: &request.video_codec,
            audio_codec: &request.audio_codec,
            pixel_format: &self.config.pixel_format,
            frame_rate: self.config.frame_rate,
            dimensions,
            duration,
        });

        let _permit = self.permits.acquire().await.map_err(|e| {
            CompositionError::ToolExecutionFailed {
                exit_code: None,
                diagnostic: format!("Composer is shutting down: {}", e),
            }
        })?;

        info!("Running FFmpeg command: {}", command.command_line());
        let output = match self.executor.run(&command).await {
            Ok(output) => output,
            Err(e) => {
                error!("FFmpeg process error: {}", e);
                return Err(CompositionError::ToolExecutionFailed {
                    exit_code: None,
                    diagnostic: e.to_string(),
                });
            }
        };

        if !output.success() {
            let failure = CompositionError::ToolExecutionFailed {
                exit_code: output.exit_code,
                diagnostic: output.stderr,
            };
            error!("{}", failure);
            return Err(failure);
        }

        let size_bytes = verify_output(&request.output_path).await?;
        info!("Video created successfully: {}", request.output_path.display());

        Ok(ComposedVideo {
            output_path: request.output_path.clone(),
            size_bytes,
            duration,
            dimensions,
        })
    }
}

fn check_input(kind: MediaKind, path: &Path) -> Result<(), CompositionError> {
    if path.exists() {
        Ok(())
    } else {
        Err(CompositionError::InputNotFound {
            kind,
            path: path.to_path_buf(),
        })
    }
}

async fn ensure_parent_dir(output_path: &Path) -> Result<(), CompositionError> {
    let Some(parent) = output_path.parent().filter(|p| !p.as_os_str().is_empty()) else {
        return Ok(());
    };

    tokio::fs::create_dir_all(parent).await.map_err(|e| {
        warn!("Failed to create output directory {}: {}", parent.display(), e);
        CompositionError::OutputMissingOrEmpty {
            path: output_path.to_path_buf(),
            diagnostic: format!("cannot create directory {}: {}", parent.display(), e),
        }
    })
}

async fn verify_output(output_path: &Path) -> Result<u64, CompositionError> {
    match tokio::fs::metadata(output_path).await {
        Ok(metadata) if metadata.is_file() && metadata.len() > 0 => Ok(metadata.len()),
        Ok(_) => Err(CompositionError::OutputMissingOrEmpty {
            path: output_path.to_path_buf(),
            diagnostic: "file is empty".to_string(),
        }),
        Err(e) => Err(CompositionError::OutputMissingOrEmpty {
            path: output_path.to_path_buf(),
            diagnostic: e.to_string(),
        }),
    }
}
