use std::sync::Arc;
use tracing::{debug, error};

use super::{CommandExecutor, MediaCommandBuilder};
use crate::error::{Result, StillframeError};

/// Checks that the transcoder can be started.
///
/// Nothing is cached: the binary may disappear between two compositions.
#[derive(Clone)]
pub struct ToolAvailability {
    executor: Arc<dyn CommandExecutor>,
    commands: MediaCommandBuilder,
}

impl ToolAvailability {
    pub fn new(executor: Arc<dyn CommandExecutor>, commands: MediaCommandBuilder) -> Self {
        Self { executor, commands }
    }

    /// True when `ffmpeg -version` runs and exits successfully
    pub async fn is_available(&self) -> bool {
        match self.executor.run(&self.commands.version_check()).await {
            Ok(output) if output.success() => {
                debug!("Media processor is available");
                true
            }
            Ok(output) => {
                error!(
                    "{} -version exited with {:?}. Please install FFmpeg.",
                    self.commands.ffmpeg_path(),
                    output.exit_code
                );
                false
            }
            Err(e) => {
                error!("FFmpeg not found. Please install FFmpeg. ({})", e);
                false
            }
        }
    }

    /// True when `ffprobe -version` runs and exits successfully
    pub async fn is_probe_available(&self) -> bool {
        match self.executor.run(&self.commands.probe_version_check()).await {
            Ok(output) if output.success() => true,
            Ok(output) => {
                error!(
                    "{} -version exited with {:?}",
                    self.commands.ffprobe_path(),
                    output.exit_code
                );
                false
            }
            Err(e) => {
                error!("{} not found: {}", self.commands.ffprobe_path(), e);
                false
            }
        }
    }

    /// First line of the version banner
    pub async fn version_info(&self) -> Result<String> {
        let output = self.executor.run(&self.commands.version_check()).await?;

        if output.success() {
            let first_line = output.stdout.lines().next().unwrap_or("Unknown version");
            Ok(first_line.to_string())
        } else {
            Err(StillframeError::Media(format!(
                "Media processor version check failed: {}",
                output.stderr
            )))
        }
    }
}
