// Media processing built on external ffmpeg/ffprobe processes
//
// Every process goes through the CommandExecutor trait so the logic above it
// can run against a fake executor in tests:
// - Commands: argument builders for ffmpeg and ffprobe
// - Executor: tokio process runner with an optional hard timeout
// - Availability: transcoder presence check
// - Probe: duration and dimension probing from ffprobe JSON
// - Dimensions: even-size normalization
// - Composer: image + audio to MP4 composition

pub mod availability;
pub mod commands;
pub mod composer;
pub mod dimensions;
pub mod executor;
pub mod probe;

use async_trait::async_trait;
use std::sync::Arc;

pub use availability::*;
pub use commands::*;
pub use composer::*;
pub use dimensions::*;
pub use executor::*;
pub use probe::*;

use crate::config::MediaConfig;
use crate::error::Result;

/// Captured result of one external process run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// Exit code, `None` when the process was terminated by a signal
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }
}

/// Runs a media command and captures its output.
///
/// A non-zero exit status is reported through `CommandOutput`, not as an error.
/// `Err` means the process could not be started or did not finish in time.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CommandExecutor: Send + Sync {
    async fn run(&self, command: &MediaCommand) -> Result<CommandOutput>;
}

/// Factory for creating media components wired to a shared executor
pub struct MediaFactory;

impl MediaFactory {
    /// Create the default process-spawning executor
    pub fn create_executor(config: &MediaConfig) -> Arc<dyn CommandExecutor> {
        Arc::new(ProcessExecutor::new(config.process_timeout()))
    }

    /// Create a composer backed by real ffmpeg/ffprobe processes
    pub fn create_composer(config: MediaConfig) -> VideoComposer {
        let executor = Self::create_executor(&config);
        VideoComposer::new(config, executor)
    }
}
