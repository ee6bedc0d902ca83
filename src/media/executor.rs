use async_trait::async_trait;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::debug;

use super::{CommandExecutor, CommandOutput, MediaCommand};
use crate::error::{Result, StillframeError};

/// Executor that spawns the command as a child process
#[derive(Debug, Clone)]
pub struct ProcessExecutor {
    timeout: Option<Duration>,
}

impl ProcessExecutor {
    pub fn new(timeout: Option<Duration>) -> Self {
        Self { timeout }
    }
}

#[async_trait]
impl CommandExecutor for ProcessExecutor {
    async fn run(&self, command: &MediaCommand) -> Result<CommandOutput> {
        debug!("Executing media processing command: {} {:?}", command.binary_path, command.args);
        debug!("Description: {}", command.description);

        let mut cmd = Command::new(&command.binary_path);
        cmd.args(&command.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let output = match self.timeout {
            Some(limit) => match tokio::time::timeout(limit, cmd.output()).await {
                Ok(result) => result,
                Err(_) => {
                    return Err(StillframeError::Timeout {
                        description: command.description.clone(),
                        seconds: limit.as_secs(),
                    });
                }
            },
            None => cmd.output().await,
        }
        .map_err(|e| {
            StillframeError::Media(format!("Failed to execute {}: {}", command.binary_path, e))
        })?;

        Ok(CommandOutput {
            exit_code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        })
    }
}
