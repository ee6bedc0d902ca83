use serde::Deserialize;
use serde_json::Value;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, error, warn};

use super::{CommandExecutor, CommandOutput, Dimensions, MediaCommand, MediaCommandBuilder};

/// Subset of `ffprobe -print_format json` output this crate reads
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProbeOutput {
    #[serde(default)]
    pub format: Option<ProbeFormat>,
    #[serde(default)]
    pub streams: Vec<ProbeStream>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProbeFormat {
    /// Seconds; ffprobe prints it as a string
    #[serde(default)]
    pub duration: Option<Value>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProbeStream {
    #[serde(default)]
    pub codec_type: Option<String>,
    #[serde(default)]
    pub width: Option<i64>,
    #[serde(default)]
    pub height: Option<i64>,
    #[serde(default)]
    pub duration: Option<Value>,
}

/// Read the duration from probe JSON.
///
/// `format.duration` wins; otherwise the first stream that carries a duration.
/// Returns `None` for malformed JSON, a missing field, or a value that is not
/// a finite positive number.
pub fn parse_duration(json: &str) -> Option<f64> {
    let probe: ProbeOutput = match serde_json::from_str(json) {
        Ok(probe) => probe,
        Err(e) => {
            error!("Error parsing ffprobe output: {}", e);
            return None;
        }
    };

    let raw = probe
        .format
        .as_ref()
        .and_then(|format| format.duration.as_ref())
        .or_else(|| probe.streams.iter().find_map(|stream| stream.duration.as_ref()));

    let Some(raw) = raw else {
        error!("Could not find duration in probe data");
        return None;
    };

    match seconds(raw) {
        Some(duration) if duration.is_finite() && duration > 0.0 => Some(duration),
        _ => {
            error!("Invalid duration in probe data: {}", raw);
            None
        }
    }
}

/// Read the size of the first video stream with positive width and height.
///
/// Still images are reported by ffprobe as a single-frame video stream.
pub fn parse_dimensions(json: &str) -> Option<Dimensions> {
    let probe: ProbeOutput = match serde_json::from_str(json) {
        Ok(probe) => probe,
        Err(e) => {
            error!("Error parsing ffprobe output for image: {}", e);
            return None;
        }
    };

    let found = probe
        .streams
        .iter()
        .filter(|stream| stream.codec_type.as_deref() == Some("video"))
        .find_map(|stream| {
            let width = u32::try_from(stream.width?).ok()?;
            let height = u32::try_from(stream.height?).ok()?;
            (width > 0 && height > 0).then(|| Dimensions::new(width, height))
        });

    if found.is_none() {
        error!("Could not find valid dimensions in probe data");
    }
    found
}

fn seconds(value: &Value) -> Option<f64> {
    match value {
        Value::String(text) => text.trim().parse().ok(),
        Value::Number(number) => number.as_f64(),
        _ => None,
    }
}

/// Metadata queries against ffprobe
#[derive(Clone)]
pub struct MediaProbe {
    executor: Arc<dyn CommandExecutor>,
    commands: MediaCommandBuilder,
}

impl MediaProbe {
    pub fn new(executor: Arc<dyn CommandExecutor>, commands: MediaCommandBuilder) -> Self {
        Self { executor, commands }
    }

    /// Audio duration in seconds, `None` when it cannot be determined
    pub async fn probe_audio_duration(&self, path: &Path) -> Option<f64> {
        let command = self.commands.probe_format_and_streams(path);
        let output = self.run_probe(&command, path).await?;

        let duration = parse_duration(&output.stdout);
        if let Some(duration) = duration {
            debug!("Probed duration of {}: {}s", path.display(), duration);
        }
        duration
    }

    /// Image width and height, `None` when they cannot be determined
    pub async fn probe_image_dimensions(&self, path: &Path) -> Option<Dimensions> {
        let command = self.commands.probe_streams(path);
        let output = self.run_probe(&command, path).await?;

        let dimensions = parse_dimensions(&output.stdout);
        if let Some(dimensions) = dimensions {
            debug!("Probed dimensions of {}: {}", path.display(), dimensions);
        }
        dimensions
    }

    async fn run_probe(&self, command: &MediaCommand, path: &Path) -> Option<CommandOutput> {
        match self.executor.run(command).await {
            Ok(output) if output.success() => Some(output),
            Ok(output) => {
                warn!(
                    "ffprobe command failed for {} with exit code {:?}: {}",
                    path.display(),
                    output.exit_code,
                    output.stderr.trim()
                );
                None
            }
            Err(e) => {
                warn!("ffprobe could not run for {}: {}", path.display(), e);
                None
            }
        }
    }
}
