use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::Semaphore;

use crate::error::{Result, StillframeError};
use crate::media::Dimensions;

// Default values used when a config file omits a field
fn default_ffmpeg_path() -> String {
    "ffmpeg".to_string()
}

fn default_ffprobe_path() -> String {
    "ffprobe".to_string()
}

fn default_video_codec() -> String {
    "libx264".to_string()
}

fn default_audio_codec() -> String {
    "aac".to_string()
}

fn default_pixel_format() -> String {
    "yuv420p".to_string()
}

fn default_frame_rate() -> u32 {
    25
}

fn default_fallback_width() -> u32 {
    1280
}

fn default_fallback_height() -> u32 {
    720
}

fn default_process_timeout_secs() -> u64 {
    1800
}

fn default_max_concurrent_compositions() -> usize {
    2
}

fn default_upload_dir() -> PathBuf {
    PathBuf::from("uploads")
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("output")
}

fn default_retention_secs() -> u64 {
    3600
}

fn default_placeholder_names() -> Vec<String> {
    vec![".gitkeep".to_string()]
}

fn default_image_extensions() -> Vec<String> {
    ["png", "jpg", "jpeg", "gif"].iter().map(|s| s.to_string()).collect()
}

fn default_audio_extensions() -> Vec<String> {
    ["mp3", "wav", "aac", "m4a"].iter().map(|s| s.to_string()).collect()
}

fn default_max_file_size() -> u64 {
    100 * 1024 * 1024
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub media: MediaConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub intake: IntakeConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaConfig {
    /// Path to ffmpeg binary
    #[serde(default = "default_ffmpeg_path")]
    pub ffmpeg_path: String,
    /// Path to ffprobe binary
    #[serde(default = "default_ffprobe_path")]
    pub ffprobe_path: String,
    /// Video codec used when a request does not name one
    #[serde(default = "default_video_codec")]
    pub video_codec: String,
    /// Audio codec used when a request does not name one
    #[serde(default = "default_audio_codec")]
    pub audio_codec: String,
    /// Output pixel format; yuv420p plays almost everywhere
    #[serde(default = "default_pixel_format")]
    pub pixel_format: String,
    /// Output frame rate
    #[serde(default = "default_frame_rate")]
    pub frame_rate: u32,
    /// Width used when the image cannot be probed
    #[serde(default = "default_fallback_width")]
    pub fallback_width: u32,
    /// Height used when the image cannot be probed
    #[serde(default = "default_fallback_height")]
    pub fallback_height: u32,
    /// Hard limit on any single ffmpeg/ffprobe run, 0 disables it
    #[serde(default = "default_process_timeout_secs")]
    pub process_timeout_secs: u64,
    /// Number of transcodes allowed to run at the same time
    #[serde(default = "default_max_concurrent_compositions")]
    pub max_concurrent_compositions: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Directory receiving uploaded and downloaded inputs
    #[serde(default = "default_upload_dir")]
    pub upload_dir: PathBuf,
    /// Directory receiving composed videos
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    /// Age in seconds after which cleanup removes a file
    #[serde(default = "default_retention_secs")]
    pub retention_secs: u64,
    /// Entries cleanup never touches
    #[serde(default = "default_placeholder_names")]
    pub placeholder_names: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntakeConfig {
    /// Accepted image extensions (lowercase, without dot)
    #[serde(default = "default_image_extensions")]
    pub image_extensions: Vec<String>,
    /// Accepted audio extensions (lowercase, without dot)
    #[serde(default = "default_audio_extensions")]
    pub audio_extensions: Vec<String>,
    /// Maximum accepted input size in bytes
    #[serde(default = "default_max_file_size")]
    pub max_file_size: u64,
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            ffmpeg_path: default_ffmpeg_path(),
            ffprobe_path: default_ffprobe_path(),
            video_codec: default_video_codec(),
            audio_codec: default_audio_codec(),
            pixel_format: default_pixel_format(),
            frame_rate: default_frame_rate(),
            fallback_width: default_fallback_width(),
            fallback_height: default_fallback_height(),
            process_timeout_secs: default_process_timeout_secs(),
            max_concurrent_compositions: default_max_concurrent_compositions(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            upload_dir: default_upload_dir(),
            output_dir: default_output_dir(),
            retention_secs: default_retention_secs(),
            placeholder_names: default_placeholder_names(),
        }
    }
}

impl Default for IntakeConfig {
    fn default() -> Self {
        Self {
            image_extensions: default_image_extensions(),
            audio_extensions: default_audio_extensions(),
            max_file_size: default_max_file_size(),
        }
    }
}

impl MediaConfig {
    pub fn process_timeout(&self) -> Option<Duration> {
        match self.process_timeout_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }

    pub fn fallback_dimensions(&self) -> Dimensions {
        Dimensions::new(self.fallback_width, self.fallback_height)
    }
}

impl StorageConfig {
    pub fn retention(&self) -> Duration {
        Duration::from_secs(self.retention_secs)
    }
}

impl Config {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| StillframeError::Config(format!("Failed to read config file: {}", e)))?;

        let config: Config = toml::from_str(&content)?;

        config.validate()?;
        Ok(config)
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| StillframeError::Config(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path, content)
            .map_err(|e| StillframeError::Config(format!("Failed to write config file: {}", e)))?;

        Ok(())
    }

    /// Reject values the composer cannot work with
    pub fn validate(&self) -> Result<()> {
        if self.media.frame_rate == 0 {
            return Err(StillframeError::Config("media.frame_rate must be positive".to_string()));
        }
        if self.media.max_concurrent_compositions == 0
            || self.media.max_concurrent_compositions > Semaphore::MAX_PERMITS
        {
            return Err(StillframeError::Config(format!(
                "media.max_concurrent_compositions must be between 1 and {}",
                Semaphore::MAX_PERMITS
            )));
        }
        if self.media.fallback_width == 0 || self.media.fallback_height == 0 {
            return Err(StillframeError::Config(
                "media.fallback_width and media.fallback_height must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_round_trips_through_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        Config::default().save_to_file(&path).unwrap();
        let loaded = Config::from_file(&path).unwrap();

        assert_eq!(loaded.media.video_codec, "libx264");
        assert_eq!(loaded.media.audio_codec, "aac");
        assert_eq!(loaded.media.frame_rate, 25);
        assert_eq!(loaded.storage.retention_secs, 3600);
        assert_eq!(loaded.storage.placeholder_names, vec![".gitkeep".to_string()]);
        assert_eq!(loaded.intake.max_file_size, 100 * 1024 * 1024);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let config: Config = toml::from_str(
            r#"
            [media]
            ffmpeg_path = "/opt/ffmpeg/bin/ffmpeg"
            process_timeout_secs = 0

            [storage]
            retention_secs = 60
            "#,
        )
        .unwrap();

        assert_eq!(config.media.ffmpeg_path, "/opt/ffmpeg/bin/ffmpeg");
        assert_eq!(config.media.ffprobe_path, "ffprobe");
        assert_eq!(config.media.process_timeout(), None);
        assert_eq!(config.storage.retention(), Duration::from_secs(60));
        assert_eq!(config.storage.output_dir, PathBuf::from("output"));
        assert_eq!(config.intake.audio_extensions.len(), 4);
    }

    #[test]
    fn test_zero_frame_rate_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[media]\nframe_rate = 0\n").unwrap();

        let err = Config::from_file(&path).unwrap_err();
        assert!(err.to_string().contains("frame_rate"));
    }

    #[test]
    fn test_concurrency_limit_bounds() {
        let config: Config =
            toml::from_str("[media]\nmax_concurrent_compositions = 9000000000000000000\n").unwrap();
        let err = config.validate().unwrap_err();
        assert!(matches!(err, StillframeError::Config(_)));
        assert!(err.to_string().contains("max_concurrent_compositions"));

        let config: Config = toml::from_str("[media]\nmax_concurrent_compositions = 0\n").unwrap();
        assert!(config.validate().is_err());

        let config: Config = toml::from_str("[media]\nmax_concurrent_compositions = 16\n").unwrap();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_malformed_file_is_a_toml_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[media\nframe_rate = \"fast\"\n").unwrap();

        let err = Config::from_file(&path).unwrap_err();
        assert!(matches!(err, StillframeError::Toml(_)));
    }
}
