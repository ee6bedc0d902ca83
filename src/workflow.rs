use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tokio::fs;
use tracing::info;

use crate::config::Config;
use crate::error::{Result, StillframeError};
use crate::intake::{download_name, Intake, MediaAsset};
use crate::janitor::{FileJanitor, SweepReport};
use crate::media::{ComposedVideo, MediaFactory, MediaKind, VideoComposer};

/// Per-request codec overrides; `None` keeps the configured codec
#[derive(Debug, Clone, Default)]
pub struct CodecOverrides {
    pub video_codec: Option<String>,
    pub audio_codec: Option<String>,
}

pub struct Workflow {
    config: Config,
    composer: VideoComposer,
    intake: Intake,
    janitor: FileJanitor,
}

impl Workflow {
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;

        std::fs::create_dir_all(&config.storage.upload_dir)?;
        std::fs::create_dir_all(&config.storage.output_dir)?;

        let composer = MediaFactory::create_composer(config.media.clone());
        Self::with_composer(config, composer)
    }

    /// Build a workflow around an existing composer
    pub fn with_composer(config: Config, composer: VideoComposer) -> Result<Self> {
        let intake = Intake::new(
            config.intake.clone(),
            &config.storage.upload_dir,
            &config.storage.output_dir,
        )?;
        let janitor = FileJanitor::new(config.storage.placeholder_names.clone());

        Ok(Self {
            config,
            composer,
            intake,
            janitor,
        })
    }

    /// Compose a video from files already on disk.
    ///
    /// Both inputs are copied into the upload directory first, so they age out
    /// with the rest of the request's files.
    pub async fn compose_local<P: AsRef<Path>, Q: AsRef<Path>>(
        &self,
        image_path: P,
        audio_path: Q,
        output_path: Option<PathBuf>,
        codecs: &CodecOverrides,
    ) -> Result<ComposedVideo> {
        let image = self.intake.stage_local(MediaKind::Image, image_path.as_ref()).await?;
        let audio = match self.intake.stage_local(MediaKind::Audio, audio_path.as_ref()).await {
            Ok(audio) => audio,
            Err(e) => {
                self.discard(&[image.path.as_path()]);
                return Err(e);
            }
        };
        info!("Files saved: {}, {}", image.path.display(), audio.path.display());

        self.compose_assets(&image, &audio, output_path, codecs).await
    }

    /// Download both inputs, then compose them
    pub async fn compose_from_urls(
        &self,
        image_url: &str,
        audio_url: &str,
        output_path: Option<PathBuf>,
        codecs: &CodecOverrides,
    ) -> Result<ComposedVideo> {
        if image_url.trim().is_empty() || audio_url.trim().is_empty() {
            return Err(StillframeError::Config(
                "Both image and audio URLs are required".to_string(),
            ));
        }

        let image = self.intake.download(MediaKind::Image, image_url).await?;
        let audio = match self.intake.download(MediaKind::Audio, audio_url).await {
            Ok(audio) => audio,
            Err(e) => {
                self.discard(&[image.path.as_path()]);
                return Err(e);
            }
        };

        self.compose_assets(&image, &audio, output_path, codecs).await
    }

    async fn compose_assets(
        &self,
        image: &MediaAsset,
        audio: &MediaAsset,
        output_path: Option<PathBuf>,
        codecs: &CodecOverrides,
    ) -> Result<ComposedVideo> {
        let output_path = output_path.unwrap_or_else(|| self.intake.allocate_output());

        let mut request = self.composer.request(&image.path, &audio.path, output_path);
        if let Some(codec) = &codecs.video_codec {
            request = request.with_video_codec(codec);
        }
        if let Some(codec) = &codecs.audio_codec {
            request = request.with_audio_codec(codec);
        }

        match self.composer.compose(&request).await {
            Ok(video) => Ok(video),
            Err(e) => {
                let discarded = self.discard(&[image.path.as_path(), audio.path.as_path()]);
                info!("Composition failed, discarded {} input file(s)", discarded);
                Err(e.into())
            }
        }
    }

    /// Copy a composed video into `destination_dir` under its download name
    pub async fn export<P: AsRef<Path>>(&self, video: &ComposedVideo, destination_dir: P) -> Result<PathBuf> {
        let destination_dir = destination_dir.as_ref();
        if !video.output_path.exists() {
            return Err(StillframeError::FileNotFound(video.output_path.display().to_string()));
        }

        fs::create_dir_all(destination_dir).await?;
        let destination = destination_dir.join(download_name(Utc::now()));
        fs::copy(&video.output_path, &destination).await?;

        info!("Exported {} to {}", video.output_path.display(), destination.display());
        Ok(destination)
    }

    /// Remove stale files from the upload and output directories
    pub fn cleanup(&self, now: SystemTime) -> SweepReport {
        self.cleanup_with_retention(now, self.config.storage.retention())
    }

    pub fn cleanup_with_retention(&self, now: SystemTime, retention: Duration) -> SweepReport {
        if let Some(cutoff) = now.checked_sub(retention) {
            info!("Removing files created before {}", DateTime::<Utc>::from(cutoff).to_rfc3339());
        }

        let mut report = SweepReport::default();
        for dir in [&self.config.storage.upload_dir, &self.config.storage.output_dir] {
            let swept = self.janitor.sweep(dir, retention, now);
            info!(
                "Cleaned {}: {} removed, {} kept, {} failed",
                dir.display(),
                swept.removed.len(),
                swept.kept,
                swept.failed
            );
            report.merge(swept);
        }
        report
    }

    /// Delete files belonging to an abandoned request
    fn discard(&self, paths: &[&Path]) -> usize {
        paths.iter().filter(|path| self.janitor.remove_file(path)).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StorageConfig;
    use crate::media::{CommandOutput, CompositionError, MockCommandExecutor};
    use std::sync::Arc;

    fn config_in(root: &Path) -> Config {
        Config {
            storage: StorageConfig {
                upload_dir: root.join("uploads"),
                output_dir: root.join("output"),
                ..StorageConfig::default()
            },
            ..Config::default()
        }
    }

    /// Executor behaving like ffmpeg/ffprobe on a 5 second clip and a 640x360 image
    fn fake_tools() -> MockCommandExecutor {
        let mut mock = MockCommandExecutor::new();
        mock.expect_run().returning(|cmd| {
            let stdout = if cmd.args == ["-version"] {
                "ffmpeg version 6.1".to_string()
            } else if cmd.args.iter().any(|a| a == "-show_format") {
                r#"{ "format": { "duration": "5.0" } }"#.to_string()
            } else if cmd.binary_path == "ffprobe" {
                r#"{ "streams": [ { "codec_type": "video", "width": 640, "height": 360 } ] }"#.to_string()
            } else {
                std::fs::write(cmd.args.last().unwrap(), b"mp4 data").unwrap();
                String::new()
            };
            Ok(CommandOutput { exit_code: Some(0), stdout, stderr: String::new() })
        });
        mock
    }

    fn workflow(root: &Path, mock: MockCommandExecutor) -> Workflow {
        let config = config_in(root);
        std::fs::create_dir_all(&config.storage.upload_dir).unwrap();
        std::fs::create_dir_all(&config.storage.output_dir).unwrap();
        let composer = VideoComposer::new(config.media.clone(), Arc::new(mock));
        Workflow::with_composer(config, composer).unwrap()
    }

    #[tokio::test]
    async fn test_compose_local_allocates_output() {
        let temp = tempfile::tempdir().unwrap();
        let image = temp.path().join("cover.png");
        let audio = temp.path().join("track.wav");
        std::fs::write(&image, b"png").unwrap();
        std::fs::write(&audio, b"wav").unwrap();
        let workflow = workflow(temp.path(), fake_tools());

        let video = workflow
            .compose_local(&image, &audio, None, &CodecOverrides::default())
            .await
            .unwrap();

        assert_eq!(video.output_path.parent(), Some(temp.path().join("output").as_path()));
        assert_eq!(video.dimensions.to_string(), "640x360");
        assert!(video.output_path.is_file());
        assert_eq!(std::fs::read_dir(temp.path().join("uploads")).unwrap().count(), 2);
        assert!(image.exists() && audio.exists());

        let exported = workflow.export(&video, temp.path().join("downloads")).await.unwrap();
        assert!(exported.file_name().unwrap().to_string_lossy().starts_with("merged_video_"));
        assert_eq!(std::fs::read(&exported).unwrap(), b"mp4 data");
    }

    #[tokio::test]
    async fn test_compose_local_rejects_wrong_type_without_running_tools() {
        let temp = tempfile::tempdir().unwrap();
        let image = temp.path().join("cover.tiff");
        let audio = temp.path().join("track.wav");
        std::fs::write(&image, b"tiff").unwrap();
        std::fs::write(&audio, b"wav").unwrap();
        let mut mock = MockCommandExecutor::new();
        mock.expect_run().never();
        let workflow = workflow(temp.path(), mock);

        let err = workflow
            .compose_local(&image, &audio, None, &CodecOverrides::default())
            .await
            .unwrap_err();
        assert!(matches!(err, StillframeError::UnsupportedFormat(_)));
    }

    #[tokio::test]
    async fn test_composition_failure_is_wrapped() {
        let temp = tempfile::tempdir().unwrap();
        let image = temp.path().join("cover.png");
        let audio = temp.path().join("track.wav");
        std::fs::write(&image, b"png").unwrap();
        std::fs::write(&audio, b"wav").unwrap();
        let mut mock = MockCommandExecutor::new();
        mock.expect_run()
            .returning(|_| Ok(CommandOutput { exit_code: Some(127), ..Default::default() }));
        let workflow = workflow(temp.path(), mock);

        let err = workflow
            .compose_local(&image, &audio, Some(temp.path().join("v.mp4")), &CodecOverrides::default())
            .await
            .unwrap_err();
        assert!(matches!(err, StillframeError::Composition(CompositionError::ToolMissing)));
        assert_eq!(std::fs::read_dir(temp.path().join("uploads")).unwrap().count(), 0);
        assert!(image.exists() && audio.exists());
    }

    #[tokio::test]
    async fn test_rejected_audio_discards_staged_image() {
        let temp = tempfile::tempdir().unwrap();
        let image = temp.path().join("cover.png");
        std::fs::write(&image, b"png").unwrap();
        let mut mock = MockCommandExecutor::new();
        mock.expect_run().never();
        let workflow = workflow(temp.path(), mock);

        let err = workflow
            .compose_local(&image, temp.path().join("missing.mp3"), None, &CodecOverrides::default())
            .await
            .unwrap_err();
        assert!(matches!(err, StillframeError::FileNotFound(_)));
        assert_eq!(std::fs::read_dir(temp.path().join("uploads")).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_blank_urls_are_rejected() {
        let temp = tempfile::tempdir().unwrap();
        let workflow = workflow(temp.path(), MockCommandExecutor::new());

        let err = workflow
            .compose_from_urls("", "https://example.com/a.mp3", None, &CodecOverrides::default())
            .await
            .unwrap_err();
        assert!(matches!(err, StillframeError::Config(_)));
    }

    #[test]
    fn test_cleanup_sweeps_both_directories() {
        let temp = tempfile::tempdir().unwrap();
        let workflow = workflow(temp.path(), MockCommandExecutor::new());
        std::fs::write(temp.path().join("uploads/x_cover.png"), b"png").unwrap();
        std::fs::write(temp.path().join("uploads/.gitkeep"), b"").unwrap();
        std::fs::write(temp.path().join("output/x_video.mp4"), b"mp4").unwrap();

        let report = workflow.cleanup(SystemTime::now());
        assert!(report.removed.is_empty());

        let report = workflow.cleanup(SystemTime::now() + Duration::from_secs(7200));
        assert_eq!(report.removed.len(), 2);
        assert!(temp.path().join("uploads/.gitkeep").exists());
    }

    #[test]
    fn test_discard_counts_removed_files() {
        let temp = tempfile::tempdir().unwrap();
        let workflow = workflow(temp.path(), MockCommandExecutor::new());
        let file = temp.path().join("uploads/a.png");
        std::fs::write(&file, b"png").unwrap();

        let missing = temp.path().join("uploads/b.png");

        assert_eq!(workflow.discard(&[file.as_path(), missing.as_path()]), 1);
    }
}
