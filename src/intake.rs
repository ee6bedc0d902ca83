use chrono::{DateTime, Utc};
use reqwest::{Client, Url};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use uuid::Uuid;

use crate::config::IntakeConfig;
use crate::error::{Result, StillframeError};
use crate::media::MediaKind;

/// An input file accepted for composition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaAsset {
    pub path: PathBuf,
    pub kind: MediaKind,
}

/// Lowercase extension after the last dot, if any
pub fn file_extension(name: &str) -> Option<String> {
    let (_, ext) = name.rsplit_once('.')?;
    if ext.is_empty() || ext.contains(['/', '\\']) {
        return None;
    }
    Some(ext.to_lowercase())
}

/// Extension of the last path segment of a URL; the query string is ignored
pub fn url_extension(url: &Url) -> Option<String> {
    let last_segment = url.path_segments()?.next_back()?;
    file_extension(last_segment)
}

/// Reduce a client-supplied file name to a safe basename
pub fn sanitize_file_name(name: &str) -> String {
    let basename = name.rsplit(['/', '\\']).next().unwrap_or_default();
    let cleaned: String = basename
        .chars()
        .filter_map(|c| match c {
            c if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') => Some(c),
            c if c.is_whitespace() => Some('_'),
            _ => None,
        })
        .collect();

    let trimmed = cleaned.trim_start_matches(['.', '_']);
    if trimmed.is_empty() {
        "file".to_string()
    } else {
        trimmed.to_string()
    }
}

/// Suggested file name when handing a finished video to a user
pub fn download_name(now: DateTime<Utc>) -> String {
    format!("merged_video_{}.mp4", now.timestamp())
}

/// Validates and stores composition inputs, and allocates output paths
pub struct Intake {
    config: IntakeConfig,
    upload_dir: PathBuf,
    output_dir: PathBuf,
    client: Client,
}

impl Intake {
    pub fn new<P: Into<PathBuf>, Q: Into<PathBuf>>(
        config: IntakeConfig,
        upload_dir: P,
        output_dir: Q,
    ) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("stillframe/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            config,
            upload_dir: upload_dir.into(),
            output_dir: output_dir.into(),
            client,
        })
    }

    pub fn upload_dir(&self) -> &Path {
        &self.upload_dir
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    fn allowed_extensions(&self, kind: MediaKind) -> &[String] {
        match kind {
            MediaKind::Image => &self.config.image_extensions,
            MediaKind::Audio => &self.config.audio_extensions,
        }
    }

    fn accepts(&self, kind: MediaKind, ext: &str) -> bool {
        self.allowed_extensions(kind)
            .iter()
            .any(|allowed| allowed.eq_ignore_ascii_case(ext))
    }

    fn check_extension(&self, kind: MediaKind, ext: Option<String>) -> Result<String> {
        match ext {
            Some(ext) if self.accepts(kind, &ext) => Ok(ext),
            other => {
                let allowed = self
                    .allowed_extensions(kind)
                    .iter()
                    .map(|e| e.to_uppercase())
                    .collect::<Vec<_>>()
                    .join(", ");
                Err(StillframeError::UnsupportedFormat(format!(
                    "Invalid {} file type '{}'. Allowed: {}",
                    kind.to_string().to_lowercase(),
                    other.unwrap_or_default(),
                    allowed
                )))
            }
        }
    }

    fn check_size(&self, name: &str, size: u64) -> Result<()> {
        if size > self.config.max_file_size {
            return Err(StillframeError::FileTooLarge {
                name: name.to_string(),
                size,
                limit: self.config.max_file_size,
            });
        }
        Ok(())
    }

    /// Accept a file already on disk after checking its type and size
    pub async fn validate_local(&self, kind: MediaKind, path: &Path) -> Result<MediaAsset> {
        let name = path.to_string_lossy();
        self.check_extension(kind, file_extension(&name))?;

        let metadata = tokio::fs::metadata(path)
            .await
            .map_err(|_| StillframeError::FileNotFound(path.display().to_string()))?;
        if !metadata.is_file() {
            return Err(StillframeError::FileNotFound(path.display().to_string()));
        }
        self.check_size(&name, metadata.len())?;

        Ok(MediaAsset {
            path: path.to_path_buf(),
            kind,
        })
    }

    /// Copy a local file into the upload directory so cleanup owns the copy
    pub async fn stage_local(&self, kind: MediaKind, path: &Path) -> Result<MediaAsset> {
        self.validate_local(kind, path).await?;

        let name = path
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_default();
        let bytes = tokio::fs::read(path).await?;
        self.store_upload(kind, &name, &bytes).await
    }

    /// Store uploaded bytes as `<upload_dir>/<uuid>_<sanitised name>`
    pub async fn store_upload(&self, kind: MediaKind, original_name: &str, bytes: &[u8]) -> Result<MediaAsset> {
        if original_name.trim().is_empty() {
            return Err(StillframeError::UnsupportedFormat(format!(
                "Please select a {} file",
                kind.to_string().to_lowercase()
            )));
        }
        self.check_extension(kind, file_extension(original_name))?;
        self.check_size(original_name, bytes.len() as u64)?;

        tokio::fs::create_dir_all(&self.upload_dir).await?;
        let path = self
            .upload_dir
            .join(format!("{}_{}", Uuid::new_v4(), sanitize_file_name(original_name)));
        tokio::fs::write(&path, bytes).await?;

        info!("File saved: {}", path.display());
        Ok(MediaAsset { path, kind })
    }

    /// Download a remote input as `<upload_dir>/<uuid>.<ext>`.
    ///
    /// The extension is checked before any request is made.
    pub async fn download(&self, kind: MediaKind, url: &str) -> Result<MediaAsset> {
        let url = Url::parse(url)
            .map_err(|e| StillframeError::UnsupportedFormat(format!("Invalid URL '{}': {}", url, e)))?;
        let ext = self.check_extension(kind, url_extension(&url))?;

        info!("Downloading {} from {}", kind.to_string().to_lowercase(), url);
        let mut response = self.client.get(url.clone()).send().await?.error_for_status()?;

        if let Some(length) = response.content_length() {
            self.check_size(url.as_str(), length)?;
        }

        tokio::fs::create_dir_all(&self.upload_dir).await?;
        let mut file = tempfile::NamedTempFile::new_in(&self.upload_dir)?;
        let mut received: u64 = 0;
        while let Some(chunk) = response.chunk().await? {
            received += chunk.len() as u64;
            self.check_size(url.as_str(), received)?;
            file.write_all(&chunk)?;
        }
        file.flush()?;
        debug!("Received {} bytes from {}", received, url);

        let path = self.upload_dir.join(format!("{}.{}", Uuid::new_v4(), ext));
        file.persist(&path).map_err(|e| StillframeError::Io(e.error))?;

        info!("File saved: {}", path.display());
        Ok(MediaAsset { path, kind })
    }

    /// Fresh output path `<output_dir>/<uuid>_video.mp4`
    pub fn allocate_output(&self) -> PathBuf {
        self.output_dir.join(format!("{}_video.mp4", Uuid::new_v4()))
    }
}
