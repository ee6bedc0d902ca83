use thiserror::Error;

use crate::media::CompositionError;

#[derive(Error, Debug)]
pub enum StillframeError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Media processing error: {0}")]
    Media(String),

    #[error("{description} timed out after {seconds}s")]
    Timeout { description: String, seconds: u64 },

    #[error("Video composition failed: {0}")]
    Composition(#[from] CompositionError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("File too large: {name} is {size} bytes (limit {limit} bytes)")]
    FileTooLarge { name: String, size: u64, limit: u64 },
}

pub type Result<T> = std::result::Result<T, StillframeError>;
