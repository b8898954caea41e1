//! Error types for media operations.

use std::path::PathBuf;
use thiserror::Error;

/// Result type for media operations.
pub type MediaResult<T> = Result<T, MediaError>;

/// Errors that can occur during compositing and encoding.
#[derive(Debug, Error)]
pub enum MediaError {
    #[error("FFmpeg not found in PATH")]
    FfmpegNotFound,

    #[error("Video encoding failed: {message}")]
    Encoding {
        message: String,
        stderr: Option<String>,
        exit_code: Option<i32>,
    },

    #[error("Asset not found: {}", .0.display())]
    MissingAsset(PathBuf),

    #[error("Image decode failed: {0}")]
    Decode(String),

    #[error("Image encode failed: {0}")]
    ImageEncode(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl MediaError {
    /// Create an encoding failure error.
    pub fn encoding(
        message: impl Into<String>,
        stderr: Option<String>,
        exit_code: Option<i32>,
    ) -> Self {
        Self::Encoding {
            message: message.into(),
            stderr,
            exit_code,
        }
    }

    /// Create a missing asset error.
    pub fn missing_asset(path: impl Into<PathBuf>) -> Self {
        Self::MissingAsset(path.into())
    }

    /// Whether this error came out of the video encoding stage.
    pub fn is_encoding_error(&self) -> bool {
        matches!(self, MediaError::Encoding { .. } | MediaError::FfmpegNotFound)
    }
}

impl From<image::ImageError> for MediaError {
    fn from(err: image::ImageError) -> Self {
        match err {
            image::ImageError::IoError(e) => MediaError::Io(e),
            image::ImageError::Encoding(e) => MediaError::ImageEncode(e.to_string()),
            other => MediaError::Decode(other.to_string()),
        }
    }
}
