//! API error types.

use std::path::PathBuf;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use backdrop_media::MediaError;
use backdrop_ml_client::MlError;
use serde::Serialize;
use thiserror::Error;
use tracing::error;

pub type ApiResult<T> = Result<T, ApiError>;

/// Message returned when the multipart body has no usable `file` field.
pub const NO_FILE_MESSAGE: &str = "No file was provided";

/// Message returned when the upload exceeds the body limit.
pub const TOO_LARGE_MESSAGE: &str = "Uploaded file is too large";

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),

    #[error("{}", TOO_LARGE_MESSAGE)]
    PayloadTooLarge,

    #[error("Background image not found at expected path: {}", .0.display())]
    MissingAsset(PathBuf),

    #[error("{0}")]
    Upstream(String),

    #[error("Error processing image: {0}")]
    Encoding(String),

    #[error("Error processing image: {0}")]
    Internal(String),

    #[error("Error processing image: {0}")]
    Media(MediaError),

    #[error("Error processing image: {0}")]
    Ml(#[from] MlError),
}

impl ApiError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn no_file() -> Self {
        Self::Validation(NO_FILE_MESSAGE.to_string())
    }

    pub fn upstream(msg: impl Into<String>) -> Self {
        Self::Upstream(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::MissingAsset(_)
            | ApiError::Upstream(_)
            | ApiError::Encoding(_)
            | ApiError::Internal(_)
            | ApiError::Media(_)
            | ApiError::Ml(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<MediaError> for ApiError {
    fn from(err: MediaError) -> Self {
        match err {
            MediaError::MissingAsset(path) => ApiError::MissingAsset(path),
            err if err.is_encoding_error() => ApiError::Encoding(err.to_string()),
            err => ApiError::Media(err),
        }
    }
}

impl From<tokio::task::JoinError> for ApiError {
    fn from(err: tokio::task::JoinError) -> Self {
        ApiError::Internal(format!("worker task failed: {}", err))
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        if status.is_server_error() {
            error!(error = ?self, "Request failed");
        }

        let body = ErrorResponse {
            error: self.to_string(),
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(ApiError::no_file().status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(
            ApiError::upstream("nothing generated").status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            ApiError::PayloadTooLarge.status_code(),
            StatusCode::PAYLOAD_TOO_LARGE
        );
    }

    #[tokio::test]
    async fn test_output_dir_failure_is_encoding_error() {
        let dir = tempfile::TempDir::new().unwrap();
        let blocker = dir.path().join("videos");
        std::fs::write(&blocker, b"x").unwrap();

        let err = backdrop_media::OutputDir::new(blocker.join("nested"))
            .video_path(backdrop_media::TRANSITION_PREFIX)
            .await
            .unwrap_err();
        let api: ApiError = err.into();
        assert!(matches!(api, ApiError::Encoding(_)), "{api:?}");
        assert_eq!(api.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_media_errors_are_classified() {
        let missing: ApiError = MediaError::missing_asset("/srv/static/images/forest.jpg").into();
        assert!(matches!(missing, ApiError::MissingAsset(_)));
        assert!(missing.to_string().contains("/srv/static/images/forest.jpg"));

        let encoding: ApiError = MediaError::encoding("exit 1", None, Some(1)).into();
        assert!(matches!(encoding, ApiError::Encoding(_)));

        let decode: ApiError = MediaError::Decode("bad header".into()).into();
        assert!(matches!(decode, ApiError::Media(_)));
        assert!(decode.to_string().starts_with("Error processing image"));
    }
}
