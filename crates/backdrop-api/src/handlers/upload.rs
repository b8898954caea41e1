//! Multipart upload extraction.

use axum::extract::multipart::{MultipartError, MultipartRejection};
use axum::extract::Multipart;
use axum::http::StatusCode;
use tracing::{debug, warn};

use crate::error::{ApiError, ApiResult};

/// Form field carrying the image.
pub const UPLOAD_FIELD: &str = "file";

/// Read the `file` field from a multipart body.
///
/// A body that is not multipart, a malformed body, and a missing or empty
/// `file` field are all reported as "No file was provided". A body cut off
/// by the size limit is reported as too large.
pub async fn read_upload(multipart: Result<Multipart, MultipartRejection>) -> ApiResult<Vec<u8>> {
    let mut multipart = multipart.map_err(|e| {
        debug!(error = %e, "Request is not a multipart upload");
        ApiError::no_file()
    })?;

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => return Err(ApiError::no_file()),
            Err(e) => return Err(stream_error(e)),
        };

        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }

        let file_name = field.file_name().map(str::to_string);
        let bytes = field.bytes().await.map_err(stream_error)?;

        if bytes.is_empty() {
            return Err(ApiError::no_file());
        }

        debug!(file_name = ?file_name, size = bytes.len(), "Received upload");
        return Ok(bytes.to_vec());
    }
}

fn stream_error(err: MultipartError) -> ApiError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        warn!(error = %err, "Upload exceeds body limit");
        return ApiError::PayloadTooLarge;
    }
    warn!(error = %err, "Malformed multipart body");
    ApiError::no_file()
}
