//! Health check handlers.

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use backdrop_media::check_ffmpeg;
use chrono::Utc;
use serde::Serialize;

use crate::state::AppState;

/// Health response.
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub timestamp: String,
}

/// Health check endpoint (liveness probe).
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: Utc::now().to_rfc3339(),
    })
}

/// Readiness check response.
#[derive(Serialize)]
pub struct ReadinessResponse {
    pub status: String,
    pub checks: ReadinessChecks,
}

#[derive(Serialize)]
pub struct ReadinessChecks {
    pub ffmpeg: CheckStatus,
    pub background: CheckStatus,
    pub style_transfer: CheckStatus,
}

#[derive(Serialize)]
pub struct CheckStatus {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl CheckStatus {
    fn ok() -> Self {
        Self {
            status: "ok".to_string(),
            error: None,
        }
    }

    fn error(msg: impl Into<String>) -> Self {
        Self {
            status: "error".to_string(),
            error: Some(msg.into()),
        }
    }

    fn is_ok(&self) -> bool {
        self.status == "ok"
    }
}

/// Readiness check endpoint (readiness probe).
/// Checks for ffmpeg, the background asset and generative credentials.
pub async fn ready(
    State(state): State<AppState>,
) -> Result<Json<ReadinessResponse>, (StatusCode, Json<ReadinessResponse>)> {
    let ffmpeg_check = match check_ffmpeg() {
        Ok(_) => CheckStatus::ok(),
        Err(e) => CheckStatus::error(e.to_string()),
    };

    let background = state.pipeline.background();
    let background_check = if background.is_available() {
        CheckStatus::ok()
    } else {
        CheckStatus::error(format!(
            "Background image not found at expected path: {}",
            background.path().display()
        ))
    };

    let style_check = if state.stylist.is_configured() {
        CheckStatus::ok()
    } else {
        CheckStatus::error("GOOGLE_API_KEY is not set")
    };

    let all_ok = ffmpeg_check.is_ok() && background_check.is_ok() && style_check.is_ok();

    let response = ReadinessResponse {
        status: if all_ok { "ready" } else { "degraded" }.to_string(),
        checks: ReadinessChecks {
            ffmpeg: ffmpeg_check,
            background: background_check,
            style_transfer: style_check,
        },
    };

    if all_ok {
        Ok(Json(response))
    } else {
        Err((StatusCode::SERVICE_UNAVAILABLE, Json(response)))
    }
}
