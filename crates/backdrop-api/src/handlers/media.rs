//! Image and transition endpoints.

use axum::extract::multipart::MultipartRejection;
use axum::extract::{Multipart, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::Json;
use backdrop_models::payload::MIME_PNG;
use backdrop_models::TransitionResponse;
use tracing::info;

use crate::error::ApiResult;
use crate::handlers::upload::read_upload;
use crate::metrics;
use crate::state::AppState;

/// Disposition sent with the raw cutout.
pub const CUTOUT_DISPOSITION: &str = "attachment; filename=\"no-bg.png\"";

/// Tag a pipeline result with its outcome metric.
fn record_outcome<T>(pipeline: &'static str, result: ApiResult<T>) -> ApiResult<T> {
    let outcome = if result.is_ok() { "success" } else { "failure" };
    metrics::record_pipeline_run(pipeline, outcome);
    result
}

/// POST /api/remove-background/
///
/// Returns the cutout as a PNG attachment.
pub async fn remove_background(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> ApiResult<Response> {
    let upload = read_upload(multipart).await?;
    info!(size = upload.len(), "Removing background");

    let cutout = record_outcome(
        "remove_background",
        state
            .pipeline
            .remove_background(state.remover.as_ref(), upload)
            .await,
    )?;

    Ok((
        [
            (header::CONTENT_TYPE, MIME_PNG),
            (header::CONTENT_DISPOSITION, CUTOUT_DISPOSITION),
        ],
        cutout,
    )
        .into_response())
}

/// POST /api/remove-background2/
///
/// Cutout, composite on the fixed background and a wipe video between the
/// upload and the composite.
pub async fn remove_background2(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> ApiResult<Json<TransitionResponse>> {
    let upload = read_upload(multipart).await?;
    info!(size = upload.len(), "Starting background swap");

    let result = record_outcome(
        "background_swap",
        state
            .pipeline
            .background_swap(state.remover.as_ref(), upload)
            .await,
    )?;

    Ok(Json(result.into()))
}

/// POST /api/jurassic-explorer/
pub async fn jurassic_explorer(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> ApiResult<Json<TransitionResponse>> {
    let upload = read_upload(multipart).await?;
    info!(size = upload.len(), "Starting Jurassic explorer");

    let result = record_outcome(
        "jurassic_explorer",
        state
            .pipeline
            .jurassic_explorer(state.stylist.as_ref(), upload)
            .await,
    )?;

    Ok(Json(result.into()))
}
