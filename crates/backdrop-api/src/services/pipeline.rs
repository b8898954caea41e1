//! Request pipelines behind the transition endpoints.
//!
//! Each pipeline runs sequentially: adapter call, raster work on the
//! blocking pool, then the transition encode into the output directory.

use std::future::Future;
use std::time::Instant;

use backdrop_media::{
    composite_on_background, decode_image, encode_png, image_mime, BackgroundAsset, LogoOverlay,
    OutputDir, TransitionEncoder, JURASSIC_TRANSITION_PREFIX, TRANSITION_PREFIX,
};
use backdrop_models::{CompositeResult, MediaPayload, TransitionSpec};
use backdrop_ml_client::{BackgroundRemover, StyleTransfer, JURASSIC_EXPLORER_PROMPT};
use image::{DynamicImage, GenericImageView};
use tracing::{debug, info};

use crate::config::ApiConfig;
use crate::error::{ApiError, ApiResult};
use crate::metrics;

/// Message returned when the generative model produced nothing.
pub const STYLE_FAILED_MESSAGE: &str = "Could not generate the Jurassic explorer image";

/// The two stills of a transition.
#[derive(Debug)]
pub struct ComposedFrames {
    /// Decoded upload, the first frame
    pub original: DynamicImage,
    /// Decoded result, the second frame
    pub processed: DynamicImage,
    /// Encoded result returned to the client
    pub processed_png: Vec<u8>,
}

/// Image and video work shared by all endpoints.
#[derive(Debug, Clone)]
pub struct PipelineService {
    background: BackgroundAsset,
    logos: LogoOverlay,
    encoder: TransitionEncoder,
    output: OutputDir,
}

impl PipelineService {
    pub fn new(config: &ApiConfig) -> Self {
        Self {
            background: BackgroundAsset::new(&config.background_path),
            logos: LogoOverlay::new(config.logo_config()),
            encoder: TransitionEncoder::new(TransitionSpec::default()),
            output: OutputDir::new(&config.output_dir),
        }
    }

    pub fn background(&self) -> &BackgroundAsset {
        &self.background
    }

    pub fn output(&self) -> &OutputDir {
        &self.output
    }

    /// Cutout only.
    pub async fn remove_background(
        &self,
        remover: &dyn BackgroundRemover,
        upload: Vec<u8>,
    ) -> ApiResult<Vec<u8>> {
        let cutout = timed("remove_background", remover.remove_background(upload)).await?;
        Ok(cutout)
    }

    /// Cutout, composite on the fixed background, wipe from the original
    /// to the composite.
    pub async fn background_swap(
        &self,
        remover: &dyn BackgroundRemover,
        upload: Vec<u8>,
    ) -> ApiResult<CompositeResult> {
        let cutout = timed("remove_background", remover.remove_background(upload.clone())).await?;

        let frames = timed("composite", self.compose_background_swap(upload, cutout.clone())).await?;

        let video = self
            .render_transition(TRANSITION_PREFIX, frames.original, frames.processed)
            .await?;

        info!(
            cutout_bytes = cutout.len(),
            composite_bytes = frames.processed_png.len(),
            video_bytes = video.len(),
            "Background swap complete"
        );

        Ok(swap_result(cutout, frames.processed_png, video))
    }

    /// Restyle with the generative model, brand with logos, wipe from the
    /// original to the styled image.
    pub async fn jurassic_explorer(
        &self,
        stylist: &dyn StyleTransfer,
        upload: Vec<u8>,
    ) -> ApiResult<CompositeResult> {
        let styled = timed("style_transfer", async {
            stylist
                .style_transfer(upload.clone(), JURASSIC_EXPLORER_PROMPT)
                .await
                .ok_or_else(|| ApiError::upstream(STYLE_FAILED_MESSAGE))
        })
        .await?;

        let frames = timed("logos", self.brand_styled(upload.clone(), styled)).await?;

        let video = self
            .render_transition(JURASSIC_TRANSITION_PREFIX, frames.original, frames.processed)
            .await?;

        info!(
            styled_bytes = frames.processed_png.len(),
            video_bytes = video.len(),
            "Jurassic explorer complete"
        );

        Ok(styled_result(upload, frames.processed_png, video))
    }

    /// Paste the cutout on the background at the upload's size.
    pub async fn compose_background_swap(
        &self,
        upload: Vec<u8>,
        cutout: Vec<u8>,
    ) -> ApiResult<ComposedFrames> {
        let background = self.background.clone();
        tokio::task::spawn_blocking(move || -> ApiResult<_> {
            let original = decode_image(&upload)?;
            let subject = decode_image(&cutout)?;
            let background = background.load()?;

            let processed = DynamicImage::ImageRgba8(composite_on_background(
                &subject,
                &background,
                original.dimensions(),
            ));
            let processed_png = encode_png(&processed)?;
            Ok(ComposedFrames {
                original,
                processed,
                processed_png,
            })
        })
        .await?
    }

    /// Overlay logos on the styled image.
    pub async fn brand_styled(&self, upload: Vec<u8>, styled: Vec<u8>) -> ApiResult<ComposedFrames> {
        let logos = self.logos.clone();
        tokio::task::spawn_blocking(move || -> ApiResult<_> {
            let processed_png = logos.apply(&styled);
            let original = decode_image(&upload)?;
            let processed = decode_image(&processed_png)?;
            Ok(ComposedFrames {
                original,
                processed,
                processed_png,
            })
        })
        .await?
    }

    async fn render_transition(
        &self,
        prefix: &str,
        frame_a: DynamicImage,
        frame_b: DynamicImage,
    ) -> ApiResult<Vec<u8>> {
        let path = self.output.video_path(prefix).await?;
        debug!(path = %path.display(), "Rendering transition");
        let bytes = timed("encode_video", async {
            self.encoder.render(frame_a, frame_b, &path).await.map_err(ApiError::from)
        })
        .await?;
        Ok(bytes)
    }
}

fn swap_result(cutout: Vec<u8>, composed: Vec<u8>, video: Vec<u8>) -> CompositeResult {
    CompositeResult {
        processed: MediaPayload::png(cutout),
        composited: MediaPayload::png(composed),
        video: MediaPayload::mp4(video),
    }
}

/// The upload keeps its own MIME type; the branded image is PNG.
fn styled_result(upload: Vec<u8>, branded: Vec<u8>, video: Vec<u8>) -> CompositeResult {
    let upload_mime = image_mime(&upload);
    CompositeResult {
        processed: MediaPayload::new(upload, upload_mime),
        composited: MediaPayload::png(branded),
        video: MediaPayload::mp4(video),
    }
}

/// Await `stage` and record its duration.
async fn timed<T, E, F>(stage: &'static str, future: F) -> Result<T, E>
where
    F: Future<Output = Result<T, E>>,
{
    let start = Instant::now();
    let result = future.await;
    let elapsed = start.elapsed().as_secs_f64();
    metrics::record_stage_duration(stage, elapsed);
    debug!(stage, elapsed_secs = elapsed, ok = result.is_ok(), "Pipeline stage finished");
    result
}
