//! Capabilities the pipeline depends on.

use async_trait::async_trait;

use crate::error::MlResult;

/// Cuts the subject out of an image.
#[async_trait]
pub trait BackgroundRemover: Send + Sync {
    /// Return the cutout (PNG with alpha) for `image`.
    async fn remove_background(&self, image: Vec<u8>) -> MlResult<Vec<u8>>;
}

/// Regenerates an image following a text prompt.
#[async_trait]
pub trait StyleTransfer: Send + Sync {
    /// Return the generated image, or `None` when nothing was produced.
    ///
    /// Failures are not distinguished from an empty result.
    async fn style_transfer(&self, image: Vec<u8>, prompt: &str) -> Option<Vec<u8>>;

    /// Whether credentials are present.
    fn is_configured(&self) -> bool {
        true
    }
}
