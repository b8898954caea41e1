//! Background replacement.
//!
//! The background is always stretched to the subject's size so the
//! composite keeps the dimensions of the original upload.

use std::path::{Path, PathBuf};

use image::imageops::{self, FilterType};
use image::{DynamicImage, GenericImageView, RgbaImage};
use tracing::debug;

use crate::error::MediaResult;
use crate::raster::load_asset;

/// The fixed replacement background stored on disk.
#[derive(Debug, Clone)]
pub struct BackgroundAsset {
    path: PathBuf,
}

impl BackgroundAsset {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Check if the background image exists.
    pub fn is_available(&self) -> bool {
        self.path.exists()
    }

    /// Decode the background.
    ///
    /// # Errors
    /// [`MediaError::MissingAsset`](crate::MediaError::MissingAsset) when the
    /// file is absent. There is no default background to fall back to.
    pub fn load(&self) -> MediaResult<DynamicImage> {
        load_asset(&self.path)
    }
}

/// Paste `subject` over `background` resized to `target_size`.
///
/// The subject is placed at the origin and blended through its own alpha
/// channel, so fully transparent cutout pixels leave the background
/// visible.
pub fn composite_on_background(
    subject: &DynamicImage,
    background: &DynamicImage,
    target_size: (u32, u32),
) -> RgbaImage {
    let (width, height) = target_size;
    let (background_width, background_height) = background.dimensions();
    debug!(
        width,
        height,
        background_width,
        background_height,
        "Compositing subject on background"
    );

    let mut canvas = background
        .resize_exact(width, height, FilterType::CatmullRom)
        .to_rgba8();
    imageops::overlay(&mut canvas, &subject.to_rgba8(), 0, 0);
    canvas
}
