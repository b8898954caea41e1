//! Branding logo overlay for generated images.
//!
//! Two logos are pasted onto the styled image: one in the bottom-left
//! corner and one in the top-right corner. The overlay is best-effort:
//! when an asset is missing or the image can't be processed, the input
//! bytes are handed back untouched.
//!
//! # Architecture
//!
//! - `LogoConfig`: Builder pattern for asset paths and placement
//! - `LogoOverlay`: Byte-level API with the passthrough policy
//! - `overlay_logos`: Pure raster function used by the overlay

use std::path::{Path, PathBuf};

use image::imageops::{self, FilterType};
use image::{DynamicImage, GenericImageView, RgbaImage};
use tracing::{debug, warn};

use crate::error::MediaResult;
use crate::raster::{decode_image, encode_png, load_asset};

// =============================================================================
// Constants
// =============================================================================

/// Default bottom-left logo path.
pub const DEFAULT_BOTTOM_LEFT_LOGO: &str = "media/images/lgo2titan.png";

/// Default top-right logo path.
pub const DEFAULT_TOP_RIGHT_LOGO: &str = "media/images/lgo1titan.png";

/// Largest logo edge in pixels.
pub const MAX_LOGO_EDGE: u32 = 330;

/// Logo edge as a fraction of the base image width.
pub const LOGO_WIDTH_RATIO: f64 = 0.5;

/// Distance from the corners in pixels.
pub const LOGO_MARGIN: u32 = 20;

// =============================================================================
// Configuration (Builder Pattern)
// =============================================================================

/// Configuration for the logo overlay.
///
/// ```ignore
/// let config = LogoConfig::default()
///     .with_bottom_left("assets/a.png")
///     .with_margin(30);
/// ```
#[derive(Debug, Clone)]
pub struct LogoConfig {
    /// Logo pasted in the bottom-left corner
    pub bottom_left: PathBuf,
    /// Logo pasted in the top-right corner
    pub top_right: PathBuf,
    /// Offset from the corners (pixels)
    pub margin: u32,
    /// Upper bound for the logo edge (pixels)
    pub max_edge: u32,
    /// Logo edge relative to the base width
    pub width_ratio: f64,
}

impl Default for LogoConfig {
    fn default() -> Self {
        Self {
            bottom_left: PathBuf::from(DEFAULT_BOTTOM_LEFT_LOGO),
            top_right: PathBuf::from(DEFAULT_TOP_RIGHT_LOGO),
            margin: LOGO_MARGIN,
            max_edge: MAX_LOGO_EDGE,
            width_ratio: LOGO_WIDTH_RATIO,
        }
    }
}

impl LogoConfig {
    pub fn with_bottom_left(mut self, path: impl Into<PathBuf>) -> Self {
        self.bottom_left = path.into();
        self
    }

    pub fn with_top_right(mut self, path: impl Into<PathBuf>) -> Self {
        self.top_right = path.into();
        self
    }

    pub fn with_margin(mut self, margin: u32) -> Self {
        self.margin = margin;
        self
    }

    /// Check that both logo files exist.
    pub fn is_available(&self) -> bool {
        self.bottom_left.exists() && self.top_right.exists()
    }

    /// Edge length of the bounding box each logo is fitted into.
    pub fn logo_edge(&self, base_width: u32) -> u32 {
        let scaled = (f64::from(base_width) * self.width_ratio) as u32;
        scaled.min(self.max_edge)
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Shrink `logo` to fit in an `edge`×`edge` box, keeping its aspect ratio.
///
/// Logos already inside the box are returned as-is; they are never upscaled.
fn fit_within(logo: &DynamicImage, edge: u32) -> DynamicImage {
    let (width, height) = logo.dimensions();
    if width <= edge && height <= edge {
        return logo.clone();
    }

    let scale = (f64::from(edge) / f64::from(width)).min(f64::from(edge) / f64::from(height));
    let new_width = ((f64::from(width) * scale).round() as u32).max(1);
    let new_height = ((f64::from(height) * scale).round() as u32).max(1);
    logo.resize_exact(new_width, new_height, FilterType::Lanczos3)
}

/// Paste both logos onto a copy of `base`.
pub fn overlay_logos(
    base: &DynamicImage,
    bottom_left: &DynamicImage,
    top_right: &DynamicImage,
    config: &LogoConfig,
) -> RgbaImage {
    let (width, height) = base.dimensions();
    let mut canvas = base.to_rgba8();

    let edge = config.logo_edge(width);
    if edge == 0 || height == 0 {
        return canvas;
    }

    let bottom_left = fit_within(bottom_left, edge).to_rgba8();
    let top_right = fit_within(top_right, edge).to_rgba8();
    let margin = i64::from(config.margin);

    let bl_y = i64::from(height) - i64::from(bottom_left.height()) - margin;
    let tr_x = i64::from(width) - i64::from(top_right.width()) - margin;

    imageops::overlay(&mut canvas, &bottom_left, margin, bl_y);
    imageops::overlay(&mut canvas, &top_right, tr_x, margin);
    canvas
}

// =============================================================================
// Overlay
// =============================================================================

/// Applies the configured logos to encoded images.
#[derive(Debug, Clone, Default)]
pub struct LogoOverlay {
    config: LogoConfig,
}

impl LogoOverlay {
    pub fn new(config: LogoConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &LogoConfig {
        &self.config
    }

    /// Overlay logos and return PNG bytes, or the input unchanged.
    ///
    /// # Returns
    /// - PNG bytes with both logos applied
    /// - `image_bytes` verbatim if a logo is missing or anything fails
    pub fn apply(&self, image_bytes: &[u8]) -> Vec<u8> {
        if !self.config.is_available() {
            warn!(
                bottom_left = %self.config.bottom_left.display(),
                top_right = %self.config.top_right.display(),
                "Skipping logos: asset not found"
            );
            return image_bytes.to_vec();
        }

        match self.try_apply(image_bytes) {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(error = %e, "Logo overlay failed, returning image without logos");
                image_bytes.to_vec()
            }
        }
    }

    fn try_apply(&self, image_bytes: &[u8]) -> MediaResult<Vec<u8>> {
        let base = decode_image(image_bytes)?;
        let bottom_left = load_logo(&self.config.bottom_left)?;
        let top_right = load_logo(&self.config.top_right)?;

        let composed = overlay_logos(&base, &bottom_left, &top_right, &self.config);
        debug!(
            width = composed.width(),
            height = composed.height(),
            "Logos applied"
        );
        encode_png(&DynamicImage::ImageRgba8(composed))
    }
}

fn load_logo(path: &Path) -> MediaResult<DynamicImage> {
    Ok(DynamicImage::ImageRgba8(load_asset(path)?.to_rgba8()))
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raster::test_support::solid;
    use image::Rgba;

    #[test]
    fn test_logo_edge_is_capped() {
        let config = LogoConfig::default();
        assert_eq!(config.logo_edge(200), 100);
        assert_eq!(config.logo_edge(661), 330);
        assert_eq!(config.logo_edge(4000), 330);
        assert_eq!(config.logo_edge(1), 0);
    }

    #[test]
    fn test_fit_within_never_upscales() {
        let small = solid(10, 5, [0, 0, 0, 255]);
        assert_eq!(fit_within(&small, 100).dimensions(), (10, 5));

        let wide = solid(400, 100, [0, 0, 0, 255]);
        assert_eq!(fit_within(&wide, 200).dimensions(), (200, 50));
    }

    #[test]
    fn test_logo_positions() {
        let base = solid(200, 100, [0, 0, 0, 255]);
        let red = solid(10, 10, [255, 0, 0, 255]);
        let blue = solid(10, 10, [0, 0, 255, 255]);
        let config = LogoConfig::default();

        let out = overlay_logos(&base, &red, &blue, &config);
        assert_eq!(out.dimensions(), (200, 100));
        // Bottom-left logo spans x 20..30, y 70..80
        assert_eq!(out.get_pixel(20, 70), &Rgba([255, 0, 0, 255]));
        assert_eq!(out.get_pixel(29, 79), &Rgba([255, 0, 0, 255]));
        assert_eq!(out.get_pixel(30, 80), &Rgba([0, 0, 0, 255]));
        // Top-right logo spans x 170..180, y 20..30
        assert_eq!(out.get_pixel(170, 20), &Rgba([0, 0, 255, 255]));
        assert_eq!(out.get_pixel(181, 20), &Rgba([0, 0, 0, 255]));
    }

    #[test]
    fn test_tiny_and_huge_bases_do_not_panic() {
        let logo = solid(600, 300, [255, 255, 255, 255]);
        let config = LogoConfig::default();

        let tiny = solid(1, 1, [0, 0, 0, 255]);
        assert_eq!(overlay_logos(&tiny, &logo, &logo, &config).dimensions(), (1, 1));

        let short = solid(300, 8, [0, 0, 0, 255]);
        assert_eq!(overlay_logos(&short, &logo, &logo, &config).dimensions(), (300, 8));

        let huge = solid(2400, 1600, [0, 0, 0, 255]);
        assert_eq!(overlay_logos(&huge, &logo, &logo, &config).dimensions(), (2400, 1600));
    }

    #[test]
    fn test_missing_logos_pass_bytes_through() {
        let overlay = LogoOverlay::new(
            LogoConfig::default()
                .with_bottom_left("/nonexistent/a.png")
                .with_top_right("/nonexistent/b.png"),
        );
        let input = encode_png(&solid(50, 50, [1, 2, 3, 255])).unwrap();
        assert_eq!(overlay.apply(&input), input);
        assert_eq!(overlay.apply(b"not an image"), b"not an image".to_vec());
    }

    #[test]
    fn test_apply_with_assets_on_disk() {
        let dir = tempfile::TempDir::new().unwrap();
        let a = dir.path().join("a.png");
        let b = dir.path().join("b.png");
        std::fs::write(&a, encode_png(&solid(20, 20, [255, 0, 0, 255])).unwrap()).unwrap();
        std::fs::write(&b, encode_png(&solid(20, 20, [0, 0, 255, 255])).unwrap()).unwrap();

        let overlay = LogoOverlay::new(LogoConfig::default().with_bottom_left(&a).with_top_right(&b));
        let input = encode_png(&solid(100, 100, [0, 0, 0, 255])).unwrap();
        let output = overlay.apply(&input);

        let decoded = decode_image(&output).unwrap().to_rgba8();
        assert_eq!(decoded.dimensions(), (100, 100));
        assert_eq!(decoded.get_pixel(25, 65), &Rgba([255, 0, 0, 255]));
        assert_eq!(decoded.get_pixel(65, 25), &Rgba([0, 0, 255, 255]));
    }

    #[test]
    fn test_undecodable_image_is_returned_unchanged() {
        let dir = tempfile::TempDir::new().unwrap();
        let a = dir.path().join("a.png");
        std::fs::write(&a, encode_png(&solid(4, 4, [255, 0, 0, 255])).unwrap()).unwrap();

        let overlay = LogoOverlay::new(LogoConfig::default().with_bottom_left(&a).with_top_right(&a));
        assert_eq!(overlay.apply(b"garbage"), b"garbage".to_vec());
    }
}
