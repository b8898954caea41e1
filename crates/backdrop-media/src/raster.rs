//! Decoding uploaded bytes and on-disk assets into raster images.

use std::io::Cursor;
use std::path::Path;

use backdrop_models::{MIME_JPEG, MIME_PNG};
use image::{DynamicImage, ImageFormat, ImageOutputFormat};
use tracing::debug;

use crate::error::{MediaError, MediaResult};

/// Decode an uploaded image of any supported format.
pub fn decode_image(bytes: &[u8]) -> MediaResult<DynamicImage> {
    image::load_from_memory(bytes).map_err(|e| MediaError::Decode(e.to_string()))
}

/// Load a static asset from disk.
///
/// A missing file is reported as [`MediaError::MissingAsset`] so callers
/// can tell "not deployed" apart from "corrupt".
pub fn load_asset(path: &Path) -> MediaResult<DynamicImage> {
    if !path.exists() {
        return Err(MediaError::missing_asset(path));
    }

    debug!(path = %path.display(), "Loading image asset");
    image::open(path).map_err(|e| MediaError::Decode(format!("{}: {}", path.display(), e)))
}

/// Encode an image as PNG.
pub fn encode_png(image: &DynamicImage) -> MediaResult<Vec<u8>> {
    let mut buffer = Cursor::new(Vec::new());
    image.write_to(&mut buffer, ImageOutputFormat::Png)?;
    Ok(buffer.into_inner())
}

/// Best-effort MIME type of an encoded image, defaulting to JPEG.
pub fn image_mime(bytes: &[u8]) -> &'static str {
    match image::guess_format(bytes) {
        Ok(ImageFormat::Png) => MIME_PNG,
        Ok(ImageFormat::Jpeg) => MIME_JPEG,
        Ok(ImageFormat::WebP) => "image/webp",
        Ok(ImageFormat::Gif) => "image/gif",
        Ok(ImageFormat::Bmp) => "image/bmp",
        Ok(ImageFormat::Tiff) => "image/tiff",
        _ => MIME_JPEG,
    }
}
