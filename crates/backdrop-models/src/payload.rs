//! Response payloads and data-URL encoding.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

pub const MIME_PNG: &str = "image/png";
pub const MIME_JPEG: &str = "image/jpeg";
pub const MIME_MP4: &str = "video/mp4";

/// A binary artifact together with its MIME type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaPayload {
    pub bytes: Vec<u8>,
    pub mime_type: String,
}

impl MediaPayload {
    pub fn new(bytes: Vec<u8>, mime_type: impl Into<String>) -> Self {
        Self {
            bytes,
            mime_type: mime_type.into(),
        }
    }

    pub fn png(bytes: Vec<u8>) -> Self {
        Self::new(bytes, MIME_PNG)
    }

    pub fn mp4(bytes: Vec<u8>) -> Self {
        Self::new(bytes, MIME_MP4)
    }

    /// Render as `data:<mime>;base64,<payload>`.
    pub fn to_data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, STANDARD.encode(&self.bytes))
    }
}

/// Everything one transition request produces.
#[derive(Debug, Clone)]
pub struct CompositeResult {
    /// Output of the adapter (cutout), or the original upload for style transfer
    pub processed: MediaPayload,
    /// The subject on its new background, or the styled image
    pub composited: MediaPayload,
    /// The encoded transition video
    pub video: MediaPayload,
}

/// JSON body returned by the transition endpoints.
///
/// Field names are part of the public contract consumed by the frontend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct TransitionResponse {
    pub image_no_bg: String,
    pub image_with_new_bg: String,
    pub transition_video: String,
}

impl From<&CompositeResult> for TransitionResponse {
    fn from(result: &CompositeResult) -> Self {
        Self {
            image_no_bg: result.processed.to_data_url(),
            image_with_new_bg: result.composited.to_data_url(),
            transition_video: result.video.to_data_url(),
        }
    }
}

impl From<CompositeResult> for TransitionResponse {
    fn from(result: CompositeResult) -> Self {
        Self::from(&result)
    }
}
