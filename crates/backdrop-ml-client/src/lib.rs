//! Clients for the external image models.
//!
//! The pipeline only depends on two capabilities:
//! - [`BackgroundRemover`]: cutout of the subject, backed by a rembg server
//! - [`StyleTransfer`]: prompt-driven regeneration, backed by Gemini

pub mod error;
pub mod gemini;
pub mod rembg;
pub mod traits;

pub use error::{MlError, MlResult};
pub use gemini::{first_inline_image, GeminiConfig, GeminiImageClient, JURASSIC_EXPLORER_PROMPT};
pub use rembg::{RembgClient, RembgConfig};
pub use traits::{BackgroundRemover, StyleTransfer};
