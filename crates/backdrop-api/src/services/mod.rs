//! Business logic services.

pub mod pipeline;

pub use pipeline::{ComposedFrames, PipelineService, STYLE_FAILED_MESSAGE};
