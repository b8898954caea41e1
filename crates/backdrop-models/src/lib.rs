//! Shared data models for the Backdrop media service.
//!
//! This crate provides Serde-serializable types for:
//! - Transition video configuration
//! - Media payloads and their data-URL encoding
//! - The JSON response returned by the transition endpoints

pub mod payload;
pub mod transition;

// Re-export common types
pub use payload::{CompositeResult, MediaPayload, TransitionResponse, MIME_JPEG, MIME_MP4, MIME_PNG};
pub use transition::{vertical_wipe_offset, TransitionSpec};
