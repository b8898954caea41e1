#![deny(unreachable_patterns)]
//! Image compositing and FFmpeg transition encoding.
//!
//! This crate provides:
//! - Decoding uploads and on-disk assets
//! - Background replacement and logo overlays
//! - A layered timeline rendering the vertical-wipe transition
//! - Raw-frame streaming into FFmpeg with progress parsing

pub mod command;
pub mod compositor;
pub mod encoder;
pub mod error;
pub mod logo;
pub mod output;
pub mod progress;
pub mod raster;
pub mod transition;

pub use command::{check_ffmpeg, even_crop_filter, transition_command, FfmpegCommand};
pub use compositor::{composite_on_background, BackgroundAsset};
pub use encoder::TransitionEncoder;
pub use error::{MediaError, MediaResult};
pub use logo::{overlay_logos, LogoConfig, LogoOverlay};
pub use output::{OutputDir, JURASSIC_TRANSITION_PREFIX, TRANSITION_PREFIX};
pub use progress::FfmpegProgress;
pub use raster::{decode_image, encode_png, image_mime, load_asset};
pub use transition::{Layer, Placement, TransitionTimeline};
