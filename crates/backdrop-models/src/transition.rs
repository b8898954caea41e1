//! Transition video configuration.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Default video codec (H.264)
pub const DEFAULT_VIDEO_CODEC: &str = "libx264";
/// Pixel format handed to the encoder
pub const DEFAULT_PIXEL_FORMAT: &str = "yuv420p";
/// Output frame rate
pub const DEFAULT_FPS: u32 = 24;
/// Seconds the incoming frame takes to slide into place
pub const DEFAULT_WIPE_DURATION: f64 = 5.0;
/// Seconds the incoming frame stays on screen (including the wipe)
pub const DEFAULT_HOLD_DURATION: f64 = 8.0;
/// Container extension for rendered videos
pub const VIDEO_EXTENSION: &str = "mp4";

/// Immutable configuration of the vertical-wipe transition.
///
/// Frame A is shown statically for `wipe_duration`. Frame B sits above it
/// for `hold_duration`, starting one frame-height above the canvas and
/// sliding down linearly until it reaches the origin at `wipe_duration`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct TransitionSpec {
    /// Duration of the wipe in seconds (also frame A's lifetime)
    #[serde(default = "default_wipe_duration")]
    pub wipe_duration: f64,

    /// Duration of frame B in seconds
    #[serde(default = "default_hold_duration")]
    pub hold_duration: f64,

    /// Frames per second
    #[serde(default = "default_fps")]
    pub fps: u32,

    /// Video codec (e.g., "libx264")
    #[serde(default = "default_video_codec")]
    pub codec: String,

    /// Output pixel format
    #[serde(default = "default_pixel_format")]
    pub pixel_format: String,

    /// Whether an audio track is muxed (always false)
    #[serde(default)]
    pub audio: bool,
}

fn default_wipe_duration() -> f64 {
    DEFAULT_WIPE_DURATION
}
fn default_hold_duration() -> f64 {
    DEFAULT_HOLD_DURATION
}
fn default_fps() -> u32 {
    DEFAULT_FPS
}
fn default_video_codec() -> String {
    DEFAULT_VIDEO_CODEC.to_string()
}
fn default_pixel_format() -> String {
    DEFAULT_PIXEL_FORMAT.to_string()
}

impl Default for TransitionSpec {
    fn default() -> Self {
        Self {
            wipe_duration: DEFAULT_WIPE_DURATION,
            hold_duration: DEFAULT_HOLD_DURATION,
            fps: DEFAULT_FPS,
            codec: DEFAULT_VIDEO_CODEC.to_string(),
            pixel_format: DEFAULT_PIXEL_FORMAT.to_string(),
            audio: false,
        }
    }
}

impl TransitionSpec {
    /// Create the standard transition configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Total length of the stacked timeline.
    ///
    /// Frame A ends after the wipe, frame B after its hold, so the
    /// composite lasts as long as the longer of the two.
    pub fn total_duration(&self) -> f64 {
        self.wipe_duration.max(self.hold_duration)
    }

    /// Number of frames the encoder receives.
    pub fn frame_count(&self) -> u64 {
        (self.total_duration() * f64::from(self.fps)).round() as u64
    }

    /// Timestamp (seconds) of the frame at `index`.
    pub fn frame_time(&self, index: u64) -> f64 {
        index as f64 / f64::from(self.fps)
    }

    /// Vertical offset of frame B at time `t` for a canvas `height` pixels tall.
    ///
    /// `-height` at `t = 0`, rising linearly to `0` at `wipe_duration`,
    /// then pinned at `0`.
    pub fn wipe_offset(&self, t: f64, height: u32) -> f64 {
        vertical_wipe_offset(t, self.wipe_duration, height)
    }
}

/// Vertical wipe position: `-height + height * t / wipe_duration` while the
/// wipe runs, `0` afterwards.
pub fn vertical_wipe_offset(t: f64, wipe_duration: f64, height: u32) -> f64 {
    let h = f64::from(height);
    if wipe_duration <= 0.0 || t >= wipe_duration {
        return 0.0;
    }
    let t = t.max(0.0);
    -h + h * (t / wipe_duration)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_spec() {
        let spec = TransitionSpec::default();
        assert_eq!(spec.codec, "libx264");
        assert_eq!(spec.fps, 24);
        assert!(!spec.audio);
        assert!((spec.total_duration() - 8.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_frame_count_matches_duration_times_fps() {
        let spec = TransitionSpec::default();
        assert_eq!(spec.frame_count(), 192);
        assert!((spec.frame_time(24) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_wipe_offset_endpoints() {
        let spec = TransitionSpec::default();
        assert_eq!(spec.wipe_offset(0.0, 480), -480.0);
        assert_eq!(spec.wipe_offset(5.0, 480), 0.0);
        assert_eq!(spec.wipe_offset(7.5, 480), 0.0);
        assert!((spec.wipe_offset(2.5, 480) + 240.0).abs() < 1e-9);
    }

    #[test]
    fn test_wipe_offset_is_monotonic() {
        let spec = TransitionSpec::default();
        let mut previous = f64::INFINITY;
        for index in 0..spec.frame_count() {
            let magnitude = spec.wipe_offset(spec.frame_time(index), 1000).abs();
            assert!(magnitude <= previous);
            previous = magnitude;
        }
        assert_eq!(previous, 0.0);
    }

    #[test]
    fn test_zero_length_wipe_is_in_place() {
        assert_eq!(vertical_wipe_offset(0.0, 0.0, 100), 0.0);
    }

    #[test]
    fn test_spec_deserializes_with_defaults() {
        let spec: TransitionSpec = serde_json::from_str(r#"{"fps": 30}"#).unwrap();
        assert_eq!(spec.fps, 30);
        assert_eq!(spec.codec, DEFAULT_VIDEO_CODEC);
        assert_eq!(spec.frame_count(), 240);
    }
}
