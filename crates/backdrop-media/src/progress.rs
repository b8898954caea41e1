//! FFmpeg progress parsing.

/// Progress information from FFmpeg's `-progress pipe:2` output.
#[derive(Debug, Clone, Default)]
pub struct FfmpegProgress {
    /// Frames written so far
    pub frame: u64,
    /// Current encoding FPS
    pub fps: f64,
    /// Output time in milliseconds
    pub out_time_ms: i64,
    /// Encoding speed (e.g., 1.5 = 1.5x realtime)
    pub speed: f64,
    /// Whether encoding is complete
    pub is_complete: bool,
}

impl FfmpegProgress {
    /// Fraction of `total_frames` written, in percent.
    pub fn percentage(&self, total_frames: u64) -> f64 {
        if total_frames == 0 {
            return 0.0;
        }
        ((self.frame as f64 / total_frames as f64) * 100.0).min(100.0)
    }
}

/// Fold one `key=value` line into `current`.
///
/// Returns a snapshot at the end of each block (`progress=continue|end`),
/// `None` otherwise.
pub fn parse_progress_line(line: &str, current: &mut FfmpegProgress) -> Option<FfmpegProgress> {
    let (key, value) = line.trim().split_once('=')?;

    match key {
        "out_time_us" | "out_time_ms" => {
            // Both keys carry microseconds in current FFmpeg builds
            if let Ok(us) = value.parse::<i64>() {
                current.out_time_ms = us / 1000;
            }
        }
        "frame" => {
            if let Ok(frame) = value.parse() {
                current.frame = frame;
            }
        }
        "fps" => {
            if let Ok(fps) = value.parse() {
                current.fps = fps;
            }
        }
        "speed" => {
            if let Some(speed) = value.strip_suffix('x').and_then(|s| s.trim().parse().ok()) {
                current.speed = speed;
            }
        }
        "progress" => {
            if value == "end" {
                current.is_complete = true;
            }
            return Some(current.clone());
        }
        _ => {}
    }

    None
}

/// Whether a stderr line belongs to the `-progress` key/value stream.
pub fn is_progress_line(line: &str) -> bool {
    matches!(
        line.trim().split_once('=').map(|(k, _)| k),
        Some(
            "frame"
                | "fps"
                | "bitrate"
                | "total_size"
                | "out_time_us"
                | "out_time_ms"
                | "out_time"
                | "dup_frames"
                | "drop_frames"
                | "speed"
                | "progress"
        )
    ) || line.trim_start().starts_with("stream_")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_parsing() {
        let mut progress = FfmpegProgress::default();

        assert!(parse_progress_line("frame=96", &mut progress).is_none());
        assert_eq!(progress.frame, 96);

        parse_progress_line("out_time_us=4000000", &mut progress);
        assert_eq!(progress.out_time_ms, 4000);

        parse_progress_line("speed=1.5x", &mut progress);
        assert!((progress.speed - 1.5).abs() < 0.01);

        parse_progress_line("speed=N/A", &mut progress);
        assert!((progress.speed - 1.5).abs() < 0.01);

        let snapshot = parse_progress_line("progress=continue", &mut progress).unwrap();
        assert!(!snapshot.is_complete);

        let snapshot = parse_progress_line("progress=end", &mut progress).unwrap();
        assert!(snapshot.is_complete);
    }

    #[test]
    fn test_progress_percentage() {
        let progress = FfmpegProgress {
            frame: 96,
            ..Default::default()
        };
        assert!((progress.percentage(192) - 50.0).abs() < 0.01);
        assert_eq!(progress.percentage(0), 0.0);
        assert!((progress.percentage(10) - 100.0).abs() < 0.01);
    }

    #[test]
    fn test_progress_line_detection() {
        assert!(is_progress_line("frame=12"));
        assert!(is_progress_line("stream_0_0_q=28.0"));
        assert!(!is_progress_line("[libx264 @ 0x55] height not divisible by 2"));
        assert!(!is_progress_line("Conversion failed!"));
    }
}
