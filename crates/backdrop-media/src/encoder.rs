//! Transition video encoder.
//!
//! Frames are rendered on a blocking thread and streamed to a spawned
//! `ffmpeg` over stdin as raw `rgb24`. FFmpeg's stderr is drained
//! concurrently: progress lines are logged, everything else is kept so a
//! failed encode can report what went wrong.

use std::collections::VecDeque;
use std::path::Path;
use std::process::Stdio;
use std::time::{Duration, Instant};

use backdrop_models::TransitionSpec;
use image::DynamicImage;
use metrics::{counter, histogram};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{ChildStdin, Command};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::command::{check_ffmpeg, transition_command};
use crate::error::{MediaError, MediaResult};
use crate::progress::{is_progress_line, parse_progress_line, FfmpegProgress};
use crate::transition::TransitionTimeline;

/// Frames buffered between the renderer and FFmpeg's stdin.
const FRAME_QUEUE_DEPTH: usize = 4;

/// Stderr lines kept for error reports.
const STDERR_TAIL_LINES: usize = 40;

/// Encodes vertical-wipe transitions to MP4.
#[derive(Debug, Clone, Default)]
pub struct TransitionEncoder {
    spec: TransitionSpec,
    timeout_secs: Option<u64>,
}

impl TransitionEncoder {
    pub fn new(spec: TransitionSpec) -> Self {
        Self {
            spec,
            timeout_secs: None,
        }
    }

    /// Kill FFmpeg if the encode runs longer than `secs`.
    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = Some(secs);
        self
    }

    pub fn spec(&self) -> &TransitionSpec {
        &self.spec
    }

    /// Render the wipe from `frame_a` to `frame_b` into `output` and return
    /// the encoded bytes. The file is left on disk.
    pub async fn render(
        &self,
        frame_a: DynamicImage,
        frame_b: DynamicImage,
        output: &Path,
    ) -> MediaResult<Vec<u8>> {
        let spec = self.spec.clone();
        let timeline = tokio::task::spawn_blocking(move || {
            TransitionTimeline::vertical_wipe(&frame_a, &frame_b, &spec)
        })
        .await
        .map_err(|e| MediaError::encoding(format!("timeline task failed: {e}"), None, None))?;

        self.encode(timeline, output).await?;
        tokio::fs::read(output).await.map_err(|e| {
            MediaError::encoding(
                format!("cannot read back {}: {e}", output.display()),
                None,
                None,
            )
        })
    }

    /// Stream every frame of `timeline` through FFmpeg into `output`.
    pub async fn encode(&self, timeline: TransitionTimeline, output: &Path) -> MediaResult<()> {
        let ffmpeg = check_ffmpeg()?;
        let started = Instant::now();

        let (width, height) = (timeline.width(), timeline.height());
        let frame_count = timeline.frame_count();
        if width == 0 || height == 0 {
            return Err(MediaError::encoding("cannot encode an empty frame", None, None));
        }

        let cmd = transition_command(&self.spec, width, height, output);
        let args = cmd.build_args();
        debug!("Running FFmpeg: {} {}", ffmpeg.display(), args.join(" "));

        let mut child = Command::new(&ffmpeg)
            .args(&args)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| MediaError::encoding(format!("failed to spawn FFmpeg: {e}"), None, None))?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| MediaError::encoding("ffmpeg stdin not captured", None, None))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| MediaError::encoding("ffmpeg stderr not captured", None, None))?;

        // Drain stderr: log progress, keep the tail of everything else
        let stderr_handle = tokio::spawn(async move {
            let mut reader = BufReader::new(stderr).lines();
            let mut current = FfmpegProgress::default();
            let mut tail = VecDeque::with_capacity(STDERR_TAIL_LINES);

            while let Ok(Some(line)) = reader.next_line().await {
                if is_progress_line(&line) {
                    if let Some(progress) = parse_progress_line(&line, &mut current) {
                        debug!(
                            frame = progress.frame,
                            total = frame_count,
                            percent = progress.percentage(frame_count),
                            speed = progress.speed,
                            "Encoding progress"
                        );
                    }
                    continue;
                }
                if tail.len() == STDERR_TAIL_LINES {
                    tail.pop_front();
                }
                tail.push_back(line);
            }

            tail.into_iter().collect::<Vec<_>>().join("\n")
        });

        let (tx, rx) = mpsc::channel::<Vec<u8>>(FRAME_QUEUE_DEPTH);
        let producer = tokio::task::spawn_blocking(move || {
            for index in 0..timeline.frame_count() {
                let mut frame = vec![0u8; timeline.frame_len()];
                timeline.render_frame_into(index, &mut frame);
                if tx.blocking_send(frame).is_err() {
                    // FFmpeg stopped reading
                    break;
                }
            }
        });

        let drive = async {
            let written = write_frames(stdin, rx).await;
            let status = child.wait().await;
            (written, status)
        };

        let (written, status) = match self.timeout_secs {
            Some(secs) => {
                let outcome = tokio::time::timeout(Duration::from_secs(secs), drive).await;
                match outcome {
                    Ok(result) => result,
                    Err(_) => {
                        warn!("FFmpeg timed out after {} seconds, killing process", secs);
                        let _ = child.kill().await;
                        record_encode("timeout", started);
                        return Err(MediaError::encoding(
                            format!("FFmpeg timed out after {secs} seconds"),
                            None,
                            None,
                        ));
                    }
                }
            }
            None => drive.await,
        };

        producer
            .await
            .map_err(|e| MediaError::encoding(format!("frame renderer failed: {e}"), None, None))?;
        let stderr_tail = stderr_handle.await.unwrap_or_default();
        let status = status.map_err(|e| {
            MediaError::encoding(
                format!("failed to wait for FFmpeg: {e}"),
                Some(stderr_tail.clone()),
                None,
            )
        })?;

        if !status.success() {
            record_encode("error", started);
            warn!(
                exit_code = ?status.code(),
                stderr = %stderr_tail,
                "FFmpeg exited with non-zero status"
            );
            return Err(MediaError::encoding(
                "FFmpeg exited with non-zero status",
                Some(stderr_tail),
                status.code(),
            ));
        }

        match written {
            Ok(frames) if frames == frame_count => {}
            Ok(frames) => {
                record_encode("error", started);
                return Err(MediaError::encoding(
                    format!("FFmpeg accepted {frames} of {frame_count} frames"),
                    Some(stderr_tail),
                    status.code(),
                ));
            }
            Err(e) => {
                record_encode("error", started);
                return Err(MediaError::encoding(
                    format!("writing frames to FFmpeg failed: {e}"),
                    Some(stderr_tail),
                    status.code(),
                ));
            }
        }

        record_encode("ok", started);
        info!(
            output = %output.display(),
            frames = frame_count,
            width,
            height,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Transition video encoded"
        );
        Ok(())
    }
}

/// Copy frames from the renderer to FFmpeg. Closing stdin ends the input.
async fn write_frames(mut stdin: ChildStdin, mut rx: mpsc::Receiver<Vec<u8>>) -> std::io::Result<u64> {
    let mut frames = 0u64;
    while let Some(frame) = rx.recv().await {
        stdin.write_all(&frame).await?;
        frames += 1;
    }
    stdin.shutdown().await?;
    Ok(frames)
}

fn record_encode(status: &'static str, started: Instant) {
    counter!("backdrop_videos_encoded_total", "status" => status).increment(1);
    histogram!("backdrop_video_encode_seconds", "status" => status)
        .record(started.elapsed().as_secs_f64());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raster::test_support::solid;

    #[tokio::test]
    async fn test_empty_frame_is_rejected() {
        let dir = tempfile::TempDir::new().unwrap();
        let timeline = TransitionTimeline::new(0, 0, 24);
        let err = TransitionEncoder::default()
            .encode(timeline, &dir.path().join("x.mp4"))
            .await
            .unwrap_err();
        assert!(err.is_encoding_error());
    }

    #[tokio::test]
    #[ignore = "requires ffmpeg"]
    async fn test_render_produces_mp4() {
        let dir = tempfile::TempDir::new().unwrap();
        let output = dir.path().join("wipe.mp4");
        let spec = TransitionSpec {
            wipe_duration: 0.5,
            hold_duration: 1.0,
            ..TransitionSpec::default()
        };

        let bytes = TransitionEncoder::new(spec)
            .render(
                solid(33, 21, [255, 0, 0, 255]),
                solid(64, 64, [0, 0, 255, 255]),
                &output,
            )
            .await
            .unwrap();

        assert!(output.exists());
        assert!(bytes.len() > 8);
        assert_eq!(&bytes[4..8], b"ftyp");
    }
}
