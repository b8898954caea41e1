//! FFmpeg command builder.

use std::path::{Path, PathBuf};

use backdrop_models::TransitionSpec;

use crate::error::{MediaError, MediaResult};

/// Input name for frames streamed over stdin.
pub const STDIN_PIPE: &str = "pipe:0";

/// Builder for FFmpeg commands.
#[derive(Debug, Clone)]
pub struct FfmpegCommand {
    /// Input (file path or pipe)
    input: String,
    /// Output file path
    output: PathBuf,
    /// Input arguments (before -i)
    input_args: Vec<String>,
    /// Output arguments (after -i)
    output_args: Vec<String>,
    /// Whether to overwrite output
    overwrite: bool,
    /// Log level
    log_level: String,
}

impl FfmpegCommand {
    /// Create a new FFmpeg command.
    pub fn new(input: impl Into<String>, output: impl AsRef<Path>) -> Self {
        Self {
            input: input.into(),
            output: output.as_ref().to_path_buf(),
            input_args: Vec::new(),
            output_args: Vec::new(),
            overwrite: true,
            log_level: "error".to_string(),
        }
    }

    /// Command reading raw frames from stdin.
    pub fn from_stdin(output: impl AsRef<Path>) -> Self {
        Self::new(STDIN_PIPE, output)
    }

    /// Add input arguments (before -i).
    pub fn input_arg(mut self, arg: impl Into<String>) -> Self {
        self.input_args.push(arg.into());
        self
    }

    /// Add multiple input arguments.
    pub fn input_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.input_args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Add output arguments (after -i).
    pub fn output_arg(mut self, arg: impl Into<String>) -> Self {
        self.output_args.push(arg.into());
        self
    }

    /// Add multiple output arguments.
    pub fn output_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.output_args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Describe a raw video input stream.
    pub fn raw_video_input(self, pixel_format: &str, width: u32, height: u32, fps: u32) -> Self {
        self.input_args([
            "-f".to_string(),
            "rawvideo".to_string(),
            "-pix_fmt".to_string(),
            pixel_format.to_string(),
            "-s".to_string(),
            format!("{}x{}", width, height),
            "-r".to_string(),
            fps.to_string(),
        ])
    }

    /// Set video filter.
    pub fn video_filter(self, filter: impl Into<String>) -> Self {
        self.output_arg("-vf").output_arg(filter)
    }

    /// Set video codec.
    pub fn video_codec(self, codec: impl Into<String>) -> Self {
        self.output_arg("-c:v").output_arg(codec)
    }

    /// Set output pixel format.
    pub fn pixel_format(self, pix_fmt: impl Into<String>) -> Self {
        self.output_arg("-pix_fmt").output_arg(pix_fmt)
    }

    /// Set output frame rate.
    pub fn frame_rate(self, fps: u32) -> Self {
        self.output_arg("-r").output_arg(fps.to_string())
    }

    /// Drop audio.
    pub fn no_audio(self) -> Self {
        self.output_arg("-an")
    }

    /// Move the moov atom to the front of the file.
    pub fn faststart(self) -> Self {
        self.output_arg("-movflags").output_arg("+faststart")
    }

    /// Set log level.
    pub fn log_level(mut self, level: impl Into<String>) -> Self {
        self.log_level = level.into();
        self
    }

    pub fn output(&self) -> &Path {
        &self.output
    }

    /// Build the command arguments.
    pub fn build_args(&self) -> Vec<String> {
        let mut args = Vec::new();

        if self.overwrite {
            args.push("-y".to_string());
        }

        args.push("-v".to_string());
        args.push(self.log_level.clone());

        // Progress output to stderr
        args.push("-progress".to_string());
        args.push("pipe:2".to_string());
        args.push("-nostats".to_string());

        args.extend(self.input_args.clone());

        args.push("-i".to_string());
        args.push(self.input.clone());

        args.extend(self.output_args.clone());

        args.push(self.output.to_string_lossy().to_string());

        args
    }
}

/// Crop filter trimming odd dimensions down to even ones.
///
/// `yuv420p` needs both dimensions divisible by two. Returns `None` when
/// the frame already fits.
pub fn even_crop_filter(width: u32, height: u32) -> Option<String> {
    if width % 2 == 0 && height % 2 == 0 {
        return None;
    }
    Some(format!("crop={}:{}:0:0", width & !1, height & !1))
}

/// The transition encode: `rgb24` frames on stdin, H.264 MP4 out, no audio.
pub fn transition_command(
    spec: &TransitionSpec,
    width: u32,
    height: u32,
    output: impl AsRef<Path>,
) -> FfmpegCommand {
    let mut cmd = FfmpegCommand::from_stdin(output).raw_video_input("rgb24", width, height, spec.fps);

    if let Some(filter) = even_crop_filter(width, height) {
        cmd = cmd.video_filter(filter);
    }
    if !spec.audio {
        cmd = cmd.no_audio();
    }

    cmd.video_codec(spec.codec.clone())
        .pixel_format(spec.pixel_format.clone())
        .frame_rate(spec.fps)
        .faststart()
}

/// Check if FFmpeg is available.
pub fn check_ffmpeg() -> MediaResult<PathBuf> {
    which::which("ffmpeg").map_err(|_| MediaError::FfmpegNotFound)
}
