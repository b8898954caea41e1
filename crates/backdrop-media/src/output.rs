//! Output directory for rendered videos.
//!
//! Videos are written under a configurable root with collision-free names
//! (`<prefix>_<uuid>.mp4`) and are kept after the response is sent.

use std::path::{Path, PathBuf};

use backdrop_models::transition::VIDEO_EXTENSION;
use tokio::fs;
use uuid::Uuid;

use crate::error::{MediaError, MediaResult};

/// Default output root, relative to the working directory.
pub const DEFAULT_OUTPUT_DIR: &str = "media/videos";

/// File name prefix for the background-swap transition.
pub const TRANSITION_PREFIX: &str = "transition";

/// File name prefix for the styled transition.
pub const JURASSIC_TRANSITION_PREFIX: &str = "jurassic_transition";

/// Directory rendered videos are written to.
#[derive(Debug, Clone)]
pub struct OutputDir {
    root: PathBuf,
}

impl Default for OutputDir {
    fn default() -> Self {
        Self::new(DEFAULT_OUTPUT_DIR)
    }
}

impl OutputDir {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Create the directory tree if it doesn't exist yet.
    ///
    /// Failure is an encoding error: no video can be written.
    pub async fn ensure(&self) -> MediaResult<()> {
        fs::create_dir_all(&self.root).await.map_err(|e| {
            MediaError::encoding(
                format!("cannot create output directory {}: {e}", self.root.display()),
                None,
                None,
            )
        })
    }

    /// Reserve a fresh video path under the root.
    ///
    /// The directory is created on demand; the file itself is not.
    pub async fn video_path(&self, prefix: &str) -> MediaResult<PathBuf> {
        self.ensure().await?;
        Ok(self.root.join(video_file_name(prefix)))
    }
}

/// `<prefix>_<uuid>.mp4`
pub fn video_file_name(prefix: &str) -> String {
    format!("{}_{}.{}", prefix, Uuid::new_v4().simple(), VIDEO_EXTENSION)
}
