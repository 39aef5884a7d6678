// Ports - Interface definitions (contracts)

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::domain::model::TimeRange;
use crate::engine::progress::ProgressTracker;
use crate::error::MediaError;

/// How sources are joined into the canonical video
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConcatStrategy {
    /// Concat demuxer with stream copy, no re-encoding
    StreamCopy,
    /// Normalize every source to H.264/AAC while joining
    Reencode,
}

/// How clips are cut from the canonical video
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClipMode {
    /// Stream copy; the clip starts on the keyframe at or before `start`
    Copy,
    /// Re-encode; frame accurate
    Accurate,
}

impl ClipMode {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_lowercase().as_str() {
            "copy" => Some(ClipMode::Copy),
            "accurate" | "reencode" => Some(ClipMode::Accurate),
            _ => None,
        }
    }
}

/// A concatenation to run
#[derive(Debug, Clone)]
pub struct ConcatJob {
    /// Concat demuxer manifest listing the sources in order
    pub manifest: PathBuf,
    pub output: PathBuf,
    /// Sum of source durations, used to scale progress; 0 when unknown
    pub expected_duration: f64,
    pub strategy: ConcatStrategy,
}

/// A clip extraction to run
#[derive(Debug, Clone)]
pub struct ExtractJob {
    pub video: PathBuf,
    pub range: TimeRange,
    pub output: PathBuf,
    pub mode: ClipMode,
}

/// Port for media subprocess work
#[async_trait]
pub trait MediaPort: Send + Sync {
    /// Duration of a media file in seconds
    async fn probe_duration(&self, path: &Path) -> Result<f64, MediaError>;

    /// Join sources listed in a manifest, reporting progress until cancelled
    async fn concat(
        &self,
        job: &ConcatJob,
        tracker: &ProgressTracker,
        cancel: &CancellationToken,
    ) -> Result<(), MediaError>;

    /// Cut one clip out of a video
    async fn extract(&self, job: &ExtractJob) -> Result<(), MediaError>;
}

/// Port for disk capacity queries
#[async_trait]
pub trait DiskPort: Send + Sync {
    /// Size of a file in bytes
    async fn file_size(&self, path: &Path) -> std::io::Result<u64>;

    /// Free bytes on the volume hosting `dir`
    async fn available_space(&self, dir: &Path) -> std::io::Result<u64>;
}

/// Port for the user-facing destination chooser
///
/// `None` means the user dismissed the picker.
#[async_trait]
pub trait DestinationPicker: Send + Sync {
    /// Choose a file to save, starting from a suggested name
    async fn pick_save_file(&self, suggested_name: &str) -> Option<PathBuf>;

    /// Choose a directory to export into
    async fn pick_directory(&self) -> Option<PathBuf>;
}
