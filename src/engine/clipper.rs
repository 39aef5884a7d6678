//! Clip extractor - cuts time ranges out of a canonical video

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::domain::model::TimeRange;
use crate::domain::rules::RangeRules;
use crate::error::{ReviewError, ReviewResult};
use crate::ports::{ClipMode, ExtractJob, MediaPort};
use crate::utils::{PathUtils, TimeParser};

/// Result of one clip in a batch
#[derive(Debug, Clone, PartialEq)]
pub struct ClipOutcome {
    pub range: TimeRange,
    pub output: PathBuf,
    /// Failure reason; `None` when the clip was written
    pub error: Option<String>,
}

impl ClipOutcome {
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

/// Per-clip results of a batch extraction, in request order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClipBatch {
    pub outcomes: Vec<ClipOutcome>,
}

impl ClipBatch {
    /// Clips that were written
    pub fn succeeded(&self) -> Vec<PathBuf> {
        self.outcomes
            .iter()
            .filter(|o| o.is_ok())
            .map(|o| o.output.clone())
            .collect()
    }

    /// Ranges to retry
    pub fn failed_ranges(&self) -> Vec<TimeRange> {
        self.outcomes
            .iter()
            .filter(|o| !o.is_ok())
            .map(|o| o.range)
            .collect()
    }

    pub fn is_complete(&self) -> bool {
        self.outcomes.iter().all(ClipOutcome::is_ok)
    }
}

/// Extracts clips through the media port
pub struct ClipExtractor {
    media: Arc<dyn MediaPort>,
    mode: ClipMode,
}

impl ClipExtractor {
    pub fn new(media: Arc<dyn MediaPort>, mode: ClipMode) -> Self {
        Self { media, mode }
    }

    pub fn mode(&self) -> ClipMode {
        self.mode
    }

    /// `{stem}_clip_{index:03}_{start}_to_{end}.{ext}`, index starting at 1
    pub fn clip_file_name(video: &Path, index: usize, range: &TimeRange) -> String {
        let stem = PathUtils::get_stem(video).unwrap_or_else(|| "video".to_string());
        let ext = PathUtils::get_extension(video).unwrap_or_else(|| "mp4".to_string());
        format!(
            "{}_clip_{:03}_{}_to_{}.{}",
            stem,
            index,
            TimeParser::format_for_filename(range.start),
            TimeParser::format_for_filename(range.end.ceil()),
            ext
        )
    }

    /// Cut one clip into `destination`
    ///
    /// The range is checked before anything is written; a bad range is
    /// `InvalidRange` and leaves no file behind.
    pub async fn extract_clip(
        &self,
        video: &Path,
        range: TimeRange,
        destination: &Path,
    ) -> ReviewResult<()> {
        // Shape errors need no probe
        RangeRules::validate(&range, f64::INFINITY)?;
        let duration = self.probe(video).await?;
        RangeRules::validate(&range, duration)?;

        self.run(video, range, destination)
            .await
            .map_err(|message| ReviewError::ExtractionFailed { message })
    }

    /// Cut every range into `destination_dir`
    ///
    /// A failing clip does not stop the batch; its outcome carries the
    /// reason. Only a video that cannot be probed or a destination that
    /// cannot be created fails the whole call.
    pub async fn extract_all(
        &self,
        video: &Path,
        ranges: &[TimeRange],
        destination_dir: &Path,
    ) -> ReviewResult<ClipBatch> {
        let duration = self.probe(video).await?;
        tokio::fs::create_dir_all(destination_dir)
            .await
            .map_err(|e| ReviewError::ExtractionFailed {
                message: format!("cannot create {}: {}", destination_dir.display(), e),
            })?;

        info!(
            video = %video.display(),
            clips = ranges.len(),
            destination = %destination_dir.display(),
            mode = ?self.mode,
            "Extracting clips"
        );

        let mut batch = ClipBatch::default();
        for (i, range) in ranges.iter().enumerate() {
            let output = destination_dir.join(Self::clip_file_name(video, i + 1, range));
            let error = match RangeRules::validate(range, duration) {
                Err(e) => Some(e.to_string()),
                Ok(()) => self.run(video, *range, &output).await.err(),
            };
            if let Some(reason) = &error {
                warn!(range = %range, error = %reason, "Clip failed");
            }
            batch.outcomes.push(ClipOutcome {
                range: *range,
                output,
                error,
            });
        }

        info!(
            written = batch.succeeded().len(),
            failed = batch.failed_ranges().len(),
            "Clip extraction finished"
        );
        Ok(batch)
    }

    /// Duration of `video`; a missing file is `NotFound`
    pub async fn probe(&self, video: &Path) -> ReviewResult<f64> {
        if !tokio::fs::try_exists(video).await.unwrap_or(false) {
            return Err(ReviewError::not_found(format!("video {}", video.display())));
        }
        self.media
            .probe_duration(video)
            .await
            .map_err(|e| ReviewError::ExtractionFailed {
                message: format!("cannot probe {}: {}", video.display(), e),
            })
    }

    /// Run one extraction; partial output is removed on failure
    async fn run(&self, video: &Path, range: TimeRange, output: &Path) -> Result<(), String> {
        let job = ExtractJob {
            video: video.to_path_buf(),
            range,
            output: output.to_path_buf(),
            mode: self.mode,
        };
        match self.media.extract(&job).await {
            Ok(()) => {
                debug!(output = %output.display(), "Clip written");
                Ok(())
            }
            Err(e) => {
                if let Err(rm) = tokio::fs::remove_file(output).await {
                    if rm.kind() != std::io::ErrorKind::NotFound {
                        warn!(output = %output.display(), error = %rm, "Failed to remove partial clip");
                    }
                }
                Err(e.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::progress::ProgressTracker;
    use crate::error::{ErrorKind, MediaError};
    use crate::ports::ConcatJob;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use tempfile::TempDir;
    use tokio_util::sync::CancellationToken;

    /// Writes the requested range into the clip; fails on configured starts
    struct FakeMedia {
        duration: f64,
        fail_starts: Vec<f64>,
        calls: Mutex<usize>,
    }

    impl FakeMedia {
        fn new(duration: f64, fail_starts: Vec<f64>) -> Self {
            Self {
                duration,
                fail_starts,
                calls: Mutex::new(0),
            }
        }
    }

    #[async_trait]
    impl MediaPort for FakeMedia {
        async fn probe_duration(&self, _path: &Path) -> Result<f64, MediaError> {
            Ok(self.duration)
        }

        async fn concat(
            &self,
            _job: &ConcatJob,
            _tracker: &ProgressTracker,
            _cancel: &CancellationToken,
        ) -> Result<(), MediaError> {
            unreachable!("not used by the extractor")
        }

        async fn extract(&self, job: &ExtractJob) -> Result<(), MediaError> {
            *self.calls.lock().unwrap() += 1;
            std::fs::write(&job.output, job.range.to_string()).unwrap();
            if self.fail_starts.contains(&job.range.start) {
                return Err(MediaError::ExecutionFailed {
                    exit_code: Some(1),
                    stderr: "Invalid data found".to_string(),
                });
            }
            Ok(())
        }
    }

    fn video(dir: &Path) -> PathBuf {
        let path = dir.join("12.mp4");
        std::fs::write(&path, b"video").unwrap();
        path
    }

    #[tokio::test]
    async fn test_start_not_before_end_is_invalid_range() {
        let dir = TempDir::new().unwrap();
        let media = Arc::new(FakeMedia::new(600.0, vec![]));
        let extractor = ClipExtractor::new(media.clone(), ClipMode::Copy);
        let destination = dir.path().join("clip.mp4");

        for range in [TimeRange::new(10.0, 10.0), TimeRange::new(20.0, 10.0)] {
            let err = extractor
                .extract_clip(&video(dir.path()), range, &destination)
                .await
                .unwrap_err();
            assert_eq!(err.kind(), ErrorKind::InvalidRange);
        }
        assert!(!destination.exists());
        assert_eq!(*media.calls.lock().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_range_beyond_duration_is_invalid_range() {
        let dir = TempDir::new().unwrap();
        let extractor = ClipExtractor::new(Arc::new(FakeMedia::new(60.0, vec![])), ClipMode::Copy);
        let destination = dir.path().join("clip.mp4");

        let err = extractor
            .extract_clip(&video(dir.path()), TimeRange::new(50.0, 61.0), &destination)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidRange);
        assert!(!destination.exists());
    }

    #[tokio::test]
    async fn test_failed_clip_is_removed() {
        let dir = TempDir::new().unwrap();
        let extractor =
            ClipExtractor::new(Arc::new(FakeMedia::new(60.0, vec![5.0])), ClipMode::Accurate);
        let destination = dir.path().join("clip.mp4");

        let err = extractor
            .extract_clip(&video(dir.path()), TimeRange::new(5.0, 8.0), &destination)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ExtractionFailed);
        assert!(!destination.exists());
    }

    #[tokio::test]
    async fn test_batch_continues_after_failure() {
        let dir = TempDir::new().unwrap();
        let media = Arc::new(FakeMedia::new(600.0, vec![20.0]));
        let extractor = ClipExtractor::new(media.clone(), ClipMode::Copy);
        let out = dir.path().join("clips");

        let ranges = [
            TimeRange::new(0.0, 8.0),
            TimeRange::new(20.0, 28.0),
            TimeRange::new(590.0, 700.0),
            TimeRange::new(120.0, 128.0),
        ];
        let batch = extractor
            .extract_all(&video(dir.path()), &ranges, &out)
            .await
            .unwrap();

        assert_eq!(batch.outcomes.len(), 4);
        assert!(!batch.is_complete());
        assert_eq!(batch.failed_ranges(), vec![ranges[1], ranges[2]]);
        assert_eq!(batch.succeeded().len(), 2);
        for path in batch.succeeded() {
            assert!(path.exists());
        }
        assert!(!batch.outcomes[1].output.exists());
        // the out-of-range clip never reached the media tool
        assert_eq!(*media.calls.lock().unwrap(), 3);
    }

    #[tokio::test]
    async fn test_missing_video_is_not_found() {
        let dir = TempDir::new().unwrap();
        let extractor = ClipExtractor::new(Arc::new(FakeMedia::new(60.0, vec![])), ClipMode::Copy);
        let err = extractor
            .extract_all(&dir.path().join("gone.mp4"), &[TimeRange::new(0.0, 1.0)], dir.path())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn test_clip_file_name() {
        let name = ClipExtractor::clip_file_name(
            Path::new("/work/12/12.mp4"),
            3,
            &TimeRange::new(120.0, 128.5),
        );
        assert_eq!(name, "12_clip_003_00h02m00s_to_00h02m09s.mp4");
    }
}
