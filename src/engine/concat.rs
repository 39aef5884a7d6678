//! Video concatenator - joins source recordings into one canonical video

use std::io::Write as _;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::engine::progress::ProgressTracker;
use crate::error::{MediaError, ReviewError, ReviewResult};
use crate::ports::{ConcatJob, ConcatStrategy, MediaPort};

const COPY_CHUNK_SIZE: usize = 1024 * 1024;

/// Produces the canonical video of a game from its ordered sources
pub struct VideoConcatenator {
    media: Arc<dyn MediaPort>,
    reencode_fallback: bool,
}

impl VideoConcatenator {
    pub fn new(media: Arc<dyn MediaPort>, reencode_fallback: bool) -> Self {
        Self {
            media,
            reencode_fallback,
        }
    }

    /// `<game>.<ext of the first source>`, `mp4` when it has none
    pub fn canonical_file_name(game_number: &str, sources: &[PathBuf]) -> String {
        let ext = sources
            .first()
            .and_then(|p| p.extension())
            .map(|e| e.to_string_lossy().to_lowercase())
            .filter(|e| !e.is_empty())
            .unwrap_or_else(|| "mp4".to_string());
        format!("{}.{}", game_number, ext)
    }

    /// Write the canonical video of `game_number` into `dest_dir`
    ///
    /// A single source is copied; several are joined in order. Progress ends at
    /// 100 on success only. On failure or cancellation the partial output is
    /// removed and the error is `ConcatenationFailed`.
    pub async fn concat(
        &self,
        game_number: &str,
        sources: &[PathBuf],
        dest_dir: &Path,
        tracker: &ProgressTracker,
        cancel: &CancellationToken,
    ) -> ReviewResult<PathBuf> {
        if sources.is_empty() {
            let err = ReviewError::invalid_request("at least one source video is required");
            tracker.fail(&err.to_string());
            return Err(err);
        }

        let output = dest_dir.join(Self::canonical_file_name(game_number, sources));
        info!(
            game_number,
            sources = sources.len(),
            output = %output.display(),
            "Building canonical video"
        );
        tracker.update(0.0);

        let result = if sources.len() == 1 {
            copy_with_progress(&sources[0], &output, tracker, cancel).await
        } else {
            self.join(sources, &output, tracker, cancel).await
        };

        match result {
            Ok(()) => {
                tracker.complete();
                info!(game_number, output = %output.display(), "Canonical video ready");
                Ok(output)
            }
            Err(e) => {
                remove_partial(&output).await;
                let message = match &e {
                    MediaError::Cancelled => "cancelled".to_string(),
                    other => other.to_string(),
                };
                error!(game_number, error = %message, "Concatenation failed");
                tracker.fail(&message);
                Err(ReviewError::ConcatenationFailed { message })
            }
        }
    }

    async fn join(
        &self,
        sources: &[PathBuf],
        output: &Path,
        tracker: &ProgressTracker,
        cancel: &CancellationToken,
    ) -> Result<(), MediaError> {
        let mut absolute = Vec::with_capacity(sources.len());
        let mut expected_duration = 0.0;
        for source in sources {
            let path = tokio::fs::canonicalize(source).await?;
            match self.media.probe_duration(&path).await {
                Ok(duration) => expected_duration += duration,
                Err(e) => {
                    // Progress degrades to start/finish only
                    warn!(source = %path.display(), error = %e, "Could not probe source duration");
                    expected_duration = f64::NAN;
                }
            }
            absolute.push(path);
        }
        if !expected_duration.is_finite() {
            expected_duration = 0.0;
        }

        // Removed when dropped, whichever way this returns
        let parent = output.parent().unwrap_or_else(|| Path::new("."));
        let mut manifest = tempfile::Builder::new()
            .prefix(".concat-")
            .suffix(".txt")
            .tempfile_in(parent)?;
        manifest.write_all(build_manifest(&absolute).as_bytes())?;
        manifest.flush()?;

        let mut job = ConcatJob {
            manifest: manifest.path().to_path_buf(),
            output: output.to_path_buf(),
            expected_duration,
            strategy: ConcatStrategy::StreamCopy,
        };

        match self.media.concat(&job, tracker, cancel).await {
            Ok(()) => Ok(()),
            Err(MediaError::ExecutionFailed { exit_code, stderr }) if self.reencode_fallback => {
                warn!(
                    exit_code = ?exit_code,
                    stderr = %stderr,
                    "Stream copy concat failed, retrying with re-encoding"
                );
                remove_partial(output).await;
                job.strategy = ConcatStrategy::Reencode;
                self.media.concat(&job, tracker, cancel).await
            }
            Err(e) => Err(e),
        }
    }
}

/// Concat demuxer manifest, one `file '<path>'` line per source
pub fn build_manifest(sources: &[PathBuf]) -> String {
    sources
        .iter()
        .map(|p| {
            let escaped = p.to_string_lossy().replace('\'', r"'\''");
            format!("file '{}'\n", escaped)
        })
        .collect()
}

/// Chunked copy so a single large source still reports progress and can stop early
async fn copy_with_progress(
    source: &Path,
    output: &Path,
    tracker: &ProgressTracker,
    cancel: &CancellationToken,
) -> Result<(), MediaError> {
    let mut reader = tokio::fs::File::open(source).await?;
    let total = reader.metadata().await?.len();
    let mut writer = tokio::fs::File::create(output).await?;
    debug!(source = %source.display(), bytes = total, "Copying single source");

    let mut buf = vec![0u8; COPY_CHUNK_SIZE];
    let mut copied: u64 = 0;
    loop {
        if cancel.is_cancelled() {
            return Err(MediaError::Cancelled);
        }
        let n = reader.read(&mut buf).await?;
        if n == 0 {
            break;
        }
        writer.write_all(&buf[..n]).await?;
        copied += n as u64;
        if total > 0 {
            tracker.update_fraction(copied as f64 / total as f64);
        }
    }
    writer.flush().await?;
    writer.sync_all().await?;
    Ok(())
}

async fn remove_partial(output: &Path) {
    match tokio::fs::remove_file(output).await {
        Ok(()) => debug!(output = %output.display(), "Removed partial output"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!(output = %output.display(), error = %e, "Failed to remove partial output"),
    }
}
