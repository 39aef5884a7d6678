//! FFmpeg execution adapter
//!
//! Runs `ffmpeg` and `ffprobe` as subprocesses so heavy media work never
//! blocks the async runtime. Concatenation progress is read from
//! `-progress pipe:1` and scaled against the expected output duration.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use serde::Deserialize;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};
use tokio::process::Command;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::engine::progress::ProgressTracker;
use crate::error::MediaError;
use crate::ports::*;

/// Top-level ffprobe JSON output (`-print_format json -show_format`)
#[derive(Debug, Deserialize)]
struct FfprobeOutput {
    format: FfprobeFormat,
}

/// Format-level metadata from ffprobe
#[derive(Debug, Deserialize)]
struct FfprobeFormat {
    duration: Option<String>,
}

/// Values parsed out of ffmpeg's `-progress` key=value stream
#[derive(Debug, Default)]
struct ProgressState {
    out_time_secs: f64,
    complete: bool,
}

impl ProgressState {
    fn update(&mut self, key: &str, value: &str) {
        match key {
            // Despite its name, out_time_ms is reported in microseconds
            "out_time_us" | "out_time_ms" => {
                if let Ok(us) = value.trim().parse::<f64>() {
                    if us >= 0.0 {
                        self.out_time_secs = us / 1_000_000.0;
                    }
                }
            }
            "progress" => {
                self.complete = value.trim() == "end";
            }
            _ => {}
        }
    }
}

/// FFmpeg subprocess adapter
pub struct FfmpegAdapter {
    ffmpeg: PathBuf,
    ffprobe: PathBuf,
}

impl FfmpegAdapter {
    /// Create a new adapter around the given binaries
    pub fn new(ffmpeg: impl Into<PathBuf>, ffprobe: impl Into<PathBuf>) -> Self {
        Self {
            ffmpeg: ffmpeg.into(),
            ffprobe: ffprobe.into(),
        }
    }

    /// Build the ffmpeg argument list for a concatenation
    pub fn concat_args(job: &ConcatJob) -> Vec<OsString> {
        let mut args: Vec<OsString> = [
            "-y",
            "-hide_banner",
            "-loglevel",
            "error",
            "-nostats",
            "-progress",
            "pipe:1",
            "-f",
            "concat",
            "-safe",
            "0",
            "-i",
        ]
        .iter()
        .map(OsString::from)
        .collect();
        args.push(job.manifest.clone().into_os_string());

        let codec_args: &[&str] = match job.strategy {
            ConcatStrategy::StreamCopy => &["-map", "0:v", "-map", "0:a?", "-c", "copy"],
            ConcatStrategy::Reencode => &[
                "-map", "0:v:0", "-map", "0:a?", "-c:v", "libx264", "-preset", "veryfast",
                "-crf", "20", "-pix_fmt", "yuv420p", "-c:a", "aac", "-b:a", "160k",
            ],
        };
        args.extend(codec_args.iter().map(OsString::from));

        if has_mp4_family_extension(&job.output) {
            args.push("-movflags".into());
            args.push("+faststart".into());
        }
        args.push(job.output.clone().into_os_string());
        args
    }

    /// Build the ffmpeg argument list for a clip extraction
    pub fn extract_args(job: &ExtractJob) -> Vec<OsString> {
        let duration = job.range.duration().max(0.0);
        let mut args: Vec<OsString> = vec![
            "-y".into(),
            "-hide_banner".into(),
            "-loglevel".into(),
            "error".into(),
            "-ss".into(),
            format!("{:.3}", job.range.start).into(),
            "-i".into(),
            job.video.clone().into_os_string(),
            // Bounds the output length even when the cut snaps to an earlier keyframe
            "-t".into(),
            format!("{:.3}", duration).into(),
            "-map".into(),
            "0:v:0".into(),
            "-map".into(),
            "0:a?".into(),
        ];

        let codec_args: &[&str] = match job.mode {
            ClipMode::Copy => &["-c", "copy", "-avoid_negative_ts", "make_zero"],
            ClipMode::Accurate => &[
                "-c:v", "libx264", "-preset", "veryfast", "-crf", "18", "-pix_fmt", "yuv420p",
                "-c:a", "aac", "-b:a", "160k",
            ],
        };
        args.extend(codec_args.iter().map(OsString::from));
        args.push(job.output.clone().into_os_string());
        args
    }

    /// Run ffmpeg to completion, feeding `-progress` output into the tracker
    async fn run_with_progress(
        &self,
        args: Vec<OsString>,
        expected_duration: f64,
        tracker: &ProgressTracker,
        cancel: &CancellationToken,
    ) -> Result<(), MediaError> {
        debug!(args = ?args, "Running ffmpeg");
        let mut child = Command::new(&self.ffmpeg)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(MediaError::NotFound)?;

        info!(pid = child.id(), "ffmpeg process started");

        let stdout = child.stdout.take().ok_or_else(|| {
            MediaError::IoError(std::io::Error::new(
                std::io::ErrorKind::Other,
                "ffmpeg stdout was not captured",
            ))
        })?;
        let stderr = child.stderr.take().ok_or_else(|| {
            MediaError::IoError(std::io::Error::new(
                std::io::ErrorKind::Other,
                "ffmpeg stderr was not captured",
            ))
        })?;

        // Drain stderr concurrently so ffmpeg never blocks on a full pipe
        let stderr_task = tokio::spawn(async move {
            let mut output = String::new();
            let mut reader = BufReader::new(stderr);
            if let Err(e) = reader.read_to_string(&mut output).await {
                output.push_str(&format!("<failed to read ffmpeg stderr: {}>", e));
            }
            output
        });

        let mut lines = BufReader::new(stdout).lines();
        let mut state = ProgressState::default();
        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    warn!("Cancellation requested, killing ffmpeg");
                    let _ = child.kill().await;
                    stderr_task.abort();
                    return Err(MediaError::Cancelled);
                }
                line = lines.next_line() => {
                    let Some(line) = line? else {
                        break;
                    };
                    if let Some((key, value)) = line.trim().split_once('=') {
                        state.update(key, value);
                        if key == "progress" && expected_duration > 0.0 {
                            tracker.update_fraction(state.out_time_secs / expected_duration);
                        }
                    }
                }
            }
        }

        let status = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                let _ = child.kill().await;
                stderr_task.abort();
                return Err(MediaError::Cancelled);
            }
            status = child.wait() => status?,
        };

        let stderr_output = stderr_task.await.unwrap_or_default();
        if !status.success() {
            return Err(MediaError::ExecutionFailed {
                exit_code: status.code(),
                stderr: stderr_output.trim().to_string(),
            });
        }

        debug!(complete = state.complete, "ffmpeg finished");
        Ok(())
    }
}

#[async_trait]
impl MediaPort for FfmpegAdapter {
    async fn probe_duration(&self, path: &Path) -> Result<f64, MediaError> {
        let output = Command::new(&self.ffprobe)
            .args(["-v", "quiet", "-print_format", "json", "-show_format"])
            .arg(path)
            .kill_on_drop(true)
            .output()
            .await
            .map_err(MediaError::NotFound)?;

        if !output.status.success() {
            return Err(MediaError::ExecutionFailed {
                exit_code: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            });
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let parsed: FfprobeOutput = serde_json::from_str(&stdout)
            .map_err(|e| MediaError::ParseError(format!("{}: {}", e, stdout)))?;

        parsed
            .format
            .duration
            .as_deref()
            .and_then(|d| d.trim().parse::<f64>().ok())
            .filter(|d| d.is_finite() && *d >= 0.0)
            .ok_or_else(|| {
                MediaError::ParseError(format!("no duration reported for {}", path.display()))
            })
    }

    async fn concat(
        &self,
        job: &ConcatJob,
        tracker: &ProgressTracker,
        cancel: &CancellationToken,
    ) -> Result<(), MediaError> {
        info!(
            output = %job.output.display(),
            strategy = ?job.strategy,
            expected_duration = job.expected_duration,
            "Concatenating videos"
        );
        let args = Self::concat_args(job);
        self.run_with_progress(args, job.expected_duration, tracker, cancel)
            .await
    }

    async fn extract(&self, job: &ExtractJob) -> Result<(), MediaError> {
        debug!(
            video = %job.video.display(),
            range = %job.range,
            mode = ?job.mode,
            "Extracting clip"
        );
        let output = Command::new(&self.ffmpeg)
            .args(Self::extract_args(job))
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(MediaError::NotFound)?;

        if !output.status.success() {
            return Err(MediaError::ExecutionFailed {
                exit_code: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(())
    }
}

fn has_mp4_family_extension(path: &Path) -> bool {
    path.extension()
        .map(|ext| {
            matches!(
                ext.to_string_lossy().to_lowercase().as_str(),
                "mp4" | "mov" | "m4v"
            )
        })
        .unwrap_or(false)
}
