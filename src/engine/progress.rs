//! Progress tracking and sink system for UI integration

use std::io::Write;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

/// Receiver of progress updates for one long-running operation
pub trait ProgressSink: Send + Sync {
    /// Called with a percentage in `0..=100`, never decreasing
    fn on_progress(&self, percent: u8);

    /// Called once, after the final 100 has been emitted
    fn on_complete(&self) {}

    /// Called when the operation fails or is cancelled
    fn on_error(&self, _error: &str) {}
}

/// Events delivered over the out-of-band progress channel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "camelCase")]
pub enum ProgressEvent {
    Progress { percent: u8 },
    Completed,
    Failed { error: String },
}

/// Progress phases
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub enum ProgressPhase {
    Initializing,
    Processing,
    Complete,
    Failed,
}

/// Snapshot of a tracker's state
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressInfo {
    pub phase: ProgressPhase,
    /// Last emitted percentage
    pub percent: u8,
    pub message: String,
    pub elapsed: Duration,
}

/// Progress tracker with thread-safe, monotonic updates
///
/// Intermediate updates are capped at 99 and rate limited; only
/// [`ProgressTracker::complete`] emits 100.
#[derive(Clone)]
pub struct ProgressTracker {
    inner: Arc<Mutex<ProgressTrackerInner>>,
    sinks: Arc<Mutex<Vec<Arc<dyn ProgressSink>>>>,
}

struct ProgressTrackerInner {
    phase: ProgressPhase,
    emitted: Option<u8>,
    message: String,
    start_time: Instant,
    last_update: Option<Instant>,
    update_interval: Duration,
}

impl ProgressTracker {
    /// Create a new progress tracker
    pub fn new(operation: &str) -> Self {
        let inner = ProgressTrackerInner {
            phase: ProgressPhase::Initializing,
            emitted: None,
            message: operation.to_string(),
            start_time: Instant::now(),
            last_update: None,
            update_interval: Duration::from_millis(100), // At most 10 updates per second
        };

        Self {
            inner: Arc::new(Mutex::new(inner)),
            sinks: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Add a progress sink
    pub fn add_sink(&self, sink: Arc<dyn ProgressSink>) {
        if let Ok(mut sinks) = self.sinks.lock() {
            sinks.push(sink);
        }
    }

    /// Set update interval
    pub fn set_update_interval(&self, interval: Duration) {
        if let Ok(mut inner) = self.inner.lock() {
            inner.update_interval = interval;
        }
    }

    /// Report a completion ratio in `[0.0, 1.0]`
    pub fn update_fraction(&self, fraction: f64) {
        if fraction.is_finite() {
            self.update(fraction.clamp(0.0, 1.0) * 100.0);
        }
    }

    /// Report a percentage; values below the last emitted one are ignored
    pub fn update(&self, percent: f64) {
        let to_emit = {
            let Ok(mut inner) = self.inner.lock() else {
                return;
            };
            if matches!(inner.phase, ProgressPhase::Complete | ProgressPhase::Failed) {
                return;
            }

            let value = percent.clamp(0.0, 99.0).floor() as u8;
            let first = inner.emitted.is_none();
            if !first {
                if Some(value) <= inner.emitted {
                    return;
                }
                let throttled = inner
                    .last_update
                    .map(|t| t.elapsed() < inner.update_interval)
                    .unwrap_or(false);
                if throttled {
                    return;
                }
            }

            inner.phase = ProgressPhase::Processing;
            inner.emitted = Some(value);
            inner.last_update = Some(Instant::now());
            value
        };

        self.notify_sinks(|sink| sink.on_progress(to_emit));
    }

    /// Complete operation successfully, emitting 100
    pub fn complete(&self) {
        {
            let Ok(mut inner) = self.inner.lock() else {
                return;
            };
            if matches!(inner.phase, ProgressPhase::Complete | ProgressPhase::Failed) {
                return;
            }
            inner.phase = ProgressPhase::Complete;
            inner.emitted = Some(100);
        }

        self.notify_sinks(|sink| sink.on_progress(100));
        self.notify_sinks(|sink| sink.on_complete());
    }

    /// Mark operation as failed
    pub fn fail(&self, error: &str) {
        {
            let Ok(mut inner) = self.inner.lock() else {
                return;
            };
            if matches!(inner.phase, ProgressPhase::Complete | ProgressPhase::Failed) {
                return;
            }
            inner.phase = ProgressPhase::Failed;
            inner.message = error.to_string();
        }

        self.notify_sinks(|sink| sink.on_error(error));
    }

    /// Get current progress information
    pub fn get_info(&self) -> Option<ProgressInfo> {
        self.inner.lock().ok().map(|inner| ProgressInfo {
            phase: inner.phase,
            percent: inner.emitted.unwrap_or(0),
            message: inner.message.clone(),
            elapsed: inner.start_time.elapsed(),
        })
    }

    fn notify_sinks<F>(&self, f: F)
    where
        F: Fn(&dyn ProgressSink),
    {
        let sinks = match self.sinks.lock() {
            Ok(sinks) => sinks.clone(),
            Err(_) => return,
        };
        for sink in sinks.iter() {
            f(sink.as_ref());
        }
    }
}

/// Console progress bar for CLI usage
pub struct ConsoleProgressSink {
    label: String,
}

impl ConsoleProgressSink {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
        }
    }
}

impl ProgressSink for ConsoleProgressSink {
    fn on_progress(&self, percent: u8) {
        let bar_length = 30;
        let filled = (percent as usize * bar_length) / 100;
        let bar = "#".repeat(filled) + &"-".repeat(bar_length - filled);
        let mut stderr = std::io::stderr();
        let _ = write!(stderr, "\r{} [{}] {:>3}%", self.label, bar, percent);
        let _ = stderr.flush();
    }

    fn on_complete(&self) {
        eprintln!();
    }

    fn on_error(&self, error: &str) {
        eprintln!();
        eprintln!("{} failed: {}", self.label, error);
    }
}

/// Forwards progress over an mpsc channel, for request/stream callers
pub struct ChannelProgressSink {
    sender: mpsc::UnboundedSender<ProgressEvent>,
}

impl ChannelProgressSink {
    /// Create a sink and the receiving end of its event stream
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<ProgressEvent>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }
}

impl ProgressSink for ChannelProgressSink {
    fn on_progress(&self, percent: u8) {
        // Receiver may be gone; progress is best effort
        let _ = self.sender.send(ProgressEvent::Progress { percent });
    }

    fn on_complete(&self) {
        let _ = self.sender.send(ProgressEvent::Completed);
    }

    fn on_error(&self, error: &str) {
        let _ = self.sender.send(ProgressEvent::Failed {
            error: error.to_string(),
        });
    }
}

/// No-op sink for when progress tracking is disabled
pub struct NoOpProgressSink;

impl ProgressSink for NoOpProgressSink {
    fn on_progress(&self, _percent: u8) {}
}
