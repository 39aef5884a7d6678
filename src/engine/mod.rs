//! Media engines: canonical video assembly, clip extraction, progress

pub mod clipper;
pub mod concat;
pub mod progress;

pub use clipper::{ClipBatch, ClipExtractor, ClipOutcome};
pub use concat::VideoConcatenator;
pub use progress::{
    ChannelProgressSink, ConsoleProgressSink, NoOpProgressSink, ProgressEvent, ProgressSink,
    ProgressTracker,
};
