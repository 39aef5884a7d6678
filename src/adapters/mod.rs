// Adapters - External system implementations

pub mod ffmpeg;
pub mod fs_local;
pub mod picker;
pub mod toml_config;
pub mod tracing_log;

// Re-export adapters
pub use ffmpeg::FfmpegAdapter;
pub use fs_local::LocalDiskAdapter;
pub use picker::{FixedDestinationPicker, PromptDestinationPicker};
pub use toml_config::{AppConfig, AppPaths};
pub use tracing_log::init_logging;
