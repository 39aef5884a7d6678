// Tracing log adapter - Structured logging using tracing crate

use std::fs::{File, OpenOptions};
use std::path::Path;
use std::sync::Mutex;

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

use crate::adapters::toml_config::LoggingConfig;
use crate::error::{ReviewError, ReviewResult};

pub const LOG_FILE_NAME: &str = "matchreel.log";

/// Install the global subscriber: compact stderr output plus an optional
/// log file under `logs_dir` (JSON lines when `config.json` is set).
///
/// `RUST_LOG` takes precedence over the configured level. Calling this twice
/// is harmless; the first subscriber stays installed.
pub fn init_logging(config: &LoggingConfig, logs_dir: Option<&Path>) -> ReviewResult<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.level.to_lowercase()));

    let stderr_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact();

    let file = match logs_dir {
        Some(dir) => Some(open_log_file(dir)?),
        None => None,
    };

    let (json_layer, text_layer) = match file {
        Some(file) if config.json => (
            Some(fmt::layer().json().with_writer(Mutex::new(file))),
            None,
        ),
        Some(file) => (
            None,
            Some(fmt::layer().with_ansi(false).with_writer(Mutex::new(file))),
        ),
        None => (None, None),
    };

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(stderr_layer)
        .with(json_layer)
        .with(text_layer)
        .try_init();

    Ok(())
}

fn open_log_file(dir: &Path) -> ReviewResult<File> {
    std::fs::create_dir_all(dir).map_err(|e| ReviewError::Config {
        message: format!("Failed to create logs directory {}: {}", dir.display(), e),
    })?;
    let path = dir.join(LOG_FILE_NAME);
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .map_err(|e| ReviewError::Config {
            message: format!("Failed to open log file {}: {}", path.display(), e),
        })
}
