// TOML config adapter - Configuration management using TOML files

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{ReviewError, ReviewResult};
use crate::ports::ClipMode;

const CONFIG_FILE_NAME: &str = "matchreel.toml";

/// Application configuration, read once at startup
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub paths: PathsConfig,
    pub media: MediaConfig,
    pub storage: StorageConfig,
    pub clips: ClipsConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Root for `work/` and `logs/`
    pub data_dir: PathBuf,
    /// Default location offered by the destination picker
    pub downloads_dir: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MediaConfig {
    pub ffmpeg: PathBuf,
    pub ffprobe: PathBuf,
    pub clip_mode: ClipMode,
    /// Retry a failed stream-copy concat with re-encoding
    pub reencode_fallback: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Extra fraction of the source size required on top of it
    pub safety_margin: f64,
    /// Bytes that must stay free after ingestion
    pub reserve_bytes: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClipsConfig {
    pub pre_roll_secs: f64,
    pub post_roll_secs: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    /// Write the log file as JSON lines
    pub json: bool,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            downloads_dir: default_downloads_dir(),
        }
    }
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            ffmpeg: PathBuf::from("ffmpeg"),
            ffprobe: PathBuf::from("ffprobe"),
            clip_mode: ClipMode::Copy,
            reencode_fallback: true,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            safety_margin: 0.1,
            reserve_bytes: 200 * 1024 * 1024,
        }
    }
}

impl Default for ClipsConfig {
    fn default() -> Self {
        Self {
            pre_roll_secs: 5.0,
            post_roll_secs: 3.0,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

impl AppConfig {
    /// Load configuration: explicit file > `<data_dir>/matchreel.toml` > defaults,
    /// then environment overrides
    pub fn load(explicit: Option<&Path>) -> ReviewResult<Self> {
        let mut config = match explicit {
            Some(path) => Self::from_file(path)?,
            None => {
                let data_dir = std::env::var_os("MATCHREEL_DATA_DIR")
                    .map(PathBuf::from)
                    .unwrap_or_else(default_data_dir);
                let candidate = data_dir.join(CONFIG_FILE_NAME);
                if candidate.exists() {
                    Self::from_file(&candidate)?
                } else {
                    Self::default()
                }
            }
        };

        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Parse a TOML configuration file
    pub fn from_file(path: &Path) -> ReviewResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| ReviewError::Config {
            message: format!("Failed to read config file {}: {}", path.display(), e),
        })?;
        let config = Self::from_toml_str(&content)?;
        info!(path = %path.display(), "Configuration loaded");
        Ok(config)
    }

    pub fn from_toml_str(content: &str) -> ReviewResult<Self> {
        toml::from_str(content).map_err(|e| ReviewError::Config {
            message: format!("Failed to parse TOML config: {}", e),
        })
    }

    /// Override values from `MATCHREEL_*` environment variables
    pub fn apply_env_overrides(&mut self) {
        if let Some(v) = std::env::var_os("MATCHREEL_DATA_DIR") {
            self.paths.data_dir = PathBuf::from(v);
        }
        if let Some(v) = std::env::var_os("MATCHREEL_DOWNLOADS_DIR") {
            self.paths.downloads_dir = PathBuf::from(v);
        }
        if let Some(v) = std::env::var_os("MATCHREEL_FFMPEG") {
            self.media.ffmpeg = PathBuf::from(v);
        }
        if let Some(v) = std::env::var_os("MATCHREEL_FFPROBE") {
            self.media.ffprobe = PathBuf::from(v);
        }
        if let Ok(v) = std::env::var("MATCHREEL_LOG_LEVEL") {
            self.logging.level = v;
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> ReviewResult<()> {
        if !(0.0..=10.0).contains(&self.storage.safety_margin) {
            return Err(ReviewError::Config {
                message: format!(
                    "storage.safety_margin must be within 0..=10, got {}",
                    self.storage.safety_margin
                ),
            });
        }
        for (name, value) in [
            ("clips.pre_roll_secs", self.clips.pre_roll_secs),
            ("clips.post_roll_secs", self.clips.post_roll_secs),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(ReviewError::Config {
                    message: format!("{} must be a non-negative number, got {}", name, value),
                });
            }
        }
        if self.clips.pre_roll_secs + self.clips.post_roll_secs <= 0.0 {
            return Err(ReviewError::Config {
                message: "clip windows cannot be empty".to_string(),
            });
        }
        let level = self.logging.level.to_lowercase();
        if !["trace", "debug", "info", "warn", "error"].contains(&level.as_str()) {
            return Err(ReviewError::Config {
                message: format!(
                    "Invalid log level: {}. Valid levels: trace, debug, info, warn, error",
                    self.logging.level
                ),
            });
        }
        Ok(())
    }

    /// Derive the process-wide paths
    pub fn paths(&self) -> AppPaths {
        AppPaths::new(&self.paths.data_dir, &self.paths.downloads_dir)
    }
}

/// Directories computed once before any request is served
#[derive(Debug, Clone, PartialEq)]
pub struct AppPaths {
    pub data_dir: PathBuf,
    pub work_dir: PathBuf,
    pub logs_dir: PathBuf,
    pub downloads_dir: PathBuf,
}

impl AppPaths {
    pub fn new(data_dir: &Path, downloads_dir: &Path) -> Self {
        Self {
            data_dir: data_dir.to_path_buf(),
            work_dir: data_dir.join("work"),
            logs_dir: data_dir.join("logs"),
            downloads_dir: downloads_dir.to_path_buf(),
        }
    }

    /// Create the working and logs directories if missing
    pub fn ensure_mandatory_folders(&self) -> ReviewResult<()> {
        for folder in [&self.work_dir, &self.logs_dir] {
            if !folder.exists() {
                std::fs::create_dir_all(folder).map_err(|e| ReviewError::Config {
                    message: format!("Failed to create {}: {}", folder.display(), e),
                })?;
                info!(folder = %folder.display(), "Mandatory folder created");
            }
        }
        Ok(())
    }
}

/// Platform data directory (XDG data home, `Application Support`, `%APPDATA%`)
fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .map(|dir| dir.join("matchreel"))
        .or_else(|| dirs::home_dir().map(|home| home.join(".matchreel")))
        .unwrap_or_else(|| PathBuf::from("matchreel-data"))
}

fn default_downloads_dir() -> PathBuf {
    dirs::download_dir()
        .or_else(|| dirs::home_dir().map(|home| home.join("Downloads")))
        .unwrap_or_else(|| PathBuf::from("."))
}
