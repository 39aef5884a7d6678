//! Error handling module for MatchReel

use serde::Serialize;
use thiserror::Error;

/// Main error type for MatchReel operations
///
/// Every variant maps onto one [`ErrorKind`] that the UI layer switches on.
/// Filesystem and subprocess errors are translated into one of these at the
/// component boundary; the raw text only travels in `message` and the logs.
#[derive(Error, Debug)]
pub enum ReviewError {
    /// A game folder already exists for this game number
    #[error("Game already exists: {game_number}")]
    AlreadyExists { game_number: String },

    /// The working volume cannot hold the ingested video
    #[error("Not enough disk space: {required} bytes required, {available} bytes available")]
    NotEnoughSpace { required: u64, available: u64 },

    /// Concatenation or single-file copy failed or was cancelled
    #[error("Video concatenation failed: {message}")]
    ConcatenationFailed { message: String },

    /// Time range outside the video or empty
    #[error("Invalid time range: {message}")]
    InvalidRange { message: String },

    /// Game, action or source file not found
    #[error("Not found: {what}")]
    NotFound { what: String },

    /// The destination picker was dismissed
    #[error("Cancelled by user")]
    UserCancelled,

    /// One or more clips could not be extracted
    #[error("Clip extraction failed: {message}")]
    ExtractionFailed { message: String },

    /// Summary document could not be generated
    #[error("Summary generation failed: {message}")]
    GenerationFailed { message: String },

    /// Malformed request
    #[error("Invalid request: {message}")]
    InvalidRequest { message: String },

    /// Game metadata could not be read or written
    #[error("Storage failure: {message}")]
    StorageFailed { message: String },

    /// Configuration error
    #[error("Configuration error: {message}")]
    Config { message: String },
}

/// Result type alias for MatchReel operations
pub type ReviewResult<T> = std::result::Result<T, ReviewError>;

/// Serializable error classification handed to the UI
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    AlreadyExists,
    NotEnoughSpace,
    ConcatenationFailed,
    InvalidRange,
    NotFound,
    UserCancelled,
    ExtractionFailed,
    GenerationFailed,
    InvalidRequest,
    StorageFailed,
    Config,
}

impl ReviewError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ReviewError::AlreadyExists { .. } => ErrorKind::AlreadyExists,
            ReviewError::NotEnoughSpace { .. } => ErrorKind::NotEnoughSpace,
            ReviewError::ConcatenationFailed { .. } => ErrorKind::ConcatenationFailed,
            ReviewError::InvalidRange { .. } => ErrorKind::InvalidRange,
            ReviewError::NotFound { .. } => ErrorKind::NotFound,
            ReviewError::UserCancelled => ErrorKind::UserCancelled,
            ReviewError::ExtractionFailed { .. } => ErrorKind::ExtractionFailed,
            ReviewError::GenerationFailed { .. } => ErrorKind::GenerationFailed,
            ReviewError::InvalidRequest { .. } => ErrorKind::InvalidRequest,
            ReviewError::StorageFailed { .. } => ErrorKind::StorageFailed,
            ReviewError::Config { .. } => ErrorKind::Config,
        }
    }

    /// A deliberate cancel, not a failure the UI should toast
    pub fn is_user_cancelled(&self) -> bool {
        matches!(self, ReviewError::UserCancelled)
    }

    pub(crate) fn not_found(what: impl Into<String>) -> Self {
        ReviewError::NotFound { what: what.into() }
    }

    pub(crate) fn storage(context: &str, err: impl std::fmt::Display) -> Self {
        ReviewError::StorageFailed {
            message: format!("{}: {}", context, err),
        }
    }

    pub(crate) fn invalid_request(message: impl Into<String>) -> Self {
        ReviewError::InvalidRequest {
            message: message.into(),
        }
    }

    pub(crate) fn invalid_range(message: impl Into<String>) -> Self {
        ReviewError::InvalidRange {
            message: message.into(),
        }
    }
}

/// Errors raised by the ffmpeg/ffprobe subprocess layer
#[derive(Error, Debug)]
pub enum MediaError {
    /// Binary missing or not executable
    #[error("ffmpeg/ffprobe binary could not be started: {0}")]
    NotFound(std::io::Error),

    /// Subprocess exited with a failure status
    #[error("ffmpeg/ffprobe execution failed (exit code {exit_code:?}): {stderr}")]
    ExecutionFailed {
        exit_code: Option<i32>,
        stderr: String,
    },

    /// Probe output could not be interpreted
    #[error("failed to parse ffprobe output: {0}")]
    ParseError(String),

    /// Cancelled through the cancellation token
    #[error("operation cancelled")]
    Cancelled,

    /// I/O error
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_maps_every_taxonomy_variant() {
        let err = ReviewError::NotEnoughSpace {
            required: 10,
            available: 5,
        };
        assert_eq!(err.kind(), ErrorKind::NotEnoughSpace);
        assert_eq!(ReviewError::UserCancelled.kind(), ErrorKind::UserCancelled);
        assert_eq!(
            ReviewError::not_found("game 12").kind(),
            ErrorKind::NotFound
        );
    }

    #[test]
    fn test_user_cancelled_is_distinguished() {
        assert!(ReviewError::UserCancelled.is_user_cancelled());
        assert!(!ReviewError::GenerationFailed {
            message: "disk full".to_string()
        }
        .is_user_cancelled());
    }

    #[test]
    fn test_error_kind_serializes_screaming_case() {
        let json = serde_json::to_string(&ErrorKind::NotEnoughSpace).unwrap();
        assert_eq!(json, "\"NOT_ENOUGH_SPACE\"");
    }
}
