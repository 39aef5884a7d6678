//! MatchReel Library
//!
//! Video ingestion and derivation pipeline for volleyball match review:
//! concatenating source recordings into a canonical video per game, tagging
//! actions against it, and exporting clips and summaries.

pub mod adapters;
pub mod app;
pub mod cli;
pub mod domain;
pub mod engine;
pub mod error;
pub mod output;
pub mod ports;
pub mod storage;
pub mod utils;

// Re-export commonly used types
pub use app::{AppContainer, DefaultAppContainer};
pub use domain::model::{Action, Game, GameInfo, GameSummary, NewAction, TimeRange};
pub use error::{ErrorKind, ReviewError, ReviewResult};
