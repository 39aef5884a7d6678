//! Command-line argument definitions

use std::path::PathBuf;

use clap::Args;

use crate::domain::model::{ActionFault, ActionPrecise, ActionSector, MetadataValue};
use crate::utils::TimeParser;

/// Arguments for the create command
#[derive(Args, Debug)]
pub struct CreateArgs {
    /// Game number, also the folder name of the game
    #[arg(short, long)]
    pub game: String,

    /// Source videos in playback order
    #[arg(short, long = "video", required = true, num_args = 1..)]
    pub videos: Vec<PathBuf>,

    /// Metadata field as key=value (repeatable), e.g. opponent=Tours
    #[arg(short, long = "field", value_parser = parse_field)]
    pub fields: Vec<(String, MetadataValue)>,

    /// Replace an existing game with the same number
    #[arg(long)]
    pub force: bool,
}

/// Arguments naming a single game
#[derive(Args, Debug)]
pub struct GameArgs {
    /// Game number
    pub game: String,
}

/// Arguments for the add-action command
#[derive(Args, Debug)]
pub struct AddActionArgs {
    /// Game number
    pub game: String,

    /// Offset in the canonical video (seconds, MM:SS or HH:MM:SS)
    #[arg(short, long, value_parser = parse_offset)]
    pub offset: f64,

    /// Sector (SERVE, RECEPTION, SET, ATTACK, BLOCK, DEFENSE, GAME)
    #[arg(short, long, value_parser = parse_sector)]
    pub sector: ActionSector,

    /// Fault called, must belong to the sector
    #[arg(short, long, value_parser = parse_fault)]
    pub fault: ActionFault,

    /// Review verdict (CORRECT, INCORRECT, DOUBTFUL, NOT_VISIBLE)
    #[arg(short, long, value_parser = parse_precise)]
    pub precise: Option<ActionPrecise>,

    /// Free-form comment
    #[arg(short, long)]
    pub comment: Option<String>,
}

/// Arguments for the remove-action command
#[derive(Args, Debug)]
pub struct RemoveActionArgs {
    /// Game number
    pub game: String,

    /// Action id as shown by `show`
    pub action_id: String,
}

/// Arguments for the export commands
#[derive(Args, Debug)]
pub struct ExportArgs {
    /// Game number
    pub game: String,

    /// Destination file or directory; prompted for when omitted
    #[arg(short, long)]
    pub dest: Option<PathBuf>,
}

fn parse_field(raw: &str) -> Result<(String, MetadataValue), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected key=value, got '{}'", raw))?;
    let key = key.trim();
    if key.is_empty() {
        return Err("metadata key cannot be empty".to_string());
    }
    if key == "gameNumber" {
        return Err("gameNumber is set with --game".to_string());
    }
    Ok((key.to_string(), MetadataValue::parse(value.trim())))
}

fn parse_offset(raw: &str) -> Result<f64, String> {
    TimeParser::parse_time(raw).map_err(|e| e.to_string())
}

fn parse_sector(raw: &str) -> Result<ActionSector, String> {
    ActionSector::parse(raw).ok_or_else(|| format!("unknown sector '{}'", raw))
}

fn parse_fault(raw: &str) -> Result<ActionFault, String> {
    ActionFault::parse(raw).ok_or_else(|| format!("unknown fault '{}'", raw))
}

fn parse_precise(raw: &str) -> Result<ActionPrecise, String> {
    ActionPrecise::parse(raw).ok_or_else(|| format!("unknown verdict '{}'", raw))
}
