//! CLI module for MatchReel
//!
//! This module handles command-line argument parsing and command execution.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

pub mod args;
pub mod commands;

/// MatchReel volleyball match review
///
/// Ingests match recordings, tags refereeing actions on the canonical video
/// and exports videos, clips and PDF summaries.
#[derive(Parser)]
#[command(name = "matchreel")]
#[command(about = "MatchReel - volleyball match video review")]
#[command(version)]
#[command(long_about = None)]
pub struct Cli {
    /// Configuration file (default: <data dir>/matchreel.toml)
    #[arg(long, global = true, env = "MATCHREEL_CONFIG")]
    pub config: Option<PathBuf>,

    /// Logging level, overrides the configuration
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Print results as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// The command to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand)]
pub enum Commands {
    /// Reconcile the working directory and list games
    Init,
    /// Ingest source videos as a new game
    Create(args::CreateArgs),
    /// Show a game and its actions
    Show(args::GameArgs),
    /// Delete a game and its folder
    Remove(args::GameArgs),
    /// Tag an action in a game
    AddAction(args::AddActionArgs),
    /// Remove a tagged action
    RemoveAction(args::RemoveActionArgs),
    /// Export the canonical video
    ExportVideo(args::ExportArgs),
    /// Export one clip per action window
    ExportClips(args::ExportArgs),
    /// Export the canonical video and all clips
    ExportAll(args::ExportArgs),
    /// Export a PDF summary
    ExportPdf(args::ExportArgs),
}

impl Commands {
    /// Destination given on the command line, for export commands
    pub fn destination(&self) -> Option<&PathBuf> {
        match self {
            Commands::ExportVideo(a)
            | Commands::ExportClips(a)
            | Commands::ExportAll(a)
            | Commands::ExportPdf(a) => a.dest.as_ref(),
            _ => None,
        }
    }
}
