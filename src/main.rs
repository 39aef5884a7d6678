//! MatchReel - volleyball match video review
//!
//! Ingests one or more match recordings into a canonical video per game,
//! tags refereeing actions against it and exports videos, clips and PDF
//! summaries.
//!
//! # Usage
//!
//! ```bash
//! matchreel create --game 2024-01 --video part1.mp4 part2.mp4 --field opponent=Tours
//! matchreel add-action 2024-01 --offset 2:05 --sector ATTACK --fault NET_TOUCH
//! matchreel export-clips 2024-01 --dest ~/Downloads
//! ```

use std::process::ExitCode;

use clap::Parser;

use matchreel::cli::{commands, Cli};
use matchreel::error::ReviewError;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let json = cli.json;

    match commands::run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => match err.downcast_ref::<ReviewError>() {
            // A dismissed picker is not a failure
            Some(review) if review.is_user_cancelled() => {
                eprintln!("Cancelled.");
                ExitCode::SUCCESS
            }
            Some(review) => {
                if json {
                    let payload = serde_json::json!({
                        "error": review.kind(),
                        "message": review.to_string(),
                    });
                    println!("{}", payload);
                } else {
                    eprintln!("Error: {}", review);
                }
                ExitCode::FAILURE
            }
            None => {
                eprintln!("Error: {:#}", err);
                ExitCode::FAILURE
            }
        },
    }
}
