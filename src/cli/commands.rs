//! Command implementations

use std::sync::Arc;

use anyhow::{Context, Result};
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::adapters::{
    init_logging, AppConfig, FixedDestinationPicker, PromptDestinationPicker,
};
use crate::app::{
    AddActionRequest, AppContainer, CreateGameRequest, DefaultAppContainer, RemoveActionRequest,
};
use crate::cli::args::{AddActionArgs, CreateArgs, ExportArgs, GameArgs, RemoveActionArgs};
use crate::cli::{Cli, Commands};
use crate::domain::model::{Game, GameInfo, NewAction};
use crate::engine::progress::ConsoleProgressSink;
use crate::output::ExportReport;
use crate::ports::DestinationPicker;
use crate::utils::{TimeParser, Utils};

/// Load configuration, set up logging and run the parsed command
pub async fn run(cli: Cli) -> Result<()> {
    let mut config = AppConfig::load(cli.config.as_deref())?;
    if let Some(level) = &cli.log_level {
        config.logging.level = level.clone();
        config.validate()?;
    }
    let paths = config.paths();
    init_logging(&config.logging, Some(&paths.logs_dir))?;
    debug!(data_dir = %paths.data_dir.display(), "Configuration resolved");

    let picker: Arc<dyn DestinationPicker> = match cli.command.destination() {
        Some(dest) => Arc::new(FixedDestinationPicker::new(Some(dest.clone()))),
        None => Arc::new(PromptDestinationPicker::new(paths.downloads_dir.clone())),
    };
    let container = DefaultAppContainer::new(&config, picker)?;
    let json = cli.json;

    match cli.command {
        Commands::Init => init(&container, json).await,
        Commands::Create(args) => create(&container, args, json).await,
        Commands::Show(args) => show(&container, args, json).await,
        Commands::Remove(args) => remove(&container, args, json).await,
        Commands::AddAction(args) => add_action(&container, args, json).await,
        Commands::RemoveAction(args) => remove_action(&container, args, json).await,
        Commands::ExportVideo(args) => {
            let exports = container.export_interactor();
            let report = exports.download_video_game(&args.game).await?;
            print_report("Video exported", &report, json)
        }
        Commands::ExportClips(args) => {
            let exports = container.export_interactor();
            let report = exports.download_video_clips(&args.game).await?;
            print_report("Clips exported", &report, json)
        }
        Commands::ExportAll(args) => export_all(&container, args, json).await,
        Commands::ExportPdf(args) => {
            let exports = container.export_interactor();
            let report = exports.download_pdf_summary(&args.game).await?;
            print_report("Summary exported", &report, json)
        }
    }
}

async fn init(container: &DefaultAppContainer, json: bool) -> Result<()> {
    let response = container.game_interactor().init_app().await?;
    if json {
        return print_json(&response);
    }

    println!("MatchReel {}", response.app_version);
    println!("Working directory: {}", container.paths().work_dir.display());
    if response.games.is_empty() {
        println!("No games yet.");
    }
    for game in &response.games {
        let duration = game
            .video_duration
            .map(TimeParser::format_time)
            .unwrap_or_else(|| "--:--".to_string());
        println!(
            "  {:<16} {:>8}  {:>3} actions  {:>10}  {}",
            game.game_number,
            duration,
            game.action_count,
            Utils::format_file_size(game.disk_usage),
            game.created_at.format("%Y-%m-%d")
        );
    }
    Ok(())
}

async fn create(container: &DefaultAppContainer, args: CreateArgs, json: bool) -> Result<()> {
    let mut game_info = GameInfo::new(args.game.clone());
    game_info.fields.extend(args.fields);
    let request = CreateGameRequest {
        force: args.force,
        game_info,
        video_paths: args.videos,
    };

    let cancel = CancellationToken::new();
    let ctrl_c = cancel.clone();
    let watcher = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Interrupt received, cancelling ingestion");
            ctrl_c.cancel();
        }
    });

    let sink = Arc::new(ConsoleProgressSink::new(format!("Game {}", args.game)));
    let result = container
        .game_interactor()
        .create_game(request, sink, cancel)
        .await;
    watcher.abort();

    let game = result?;
    if json {
        return print_json(&game);
    }
    println!("Game {} created", game.game_number());
    println!("  video: {}", game.video_path.display());
    Ok(())
}

async fn show(container: &DefaultAppContainer, args: GameArgs, json: bool) -> Result<()> {
    let game = container.game_interactor().get_game(&args.game).await?;
    if json {
        return print_json(&game);
    }
    print_game(&game);
    Ok(())
}

async fn remove(container: &DefaultAppContainer, args: GameArgs, json: bool) -> Result<()> {
    container.game_interactor().remove_game(&args.game).await?;
    if json {
        return print_json(&serde_json::json!({ "removed": args.game }));
    }
    println!("Game {} removed", args.game);
    Ok(())
}

async fn add_action(container: &DefaultAppContainer, args: AddActionArgs, json: bool) -> Result<()> {
    let mut new_action = NewAction::new(args.offset, args.sector, args.fault);
    new_action.precise = args.precise;
    new_action.comment = args.comment.filter(|c| !c.trim().is_empty());

    let action = container
        .game_interactor()
        .add_action(AddActionRequest {
            game_number: args.game,
            new_action,
        })
        .await?;
    if json {
        return print_json(&action);
    }
    println!(
        "Action {} added at {}",
        action.id,
        TimeParser::format_time(action.offset)
    );
    Ok(())
}

async fn remove_action(
    container: &DefaultAppContainer,
    args: RemoveActionArgs,
    json: bool,
) -> Result<()> {
    container
        .game_interactor()
        .remove_action(RemoveActionRequest {
            game_number: args.game.clone(),
            action_id: args.action_id.clone(),
        })
        .await?;
    if json {
        return print_json(&serde_json::json!({ "removed": args.action_id }));
    }
    println!("Action {} removed from game {}", args.action_id, args.game);
    Ok(())
}

async fn export_all(container: &DefaultAppContainer, args: ExportArgs, json: bool) -> Result<()> {
    let report = container
        .export_interactor()
        .download_all_videos(&args.game)
        .await?;
    print_report("Game exported", &report, json)?;
    if !json && !report.failed.is_empty() {
        eprintln!(
            "{} clip(s) could not be extracted; retry with export-clips",
            report.failed.len()
        );
    }
    Ok(())
}

fn print_game(game: &Game) {
    println!("Game {}", game.game_number());
    for (key, value) in &game.info.fields {
        println!("  {}: {}", key, value);
    }
    let duration = game
        .video_duration
        .map(TimeParser::format_time)
        .unwrap_or_else(|| "unknown".to_string());
    println!("  video: {} ({})", game.video_path.display(), duration);
    println!("  actions: {}", game.actions.len());
    for action in &game.actions {
        let precise = action.precise.map(|p| p.as_str()).unwrap_or("-");
        println!(
            "    {}  {:>8}  {:<9} {:<20} {}",
            action.id,
            TimeParser::format_time(action.offset),
            action.sector.as_str(),
            action.fault.as_str(),
            precise
        );
        if let Some(comment) = &action.comment {
            println!("        {}", comment);
        }
    }
}

fn print_report(title: &str, report: &ExportReport, json: bool) -> Result<()> {
    if json {
        return print_json(report);
    }
    println!("{}: {}", title, report.destination.display());
    for file in &report.files {
        println!("  {}", file.display());
    }
    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let out = serde_json::to_string_pretty(value).context("Failed to serialize output")?;
    println!("{}", out);
    Ok(())
}
