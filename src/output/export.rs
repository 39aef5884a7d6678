//! Export coordinator - copies and derives game media to user-chosen places

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;
use tracing::{info, warn};

use crate::domain::model::{ActionPrecise, ActionSector, Game, TimeRange};
use crate::domain::rules::ClipWindowPlanner;
use crate::engine::clipper::{ClipBatch, ClipExtractor};
use crate::error::{ReviewError, ReviewResult};
use crate::output::pdf::{wrap, PdfLine, PdfWriter};
use crate::ports::DestinationPicker;
use crate::storage::GameRepository;
use crate::utils::{PathUtils, TimeParser};

const COMMENT_WRAP: usize = 90;

/// What an export wrote
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportReport {
    /// File or folder the user picked, or the folder created inside it
    pub destination: PathBuf,
    pub files: Vec<PathBuf>,
    /// Clip ranges that could not be written
    pub failed: Vec<TimeRange>,
}

/// Drives the export modes of a game
///
/// The game is read before the picker opens, so a missing game is `NotFound`
/// without prompting the user; a dismissed picker is `UserCancelled`.
pub struct ExportCoordinator {
    repository: Arc<GameRepository>,
    extractor: Arc<ClipExtractor>,
    picker: Arc<dyn DestinationPicker>,
    planner: ClipWindowPlanner,
    pdf: PdfWriter,
}

impl ExportCoordinator {
    pub fn new(
        repository: Arc<GameRepository>,
        extractor: Arc<ClipExtractor>,
        picker: Arc<dyn DestinationPicker>,
        planner: ClipWindowPlanner,
    ) -> Self {
        Self {
            repository,
            extractor,
            picker,
            planner,
            pdf: PdfWriter::default(),
        }
    }

    /// Copy the canonical video to a file the user picks
    pub async fn export_video(&self, game_number: &str) -> ReviewResult<ExportReport> {
        let game = self.repository.get(game_number).await?;
        let destination = self
            .picker
            .pick_save_file(&game.video_file)
            .await
            .ok_or(ReviewError::UserCancelled)?;

        copy_file(&game.video_path, &destination).await?;
        info!(game_number, destination = %destination.display(), "Video exported");
        Ok(ExportReport {
            destination: destination.clone(),
            files: vec![destination],
            failed: Vec::new(),
        })
    }

    /// Extract one clip per action window into `<picked>/<game>_clips`
    ///
    /// Clips that did succeed stay on disk when others fail; the error then
    /// names the failed ranges.
    pub async fn export_clips(&self, game_number: &str) -> ReviewResult<ExportReport> {
        let game = self.repository.get(game_number).await?;
        let dir = self
            .picker
            .pick_directory()
            .await
            .ok_or(ReviewError::UserCancelled)?;

        let clips_dir = PathUtils::unique_path(&dir, &format!("{}_clips", game_number));
        let batch = self.extract_clips(&game, &clips_dir).await?;
        let report = ExportReport {
            destination: clips_dir,
            files: batch.succeeded(),
            failed: batch.failed_ranges(),
        };

        if !report.failed.is_empty() {
            let ranges: Vec<String> = report.failed.iter().map(|r| r.to_string()).collect();
            return Err(ReviewError::ExtractionFailed {
                message: format!(
                    "{} of {} clips failed: {}",
                    report.failed.len(),
                    batch.outcomes.len(),
                    ranges.join(", ")
                ),
            });
        }
        info!(game_number, clips = report.files.len(), "Clips exported");
        Ok(report)
    }

    /// Full video plus every clip into `<picked>/<game>_export`
    ///
    /// Clip failures are reported in the result, not as an error. When no
    /// clip could be attempted at all, every planned range is reported failed.
    pub async fn export_all_videos(&self, game_number: &str) -> ReviewResult<ExportReport> {
        let game = self.repository.get(game_number).await?;
        let dir = self
            .picker
            .pick_directory()
            .await
            .ok_or(ReviewError::UserCancelled)?;

        let export_dir = PathUtils::unique_path(&dir, &format!("{}_export", game_number));
        tokio::fs::create_dir_all(&export_dir)
            .await
            .map_err(|e| ReviewError::storage("Failed to create export folder", e))?;

        let video = export_dir.join(&game.video_file);
        copy_file(&game.video_path, &video).await?;
        let mut report = ExportReport {
            destination: export_dir.clone(),
            files: vec![video],
            failed: Vec::new(),
        };

        match self.extract_clips(&game, &export_dir.join("clips")).await {
            Ok(batch) => {
                report.files.extend(batch.succeeded());
                report.failed = batch.failed_ranges();
            }
            Err(e) => {
                warn!(game_number, error = %e, "Clips skipped in full export");
                report.failed = self.ranges(&game, game.video_duration);
            }
        }
        if !report.failed.is_empty() {
            warn!(game_number, failed = report.failed.len(), "Some clips were not exported");
        }
        info!(game_number, files = report.files.len(), "Full export finished");
        Ok(report)
    }

    /// Write a PDF summary of the game's metadata and actions
    pub async fn export_pdf_summary(&self, game_number: &str) -> ReviewResult<ExportReport> {
        let game = self.repository.get(game_number).await?;
        let destination = self
            .picker
            .pick_save_file(&format!("{}_summary.pdf", game_number))
            .await
            .ok_or(ReviewError::UserCancelled)?;

        let bytes = self.pdf.render(&summary_lines(&game));
        tokio::fs::write(&destination, bytes)
            .await
            .map_err(|e| ReviewError::GenerationFailed {
                message: format!("cannot write {}: {}", destination.display(), e),
            })?;

        info!(game_number, destination = %destination.display(), "Summary exported");
        Ok(ExportReport {
            destination: destination.clone(),
            files: vec![destination],
            failed: Vec::new(),
        })
    }

    fn ranges(&self, game: &Game, duration: Option<f64>) -> Vec<TimeRange> {
        self.planner
            .plan(&game.actions, duration)
            .iter()
            .map(|w| w.range)
            .collect()
    }

    async fn extract_clips(&self, game: &Game, dir: &Path) -> ReviewResult<ClipBatch> {
        // Windows are clamped to the video even when ingestion could not probe it
        let duration = match game.video_duration {
            Some(duration) => duration,
            None => self.extractor.probe(&game.video_path).await?,
        };
        let ranges = self.ranges(game, Some(duration));
        if ranges.is_empty() {
            info!(game_number = %game.game_number(), "No actions, no clips to extract");
        }
        self.extractor
            .extract_all(&game.video_path, &ranges, dir)
            .await
    }
}

async fn copy_file(source: &Path, destination: &Path) -> ReviewResult<()> {
    if let Some(parent) = destination.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| ReviewError::storage("Failed to create destination folder", e))?;
        }
    }
    tokio::fs::copy(source, destination)
        .await
        .map(|_| ())
        .map_err(|e| ReviewError::storage("Failed to copy video", e))
}

/// Document content of a game summary
pub fn summary_lines(game: &Game) -> Vec<PdfLine> {
    let mut lines = vec![
        PdfLine::Title(format!("Game {}", game.game_number())),
        PdfLine::Blank,
    ];

    for (key, value) in &game.info.fields {
        lines.push(PdfLine::Text(format!("{}: {}", key, value)));
    }
    let duration = game
        .video_duration
        .map(TimeParser::format_time)
        .unwrap_or_else(|| "unknown".to_string());
    lines.push(PdfLine::Text(format!(
        "Video: {} ({})",
        game.video_file, duration
    )));
    lines.push(PdfLine::Text(format!(
        "Created: {}",
        game.created_at.format("%Y-%m-%d %H:%M UTC")
    )));

    lines.push(PdfLine::Blank);
    lines.push(PdfLine::Heading(format!("Actions ({})", game.actions.len())));
    if game.actions.is_empty() {
        lines.push(PdfLine::Text("No actions tagged.".to_string()));
    }
    for (i, action) in game.actions.iter().enumerate() {
        let precise = action
            .precise
            .map(|p| p.as_str())
            .unwrap_or("NOT_REVIEWED");
        lines.push(PdfLine::Text(format!(
            "{:>3}. {}  {}  {}  {}",
            i + 1,
            TimeParser::format_time(action.offset),
            action.sector,
            action.fault,
            precise
        )));
        if let Some(comment) = action.comment.as_deref() {
            for chunk in wrap(comment, COMMENT_WRAP) {
                lines.push(PdfLine::Text(format!("       {}", chunk)));
            }
        }
    }

    if !game.actions.is_empty() {
        let mut by_sector: BTreeMap<ActionSector, usize> = BTreeMap::new();
        let mut by_precise: BTreeMap<Option<ActionPrecise>, usize> = BTreeMap::new();
        for action in &game.actions {
            *by_sector.entry(action.sector).or_default() += 1;
            *by_precise.entry(action.precise).or_default() += 1;
        }

        lines.push(PdfLine::Blank);
        lines.push(PdfLine::Heading("By sector".to_string()));
        for (sector, count) in by_sector {
            lines.push(PdfLine::Text(format!("{}: {}", sector, count)));
        }

        lines.push(PdfLine::Blank);
        lines.push(PdfLine::Heading("Review verdicts".to_string()));
        for (precise, count) in by_precise {
            let label = precise.map(|p| p.as_str()).unwrap_or("NOT_REVIEWED");
            lines.push(PdfLine::Text(format!("{}: {}", label, count)));
        }
    }
    lines
}
