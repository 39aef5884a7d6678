// Export interactor - Serializes export requests per game

use std::sync::Arc;

use crate::app::locks::GameLocks;
use crate::error::ReviewResult;
use crate::output::{ExportCoordinator, ExportReport};

/// Interactor for the download use cases
pub struct ExportInteractor {
    coordinator: Arc<ExportCoordinator>,
    locks: Arc<GameLocks>,
}

impl ExportInteractor {
    pub fn new(coordinator: Arc<ExportCoordinator>, locks: Arc<GameLocks>) -> Self {
        Self { coordinator, locks }
    }

    pub async fn download_video_game(&self, game_number: &str) -> ReviewResult<ExportReport> {
        let _lock = self.locks.acquire(game_number).await;
        self.coordinator.export_video(game_number).await
    }

    pub async fn download_video_clips(&self, game_number: &str) -> ReviewResult<ExportReport> {
        let _lock = self.locks.acquire(game_number).await;
        self.coordinator.export_clips(game_number).await
    }

    pub async fn download_all_videos(&self, game_number: &str) -> ReviewResult<ExportReport> {
        let _lock = self.locks.acquire(game_number).await;
        self.coordinator.export_all_videos(game_number).await
    }

    pub async fn download_pdf_summary(&self, game_number: &str) -> ReviewResult<ExportReport> {
        let _lock = self.locks.acquire(game_number).await;
        self.coordinator.export_pdf_summary(game_number).await
    }
}
