use std::sync::Arc;

use crate::adapters::{AppConfig, AppPaths, FfmpegAdapter, LocalDiskAdapter};
use crate::app::{
    export_interactor::ExportInteractor, game_interactor::GameInteractor, locks::GameLocks,
};
use crate::domain::rules::ClipWindowPlanner;
use crate::engine::{ClipExtractor, VideoConcatenator};
use crate::error::ReviewResult;
use crate::output::ExportCoordinator;
use crate::ports::{DestinationPicker, DiskPort, MediaPort};
use crate::storage::{GameRepository, StorageGuard};

pub trait AppContainer: Send + Sync {
    fn game_interactor(&self) -> Arc<GameInteractor>;
    fn export_interactor(&self) -> Arc<ExportInteractor>;
    fn paths(&self) -> &AppPaths;
}

pub struct DefaultAppContainer {
    paths: AppPaths,
    game_interactor: Arc<GameInteractor>,
    export_interactor: Arc<ExportInteractor>,
}

impl DefaultAppContainer {
    /// Wire the production adapters from configuration
    ///
    /// Creates the working and logs directories if they are missing.
    pub fn new(config: &AppConfig, picker: Arc<dyn DestinationPicker>) -> ReviewResult<Self> {
        let paths = config.paths();
        paths.ensure_mandatory_folders()?;

        let media = Arc::new(FfmpegAdapter::new(
            config.media.ffmpeg.clone(),
            config.media.ffprobe.clone(),
        ));
        let disk = Arc::new(LocalDiskAdapter::new());

        Ok(Self::with_ports(config, paths, media, disk, picker))
    }

    /// Wire the components around the given ports
    pub fn with_ports(
        config: &AppConfig,
        paths: AppPaths,
        media: Arc<dyn MediaPort>,
        disk: Arc<dyn DiskPort>,
        picker: Arc<dyn DestinationPicker>,
    ) -> Self {
        let locks = Arc::new(GameLocks::new());
        let repository = Arc::new(GameRepository::new(paths.work_dir.clone()));

        let storage_guard = Arc::new(StorageGuard::new(
            disk,
            paths.work_dir.clone(),
            config.storage.safety_margin,
            config.storage.reserve_bytes,
        ));
        let concatenator = Arc::new(VideoConcatenator::new(
            Arc::clone(&media),
            config.media.reencode_fallback,
        ));
        let extractor = Arc::new(ClipExtractor::new(
            Arc::clone(&media),
            config.media.clip_mode,
        ));
        let coordinator = Arc::new(ExportCoordinator::new(
            Arc::clone(&repository),
            extractor,
            picker,
            ClipWindowPlanner::new(config.clips.pre_roll_secs, config.clips.post_roll_secs),
        ));

        let game_interactor = Arc::new(GameInteractor::new(
            Arc::clone(&repository),
            storage_guard,
            concatenator,
            Arc::clone(&media),
            Arc::clone(&locks),
        ));
        let export_interactor = Arc::new(ExportInteractor::new(coordinator, locks));

        Self {
            paths,
            game_interactor,
            export_interactor,
        }
    }
}

impl AppContainer for DefaultAppContainer {
    fn game_interactor(&self) -> Arc<GameInteractor> {
        Arc::clone(&self.game_interactor)
    }

    fn export_interactor(&self) -> Arc<ExportInteractor> {
        Arc::clone(&self.export_interactor)
    }

    fn paths(&self) -> &AppPaths {
        &self.paths
    }
}
