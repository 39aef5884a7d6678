// Game interactor - Orchestrates ingestion and action tagging use cases

use std::path::PathBuf;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::app::locks::GameLocks;
use crate::domain::model::*;
use crate::domain::rules::GameNumberRules;
use crate::engine::concat::VideoConcatenator;
use crate::engine::progress::{ProgressSink, ProgressTracker};
use crate::error::{ReviewError, ReviewResult};
use crate::ports::MediaPort;
use crate::storage::{GameRepository, StorageGuard};

/// Request to ingest a new game
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateGameRequest {
    /// Replace an existing game with the same number
    #[serde(default)]
    pub force: bool,
    pub game_info: GameInfo,
    /// Source recordings in playback order
    pub video_paths: Vec<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddActionRequest {
    pub game_number: String,
    pub new_action: NewAction,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoveActionRequest {
    pub game_number: String,
    pub action_id: String,
}

/// Startup payload for the UI
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InitAppResponse {
    pub app_version: String,
    pub games: Vec<GameSummary>,
}

/// Interactor for game lifecycle and tagging
pub struct GameInteractor {
    repository: Arc<GameRepository>,
    storage_guard: Arc<StorageGuard>,
    concatenator: Arc<VideoConcatenator>,
    media: Arc<dyn MediaPort>,
    locks: Arc<GameLocks>,
}

impl GameInteractor {
    /// Create new game interactor with injected collaborators
    pub fn new(
        repository: Arc<GameRepository>,
        storage_guard: Arc<StorageGuard>,
        concatenator: Arc<VideoConcatenator>,
        media: Arc<dyn MediaPort>,
        locks: Arc<GameLocks>,
    ) -> Self {
        Self {
            repository,
            storage_guard,
            concatenator,
            media,
            locks,
        }
    }

    /// Clean up interrupted ingestions and list the games
    pub async fn init_app(&self) -> ReviewResult<InitAppResponse> {
        let report = self.repository.reconcile().await?;
        if !report.removed.is_empty() {
            info!(removed = report.removed.len(), "Startup reconciliation cleaned up folders");
        }
        let games = self.repository.summaries().await?;
        info!(games = games.len(), "Application initialized");
        Ok(InitAppResponse {
            app_version: env!("CARGO_PKG_VERSION").to_string(),
            games,
        })
    }

    /// Ingest source videos as a new game
    ///
    /// Order of checks: request shape, existing game, sources present, free
    /// space. None of them creates anything on disk. Progress of the
    /// concatenation goes to `sink`; cancelling `cancel` aborts it.
    pub async fn create_game(
        &self,
        request: CreateGameRequest,
        sink: Arc<dyn ProgressSink>,
        cancel: CancellationToken,
    ) -> ReviewResult<Game> {
        let game_number = request.game_info.game_number.clone();
        GameNumberRules::validate(&game_number)?;
        if request.video_paths.is_empty() {
            return Err(ReviewError::invalid_request(
                "at least one source video is required",
            ));
        }

        let _lock = self.locks.acquire(&game_number).await;
        info!(
            game_number = %game_number,
            sources = request.video_paths.len(),
            force = request.force,
            "Creating game"
        );

        if !request.force && self.repository.exists(&game_number).await? {
            return Err(ReviewError::AlreadyExists { game_number });
        }

        for path in &request.video_paths {
            if !tokio::fs::try_exists(path).await.unwrap_or(false) {
                return Err(ReviewError::not_found(format!(
                    "source video {}",
                    path.display()
                )));
            }
        }

        let space = self.storage_guard.check(&request.video_paths).await;
        if !space.enough {
            warn!(
                game_number = %game_number,
                required = space.required,
                available = space.available,
                "Not enough space to ingest game"
            );
            return Err(ReviewError::NotEnoughSpace {
                required: space.required,
                available: space.available,
            });
        }

        let tracker = ProgressTracker::new(&format!("Creating game {}", game_number));
        tracker.add_sink(sink);

        let staged = self.repository.stage(&game_number).await?;
        let video = match self
            .concatenator
            .concat(
                &game_number,
                &request.video_paths,
                &staged.dir,
                &tracker,
                &cancel,
            )
            .await
        {
            Ok(video) => video,
            Err(e) => {
                self.repository.discard(staged).await;
                return Err(e);
            }
        };

        let duration = match self.media.probe_duration(&video).await {
            Ok(duration) => Some(duration),
            Err(e) => {
                warn!(game_number = %game_number, error = %e, "Could not probe canonical video");
                None
            }
        };

        self.repository
            .create(staged, request.game_info, &video, duration, request.force)
            .await
    }

    pub async fn get_game(&self, game_number: &str) -> ReviewResult<Game> {
        self.repository.get(game_number).await
    }

    /// Delete a game and everything in its folder
    pub async fn remove_game(&self, game_number: &str) -> ReviewResult<()> {
        let _lock = self.locks.acquire(game_number).await;
        if self.repository.remove(game_number).await? {
            Ok(())
        } else {
            Err(ReviewError::not_found(format!("game {}", game_number)))
        }
    }

    pub async fn add_action(&self, request: AddActionRequest) -> ReviewResult<Action> {
        let _lock = self.locks.acquire(&request.game_number).await;
        self.repository
            .add_action(&request.game_number, request.new_action)
            .await
    }

    pub async fn remove_action(&self, request: RemoveActionRequest) -> ReviewResult<()> {
        let _lock = self.locks.acquire(&request.game_number).await;
        if self
            .repository
            .remove_action(&request.game_number, &request.action_id)
            .await?
        {
            Ok(())
        } else {
            Err(ReviewError::not_found(format!(
                "action {} in game {}",
                request.action_id, request.game_number
            )))
        }
    }
}
