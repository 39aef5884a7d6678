//! Game repository - one folder per game under the working root
//!
//! Layout:
//!
//! ```text
//! <work>/
//!   2024-01/
//!     game.json      metadata + ordered actions
//!     2024-01.mp4    canonical video
//!   .staging-2024-02-<uuid>/   ingestion in progress
//! ```
//!
//! Ingestion fills a hidden staging folder that is renamed into place once the
//! video and metadata are both written, so a game folder never appears
//! without its metadata. Every mutation rewrites `game.json` through a
//! temporary file and a rename.

use std::collections::HashSet;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use chrono::Utc;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::domain::model::{Action, Game, GameInfo, GameSummary, NewAction};
use crate::domain::rules::{ActionRules, GameNumberRules};
use crate::error::{ReviewError, ReviewResult};

pub const METADATA_FILE: &str = "game.json";
const METADATA_TMP_FILE: &str = ".game.json.tmp";
const STAGING_PREFIX: &str = ".staging-";

/// A staging folder reserved for one ingestion
#[derive(Debug)]
pub struct StagedGame {
    pub game_number: String,
    pub dir: PathBuf,
}

/// What startup reconciliation cleaned up
#[derive(Debug, Default, Clone, PartialEq)]
pub struct ReconcileReport {
    /// Abandoned staging folders and game folders without metadata
    pub removed: Vec<PathBuf>,
}

/// File-backed store of games
#[derive(Debug, Clone)]
pub struct GameRepository {
    work_dir: PathBuf,
    /// Staging folders owned by ingestions still running
    active_staging: Arc<Mutex<HashSet<PathBuf>>>,
}

impl GameRepository {
    pub fn new(work_dir: impl Into<PathBuf>) -> Self {
        Self {
            work_dir: work_dir.into(),
            active_staging: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    pub fn work_dir(&self) -> &Path {
        &self.work_dir
    }

    /// Folder of a game; the game number is validated as a folder name
    pub fn game_dir(&self, game_number: &str) -> ReviewResult<PathBuf> {
        GameNumberRules::validate(game_number)?;
        Ok(self.work_dir.join(game_number))
    }

    pub async fn exists(&self, game_number: &str) -> ReviewResult<bool> {
        let dir = self.game_dir(game_number)?;
        Ok(tokio::fs::try_exists(&dir).await.unwrap_or(false))
    }

    /// Reserve a fresh staging folder for an ingestion
    pub async fn stage(&self, game_number: &str) -> ReviewResult<StagedGame> {
        GameNumberRules::validate(game_number)?;
        let dir = self.work_dir.join(format!(
            "{}{}-{}",
            STAGING_PREFIX,
            game_number,
            uuid::Uuid::new_v4().simple()
        ));
        // Registered before it exists so reconcile never sees it unowned
        self.track_staging(&dir, true);
        if let Err(e) = tokio::fs::create_dir_all(&dir).await {
            self.track_staging(&dir, false);
            return Err(ReviewError::storage("Failed to create staging folder", e));
        }
        debug!(game_number, dir = %dir.display(), "Staging folder created");
        Ok(StagedGame {
            game_number: game_number.to_string(),
            dir,
        })
    }

    /// Drop a staging folder and everything in it
    pub async fn discard(&self, staged: StagedGame) {
        if let Err(e) = tokio::fs::remove_dir_all(&staged.dir).await {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!(dir = %staged.dir.display(), error = %e, "Failed to remove staging folder");
            }
        } else {
            debug!(game_number = %staged.game_number, "Staging folder discarded");
        }
        self.track_staging(&staged.dir, false);
    }

    /// Publish a staged ingestion as a game
    ///
    /// `video` must be a file inside the staging folder. The metadata holds an
    /// empty action list. Without `force` an existing game fails with
    /// `AlreadyExists` and is left untouched; with `force` it is replaced.
    /// The staging folder is consumed on every path.
    pub async fn create(
        &self,
        staged: StagedGame,
        info: GameInfo,
        video: &Path,
        video_duration: Option<f64>,
        force: bool,
    ) -> ReviewResult<Game> {
        match self
            .publish(&staged, info, video, video_duration, force)
            .await
        {
            Ok(game) => {
                self.track_staging(&staged.dir, false);
                Ok(game)
            }
            Err(e) => {
                self.discard(staged).await;
                Err(e)
            }
        }
    }

    async fn publish(
        &self,
        staged: &StagedGame,
        info: GameInfo,
        video: &Path,
        video_duration: Option<f64>,
        force: bool,
    ) -> ReviewResult<Game> {
        if info.game_number != staged.game_number {
            return Err(ReviewError::invalid_request(format!(
                "staged game {} does not match game info {}",
                staged.game_number, info.game_number
            )));
        }
        let target = self.game_dir(&staged.game_number)?;

        let video_file = match (video.parent(), video.file_name()) {
            (Some(parent), Some(name)) if parent == staged.dir.as_path() => {
                name.to_string_lossy().into_owned()
            }
            _ => {
                return Err(ReviewError::invalid_request(format!(
                    "canonical video {} is not inside the staging folder",
                    video.display()
                )))
            }
        };
        if !tokio::fs::try_exists(video).await.unwrap_or(false) {
            return Err(ReviewError::not_found(format!(
                "canonical video {}",
                video.display()
            )));
        }

        let mut game = Game {
            info,
            video_file,
            video_duration,
            created_at: Utc::now(),
            actions: Vec::new(),
            video_path: PathBuf::new(),
        };
        write_metadata(&staged.dir, &game).await?;

        if tokio::fs::try_exists(&target).await.unwrap_or(false) {
            if !force {
                return Err(ReviewError::AlreadyExists {
                    game_number: staged.game_number.clone(),
                });
            }
            info!(game_number = %staged.game_number, "Replacing existing game");
            tokio::fs::remove_dir_all(&target)
                .await
                .map_err(|e| ReviewError::storage("Failed to remove existing game", e))?;
        }

        tokio::fs::rename(&staged.dir, &target)
            .await
            .map_err(|e| ReviewError::storage("Failed to publish game folder", e))?;

        game.video_path = target.join(&game.video_file);
        info!(
            game_number = %game.info.game_number,
            video = %game.video_path.display(),
            "Game created"
        );
        Ok(game)
    }

    /// Read a game; missing folder, metadata or video is `NotFound`
    pub async fn get(&self, game_number: &str) -> ReviewResult<Game> {
        let dir = self.game_dir(game_number)?;
        let metadata_path = dir.join(METADATA_FILE);

        let bytes = match tokio::fs::read(&metadata_path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(ReviewError::not_found(format!("game {}", game_number)))
            }
            Err(e) => return Err(ReviewError::storage("Failed to read game metadata", e)),
        };
        let mut game: Game = serde_json::from_slice(&bytes)
            .map_err(|e| ReviewError::storage("Corrupt game metadata", e))?;

        if game.info.game_number != game_number {
            return Err(ReviewError::storage(
                "Corrupt game metadata",
                format!(
                    "folder {} holds game {:?}",
                    game_number, game.info.game_number
                ),
            ));
        }

        if Path::new(&game.video_file).file_name() != Some(OsStr::new(&game.video_file)) {
            return Err(ReviewError::storage(
                "Corrupt game metadata",
                format!("video file {:?} is not a plain file name", game.video_file),
            ));
        }
        game.video_path = dir.join(&game.video_file);
        if !tokio::fs::try_exists(&game.video_path).await.unwrap_or(false) {
            warn!(game_number, video = %game.video_path.display(), "Canonical video missing");
            return Err(ReviewError::not_found(format!(
                "video of game {}",
                game_number
            )));
        }
        Ok(game)
    }

    /// Delete the whole game folder; `false` if there was none
    pub async fn remove(&self, game_number: &str) -> ReviewResult<bool> {
        let dir = self.game_dir(game_number)?;
        match tokio::fs::remove_dir_all(&dir).await {
            Ok(()) => {
                info!(game_number, "Game removed");
                Ok(true)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(ReviewError::storage("Failed to remove game folder", e)),
        }
    }

    /// Append a validated action under a fresh id
    pub async fn add_action(&self, game_number: &str, new_action: NewAction) -> ReviewResult<Action> {
        let mut game = self.get(game_number).await?;
        ActionRules::validate(&new_action, game.video_duration)?;

        let mut action = Action::from_new(new_action);
        while game.find_action(&action.id).is_some() {
            action.id = uuid::Uuid::new_v4().to_string();
        }
        game.actions.push(action.clone());
        self.save(game_number, &game).await?;

        debug!(game_number, action_id = %action.id, offset = action.offset, "Action added");
        Ok(action)
    }

    /// Remove an action by id; `false` if no such action
    pub async fn remove_action(&self, game_number: &str, action_id: &str) -> ReviewResult<bool> {
        let mut game = self.get(game_number).await?;
        let before = game.actions.len();
        game.actions.retain(|a| a.id != action_id);
        if game.actions.len() == before {
            return Ok(false);
        }
        self.save(game_number, &game).await?;
        debug!(game_number, action_id, "Action removed");
        Ok(true)
    }

    /// Game numbers of every published game folder, sorted
    pub async fn list_existing(&self) -> ReviewResult<Vec<String>> {
        let mut numbers = Vec::new();
        for (name, path) in self.folders().await? {
            if name.starts_with('.') {
                continue;
            }
            if tokio::fs::try_exists(path.join(METADATA_FILE))
                .await
                .unwrap_or(false)
            {
                numbers.push(name);
            }
        }
        numbers.sort();
        Ok(numbers)
    }

    /// Remove leftovers of interrupted ingestions
    ///
    /// Staging folders of ingestions still running in this process are kept.
    pub async fn reconcile(&self) -> ReviewResult<ReconcileReport> {
        let mut report = ReconcileReport::default();
        for (name, path) in self.folders().await? {
            let abandoned = if name.starts_with(STAGING_PREFIX) {
                !self.is_active_staging(&path)
            } else if name.starts_with('.') {
                false
            } else {
                !tokio::fs::try_exists(path.join(METADATA_FILE))
                    .await
                    .unwrap_or(false)
            };
            if !abandoned {
                continue;
            }
            match tokio::fs::remove_dir_all(&path).await {
                Ok(()) => {
                    info!(folder = %path.display(), "Removed incomplete game folder");
                    report.removed.push(path);
                }
                Err(e) => warn!(folder = %path.display(), error = %e, "Failed to remove incomplete folder"),
            }
        }
        Ok(report)
    }

    /// Listing entries for every readable game; unreadable ones are logged and skipped
    pub async fn summaries(&self) -> ReviewResult<Vec<GameSummary>> {
        let mut summaries = Vec::new();
        for game_number in self.list_existing().await? {
            match self.get(&game_number).await {
                Ok(game) => {
                    let mut summary = game.summary();
                    summary.disk_usage = self.disk_usage(&game_number).await;
                    summaries.push(summary);
                }
                Err(e) => warn!(game_number = %game_number, error = %e, "Skipping unreadable game"),
            }
        }
        Ok(summaries)
    }

    /// Bytes used by a game folder
    pub async fn disk_usage(&self, game_number: &str) -> u64 {
        let Ok(dir) = self.game_dir(game_number) else {
            return 0;
        };
        tokio::task::spawn_blocking(move || {
            WalkDir::new(dir)
                .into_iter()
                .filter_map(Result::ok)
                .filter_map(|entry| entry.metadata().ok())
                .filter(|meta| meta.is_file())
                .map(|meta| meta.len())
                .sum()
        })
        .await
        .unwrap_or(0)
    }

    fn track_staging(&self, dir: &Path, active: bool) {
        let Ok(mut staging) = self.active_staging.lock() else {
            return;
        };
        if active {
            staging.insert(dir.to_path_buf());
        } else {
            staging.remove(dir);
        }
    }

    fn is_active_staging(&self, dir: &Path) -> bool {
        self.active_staging
            .lock()
            .map(|staging| staging.contains(dir))
            .unwrap_or(true)
    }

    /// Last-writer-wins full rewrite of the metadata file in the game's folder
    async fn save(&self, game_number: &str, game: &Game) -> ReviewResult<()> {
        let dir = self.game_dir(game_number)?;
        write_metadata(&dir, game).await
    }

    async fn folders(&self) -> ReviewResult<Vec<(String, PathBuf)>> {
        let mut entries = match tokio::fs::read_dir(&self.work_dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(ReviewError::storage("Failed to list working root", e)),
        };

        let mut folders = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| ReviewError::storage("Failed to list working root", e))?
        {
            let is_dir = entry.file_type().await.map(|t| t.is_dir()).unwrap_or(false);
            if is_dir {
                folders.push((entry.file_name().to_string_lossy().into_owned(), entry.path()));
            }
        }
        Ok(folders)
    }
}

async fn write_metadata(dir: &Path, game: &Game) -> ReviewResult<()> {
    let json = serde_json::to_vec_pretty(game)
        .map_err(|e| ReviewError::storage("Failed to serialize game metadata", e))?;

    let tmp = dir.join(METADATA_TMP_FILE);
    let mut file = tokio::fs::File::create(&tmp)
        .await
        .map_err(|e| ReviewError::storage("Failed to write game metadata", e))?;
    file.write_all(&json)
        .await
        .map_err(|e| ReviewError::storage("Failed to write game metadata", e))?;
    file.sync_all()
        .await
        .map_err(|e| ReviewError::storage("Failed to write game metadata", e))?;
    drop(file);

    tokio::fs::rename(&tmp, dir.join(METADATA_FILE))
        .await
        .map_err(|e| ReviewError::storage("Failed to write game metadata", e))
}
