use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use matchreel::adapters::{AppConfig, AppPaths, FixedDestinationPicker};
use matchreel::app::{AddActionRequest, CreateGameRequest, RemoveActionRequest};
use matchreel::domain::model::*;
use matchreel::engine::progress::{ChannelProgressSink, NoOpProgressSink, ProgressEvent, ProgressTracker};
use matchreel::error::{ErrorKind, MediaError};
use matchreel::ports::{ConcatJob, DestinationPicker, DiskPort, ExtractJob, MediaPort};
use matchreel::{AppContainer, DefaultAppContainer};
use tempfile::TempDir;
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;

/// Test doubles: a "video" is a text file holding its duration in seconds
mod test_utils {
    use super::*;

    #[derive(Default)]
    pub struct FakeMedia {
        pub fail_concat: AtomicBool,
        pub fail_probe: AtomicBool,
        /// When set, concat waits for `release` after signalling `concat_started`
        pub hold_concat: AtomicBool,
        pub concat_started: Notify,
        pub release: Notify,
    }

    fn read_duration(path: &Path) -> Result<f64, MediaError> {
        let text = std::fs::read_to_string(path)?;
        text.trim()
            .parse()
            .map_err(|_| MediaError::ParseError(format!("not a fake video: {}", path.display())))
    }

    #[async_trait]
    impl MediaPort for FakeMedia {
        async fn probe_duration(&self, path: &Path) -> Result<f64, MediaError> {
            if self.fail_probe.load(Ordering::SeqCst) {
                return Err(MediaError::ParseError("moov atom not found".to_string()));
            }
            read_duration(path)
        }

        async fn concat(
            &self,
            job: &ConcatJob,
            tracker: &ProgressTracker,
            _cancel: &CancellationToken,
        ) -> Result<(), MediaError> {
            std::fs::write(&job.output, b"partial")?;
            if self.hold_concat.load(Ordering::SeqCst) {
                self.concat_started.notify_one();
                self.release.notified().await;
            }
            if self.fail_concat.load(Ordering::SeqCst) {
                return Err(MediaError::ExecutionFailed {
                    exit_code: Some(1),
                    stderr: "Invalid data found when processing input".to_string(),
                });
            }

            let manifest = std::fs::read_to_string(&job.manifest)?;
            let mut total = 0.0;
            for line in manifest.lines() {
                let path = line
                    .strip_prefix("file '")
                    .and_then(|rest| rest.strip_suffix('\''))
                    .ok_or_else(|| MediaError::ParseError(line.to_string()))?;
                total += read_duration(Path::new(path))?;
                tracker.update_fraction(total / job.expected_duration);
            }
            std::fs::write(&job.output, total.to_string())?;
            Ok(())
        }

        async fn extract(&self, job: &ExtractJob) -> Result<(), MediaError> {
            std::fs::write(&job.output, job.range.duration().to_string())?;
            Ok(())
        }
    }

    pub struct FakeDisk {
        pub available: AtomicU64,
    }

    #[async_trait]
    impl DiskPort for FakeDisk {
        async fn file_size(&self, path: &Path) -> std::io::Result<u64> {
            Ok(std::fs::metadata(path)?.len())
        }

        async fn available_space(&self, _dir: &Path) -> std::io::Result<u64> {
            Ok(self.available.load(Ordering::SeqCst))
        }
    }

    pub struct Harness {
        pub data: TempDir,
        pub sources: TempDir,
        pub downloads: TempDir,
        pub media: Arc<FakeMedia>,
        pub disk: Arc<FakeDisk>,
        pub container: DefaultAppContainer,
    }

    impl Harness {
        pub fn new() -> Self {
            Self::with_picker(None)
        }

        pub fn with_picker(destination: Option<PathBuf>) -> Self {
            let data = TempDir::new().unwrap();
            let sources = TempDir::new().unwrap();
            let downloads = TempDir::new().unwrap();
            let media = Arc::new(FakeMedia::default());
            let disk = Arc::new(FakeDisk {
                available: AtomicU64::new(u64::MAX / 2),
            });

            let destination = destination.map(|d| {
                if d.is_relative() {
                    downloads.path().join(d)
                } else {
                    d
                }
            });
            let picker: Arc<dyn DestinationPicker> =
                Arc::new(FixedDestinationPicker::new(destination));
            let paths = AppPaths::new(data.path(), downloads.path());
            let container = DefaultAppContainer::with_ports(
                &AppConfig::default(),
                paths,
                media.clone(),
                disk.clone(),
                picker,
            );

            Self {
                data,
                sources,
                downloads,
                media,
                disk,
                container,
            }
        }

        pub fn work_dir(&self) -> PathBuf {
            self.container.paths().work_dir.clone()
        }

        /// Source recording of `duration` seconds
        pub fn source(&self, name: &str, duration: f64) -> PathBuf {
            let path = self.sources.path().join(name);
            std::fs::write(&path, duration.to_string()).unwrap();
            path
        }

        pub fn request(&self, game_number: &str, videos: Vec<PathBuf>, force: bool) -> CreateGameRequest {
            CreateGameRequest {
                force,
                game_info: GameInfo::new(game_number)
                    .with_field("opponent", MetadataValue::Text("Tours".to_string())),
                video_paths: videos,
            }
        }

        pub async fn create(&self, request: CreateGameRequest) -> matchreel::ReviewResult<Game> {
            self.container
                .game_interactor()
                .create_game(request, Arc::new(NoOpProgressSink), CancellationToken::new())
                .await
        }

        pub fn work_entries(&self) -> Vec<String> {
            match std::fs::read_dir(self.work_dir()) {
                Ok(entries) => entries
                    .filter_map(Result::ok)
                    .map(|e| e.file_name().to_string_lossy().into_owned())
                    .collect(),
                Err(_) => Vec::new(),
            }
        }
    }
}

use test_utils::Harness;

fn attack_net_touch(offset: f64) -> NewAction {
    NewAction::new(offset, ActionSector::Attack, ActionFault::NetTouch)
}

#[tokio::test]
async fn test_create_tag_remove_scenario() {
    let h = Harness::new();
    let games = h.container.game_interactor();

    let videos = vec![h.source("part1.mp4", 600.0), h.source("part2.mp4", 600.0)];
    let game = h.create(h.request("2024-01", videos, false)).await.unwrap();

    assert_eq!(game.game_number(), "2024-01");
    assert!(game.video_path.exists());
    assert_eq!(game.video_duration, Some(1200.0));

    let read = games.get_game("2024-01").await.unwrap();
    assert_eq!(read.video_path, game.video_path);

    let action = games
        .add_action(AddActionRequest {
            game_number: "2024-01".to_string(),
            new_action: attack_net_touch(125.0),
        })
        .await
        .unwrap();
    let read = games.get_game("2024-01").await.unwrap();
    assert_eq!(read.actions.len(), 1);
    assert_eq!(read.actions[0].offset, 125.0);
    assert_eq!(read.actions[0], action);

    games.remove_game("2024-01").await.unwrap();
    let err = games.get_game("2024-01").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
    assert!(!h.work_dir().join("2024-01").exists());
}

#[tokio::test]
async fn test_create_without_force_keeps_existing_game() {
    let h = Harness::new();
    let games = h.container.game_interactor();
    h.create(h.request("7", vec![h.source("a.mp4", 60.0)], false))
        .await
        .unwrap();
    games
        .add_action(AddActionRequest {
            game_number: "7".to_string(),
            new_action: attack_net_touch(10.0),
        })
        .await
        .unwrap();
    let metadata = h.work_dir().join("7").join("game.json");
    let before = std::fs::read(&metadata).unwrap();

    let err = h
        .create(h.request("7", vec![h.source("b.mp4", 90.0)], false))
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::AlreadyExists);
    assert_eq!(std::fs::read(&metadata).unwrap(), before);
    assert_eq!(h.work_entries(), vec!["7".to_string()]);
}

#[tokio::test]
async fn test_create_with_force_replaces_game() {
    let h = Harness::new();
    let games = h.container.game_interactor();
    h.create(h.request("7", vec![h.source("a.mp4", 60.0)], false))
        .await
        .unwrap();
    games
        .add_action(AddActionRequest {
            game_number: "7".to_string(),
            new_action: attack_net_touch(10.0),
        })
        .await
        .unwrap();

    let game = h
        .create(h.request("7", vec![h.source("b.mp4", 90.0)], true))
        .await
        .unwrap();

    assert!(game.actions.is_empty());
    let read = games.get_game("7").await.unwrap();
    assert!(read.actions.is_empty());
    assert_eq!(read.video_duration, Some(90.0));
}

#[tokio::test]
async fn test_not_enough_space_creates_nothing() {
    let h = Harness::new();
    h.disk.available.store(10, Ordering::SeqCst);

    let videos = vec![h.source("a.mp4", 600.0), h.source("b.mp4", 600.0)];
    let err = h.create(h.request("2024-01", videos, false)).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::NotEnoughSpace);
    assert!(h.work_entries().is_empty());
}

#[tokio::test]
async fn test_single_source_is_space_checked_too() {
    let h = Harness::new();
    h.disk.available.store(10, Ordering::SeqCst);

    let err = h
        .create(h.request("1", vec![h.source("a.mp4", 600.0)], false))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotEnoughSpace);
}

#[tokio::test]
async fn test_missing_source_is_not_found() {
    let h = Harness::new();
    let err = h
        .create(h.request("1", vec![h.sources.path().join("nope.mp4")], false))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
    assert!(h.work_entries().is_empty());
}

#[tokio::test]
async fn test_concat_failure_rolls_back() {
    let h = Harness::new();
    h.media.fail_concat.store(true, Ordering::SeqCst);

    let videos = vec![h.source("a.mp4", 600.0), h.source("b.mp4", 600.0)];
    let err = h.create(h.request("3", videos, false)).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::ConcatenationFailed);
    assert!(h.work_entries().is_empty());
    let err = h.container.game_interactor().get_game("3").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn test_invalid_requests() {
    let h = Harness::new();
    let err = h.create(h.request("1", Vec::new(), false)).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidRequest);

    let err = h
        .create(h.request("../1", vec![h.source("a.mp4", 1.0)], false))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidRequest);
}

#[tokio::test]
async fn test_progress_is_monotonic_and_completes() {
    let h = Harness::new();
    let (sink, mut rx) = ChannelProgressSink::channel();
    let videos = vec![
        h.source("a.mp4", 300.0),
        h.source("b.mp4", 300.0),
        h.source("c.mp4", 300.0),
    ];

    h.container
        .game_interactor()
        .create_game(h.request("9", videos, false), Arc::new(sink), CancellationToken::new())
        .await
        .unwrap();

    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    let percents: Vec<u8> = events
        .iter()
        .filter_map(|e| match e {
            ProgressEvent::Progress { percent } => Some(*percent),
            _ => None,
        })
        .collect();
    assert!(percents.windows(2).all(|w| w[0] <= w[1]));
    assert_eq!(percents.last(), Some(&100));
    assert_eq!(events.last(), Some(&ProgressEvent::Completed));
}

#[tokio::test]
async fn test_remove_action_round_trip_and_unknown_ids() {
    let h = Harness::new();
    let games = h.container.game_interactor();
    h.create(h.request("5", vec![h.source("a.mp4", 600.0)], false))
        .await
        .unwrap();

    for offset in [5.0, 50.0, 500.0] {
        games
            .add_action(AddActionRequest {
                game_number: "5".to_string(),
                new_action: attack_net_touch(offset),
            })
            .await
            .unwrap();
    }
    let before = games.get_game("5").await.unwrap().actions;

    let added = games
        .add_action(AddActionRequest {
            game_number: "5".to_string(),
            new_action: NewAction::new(42.0, ActionSector::Serve, ActionFault::FootFault)
                .with_precise(ActionPrecise::Doubtful),
        })
        .await
        .unwrap();
    games
        .remove_action(RemoveActionRequest {
            game_number: "5".to_string(),
            action_id: added.id.clone(),
        })
        .await
        .unwrap();
    assert_eq!(games.get_game("5").await.unwrap().actions, before);

    let err = games
        .remove_action(RemoveActionRequest {
            game_number: "5".to_string(),
            action_id: added.id,
        })
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);

    let err = games.remove_game("missing").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn test_concurrent_tagging_loses_no_action() {
    let h = Harness::new();
    h.create(h.request("8", vec![h.source("a.mp4", 600.0)], false))
        .await
        .unwrap();

    let games = h.container.game_interactor();
    let tasks: Vec<_> = (0..16)
        .map(|i| {
            let games = games.clone();
            tokio::spawn(async move {
                games
                    .add_action(AddActionRequest {
                        game_number: "8".to_string(),
                        new_action: attack_net_touch(i as f64),
                    })
                    .await
            })
        })
        .collect();
    for task in tasks {
        task.await.unwrap().unwrap();
    }

    assert_eq!(games.get_game("8").await.unwrap().actions.len(), 16);
}

#[tokio::test]
async fn test_init_app_reconciles_and_lists() {
    let h = Harness::new();
    h.create(h.request("1", vec![h.source("a.mp4", 60.0)], false))
        .await
        .unwrap();
    std::fs::create_dir_all(h.work_dir().join(".staging-2-deadbeef")).unwrap();
    std::fs::create_dir_all(h.work_dir().join("half-created")).unwrap();

    let response = h.container.game_interactor().init_app().await.unwrap();

    assert_eq!(response.app_version, env!("CARGO_PKG_VERSION"));
    assert_eq!(response.games.len(), 1);
    assert_eq!(response.games[0].game_number, "1");
    assert_eq!(response.games[0].info.fields.get("opponent"), Some(&MetadataValue::Text("Tours".to_string())));
    assert_eq!(h.work_entries(), vec!["1".to_string()]);
}

#[tokio::test]
async fn test_exports_distinguish_cancel_from_failure() {
    let h = Harness::new();
    h.create(h.request("4", vec![h.source("a.mp4", 60.0)], false))
        .await
        .unwrap();
    let exports = h.container.export_interactor();

    let err = exports.download_video_game("4").await.unwrap_err();
    assert!(err.is_user_cancelled());
    let err = exports.download_pdf_summary("4").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UserCancelled);

    let err = exports.download_video_clips("nope").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn test_exports_to_picked_directory() {
    let h = Harness::with_picker(Some(PathBuf::from(".")));
    let games = h.container.game_interactor();
    h.create(h.request("4", vec![h.source("a.mp4", 600.0)], false))
        .await
        .unwrap();
    for offset in [100.0, 400.0] {
        games
            .add_action(AddActionRequest {
                game_number: "4".to_string(),
                new_action: attack_net_touch(offset),
            })
            .await
            .unwrap();
    }
    let exports = h.container.export_interactor();

    let video = exports.download_video_game("4").await.unwrap();
    assert!(video.destination.exists());

    let clips = exports.download_video_clips("4").await.unwrap();
    assert_eq!(clips.files.len(), 2);
    assert!(clips.destination.starts_with(h.downloads.path()));

    let all = exports.download_all_videos("4").await.unwrap();
    assert_eq!(all.files.len(), 3);
    assert!(all.failed.is_empty());

    let pdf = exports.download_pdf_summary("4").await.unwrap();
    assert!(std::fs::read(&pdf.destination).unwrap().starts_with(b"%PDF"));
    assert!(h.data.path().join("work").join("4").join("4.mp4").exists());
}

#[tokio::test]
async fn test_init_app_during_ingestion_keeps_it_alive() {
    let h = Harness::new();
    h.media.hold_concat.store(true, Ordering::SeqCst);
    let games = h.container.game_interactor();

    let request = h.request(
        "2024-01",
        vec![h.source("a.mp4", 600.0), h.source("b.mp4", 600.0)],
        false,
    );
    let ingesting = {
        let games = games.clone();
        tokio::spawn(async move {
            games
                .create_game(request, Arc::new(NoOpProgressSink), CancellationToken::new())
                .await
        })
    };
    h.media.concat_started.notified().await;

    let response = games.init_app().await.unwrap();
    assert!(response.games.is_empty());

    h.media.release.notify_one();
    let game = ingesting.await.unwrap().unwrap();
    assert_eq!(game.video_duration, Some(1200.0));
    assert_eq!(h.work_entries(), vec!["2024-01".to_string()]);
}
