// Storage - Working-root persistence and capacity checks

pub mod guard;
pub mod repository;

pub use guard::{SpaceCheck, StorageGuard};
pub use repository::{GameRepository, ReconcileReport, StagedGame, METADATA_FILE};
