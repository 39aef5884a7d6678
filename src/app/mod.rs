// Application layer - Use case interactors

pub mod container;
pub mod export_interactor;
pub mod game_interactor;
pub mod locks;

// Re-export interactors
pub use container::{AppContainer, DefaultAppContainer};
pub use export_interactor::ExportInteractor;
pub use game_interactor::{
    AddActionRequest, CreateGameRequest, GameInteractor, InitAppResponse, RemoveActionRequest,
};
pub use locks::GameLocks;
