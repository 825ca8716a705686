// Playback: navigation, resume state and the embedded player

pub mod navigation;
pub mod player;
pub mod ready;
pub mod session;
pub mod state;
pub mod storage;

pub use navigation::{PlaylistNavigator, Transition};
pub use player::{
    ControllerEvent, PlayerBackend, PlayerConfig, PlayerController, PlayerError, PlayerEvent,
    PlayerHost, PlayerSurface, PlayerTiming,
};
pub use ready::ApiReadiness;
pub use session::PlaylistSession;
pub use state::{PlayerState, StateEffect};
pub use storage::{KeyValueStore, MemoryStore, PlaybackStateStore, ResumeState, SqliteStore};
