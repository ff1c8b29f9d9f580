// Library surface for the binary and the headless/integration tests.
pub mod app;
pub mod app_dirs;
pub mod config;
pub mod deck;
pub mod error;
pub mod game;
pub mod history;
pub mod input;
pub mod logging;
pub mod permission;
pub mod reconciler;
pub mod runtime;
pub mod session;
pub mod timer;
pub mod ui;

pub use app::{App, AppControl, Mode};
pub use game::Game;
pub use session::{GameState, Score, SessionConfig, SessionView};
