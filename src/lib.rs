//! Falling-block puzzle engine.
//!
//! The crate holds the game rules only: the [`grid::Grid`], the falling
//! [`piece::Piece`] and the [`game::GameEngine`] state machine. Drawing,
//! key bindings and timers belong to the host; the host feeds the engine
//! [`game::Command`]s and `tick()` calls and reads its state back after each one.
//!
//! ```
//! use blockfall::{Command, GameConfig, GameEngine, GameState};
//!
//! let mut engine = GameEngine::new(GameConfig::default()).unwrap();
//! engine.command(Command::MoveLeft);
//! engine.command(Command::HardDrop);
//! assert_eq!(engine.state(), GameState::Falling);
//! assert_eq!(engine.tick_delay(), engine.config().base_delay);
//! ```

pub mod config;
pub mod error;
pub mod game;
pub mod grid;
pub mod piece;

pub use config::GameConfig;
pub use error::{GameError, Result};
pub use game::{Clock, Command, GameEngine, GameEvent, GameState, StepOutcome, SystemClock};
pub use grid::{CellState, Grid};
pub use piece::{Piece, PieceKind, PieceProvider, Position, Rotation};
