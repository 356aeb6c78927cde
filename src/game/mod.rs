//! Core game logic module for Snake
//!
//! Pure state transitions with no I/O or rendering dependencies. Every
//! transition takes a state by reference and returns a new one; randomness is
//! always passed in, so a fixed random sequence replays the same game.

pub mod config;
pub mod direction;
pub mod engine;
pub mod rng;
pub mod state;

// Re-export commonly used types
pub use config::{ConfigError, GameConfig};
pub use direction::{Direction, ParseDirectionError};
pub use engine::{FOOD_SCORE, GameEngine, Step, TickEvent, place_food};
pub use rng::{RandomSource, ScriptedRandom};
pub use state::{CollisionKind, EmptySnakeError, GameState, GameStatus, Position, Snake};
