//! Grid Snake - the classic Snake game on a square grid
//!
//! This library provides:
//! - Core game logic as pure state transitions (game module)
//! - Key mapping for the terminal (input module)
//! - TUI rendering (render module)
//! - Per-session statistics (metrics module)
//! - Interactive and scripted drivers (modes module)

pub mod game;
pub mod input;
pub mod metrics;
pub mod modes;
pub mod render;
