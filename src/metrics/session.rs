use std::time::{Duration, Instant};

use crate::game::{GameState, GameStatus};

/// Statistics for the current terminal session. Nothing here is persisted.
pub struct SessionMetrics {
    pub game_started: Instant,
    pub elapsed_time: Duration,
    pub games_played: u32,
    pub wins: u32,
    pub best_score: u32,
    pub longest_snake: usize,
    clock_stopped: bool,
}

impl SessionMetrics {
    pub fn new() -> Self {
        Self {
            game_started: Instant::now(),
            elapsed_time: Duration::ZERO,
            games_played: 0,
            wins: 0,
            best_score: 0,
            longest_snake: 0,
            clock_stopped: false,
        }
    }

    /// Refresh the game clock; frozen once the game has ended
    pub fn update(&mut self) {
        if !self.clock_stopped {
            self.elapsed_time = self.game_started.elapsed();
        }
    }

    pub fn on_game_start(&mut self) {
        self.game_started = Instant::now();
        self.elapsed_time = Duration::ZERO;
        self.clock_stopped = false;
    }

    /// Record a finished game. Call once per game, when its state turns terminal.
    pub fn on_game_end(&mut self, state: &GameState) {
        self.update();
        self.clock_stopped = true;
        self.games_played += 1;
        if state.status() == GameStatus::Won {
            self.wins += 1;
        }
        self.best_score = self.best_score.max(state.score);
        self.longest_snake = self.longest_snake.max(state.snake.len());
    }

    pub fn format_time(&self) -> String {
        let total_secs = self.elapsed_time.as_secs();
        format!("{:02}:{:02}", total_secs / 60, total_secs % 60)
    }
}

impl Default for SessionMetrics {
    fn default() -> Self {
        Self::new()
    }
}
