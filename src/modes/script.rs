//! Headless runs driven by a fixed list of inputs
//!
//! Each step optionally queues a turn and then applies one tick. Every state,
//! starting with the initial one, is written as a JSON line, so two runs with
//! the same seed and script produce byte-identical output.

use anyhow::{Context, Result};
use serde::Serialize;
use std::io::Write;
use tracing::info;

use crate::game::{
    Direction, GameConfig, GameEngine, GameState, ParseDirectionError, RandomSource,
};

/// One scheduled tick of a script
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScriptStep {
    /// Queue a turn, then tick
    Turn(Direction),
    /// Tick without any input
    Wait,
}

/// Parse a script such as `"up, up left . . down"`.
///
/// Words are separated by commas or whitespace; `.` and `wait` are ticks
/// without input, everything else must be a direction word.
pub fn parse_script(input: &str) -> Result<Vec<ScriptStep>, ParseDirectionError> {
    input
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|word| !word.is_empty())
        .map(|word| match word.to_ascii_lowercase().as_str() {
            "." | "wait" => Ok(ScriptStep::Wait),
            _ => word.parse().map(ScriptStep::Turn),
        })
        .collect()
}

#[derive(Serialize)]
struct Snapshot<'a> {
    status: String,
    #[serde(flatten)]
    state: &'a GameState,
}

/// Plays a script without a terminal
pub struct ScriptMode<R> {
    engine: GameEngine<R>,
    steps: Vec<ScriptStep>,
}

impl<R: RandomSource> ScriptMode<R> {
    pub fn new(config: GameConfig, rng: R, steps: Vec<ScriptStep>) -> Self {
        Self {
            engine: GameEngine::new(config, rng),
            steps,
        }
    }

    /// Play the script, writing one JSON line per state. Stops early once the
    /// game is over or won and returns the last state.
    pub fn run<W: Write>(&mut self, out: &mut W) -> Result<GameState> {
        let mut state = self.engine.reset();
        write_snapshot(out, &state)?;

        for (index, step) in self.steps.iter().enumerate() {
            if state.is_terminal() {
                info!(
                    step = index,
                    remaining = self.steps.len() - index,
                    "game ended before the script did"
                );
                break;
            }
            if let ScriptStep::Turn(direction) = *step {
                state = state.queue_direction(direction);
            }
            state = self.engine.step(&state).state;
            write_snapshot(out, &state)?;
        }

        out.flush().context("Failed to flush output")?;
        info!(
            status = %state.status(),
            score = state.score,
            ticks = state.tick,
            "script finished"
        );
        Ok(state)
    }
}

fn write_snapshot<W: Write>(out: &mut W, state: &GameState) -> Result<()> {
    let snapshot = Snapshot {
        status: state.status().to_string(),
        state,
    };
    serde_json::to_writer(&mut *out, &snapshot).context("Failed to serialize state")?;
    writeln!(out).context("Failed to write output")?;
    Ok(())
}
