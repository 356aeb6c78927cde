use anyhow::{Context, Result};
use crossterm::{
    event::{Event, EventStream, KeyEventKind},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use futures::StreamExt;
use ratatui::{Terminal, backend::CrosstermBackend};
use std::io::{Stderr, stderr};
use std::time::Duration;
use tokio::time::{MissedTickBehavior, interval};
use tracing::{debug, info};

use crate::game::{GameConfig, GameEngine, GameState, RandomSource, TickEvent};
use crate::input::{InputHandler, KeyAction};
use crate::metrics::SessionMetrics;
use crate::render::Renderer;

/// Interactive play in the terminal
pub struct HumanMode<R> {
    engine: GameEngine<R>,
    state: GameState,
    metrics: SessionMetrics,
    renderer: Renderer,
    input_handler: InputHandler,
    should_quit: bool,
    /// The current game has been counted in the session metrics
    game_recorded: bool,
}

impl<R: RandomSource> HumanMode<R> {
    pub fn new(config: GameConfig, rng: R) -> Self {
        let mut engine = GameEngine::new(config, rng);
        let state = engine.reset();

        let mut mode = Self {
            engine,
            state,
            metrics: SessionMetrics::new(),
            renderer: Renderer::new(),
            input_handler: InputHandler::new(),
            should_quit: false,
            game_recorded: false,
        };
        // A 1x1 board is won before the first tick
        mode.record_if_finished();
        mode
    }

    pub async fn run(&mut self) -> Result<()> {
        enable_raw_mode().context("Failed to enable raw mode")?;
        let mut stderr = stderr();
        execute!(stderr, EnterAlternateScreen).context("Failed to enter alternate screen")?;
        let backend = CrosstermBackend::new(stderr);
        let mut terminal = Terminal::new(backend).context("Failed to create terminal")?;
        terminal.hide_cursor().context("Failed to hide cursor")?;
        terminal.clear().context("Failed to clear terminal")?;

        info!(
            grid_size = self.engine.config().grid_size,
            tick_ms = self.engine.config().tick_interval_ms,
            "starting game"
        );

        // Restore the terminal even when the loop fails
        let result = self.run_game_loop(&mut terminal).await;
        self.cleanup_terminal(&mut terminal)?;

        info!(
            games_played = self.metrics.games_played,
            wins = self.metrics.wins,
            best_score = self.metrics.best_score,
            "session finished"
        );
        result
    }

    async fn run_game_loop(
        &mut self,
        terminal: &mut Terminal<CrosstermBackend<Stderr>>,
    ) -> Result<()> {
        let mut event_stream = EventStream::new();

        let mut tick_timer = interval(self.engine.config().tick_interval());
        tick_timer.set_missed_tick_behavior(MissedTickBehavior::Delay);

        // Render at ~30 FPS
        let mut render_timer = interval(Duration::from_millis(33));

        loop {
            tokio::select! {
                maybe_event = event_stream.next() => {
                    match maybe_event {
                        Some(Ok(event)) => self.handle_event(event),
                        Some(Err(err)) => {
                            return Err(err).context("Failed to read terminal event");
                        }
                        None => self.should_quit = true,
                    }
                }

                _ = tick_timer.tick() => {
                    self.update_game();
                }

                _ = render_timer.tick() => {
                    self.metrics.update();
                    terminal.draw(|frame| {
                        self.renderer.render(frame, &self.state, &self.metrics);
                    }).context("Failed to draw frame")?;
                }

                _ = tokio::signal::ctrl_c() => {
                    self.should_quit = true;
                }
            }

            if self.should_quit {
                break;
            }
        }

        Ok(())
    }

    fn handle_event(&mut self, event: Event) {
        let Event::Key(key) = event else {
            return;
        };
        // Only process key press events, not release
        if key.kind != KeyEventKind::Press {
            return;
        }

        match self.input_handler.handle_key_event(key) {
            KeyAction::Turn(direction) => {
                self.state = self.state.queue_direction(direction);
            }
            KeyAction::Restart => self.reset_game(),
            KeyAction::Quit => self.should_quit = true,
            KeyAction::None => {}
        }
    }

    /// One scheduled tick. A finished game is left alone until restart.
    fn update_game(&mut self) {
        if self.state.is_terminal() {
            return;
        }

        let step = self.engine.step(&self.state);
        self.state = step.state;

        if let TickEvent::Moved { ate_food: true } = step.event {
            debug!(score = self.state.score, "score increased");
        }

        self.record_if_finished();
    }

    /// Count the current game once it is over or won
    fn record_if_finished(&mut self) {
        if self.game_recorded || !self.state.is_terminal() {
            return;
        }
        info!(
            status = %self.state.status(),
            score = self.state.score,
            length = self.state.snake.len(),
            ticks = self.state.tick,
            "game ended"
        );
        self.metrics.on_game_end(&self.state);
        self.game_recorded = true;
    }

    fn reset_game(&mut self) {
        self.state = self.engine.reset();
        self.game_recorded = false;
        self.metrics.on_game_start();
        info!("game restarted");
        self.record_if_finished();
    }

    fn cleanup_terminal(
        &mut self,
        terminal: &mut Terminal<CrosstermBackend<Stderr>>,
    ) -> Result<()> {
        disable_raw_mode().context("Failed to disable raw mode")?;
        execute!(terminal.backend_mut(), LeaveAlternateScreen)
            .context("Failed to leave alternate screen")?;
        terminal.show_cursor().context("Failed to show cursor")?;
        Ok(())
    }
}
