use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Direction, Layout},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Paragraph},
};

use std::collections::HashSet;

use crate::game::{GameState, GameStatus, Position};
use crate::metrics::SessionMetrics;

/// What occupies a single board cell
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cell {
    Head,
    Body,
    Food,
    Empty,
}

impl Cell {
    /// `occupied` is the snake's cell set, built once per frame
    pub fn at(state: &GameState, occupied: &HashSet<Position>, pos: Position) -> Cell {
        if pos == state.snake.head() {
            Cell::Head
        } else if occupied.contains(&pos) {
            Cell::Body
        } else if state.food == Some(pos) {
            Cell::Food
        } else {
            Cell::Empty
        }
    }

    fn span(self) -> Span<'static> {
        match self {
            Cell::Head => Span::styled(
                "■ ",
                Style::default()
                    .fg(Color::Cyan)
                    .add_modifier(Modifier::BOLD),
            ),
            Cell::Body => Span::styled("□ ", Style::default().fg(Color::Green)),
            Cell::Food => Span::styled(
                "O ",
                Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
            ),
            Cell::Empty => Span::styled(". ", Style::default().fg(Color::DarkGray)),
        }
    }
}

/// Projects a game state onto the terminal
pub struct Renderer;

impl Renderer {
    pub fn new() -> Self {
        Self
    }

    pub fn render(&self, frame: &mut Frame, state: &GameState, metrics: &SessionMetrics) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3), // Header
                Constraint::Min(0),    // Board
                Constraint::Length(3), // Footer
            ])
            .split(frame.area());

        frame.render_widget(self.render_stats(state, metrics), chunks[0]);

        let game_area = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([
                Constraint::Percentage(10),
                Constraint::Percentage(80),
                Constraint::Percentage(10),
            ])
            .split(chunks[1])[1];

        match state.status() {
            GameStatus::Running => frame.render_widget(self.render_grid(state), game_area),
            status => frame.render_widget(self.render_end(state, status, metrics), game_area),
        }

        frame.render_widget(self.render_controls(), chunks[2]);
    }

    fn render_grid(&self, state: &GameState) -> Paragraph<'static> {
        let size = state.grid_size as i32;
        let occupied = state.snake.occupied();
        let lines: Vec<Line> = (0..size)
            .map(|y| {
                let spans: Vec<Span> = (0..size)
                    .map(|x| Cell::at(state, &occupied, Position::new(x, y)).span())
                    .collect();
                Line::from(spans)
            })
            .collect();

        Paragraph::new(lines)
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .border_type(BorderType::Double)
                    .border_style(Style::default().fg(Color::White))
                    .title(" Snake "),
            )
            .alignment(Alignment::Center)
    }

    fn render_stats(&self, state: &GameState, metrics: &SessionMetrics) -> Paragraph<'static> {
        let status_color = match state.status() {
            GameStatus::Running => Color::Green,
            GameStatus::GameOver => Color::Red,
            GameStatus::Won => Color::Yellow,
        };
        let text = vec![Line::from(vec![
            Span::styled("Score: ", Style::default().fg(Color::Yellow)),
            Span::styled(
                state.score.to_string(),
                Style::default()
                    .fg(Color::White)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::raw("    "),
            Span::styled("Length: ", Style::default().fg(Color::Yellow)),
            Span::styled(
                state.snake.len().to_string(),
                Style::default().fg(Color::White),
            ),
            Span::raw("    "),
            Span::styled("Time: ", Style::default().fg(Color::Yellow)),
            Span::styled(metrics.format_time(), Style::default().fg(Color::White)),
            Span::raw("    "),
            Span::styled(state.status().to_string(), Style::default().fg(status_color)),
        ])];

        Paragraph::new(text).alignment(Alignment::Center)
    }

    fn render_end(
        &self,
        state: &GameState,
        status: GameStatus,
        metrics: &SessionMetrics,
    ) -> Paragraph<'static> {
        let (title, color) = match status {
            GameStatus::Won => ("YOU WIN", Color::Yellow),
            _ => ("GAME OVER", Color::Red),
        };
        let label = Style::default().fg(Color::Yellow);
        let value = Style::default()
            .fg(Color::White)
            .add_modifier(Modifier::BOLD);

        let text = vec![
            Line::from(""),
            Line::from(Span::styled(
                title,
                Style::default().fg(color).add_modifier(Modifier::BOLD),
            )),
            Line::from(""),
            Line::from(vec![
                Span::styled("Final Score: ", label),
                Span::styled(state.score.to_string(), value),
            ]),
            Line::from(vec![
                Span::styled("Best this session: ", label),
                Span::styled(metrics.best_score.to_string(), value),
                Span::raw("   "),
                Span::styled("Games: ", label),
                Span::styled(metrics.games_played.to_string(), value),
                Span::raw("   "),
                Span::styled("Wins: ", label),
                Span::styled(metrics.wins.to_string(), value),
            ]),
            Line::from(""),
            Line::from(Span::styled(
                status.to_string(),
                Style::default().fg(Color::Gray),
            )),
        ];

        Paragraph::new(text).alignment(Alignment::Center).block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(color)),
        )
    }

    fn render_controls(&self) -> Paragraph<'static> {
        let text = vec![Line::from(vec![
            Span::styled("↑↓←→", Style::default().fg(Color::Cyan)),
            Span::raw(" or "),
            Span::styled("WASD", Style::default().fg(Color::Cyan)),
            Span::raw(" to move | "),
            Span::styled("R", Style::default().fg(Color::Green)),
            Span::raw(" to restart | "),
            Span::styled("Q", Style::default().fg(Color::Red)),
            Span::raw(" to quit"),
        ])];

        Paragraph::new(text).alignment(Alignment::Center)
    }
}

impl Default for Renderer {
    fn default() -> Self {
        Self::new()
    }
}
