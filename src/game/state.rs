use derive_more::{Display, Error};
use serde::{Deserialize, Serialize};
use std::collections::{HashSet, VecDeque};

use super::direction::Direction;

/// A position on the game grid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Position {
    pub x: i32,
    pub y: i32,
}

impl Position {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Move position by delta
    pub fn moved_by(&self, dx: i32, dy: i32) -> Self {
        Self {
            x: self.x + dx,
            y: self.y + dy,
        }
    }

    /// Move position one cell in a direction
    pub fn moved_in_direction(&self, direction: Direction) -> Self {
        let (dx, dy) = direction.delta();
        self.moved_by(dx, dy)
    }

    /// Whether the position lies on a `grid_size` x `grid_size` board
    pub fn is_within(&self, grid_size: usize) -> bool {
        let size = grid_size as i64;
        (0..size).contains(&(self.x as i64)) && (0..size).contains(&(self.y as i64))
    }
}

/// The snake's body, head at the front and tail at the back
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "VecDeque<Position>", into = "VecDeque<Position>")]
pub struct Snake {
    body: VecDeque<Position>,
}

/// A snake needs at least its head
#[derive(Debug, Clone, PartialEq, Eq, Display, Error)]
#[display("snake must have at least one segment")]
pub struct EmptySnakeError;

impl TryFrom<VecDeque<Position>> for Snake {
    type Error = EmptySnakeError;

    fn try_from(body: VecDeque<Position>) -> Result<Self, Self::Error> {
        if body.is_empty() {
            Err(EmptySnakeError)
        } else {
            Ok(Self { body })
        }
    }
}

impl From<Snake> for VecDeque<Position> {
    fn from(snake: Snake) -> Self {
        snake.body
    }
}

impl Snake {
    /// A single-segment snake
    pub fn new(head: Position) -> Self {
        Self {
            body: VecDeque::from([head]),
        }
    }

    /// Build a snake from segments listed head first.
    ///
    /// Returns `None` for an empty list.
    pub fn from_segments(segments: impl IntoIterator<Item = Position>) -> Option<Self> {
        Self::try_from(segments.into_iter().collect::<VecDeque<_>>()).ok()
    }

    pub fn head(&self) -> Position {
        self.body[0]
    }

    pub fn tail(&self) -> Position {
        self.body[self.body.len() - 1]
    }

    pub fn segments(&self) -> impl Iterator<Item = &Position> {
        self.body.iter()
    }

    pub fn contains(&self, pos: Position) -> bool {
        self.body.contains(&pos)
    }

    /// Cells covered by the snake, for O(1) membership checks
    pub fn occupied(&self) -> HashSet<Position> {
        self.body.iter().copied().collect()
    }

    /// A copy of the snake with `head` pushed on the front; the tail is
    /// dropped unless `grow` is set.
    pub fn advanced(&self, head: Position, grow: bool) -> Self {
        let mut body = self.body.clone();
        body.push_front(head);
        if !grow {
            body.pop_back();
        }
        Self { body }
    }

    pub fn len(&self) -> usize {
        self.body.len()
    }

    /// Always false: every constructor, deserialization included, rejects an
    /// empty body
    pub fn is_empty(&self) -> bool {
        self.body.is_empty()
    }
}

/// What ended the game
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize, Deserialize)]
pub enum CollisionKind {
    #[display("wall")]
    Wall,
    #[display("self")]
    SelfCollision,
}

/// Status shown to the player
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum GameStatus {
    #[display("Running")]
    Running,
    #[display("Game over. Press R to restart")]
    GameOver,
    #[display("You win! Press R to restart")]
    Won,
}

/// Complete game state.
///
/// Transitions never modify a state in place: `queue_direction` and `tick`
/// (see the engine module) return a new value, so earlier snapshots stay valid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameState {
    pub grid_size: usize,
    pub snake: Snake,
    /// Direction of the most recently applied move
    pub direction: Direction,
    /// Direction the next tick will apply
    pub pending_direction: Direction,
    /// `None` once the snake covers the whole board
    pub food: Option<Position>,
    pub score: u32,
    pub alive: bool,
    pub tick: u64,
}

impl GameState {
    /// Check if a position is within the grid bounds
    pub fn is_in_bounds(&self, pos: Position) -> bool {
        pos.is_within(self.grid_size)
    }

    /// The board is full and the snake is still alive
    pub fn is_win(&self) -> bool {
        self.food.is_none() && self.alive
    }

    pub fn is_terminal(&self) -> bool {
        !self.alive || self.is_win()
    }

    pub fn status(&self) -> GameStatus {
        if !self.alive {
            GameStatus::GameOver
        } else if self.is_win() {
            GameStatus::Won
        } else {
            GameStatus::Running
        }
    }
}
