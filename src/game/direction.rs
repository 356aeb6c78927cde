use derive_more::{Display, Error};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Direction the snake can move
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    #[display("up")]
    Up,
    #[display("down")]
    Down,
    #[display("left")]
    Left,
    #[display("right")]
    Right,
}

impl Direction {
    pub const ALL: [Direction; 4] = [
        Direction::Up,
        Direction::Down,
        Direction::Left,
        Direction::Right,
    ];

    /// Returns true if turning from self to other would be a 180-degree turn
    pub fn is_opposite(&self, other: Direction) -> bool {
        self.opposite() == other
    }

    pub fn opposite(&self) -> Direction {
        match self {
            Direction::Up => Direction::Down,
            Direction::Down => Direction::Up,
            Direction::Left => Direction::Right,
            Direction::Right => Direction::Left,
        }
    }

    /// Returns the delta (dx, dy) for moving in this direction.
    /// The y axis grows downwards.
    pub fn delta(&self) -> (i32, i32) {
        match self {
            Direction::Up => (0, -1),
            Direction::Down => (0, 1),
            Direction::Left => (-1, 0),
            Direction::Right => (1, 0),
        }
    }
}

/// A direction word that is not one of the accepted names or aliases.
#[derive(Debug, Clone, PartialEq, Eq, Display, Error)]
#[display("unrecognized direction {input:?}")]
pub struct ParseDirectionError {
    pub input: String,
}

impl FromStr for Direction {
    type Err = ParseDirectionError;

    /// Case-insensitive; accepts the canonical names plus arrow-key and WASD
    /// aliases. Surrounding whitespace is not stripped.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "up" | "arrowup" | "w" => Ok(Direction::Up),
            "down" | "arrowdown" | "s" => Ok(Direction::Down),
            "left" | "arrowleft" | "a" => Ok(Direction::Left),
            "right" | "arrowright" | "d" => Ok(Direction::Right),
            _ => Err(ParseDirectionError {
                input: s.to_string(),
            }),
        }
    }
}
