use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use crate::game::Direction;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyAction {
    Turn(Direction),
    Restart,
    Quit,
    None,
}

/// Maps terminal key presses to game intents
pub struct InputHandler;

impl InputHandler {
    pub fn new() -> Self {
        Self
    }

    pub fn handle_key_event(&self, key: KeyEvent) -> KeyAction {
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            return KeyAction::Quit;
        }

        match key.code {
            KeyCode::Up => KeyAction::Turn(Direction::Up),
            KeyCode::Down => KeyAction::Turn(Direction::Down),
            KeyCode::Left => KeyAction::Turn(Direction::Left),
            KeyCode::Right => KeyAction::Turn(Direction::Right),
            KeyCode::Esc => KeyAction::Quit,
            KeyCode::Char(c) => Self::handle_char(c),
            _ => KeyAction::None,
        }
    }

    fn handle_char(c: char) -> KeyAction {
        match c.to_ascii_lowercase() {
            'q' => KeyAction::Quit,
            'r' => KeyAction::Restart,
            // WASD, same aliases the direction parser accepts
            other => other
                .to_string()
                .parse::<Direction>()
                .map(KeyAction::Turn)
                .unwrap_or(KeyAction::None),
        }
    }
}

impl Default for InputHandler {
    fn default() -> Self {
        Self::new()
    }
}
