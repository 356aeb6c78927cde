//! Random sources for food placement.
//!
//! The engine never reaches for a global generator: every operation that needs
//! randomness takes a `&mut impl RandomSource`, so a fixed sequence of values
//! always reproduces the same game.

use rand::{Rng, RngCore};

/// A source of uniformly distributed values in `[0, 1)`.
pub trait RandomSource {
    fn next_unit(&mut self) -> f64;
}

impl<R: RngCore> RandomSource for R {
    fn next_unit(&mut self) -> f64 {
        self.gen_range(0.0..1.0)
    }
}

/// Replays a fixed list of values, wrapping around at the end.
///
/// An empty list always yields `0.0`.
#[derive(Debug, Clone, PartialEq)]
pub struct ScriptedRandom {
    values: Vec<f64>,
    cursor: usize,
}

impl ScriptedRandom {
    pub fn new(values: impl Into<Vec<f64>>) -> Self {
        Self {
            values: values.into(),
            cursor: 0,
        }
    }

    /// A source that always picks the first open cell.
    pub fn first() -> Self {
        Self::new(vec![0.0])
    }

    /// Number of values handed out so far.
    pub fn draws(&self) -> usize {
        self.cursor
    }
}

impl RandomSource for ScriptedRandom {
    fn next_unit(&mut self) -> f64 {
        if self.values.is_empty() {
            self.cursor += 1;
            return 0.0;
        }
        let value = self.values[self.cursor % self.values.len()];
        self.cursor += 1;
        value
    }
}
