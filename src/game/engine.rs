use tracing::{debug, trace};

use super::{
    config::GameConfig,
    direction::Direction,
    rng::RandomSource,
    state::{CollisionKind, GameState, Position, Snake},
};

/// Points awarded per food eaten
pub const FOOD_SCORE: u32 = 10;

/// What a single tick did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickEvent {
    /// The state was already terminal
    Unchanged,
    /// The snake moved one cell
    Moved { ate_food: bool },
    /// The move was refused and the snake died in place
    Died(CollisionKind),
}

/// Result of a game step: the next state and what happened to produce it
#[derive(Debug, Clone, PartialEq)]
pub struct Step {
    pub state: GameState,
    pub event: TickEvent,
}

/// Pick a free cell for the food.
///
/// Candidates are scanned row by row (`y` outer, `x` inner) and one is chosen
/// at index `floor(rng * open_cells)`, so a fixed random sequence always lands
/// on the same cell. Returns `None` when the snake covers every cell.
pub fn place_food<R: RandomSource + ?Sized>(
    snake: &Snake,
    grid_size: usize,
    rng: &mut R,
) -> Option<Position> {
    let occupied = snake.occupied();
    let open_cells: Vec<Position> = (0..grid_size as i32)
        .flat_map(|y| (0..grid_size as i32).map(move |x| Position::new(x, y)))
        .filter(|pos| !occupied.contains(pos))
        .collect();

    if open_cells.is_empty() {
        return None;
    }

    let scaled = (rng.next_unit() * open_cells.len() as f64).floor();
    // A source returning exactly 1.0 would otherwise index past the end.
    let index = (scaled.max(0.0) as usize).min(open_cells.len() - 1);
    Some(open_cells[index])
}

impl GameState {
    /// A fresh game: one segment in the centre cell heading right, food placed.
    pub fn initial<R: RandomSource + ?Sized>(grid_size: usize, rng: &mut R) -> Self {
        let mid = (grid_size / 2) as i32;
        let snake = Snake::new(Position::new(mid, mid));
        let food = place_food(&snake, grid_size, rng);

        Self {
            grid_size,
            snake,
            direction: Direction::Right,
            pending_direction: Direction::Right,
            food,
            score: 0,
            alive: true,
            tick: 0,
        }
    }

    /// Buffer a turn for the next tick.
    ///
    /// Ignored when the game is over or when `next` reverses the direction of
    /// the last applied move. The check is against `direction`, not the turn
    /// already buffered, and a later call replaces an earlier one.
    pub fn queue_direction(&self, next: Direction) -> GameState {
        if !self.alive {
            trace!(%next, "ignoring turn on finished game");
            return self.clone();
        }
        if next.is_opposite(self.direction) {
            trace!(%next, current = %self.direction, "ignoring reversal");
            return self.clone();
        }
        GameState {
            pending_direction: next,
            ..self.clone()
        }
    }

    /// Like [`GameState::queue_direction`] for raw input words; anything that
    /// does not parse as a direction leaves the state as it is.
    pub fn queue_direction_str(&self, input: &str) -> GameState {
        match input.parse::<Direction>() {
            Ok(direction) => self.queue_direction(direction),
            Err(err) => {
                trace!(%err, "ignoring direction input");
                self.clone()
            }
        }
    }

    /// Advance the game by one cell.
    pub fn tick<R: RandomSource + ?Sized>(&self, rng: &mut R) -> GameState {
        self.step(rng).state
    }

    /// Advance the game by one cell and report what happened.
    pub fn step<R: RandomSource + ?Sized>(&self, rng: &mut R) -> Step {
        if !self.alive {
            return Step {
                state: self.clone(),
                event: TickEvent::Unchanged,
            };
        }

        let direction = self.pending_direction;
        let next_head = self.snake.head().moved_in_direction(direction);

        if let Some(collision) = self.check_collision(next_head) {
            debug!(
                tick = self.tick,
                score = self.score,
                length = self.snake.len(),
                %collision,
                "snake died"
            );
            return Step {
                state: GameState {
                    alive: false,
                    ..self.clone()
                },
                event: TickEvent::Died(collision),
            };
        }

        let ate_food = self.food == Some(next_head);
        let snake = self.snake.advanced(next_head, ate_food);

        let (food, score) = if ate_food {
            let food = place_food(&snake, self.grid_size, rng);
            debug!(
                tick = self.tick + 1,
                length = snake.len(),
                next_food = ?food,
                "food eaten"
            );
            (food, self.score + FOOD_SCORE)
        } else {
            (self.food, self.score)
        };

        Step {
            state: GameState {
                grid_size: self.grid_size,
                snake,
                direction,
                pending_direction: direction,
                food,
                score,
                alive: true,
                tick: self.tick + 1,
            },
            event: TickEvent::Moved { ate_food },
        }
    }

    /// Walls first, then the current body. The tail still counts as occupied
    /// even though it would move away this tick.
    fn check_collision(&self, pos: Position) -> Option<CollisionKind> {
        if !self.is_in_bounds(pos) {
            return Some(CollisionKind::Wall);
        }
        if self.snake.occupied().contains(&pos) {
            return Some(CollisionKind::SelfCollision);
        }
        None
    }
}

/// Owns the random source and board size for a session and hands out states.
///
/// States themselves stay plain values; the engine only supplies the
/// randomness each transition needs.
pub struct GameEngine<R> {
    config: GameConfig,
    rng: R,
}

impl<R: RandomSource> GameEngine<R> {
    pub fn new(config: GameConfig, rng: R) -> Self {
        Self { config, rng }
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    /// Start a new game
    pub fn reset(&mut self) -> GameState {
        GameState::initial(self.config.grid_size, &mut self.rng)
    }

    /// Execute one tick of the game
    pub fn step(&mut self, state: &GameState) -> Step {
        state.step(&mut self.rng)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::rng::ScriptedRandom;
    use proptest::prelude::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn state_with(grid_size: usize, segments: &[(i32, i32)], food: Option<(i32, i32)>) -> GameState {
        GameState {
            grid_size,
            snake: Snake::from_segments(segments.iter().map(|&(x, y)| Position::new(x, y)))
                .unwrap(),
            direction: Direction::Right,
            pending_direction: Direction::Right,
            food: food.map(|(x, y)| Position::new(x, y)),
            score: 0,
            alive: true,
            tick: 0,
        }
    }

    fn advance(state: GameState, steps: usize, rng: &mut ScriptedRandom) -> GameState {
        (0..steps).fold(state, |s, _| s.tick(&mut *rng))
    }

    #[test]
    fn test_initial_state() {
        let mut rng = ScriptedRandom::new(vec![0.1]);
        let state = GameState::initial(10, &mut rng);

        assert!(state.alive);
        assert_eq!(state.score, 0);
        assert_eq!(state.tick, 0);
        assert_eq!(state.snake.len(), 1);
        assert_eq!(state.snake.head(), Position::new(5, 5));
        assert_eq!(state.direction, Direction::Right);
        assert_eq!(state.pending_direction, Direction::Right);
        // 99 open cells, floor(0.1 * 99) = 9 -> (9, 0)
        assert_eq!(state.food, Some(Position::new(9, 0)));
    }

    #[test]
    fn test_initial_state_odd_grid_is_centred() {
        let state = GameState::initial(3, &mut ScriptedRandom::first());
        assert_eq!(state.snake.head(), Position::new(1, 1));
        assert_eq!(state.food, Some(Position::new(0, 0)));
    }

    #[test]
    fn test_place_food_scan_order() {
        let snake = Snake::new(Position::new(0, 0));
        let mut rng = ScriptedRandom::new(vec![0.0, 0.34, 0.99]);
        // Open cells in order: (1,0), (0,1), (1,1)
        assert_eq!(place_food(&snake, 2, &mut rng), Some(Position::new(1, 0)));
        assert_eq!(place_food(&snake, 2, &mut rng), Some(Position::new(0, 1)));
        assert_eq!(place_food(&snake, 2, &mut rng), Some(Position::new(1, 1)));
    }

    #[test]
    fn test_place_food_clamps_unit_value() {
        let snake = Snake::new(Position::new(0, 0));
        let mut rng = ScriptedRandom::new(vec![1.0]);
        assert_eq!(place_food(&snake, 2, &mut rng), Some(Position::new(1, 1)));
    }

    #[test]
    fn test_place_food_full_board() {
        let snake = Snake::from_segments([
            Position::new(0, 0),
            Position::new(1, 0),
            Position::new(0, 1),
            Position::new(1, 1),
        ])
        .unwrap();
        let mut rng = ScriptedRandom::first();
        assert_eq!(place_food(&snake, 2, &mut rng), None);
        assert_eq!(rng.draws(), 0);
    }

    #[test]
    fn test_basic_movement() {
        let state = state_with(10, &[(5, 5)], Some((0, 0)));
        let next = state.tick(&mut ScriptedRandom::first());

        assert_eq!(next.snake.head(), Position::new(6, 5));
        assert_eq!(next.snake.len(), 1);
        assert_eq!(next.score, 0);
        assert_eq!(next.tick, 1);
        assert!(next.alive);
    }

    #[test]
    fn test_tick_leaves_previous_state_untouched() {
        let state = state_with(10, &[(5, 5)], Some((6, 5)));
        let before = state.clone();
        let next = state.tick(&mut ScriptedRandom::first());

        assert_ne!(next, state);
        assert_eq!(state, before);
    }

    #[test]
    fn test_queue_rejects_reversal() {
        let state = GameState::initial(10, &mut ScriptedRandom::first());
        let after = state.queue_direction(Direction::Left);
        assert_eq!(after.pending_direction, Direction::Right);
        assert_eq!(after, state);
    }

    #[test]
    fn test_queue_accepts_turn_and_overwrites() {
        let state = GameState::initial(10, &mut ScriptedRandom::first());
        let up = state.queue_direction(Direction::Up);
        assert_eq!(up.pending_direction, Direction::Up);
        assert_eq!(up.direction, Direction::Right);
        assert_eq!(state.pending_direction, Direction::Right);

        let down = up.queue_direction(Direction::Down);
        assert_eq!(down.pending_direction, Direction::Down);
    }

    #[test]
    fn test_queue_checks_against_applied_direction_only() {
        // Up then Left within one tick: Left is judged against Right, so it is
        // rejected even though it is not a reversal of the buffered Up.
        let state = GameState::initial(10, &mut ScriptedRandom::first());
        let after = state
            .queue_direction(Direction::Up)
            .queue_direction(Direction::Left);
        assert_eq!(after.pending_direction, Direction::Up);
    }

    #[test]
    fn test_queue_direction_str() {
        let state = GameState::initial(10, &mut ScriptedRandom::first());
        assert_eq!(state.queue_direction_str("UP").pending_direction, Direction::Up);
        assert_eq!(state.queue_direction_str("ArrowDown").pending_direction, Direction::Down);
        assert_eq!(state.queue_direction_str("diagonal"), state);
        assert_eq!(state.queue_direction_str(" up "), state);
        assert_eq!(state.queue_direction_str("left"), state);
    }

    #[test]
    fn test_queue_ignored_when_dead() {
        let mut state = GameState::initial(10, &mut ScriptedRandom::first());
        state.alive = false;
        assert_eq!(state.queue_direction(Direction::Up), state);
    }

    #[test]
    fn test_food_consumption() {
        let mut rng = ScriptedRandom::first();
        let state = state_with(6, &[(3, 3)], Some((4, 3)));
        let step = state.step(&mut rng);

        assert_eq!(step.event, TickEvent::Moved { ate_food: true });
        assert_eq!(step.state.snake.len(), 2);
        assert_eq!(step.state.score, 10);
        assert_eq!(step.state.snake.head(), Position::new(4, 3));
        assert_eq!(step.state.snake.tail(), Position::new(3, 3));
        assert_eq!(step.state.food, Some(Position::new(0, 0)));
    }

    #[test]
    fn test_no_growth_without_food() {
        let state = state_with(6, &[(3, 3), (2, 3), (1, 3)], Some((0, 0)));
        let step = state.step(&mut ScriptedRandom::first());

        assert_eq!(step.event, TickEvent::Moved { ate_food: false });
        assert_eq!(step.state.snake.len(), 3);
        assert_eq!(step.state.food, state.food);
        assert_eq!(step.state.score, 0);
    }

    #[test]
    fn test_wall_collision() {
        let mut rng = ScriptedRandom::first();
        let state = GameState::initial(3, &mut rng);
        let once = state.tick(&mut rng);
        assert!(once.alive);
        assert_eq!(once.snake.head(), Position::new(2, 1));

        let step = once.step(&mut rng);
        assert_eq!(step.event, TickEvent::Died(CollisionKind::Wall));
        let dead = step.state;
        assert!(!dead.alive);
        assert_eq!(dead.snake, once.snake);
        assert_eq!(dead.food, once.food);
        assert_eq!(dead.score, once.score);
        assert_eq!(dead.tick, once.tick);
    }

    #[test]
    fn test_wall_collision_every_side() {
        for (head, dir) in [
            ((0, 2), Direction::Left),
            ((4, 2), Direction::Right),
            ((2, 0), Direction::Up),
            ((2, 4), Direction::Down),
        ] {
            let mut state = state_with(5, &[head], Some((3, 3)));
            state.direction = dir;
            state.pending_direction = dir;
            let step = state.step(&mut ScriptedRandom::first());
            assert_eq!(step.event, TickEvent::Died(CollisionKind::Wall), "{dir}");
        }
    }

    #[test]
    fn test_self_collision() {
        let mut state = state_with(5, &[(2, 2), (1, 2), (1, 1), (2, 1)], Some((4, 4)));
        state.pending_direction = Direction::Left;
        let step = state.step(&mut ScriptedRandom::first());

        assert_eq!(step.event, TickEvent::Died(CollisionKind::SelfCollision));
        assert!(!step.state.alive);
        assert_eq!(step.state.snake, state.snake);
    }

    #[test]
    fn test_moving_into_tail_cell_is_fatal() {
        // A 2x2 loop: the head's next cell is the tail, which would vacate
        // this tick, but it still counts as occupied.
        let mut state = state_with(4, &[(1, 1), (1, 2), (2, 2), (2, 1)], Some((0, 0)));
        state.direction = Direction::Up;
        state.pending_direction = Direction::Right;
        let step = state.step(&mut ScriptedRandom::first());

        assert_eq!(step.event, TickEvent::Died(CollisionKind::SelfCollision));
    }

    #[test]
    fn test_terminated_game_no_update() {
        let mut state = state_with(5, &[(2, 2)], Some((3, 3)));
        state.alive = false;
        let step = state.step(&mut ScriptedRandom::first());

        assert_eq!(step.event, TickEvent::Unchanged);
        assert_eq!(step.state, state);
    }

    #[test]
    fn test_applied_turn_becomes_direction() {
        let state = state_with(10, &[(5, 5)], Some((0, 0))).queue_direction(Direction::Down);
        let next = state.tick(&mut ScriptedRandom::first());

        assert_eq!(next.snake.head(), Position::new(5, 6));
        assert_eq!(next.direction, Direction::Down);
        assert_eq!(next.pending_direction, Direction::Down);
        // Reversal is now judged against Down
        assert_eq!(next.queue_direction(Direction::Up).pending_direction, Direction::Down);
    }

    #[test]
    fn test_filling_the_board_wins() {
        // 2x2 board, three segments, food on the last free cell.
        let mut state = state_with(2, &[(0, 1), (0, 0), (1, 0)], Some((1, 1)));
        state.direction = Direction::Down;
        state.pending_direction = Direction::Right;
        let next = state.tick(&mut ScriptedRandom::first());

        assert!(next.alive);
        assert_eq!(next.snake.len(), 4);
        assert_eq!(next.food, None);
        assert_eq!(next.score, 10);
        assert!(next.is_win());
    }

    #[test]
    fn test_scripted_run_is_deterministic() {
        let run = || {
            let mut rng = ScriptedRandom::new(vec![0.3, 0.7, 0.2]);
            let state = GameState::initial(8, &mut rng);
            advance(state, 3, &mut rng)
        };
        assert_eq!(run(), run());
    }

    #[test]
    fn test_engine_reset_and_step() {
        let mut engine = GameEngine::new(GameConfig::small(), ScriptedRandom::first());
        let state = engine.reset();
        assert_eq!(state.grid_size, 10);

        let step = engine.step(&state);
        assert_eq!(step.state.tick, 1);
        assert_eq!(engine.config().grid_size, 10);
    }

    fn direction_strategy() -> impl Strategy<Value = Direction> {
        prop::sample::select(Direction::ALL.to_vec())
    }

    fn assert_invariants(state: &GameState) -> Result<(), TestCaseError> {
        prop_assert!(state.snake.len() >= 1);
        for segment in state.snake.segments() {
            prop_assert!(state.is_in_bounds(*segment));
        }
        if state.alive {
            prop_assert_eq!(state.snake.occupied().len(), state.snake.len());
        }
        if let Some(food) = state.food {
            prop_assert!(!state.snake.contains(food));
            prop_assert!(state.is_in_bounds(food));
        }
        prop_assert!(!state.pending_direction.is_opposite(state.direction));
        Ok(())
    }

    proptest! {
        #[test]
        fn prop_invariants_hold_for_any_input(
            grid_size in 2usize..=8,
            seed in any::<u64>(),
            turns in prop::collection::vec(direction_strategy(), 0..200),
        ) {
            let mut rng = StdRng::seed_from_u64(seed);
            let mut state = GameState::initial(grid_size, &mut rng);
            assert_invariants(&state)?;

            for turn in turns {
                let queued = state.queue_direction(turn);
                assert_invariants(&queued)?;

                let step = queued.step(&mut rng);
                match step.event {
                    TickEvent::Moved { ate_food } => {
                        let expected = queued.snake.len() + usize::from(ate_food);
                        prop_assert_eq!(step.state.snake.len(), expected);
                        prop_assert_eq!(
                            step.state.score,
                            queued.score + if ate_food { FOOD_SCORE } else { 0 }
                        );
                        prop_assert_eq!(step.state.tick, queued.tick + 1);
                    }
                    TickEvent::Died(_) => {
                        prop_assert!(!step.state.alive);
                        prop_assert_eq!(&step.state.snake, &queued.snake);
                        prop_assert_eq!(step.state.score, queued.score);
                        prop_assert_eq!(step.state.tick, queued.tick);
                    }
                    TickEvent::Unchanged => {
                        prop_assert_eq!(&step.state, &queued);
                    }
                }
                state = step.state;
                assert_invariants(&state)?;
            }
        }

        #[test]
        fn prop_same_seed_same_game(
            seed in any::<u64>(),
            turns in prop::collection::vec(direction_strategy(), 0..50),
        ) {
            let play = || {
                let mut rng = StdRng::seed_from_u64(seed);
                let mut state = GameState::initial(6, &mut rng);
                let mut history = vec![state.clone()];
                for &turn in &turns {
                    state = state.queue_direction(turn).tick(&mut rng);
                    history.push(state.clone());
                }
                history
            };
            prop_assert_eq!(play(), play());
        }

        #[test]
        fn prop_food_never_on_snake(
            grid_size in 1usize..=6,
            head_x in 0i32..6,
            head_y in 0i32..6,
            value in 0.0f64..1.0,
        ) {
            let head = Position::new(head_x % grid_size as i32, head_y % grid_size as i32);
            let snake = Snake::new(head);
            let mut rng = ScriptedRandom::new(vec![value]);
            match place_food(&snake, grid_size, &mut rng) {
                Some(food) => {
                    prop_assert_ne!(food, head);
                    prop_assert!(food.is_within(grid_size));
                }
                None => prop_assert_eq!(grid_size, 1),
            }
        }
    }
}
