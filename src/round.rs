use std::{
    sync::Arc,
    thread::{self, JoinHandle},
    time::Duration,
};

use anyhow::{anyhow, Result};
use rand::{rngs::StdRng, seq::SliceRandom};
use tracing::{debug, error, info, warn};

use crate::board::{Board, Point};
use crate::food::{FoodField, FoodItem, Tint};
use crate::input::Controls;
use crate::score::{ScoreKeeper, ScoreStore};
use crate::snake::{Bearing, Snake};
use crate::term::{Screen, SEGMENT_CHAR};

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum TickOutcome {
    Moved,
    Crashed,
}

/// One game from start to game over. Owned by the simulation thread.
pub struct Round {
    board: Board,
    snake: Snake,
    food: FoodField,
    scores: ScoreKeeper,
    tinted: bool,
    rng: StdRng,
}

impl Round {
    /// A one-segment snake in the middle of the board, heading somewhere random.
    pub fn new(board: Board, high_score: u32, tinted: bool, mut rng: StdRng) -> Self {
        let bearing = *Bearing::ALL.choose(&mut rng).unwrap_or(&Bearing::Right);
        Round::with_bearing(board, high_score, tinted, bearing, rng)
    }

    pub fn with_bearing(board: Board, high_score: u32, tinted: bool, bearing: Bearing, mut rng: StdRng) -> Self {
        let tint = if tinted { Some(Tint::random(&mut rng)) } else { None };

        Round {
            board,
            snake: Snake::new(board.center(), bearing, tint),
            food: FoodField::new(),
            scores: ScoreKeeper::new(high_score),
            tinted,
            rng,
        }
    }

    pub fn snake(&self) -> &Snake {
        &self.snake
    }

    #[cfg(test)]
    pub fn food(&self) -> &FoodField {
        &self.food
    }

    #[cfg(test)]
    pub fn food_mut(&mut self) -> &mut FoodField {
        &mut self.food
    }

    pub fn scores(&self) -> &ScoreKeeper {
        &self.scores
    }

    /// Draws the opening board and seeds the food.
    pub fn start<S: Screen>(&mut self, screen: &mut S) -> Result<()> {
        screen.clear()?;

        let head = self.snake.head();
        screen.draw_glyph(head, SEGMENT_CHAR, self.snake.tint_at(0))?;

        for _ in 0..self.board.food_population() {
            self.spawn_food(screen)?;
        }

        screen.draw_border()?;
        screen.show_scores(self.scores.current(), self.scores.high())?;
        screen.refresh()?;

        info!(head = ?head, bearing = ?self.snake.bearing(), food = self.food.len(), "round started");
        Ok(())
    }

    /// Advances the snake one cell.
    pub fn tick<S: Screen>(&mut self, requested: Bearing, screen: &mut S) -> Result<TickOutcome> {
        self.snake.steer(requested, self.scores.current());
        let head = self.snake.next_head();

        let meal = self.food.consume(head);
        if let Some(item) = meal {
            self.scores.record(u32::from(item.value));
            self.snake.feed(item.value, item.tint, self.scores.current());
            debug!(at = ?head, value = item.value, score = self.scores.current(), pending = self.snake.pending_growth(), "food eaten");
        }

        self.snake.advance(head);

        if self.board.is_wall(head) || self.snake.bites_itself() {
            screen.draw_glyph(head, SEGMENT_CHAR, self.snake.bands().latest().tint)?;
            screen.refresh()?;
            info!(at = ?head, score = self.scores.current(), length = self.snake.len(), "snake crashed");
            return Ok(TickOutcome::Crashed);
        }

        if meal.is_some() {
            // The head is in place now, so the replacement can't land under it
            self.spawn_food(screen)?;
            screen.show_scores(self.scores.current(), self.scores.high())?;
        }

        if let Some(tail) = self.snake.settle() {
            screen.draw_glyph(tail, ' ', None)?;
        }

        screen.draw_glyph(head, SEGMENT_CHAR, self.snake.tint_at(0))?;
        for (at, tint) in self.snake.band_edges() {
            screen.draw_glyph(at, SEGMENT_CHAR, tint)?;
        }

        screen.refresh()?;
        Ok(TickOutcome::Moved)
    }

    /// Persists the high score if this round set it.
    pub fn finish(&self, store: &ScoreStore) -> Result<bool> {
        self.scores.finalize(store)
    }

    fn spawn_food<S: Screen>(&mut self, screen: &mut S) -> Result<Option<(Point, FoodItem)>> {
        let spawned = self.food.spawn(&self.board, &self.snake, self.tinted, &mut self.rng);

        match spawned {
            Some((at, item)) => screen.draw_glyph(at, item.glyph(), item.tint)?,
            None => warn!(food = self.food.len(), "no free cell left for food"),
        }

        Ok(spawned)
    }
}

/// What a simulation thread hands back once its round is over.
pub struct Finished<S> {
    pub screen: S,
    pub high_score: u32,
}

/// Handle on the thread running a round.
pub struct Simulation<S> {
    handle: JoinHandle<Result<Finished<S>>>,
}

impl<S: Screen + 'static> Simulation<S> {
    pub fn spawn(mut round: Round, mut screen: S, controls: Arc<Controls>, store: ScoreStore, tick: Duration) -> Self {
        let handle = thread::spawn(move || {
            if let Err(e) = run(&mut round, &mut screen, &controls, &store, tick) {
                error!(error = %e, "simulation failed");
                controls.disable_input();
                return Err(e);
            }

            Ok(Finished { screen, high_score: round.scores().high() })
        });

        Simulation { handle }
    }

    /// True once the thread has returned, for whatever reason.
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Waits for the thread. Callers make sure the round has ended or clear
    /// `running` first.
    pub fn join(self) -> Result<Finished<S>> {
        self.handle.join().map_err(|_| anyhow!("simulation thread panicked"))?
    }
}

/// Ticks until the snake crashes or the controller stops the round. Either
/// way the round's score gets its one chance at the high score file.
fn run<S: Screen>(round: &mut Round, screen: &mut S, controls: &Controls, store: &ScoreStore, tick: Duration) -> Result<()> {
    while controls.is_running() {
        thread::sleep(tick);

        if round.tick(controls.requested_bearing(), screen)? == TickOutcome::Crashed {
            controls.end_round();
            screen.show_game_over()?;
            break;
        }
    }

    round.finish(store)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::score::tests::scratch_file;
    use crate::term::testing::Recorder;
    use rand::SeedableRng;
    use std::collections::HashSet;

    fn quiet_round(bearing: Bearing) -> Round {
        Round::with_bearing(Board::new(20, 50), 0, true, bearing, StdRng::seed_from_u64(11))
    }

    fn assert_food_disjoint(round: &Round) {
        let body: HashSet<Point> = round.snake().body().copied().collect();
        let food: Vec<Point> = round.food().iter().map(|(p, _)| *p).collect();
        let unique: HashSet<Point> = food.iter().copied().collect();
        assert_eq!(unique.len(), food.len());
        assert!(unique.is_disjoint(&body));
    }

    #[test]
    fn three_ticks_right_without_food() {
        let mut round = quiet_round(Bearing::Right);
        let mut screen = Recorder::default();

        for _ in 0..3 {
            assert_eq!(round.tick(Bearing::Right, &mut screen).unwrap(), TickOutcome::Moved);
        }

        assert_eq!(round.snake().head(), Point::new(10, 28));
        assert_eq!(round.snake().len(), 1);
        assert_eq!(round.scores().current(), 0);
        assert_eq!(screen.glyph(Point::new(10, 27)), Some(' '));
        assert_eq!(screen.glyph(Point::new(10, 28)), Some(SEGMENT_CHAR));
    }

    #[test]
    fn eating_three_grows_by_three() {
        let mut round = quiet_round(Bearing::Right);
        let mut screen = Recorder::default();
        round.food_mut().insert(Point::new(10, 26), FoodItem { value: 3, tint: Some(Tint::Magenta) });

        round.tick(Bearing::Right, &mut screen).unwrap();
        assert_eq!(round.scores().current(), 3);
        assert_eq!(round.snake().len(), 2);
        // a replacement item was spawned
        assert_eq!(round.food().len(), 1);
        for col in 27..=30 {
            round.food_mut().consume(Point::new(10, col));
        }

        round.tick(Bearing::Right, &mut screen).unwrap();
        round.tick(Bearing::Right, &mut screen).unwrap();
        assert_eq!(round.snake().len(), 4);
        assert_eq!(round.snake().pending_growth(), 0);

        round.tick(Bearing::Right, &mut screen).unwrap();
        assert_eq!(round.snake().len(), 4);
        assert_eq!(round.scores().current(), 3);
        assert_eq!(round.snake().bands().latest().threshold, 4);
        assert_eq!(round.snake().bands().latest().tint, Some(Tint::Magenta));
        assert_eq!(screen.scores, (3, 3));
    }

    #[test]
    fn reversal_after_scoring_is_ignored() {
        let mut round = quiet_round(Bearing::Right);
        let mut screen = Recorder::default();
        round.food_mut().insert(Point::new(10, 26), FoodItem { value: 1, tint: None });

        round.tick(Bearing::Right, &mut screen).unwrap();
        round.tick(Bearing::Left, &mut screen).unwrap();
        assert_eq!(round.snake().bearing(), Bearing::Right);
        assert_eq!(round.snake().head(), Point::new(10, 27));
    }

    #[test]
    fn reversal_at_zero_score_takes_effect() {
        let mut round = quiet_round(Bearing::Right);
        let mut screen = Recorder::default();

        round.tick(Bearing::Left, &mut screen).unwrap();
        assert_eq!(round.snake().bearing(), Bearing::Left);
        assert_eq!(round.snake().head(), Point::new(10, 24));
    }

    #[test]
    fn hitting_the_wall_ends_the_round() {
        for (bearing, steps) in [(Bearing::Up, 10), (Bearing::Down, 9), (Bearing::Left, 25), (Bearing::Right, 24)] {
            let mut round = quiet_round(bearing);
            let mut screen = Recorder::default();

            for _ in 1..steps {
                assert_eq!(round.tick(bearing, &mut screen).unwrap(), TickOutcome::Moved);
            }
            assert_eq!(round.tick(bearing, &mut screen).unwrap(), TickOutcome::Crashed, "{:?}", bearing);
        }
    }

    #[test]
    fn food_never_overlaps_the_snake() {
        let mut round = quiet_round(Bearing::Right);
        let mut screen = Recorder::default();
        round.start(&mut screen).unwrap();
        assert_eq!(round.food().len(), 10);
        assert_eq!(screen.borders, 1);
        assert_food_disjoint(&round);

        let mut bearing = Bearing::Right;
        for i in 0..200 {
            if i % 7 == 0 {
                bearing = match bearing {
                    Bearing::Right => Bearing::Down,
                    Bearing::Down => Bearing::Left,
                    Bearing::Left => Bearing::Up,
                    Bearing::Up => Bearing::Right,
                };
            }
            if round.tick(bearing, &mut screen).unwrap() == TickOutcome::Crashed {
                break;
            }
            assert_food_disjoint(&round);
        }
    }

    #[test]
    fn simulation_finishes_round_and_saves_high_score() {
        let path = scratch_file("simulation");
        let store = ScoreStore::new(&path);
        let controls = Arc::new(Controls::new());

        let mut round = Round::with_bearing(Board::new(20, 50), 0, false, Bearing::Up, StdRng::seed_from_u64(5));
        round.food_mut().insert(Point::new(9, 25), FoodItem { value: 4, tint: None });
        controls.begin_round(Bearing::Up);

        let simulation = Simulation::spawn(round, Recorder::default(), Arc::clone(&controls), store.clone(), Duration::from_millis(1));
        let finished = simulation.join().unwrap();

        assert!(controls.is_game_over());
        assert!(finished.screen.game_over);
        // the replacement food may sit further up the column
        assert!(finished.high_score >= 4);
        assert_eq!(store.load().unwrap(), finished.high_score);
    }

    #[test]
    fn stopping_mid_round_still_saves_high_score() {
        let path = scratch_file("stopped");
        let store = ScoreStore::new(&path);
        let controls = Arc::new(Controls::new());

        let mut round = Round::with_bearing(Board::new(20, 50), 0, false, Bearing::Up, StdRng::seed_from_u64(5));
        round.food_mut().insert(Point::new(9, 25), FoodItem { value: 4, tint: None });
        controls.begin_round(Bearing::Up);

        let simulation = Simulation::spawn(round, Recorder::default(), Arc::clone(&controls), store.clone(), Duration::from_millis(30));
        thread::sleep(Duration::from_millis(100));
        controls.end_round();
        let finished = simulation.join().unwrap();

        // stopped well short of the wall
        assert!(!finished.screen.game_over);
        assert!(finished.high_score >= 4);
        assert_eq!(store.load().unwrap(), finished.high_score);
    }

    #[test]
    fn crash_head_takes_the_newest_band_color() {
        // 3x5 interior, the snake starts at (2,3) heading for the wall at col 6
        let mut round = Round::with_bearing(Board::new(5, 7), 0, true, Bearing::Right, StdRng::seed_from_u64(2));
        round.food_mut().insert(Point::new(2, 4), FoodItem { value: 9, tint: Some(Tint::Red) });
        round.food_mut().insert(Point::new(2, 5), FoodItem { value: 1, tint: Some(Tint::Magenta) });
        let mut screen = Recorder::default();

        assert_eq!(round.tick(Bearing::Right, &mut screen).unwrap(), TickOutcome::Moved);
        assert_eq!(round.tick(Bearing::Right, &mut screen).unwrap(), TickOutcome::Moved);
        // still growing red segments, but the newest band is magenta
        assert_eq!(round.snake().tint_at(0), Some(Tint::Red));
        assert_eq!(round.tick(Bearing::Right, &mut screen).unwrap(), TickOutcome::Crashed);

        assert_eq!(screen.cells.get(&Point::new(2, 6)), Some(&(SEGMENT_CHAR, Some(Tint::Magenta))));
    }

    #[test]
    fn failing_screen_disables_input() {
        struct Broken;

        impl Screen for Broken {
            fn draw_glyph(&mut self, _: Point, _: char, _: Option<Tint>) -> Result<()> {
                Err(anyhow!("screen went away"))
            }
            fn draw_border(&mut self) -> Result<()> {
                Ok(())
            }
            fn show_scores(&mut self, _: u32, _: u32) -> Result<()> {
                Ok(())
            }
            fn show_game_over(&mut self) -> Result<()> {
                Ok(())
            }
            fn clear(&mut self) -> Result<()> {
                Ok(())
            }
            fn refresh(&mut self) -> Result<()> {
                Ok(())
            }
        }

        let controls = Arc::new(Controls::new());
        controls.begin_round(Bearing::Down);
        let round = quiet_round(Bearing::Down);

        let simulation = Simulation::spawn(round, Broken, Arc::clone(&controls), ScoreStore::new(scratch_file("broken")), Duration::from_millis(1));
        let err = simulation.join().err().unwrap();

        assert!(err.to_string().contains("screen went away"));
        assert!(!controls.input_enabled());
    }
}
