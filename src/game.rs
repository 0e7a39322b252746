use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::Duration,
};

use anyhow::{anyhow, bail, Result};
use rand::{rngs::StdRng, Rng, SeedableRng};
use tracing::info;

use crate::board::Board;
use crate::config::Config;
use crate::input::{Controls, InputRouter, KeySource};
use crate::round::{Round, Simulation};
use crate::score::ScoreStore;
use crate::term::Screen;

const POLL_TIMEOUT: Duration = Duration::from_millis(50);

/// Runs the input loop on the calling thread and one round at a time on a
/// simulation thread.
pub struct SnakeGame<K, S> {
    board: Board,
    keys: K,
    controls: Arc<Controls>,
    // Raised from a signal handler
    terminate: Arc<AtomicBool>,
    store: ScoreStore,
    rng: StdRng,
    tinted: bool,
    tick: Duration,
    high_score: u32,
    // Lent to the simulation thread while a round is on
    screen: Option<S>,
    simulation: Option<Simulation<S>>,
}

impl<K: KeySource, S: Screen + 'static> SnakeGame<K, S> {
    pub fn new(board: Board, keys: K, screen: S, store: ScoreStore, high_score: u32, config: &Config) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        SnakeGame {
            board,
            keys,
            controls: Arc::new(Controls::new()),
            terminate: Arc::new(AtomicBool::new(false)),
            store,
            rng,
            tinted: config.tinted(),
            tick: config.tick(),
            high_score,
            screen: Some(screen),
            simulation: None,
        }
    }

    /// Setting this flag ends `play` the same way Ctrl+C does.
    pub fn termination_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.terminate)
    }

    /// Plays rounds until the player quits or a termination signal arrives,
    /// which returns `Ok`. Any
    /// error leaves the simulation stopped.
    pub fn play(&mut self) -> Result<()> {
        let outcome = self.start_round().and_then(|_| self.route_keys());
        let stopped = self.stop();
        outcome.and(stopped)
    }

    ///////////////////////////////////////////////////////////////////////////

    fn route_keys(&mut self) -> Result<()> {
        while self.controls.input_enabled() && !self.simulation_died() {
            if self.terminate.load(Ordering::Acquire) {
                info!(high_score = self.high_score, "termination signal received");
                return Ok(());
            }

            if let Some(key) = self.keys.poll_key(POLL_TIMEOUT)? {
                if !InputRouter::route(key, &self.controls) {
                    info!(high_score = self.high_score, "quit requested");
                    return Ok(());
                }
            }

            if self.controls.take_restart() {
                self.collect()?;
                info!("restarting");
                self.start_round()?;
            }
        }

        // A healthy simulation only returns after game over
        self.collect()?;
        bail!("simulation stopped unexpectedly")
    }

    fn start_round(&mut self) -> Result<()> {
        let mut screen = self.screen.take().ok_or_else(|| anyhow!("screen still held by a running round"))?;

        let mut round = Round::new(self.board, self.high_score, self.tinted, StdRng::seed_from_u64(self.rng.gen()));
        round.start(&mut screen)?;

        self.controls.begin_round(round.snake().bearing());
        self.simulation = Some(Simulation::spawn(
            round,
            screen,
            Arc::clone(&self.controls),
            self.store.clone(),
            self.tick,
        ));

        Ok(())
    }

    /// The thread returned while its round was still on.
    fn simulation_died(&self) -> bool {
        self.simulation.as_ref().map_or(false, |sim| sim.is_finished()) && self.controls.is_running()
    }

    /// Waits for the last simulation thread and takes the screen back.
    fn collect(&mut self) -> Result<()> {
        if let Some(simulation) = self.simulation.take() {
            let finished = simulation.join()?;
            self.high_score = self.high_score.max(finished.high_score);
            self.screen = Some(finished.screen);
        }

        Ok(())
    }

    fn stop(&mut self) -> Result<()> {
        self.controls.end_round();
        self.collect()
    }
}
