mod board;
mod config;
mod food;
mod game;
mod input;
mod round;
mod score;
mod snake;
mod term;

use std::{fs::File, path::Path, process::ExitCode, sync::Mutex};

use anyhow::{Context, Result};
use clap::Parser;
use signal_hook::consts::SIGTERM;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use board::{Board, TooSmall};
use config::Config;
use game::SnakeGame;
use score::ScoreStore;
use term::{RestoreGuard, TermKeys, TermManager};

fn main() -> ExitCode {
    let config = Config::parse();

    if let Some(path) = &config.log_file {
        if let Err(e) = init_logging(path) {
            eprintln!("ERROR: {:#}", e);
            return ExitCode::FAILURE;
        }
    }

    let result = run(&config);
    // Every way out goes through here, the terminal must be back to normal
    // before anything is printed
    term::restore();

    ExitCode::from(report(result))
}

/// Prints how the game ended and picks the exit code. Quitting with Ctrl+C or
/// SIGTERM is a termination and fatal errors fail, both with 1. A terminal
/// that is too small is only explained, and exits cleanly.
fn report(result: Result<()>) -> u8 {
    match result {
        Ok(()) => 1,
        Err(e) => {
            if let Some(too_small) = e.downcast_ref::<TooSmall>() {
                eprintln!("ERROR: Terminal window too small!");
                eprintln!("At least 50x20 characters dimensions are required");
                eprintln!("Current terminal dimensions are: {}x{}", too_small.width, too_small.height);
                return 0;
            }

            error!(error = %e, "exiting after fatal error");
            eprintln!("UNEXPECTED ERROR: {:#}", e);
            1
        }
    }
}

fn run(config: &Config) -> Result<()> {
    let store = ScoreStore::new(&config.score_file);
    let high_score = store.load()?;

    let _guard = RestoreGuard;
    term::setup()?;

    let (width, height) = term::terminal_size()?;
    let board = Board::for_terminal(width, height)?;
    info!(width, height, high_score, "terminal ready");

    let screen = TermManager::new(&board);
    let mut game = SnakeGame::new(board, TermKeys, screen, store, high_score, config);
    signal_hook::flag::register(SIGTERM, game.termination_flag()).context("installing SIGTERM handler")?;
    game.play()
}

fn init_logging(path: &Path) -> Result<()> {
    let file = File::create(path).with_context(|| format!("creating log file {}", path.display()))?;
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(false)
        .with_writer(Mutex::new(file))
        .init();

    Ok(())
}
