use std::{path::PathBuf, time::Duration};

use clap::Parser;

const DEFAULT_TICK_MS: u64 = 100;
const DEFAULT_SCORE_FILE: &str = "snake.hi";

/// Terminal snake. Eat the numbers, grow by their value, don't hit the walls.
#[derive(Debug, Clone, Parser)]
#[command(author, version, about, long_about = None)]
pub struct Config {
    /// Milliseconds between snake steps. Smaller values make the snake faster.
    #[arg(
        long = "tick-ms",
        value_name = "MILLISECONDS",
        default_value_t = DEFAULT_TICK_MS,
        value_parser = clap::value_parser!(u64).range(10..=1000)
    )]
    pub tick_ms: u64,

    /// File holding the high score.
    #[arg(long = "score-file", value_name = "PATH", default_value = DEFAULT_SCORE_FILE)]
    pub score_file: PathBuf,

    /// Play without colors: food has no tint and the snake is a single color.
    #[arg(long)]
    pub plain: bool,

    /// Write diagnostics here. Filtered with RUST_LOG, `info` by default.
    #[arg(long = "log-file", value_name = "PATH")]
    pub log_file: Option<PathBuf>,

    /// Seed for food placement and colors.
    #[arg(long)]
    pub seed: Option<u64>,
}

impl Config {
    pub fn tick(&self) -> Duration {
        Duration::from_millis(self.tick_ms)
    }

    pub fn tinted(&self) -> bool {
        !self.plain
    }
}
