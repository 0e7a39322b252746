use std::{error::Error, fmt, ops::Add};

use rand::Rng;

use crate::food::FoodField;
use crate::snake::Snake;

pub const MIN_TERMINAL_WIDTH: u16 = 50;
pub const MIN_TERMINAL_HEIGHT: u16 = 20;

/// A cell of the game area, or a unit step between two cells.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct Point {
    pub row: i16,
    pub col: i16,
}

impl Point {
    pub const fn new(row: i16, col: i16) -> Self {
        Point { row, col }
    }
}

impl Add for Point {
    type Output = Point;

    fn add(self, other: Point) -> Point {
        Point::new(self.row + other.row, self.col + other.col)
    }
}

/// The terminal can't hold a playable board.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TooSmall {
    pub width: u16,
    pub height: u16,
}

impl fmt::Display for TooSmall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "terminal window too small: at least {}x{} characters are required, current dimensions are {}x{}",
            MIN_TERMINAL_WIDTH, MIN_TERMINAL_HEIGHT, self.width, self.height
        )
    }
}

impl Error for TooSmall {}

/// The game area: a `rows` x `cols` rectangle whose outermost ring is wall.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Board {
    rows: i16,
    cols: i16,
}

impl Board {
    pub fn new(rows: i16, cols: i16) -> Self {
        Board { rows, cols }
    }

    /// The top terminal row is kept for the score board, the rest is the game area.
    pub fn for_terminal(width: u16, height: u16) -> Result<Self, TooSmall> {
        if width < MIN_TERMINAL_WIDTH || height < MIN_TERMINAL_HEIGHT {
            return Err(TooSmall { width, height });
        }

        Ok(Board::new(height as i16 - 1, width as i16))
    }

    pub fn rows(&self) -> i16 {
        self.rows
    }

    pub fn cols(&self) -> i16 {
        self.cols
    }

    pub fn center(&self) -> Point {
        Point::new(self.rows / 2, self.cols / 2)
    }

    pub fn is_wall(&self, p: Point) -> bool {
        p.row <= 0 || p.row >= self.rows - 1 || p.col <= 0 || p.col >= self.cols - 1
    }

    pub fn is_occupied(&self, p: Point, snake: &Snake, food: &FoodField) -> bool {
        snake.contains(p) || food.contains(p)
    }

    /// How many food items a fresh round starts with.
    pub fn food_population(&self) -> usize {
        (self.rows / 2) as usize
    }

    pub fn random_interior<R: Rng>(&self, rng: &mut R) -> Point {
        Point::new(
            rng.gen_range(1..self.rows - 1),
            rng.gen_range(1..self.cols - 1),
        )
    }

    pub fn interior(&self) -> impl Iterator<Item = Point> + '_ {
        (1..self.rows - 1).flat_map(move |row| (1..self.cols - 1).map(move |col| Point::new(row, col)))
    }
}
