use std::collections::HashMap;

use rand::{seq::SliceRandom, Rng};

use crate::board::{Board, Point};
use crate::snake::Snake;

/// Random samples tried before falling back to a scan of the free cells.
const SPAWN_ATTEMPTS: usize = 256;

/// Render colors used for food and snake segments.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Tint {
    Blue,
    Cyan,
    Green,
    Magenta,
    Red,
    Yellow,
}

impl Tint {
    pub const PALETTE: [Tint; 6] = [Tint::Blue, Tint::Cyan, Tint::Green, Tint::Magenta, Tint::Red, Tint::Yellow];

    pub fn random<R: Rng>(rng: &mut R) -> Tint {
        *Tint::PALETTE.choose(rng).unwrap_or(&Tint::Green)
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct FoodItem {
    /// Points scored and segments grown when eaten, 1 to 9.
    pub value: u8,
    pub tint: Option<Tint>,
}

impl FoodItem {
    pub fn glyph(&self) -> char {
        char::from(b'0' + self.value)
    }
}

#[derive(Default)]
pub struct FoodField {
    items: HashMap<Point, FoodItem>,
}

impl FoodField {
    pub fn new() -> Self {
        FoodField { items: HashMap::new() }
    }

    pub fn contains(&self, p: Point) -> bool {
        self.items.contains_key(&p)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[cfg(test)]
    pub fn iter(&self) -> impl Iterator<Item = (&Point, &FoodItem)> {
        self.items.iter()
    }

    #[cfg(test)]
    pub fn insert(&mut self, at: Point, item: FoodItem) {
        self.items.insert(at, item);
    }

    /// Removes the item the head just landed on, if any.
    pub fn consume(&mut self, at: Point) -> Option<FoodItem> {
        self.items.remove(&at)
    }

    /// Places one new item on a free interior cell. Returns `None` only when
    /// every interior cell already holds snake or food.
    pub fn spawn<R: Rng>(&mut self, board: &Board, snake: &Snake, tinted: bool, rng: &mut R) -> Option<(Point, FoodItem)> {
        let at = self.free_cell(board, snake, rng)?;
        let item = FoodItem {
            value: rng.gen_range(1..=9),
            tint: if tinted { Some(Tint::random(rng)) } else { None },
        };

        self.items.insert(at, item);
        Some((at, item))
    }

    fn free_cell<R: Rng>(&self, board: &Board, snake: &Snake, rng: &mut R) -> Option<Point> {
        for _ in 0..SPAWN_ATTEMPTS {
            let candidate = board.random_interior(rng);
            if !board.is_occupied(candidate, snake, self) {
                return Some(candidate);
            }
        }

        // Crowded board, pick uniformly among what's left
        let choices: Vec<Point> = board.interior().filter(|p| !board.is_occupied(*p, snake, self)).collect();
        choices.choose(rng).copied()
    }
}
