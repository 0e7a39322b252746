use std::collections::VecDeque;

use crate::board::Point;
use crate::food::Tint;
use Bearing::*;

/// Head-adjacent segments ignored by the self-collision check.
pub const GRACE_WINDOW: usize = 4;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Bearing {
    Up,
    Down,
    Left,
    Right,
}

impl Bearing {
    pub const ALL: [Bearing; 4] = [Up, Down, Left, Right];

    pub fn delta(self) -> Point {
        match self {
            Up => Point::new(-1, 0),
            Down => Point::new(1, 0),
            Left => Point::new(0, -1),
            Right => Point::new(0, 1),
        }
    }

    pub fn is_reverse_of(self, other: Bearing) -> bool {
        matches!((self, other), (Up, Down) | (Down, Up) | (Left, Right) | (Right, Left))
    }

    pub(crate) fn to_u8(self) -> u8 {
        match self {
            Up => 0,
            Down => 1,
            Left => 2,
            Right => 3,
        }
    }

    pub(crate) fn from_u8(raw: u8) -> Bearing {
        match raw {
            0 => Up,
            1 => Down,
            2 => Left,
            _ => Right,
        }
    }
}

/// A band opened when food is eaten. `threshold` is the score right after
/// eating plus one, so the band covers the segments whose distance from the
/// tail lies between the previous band's threshold and this one.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Band {
    pub threshold: u32,
    pub tint: Option<Tint>,
}

/// The color layout of the body. Band colors are pinned to positions counted
/// from the tail, so `tints[i]` is the color of the i-th segment from the tail
/// and only grows when a growth unit lands.
pub struct ColorBands {
    bands: Vec<Band>,
    tints: Vec<Option<Tint>>,
}

impl ColorBands {
    pub fn new(tint: Option<Tint>) -> Self {
        ColorBands { bands: vec![Band { threshold: 1, tint }], tints: vec![tint] }
    }

    pub fn open(&mut self, threshold: u32, tint: Option<Tint>) {
        self.bands.push(Band { threshold, tint });
    }

    pub fn latest(&self) -> Band {
        self.bands[self.bands.len() - 1]
    }

    /// Bands, most recent first.
    #[cfg(test)]
    pub fn iter(&self) -> impl Iterator<Item = &Band> {
        self.bands.iter().rev()
    }

    fn extend(&mut self, tint: Option<Tint>) {
        self.tints.push(tint);
    }

    pub fn tint_from_tail(&self, offset: usize) -> Option<Tint> {
        self.tints.get(offset).copied().flatten()
    }

    /// The head-most segment of every band but the latest, as offsets from the
    /// tail. Segments take their band's color when they cross these cells.
    fn boundaries(&self) -> impl Iterator<Item = (usize, Option<Tint>)> + '_ {
        self.bands[..self.bands.len() - 1].iter().map(|band| (band.threshold as usize - 1, band.tint))
    }
}

pub struct Snake {
    body: VecDeque<Point>,
    bearing: Bearing,
    growth: VecDeque<Option<Tint>>,
    bands: ColorBands,
}

impl Snake {
    pub fn new(head: Point, bearing: Bearing, tint: Option<Tint>) -> Self {
        Snake {
            body: VecDeque::from(vec![head]),
            bearing,
            growth: VecDeque::new(),
            bands: ColorBands::new(tint),
        }
    }

    pub fn head(&self) -> Point {
        self.body[0]
    }

    /// Segments from head to tail.
    #[cfg(test)]
    pub fn body(&self) -> impl Iterator<Item = &Point> {
        self.body.iter()
    }

    pub fn len(&self) -> usize {
        self.body.len()
    }

    pub fn contains(&self, p: Point) -> bool {
        self.body.contains(&p)
    }

    pub fn bearing(&self) -> Bearing {
        self.bearing
    }

    pub fn bands(&self) -> &ColorBands {
        &self.bands
    }

    pub fn pending_growth(&self) -> usize {
        self.growth.len()
    }

    /// Turns towards `requested` unless that means reversing into the neck.
    /// Before the first point is scored there is no neck, so anything goes.
    pub fn steer(&mut self, requested: Bearing, score: u32) {
        if score == 0 || !requested.is_reverse_of(self.bearing) {
            self.bearing = requested;
        }
    }

    pub fn next_head(&self) -> Point {
        self.head() + self.bearing.delta()
    }

    /// Queues `value` growth units and opens a new color band at `score + 1`,
    /// where `score` already includes this meal.
    pub fn feed(&mut self, value: u8, tint: Option<Tint>, score: u32) {
        self.growth.extend(std::iter::repeat(tint).take(value as usize));
        self.bands.open(score + 1, tint);
    }

    pub fn advance(&mut self, new_head: Point) {
        self.body.push_front(new_head);
    }

    pub fn bites_itself(&self) -> bool {
        let head = self.head();
        self.body.iter().skip(GRACE_WINDOW).any(|p| *p == head)
    }

    /// Finishes a step: spends one growth unit if any is queued, otherwise
    /// drops the tail and returns the vacated cell.
    pub fn settle(&mut self) -> Option<Point> {
        match self.growth.pop_front() {
            Some(tint) => {
                self.bands.extend(tint);
                None
            }
            None => self.body.pop_back(),
        }
    }

    /// Color of the segment `index` cells behind the head.
    pub fn tint_at(&self, index: usize) -> Option<Tint> {
        self.bands.tint_from_tail(self.len() - 1 - index)
    }

    /// Cells that need repainting after a step besides the head.
    pub fn band_edges(&self) -> impl Iterator<Item = (Point, Option<Tint>)> + '_ {
        let len = self.len();
        self.bands
            .boundaries()
            .filter(move |(offset, _)| *offset < len)
            .map(move |(offset, tint)| (self.body[len - 1 - offset], tint))
    }
}
