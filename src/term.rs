use std::{
    io::{stdout, Stdout, Write},
    sync::atomic::{AtomicBool, Ordering},
    time::Duration,
};

use anyhow::{Context, Result};
use crossterm::event::{poll, read, Event};
use crossterm::style::{Attribute, Color, Print, ResetColor, SetAttribute, SetForegroundColor};
use crossterm::terminal::{ClearType, EnterAlternateScreen, LeaveAlternateScreen};
use crossterm::{cursor, execute, queue, terminal};

use crate::board::{Board, Point};
use crate::food::Tint;
use crate::input::{Key, KeySource};

pub const SEGMENT_CHAR: char = '█';

const POPUP_WIDTH: u16 = 40;
const POPUP_HEIGHT: u16 = 4;

/// Set while the terminal is in raw mode on the alternate screen.
static ACTIVE: AtomicBool = AtomicBool::new(false);

/// Everything the game draws goes through this. Points are game area
/// coordinates.
pub trait Screen: Send {
    fn draw_glyph(&mut self, at: Point, glyph: char, tint: Option<Tint>) -> Result<()>;
    fn draw_border(&mut self) -> Result<()>;
    fn show_scores(&mut self, score: u32, high: u32) -> Result<()>;
    fn show_game_over(&mut self) -> Result<()>;
    fn clear(&mut self) -> Result<()>;
    fn refresh(&mut self) -> Result<()>;
}

pub fn setup() -> Result<()> {
    let mut out = stdout();
    execute!(out, EnterAlternateScreen).context("entering alternate screen")?;
    ACTIVE.store(true, Ordering::Release);
    terminal::enable_raw_mode().context("enabling raw mode")?;
    execute!(out, cursor::Hide, cursor::DisableBlinking).context("hiding cursor")?;
    Ok(())
}

/// Puts the terminal back the way it was. Only the first call after
/// `setup` does anything.
pub fn restore() {
    if !ACTIVE.swap(false, Ordering::AcqRel) {
        return;
    }

    let mut out = stdout();
    let _ = terminal::disable_raw_mode();
    let _ = execute!(out, ResetColor, cursor::Show, cursor::EnableBlinking, LeaveAlternateScreen);
}

/// Restores the terminal when dropped, so unwinding out of `main` cleans up too.
pub struct RestoreGuard;

impl Drop for RestoreGuard {
    fn drop(&mut self) {
        restore();
    }
}

pub fn terminal_size() -> Result<(u16, u16)> {
    terminal::size().context("reading terminal size")
}

fn color(tint: Tint) -> Color {
    match tint {
        Tint::Blue => Color::Blue,
        Tint::Cyan => Color::Cyan,
        Tint::Green => Color::Green,
        Tint::Magenta => Color::Magenta,
        Tint::Red => Color::Red,
        Tint::Yellow => Color::Yellow,
    }
}

/// Draws on the real terminal. Row 0 is the score board, the game area
/// starts right below it.
pub struct TermManager {
    width: u16,
    height: u16,
    stdout: Stdout,
}

impl TermManager {
    pub fn new(board: &Board) -> Self {
        TermManager { width: board.cols() as u16, height: board.rows() as u16 + 1, stdout: stdout() }
    }

    fn print_at(&mut self, x: u16, y: u16, text: &str, tint: Option<Tint>) -> Result<()> {
        queue!(self.stdout, cursor::MoveTo(x, y), SetAttribute(Attribute::Bold))?;
        match tint {
            Some(tint) => queue!(self.stdout, SetForegroundColor(color(tint)), Print(text), ResetColor)?,
            None => queue!(self.stdout, Print(text))?,
        }
        queue!(self.stdout, SetAttribute(Attribute::Reset))?;
        Ok(())
    }
}

impl Screen for TermManager {
    fn draw_glyph(&mut self, at: Point, glyph: char, tint: Option<Tint>) -> Result<()> {
        let mut buf = [0u8; 4];
        self.print_at(at.col as u16, at.row as u16 + 1, glyph.encode_utf8(&mut buf), tint)
    }

    fn draw_border(&mut self) -> Result<()> {
        let (top, bottom) = (1, self.height - 1);
        let (left, right) = (0, self.width - 1);

        for x in left..=right {
            let ch = if x == left || x == right { "+" } else { "-" };
            self.print_at(x, top, ch, None)?;
            self.print_at(x, bottom, ch, None)?;
        }

        for y in top + 1..bottom {
            self.print_at(left, y, "|", None)?;
            self.print_at(right, y, "|", None)?;
        }

        Ok(())
    }

    fn show_scores(&mut self, score: u32, high: u32) -> Result<()> {
        self.print_at(self.width / 2 - 5, 0, &format!("HI: {:06}", high), Some(Tint::Red))?;
        self.print_at(self.width - 11, 0, &format!("P1: {:06}", score), Some(Tint::Blue))?;
        self.refresh()
    }

    fn show_game_over(&mut self) -> Result<()> {
        let left = self.width / 2 - POPUP_WIDTH / 2;
        let top = self.height / 2 - POPUP_HEIGHT / 2;
        let inner = POPUP_WIDTH as usize - 2;
        let edge = format!("+{}+", "-".repeat(inner));

        self.print_at(left, top, &edge, Some(Tint::Red))?;
        self.print_at(left, top + POPUP_HEIGHT - 1, &edge, Some(Tint::Red))?;

        let lines = [("Game Over!", Tint::Yellow), ("Press Space Bar to Play Again!", Tint::Green)];
        for (i, (line, tint)) in lines.iter().enumerate() {
            let y = top + 1 + i as u16;
            self.print_at(left, y, "|", Some(Tint::Red))?;
            self.print_at(left + 1, y, &format!("{line: ^width$}", line = line, width = inner), Some(*tint))?;
            self.print_at(left + POPUP_WIDTH - 1, y, "|", Some(Tint::Red))?;
        }

        self.refresh()
    }

    fn clear(&mut self) -> Result<()> {
        execute!(self.stdout, terminal::Clear(ClearType::All)).context("clearing screen")
    }

    fn refresh(&mut self) -> Result<()> {
        self.stdout.flush().context("flushing screen")
    }
}

pub struct TermKeys;

impl KeySource for TermKeys {
    fn poll_key(&mut self, timeout: Duration) -> Result<Option<Key>> {
        if !poll(timeout).context("polling for input")? {
            return Ok(None);
        }

        match read().context("reading input")? {
            Event::Key(ev) => Ok(Some(Key::from(ev))),
            _ => Ok(None),
        }
    }
}
