use std::{
    sync::atomic::{AtomicBool, AtomicU8, Ordering},
    time::Duration,
};

use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

use crate::snake::Bearing;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Key {
    Turn(Bearing),
    Space,
    /// Ctrl+C, the process' termination request.
    Quit,
    Other,
}

impl From<KeyEvent> for Key {
    fn from(ev: KeyEvent) -> Self {
        if ev.kind == KeyEventKind::Release {
            return Key::Other;
        }

        match ev.code {
            KeyCode::Char('c') if ev.modifiers.contains(KeyModifiers::CONTROL) => Key::Quit,
            KeyCode::Up => Key::Turn(Bearing::Up),
            KeyCode::Down => Key::Turn(Bearing::Down),
            KeyCode::Left => Key::Turn(Bearing::Left),
            KeyCode::Right => Key::Turn(Bearing::Right),
            KeyCode::Char(' ') => Key::Space,
            _ => Key::Other,
        }
    }
}

/// Where key presses come from. Never blocks longer than `timeout`.
pub trait KeySource {
    fn poll_key(&mut self, timeout: Duration) -> Result<Option<Key>>;
}

/// The only state shared between the input loop and the simulation thread.
/// Each field has one writer:
///
/// - `requested`: input loop writes, simulation reads once per tick
/// - `running`: simulation clears it on game over; the controller sets it when
///   starting a round and clears it only to stop the round on termination
/// - `restart`: input loop raises, controller takes
/// - `input_enabled`: simulation clears it on a fatal error
pub struct Controls {
    requested: AtomicU8,
    running: AtomicBool,
    restart: AtomicBool,
    input_enabled: AtomicBool,
}

impl Controls {
    pub fn new() -> Self {
        Controls {
            requested: AtomicU8::new(Bearing::Right.to_u8()),
            running: AtomicBool::new(false),
            restart: AtomicBool::new(false),
            input_enabled: AtomicBool::new(true),
        }
    }

    pub fn requested_bearing(&self) -> Bearing {
        Bearing::from_u8(self.requested.load(Ordering::Acquire))
    }

    pub fn request_bearing(&self, bearing: Bearing) {
        self.requested.store(bearing.to_u8(), Ordering::Release);
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    pub fn is_game_over(&self) -> bool {
        !self.is_running()
    }

    /// Arms the controls for a fresh round heading towards `bearing`.
    pub fn begin_round(&self, bearing: Bearing) {
        self.request_bearing(bearing);
        self.restart.store(false, Ordering::Release);
        self.running.store(true, Ordering::Release);
    }

    pub fn end_round(&self) {
        self.running.store(false, Ordering::Release);
    }

    pub fn request_restart(&self) {
        self.restart.store(true, Ordering::Release);
    }

    pub fn take_restart(&self) -> bool {
        self.restart.swap(false, Ordering::AcqRel)
    }

    pub fn input_enabled(&self) -> bool {
        self.input_enabled.load(Ordering::Acquire)
    }

    pub fn disable_input(&self) {
        self.input_enabled.store(false, Ordering::Release);
    }
}

impl Default for Controls {
    fn default() -> Self {
        Controls::new()
    }
}

pub struct InputRouter;

impl InputRouter {
    /// Applies one key press to the shared controls. The latest turn wins;
    /// Space only counts between rounds. Returns false on a termination request.
    pub fn route(key: Key, controls: &Controls) -> bool {
        match key {
            Key::Turn(bearing) => controls.request_bearing(bearing),
            Key::Space if controls.is_game_over() => controls.request_restart(),
            Key::Quit => return false,
            Key::Space | Key::Other => {}
        }

        true
    }
}
