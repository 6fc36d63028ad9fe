//! Simulated GPIO chip with a shift-register slave on the bus lines.
//!
//! On every rising clock edge the slave latches data-out and presents the
//! next queued bit on data-in. In loopback mode latched bits are queued
//! again, so a written byte comes back on the following read.

#![allow(dead_code)]

use std::collections::{BTreeSet, HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};

use embedded_hal::digital::PinState;
use spisw::{GpioChip, GpioLine, PinConfig, PinError};

/// Identifiers below this value exist on the simulated platform.
pub const LINE_COUNT: u32 = 64;

pub fn init_logging() {
    let _ = env_logger::builder()
        .is_test(true)
        .filter_level(log::LevelFilter::Debug)
        .try_init();
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Input,
    Output,
}

#[derive(Debug, Clone)]
pub struct LineState {
    pub claimed: bool,
    pub label: Option<&'static str>,
    pub mode: Option<Mode>,
    pub level: PinState,
}

impl Default for LineState {
    fn default() -> Self {
        Self {
            claimed: false,
            label: None,
            mode: None,
            level: PinState::Low,
        }
    }
}

#[derive(Default)]
struct Bench {
    lines: HashMap<u32, LineState>,
    refused: BTreeSet<u32>,
    stuck: BTreeSet<u32>,
    wiring: Option<PinConfig>,
    loopback: bool,
    replies: VecDeque<bool>,
    latched: Vec<bool>,
}

impl Bench {
    fn line(&mut self, id: u32) -> &mut LineState {
        self.lines.entry(id).or_default()
    }

    fn drive(&mut self, id: u32, level: PinState) {
        let previous = std::mem::replace(&mut self.line(id).level, level);

        let Some(wiring) = self.wiring else {
            return;
        };
        if id != wiring.clock || previous != PinState::Low || level != PinState::High {
            return;
        }

        let mosi = self.line(wiring.data_out).level == PinState::High;
        self.latched.push(mosi);

        let miso = self.replies.pop_front().unwrap_or(false);
        if self.loopback {
            self.replies.push_back(mosi);
        }
        self.line(wiring.data_in).level = PinState::from(miso);
    }
}

/// Test-side handle on the simulated board.
#[derive(Clone, Default)]
pub struct SimBoard {
    bench: Arc<Mutex<Bench>>,
}

impl SimBoard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Board wired as a shift register on `pins`.
    pub fn wired(pins: &PinConfig) -> Self {
        let board = Self::new();
        board.bench().wiring = Some(*pins);
        board
    }

    pub fn chip(&self) -> SimChip {
        SimChip {
            bench: self.bench.clone(),
        }
    }

    /// Replay latched bits on data-in, eight clocks later. The register
    /// starts out holding an idle (all low) byte.
    pub fn loopback(&self) {
        let mut bench = self.bench();
        bench.loopback = true;
        bench.replies.extend([false; 8]);
    }

    /// Make requests for `id` fail as if another driver held the line.
    pub fn refuse(&self, id: u32) {
        self.bench().refused.insert(id);
    }

    /// Make `id` ignore every later level change and report it as a
    /// configuration failure.
    pub fn stick(&self, id: u32) {
        self.bench().stuck.insert(id);
    }

    /// Queue `bytes` on data-in, most-significant bit first.
    pub fn reply(&self, bytes: &[u8]) {
        let mut bench = self.bench();
        for &byte in bytes {
            bench
                .replies
                .extend((0..8).rev().map(|bit| byte & (1 << bit) != 0));
        }
    }

    /// Bytes latched from data-out so far, most-significant bit first.
    pub fn latched_bytes(&self) -> Vec<u8> {
        self.bench()
            .latched
            .chunks(8)
            .map(|bits| bits.iter().fold(0u8, |acc, &bit| (acc << 1) | u8::from(bit)))
            .collect()
    }

    pub fn line(&self, id: u32) -> LineState {
        self.bench().line(id).clone()
    }

    pub fn is_claimed(&self, id: u32) -> bool {
        self.line(id).claimed
    }

    pub fn level(&self, id: u32) -> PinState {
        self.line(id).level
    }

    pub fn claimed_count(&self) -> usize {
        self.bench().lines.values().filter(|line| line.claimed).count()
    }

    fn bench(&self) -> MutexGuard<'_, Bench> {
        self.bench.lock().unwrap()
    }
}

pub struct SimChip {
    bench: Arc<Mutex<Bench>>,
}

impl GpioChip for SimChip {
    type Line = SimLine;

    fn request(&mut self, id: u32, label: &'static str) -> Result<SimLine, PinError> {
        let mut bench = self.bench.lock().unwrap();
        if id >= LINE_COUNT || bench.refused.contains(&id) || bench.line(id).claimed {
            return Err(PinError::Unavailable { id });
        }

        let line = bench.line(id);
        line.claimed = true;
        line.label = Some(label);
        line.mode = None;

        Ok(SimLine {
            id,
            bench: self.bench.clone(),
        })
    }

    fn free(&mut self, line: SimLine) {
        let mut bench = self.bench.lock().unwrap();
        let state = bench.line(line.id);
        state.claimed = false;
        state.label = None;
        state.mode = None;
    }
}

pub struct SimLine {
    id: u32,
    bench: Arc<Mutex<Bench>>,
}

impl GpioLine for SimLine {
    fn direction_output(&mut self, initial: PinState) -> Result<(), PinError> {
        let mut bench = self.bench.lock().unwrap();
        bench.line(self.id).mode = Some(Mode::Output);
        bench.drive(self.id, initial);
        Ok(())
    }

    fn direction_input(&mut self) -> Result<(), PinError> {
        self.bench.lock().unwrap().line(self.id).mode = Some(Mode::Input);
        Ok(())
    }

    fn set_value(&mut self, level: PinState) -> Result<(), PinError> {
        let mut bench = self.bench.lock().unwrap();
        if bench.stuck.contains(&self.id) {
            return Err(PinError::Configuration { id: self.id });
        }
        bench.drive(self.id, level);
        Ok(())
    }

    fn get_value(&mut self) -> PinState {
        self.bench.lock().unwrap().line(self.id).level
    }
}
