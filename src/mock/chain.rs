use std::collections::BTreeMap;

use crate::config::{PINS_PER_REGISTER, Wiring};
use crate::{Direction, Gpio, Level};

/// A line-level operation seen by the simulated chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BusEvent {
    Latch(Level),
    Clock(Level),
    Data(Level),
    Sample(Level),
}

/// Behavioural model of chained 74HC595 and 74HC165 registers.
///
/// Output register `k` sits `k` stages down the 595 chain from serial-out and
/// input register `k` sits `k` stages up the 165 chain from serial-in, so pair
/// 0 is the one next to the controller on both sides.
///
/// - 595: shifts serial-out into Q0 on every rising clock edge and copies the
///   shift stage to the held outputs on a rising latch edge.
/// - 165: loads the parallel inputs while the latch line is low and shifts
///   towards serial-in on rising clock edges while it is high. The far end
///   shifts in zeros.
#[derive(Debug, Clone)]
pub struct SimulatedChain {
    wiring: Wiring,
    directions: BTreeMap<u8, Direction>,
    clock: Level,
    latch: Level,
    serial_out: Level,
    shift_stage: Vec<u8>,
    held: Vec<u8>,
    inputs: Vec<u8>,
    loaded: Vec<u8>,
    trace: Option<Vec<BusEvent>>,
}

impl SimulatedChain {
    /// Creates a chain of `pairs` register pairs wired as `wiring`.
    pub fn new(wiring: Wiring, pairs: usize) -> Self {
        Self {
            wiring,
            directions: BTreeMap::new(),
            clock: Level::Low,
            latch: Level::Low,
            serial_out: Level::Low,
            shift_stage: vec![0; pairs],
            held: vec![0; pairs],
            inputs: vec![0; pairs],
            loaded: vec![0; pairs],
            trace: None,
        }
    }

    /// Creates a chain of `pairs` register pairs on the default wiring.
    pub fn with_pairs(pairs: usize) -> Self {
        Self::new(Wiring::default(), pairs)
    }

    /// Start recording line events.
    pub fn enable_trace(&mut self) {
        self.trace.get_or_insert_with(Vec::new);
    }

    /// Returns and clears the recorded events.
    pub fn take_trace(&mut self) -> Vec<BusEvent> {
        self.trace.as_mut().map(std::mem::take).unwrap_or_default()
    }

    #[inline]
    pub fn pairs(&self) -> usize {
        self.held.len()
    }

    #[inline]
    pub fn pin_count(&self) -> usize {
        self.pairs() * PINS_PER_REGISTER
    }

    /// Direction last configured for `pin`, if any.
    pub fn direction(&self, pin: u8) -> Option<Direction> {
        self.directions.get(&pin).copied()
    }

    /// Level currently driven on `pin` by the controller side.
    pub fn line(&self, pin: u8) -> Level {
        match pin {
            p if p == self.wiring.clock => self.clock,
            p if p == self.wiring.latch => self.latch,
            p if p == self.wiring.serial_out => self.serial_out,
            _ => Level::Low,
        }
    }

    /// Sets the physical level of input `pin`.
    pub fn set_input(&mut self, pin: usize, high: bool) {
        let (register, bit) = (pin / PINS_PER_REGISTER, pin % PINS_PER_REGISTER);
        if high {
            self.inputs[register] |= 1 << bit;
        } else {
            self.inputs[register] &= !(1 << bit);
        }
        if self.latch == Level::Low {
            self.loaded.copy_from_slice(&self.inputs);
        }
    }

    /// Flips the physical level of input `pin`.
    pub fn toggle_input(&mut self, pin: usize) {
        let high = self.input(pin);
        self.set_input(pin, !high);
    }

    /// Physical level of input `pin`.
    pub fn input(&self, pin: usize) -> bool {
        (self.inputs[pin / PINS_PER_REGISTER] >> (pin % PINS_PER_REGISTER)) & 1 == 1
    }

    /// Level presented on output `pin`.
    pub fn output(&self, pin: usize) -> bool {
        (self.held[pin / PINS_PER_REGISTER] >> (pin % PINS_PER_REGISTER)) & 1 == 1
    }

    /// Levels presented by output register `register`.
    pub fn outputs(&self, register: usize) -> u8 {
        self.held[register]
    }

    /// Bits sitting in the shift stage of output register `register`, not yet latched.
    pub fn shifted(&self, register: usize) -> u8 {
        self.shift_stage[register]
    }

    fn record(&mut self, event: BusEvent) {
        if let Some(trace) = self.trace.as_mut() {
            trace.push(event);
        }
    }

    fn on_clock(&mut self, level: Level) {
        let rising = self.clock == Level::Low && level == Level::High;
        self.clock = level;
        self.record(BusEvent::Clock(level));
        if !rising {
            return;
        }

        let mut carry = u8::from(bool::from(self.serial_out));
        for stage in self.shift_stage.iter_mut() {
            let next = *stage >> 7;
            *stage = (*stage << 1) | carry;
            carry = next;
        }

        if self.latch == Level::High {
            let far_end = self.loaded.len().saturating_sub(1);
            for k in 0..self.loaded.len() {
                let upstream = if k < far_end { self.loaded[k + 1] >> 7 } else { 0 };
                self.loaded[k] = (self.loaded[k] << 1) | upstream;
            }
        }
    }

    fn on_latch(&mut self, level: Level) {
        let rising = self.latch == Level::Low && level == Level::High;
        self.latch = level;
        self.record(BusEvent::Latch(level));

        if level == Level::Low {
            self.loaded.copy_from_slice(&self.inputs);
        }
        if rising {
            self.held.copy_from_slice(&self.shift_stage);
        }
    }

    fn serial_in(&self) -> Level {
        self.loaded
            .first()
            .map(|byte| Level::from(byte >> 7 == 1))
            .unwrap_or_default()
    }
}

impl Gpio for SimulatedChain {
    fn set_direction(&mut self, pin: u8, direction: Direction) {
        self.directions.insert(pin, direction);
    }

    fn write(&mut self, pin: u8, level: Level) {
        match pin {
            p if p == self.wiring.clock => self.on_clock(level),
            p if p == self.wiring.latch => self.on_latch(level),
            p if p == self.wiring.serial_out => {
                self.serial_out = level;
                self.record(BusEvent::Data(level));
            }
            _ => log::warn!("write to unwired pin {pin}"),
        }
    }

    fn read(&mut self, pin: u8) -> Level {
        if pin != self.wiring.serial_in {
            log::warn!("read from unwired pin {pin}");
            return Level::Low;
        }
        let level = self.serial_in();
        self.record(BusEvent::Sample(level));
        level
    }
}
