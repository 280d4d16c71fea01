use std::collections::VecDeque;

use thiserror::Error;

use super::SimulatedChain;
use crate::ShiftChainIo;

/// Error when parsing an input script.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ScriptError {
    #[error("invalid pin: '{0}'")]
    InvalidPin(String),
    #[error("pin {pin} is outside the chain ({limit} pins)")]
    PinOutOfRange { pin: usize, limit: usize },
}

/// Scripted input transitions for a [`SimulatedChain`].
///
/// Every batch toggles a set of input pins and is followed by exactly one
/// scan cycle, so debounce windows can be walked through cycle by cycle.
#[derive(Debug, Clone)]
pub struct ScriptedInputs {
    pin_limit: usize,
    pending_batches: VecDeque<Vec<usize>>,
}

impl ScriptedInputs {
    /// Create for a chain with `pin_limit` input pins.
    pub fn new(pin_limit: usize) -> Self {
        Self {
            pin_limit,
            pending_batches: VecDeque::new(),
        }
    }

    /// Number of scan cycles still queued.
    #[inline]
    pub fn pending(&self) -> usize {
        self.pending_batches.len()
    }

    /// Parse and queue additional script.
    ///
    /// Format:
    /// - Pins are decimal indices separated by whitespace
    /// - A period ends a batch; each batch is one scan cycle
    /// - A period with no pins is a scan cycle without input changes
    ///
    /// Examples:
    /// - `"3."` - Toggle pin 3, scan once
    /// - `"3 5."` - Toggle pins 3 and 5 together, scan once
    /// - `"3. . ."` - Toggle pin 3, scan three times
    ///
    /// Nothing is queued if any part of the script is invalid.
    pub fn push_script(&mut self, script: &str) -> Result<(), ScriptError> {
        let batches = parse_script(script, self.pin_limit)?;
        self.pending_batches.extend(batches);
        Ok(())
    }

    /// Apply the next batch and run one scan cycle.
    ///
    /// Returns `false` if nothing was pending.
    pub fn tick<const N: usize>(&mut self, io: &mut ShiftChainIo<SimulatedChain, N>) -> bool {
        let Some(batch) = self.pending_batches.pop_front() else {
            return false;
        };
        for pin in batch {
            io.gpio_mut().toggle_input(pin);
        }
        io.run();
        true
    }

    /// Run every pending batch, calling `on_tick` with the cycle index after each scan.
    pub fn drain<const N: usize, F>(&mut self, io: &mut ShiftChainIo<SimulatedChain, N>, mut on_tick: F)
    where
        F: FnMut(usize, &ShiftChainIo<SimulatedChain, N>),
    {
        let mut cycle = 0;
        while self.tick(io) {
            on_tick(cycle, io);
            cycle += 1;
        }
    }
}

/// Parse a script into batches of pins to toggle.
fn parse_script(script: &str, pin_limit: usize) -> Result<Vec<Vec<usize>>, ScriptError> {
    let mut batches = Vec::new();
    let mut current = Vec::new();

    for (i, segment) in script.split('.').enumerate() {
        if i > 0 {
            batches.push(std::mem::take(&mut current));
        }
        for token in segment.split_whitespace() {
            current.push(parse_pin(token, pin_limit)?);
        }
    }

    // Trailing pins without a period still get their cycle
    if !current.is_empty() {
        batches.push(current);
    }
    Ok(batches)
}

fn parse_pin(token: &str, pin_limit: usize) -> Result<usize, ScriptError> {
    let pin: usize = token
        .parse()
        .map_err(|_| ScriptError::InvalidPin(token.to_string()))?;
    if pin >= pin_limit {
        return Err(ScriptError::PinOutOfRange {
            pin,
            limit: pin_limit,
        });
    }
    Ok(pin)
}
