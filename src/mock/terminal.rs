use std::cell::RefCell;
use std::io::{self, Write};
use std::rc::Rc;

use super::{ScriptedInputs, SimulatedChain};
use crate::config::{DEFAULT_MAX_CHAIN, PINS_PER_REGISTER};
use crate::{InputCallback, ShiftChainIo};

/// Error type for terminal output.
#[derive(Debug, thiserror::Error)]
pub enum TerminalError {
    #[error("failed to write to terminal: {0}")]
    Io(#[from] io::Error),
}

type Notifications = Rc<RefCell<Vec<(u8, bool)>>>;

/// Most scan cycles a single `s` command runs.
const MAX_SCAN_BURST: usize = 100_000;

/// Clears the screen and moves cursor to top-left.
#[inline]
fn clear_screen() {
    print!("\x1B[2J\x1B[H");
}

/// Runs an interactive terminal for poking at a simulated register chain.
///
/// Inputs are toggled by hand, outputs set by pin or byte, and every scan
/// prints the notifications it delivered.
pub fn run_interactive_terminal() {
    let notifications: Notifications = Rc::default();
    let mut io = new_engine(&notifications);

    clear_screen();
    redraw(&io, &notifications);

    loop {
        print!("> ");
        if let Err(e) = io::stdout().flush() {
            eprintln!("Failed to flush stdout: {}", e);
            break;
        }

        let mut input = String::new();
        if let Err(e) = io::stdin().read_line(&mut input) {
            eprintln!("Failed to read input: {}", e);
            break;
        }

        let parts: Vec<&str> = input.split_whitespace().collect();
        if parts.is_empty() {
            continue;
        }

        match (parts[0], parse_arg(&parts, 1), parse_arg(&parts, 2)) {
            ("t", Some(pin), _) if pin < io.gpio().pin_count() => {
                io.gpio_mut().toggle_input(pin);
                println!("Input {pin} is now {}", level_name(io.gpio().input(pin)));
            }
            ("o", Some(pin), Some(value)) if pin < io.gpio().pin_count() => {
                io.set_output_pin(pin, value != 0);
                redraw(&io, &notifications);
            }
            ("b", Some(register), Some(byte)) if register < DEFAULT_MAX_CHAIN && byte <= 0xFF => {
                io.set_output_byte(register, byte as u8);
                redraw(&io, &notifications);
            }
            ("s", cycles, _) => match scan_burst(cycles) {
                Some(n) => {
                    for _ in 0..n {
                        io.run();
                    }
                    redraw(&io, &notifications);
                }
                None => println!("At most {MAX_SCAN_BURST} scans per command"),
            },
            ("c", Some(pairs), _) => {
                io.set_chain_length(pairs);
                redraw(&io, &notifications);
            }
            ("d", Some(cycles), _) if cycles <= usize::from(u8::MAX) => {
                io.set_debounce_threshold(cycles as u8);
                redraw(&io, &notifications);
            }
            ("x", _, _) => {
                let mut inputs = ScriptedInputs::new(io.pin_count());
                match inputs.push_script(input.trim_start()[1..].trim()) {
                    Ok(()) => {
                        inputs.drain(&mut io, |_, _| {});
                        redraw(&io, &notifications);
                    }
                    Err(e) => println!("❌ {e}"),
                }
            }
            ("r", _, _) => {
                notifications.borrow_mut().clear();
                io = new_engine(&notifications);
                redraw(&io, &notifications);
                println!("\n🔄 Reset to initial state");
            }
            ("p", _, _) => redraw(&io, &notifications),
            ("q", _, _) => break,
            _ => println!("Unknown command or bad argument"),
        }
    }
}

fn new_engine(notifications: &Notifications) -> ShiftChainIo<SimulatedChain> {
    let mut io = ShiftChainIo::with_default_wiring(SimulatedChain::with_pairs(DEFAULT_MAX_CHAIN));
    let sink = Rc::clone(notifications);
    let on_change: InputCallback = Box::new(move |pin, value| sink.borrow_mut().push((pin, value)));
    io.initialize(Some(on_change));
    io
}

fn parse_arg(parts: &[&str], index: usize) -> Option<usize> {
    let arg = parts.get(index)?;
    match arg.strip_prefix("0x").or_else(|| arg.strip_prefix("0b")) {
        Some(digits) if arg.starts_with("0x") => usize::from_str_radix(digits, 16).ok(),
        Some(digits) => usize::from_str_radix(digits, 2).ok(),
        None => arg.parse().ok(),
    }
}

/// Number of scans for `s [n]`: one by default, `None` when over the cap.
fn scan_burst(cycles: Option<usize>) -> Option<usize> {
    match cycles {
        None => Some(1),
        Some(n) if n <= MAX_SCAN_BURST => Some(n),
        Some(_) => None,
    }
}

fn level_name(high: bool) -> &'static str {
    if high { "high" } else { "low" }
}

fn redraw(io: &ShiftChainIo<SimulatedChain>, notifications: &Notifications) {
    clear_screen();
    let delivered: Vec<_> = notifications.borrow_mut().drain(..).collect();
    if let Err(e) = render_state(&mut io::stdout(), io, &delivered) {
        eprintln!("{e}");
    }
}

/// Draws help text, the register table and the notifications since the last redraw.
fn render_state<const N: usize>(
    w: &mut impl Write,
    io: &ShiftChainIo<SimulatedChain, N>,
    delivered: &[(u8, bool)],
) -> Result<(), TerminalError> {
    writeln!(w, "🔌 Shift Chain Simulator")?;
    writeln!(w)?;
    writeln!(
        w,
        "Commands: t <pin> | o <pin> <0|1> | b <reg> <byte> | s [n] | c <pairs> | d <cycles> | x <script> | r | p | q"
    )?;
    writeln!(w)?;
    writeln!(
        w,
        "Chain: {} pair(s) | Debounce: {} cycle(s)",
        io.chain_length(),
        io.debounce_threshold()
    )?;
    writeln!(w)?;
    writeln!(w, " reg │ requested │ latched   │ physical in │ sampled")?;
    writeln!(w, "─────┼───────────┼───────────┼─────────────┼──────────")?;

    let chain = io.gpio();
    for register in 0..io.chain_length().min(chain.pairs()) {
        let physical_in = (0..PINS_PER_REGISTER).fold(0u8, |byte, bit| {
            byte | (u8::from(chain.input(register * PINS_PER_REGISTER + bit)) << bit)
        });
        writeln!(
            w,
            "  {register}  │ {:08b}  │ {:08b}  │ {:08b}    │ {:08b}",
            io.output_byte(register),
            chain.outputs(register),
            physical_in,
            io.input_byte(register)
        )?;
    }

    writeln!(w)?;
    if delivered.is_empty() {
        writeln!(w, "No notifications")?;
    } else {
        for (pin, value) in delivered {
            writeln!(w, "📣 input {pin} → {}", level_name(*value))?;
        }
    }
    w.flush()?;
    Ok(())
}
