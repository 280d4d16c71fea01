mod chain;
mod script;
mod terminal;

pub use chain::{BusEvent, SimulatedChain};
pub use script::{ScriptError, ScriptedInputs};
pub use terminal::{TerminalError, run_interactive_terminal};
