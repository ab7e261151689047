//!
//! ## Design
//!
//! * deterministic core: registers, memory and the opcode table know nothing
//!   about terminals, speakers or threads
//! * abstract display so can plug alternatives; starting with TUI in-console,
//!   plus a plain bitmap for headless runs and tests
//! * input device, with trait for reading key-presses and a separate
//!   translator for which physical key means which hex key
//! * audio device, with trait for switching the tone on and off
//! * CHIP-8 instructions run in batches per 60Hz frame, then sleep; so not
//!   quite authentic
//!
//! Model
//!
//! main
//!  |-- display, input, sound, config
//!  |-- interpreter(display, input, sound)
//!  |    |-- machine state(memory, registers, stack, timers)
//!  |    `-- opcode table
//!  |-- ticker(timers)        // own thread, 60Hz; the only other writer
//!  `-- main loop
//!       |-- run cycles_per_frame instructions
//!       |-- display.refresh()
//!       `-- sleep to the next frame
//!
//! The ticker keeps counting the timers down while the interpreter is
//! blocked on `LD Vx, K`.
pub mod bcd;
pub mod cli;
pub mod display;
pub mod error;
pub mod font;
pub mod input;
pub mod instruction;
pub mod interpreter;
pub mod machine;
pub mod memory;
pub mod sound;
pub mod timer;

pub use error::Error;
pub use instruction::ExecutionResult;
pub use interpreter::Chip8Interpreter;
