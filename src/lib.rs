//! # LC-3 Emulator
//!
//! An emulator of the LC-3, a 16-bit educational computer.
//!
//! The LC-3 has eight general-purpose registers, a program counter, an
//! N/Z/P condition code and 65,536 words of memory. This crate runs LC-3
//! object images instruction by instruction, with memory-mapped keyboard
//! input and the standard trap services.

pub mod word;
pub mod cpu;
pub mod io;
pub mod program;
pub mod config;

#[cfg(feature = "tui")]
pub mod tui;

#[cfg(feature = "wasm")]
pub mod wasm;

// Re-export commonly used types
pub use word::{Condition, Word, sign_extend};
pub use cpu::{Cpu, CpuState, CpuError, Memory, Registers, Instruction, Snapshot, TrapService};
pub use io::{Keyboard, BufferedKeyboard, NoKeyboard, SharedOutput};
pub use program::{Image, ImageError, load_image, parse_image, disassemble};
pub use config::{MachineConfig, ConfigError};

#[cfg(feature = "tui")]
pub use tui::run_debugger;
