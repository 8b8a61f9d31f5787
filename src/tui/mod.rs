//! TUI debugger for the LC-3 emulator.
//!
//! Provides an interactive terminal-based debugger with:
//! - Register and condition code view
//! - Memory view (read without device side effects)
//! - Step/run/breakpoint controls
//! - Disassembly and program output views

mod app;
mod ui;

pub use app::{DebuggerApp, run_debugger};
