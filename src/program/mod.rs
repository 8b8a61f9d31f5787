//! Program tooling for LC-3 machine code.
//!
//! This module provides:
//! - The object image format (big-endian words behind an origin word)
//! - A disassembler (machine code → readable text)

pub mod image;
pub mod disasm;

pub use image::{Image, ImageError, load_image, parse_image};
pub use disasm::{disassemble, disassemble_instruction};
