//! CPU emulation for the LC-3.
//!
//! This module implements the complete LC-3 user-mode architecture:
//! - 65,536 sixteen-bit memory cells with memory-mapped keyboard registers
//! - 8 general-purpose registers, PC and the N/Z/P condition code
//! - 16 opcodes in a fixed 16-bit encoding, plus the standard trap services

pub mod memory;
pub mod registers;
pub mod decode;
pub mod execute;
pub mod trap;
pub mod snapshot;

pub use memory::{Memory, MemoryError, KBDR, KBSR, MEMORY_SIZE};
pub use registers::Registers;
pub use decode::{decode, encode, Instruction, JsrTarget, Opcode, Operand};
pub use execute::{Cpu, CpuError, CpuState};
pub use trap::TrapService;
pub use snapshot::Snapshot;
