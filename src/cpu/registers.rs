//! LC-3 register file.
//!
//! The LC-3 has:
//! - R0-R7: eight 16-bit general-purpose registers (R7 doubles as the link register)
//! - PC: 16-bit program counter
//! - COND: condition code, exactly one of N/Z/P

use crate::word::{Condition, Word};
use serde::{Serialize, Deserialize};

/// Number of general-purpose registers.
pub const GPR_COUNT: usize = 8;

/// Index of the link register written by JSR, JSRR and TRAP.
pub const LINK: u8 = 7;

/// The LC-3 register file.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Registers {
    /// R0-R7
    pub r: [Word; GPR_COUNT],

    /// Program counter
    pub pc: Word,

    /// Condition code
    pub cond: Condition,
}

impl Registers {
    /// Create a register file with all values zeroed and COND = Z.
    pub fn new() -> Self {
        Self {
            r: [0; GPR_COUNT],
            pc: 0,
            cond: Condition::Zero,
        }
    }

    /// Reset all registers and point PC at `start`.
    pub fn reset(&mut self, start: Word) {
        *self = Self::new();
        self.pc = start;
    }

    /// Read a general-purpose register. The index is taken modulo 8.
    #[inline]
    pub fn get(&self, index: u8) -> Word {
        self.r[(index & 7) as usize]
    }

    /// Write a general-purpose register. The index is taken modulo 8.
    #[inline]
    pub fn set(&mut self, index: u8, value: Word) {
        self.r[(index & 7) as usize] = value;
    }

    /// Set COND from the value now held in register `index`.
    #[inline]
    pub fn update_flags(&mut self, index: u8) {
        self.cond = Condition::from_value(self.get(index));
    }

    /// Increment the program counter by one word.
    /// Returns the old value.
    pub fn advance_pc(&mut self) -> Word {
        let old = self.pc;
        self.pc = self.pc.wrapping_add(1);
        old
    }

    /// Compute a PC-relative address from an already sign-extended offset.
    #[inline]
    pub fn pc_relative(&self, offset: Word) -> Word {
        self.pc.wrapping_add(offset)
    }

    /// Compute a base+offset address from an already sign-extended offset.
    #[inline]
    pub fn base_offset(&self, base: u8, offset: Word) -> Word {
        self.get(base).wrapping_add(offset)
    }
}

impl Default for Registers {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_set() {
        let mut regs = Registers::new();
        regs.set(3, 0xBEEF);
        assert_eq!(regs.get(3), 0xBEEF);
        // Out-of-range indices wrap onto R0-R7
        regs.set(9, 5);
        assert_eq!(regs.get(1), 5);
    }

    #[test]
    fn test_update_flags() {
        let mut regs = Registers::new();

        regs.set(0, 100);
        regs.update_flags(0);
        assert_eq!(regs.cond, Condition::Positive);

        regs.set(0, (-100i16) as Word);
        regs.update_flags(0);
        assert_eq!(regs.cond, Condition::Negative);

        regs.set(0, 0);
        regs.update_flags(0);
        assert_eq!(regs.cond, Condition::Zero);
    }

    #[test]
    fn test_advance_pc_wraps() {
        let mut regs = Registers::new();
        regs.pc = 0xFFFF;

        let old = regs.advance_pc();
        assert_eq!(old, 0xFFFF);
        assert_eq!(regs.pc, 0);
    }

    #[test]
    fn test_effective_addresses() {
        let mut regs = Registers::new();
        regs.pc = 0x3001;
        regs.set(2, 0x4000);

        assert_eq!(regs.pc_relative(0xFFFE), 0x2FFF);
        assert_eq!(regs.base_offset(2, 0xFFFF), 0x3FFF);
        regs.set(2, 0xFFFF);
        assert_eq!(regs.base_offset(2, 2), 0x0001);
    }

    #[test]
    fn test_reset() {
        let mut regs = Registers::new();
        regs.set(5, 1);
        regs.cond = Condition::Negative;
        regs.reset(0x3000);

        assert_eq!(regs, Registers { pc: 0x3000, ..Registers::new() });
    }
}
