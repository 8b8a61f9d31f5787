//! Condition codes.
//!
//! The LC-3 keeps a single condition register holding exactly one of
//! N (negative), Z (zero) or P (positive). Branches test it with a
//! 3-bit nzp mask using the same bit layout.

use std::fmt;
use serde::{Serialize, Deserialize};
use super::Word;

/// The condition code set by the last flag-updating instruction.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Condition {
    /// Result was negative (bit 15 set)
    Negative = 0b100,
    /// Result was zero
    Zero = 0b010,
    /// Result was positive
    Positive = 0b001,
}

impl Condition {
    /// All condition values in nzp order.
    pub const ALL: [Condition; 3] = [Condition::Negative, Condition::Zero, Condition::Positive];

    /// Derive the condition code of a result.
    #[inline]
    pub const fn from_value(value: Word) -> Self {
        if value == 0 {
            Condition::Zero
        } else if value >> 15 == 1 {
            Condition::Negative
        } else {
            Condition::Positive
        }
    }

    /// The nzp bit pattern (exactly one bit set).
    #[inline]
    pub const fn bits(self) -> u8 {
        self as u8
    }

    /// Does a branch with this `nzp` mask fire under this condition?
    #[inline]
    pub const fn matches(self, nzp: u8) -> bool {
        nzp & self.bits() != 0
    }

    /// Single-letter mnemonic.
    pub const fn letter(self) -> char {
        match self {
            Condition::Negative => 'N',
            Condition::Zero => 'Z',
            Condition::Positive => 'P',
        }
    }
}

impl Default for Condition {
    fn default() -> Self {
        Condition::Zero
    }
}

impl fmt::Debug for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.letter())
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.letter())
    }
}
