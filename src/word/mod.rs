//! 16-bit word primitives.
//!
//! This module provides the helpers every opcode is built on:
//! - [`sign_extend`] - widen a two's-complement field to a full word
//! - [`field`] - extract a contiguous bit field from an instruction
//! - [`Condition`] - the N/Z/P condition code

mod cond;

pub use cond::Condition;

/// A machine word.
pub type Word = u16;

/// Width of a machine word in bits.
pub const WORD_BITS: u32 = 16;

/// Sign-extend the low `bit_count` bits of `x` to a full 16-bit word.
///
/// If bit `bit_count - 1` is set, every bit from `bit_count` upward is
/// filled with ones. Otherwise the value passes through unchanged.
/// Bits above `bit_count` in the input are expected to be clear.
#[inline]
pub fn sign_extend(x: Word, bit_count: u32) -> Word {
    debug_assert!(bit_count > 0 && bit_count <= WORD_BITS);
    if bit_count < WORD_BITS && (x >> (bit_count - 1)) & 1 == 1 {
        x | (0xFFFF << bit_count)
    } else {
        x
    }
}

/// Extract `len` bits of `instr` starting at bit `lo`.
#[inline]
pub const fn field(instr: Word, lo: u32, len: u32) -> Word {
    (instr >> lo) & ((1 << len) - 1)
}

/// Extract a field and sign-extend it in one step.
#[inline]
pub fn signed_field(instr: Word, lo: u32, len: u32) -> Word {
    sign_extend(field(instr, lo, len), len)
}

/// Interpret a word as a signed quantity (for display).
#[inline]
pub const fn as_signed(x: Word) -> i16 {
    x as i16
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sign_extend_positive() {
        assert_eq!(sign_extend(0b01111, 5), 0b01111);
        assert_eq!(sign_extend(0x00FF, 9), 0x00FF);
    }

    #[test]
    fn test_sign_extend_negative() {
        assert_eq!(sign_extend(0b11111, 5), 0xFFFF);
        assert_eq!(sign_extend(0b10000, 5), 0xFFF0);
        assert_eq!(sign_extend(0x1FE, 9), 0xFFFE);
        assert_eq!(as_signed(sign_extend(0x400, 11)), -1024);
    }

    #[test]
    fn test_field() {
        let instr = 0b0001_010_011_1_00101;
        assert_eq!(field(instr, 12, 4), 0b0001);
        assert_eq!(field(instr, 9, 3), 0b010);
        assert_eq!(field(instr, 6, 3), 0b011);
        assert_eq!(field(instr, 5, 1), 1);
        assert_eq!(field(instr, 0, 5), 0b00101);
    }

    #[test]
    fn test_signed_field() {
        // offset6 = -1
        assert_eq!(signed_field(0b0110_000_001_111111, 0, 6), 0xFFFF);
        // offset6 = +31
        assert_eq!(signed_field(0b0110_000_001_011111, 0, 6), 31);
    }
}
