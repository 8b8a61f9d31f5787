//! Instruction decoder for the LC-3.
//!
//! Every instruction is one 16-bit word. Bits 15-12 hold the opcode and
//! the remaining bits are opcode-specific fields. Decoding is total: all
//! 65,536 words map to some [`Instruction`], and immediates/offsets are
//! sign-extended here so the executor only ever sees full words.

use crate::word::{field, signed_field, Word};
use serde::{Serialize, Deserialize};

/// The 16 architectural opcodes, in encoding order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Opcode {
    Br = 0,
    Add,
    Ld,
    St,
    Jsr,
    And,
    Ldr,
    Str,
    Rti,
    Not,
    Ldi,
    Sti,
    Jmp,
    Res,
    Lea,
    Trap,
}

impl Opcode {
    /// Extract the opcode from bits 15-12.
    pub const fn from_word(instr: Word) -> Self {
        match instr >> 12 {
            0 => Opcode::Br,
            1 => Opcode::Add,
            2 => Opcode::Ld,
            3 => Opcode::St,
            4 => Opcode::Jsr,
            5 => Opcode::And,
            6 => Opcode::Ldr,
            7 => Opcode::Str,
            8 => Opcode::Rti,
            9 => Opcode::Not,
            10 => Opcode::Ldi,
            11 => Opcode::Sti,
            12 => Opcode::Jmp,
            13 => Opcode::Res,
            14 => Opcode::Lea,
            _ => Opcode::Trap,
        }
    }

    /// The opcode shifted into bits 15-12.
    #[inline]
    pub const fn bits(self) -> Word {
        (self as Word) << 12
    }
}

/// Second operand of ADD and AND.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operand {
    /// Register SR2 (bit 5 clear)
    Register(u8),
    /// Sign-extended imm5 (bit 5 set)
    Immediate(Word),
}

/// Jump target of JSR/JSRR.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JsrTarget {
    /// JSR: PC-relative, sign-extended offset11 (bit 11 set)
    Offset(Word),
    /// JSRR: address in a base register (bit 11 clear)
    Register(u8),
}

/// Decoded LC-3 instruction.
///
/// All `offset` and immediate fields are already sign-extended to 16 bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Instruction {
    // ==================== Operate ====================

    /// DR := SR1 + operand
    Add { dr: u8, sr1: u8, operand: Operand },

    /// DR := SR1 & operand
    And { dr: u8, sr1: u8, operand: Operand },

    /// DR := !SR
    Not { dr: u8, sr: u8 },

    // ==================== Data Movement ====================

    /// DR := mem[PC + offset9]
    Ld { dr: u8, offset: Word },

    /// DR := mem[mem[PC + offset9]]
    Ldi { dr: u8, offset: Word },

    /// DR := mem[BaseR + offset6]
    Ldr { dr: u8, base: u8, offset: Word },

    /// DR := PC + offset9
    Lea { dr: u8, offset: Word },

    /// mem[PC + offset9] := SR
    St { sr: u8, offset: Word },

    /// mem[mem[PC + offset9]] := SR
    Sti { sr: u8, offset: Word },

    /// mem[BaseR + offset6] := SR
    Str { sr: u8, base: u8, offset: Word },

    // ==================== Control ====================

    /// If any flag selected by nzp is set: PC := PC + offset9
    Br { nzp: u8, offset: Word },

    /// PC := BaseR (RET when BaseR is R7)
    Jmp { base: u8 },

    /// R7 := PC, then jump
    Jsr { target: JsrTarget },

    /// R7 := PC, PC := mem[trapvect8]
    Trap { vector: u8 },

    /// Return from interrupt: a no-op in user mode
    Rti,

    /// Reserved opcode: a no-op
    Reserved,
}

impl Instruction {
    /// The opcode this instruction encodes to.
    pub fn opcode(&self) -> Opcode {
        match self {
            Instruction::Add { .. } => Opcode::Add,
            Instruction::And { .. } => Opcode::And,
            Instruction::Not { .. } => Opcode::Not,
            Instruction::Ld { .. } => Opcode::Ld,
            Instruction::Ldi { .. } => Opcode::Ldi,
            Instruction::Ldr { .. } => Opcode::Ldr,
            Instruction::Lea { .. } => Opcode::Lea,
            Instruction::St { .. } => Opcode::St,
            Instruction::Sti { .. } => Opcode::Sti,
            Instruction::Str { .. } => Opcode::Str,
            Instruction::Br { .. } => Opcode::Br,
            Instruction::Jmp { .. } => Opcode::Jmp,
            Instruction::Jsr { .. } => Opcode::Jsr,
            Instruction::Trap { .. } => Opcode::Trap,
            Instruction::Rti => Opcode::Rti,
            Instruction::Reserved => Opcode::Res,
        }
    }
}

#[inline]
fn reg(instr: Word, lo: u32) -> u8 {
    field(instr, lo, 3) as u8
}

fn operand(instr: Word) -> Operand {
    if field(instr, 5, 1) == 1 {
        Operand::Immediate(signed_field(instr, 0, 5))
    } else {
        Operand::Register(reg(instr, 0))
    }
}

/// Decode a 16-bit instruction word.
///
/// Field layout (bit ranges, high to low):
/// - DR/SR: 11-9, SR1/BaseR: 8-6, SR2: 2-0
/// - imm5: 4-0 (selected by bit 5), offset6: 5-0, offset9: 8-0, offset11: 10-0
/// - nzp: 11-9, trapvect8: 7-0
pub fn decode(instr: Word) -> Instruction {
    match Opcode::from_word(instr) {
        Opcode::Br => Instruction::Br {
            nzp: field(instr, 9, 3) as u8,
            offset: signed_field(instr, 0, 9),
        },
        Opcode::Add => Instruction::Add {
            dr: reg(instr, 9),
            sr1: reg(instr, 6),
            operand: operand(instr),
        },
        Opcode::Ld => Instruction::Ld {
            dr: reg(instr, 9),
            offset: signed_field(instr, 0, 9),
        },
        Opcode::St => Instruction::St {
            sr: reg(instr, 9),
            offset: signed_field(instr, 0, 9),
        },
        Opcode::Jsr => Instruction::Jsr {
            target: if field(instr, 11, 1) == 1 {
                JsrTarget::Offset(signed_field(instr, 0, 11))
            } else {
                JsrTarget::Register(reg(instr, 6))
            },
        },
        Opcode::And => Instruction::And {
            dr: reg(instr, 9),
            sr1: reg(instr, 6),
            operand: operand(instr),
        },
        Opcode::Ldr => Instruction::Ldr {
            dr: reg(instr, 9),
            base: reg(instr, 6),
            offset: signed_field(instr, 0, 6),
        },
        Opcode::Str => Instruction::Str {
            sr: reg(instr, 9),
            base: reg(instr, 6),
            offset: signed_field(instr, 0, 6),
        },
        Opcode::Rti => Instruction::Rti,
        Opcode::Not => Instruction::Not {
            dr: reg(instr, 9),
            sr: reg(instr, 6),
        },
        Opcode::Ldi => Instruction::Ldi {
            dr: reg(instr, 9),
            offset: signed_field(instr, 0, 9),
        },
        Opcode::Sti => Instruction::Sti {
            sr: reg(instr, 9),
            offset: signed_field(instr, 0, 9),
        },
        Opcode::Jmp => Instruction::Jmp { base: reg(instr, 6) },
        Opcode::Res => Instruction::Reserved,
        Opcode::Lea => Instruction::Lea {
            dr: reg(instr, 9),
            offset: signed_field(instr, 0, 9),
        },
        Opcode::Trap => Instruction::Trap {
            vector: field(instr, 0, 8) as u8,
        },
    }
}

#[inline]
fn put(value: impl Into<Word>, lo: u32, len: u32) -> Word {
    (value.into() & ((1 << len) - 1)) << lo
}

fn put_operand(op: Operand) -> Word {
    match op {
        Operand::Register(sr2) => put(sr2, 0, 3),
        Operand::Immediate(imm) => (1 << 5) | put(imm, 0, 5),
    }
}

/// Encode an instruction back to a 16-bit word.
///
/// Register indices and offsets are truncated to their field widths.
/// Unused bits (e.g. the 111111 of NOT) are filled the way an assembler would.
pub fn encode(instr: &Instruction) -> Word {
    let body = match *instr {
        Instruction::Add { dr, sr1, operand } | Instruction::And { dr, sr1, operand } => {
            put(dr, 9, 3) | put(sr1, 6, 3) | put_operand(operand)
        }
        Instruction::Not { dr, sr } => put(dr, 9, 3) | put(sr, 6, 3) | 0x3F,
        Instruction::Ld { dr, offset }
        | Instruction::Ldi { dr, offset }
        | Instruction::Lea { dr, offset } => put(dr, 9, 3) | put(offset, 0, 9),
        Instruction::St { sr, offset } | Instruction::Sti { sr, offset } => {
            put(sr, 9, 3) | put(offset, 0, 9)
        }
        Instruction::Ldr { dr: r, base, offset } | Instruction::Str { sr: r, base, offset } => {
            put(r, 9, 3) | put(base, 6, 3) | put(offset, 0, 6)
        }
        Instruction::Br { nzp, offset } => put(nzp, 9, 3) | put(offset, 0, 9),
        Instruction::Jmp { base } => put(base, 6, 3),
        Instruction::Jsr { target: JsrTarget::Offset(offset) } => (1 << 11) | put(offset, 0, 11),
        Instruction::Jsr { target: JsrTarget::Register(base) } => put(base, 6, 3),
        Instruction::Trap { vector } => put(vector, 0, 8),
        Instruction::Rti | Instruction::Reserved => 0,
    };

    instr.opcode().bits() | body
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_opcode_is_total() {
        for op in 0..16u16 {
            assert_eq!(Opcode::from_word(op << 12) as u16, op);
        }
    }

    #[test]
    fn test_decode_add_immediate() {
        // ADD R1, R2, #-1
        let instr = decode(0b0001_001_010_1_11111);
        assert_eq!(instr, Instruction::Add {
            dr: 1,
            sr1: 2,
            operand: Operand::Immediate(0xFFFF),
        });
    }

    #[test]
    fn test_decode_and_register() {
        // AND R3, R4, R5
        let instr = decode(0b0101_011_100_0_00_101);
        assert_eq!(instr, Instruction::And { dr: 3, sr1: 4, operand: Operand::Register(5) });
    }

    #[test]
    fn test_decode_branch() {
        // BRnp #-3
        let instr = decode(0b0000_101_111111101);
        assert_eq!(instr, Instruction::Br { nzp: 0b101, offset: (-3i16) as Word });
    }

    #[test]
    fn test_decode_jsr_forms() {
        assert_eq!(
            decode(0b0100_1_00000000100),
            Instruction::Jsr { target: JsrTarget::Offset(4) }
        );
        assert_eq!(
            decode(0b0100_0_00_110_000000),
            Instruction::Jsr { target: JsrTarget::Register(6) }
        );
    }

    #[test]
    fn test_decode_memory_ops() {
        assert_eq!(decode(0b0110_000_001_111110), Instruction::Ldr { dr: 0, base: 1, offset: 0xFFFE });
        assert_eq!(decode(0b1010_010_000000011), Instruction::Ldi { dr: 2, offset: 3 });
        assert_eq!(decode(0b1110_000_111111110), Instruction::Lea { dr: 0, offset: 0xFFFE });
    }

    #[test]
    fn test_decode_trap_and_noops() {
        assert_eq!(decode(0xF025), Instruction::Trap { vector: 0x25 });
        assert_eq!(decode(0x8000), Instruction::Rti);
        assert_eq!(decode(0xDFFF), Instruction::Reserved);
        assert_eq!(decode(0xC1C0), Instruction::Jmp { base: 7 });
    }

    #[test]
    fn test_encode_matches_assembler_output() {
        assert_eq!(encode(&Instruction::Trap { vector: 0x25 }), 0xF025);
        assert_eq!(encode(&Instruction::Jmp { base: 7 }), 0xC1C0);
        assert_eq!(encode(&Instruction::Not { dr: 1, sr: 2 }), 0b1001_001_010_111111);
        assert_eq!(
            encode(&Instruction::Add { dr: 1, sr1: 2, operand: Operand::Immediate(0xFFFF) }),
            0b0001_001_010_1_11111
        );
        assert_eq!(
            encode(&Instruction::Br { nzp: 0b111, offset: (-1i16) as Word }),
            0x0FFF
        );
    }
}
