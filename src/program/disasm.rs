//! Disassembler for LC-3 programs.
//!
//! Converts instruction words back to readable assembly. PC-relative
//! operands are shown as absolute target addresses.

use crate::cpu::decode::{decode, Instruction, JsrTarget, Operand};
use crate::cpu::trap::TrapService;
use crate::program::Image;
use crate::word::{as_signed, Word};

/// Disassemble a single instruction located at `addr`.
pub fn disassemble_instruction(word: Word, addr: Word) -> String {
    format_instruction(&decode(word), addr.wrapping_add(1))
}

/// Disassemble a whole image.
pub fn disassemble(image: &Image) -> String {
    let mut output = String::new();
    output.push_str("; LC-3 Disassembly\n");
    output.push_str("; ----------------\n");
    output.push_str(&format!("        .ORIG x{:04X}\n", image.origin));

    for (addr, word) in image.iter() {
        let line = disassemble_instruction(word, addr);
        output.push_str(&format!("x{:04X}:  {:<24}; x{:04X}\n", addr, line, word));
    }

    output.push_str("        .END\n");
    output
}

/// Format a decoded instruction. `pc` is the address after the instruction.
fn format_instruction(instr: &Instruction, pc: Word) -> String {
    let target = |offset: Word| format!("x{:04X}", pc.wrapping_add(offset));

    match *instr {
        // Operate
        Instruction::Add { dr, sr1, operand } => format!("ADD R{}, R{}, {}", dr, sr1, format_operand(operand)),
        Instruction::And { dr, sr1, operand } => format!("AND R{}, R{}, {}", dr, sr1, format_operand(operand)),
        Instruction::Not { dr, sr } => format!("NOT R{}, R{}", dr, sr),

        // Data movement
        Instruction::Ld { dr, offset } => format!("LD R{}, {}", dr, target(offset)),
        Instruction::Ldi { dr, offset } => format!("LDI R{}, {}", dr, target(offset)),
        Instruction::Ldr { dr, base, offset } => format!("LDR R{}, R{}, #{}", dr, base, as_signed(offset)),
        Instruction::Lea { dr, offset } => format!("LEA R{}, {}", dr, target(offset)),
        Instruction::St { sr, offset } => format!("ST R{}, {}", sr, target(offset)),
        Instruction::Sti { sr, offset } => format!("STI R{}, {}", sr, target(offset)),
        Instruction::Str { sr, base, offset } => format!("STR R{}, R{}, #{}", sr, base, as_signed(offset)),

        // Control
        Instruction::Br { nzp: 0, .. } => "NOP".to_string(),
        Instruction::Br { nzp, offset } => format!("BR{} {}", format_nzp(nzp), target(offset)),
        Instruction::Jmp { base: 7 } => "RET".to_string(),
        Instruction::Jmp { base } => format!("JMP R{}", base),
        Instruction::Jsr { target: JsrTarget::Offset(offset) } => format!("JSR {}", target(offset)),
        Instruction::Jsr { target: JsrTarget::Register(base) } => format!("JSRR R{}", base),
        Instruction::Trap { vector } => match TrapService::from_vector(vector) {
            Some(service) => service.mnemonic().to_string(),
            None => format!("TRAP x{:02X}", vector),
        },
        Instruction::Rti => "RTI".to_string(),
        Instruction::Reserved => "RESERVED".to_string(),
    }
}

fn format_operand(operand: Operand) -> String {
    match operand {
        Operand::Register(sr2) => format!("R{}", sr2),
        Operand::Immediate(imm) => format!("#{}", as_signed(imm)),
    }
}

fn format_nzp(nzp: u8) -> String {
    if nzp == 0b111 {
        return String::new();
    }
    let mut flags = String::with_capacity(3);
    for (bit, letter) in [(0b100u8, 'n'), (0b010, 'z'), (0b001, 'p')] {
        if nzp & bit != 0 {
            flags.push(letter);
        }
    }
    flags
}
