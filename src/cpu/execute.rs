//! CPU execution engine for the LC-3.
//!
//! Implements the fetch-decode-execute cycle and all instruction behaviors.

use std::io::Write;

use crate::config::MachineConfig;
use crate::cpu::{Memory, Registers};
use crate::cpu::decode::{self, Instruction, JsrTarget, Operand};
use crate::cpu::memory::MemoryError;
use crate::cpu::registers::LINK;
use crate::io::Keyboard;
use crate::program::Image;
use crate::word::Word;
use serde::{Serialize, Deserialize};
use thiserror::Error;

/// CPU execution state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CpuState {
    /// CPU is fetching and executing instructions.
    Running,
    /// CPU has halted (executed the HALT trap). Terminal.
    Halted,
}

/// The LC-3 CPU.
pub struct Cpu {
    /// CPU registers.
    pub regs: Registers,
    /// Main memory.
    pub mem: Memory,
    /// Current execution state.
    pub state: CpuState,
    /// Instruction count.
    pub cycles: u64,
    pub(crate) config: MachineConfig,
    /// Sink for the output trap services.
    pub(crate) display: Box<dyn Write>,
    /// IN has printed its prompt and is waiting for a key.
    pub(crate) awaiting_input: bool,
    pub(crate) last_instr: Option<Instruction>,
}

impl Cpu {
    /// Create a CPU with default configuration, no keyboard and no display.
    pub fn new() -> Self {
        Self::with_config(MachineConfig::default())
    }

    /// Create a CPU with the given configuration.
    pub fn with_config(config: MachineConfig) -> Self {
        let mut regs = Registers::new();
        regs.pc = config.start_pc;

        Self {
            regs,
            mem: Memory::new(),
            state: CpuState::Running,
            cycles: 0,
            config,
            display: Box::new(std::io::sink()),
            awaiting_input: false,
            last_instr: None,
        }
    }

    /// The active configuration.
    pub fn config(&self) -> &MachineConfig {
        &self.config
    }

    /// Attach the keyboard polled through KBSR and the input traps.
    pub fn attach_keyboard(&mut self, keyboard: impl Keyboard + 'static) {
        self.mem.set_keyboard(Box::new(keyboard));
    }

    /// Attach the display written by the output traps.
    pub fn attach_display(&mut self, display: impl Write + 'static) {
        self.display = Box::new(display);
    }

    /// Reset the CPU to its initial state. Memory is cleared.
    pub fn reset(&mut self) {
        self.regs.reset(self.config.start_pc);
        self.mem.clear();
        self.state = CpuState::Running;
        self.cycles = 0;
        self.awaiting_input = false;
        self.last_instr = None;
    }

    /// Place a program image in memory.
    pub fn load_image(&mut self, image: &Image) -> Result<(), MemoryError> {
        self.mem.load(image.origin, &image.words)?;
        log::debug!(
            "loaded {} words at x{:04X}-x{:04X}",
            image.words.len(),
            image.origin,
            image.end(),
        );
        Ok(())
    }

    /// Execute a single instruction.
    ///
    /// Returns the instruction that was executed. If a trap service fails
    /// to write its output, PC is put back on the TRAP, R7 and `cycles`
    /// are unchanged, and the error is returned. A key already consumed
    /// by IN before its echo failed is not given back.
    pub fn step(&mut self) -> Result<Instruction, CpuError> {
        if self.state != CpuState::Running {
            return Err(CpuError::NotRunning(self.state));
        }

        // Fetch
        let pc = self.regs.pc;
        let raw = self.mem.read(pc);

        // Offsets are relative to the next instruction
        self.regs.advance_pc();

        // Decode
        let instr = decode::decode(raw);
        log::trace!("x{:04X}: {:04X}  {:?}", pc, raw, instr);

        // Execute
        if let Err(e) = self.execute(instr) {
            self.regs.pc = pc;
            return Err(e);
        }

        self.cycles += 1;
        self.last_instr = Some(instr);

        Ok(instr)
    }

    /// Run until halt or error.
    ///
    /// Returns the number of instructions executed.
    pub fn run(&mut self) -> Result<u64, CpuError> {
        let start_cycles = self.cycles;

        while self.state == CpuState::Running {
            self.step()?;
        }

        Ok(self.cycles - start_cycles)
    }

    /// Run for at most `max_cycles` instructions.
    pub fn run_limited(&mut self, max_cycles: u64) -> Result<u64, CpuError> {
        let start_cycles = self.cycles;
        let limit = self.cycles.saturating_add(max_cycles);

        while self.state == CpuState::Running && self.cycles < limit {
            self.step()?;
        }

        Ok(self.cycles - start_cycles)
    }

    /// Execute a decoded instruction. PC has already been advanced.
    fn execute(&mut self, instr: Instruction) -> Result<(), CpuError> {
        match instr {
            // ==================== Operate ====================

            Instruction::Add { dr, sr1, operand } => {
                let value = self.regs.get(sr1).wrapping_add(self.operand(operand));
                self.regs.set(dr, value);
                self.regs.update_flags(dr);
            }

            Instruction::And { dr, sr1, operand } => {
                let value = self.regs.get(sr1) & self.operand(operand);
                self.regs.set(dr, value);
                self.regs.update_flags(dr);
            }

            Instruction::Not { dr, sr } => {
                self.regs.set(dr, !self.regs.get(sr));
                self.regs.update_flags(dr);
            }

            // ==================== Data Movement ====================

            Instruction::Ld { dr, offset } => {
                let addr = self.regs.pc_relative(offset);
                let value = self.mem.read(addr);
                self.regs.set(dr, value);
                self.regs.update_flags(dr);
            }

            Instruction::Ldi { dr, offset } => {
                let pointer = self.regs.pc_relative(offset);
                let addr = self.mem.read(pointer);
                let value = self.mem.read(addr);
                self.regs.set(dr, value);
                self.regs.update_flags(dr);
            }

            Instruction::Ldr { dr, base, offset } => {
                let addr = self.regs.base_offset(base, offset);
                let value = self.mem.read(addr);
                self.regs.set(dr, value);
                self.regs.update_flags(dr);
            }

            Instruction::Lea { dr, offset } => {
                let addr = self.regs.pc_relative(offset);
                self.regs.set(dr, addr);
                self.regs.update_flags(dr);
            }

            Instruction::St { sr, offset } => {
                let addr = self.regs.pc_relative(offset);
                self.mem.write(addr, self.regs.get(sr));
            }

            Instruction::Sti { sr, offset } => {
                let pointer = self.regs.pc_relative(offset);
                let addr = self.mem.read(pointer);
                self.mem.write(addr, self.regs.get(sr));
            }

            Instruction::Str { sr, base, offset } => {
                let addr = self.regs.base_offset(base, offset);
                self.mem.write(addr, self.regs.get(sr));
            }

            // ==================== Control ====================

            Instruction::Br { nzp, offset } => {
                if self.regs.cond.matches(nzp) {
                    self.regs.pc = self.regs.pc_relative(offset);
                }
            }

            Instruction::Jmp { base } => {
                self.regs.pc = self.regs.get(base);
            }

            Instruction::Jsr { target } => {
                // Read the base before R7 is overwritten (JSRR R7)
                let dest = match target {
                    JsrTarget::Offset(offset) => self.regs.pc_relative(offset),
                    JsrTarget::Register(base) => self.regs.get(base),
                };
                self.regs.set(LINK, self.regs.pc);
                self.regs.pc = dest;
            }

            Instruction::Trap { vector } => {
                self.trap(vector)?;
            }

            // ==================== Undefined in user mode ====================

            Instruction::Rti | Instruction::Reserved => {}
        }

        Ok(())
    }

    #[inline]
    fn operand(&self, operand: Operand) -> Word {
        match operand {
            Operand::Register(sr2) => self.regs.get(sr2),
            Operand::Immediate(imm) => imm,
        }
    }

    /// Get the last executed instruction.
    pub fn last_instruction(&self) -> Option<Instruction> {
        self.last_instr
    }

    /// Check if the CPU is halted.
    pub fn is_halted(&self) -> bool {
        self.state == CpuState::Halted
    }

    /// Check if the CPU is running.
    pub fn is_running(&self) -> bool {
        self.state == CpuState::Running
    }

    /// Is an input trap waiting for a key?
    pub fn is_awaiting_input(&self) -> bool {
        self.awaiting_input
    }
}

impl Default for Cpu {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Cpu {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cpu")
            .field("state", &self.state)
            .field("cycles", &self.cycles)
            .field("regs", &self.regs)
            .finish()
    }
}

/// Errors that can occur during CPU execution.
#[derive(Debug, Clone, Error)]
pub enum CpuError {
    #[error("CPU not running: {0:?}")]
    NotRunning(CpuState),

    #[error("output error: {0}")]
    Output(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cpu::decode::encode;
    use crate::word::{sign_extend, Condition};

    fn make_program(instructions: &[Instruction]) -> Vec<Word> {
        instructions.iter().map(encode).collect()
    }

    fn cpu_with(instructions: &[Instruction]) -> Cpu {
        let mut cpu = Cpu::new();
        cpu.mem.load(0x3000, &make_program(instructions)).unwrap();
        cpu
    }

    const HALT: Instruction = Instruction::Trap { vector: 0x25 };

    #[test]
    fn test_cpu_halt() {
        let mut cpu = cpu_with(&[HALT]);
        let before = cpu.regs.clone();

        let executed = cpu.run().unwrap();

        assert_eq!(executed, 1);
        assert!(cpu.is_halted());
        assert_eq!(cpu.regs.get(7), 0x3001);
        assert_eq!(cpu.regs.r[..7], before.r[..7]);
        assert_eq!(cpu.regs.cond, before.cond);
        assert!(matches!(cpu.step(), Err(CpuError::NotRunning(CpuState::Halted))));
    }

    #[test]
    fn test_add_immediate_negative() {
        let mut cpu = cpu_with(&[
            Instruction::Add { dr: 0, sr1: 1, operand: Operand::Immediate(sign_extend(0b11111, 5)) },
        ]);
        cpu.regs.set(1, 5);

        cpu.step().unwrap();

        assert_eq!(cpu.regs.get(0), 4);
        assert_eq!(cpu.regs.cond, Condition::Positive);
    }

    #[test]
    fn test_add_register_wraps() {
        let mut cpu = cpu_with(&[
            Instruction::Add { dr: 2, sr1: 0, operand: Operand::Register(1) },
        ]);
        cpu.regs.set(0, 0xFFFF);
        cpu.regs.set(1, 1);

        cpu.step().unwrap();

        assert_eq!(cpu.regs.get(2), 0);
        assert_eq!(cpu.regs.cond, Condition::Zero);
    }

    #[test]
    fn test_and_not() {
        let mut cpu = cpu_with(&[
            Instruction::And { dr: 0, sr1: 0, operand: Operand::Immediate(0) },
            Instruction::Not { dr: 1, sr: 0 },
            Instruction::And { dr: 2, sr1: 1, operand: Operand::Register(3) },
        ]);
        cpu.regs.set(0, 0x1234);
        cpu.regs.set(3, 0x00F0);

        cpu.step().unwrap();
        assert_eq!(cpu.regs.get(0), 0);
        assert_eq!(cpu.regs.cond, Condition::Zero);

        cpu.step().unwrap();
        assert_eq!(cpu.regs.get(1), 0xFFFF);
        assert_eq!(cpu.regs.cond, Condition::Negative);

        cpu.step().unwrap();
        assert_eq!(cpu.regs.get(2), 0x00F0);
        assert_eq!(cpu.regs.cond, Condition::Positive);
    }

    #[test]
    fn test_lea_negative_offset() {
        let mut cpu = cpu_with(&[Instruction::Lea { dr: 3, offset: (-2i16) as Word }]);

        cpu.step().unwrap();

        assert_eq!(cpu.regs.get(3), 0x2FFF);
        assert_eq!(cpu.regs.cond, Condition::Positive);
    }

    #[test]
    fn test_ldi_double_dereference() {
        let mut cpu = cpu_with(&[Instruction::Ldi { dr: 4, offset: 9 }]);
        cpu.mem.write(0x300A, 0x4000);
        cpu.mem.write(0x4000, 0x8001);

        cpu.step().unwrap();

        assert_eq!(cpu.regs.get(4), 0x8001);
        assert_eq!(cpu.regs.cond, Condition::Negative);
    }

    #[test]
    fn test_sti_double_dereference() {
        let mut cpu = cpu_with(&[Instruction::Sti { sr: 2, offset: 1 }]);
        cpu.mem.write(0x3002, 0x5000);
        cpu.regs.set(2, 77);

        cpu.step().unwrap();

        assert_eq!(cpu.mem.peek(0x5000), 77);
        assert_eq!(cpu.mem.peek(0x3002), 0x5000);
    }

    #[test]
    fn test_ldr_str_base_offset() {
        let mut cpu = cpu_with(&[
            Instruction::Str { sr: 0, base: 6, offset: (-1i16) as Word },
            Instruction::Ldr { dr: 1, base: 6, offset: (-1i16) as Word },
        ]);
        cpu.regs.set(6, 0x4000);
        cpu.regs.set(0, 0x7FFF);

        cpu.step().unwrap();
        assert_eq!(cpu.mem.peek(0x3FFF), 0x7FFF);
        // Stores never touch the condition code
        assert_eq!(cpu.regs.cond, Condition::Zero);

        cpu.step().unwrap();
        assert_eq!(cpu.regs.get(1), 0x7FFF);
        assert_eq!(cpu.regs.cond, Condition::Positive);
    }

    #[test]
    fn test_store_then_load_roundtrip() {
        let mut cpu = cpu_with(&[
            Instruction::St { sr: 0, offset: 5 },
            Instruction::Ld { dr: 1, offset: 4 },
        ]);
        cpu.regs.set(0, 0xABCD);

        cpu.run_limited(2).unwrap();

        assert_eq!(cpu.mem.peek(0x3006), 0xABCD);
        assert_eq!(cpu.regs.get(1), 0xABCD);
    }

    #[test]
    fn test_jsrr_saves_return_address() {
        let mut cpu = cpu_with(&[Instruction::Jsr { target: JsrTarget::Register(6) }]);
        cpu.regs.set(6, 0x4000);

        cpu.step().unwrap();

        assert_eq!(cpu.regs.get(7), 0x3001);
        assert_eq!(cpu.regs.pc, 0x4000);
    }

    #[test]
    fn test_jsr_offset_and_ret() {
        let mut cpu = cpu_with(&[
            Instruction::Jsr { target: JsrTarget::Offset(2) },
            HALT,
            Instruction::Reserved,
            Instruction::Add { dr: 0, sr1: 0, operand: Operand::Immediate(1) },
            Instruction::Jmp { base: 7 },
        ]);

        let executed = cpu.run().unwrap();

        assert_eq!(executed, 4);
        assert_eq!(cpu.regs.get(0), 1);
        assert!(cpu.is_halted());
    }

    #[test]
    fn test_jsrr_r7_uses_old_value() {
        let mut cpu = cpu_with(&[Instruction::Jsr { target: JsrTarget::Register(7) }]);
        cpu.regs.set(7, 0x5000);

        cpu.step().unwrap();

        assert_eq!(cpu.regs.pc, 0x5000);
        assert_eq!(cpu.regs.get(7), 0x3001);
    }

    #[test]
    fn test_branch_taken_and_not_taken() {
        let mut cpu = cpu_with(&[
            Instruction::And { dr: 0, sr1: 0, operand: Operand::Immediate(0) },
            Instruction::Br { nzp: 0b101, offset: 5 },
            Instruction::Br { nzp: 0b010, offset: 3 },
        ]);

        cpu.run_limited(3).unwrap();

        // BRnp falls through on Z; BRz jumps from x3003 by 3
        assert_eq!(cpu.regs.pc, 0x3006);
    }

    #[test]
    fn test_branch_backwards_loop() {
        // R0 := 3; loop: R0 -= 1; BRp loop; HALT
        let mut cpu = cpu_with(&[
            Instruction::And { dr: 0, sr1: 0, operand: Operand::Immediate(0) },
            Instruction::Add { dr: 0, sr1: 0, operand: Operand::Immediate(3) },
            Instruction::Add { dr: 0, sr1: 0, operand: Operand::Immediate((-1i16) as Word) },
            Instruction::Br { nzp: 0b001, offset: (-2i16) as Word },
            HALT,
        ]);

        let executed = cpu.run().unwrap();

        assert_eq!(cpu.regs.get(0), 0);
        assert_eq!(executed, 2 + 3 * 2 + 1);
    }

    #[test]
    fn test_rti_and_reserved_are_noops() {
        let mut cpu = cpu_with(&[Instruction::Rti, Instruction::Reserved]);
        let before = cpu.regs.clone();

        cpu.run_limited(2).unwrap();

        assert_eq!(cpu.regs.pc, 0x3002);
        assert_eq!(cpu.regs.r, before.r);
        assert_eq!(cpu.regs.cond, before.cond);
        assert!(cpu.is_running());
    }

    #[test]
    fn test_pc_wraps_at_end_of_memory() {
        let mut cpu = Cpu::new();
        cpu.regs.pc = 0xFFFF;
        cpu.mem.write(0xFFFF, encode(&Instruction::Lea { dr: 0, offset: 1 }));

        cpu.step().unwrap();

        assert_eq!(cpu.regs.pc, 0x0000);
        assert_eq!(cpu.regs.get(0), 0x0001);
    }

    #[test]
    fn test_reset() {
        let mut cpu = cpu_with(&[HALT]);
        cpu.run().unwrap();

        cpu.reset();

        assert!(cpu.is_running());
        assert_eq!(cpu.cycles, 0);
        assert_eq!(cpu.regs.pc, 0x3000);
        assert_eq!(cpu.mem.peek(0x3000), 0);
        assert_eq!(cpu.last_instruction(), None);
    }
}
