//! TRAP handling and host-native trap services.
//!
//! TRAP saves the return address in R7 and jumps through the vector
//! table at x0000-x00FF. The standard service routines live at vectors
//! x20-x25. HALT is always handled by the host since it must stop the
//! engine; the character I/O services are handled by the host when
//! `native_traps` is enabled, so programs run without an OS image.

use crate::cpu::execute::{Cpu, CpuError, CpuState};
use crate::cpu::memory::MEMORY_SIZE;
use crate::cpu::registers::LINK;
use crate::word::Word;

/// Prompt printed by the IN service.
pub const IN_PROMPT: &[u8] = b"Enter a character: ";

/// Standard trap service routines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum TrapService {
    /// Read one character into R0 without echo.
    Getc = 0x20,
    /// Write the character in R0.
    Out = 0x21,
    /// Write the string of one-character words at R0.
    Puts = 0x22,
    /// Prompt, read one character into R0 and echo it.
    In = 0x23,
    /// Write the string of packed two-character words at R0.
    Putsp = 0x24,
    /// Stop the machine.
    Halt = 0x25,
}

impl TrapService {
    pub const ALL: [TrapService; 6] = [
        TrapService::Getc,
        TrapService::Out,
        TrapService::Puts,
        TrapService::In,
        TrapService::Putsp,
        TrapService::Halt,
    ];

    /// Look up the service for a trap vector.
    pub fn from_vector(vector: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.vector() == vector)
    }

    #[inline]
    pub const fn vector(self) -> u8 {
        self as u8
    }

    /// Assembler alias for the service.
    pub const fn mnemonic(self) -> &'static str {
        match self {
            TrapService::Getc => "GETC",
            TrapService::Out => "OUT",
            TrapService::Puts => "PUTS",
            TrapService::In => "IN",
            TrapService::Putsp => "PUTSP",
            TrapService::Halt => "HALT",
        }
    }
}

impl Cpu {
    /// Execute `TRAP vector`. PC has already been advanced.
    ///
    /// R7 is written only once the service has succeeded.
    pub(crate) fn trap(&mut self, vector: u8) -> Result<(), CpuError> {
        let link = self.regs.pc;

        match TrapService::from_vector(vector) {
            Some(service) if service == TrapService::Halt || self.config.native_traps => {
                self.service(service)?;
            }
            _ => {
                self.regs.pc = self.mem.read(vector as Word);
                log::debug!("TRAP x{:02X} -> x{:04X}", vector, self.regs.pc);
            }
        }

        self.regs.set(LINK, link);
        Ok(())
    }

    /// Perform a service on the host. Returns to the caller unless the
    /// machine halts or an input service has to wait for a key.
    fn service(&mut self, service: TrapService) -> Result<(), CpuError> {
        match service {
            TrapService::Getc => {
                if let Some(key) = self.mem.take_key() {
                    self.set_r0(key as Word);
                } else {
                    self.retry();
                }
            }

            TrapService::Out => {
                let ch = self.regs.get(0) as u8;
                self.emit(&[ch])?;
            }

            TrapService::Puts => {
                let text = self.collect_string(|word, out| out.push(word as u8));
                self.emit(&text)?;
            }

            TrapService::In => {
                if !self.awaiting_input {
                    self.emit(IN_PROMPT)?;
                }
                if let Some(key) = self.mem.take_key() {
                    self.awaiting_input = false;
                    self.emit(&[key])?;
                    self.set_r0(key as Word);
                } else {
                    self.awaiting_input = true;
                    self.retry();
                }
            }

            TrapService::Putsp => {
                let text = self.collect_string(|word, out| {
                    out.push(word as u8);
                    let high = (word >> 8) as u8;
                    if high != 0 {
                        out.push(high);
                    }
                });
                self.emit(&text)?;
            }

            TrapService::Halt => {
                self.state = CpuState::Halted;
                log::info!("HALT at x{:04X} after {} cycles", self.regs.pc.wrapping_sub(1), self.cycles + 1);
            }
        }

        Ok(())
    }

    /// Walk the zero-terminated word string starting at R0.
    fn collect_string(&mut self, mut unpack: impl FnMut(Word, &mut Vec<u8>)) -> Vec<u8> {
        let mut out = Vec::new();
        let mut addr = self.regs.get(0);

        // Bounded so a string without a terminator cannot loop forever
        for _ in 0..MEMORY_SIZE {
            let word = self.mem.read(addr);
            if word == 0 {
                break;
            }
            unpack(word, &mut out);
            addr = addr.wrapping_add(1);
        }

        out
    }

    fn set_r0(&mut self, value: Word) {
        self.regs.set(0, value);
        self.regs.update_flags(0);
    }

    /// Point PC back at the TRAP so it runs again on the next step.
    fn retry(&mut self) {
        self.regs.pc = self.regs.pc.wrapping_sub(1);
    }

    fn emit(&mut self, bytes: &[u8]) -> Result<(), CpuError> {
        self.display
            .write_all(bytes)
            .and_then(|_| self.display.flush())
            .map_err(|e| CpuError::Output(e.to_string()))
    }
}
