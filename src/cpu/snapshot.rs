//! Serializable machine state.

use serde::{Serialize, Deserialize};

use crate::cpu::execute::{Cpu, CpuState};
use crate::cpu::memory::{MemoryError, MEMORY_SIZE};
use crate::cpu::Registers;
use crate::word::Word;

/// A copy of everything needed to resume a machine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub regs: Registers,
    pub state: CpuState,
    pub cycles: u64,
    /// Cell contents from x0000 upward.
    pub memory: Vec<Word>,
}

impl Snapshot {
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    pub fn from_json(text: &str) -> serde_json::Result<Self> {
        serde_json::from_str(text)
    }
}

impl Cpu {
    /// Capture registers, state and memory. Device registers are read
    /// without polling.
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            regs: self.regs.clone(),
            state: self.state,
            cycles: self.cycles,
            memory: self.mem.to_vec(),
        }
    }

    /// Restore a snapshot. Memory beyond the snapshot's length is zeroed.
    ///
    /// A snapshot with more cells than memory is rejected and the machine
    /// is left untouched.
    pub fn restore(&mut self, snapshot: &Snapshot) -> Result<(), MemoryError> {
        if snapshot.memory.len() > MEMORY_SIZE {
            return Err(MemoryError::ProgramTooLarge {
                origin: 0,
                size: snapshot.memory.len(),
                available: MEMORY_SIZE,
            });
        }

        self.mem.clear();
        self.mem.load(0, &snapshot.memory)?;
        self.regs = snapshot.regs.clone();
        self.state = snapshot.state;
        self.cycles = snapshot.cycles;
        self.awaiting_input = false;
        self.last_instr = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::word::Condition;

    #[test]
    fn test_snapshot_restore() {
        let mut cpu = Cpu::new();
        cpu.mem.write(0x3000, 0xF025);
        cpu.regs.set(2, 9);
        cpu.regs.cond = Condition::Positive;
        cpu.run().unwrap();

        let snap = cpu.snapshot();
        let json = snap.to_json().unwrap();

        let mut other = Cpu::new();
        other.restore(&Snapshot::from_json(&json).unwrap()).unwrap();

        assert_eq!(other.snapshot(), snap);
        assert!(other.is_halted());
        assert_eq!(other.regs.get(2), 9);
        assert_eq!(other.mem.peek(0x3000), 0xF025);
    }

    #[test]
    fn test_restore_rejects_oversized_memory() {
        let mut cpu = Cpu::new();
        cpu.mem.write(0x3000, 0xF025);
        let mut snap = cpu.snapshot();
        snap.memory.push(0);
        snap.regs.set(1, 42);

        assert!(matches!(
            cpu.restore(&snap),
            Err(MemoryError::ProgramTooLarge { size, .. }) if size == MEMORY_SIZE + 1
        ));
        assert_eq!(cpu.mem.peek(0x3000), 0xF025);
        assert_eq!(cpu.regs.get(1), 0);
    }

    #[test]
    fn test_restore_forgets_last_instruction() {
        let mut cpu = Cpu::new();
        let snap = cpu.snapshot();
        cpu.mem.write(0x3000, 0xF025);
        cpu.step().unwrap();
        assert!(cpu.last_instruction().is_some());

        cpu.restore(&snap).unwrap();

        assert_eq!(cpu.last_instruction(), None);
        assert!(cpu.is_running());
        assert_eq!(cpu.mem.peek(0x3000), 0);
    }
}
