//! LC-3 memory bus.
//!
//! The LC-3 has 65,536 sixteen-bit cells, so every `u16` is a valid
//! address. Two cells in the device page are memory-mapped keyboard
//! registers whose contents are synthesized on read.

use crate::io::{Keyboard, NoKeyboard};
use crate::word::Word;
use thiserror::Error;

/// The number of memory cells.
pub const MEMORY_SIZE: usize = 1 << 16;

/// Keyboard status register. Bit 15 is set when a key is available.
pub const KBSR: Word = 0xFE00;

/// Keyboard data register. Holds the most recently read character.
pub const KBDR: Word = 0xFE02;

/// LC-3 memory: 65,536 word cells plus the keyboard device.
pub struct Memory {
    cells: Box<[Word]>,
    keyboard: Box<dyn Keyboard>,
}

impl Memory {
    /// Create a zeroed memory with no keyboard attached.
    pub fn new() -> Self {
        Self::with_keyboard(Box::new(NoKeyboard))
    }

    /// Create a zeroed memory reading input from `keyboard`.
    pub fn with_keyboard(keyboard: Box<dyn Keyboard>) -> Self {
        Self {
            cells: vec![0; MEMORY_SIZE].into_boxed_slice(),
            keyboard,
        }
    }

    /// Replace the attached keyboard.
    pub fn set_keyboard(&mut self, keyboard: Box<dyn Keyboard>) {
        self.keyboard = keyboard;
    }

    /// Read a cell as the CPU sees it.
    ///
    /// Reading KBSR polls the keyboard: if a key is available the status
    /// bit is set and one character is moved into KBDR, otherwise KBSR
    /// is cleared. Every other address is returned verbatim.
    pub fn read(&mut self, addr: Word) -> Word {
        if addr == KBSR {
            self.poll_keyboard();
        }
        self.cells[addr as usize]
    }

    /// Read a cell without any device side effects.
    #[inline]
    pub fn peek(&self, addr: Word) -> Word {
        self.cells[addr as usize]
    }

    /// Write a cell. Device registers are overwritten like any other cell.
    #[inline]
    pub fn write(&mut self, addr: Word, value: Word) {
        self.cells[addr as usize] = value;
    }

    fn poll_keyboard(&mut self) {
        let key = if self.keyboard.key_ready() {
            self.keyboard.read_key()
        } else {
            None
        };

        match key {
            Some(ch) => {
                self.cells[KBSR as usize] = 1 << 15;
                self.cells[KBDR as usize] = ch as Word;
            }
            None => self.cells[KBSR as usize] = 0,
        }
    }

    /// Consume a key directly, bypassing the device registers.
    ///
    /// Used by the host-side input trap services.
    pub(crate) fn take_key(&mut self) -> Option<u8> {
        if self.keyboard.key_ready() {
            self.keyboard.read_key()
        } else {
            None
        }
    }

    /// Clear all memory to zeros.
    pub fn clear(&mut self) {
        self.cells.fill(0);
    }

    /// Place `words` in memory starting at `origin`.
    pub fn load(&mut self, origin: Word, words: &[Word]) -> Result<(), MemoryError> {
        let start = origin as usize;
        let available = MEMORY_SIZE - start;
        if words.len() > available {
            return Err(MemoryError::ProgramTooLarge {
                origin,
                size: words.len(),
                available,
            });
        }

        self.cells[start..start + words.len()].copy_from_slice(words);
        Ok(())
    }

    /// Dump memory contents without side effects (for debugging).
    pub fn dump(&self, start: Word, count: usize) -> Vec<(Word, Word)> {
        let end = (start as usize + count).min(MEMORY_SIZE);
        (start as usize..end)
            .map(|i| (i as Word, self.cells[i]))
            .collect()
    }

    /// Copy out every cell.
    pub fn to_vec(&self) -> Vec<Word> {
        self.cells.to_vec()
    }
}

impl Default for Memory {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Memory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let non_zero = self.cells.iter().filter(|&&cell| cell != 0).count();

        f.debug_struct("Memory")
            .field("non_zero_cells", &non_zero)
            .field("total_cells", &MEMORY_SIZE)
            .finish()
    }
}

/// Errors that can occur during memory operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MemoryError {
    /// Program does not fit between its origin and the end of memory.
    #[error("program of {size} words at x{origin:04X} exceeds available space of {available} words")]
    ProgramTooLarge { origin: Word, size: usize, available: usize },
}
