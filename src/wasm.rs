//! WebAssembly bindings for the LC-3 emulator.
//!
//! Input and output are buffered: JavaScript queues keys with `push_key`
//! and drains console text with `take_output` between `run` calls.

use wasm_bindgen::prelude::*;
use crate::{BufferedKeyboard, Cpu, Image, MachineConfig, SharedOutput};
use crate::program::{disasm::disassemble_instruction, parse_image};

/// Route panics to the browser console.
#[wasm_bindgen(start)]
pub fn init() {
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();
}

/// A machine plus the images it was loaded from.
#[wasm_bindgen]
pub struct WasmCpu {
    cpu: Cpu,
    images: Vec<Image>,
    keyboard: BufferedKeyboard,
    output: SharedOutput,
}

#[wasm_bindgen]
impl WasmCpu {
    /// A fresh machine with default configuration and no images.
    #[wasm_bindgen(constructor)]
    pub fn new() -> Self {
        let mut wasm = Self {
            cpu: Cpu::new(),
            images: Vec::new(),
            keyboard: BufferedKeyboard::new(),
            output: SharedOutput::new(),
        };
        wasm.rebuild();
        wasm
    }

    fn rebuild(&mut self) {
        self.cpu = Cpu::with_config(MachineConfig::default());
        self.cpu.attach_keyboard(self.keyboard.clone());
        self.cpu.attach_display(self.output.clone());
    }

    /// Load an object image. Returns the number of words placed.
    #[wasm_bindgen]
    pub fn load_image(&mut self, bytes: &[u8]) -> Result<usize, JsError> {
        let image = parse_image(bytes)
            .map_err(|e| JsError::new(&format!("{}", e)))?;

        self.cpu.load_image(&image)
            .map_err(|e| JsError::new(&format!("{}", e)))?;

        let len = image.len();
        self.images.push(image);
        Ok(len)
    }

    /// Execute one instruction and return its disassembly.
    #[wasm_bindgen]
    pub fn step(&mut self) -> Result<String, JsError> {
        if !self.cpu.is_running() {
            return Err(JsError::new("machine has halted"));
        }

        let pc = self.cpu.regs.pc;
        let raw = self.cpu.mem.peek(pc);
        self.cpu.step()
            .map_err(|e| JsError::new(&format!("{}", e)))?;

        Ok(disassemble_instruction(raw, pc))
    }

    /// Execute up to `max_cycles` instructions. Returns the total cycle count.
    #[wasm_bindgen]
    pub fn run(&mut self, max_cycles: u32) -> Result<u64, JsError> {
        self.cpu.run_limited(max_cycles as u64)
            .map_err(|e| JsError::new(&format!("{}", e)))?;
        Ok(self.cpu.cycles)
    }

    /// Reset CPU to initial state and reload the images.
    #[wasm_bindgen]
    pub fn reset(&mut self) -> Result<(), JsError> {
        self.rebuild();
        self.keyboard.clear();
        self.output.clear();
        for image in &self.images {
            self.cpu.load_image(image)
                .map_err(|e| JsError::new(&format!("{}", e)))?;
        }
        Ok(())
    }

    /// Queue a key for the machine keyboard.
    #[wasm_bindgen]
    pub fn push_key(&mut self, key: u8) {
        self.keyboard.push(key);
    }

    /// Drain program output written since the last call.
    #[wasm_bindgen]
    pub fn take_output(&mut self) -> String {
        self.output.take()
    }

    /// True until HALT.
    #[wasm_bindgen]
    pub fn is_running(&self) -> bool {
        self.cpu.is_running()
    }

    /// True after HALT.
    #[wasm_bindgen]
    pub fn is_halted(&self) -> bool {
        self.cpu.is_halted()
    }

    /// Instructions executed so far.
    #[wasm_bindgen]
    pub fn cycles(&self) -> u64 {
        self.cpu.cycles
    }

    /// Address of the next instruction.
    #[wasm_bindgen]
    pub fn pc(&self) -> u16 {
        self.cpu.regs.pc
    }

    /// Get a general-purpose register (index taken modulo 8).
    #[wasm_bindgen]
    pub fn register(&self, index: u8) -> u16 {
        self.cpu.regs.get(index)
    }

    /// Get the condition code as "N", "Z" or "P".
    #[wasm_bindgen]
    pub fn condition(&self) -> String {
        self.cpu.regs.cond.to_string()
    }

    /// `"Running"` or `"Halted"`.
    #[wasm_bindgen]
    pub fn state(&self) -> String {
        format!("{:?}", self.cpu.state)
    }

    /// Get a memory cell without device side effects.
    #[wasm_bindgen]
    pub fn memory_at(&self, addr: u16) -> u16 {
        self.cpu.mem.peek(addr)
    }

    /// Registers, PC and condition code as JSON.
    #[wasm_bindgen]
    pub fn registers_json(&self) -> Result<String, JsError> {
        serde_json::to_string(&self.cpu.regs)
            .map_err(|e| JsError::new(&format!("{}", e)))
    }
}

impl Default for WasmCpu {
    fn default() -> Self {
        Self::new()
    }
}

/// Disassemble a single word located at `addr`.
#[wasm_bindgen]
pub fn wasm_disassemble(word: u16, addr: u16) -> String {
    disassemble_instruction(word, addr)
}
