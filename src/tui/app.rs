//! Debugger application state and logic.

use crate::{BufferedKeyboard, Cpu, Image, MachineConfig, SharedOutput};
use crate::program::disasm::disassemble_instruction;
use crate::word::Word;
use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use std::collections::HashSet;

/// Instructions executed per frame while running continuously.
const STEPS_PER_TICK: usize = 2_000;

/// Keep at most this many bytes of program output.
const TRANSCRIPT_LIMIT: usize = 16 * 1024;

/// Debugger application state.
pub struct DebuggerApp {
    /// The CPU being debugged.
    pub cpu: Cpu,
    /// Images to reload on reset.
    pub images: Vec<Image>,
    config: MachineConfig,
    /// Feeds keys typed in input mode to the machine.
    keyboard: BufferedKeyboard,
    output: SharedOutput,
    /// Program output so far.
    pub transcript: String,
    /// Breakpoints (by address).
    pub breakpoints: HashSet<Word>,
    /// Is the debugger running continuously?
    pub running: bool,
    /// Are keystrokes forwarded to the machine?
    pub input_mode: bool,
    /// Should we quit?
    pub should_quit: bool,
    /// Status message to display.
    pub status: String,
    /// First address shown in the memory view.
    pub mem_scroll: Word,
}

impl DebuggerApp {
    /// Create a new debugger with loaded images.
    pub fn new(images: Vec<Image>, config: MachineConfig) -> Self {
        let keyboard = BufferedKeyboard::new();
        let output = SharedOutput::new();
        let mem_scroll = config.start_pc;

        let mut app = Self {
            cpu: Cpu::with_config(config.clone()),
            images,
            config,
            keyboard,
            output,
            transcript: String::new(),
            breakpoints: HashSet::new(),
            running: false,
            input_mode: false,
            should_quit: false,
            status: String::new(),
            mem_scroll,
        };
        app.reload();
        app
    }

    /// Build a fresh CPU and load every image into it.
    fn reload(&mut self) {
        self.cpu = Cpu::with_config(self.config.clone());
        self.cpu.attach_keyboard(self.keyboard.clone());
        self.cpu.attach_display(self.output.clone());
        self.keyboard.clear();
        self.output.clear();
        self.transcript.clear();

        self.status = "Ready. Press 's' to step, 'r' to run, 'q' to quit.".into();
        for image in &self.images {
            if let Err(e) = self.cpu.load_image(image) {
                self.status = format!("Load error: {}", e);
            }
        }
    }

    /// Step one instruction.
    pub fn step(&mut self) {
        if !self.cpu.is_running() {
            self.status = format!("CPU halted: {:?}", self.cpu.state);
            self.running = false;
            return;
        }

        let pc = self.cpu.regs.pc;
        let raw = self.cpu.mem.peek(pc);
        match self.cpu.step() {
            Ok(_) => {
                self.status = format!("x{:04X}: {}", pc, disassemble_instruction(raw, pc));
            }
            Err(e) => {
                self.status = format!("Error: {}", e);
                self.running = false;
            }
        }
        self.collect_output();
    }

    /// Run until halt, breakpoint, or error.
    pub fn run(&mut self) {
        self.running = true;
        self.status = "Running...".into();
    }

    /// Run one batch of continuous execution.
    pub fn tick(&mut self) {
        if !self.running {
            return;
        }

        for _ in 0..STEPS_PER_TICK {
            if !self.cpu.is_running() {
                self.running = false;
                self.status = format!("Halted after {} cycles", self.cpu.cycles);
                break;
            }

            if let Err(e) = self.cpu.step() {
                self.running = false;
                self.status = format!("Error: {}", e);
                break;
            }

            let pc = self.cpu.regs.pc;
            if self.breakpoints.contains(&pc) {
                self.running = false;
                self.status = format!("Breakpoint at x{:04X}", pc);
                break;
            }
        }

        if self.running && self.cpu.is_awaiting_input() {
            self.status = "Waiting for input (press 'i' to type)".into();
        }
        self.collect_output();
    }

    /// Toggle breakpoint at current PC.
    pub fn toggle_breakpoint(&mut self) {
        let pc = self.cpu.regs.pc;
        if self.breakpoints.remove(&pc) {
            self.status = format!("Removed breakpoint at x{:04X}", pc);
        } else {
            self.breakpoints.insert(pc);
            self.status = format!("Set breakpoint at x{:04X}", pc);
        }
    }

    /// Reset CPU to initial state and reload the images.
    pub fn reset(&mut self) {
        self.running = false;
        self.reload();
        self.status = "Reset. Ready.".into();
    }

    /// Forward a key to the machine keyboard.
    pub fn send_key(&mut self, key: u8) {
        self.keyboard.push(key);
        self.status = format!("Sent key 0x{:02X} ({} pending)", key, self.keyboard.pending());
    }

    fn collect_output(&mut self) {
        self.transcript.push_str(&self.output.take());
        if self.transcript.len() > TRANSCRIPT_LIMIT {
            let mut cut = self.transcript.len() - TRANSCRIPT_LIMIT;
            while !self.transcript.is_char_boundary(cut) {
                cut += 1;
            }
            self.transcript.drain(..cut);
        }
    }

    /// Get disassembly around current PC.
    pub fn get_disassembly(&self, lines: usize) -> Vec<(Word, String, bool)> {
        let pc = self.cpu.regs.pc;
        let start = pc.wrapping_sub((lines / 2) as Word);

        (0..lines)
            .map(|i| {
                let addr = start.wrapping_add(i as Word);
                let word = self.cpu.mem.peek(addr);
                (addr, disassemble_instruction(word, addr), addr == pc)
            })
            .collect()
    }

    /// Apply one key press.
    pub fn handle_key(&mut self, key: KeyEvent) {
        if key.kind != KeyEventKind::Press {
            return;
        }

        if self.input_mode {
            match key.code {
                KeyCode::Esc => {
                    self.input_mode = false;
                    self.status = "Input mode off.".into();
                }
                KeyCode::Enter => self.send_key(b'\n'),
                KeyCode::Backspace => self.send_key(0x08),
                KeyCode::Char(c) if key.modifiers.contains(KeyModifiers::CONTROL) => {
                    if c.is_ascii_alphabetic() {
                        self.send_key(c.to_ascii_lowercase() as u8 & 0x1F);
                    }
                }
                KeyCode::Char(c) if c.is_ascii() => self.send_key(c as u8),
                _ => {}
            }
            return;
        }

        match key.code {
            KeyCode::Char('q') => self.should_quit = true,
            KeyCode::Char('s') => {
                self.running = false;
                self.step();
            }
            KeyCode::Char('r') => self.run(),
            KeyCode::Char('p') => {
                self.running = false;
                self.status = "Paused.".into();
            }
            KeyCode::Char('b') => self.toggle_breakpoint(),
            KeyCode::Char('x') => self.reset(),
            KeyCode::Char('i') => {
                self.input_mode = true;
                self.status = "Input mode: keys go to the machine, Esc to leave.".into();
            }
            KeyCode::Up => self.scroll_memory(-1),
            KeyCode::Down => self.scroll_memory(1),
            KeyCode::PageUp => self.scroll_memory(-0x100),
            KeyCode::PageDown => self.scroll_memory(0x100),
            _ => {}
        }
    }

    /// Scroll the memory view.
    pub fn scroll_memory(&mut self, delta: i32) {
        self.mem_scroll = self.mem_scroll.wrapping_add(delta as i16 as Word);
    }
}

/// Run the debugger with a set of images.
///
/// Raw mode and the alternate screen are restored on every exit path,
/// including errors from drawing or reading events.
pub fn run_debugger(images: Vec<Image>, config: MachineConfig) -> std::io::Result<()> {
    use crate::io::terminal::{AlternateScreen, RawModeGuard};
    use crossterm::event::{self, Event};
    use ratatui::prelude::*;
    use std::io::stdout;
    use std::time::Duration;

    let _raw = RawModeGuard::enable()?;
    let _screen = AlternateScreen::enter(stdout())?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))?;

    let mut app = DebuggerApp::new(images, config);

    while !app.should_quit {
        terminal.draw(|frame| super::ui::draw(frame, &app))?;

        let timeout = if app.running { Duration::ZERO } else { Duration::from_millis(50) };
        if event::poll(timeout)? {
            if let Event::Key(key) = event::read()? {
                app.handle_key(key);
            }
        }

        if app.running {
            app.tick();
        }
    }

    Ok(())
}
