//! Terminal endpoints backed by crossterm.
//!
//! Raw mode is required so single keystrokes reach the machine without
//! waiting for a line. Raw mode also suppresses SIGINT, so Ctrl-C arrives
//! as a key event and is turned into an interrupt flag instead.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::io::{self, Stdout, Write};
use std::rc::Rc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::terminal;

use super::Keyboard;

/// Puts the terminal in raw mode and restores it on drop.
pub struct RawModeGuard {
    _private: (),
}

impl RawModeGuard {
    pub fn enable() -> io::Result<Self> {
        terminal::enable_raw_mode()?;
        Ok(Self { _private: () })
    }
}

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        if let Err(e) = terminal::disable_raw_mode() {
            log::warn!("failed to restore terminal mode: {}", e);
        }
    }
}

/// Switches a writer to the alternate screen and switches back on drop.
pub struct AlternateScreen<W: Write> {
    out: W,
}

impl<W: Write> AlternateScreen<W> {
    pub fn enter(mut out: W) -> io::Result<Self> {
        crossterm::execute!(out, terminal::EnterAlternateScreen)?;
        Ok(Self { out })
    }
}

impl<W: Write> Drop for AlternateScreen<W> {
    fn drop(&mut self) {
        if let Err(e) = crossterm::execute!(self.out, terminal::LeaveAlternateScreen) {
            log::warn!("failed to leave alternate screen: {}", e);
        }
    }
}

/// Keyboard reading raw keystrokes from the controlling terminal.
///
/// Clones share the same key buffer, so a host can keep a handle and
/// [`pump`](Self::pump) events while the machine owns the keyboard.
#[derive(Clone)]
pub struct TerminalKeyboard {
    pending: Rc<RefCell<VecDeque<u8>>>,
    interrupt: Arc<AtomicBool>,
}

impl TerminalKeyboard {
    pub fn new() -> Self {
        Self {
            pending: Rc::new(RefCell::new(VecDeque::new())),
            interrupt: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Flag raised when the user presses Ctrl-C.
    pub fn interrupt_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.interrupt)
    }

    /// Drain ready terminal events until one key has been buffered.
    /// Never blocks.
    pub fn pump(&self) {
        loop {
            match event::poll(Duration::ZERO) {
                Ok(true) => {}
                Ok(false) => return,
                Err(e) => {
                    log::warn!("terminal poll failed: {}", e);
                    return;
                }
            }

            match event::read() {
                Ok(Event::Key(key)) => {
                    if let Some(byte) = self.translate(key) {
                        self.pending.borrow_mut().push_back(byte);
                        return;
                    }
                }
                Ok(_) => {}
                Err(e) => {
                    log::warn!("terminal read failed: {}", e);
                    return;
                }
            }
        }
    }

    fn translate(&self, key: KeyEvent) -> Option<u8> {
        if key.kind != KeyEventKind::Press {
            return None;
        }

        match key.code {
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.interrupt.store(true, Ordering::SeqCst);
                None
            }
            KeyCode::Char(c) if key.modifiers.contains(KeyModifiers::CONTROL) && c.is_ascii_alphabetic() => {
                Some(c.to_ascii_lowercase() as u8 & 0x1F)
            }
            KeyCode::Char(c) if c.is_ascii() => Some(c as u8),
            KeyCode::Enter => Some(b'\n'),
            KeyCode::Tab => Some(b'\t'),
            KeyCode::Backspace => Some(0x08),
            KeyCode::Esc => Some(0x1B),
            _ => None,
        }
    }
}

impl Default for TerminalKeyboard {
    fn default() -> Self {
        Self::new()
    }
}

impl Keyboard for TerminalKeyboard {
    fn key_ready(&mut self) -> bool {
        if self.pending.borrow().is_empty() {
            self.pump();
        }
        !self.pending.borrow().is_empty()
    }

    fn read_key(&mut self) -> Option<u8> {
        if self.pending.borrow().is_empty() {
            self.pump();
        }
        self.pending.borrow_mut().pop_front()
    }
}

/// Stdout writer that emits `\r\n` for every `\n`, as raw mode needs.
pub struct TerminalDisplay {
    out: Stdout,
}

impl TerminalDisplay {
    pub fn new() -> Self {
        Self { out: io::stdout() }
    }
}

impl Default for TerminalDisplay {
    fn default() -> Self {
        Self::new()
    }
}

impl Write for TerminalDisplay {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        let mut out = self.out.lock();
        for chunk in data.split_inclusive(|&b| b == b'\n') {
            match chunk.split_last() {
                Some((&b'\n', line)) => {
                    out.write_all(line)?;
                    out.write_all(b"\r\n")?;
                }
                _ => out.write_all(chunk)?,
            }
        }
        Ok(data.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.out.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(code: KeyCode, modifiers: KeyModifiers) -> KeyEvent {
        KeyEvent::new(code, modifiers)
    }

    #[test]
    fn test_translate_plain_keys() {
        let kbd = TerminalKeyboard::new();
        assert_eq!(kbd.translate(key(KeyCode::Char('a'), KeyModifiers::NONE)), Some(b'a'));
        assert_eq!(kbd.translate(key(KeyCode::Enter, KeyModifiers::NONE)), Some(b'\n'));
        assert_eq!(kbd.translate(key(KeyCode::Backspace, KeyModifiers::NONE)), Some(0x08));
        assert_eq!(kbd.translate(key(KeyCode::Char('é'), KeyModifiers::NONE)), None);
    }

    #[test]
    fn test_alternate_screen_left_on_early_return() {
        use crate::io::SharedOutput;

        fn session(out: SharedOutput) -> io::Result<()> {
            let _screen = AlternateScreen::enter(out)?;
            Err(io::Error::new(io::ErrorKind::Other, "draw failed"))
        }

        let out = SharedOutput::new();
        assert!(session(out.clone()).is_err());

        let written = out.contents();
        let entered = written.find("\x1b[?1049h").unwrap();
        let left = written.find("\x1b[?1049l").unwrap();
        assert!(entered < left);
    }

    #[test]
    fn test_translate_control_keys() {
        let kbd = TerminalKeyboard::new();
        assert_eq!(kbd.translate(key(KeyCode::Char('d'), KeyModifiers::CONTROL)), Some(0x04));
        assert!(!kbd.interrupt_handle().load(Ordering::SeqCst));

        assert_eq!(kbd.translate(key(KeyCode::Char('c'), KeyModifiers::CONTROL)), None);
        assert!(kbd.interrupt_handle().load(Ordering::SeqCst));
    }
}
