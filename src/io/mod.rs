//! Host-side I/O endpoints.
//!
//! The machine sees the outside world through two seams:
//! - [`Keyboard`] - the non-blocking input poller behind KBSR/KBDR
//! - any [`std::io::Write`] - the display used by the output trap services
//!
//! [`BufferedKeyboard`] and [`SharedOutput`] are cloneable handles that let a
//! host (the debugger, WASM bindings, tests) feed input and collect output.

#[cfg(feature = "terminal")]
pub mod terminal;

use std::cell::RefCell;
use std::collections::VecDeque;
use std::io::{self, Write};
use std::rc::Rc;

/// A non-blocking character source.
///
/// Neither method may block the calling thread.
pub trait Keyboard {
    /// Is a character currently available?
    fn key_ready(&mut self) -> bool;

    /// Consume and return the next available character, if any.
    fn read_key(&mut self) -> Option<u8>;
}

/// A keyboard that never has input.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoKeyboard;

impl Keyboard for NoKeyboard {
    fn key_ready(&mut self) -> bool {
        false
    }

    fn read_key(&mut self) -> Option<u8> {
        None
    }
}

/// A keyboard fed from a shared in-memory queue.
///
/// Clones share the same queue.
#[derive(Debug, Default, Clone)]
pub struct BufferedKeyboard {
    queue: Rc<RefCell<VecDeque<u8>>>,
}

impl BufferedKeyboard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a keyboard with input already queued.
    pub fn with_input(input: &[u8]) -> Self {
        let kbd = Self::new();
        kbd.push_str(input);
        kbd
    }

    /// Queue a single key.
    pub fn push(&self, key: u8) {
        self.queue.borrow_mut().push_back(key);
    }

    /// Queue several keys.
    pub fn push_str(&self, keys: &[u8]) {
        self.queue.borrow_mut().extend(keys.iter().copied());
    }

    /// Number of keys not yet consumed.
    pub fn pending(&self) -> usize {
        self.queue.borrow().len()
    }

    /// Drop every queued key.
    pub fn clear(&self) {
        self.queue.borrow_mut().clear();
    }
}

impl Keyboard for BufferedKeyboard {
    fn key_ready(&mut self) -> bool {
        !self.queue.borrow().is_empty()
    }

    fn read_key(&mut self) -> Option<u8> {
        self.queue.borrow_mut().pop_front()
    }
}

/// A display that captures output into a shared buffer.
///
/// Clones share the same buffer.
#[derive(Debug, Default, Clone)]
pub struct SharedOutput {
    buf: Rc<RefCell<Vec<u8>>>,
}

impl SharedOutput {
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything written so far, lossily decoded.
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.buf.borrow()).into_owned()
    }

    /// Drain and return everything written so far.
    pub fn take(&self) -> String {
        let bytes = std::mem::take(&mut *self.buf.borrow_mut());
        String::from_utf8_lossy(&bytes).into_owned()
    }

    pub fn clear(&self) {
        self.buf.borrow_mut().clear();
    }
}

impl Write for SharedOutput {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        self.buf.borrow_mut().extend_from_slice(data);
        Ok(data.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
