//! Machine configuration.
//!
//! Settings can come from a JSON file; missing keys take their defaults:
//!
//! ```json
//! { "start_pc": 12288, "native_traps": true, "max_cycles": null }
//! ```

use std::path::Path;

use serde::{Serialize, Deserialize};
use thiserror::Error;

use crate::word::Word;

/// Conventional address of the first user instruction.
pub const PC_START: Word = 0x3000;

/// Runtime settings for a [`Cpu`](crate::Cpu).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MachineConfig {
    /// PC value before the first fetch.
    pub start_pc: Word,

    /// Service GETC/OUT/PUTS/IN/PUTSP on the host instead of
    /// jumping through the trap vector table. HALT is always native.
    pub native_traps: bool,

    /// Stop after this many instructions (None = until halt).
    pub max_cycles: Option<u64>,
}

impl Default for MachineConfig {
    fn default() -> Self {
        Self {
            start_pc: PC_START,
            native_traps: true,
            max_cycles: None,
        }
    }
}

impl MachineConfig {
    /// Parse a configuration from JSON text.
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(text).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Load a configuration file from disk.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::Io(format!("{}: {}", path.as_ref().display(), e)))?;
        Self::from_json(&text)
    }
}

/// Parse an address written as `0x3000`, `x3000` or decimal.
pub fn parse_address(text: &str) -> Result<Word, String> {
    let text = text.trim();
    let hex = text
        .strip_prefix("0x")
        .or_else(|| text.strip_prefix("0X"))
        .or_else(|| text.strip_prefix('x'))
        .or_else(|| text.strip_prefix('X'));

    match hex {
        Some(digits) => Word::from_str_radix(digits, 16),
        None => text.parse::<Word>(),
    }
    .map_err(|e| format!("invalid address '{}': {}", text, e))
}

/// Errors that can occur while loading configuration.
#[derive(Debug, Clone, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(String),

    #[error("invalid configuration: {0}")]
    Parse(String),
}
