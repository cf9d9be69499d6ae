//! Error kinds surfaced by the emulator core.
//!
//! Guest misbehaviour is never an error: unmapped register reads return
//! open-bus `0xFF` and stray writes are masked inside the chips. Only host
//! boundary problems (bad ROM images, malformed load files, a jammed CPU)
//! reach this type.

use thiserror::Error;

/// Convenient result alias for machine construction and file loading.
pub type Result<T> = std::result::Result<T, AtariError>;

#[derive(Debug, Error)]
pub enum AtariError {
    /// ROM blob is not the size the memory map expects.
    #[error("{rom} ROM must be {expected} bytes, got {actual}")]
    RomSize {
        rom: &'static str,
        expected: usize,
        actual: usize,
    },
    /// OS ROM carries a reset vector that cannot point into itself.
    #[error("OS ROM reset vector ${vector:04X} points outside $C000-$FFFF")]
    RomResetVector { vector: u16 },
    /// XEX/ATR parsing failure. The machine is left untouched.
    #[error("{msg}")]
    FileFormat { msg: String },
    /// The CPU executed a jam opcode. The machine is paused; `pc` still
    /// addresses the offending instruction.
    #[error("CPU jammed at ${pc:04X} executing opcode ${opcode:02X}")]
    CpuHalt { pc: u16, opcode: u8 },
}

impl From<String> for AtariError {
    fn from(msg: String) -> Self {
        AtariError::FileFormat { msg }
    }
}

impl From<&str> for AtariError {
    fn from(msg: &str) -> Self {
        AtariError::FileFormat {
            msg: msg.to_string(),
        }
    }
}
