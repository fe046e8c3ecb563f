//! Status and error codes shared across the machine.

use std::fmt;
use std::io;
use std::path::PathBuf;

/// Control-flow outcome of a single instruction handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    /// Instruction completed; PC advances by the instruction length.
    Ok,
    /// The handler set PC itself (branches taken, jumps, returns, interrupt entry).
    Jump,
}

/// Outcome of one orchestrator step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Ok,
    /// The instruction jumped to its own address (single-instruction spin).
    Loop,
    /// The quit flag was raised during this step.
    Quit,
}

/// Failures that cross the machine boundary.
#[derive(Debug)]
pub enum VmError {
    /// An opcode with no assigned handler reached the dispatcher.
    IllegalOpcode { opcode: u8, pc: u16 },
    /// A ROM or character-map file could not be opened or read.
    Open { path: PathBuf, source: io::Error },
    /// A ROM image does not fit between its base address and the end of the bank.
    RomOverrun { addr: u16, len: usize },
    /// Window or other host platform failure.
    Platform(String),
    /// Bad command line or registration argument.
    InvalidArgument(String),
}

impl fmt::Display for VmError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VmError::IllegalOpcode { opcode, pc } => {
                write!(f, "illegal opcode ${opcode:02X} at ${pc:04X}")
            }
            VmError::Open { path, source } => {
                write!(f, "cannot read {}: {source}", path.display())
            }
            VmError::RomOverrun { addr, len } => {
                write!(f, "{len} byte image does not fit at ${addr:04X}")
            }
            VmError::Platform(msg) => write!(f, "platform failure: {msg}"),
            VmError::InvalidArgument(msg) => write!(f, "{msg}"),
        }
    }
}

impl std::error::Error for VmError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            VmError::Open { source, .. } => Some(source),
            _ => None,
        }
    }
}
