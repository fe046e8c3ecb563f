//! 6502 addressing modes and operand target resolution.
//!
//! Every opcode descriptor carries one of these modes; handlers resolve
//! their operand location through [`effective_addr`] or, for the
//! read-modify-write group, through [`resolve`] which also covers the
//! accumulator form.

use crate::bus::Bus;

/// Rule for locating an instruction's operand.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Implied,
    Accumulator,
    Immediate,
    ZeroPage,
    /// Zero page indexed by X; the sum wraps within the zero page.
    ZeroPageX,
    /// Zero page indexed by Y; the sum wraps within the zero page.
    ZeroPageY,
    /// Zero page indexed by X where the index carry runs past `$00FF`
    /// into `$0100..$01FE` instead of wrapping.
    ZeroPageXCarry,
    Absolute,
    AbsoluteX,
    AbsoluteY,
    /// 16-bit pointer read with the page-wrapped high byte (JMP only).
    Indirect,
    /// Pointer at `(zp + X) & $FF`, read with zero-page wrap.
    IndirectX,
    /// Pointer at `zp`, read with zero-page wrap, then indexed by Y.
    IndirectY,
    Relative,
}

/// Where a read-modify-write instruction operates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    Accumulator,
    Addr(u16),
}

/// Compute the bus address an operand lives at. `arg` is the decoded
/// operand (zero-extended for 2-byte instructions). Pointer-chasing
/// modes read through the bus and so can hit MMIO hooks.
pub fn effective_addr(mode: Mode, arg: u16, x: u8, y: u8, bus: &mut Bus) -> u16 {
    match mode {
        Mode::ZeroPage => arg & 0x00FF,
        Mode::ZeroPageX => arg.wrapping_add(x as u16) & 0x00FF,
        Mode::ZeroPageY => arg.wrapping_add(y as u16) & 0x00FF,
        Mode::ZeroPageXCarry => arg.wrapping_add(x as u16),
        Mode::Absolute => arg,
        Mode::AbsoluteX => arg.wrapping_add(x as u16),
        Mode::AbsoluteY => arg.wrapping_add(y as u16),
        Mode::Indirect => bus.read_word_page_wrap(arg),
        Mode::IndirectX => {
            let ptr = arg.wrapping_add(x as u16) & 0x00FF;
            bus.read_word_page_wrap(ptr)
        }
        Mode::IndirectY => bus.read_word_page_wrap(arg & 0x00FF).wrapping_add(y as u16),
        Mode::Implied | Mode::Accumulator | Mode::Immediate | Mode::Relative => {
            unreachable!("{mode:?} has no effective address")
        }
    }
}

/// Resolve a read-modify-write target: the accumulator or a bus address.
pub fn resolve(mode: Mode, arg: u16, x: u8, y: u8, bus: &mut Bus) -> Target {
    match mode {
        Mode::Accumulator => Target::Accumulator,
        _ => Target::Addr(effective_addr(mode, arg, x, y, bus)),
    }
}
