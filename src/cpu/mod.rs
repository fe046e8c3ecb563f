//! CPU cores and the capability interface the orchestrator drives them through.
//!
//! [`cpu::Mos6502`] is the one core shipped; anything implementing [`Cpu`]
//! can sit in its place. The orchestrator never touches core internals.

pub mod addressing;
pub mod cpu;
pub mod flags;


use crate::bus::Bus;
use crate::status::{Flow, VmError};

/// Contract between the orchestrator and a CPU core.
///
/// Construction and teardown are ordinary Rust (`new`/drop); everything
/// the orchestrator needs at run time goes through this trait, so cores
/// for other processor families can be swapped in at VM construction.
pub trait Cpu {
    /// Seed the register file and load PC from the reset vector.
    fn reset(&mut self, bus: &mut Bus);
    /// Read the opcode at PC and its operand bytes.
    fn fetch(&mut self, bus: &mut Bus);
    /// Execute the fetched instruction, returning its control flow and
    /// the cycles it consumed. Unassigned opcodes are an error.
    fn exec(&mut self, bus: &mut Bus) -> Result<(Flow, u32), VmError>;
    /// Enter the non-maskable interrupt handler.
    fn nmi(&mut self, bus: &mut Bus) -> (Flow, u32);
    /// Enter the maskable interrupt handler.
    fn irq(&mut self, bus: &mut Bus) -> (Flow, u32);
    fn pc(&self) -> u16;
    fn set_pc(&mut self, pc: u16);
    /// One-line register/flag trace for the given step number.
    fn print_state(&self, bus: &mut Bus, step: u32);
}
