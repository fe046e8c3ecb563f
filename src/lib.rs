//! Cyder: An Apple I emulator written in Rust.
//!
//! Emulates the original machine as documented in the
//! [Apple-1 Operation Manual](https://www.applefritter.com/content/apple-1-operation-manual):
//! a MOS 6502 on a 64KB bus, an MC6820 PIA driving the keyboard and a
//! character terminal, booted from the Woz monitor ROM.
//!
//! ## Modules
//!
//! - **bus** – 64KB address space: ROM/RAM banks, composite view, map
//!   tags, ordered MMIO read/write hooks
//! - **cpu** – MOS 6502 core behind the pluggable [`cpu::Cpu`] interface;
//!   table-driven dispatch, decimal mode, interrupt vectoring
//! - **vm** – orchestrator: fetch/execute/peripheral-step loop, self-jump
//!   halt detection, shared quit flag
//! - **pia** – keyboard/display registers at `$D010..$D013`, 60x36
//!   terminal with 6x8 glyphs
//! - **input** – key event queue and ordered handler chain
//! - **status** – status and error codes shared across the machine

pub mod bus;
pub mod cpu;
pub mod input;
pub mod pia;
pub mod status;
pub mod vm;
