//! VM orchestrator: wires the bus to a CPU core and drives the
//! fetch/execute/peripheral-step loop.
//!
//! Peripherals talk to the machine through three narrow channels: MMIO
//! hooks on the bus, step hooks run once per instruction, and a shared
//! quit flag. Nothing outside owns the bus or the core.

use std::cell::Cell;
use std::rc::Rc;

use log::debug;

use crate::bus::Bus;
use crate::cpu::Cpu;
use crate::status::{Step, VmError};

pub struct Vm {
    pub bus: Bus,
    cpu: Box<dyn Cpu>,
    /// Instructions executed since power-on.
    pub steps: u32,
    /// CPU cycles consumed since power-on.
    pub cycles: u64,
    quit: Rc<Cell<bool>>,
    step_hooks: Vec<Box<dyn FnMut()>>,
}

impl Vm {
    /// Build a machine around the given core with a zeroed bus.
    pub fn new(cpu: Box<dyn Cpu>) -> Self {
        Vm {
            bus: Bus::new(),
            cpu,
            steps: 0,
            cycles: 0,
            quit: Rc::new(Cell::new(false)),
            step_hooks: Vec::new(),
        }
    }

    /// Shared handle to the quit flag; peripherals raise it to end the run.
    pub fn quit_flag(&self) -> Rc<Cell<bool>> {
        self.quit.clone()
    }

    pub fn request_quit(&self) {
        self.quit.set(true);
    }

    /// Register a peripheral callback run once after every instruction.
    pub fn add_step_hook(&mut self, hook: impl FnMut() + 'static) {
        self.step_hooks.push(Box::new(hook));
    }

    pub fn reset(&mut self) {
        self.cpu.reset(&mut self.bus);
        debug!("reset: pc=${:04X}", self.cpu.pc());
    }

    pub fn pc(&self) -> u16 {
        self.cpu.pc()
    }

    pub fn set_pc(&mut self, pc: u16) {
        self.cpu.set_pc(pc);
    }

    /// Raise the non-maskable interrupt line.
    pub fn nmi(&mut self) {
        let (_, cycles) = self.cpu.nmi(&mut self.bus);
        self.cycles += u64::from(cycles);
    }

    /// Raise the maskable interrupt line.
    pub fn irq(&mut self) {
        let (_, cycles) = self.cpu.irq(&mut self.bus);
        self.cycles += u64::from(cycles);
    }

    pub fn print_state(&mut self) {
        self.cpu.print_state(&mut self.bus, self.steps);
    }

    /// Run one instruction and the peripheral step hooks.
    ///
    /// `Loop` is reported when the instruction jumped to its own
    /// address, the literal one-instruction spin programs end on; it is
    /// not a general hang detector. A raised quit flag overrides every
    /// other outcome, including an illegal opcode from this step.
    /// Peripherals still get their step even when the opcode was
    /// illegal.
    pub fn step(&mut self) -> Result<Step, VmError> {
        let old_pc = self.cpu.pc();

        self.cpu.fetch(&mut self.bus);
        let exec = self.cpu.exec(&mut self.bus);

        for hook in &mut self.step_hooks {
            hook();
        }
        self.steps += 1;

        match exec {
            Ok((_, cycles)) => self.cycles += u64::from(cycles),
            Err(err) => {
                if self.quit.get() {
                    return Ok(Step::Quit);
                }
                return Err(err);
            }
        }

        let mut status = Step::Ok;
        if self.cpu.pc() == old_pc {
            status = Step::Loop;
        }
        if self.quit.get() {
            status = Step::Quit;
        }
        Ok(status)
    }
}
