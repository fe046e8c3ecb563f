//! Apple I emulator entry point.
//!
//! Boots the Woz monitor and BASIC ROMs (or a raw test image) and runs
//! the machine against a PIA console window.
//! Usage: cyder [--rom DIR] [--test IMAGE] [--trace] [--dump]

use std::cell::RefCell;
use std::env;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::rc::Rc;

use ansi_term::Colour::Red;
use log::info;
use minifb::{Scale, Window, WindowOptions};

use cyder::bus::BUS_SIZE;
use cyder::cpu::cpu::Mos6502;
use cyder::input::InputQueue;
use cyder::pia::{self, Pia, SCR_HEIGHT, SCR_WIDTH};
use cyder::status::{Step, VmError};
use cyder::vm::Vm;

const MONITOR_BASE: u16 = 0xFF00;
const MONITOR_SIZE: usize = 0x0100;
const BASIC_BASE: u16 = 0xE000;
const BASIC_SIZE: usize = 0x1000;

/// Functional test images start executing at $0400.
const TEST_ENTRY: u16 = 0x0400;

/// Instructions per window update. The core never throttles itself;
/// this only keeps event polling and rendering responsive.
const STEPS_PER_FRAME: usize = 10_000;

struct Args {
    rom_dir: PathBuf,
    test_image: Option<PathBuf>,
    trace: bool,
    dump: bool,
}

fn parse_args() -> Result<Args, VmError> {
    let mut args = Args {
        rom_dir: PathBuf::from("rom"),
        test_image: None,
        trace: false,
        dump: false,
    };
    let mut it = env::args().skip(1);
    while let Some(arg) = it.next() {
        match arg.as_str() {
            "--trace" => args.trace = true,
            "--dump" => args.dump = true,
            "--rom" => {
                args.rom_dir = it
                    .next()
                    .map(PathBuf::from)
                    .ok_or_else(|| VmError::InvalidArgument("--rom needs a directory".into()))?;
            }
            "--test" => {
                args.test_image = Some(it.next().map(PathBuf::from).ok_or_else(|| {
                    VmError::InvalidArgument("--test needs an image file".into())
                })?);
            }
            other => {
                return Err(VmError::InvalidArgument(format!(
                    "unknown argument: {other}"
                )));
            }
        }
    }
    Ok(args)
}

fn load_and_mount(vm: &mut Vm, path: &Path, base: u16, size: usize) -> Result<(), VmError> {
    vm.bus.load_rom(base, path)?;
    vm.bus.mount_rom(base, size);
    Ok(())
}

fn run(args: &Args) -> Result<(), VmError> {
    let mut vm = Vm::new(Box::new(Mos6502::new()));

    let mut pia = Pia::new();
    pia.load_charmap(&args.rom_dir.join("a1chr.bin"))?;
    let pia = Rc::new(RefCell::new(pia));
    Pia::install(&pia, &mut vm);

    let mut input = InputQueue::new();
    input.add_handler(pia::handler(&pia));

    match &args.test_image {
        Some(image) => {
            load_and_mount(&mut vm, image, 0x0000, BUS_SIZE)?;
            vm.reset();
            vm.set_pc(TEST_ENTRY);
        }
        None => {
            load_and_mount(&mut vm, &args.rom_dir.join("a1boot.bin"), MONITOR_BASE, MONITOR_SIZE)?;
            load_and_mount(&mut vm, &args.rom_dir.join("a1basic.bin"), BASIC_BASE, BASIC_SIZE)?;
            vm.reset();
        }
    }

    let mut window = Window::new(
        "Apple I",
        SCR_WIDTH,
        SCR_HEIGHT,
        WindowOptions {
            scale: Scale::X2,
            ..WindowOptions::default()
        },
    )
    .map_err(|e| VmError::Platform(e.to_string()))?;
    window.set_target_fps(60);

    'running: while window.is_open() {
        input.poll(&window);
        input.dispatch(&mut vm);

        for _ in 0..STEPS_PER_FRAME {
            let status = vm.step()?;
            if args.trace {
                vm.print_state();
            }
            match status {
                Step::Ok => {}
                Step::Loop => {
                    info!("self-jump at ${:04X} after {} steps", vm.pc(), vm.steps);
                    break 'running;
                }
                Step::Quit => break 'running,
            }
        }

        if pia.borrow_mut().render() {
            window
                .update_with_buffer(&pia.borrow().framebuffer, SCR_WIDTH, SCR_HEIGHT)
                .map_err(|e| VmError::Platform(e.to_string()))?;
        } else {
            window.update();
        }
    }

    if args.dump {
        vm.bus.dump(Path::new("ram.bin"), Path::new("mem.bin"))?;
    }
    Ok(())
}

fn main() -> ExitCode {
    env_logger::init();

    let args = match parse_args() {
        Ok(args) => args,
        Err(err) => {
            eprintln!("{} {err}", Red.bold().paint("ERROR"));
            eprintln!("usage: cyder [--rom DIR] [--test IMAGE] [--trace] [--dump]");
            return ExitCode::FAILURE;
        }
    };

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{} {err}", Red.bold().paint("ERROR"));
            ExitCode::FAILURE
        }
    }
}
