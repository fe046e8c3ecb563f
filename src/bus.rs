//! 64KB memory bus: ROM and RAM banks, composite view, MMIO hooks.
//!
//! The CPU sees a single byte-addressable space backed by the composite
//! bank. `mount_rom`/`unmount_rom` snapshot a range from the ROM or RAM
//! bank into the composite view; registered MMIO hooks get first claim on
//! every read and write.

use std::fs;
use std::path::Path;

use log::debug;

use crate::status::VmError;

/// Size of each bank: the full 16-bit address space.
pub const BUS_SIZE: usize = 0x1_0000;

/// Which bank last supplied the composite view for an address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BankTag {
    Ram,
    Rom,
}

/// What a read hook did with an access.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadOutcome {
    /// Not this hook's address; keep going.
    Ignored,
    /// The hook's value wins; remaining hooks and the default read are skipped.
    Intercepted(u8),
}

/// What a write hook did with an access.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    /// Not this hook's address; keep going.
    Ignored,
    /// Handled, but the loop continues and the default write still lands.
    Used,
    /// Handled; remaining hooks and the default write are skipped.
    Intercepted,
}

pub type ReadHook = Box<dyn FnMut(u16) -> ReadOutcome>;
pub type WriteHook = Box<dyn FnMut(u16, u8) -> WriteOutcome>;

/// The machine's address space. Three parallel banks plus a per-address
/// tag recording which bank the composite view was last snapshot from.
pub struct Bus {
    rom: Box<[u8; BUS_SIZE]>,
    ram: Box<[u8; BUS_SIZE]>,
    mem: Box<[u8; BUS_SIZE]>,
    map: Box<[BankTag; BUS_SIZE]>,
    read_hooks: Vec<ReadHook>,
    write_hooks: Vec<WriteHook>,
}

impl Bus {
    /// Create a zeroed bus with everything tagged RAM and no hooks.
    pub fn new() -> Self {
        Bus {
            rom: Box::new([0; BUS_SIZE]),
            ram: Box::new([0; BUS_SIZE]),
            mem: Box::new([0; BUS_SIZE]),
            map: Box::new([BankTag::Ram; BUS_SIZE]),
            read_hooks: Vec::new(),
            write_hooks: Vec::new(),
        }
    }

    /// Read one byte. Hooks run in registration order; the first to
    /// intercept supplies the value, otherwise the composite bank does.
    pub fn read(&mut self, addr: u16) -> u8 {
        for hook in &mut self.read_hooks {
            if let ReadOutcome::Intercepted(val) = hook(addr) {
                return val;
            }
        }
        self.mem[addr as usize]
    }

    /// Write one byte. Hooks run in registration order; `Intercepted`
    /// stops the loop and suppresses the default write, `Used` does not.
    /// The default write lands in both the RAM bank and the composite
    /// view regardless of the map tag; the tag only governs what
    /// `mount_rom`/`unmount_rom` snapshot, it is not write protection.
    pub fn write(&mut self, addr: u16, val: u8) {
        for hook in &mut self.write_hooks {
            if hook(addr, val) == WriteOutcome::Intercepted {
                return;
            }
        }
        self.ram[addr as usize] = val;
        self.mem[addr as usize] = val;
    }

    /// Little-endian 16-bit read; the high byte comes from `addr + 1`
    /// modulo the address space.
    pub fn read_word(&mut self, addr: u16) -> u16 {
        let lo = self.read(addr) as u16;
        let hi = self.read(addr.wrapping_add(1)) as u16;
        hi << 8 | lo
    }

    /// Like [`read_word`](Bus::read_word), but the high byte is read from
    /// within the same 256-byte page as the low byte. This is the 6502's
    /// indirect-addressing behavior: a pointer at `$12FF` takes its high
    /// byte from `$1200`, not `$1300`.
    pub fn read_word_page_wrap(&mut self, addr: u16) -> u16 {
        let hi_addr = (addr & 0xFF00) | (addr.wrapping_add(1) & 0x00FF);
        let lo = self.read(addr) as u16;
        let hi = self.read(hi_addr) as u16;
        hi << 8 | lo
    }

    /// Snapshot `addr..addr+len` (clamped to the end of the bank) from
    /// the ROM bank into the composite view and tag the range ROM.
    pub fn mount_rom(&mut self, addr: u16, len: usize) {
        let start = addr as usize;
        let end = (start + len).min(BUS_SIZE);
        self.mem[start..end].copy_from_slice(&self.rom[start..end]);
        for tag in &mut self.map[start..end] {
            *tag = BankTag::Rom;
        }
        debug!("mounted rom ${:04X}..${:04X}", start, end);
    }

    /// Snapshot `addr..addr+len` from the RAM bank back into the
    /// composite view and tag the range RAM. The RAM bank itself is
    /// never touched by mounting, so this restores whatever the range
    /// held (including writes made while the ROM was mounted).
    pub fn unmount_rom(&mut self, addr: u16, len: usize) {
        let start = addr as usize;
        let end = (start + len).min(BUS_SIZE);
        self.mem[start..end].copy_from_slice(&self.ram[start..end]);
        for tag in &mut self.map[start..end] {
            *tag = BankTag::Ram;
        }
        debug!("unmounted rom ${:04X}..${:04X}", start, end);
    }

    /// Load a flat binary image into the ROM bank at `addr`. The bytes
    /// are invisible to the CPU until the range is mounted.
    pub fn load_rom(&mut self, addr: u16, path: &Path) -> Result<usize, VmError> {
        let data = fs::read(path).map_err(|source| VmError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        let start = addr as usize;
        if start + data.len() > BUS_SIZE {
            return Err(VmError::RomOverrun {
                addr,
                len: data.len(),
            });
        }
        self.rom[start..start + data.len()].copy_from_slice(&data);
        debug!(
            "loaded {} bytes at ${:04X} from {}",
            data.len(),
            addr,
            path.display()
        );
        Ok(data.len())
    }

    /// Map tag currently covering an address.
    pub fn map_tag(&self, addr: u16) -> BankTag {
        self.map[addr as usize]
    }

    /// Append a read hook. Hooks cannot be removed and always run in
    /// registration order.
    pub fn add_read_hook(&mut self, hook: impl FnMut(u16) -> ReadOutcome + 'static) {
        self.read_hooks.push(Box::new(hook));
    }

    /// Append a write hook. Same ordering rules as read hooks.
    pub fn add_write_hook(&mut self, hook: impl FnMut(u16, u8) -> WriteOutcome + 'static) {
        self.write_hooks.push(Box::new(hook));
    }

    /// Write the RAM bank and the composite view to flat files, for
    /// post-run inspection.
    pub fn dump(&self, ram_path: &Path, mem_path: &Path) -> Result<(), VmError> {
        fs::write(ram_path, &self.ram[..]).map_err(|source| VmError::Open {
            path: ram_path.to_path_buf(),
            source,
        })?;
        fs::write(mem_path, &self.mem[..]).map_err(|source| VmError::Open {
            path: mem_path.to_path_buf(),
            source,
        })
    }
}
