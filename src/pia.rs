//! MC6820-style PIA console: keyboard and display registers at
//! `$D010..$D013` and a character-cell terminal.
//!
//! The CPU side is four memory-mapped registers served through bus
//! hooks. The human side is a 60x36 cell grid rendered from a 6x8 glyph
//! ROM into a framebuffer the window presents, plus a key translation
//! layer that latches 7-bit codes into the keyboard register.

use std::cell::RefCell;
use std::fs;
use std::io;
use std::path::Path;
use std::rc::Rc;
use std::time::{Duration, Instant};

use log::debug;
use minifb::Key;

use crate::bus::{ReadOutcome, WriteOutcome};
use crate::input::{Handled, KeyEvent};
use crate::status::VmError;
use crate::vm::Vm;

pub const KBD_DATA: u16 = 0xD010;
pub const KBD_CR: u16 = 0xD011;
pub const DSP_DATA: u16 = 0xD012;
pub const DSP_CR: u16 = 0xD013;

pub const CHAR_WIDTH: usize = 6;
pub const CHAR_HEIGHT: usize = 8;
pub const SCR_COLS: usize = 60;
pub const SCR_ROWS: usize = 36;

/// Framebuffer dimensions in pixels.
pub const SCR_WIDTH: usize = CHAR_WIDTH * SCR_COLS;
pub const SCR_HEIGHT: usize = CHAR_HEIGHT * SCR_ROWS;

/// Display port busy/ready bit: the monitor sets it with each write and
/// the terminal clears it once the character is on screen.
const DSP_READY: u8 = 0x80;

const BLINK_DELAY: Duration = Duration::from_millis(400);
const CURSOR_GLYPH: u8 = b'_';

const PIXEL_ON: u32 = 0x00FF_FFFF;
const PIXEL_OFF: u32 = 0x0000_0000;

pub struct Pia {
    kbd_data: u8,
    kbd_cr: u8,
    dsp_data: u8,
    dsp_cr: u8,

    cells: [u8; SCR_COLS * SCR_ROWS],
    col: usize,
    row: usize,

    glyphs: [[u8; CHAR_HEIGHT]; 128],
    pub framebuffer: Vec<u32>,
    dirty: bool,
    cursor_on: bool,
    last_blink: Instant,
}

impl Pia {
    pub fn new() -> Self {
        let mut pia = Pia {
            kbd_data: 0,
            kbd_cr: 0,
            dsp_data: 0,
            dsp_cr: 0,
            cells: [0; SCR_COLS * SCR_ROWS],
            col: 0,
            row: 0,
            glyphs: [[0; CHAR_HEIGHT]; 128],
            framebuffer: vec![PIXEL_OFF; SCR_WIDTH * SCR_HEIGHT],
            dirty: true,
            cursor_on: false,
            last_blink: Instant::now(),
        };
        pia.reset();
        pia
    }

    /// Load the 6x8 glyph set: 128 characters, 8 bytes each, bit `x` of
    /// row byte `y` lighting pixel `(x, y)`.
    pub fn load_charmap(&mut self, path: &Path) -> Result<(), VmError> {
        let data = fs::read(path).map_err(|source| VmError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        if data.len() < 128 * CHAR_HEIGHT {
            return Err(VmError::Open {
                path: path.to_path_buf(),
                source: io::Error::new(io::ErrorKind::UnexpectedEof, "short character ROM"),
            });
        }
        for (n, glyph) in self.glyphs.iter_mut().enumerate() {
            glyph.copy_from_slice(&data[n * CHAR_HEIGHT..(n + 1) * CHAR_HEIGHT]);
        }
        debug!("loaded {} glyphs from {}", self.glyphs.len(), path.display());
        Ok(())
    }

    /// Power-on register and screen state.
    pub fn reset(&mut self) {
        self.kbd_cr = 0;
        self.kbd_data = 0x80;
        self.dsp_cr = 0;
        self.dsp_data = 0;
        self.cells = [0; SCR_COLS * SCR_ROWS];
        self.col = 0;
        self.row = 0;
        self.dirty = true;
    }

    /// Wire this PIA into a machine: MMIO hooks for the register block
    /// and a per-instruction step hook for the terminal side.
    pub fn install(pia: &Rc<RefCell<Pia>>, vm: &mut Vm) {
        let p = pia.clone();
        vm.bus.add_read_hook(move |addr| p.borrow_mut().read_reg(addr));
        let p = pia.clone();
        vm.bus
            .add_write_hook(move |addr, val| p.borrow_mut().write_reg(addr, val));
        let p = pia.clone();
        vm.add_step_hook(move || p.borrow_mut().step());
    }

    fn read_reg(&mut self, addr: u16) -> ReadOutcome {
        match addr {
            KBD_DATA => {
                // Reading the key acknowledges it.
                self.kbd_cr = 0x27;
                ReadOutcome::Intercepted(self.kbd_data)
            }
            KBD_CR => ReadOutcome::Intercepted(self.kbd_cr),
            DSP_DATA => ReadOutcome::Intercepted(self.dsp_data),
            DSP_CR => ReadOutcome::Intercepted(self.dsp_cr),
            _ => ReadOutcome::Ignored,
        }
    }

    fn write_reg(&mut self, addr: u16, val: u8) -> WriteOutcome {
        match addr {
            KBD_DATA => {
                self.kbd_data = val;
                WriteOutcome::Used
            }
            KBD_CR => {
                self.kbd_cr = if self.kbd_cr == 0 { 0x27 } else { val };
                WriteOutcome::Used
            }
            DSP_DATA => {
                // The port only latches once the monitor has configured
                // it for output.
                if self.dsp_cr & 0x04 != 0 {
                    self.dsp_data = val | DSP_READY;
                }
                WriteOutcome::Used
            }
            DSP_CR => {
                self.dsp_cr = val;
                WriteOutcome::Used
            }
            _ => WriteOutcome::Ignored,
        }
    }

    /// Per-instruction terminal step: drain a pending display write.
    pub fn step(&mut self) {
        if self.dsp_data & DSP_READY != 0 {
            self.chrout();
            self.dirty = true;
        }
    }

    /// Latch a 7-bit key code into the keyboard register.
    pub fn key_down(&mut self, code: u8) {
        let mut c = code & 0x7F;
        if (0x61..=0x7A).contains(&c) {
            c &= 0x5F; // fold lowercase onto the uppercase set
        }
        if c < 0x60 {
            self.kbd_data = c | 0x80;
            self.kbd_cr = 0xA7;
        }
    }

    fn chrout(&mut self) {
        let data = self.dsp_data & 0x7F;

        if data == b'\n' || data == b'\r' {
            self.col = 0;
            self.row += 1;
        } else {
            let c = if data > 0x5F { data & 0x5F } else { data };
            self.cells[self.row * SCR_COLS + self.col] = c;
            self.col += 1;
        }

        if self.col == SCR_COLS {
            self.col = 0;
            self.row += 1;
        }
        if self.row == SCR_ROWS {
            self.scroll();
            self.row -= 1;
        }

        self.dsp_data = data;
    }

    fn scroll(&mut self) {
        self.cells.copy_within(SCR_COLS.., 0);
        self.cells[SCR_COLS * (SCR_ROWS - 1)..].fill(0);
    }

    /// Advance the cursor blink and redraw the framebuffer if anything
    /// changed. Returns whether the framebuffer needs presenting.
    pub fn render(&mut self) -> bool {
        if self.last_blink.elapsed() >= BLINK_DELAY {
            self.cursor_on = !self.cursor_on;
            self.last_blink = Instant::now();
            self.dirty = true;
        }
        if !self.dirty {
            return false;
        }

        for row in 0..SCR_ROWS {
            for col in 0..SCR_COLS {
                self.blit(col, row, self.cells[row * SCR_COLS + col]);
            }
        }
        if self.cursor_on {
            self.blit(self.col, self.row, CURSOR_GLYPH);
        }
        self.dirty = false;
        true
    }

    fn blit(&mut self, col: usize, row: usize, code: u8) {
        let glyph = self.glyphs[(code & 0x7F) as usize];
        for (y, bits) in glyph.iter().enumerate() {
            let line = (row * CHAR_HEIGHT + y) * SCR_WIDTH + col * CHAR_WIDTH;
            for x in 0..CHAR_WIDTH {
                self.framebuffer[line + x] = if bits & (1 << x) != 0 {
                    PIXEL_ON
                } else {
                    PIXEL_OFF
                };
            }
        }
    }
}

/// The console's keyboard handler: Escape quits, F1 resets the machine,
/// everything else is translated and offered to the keyboard register.
pub fn handler(pia: &Rc<RefCell<Pia>>) -> impl FnMut(&KeyEvent, &mut Vm) -> Handled + 'static {
    let pia = pia.clone();
    move |event, vm| {
        match event.key {
            Key::Escape => vm.request_quit(),
            Key::F1 => {
                pia.borrow_mut().reset();
                vm.reset();
            }
            _ => {
                if let Some(code) = ascii(event.key, event.shift) {
                    pia.borrow_mut().key_down(code);
                }
            }
        }
        Handled::Consumed
    }
}

/// Translate a pressed key to the machine's 7-bit code, or `None` for
/// keys the console has no use for.
fn ascii(key: Key, shift: bool) -> Option<u8> {
    let base = match key {
        Key::A => b'a',
        Key::B => b'b',
        Key::C => b'c',
        Key::D => b'd',
        Key::E => b'e',
        Key::F => b'f',
        Key::G => b'g',
        Key::H => b'h',
        Key::I => b'i',
        Key::J => b'j',
        Key::K => b'k',
        Key::L => b'l',
        Key::M => b'm',
        Key::N => b'n',
        Key::O => b'o',
        Key::P => b'p',
        Key::Q => b'q',
        Key::R => b'r',
        Key::S => b's',
        Key::T => b't',
        Key::U => b'u',
        Key::V => b'v',
        Key::W => b'w',
        Key::X => b'x',
        Key::Y => b'y',
        Key::Z => b'z',
        Key::Key0 => b'0',
        Key::Key1 => b'1',
        Key::Key2 => b'2',
        Key::Key3 => b'3',
        Key::Key4 => b'4',
        Key::Key5 => b'5',
        Key::Key6 => b'6',
        Key::Key7 => b'7',
        Key::Key8 => b'8',
        Key::Key9 => b'9',
        Key::Space => b' ',
        Key::Enter => b'\r',
        Key::Backspace => 0x5F, // rubout
        Key::Comma => b',',
        Key::Period => b'.',
        Key::Slash => b'/',
        Key::Semicolon => b';',
        Key::Apostrophe => b'\'',
        Key::Minus => b'-',
        Key::Equal => b'=',
        Key::LeftBracket => b'[',
        Key::RightBracket => b']',
        Key::Backslash => b'\\',
        _ => return None,
    };
    Some(if shift { shifted(base) } else { base })
}

fn shifted(c: u8) -> u8 {
    match c {
        b'1' => b'!',
        b'2' => b'@',
        b'3' => b'#',
        b'4' => b'$',
        b'5' => b'%',
        b'6' => b'^',
        b'7' => b'&',
        b'8' => b'*',
        b'9' => b'(',
        b'0' => b')',
        b',' => b'<',
        b'.' => b'>',
        b'/' => b'?',
        b';' => b':',
        b'\'' => b'"',
        b'-' => b'_',
        b'=' => b'+',
        b'a'..=b'z' => c - b'a' + b'A',
        _ => c,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn output_ready(pia: &mut Pia) {
        // Configure the display port for output, as the monitor does.
        pia.write_reg(DSP_CR, 0x04);
    }

    #[test]
    fn display_write_ignored_until_port_configured() {
        let mut pia = Pia::new();
        pia.write_reg(DSP_DATA, b'A');
        assert_eq!(pia.dsp_data, 0);

        output_ready(&mut pia);
        pia.write_reg(DSP_DATA, b'A');
        assert_eq!(pia.dsp_data, b'A' | 0x80);
    }

    #[test]
    fn step_emits_character_and_clears_ready() {
        let mut pia = Pia::new();
        output_ready(&mut pia);
        pia.write_reg(DSP_DATA, b'A');
        pia.step();

        assert_eq!(pia.cells[0], b'A');
        assert_eq!(pia.col, 1);
        assert_eq!(pia.dsp_data, b'A'); // ready bit cleared

        // Nothing pending: another step changes nothing.
        pia.step();
        assert_eq!(pia.col, 1);
    }

    #[test]
    fn carriage_return_starts_a_new_line() {
        let mut pia = Pia::new();
        output_ready(&mut pia);
        pia.write_reg(DSP_DATA, b'\r');
        pia.step();
        assert_eq!(pia.col, 0);
        assert_eq!(pia.row, 1);
    }

    #[test]
    fn codes_above_5f_fold_onto_the_upper_set() {
        let mut pia = Pia::new();
        output_ready(&mut pia);
        pia.write_reg(DSP_DATA, b'a'); // $61
        pia.step();
        assert_eq!(pia.cells[0], b'A');
    }

    #[test]
    fn line_overflow_wraps_and_last_row_scrolls() {
        let mut pia = Pia::new();
        output_ready(&mut pia);
        for _ in 0..SCR_COLS {
            pia.write_reg(DSP_DATA, b'X');
            pia.step();
        }
        assert_eq!(pia.col, 0);
        assert_eq!(pia.row, 1);

        // Drive the cursor onto the last row, then once past it.
        pia.row = SCR_ROWS - 1;
        pia.cells[0] = b'Q'; // top row content, about to scroll away
        for _ in 0..SCR_COLS {
            pia.write_reg(DSP_DATA, b'Y');
            pia.step();
        }
        assert_eq!(pia.row, SCR_ROWS - 1);
        assert_ne!(pia.cells[0], b'Q');
    }

    #[test]
    fn key_latch_and_acknowledge() {
        let mut pia = Pia::new();
        pia.key_down(b'a');

        // Lowercase folds to uppercase, high bit latched.
        assert_eq!(pia.kbd_data, b'A' | 0x80);
        assert_eq!(pia.kbd_cr, 0xA7);

        let out = pia.read_reg(KBD_DATA);
        assert_eq!(out, ReadOutcome::Intercepted(b'A' | 0x80));
        assert_eq!(pia.kbd_cr, 0x27);
    }

    #[test]
    fn keys_past_the_character_set_are_dropped() {
        let mut pia = Pia::new();
        let before = pia.kbd_data;
        pia.key_down(0x7F);
        assert_eq!(pia.kbd_data, before);
    }

    #[test]
    fn unrelated_addresses_are_ignored() {
        let mut pia = Pia::new();
        assert_eq!(pia.read_reg(0x1234), ReadOutcome::Ignored);
        assert_eq!(pia.write_reg(0x1234, 0xFF), WriteOutcome::Ignored);
    }

    #[test]
    fn ascii_translation_applies_shift() {
        assert_eq!(ascii(Key::A, false), Some(b'a'));
        assert_eq!(ascii(Key::A, true), Some(b'A'));
        assert_eq!(ascii(Key::Key3, true), Some(b'#'));
        assert_eq!(ascii(Key::Backspace, false), Some(0x5F));
        assert_eq!(ascii(Key::F5, false), None);
    }
}
