mod interrupt;
mod key;
pub mod mbc;
mod palette;
pub mod timer;

pub use self::interrupt::{Interrupt, Interrupts, IE, IF};
pub use self::key::Key;
use self::key::KeyData;
use self::mbc::{Cartridge, MBC};
pub use self::palette::Palette;
use self::timer::Timer;

const VRAM_BANK_SIZE: usize = 0x2000;
const WRAM_BANK_SIZE: usize = 0x1000;
pub const OAM_SIZE: usize = 0xa0;
const IO_SIZE: usize = 0x80;
const HRAM_SIZE: usize = 0x7f;

pub const P1: u16 = 0xff00;
pub const SB: u16 = 0xff01;
pub const SC: u16 = 0xff02;
pub const LCDC: u16 = 0xff40;
pub const STAT: u16 = 0xff41;
pub const LY: u16 = 0xff44;
pub const LYC: u16 = 0xff45;
pub const DMA: u16 = 0xff46;
pub const KEY1: u16 = 0xff4d;
pub const VBK: u16 = 0xff4f;
pub const HDMA1: u16 = 0xff51;
pub const HDMA4: u16 = 0xff54;
pub const HDMA5: u16 = 0xff55;
pub const BCPS: u16 = 0xff68;
pub const BCPD: u16 = 0xff69;
pub const OCPS: u16 = 0xff6a;
pub const OCPD: u16 = 0xff6b;
pub const SVBK: u16 = 0xff70;

pub struct Memory {
  cart: Cartridge,
  cgb: bool,

  vram: Vec<u8>,
  vram_bank: usize,
  wram: Vec<u8>,
  wram_bank: usize,
  oam: [u8; OAM_SIZE],
  io: [u8; IO_SIZE],
  hram: [u8; HRAM_SIZE],
  key: KeyData,
  serial: Vec<u8>,

  double_speed: bool,
  speed_armed: bool,

  /// H-Blank VRAM DMA in progress. HDMA5 holds the blocks left minus one.
  hdma_active: bool,
  bg_palette: Palette,
  obj_palette: Palette,

  pub timer: Timer,
  pub interrupts: Interrupts,
}

impl Memory {
  pub fn new(cart: Cartridge, cgb: bool) -> Memory {
    let mut result = Memory {
      cart,
      cgb,

      vram: vec![0; 2 * VRAM_BANK_SIZE],
      vram_bank: 0,
      wram: vec![0; 8 * WRAM_BANK_SIZE],
      wram_bank: 1,
      oam: [0; OAM_SIZE],
      io: [0; IO_SIZE],
      hram: [0; HRAM_SIZE],
      key: KeyData::new(),
      serial: Vec::new(),

      double_speed: false,
      speed_armed: false,

      hdma_active: false,
      bg_palette: Palette::new(),
      obj_palette: Palette::new(),

      timer: Timer::new(),
      interrupts: Interrupts::new(),
    };
    result.power_on();
    result
  }

  fn power_on(&mut self) {
    // See http://nocash.emubase.de/pandocs.htm#powerupsequence
    self.wb(0xff05, 0x00); // TIMA
    self.wb(0xff06, 0x00); // TMA
    self.wb(0xff07, 0xf8); // TAC
    self.wb(0xff0f, 0xe1); // IF
    self.wb(0xff10, 0x80); // NR10
    self.wb(0xff11, 0xbf); // NR11
    self.wb(0xff12, 0xf3); // NR12
    self.wb(0xff14, 0xbf); // NR14
    self.wb(0xff16, 0x3f); // NR21
    self.wb(0xff17, 0x00); // NR22
    self.wb(0xff19, 0xbf); // NR24
    self.wb(0xff1a, 0x7f); // NR30
    self.wb(0xff1b, 0xff); // NR31
    self.wb(0xff1c, 0x9f); // NR32
    self.wb(0xff1e, 0xbf); // NR33
    self.wb(0xff20, 0xff); // NR41
    self.wb(0xff21, 0x00); // NR42
    self.wb(0xff22, 0x00); // NR43
    self.wb(0xff23, 0xbf); // NR44
    self.wb(0xff24, 0x77); // NR50
    self.wb(0xff25, 0xf3); // NR51
    self.wb(0xff26, 0xf1); // NR52
    self.wb(0xff40, 0x91); // LCDC
    self.wb(0xff41, 0x85); // STAT
    self.wb(0xff42, 0x00); // SCY
    self.wb(0xff43, 0x00); // SCX
    self.wb(0xff45, 0x00); // LYC
    self.wb(0xff47, 0xfc); // BGP
    self.wb(0xff48, 0xff); // OBP0
    self.wb(0xff49, 0xff); // OBP1
    self.wb(0xff4a, 0x00); // WY
    self.wb(0xff4b, 0x00); // WX
    self.wb(0xffff, 0x00); // IE
    self.io[(HDMA5 & 0x7f) as usize] = 0xff;
  }

  pub fn cgb(&self) -> bool {
    self.cgb
  }

  pub fn cartridge(&self) -> &Cartridge {
    &self.cart
  }

  pub fn cartridge_mut(&mut self) -> &mut Cartridge {
    &mut self.cart
  }

  /// Read a byte at address `addr`.
  pub fn rb(&self, addr: u16) -> u8 {
    match addr {
      // Cartridge ROM
      0x0000..=0x7fff => self.cart.rb(addr),
      // VRAM
      0x8000..=0x9fff => {
        self.vram[self.vram_bank * VRAM_BANK_SIZE + (addr & 0x1fff) as usize]
      }
      // Cartridge RAM
      0xa000..=0xbfff => self.cart.rb(addr),
      // WRAM bank 0
      0xc000..=0xcfff => self.wram[(addr & 0x0fff) as usize],
      // WRAM bank 1-7
      0xd000..=0xdfff => {
        self.wram[self.wram_bank * WRAM_BANK_SIZE + (addr & 0x0fff) as usize]
      }
      // Echo
      0xe000..=0xfdff => 0xff,
      // OAM
      0xfe00..=0xfe9f => self.oam[(addr - 0xfe00) as usize],
      // Unusable
      0xfea0..=0xfeff => 0xff,
      // I/O
      0xff00..=0xff7f => self.read_io(addr),
      // HRAM
      0xff80..=0xfffe => self.hram[(addr & 0x7f) as usize],
      0xffff => self.interrupts.rb(addr),
    }
  }

  fn read_io(&self, addr: u16) -> u8 {
    match addr {
      P1 => self.key.rb(),
      SC => self.io[0x02] | 0x7e,
      timer::DIV..=timer::TAC => self.timer.rb(addr),
      IF => self.interrupts.rb(addr),
      KEY1 if self.cgb => {
        (u8::from(self.double_speed) << 7) | u8::from(self.speed_armed) | 0x7e
      }
      VBK if self.cgb => 0xfe | self.vram_bank as u8,
      SVBK if self.cgb => 0xf8 | self.wram_bank as u8,
      HDMA5 if self.cgb => self.io[0x55],
      BCPS if self.cgb => self.bg_palette.rb_index(),
      BCPD if self.cgb => self.bg_palette.rb_data(),
      OCPS if self.cgb => self.obj_palette.rb_index(),
      OCPD if self.cgb => self.obj_palette.rb_data(),
      // Write-only
      HDMA1..=HDMA4 => 0xff,
      KEY1 | VBK | SVBK | HDMA5 | BCPS | BCPD | OCPS | OCPD => 0xff,
      _ => self.io[(addr & 0x7f) as usize],
    }
  }

  /// Read a 2-byte little-endian word from `addr`.
  pub fn rw(&self, addr: u16) -> u16 {
    let a = u16::from(self.rb(addr));
    let b = u16::from(self.rb(addr.wrapping_add(1)));
    (b << 8) | a
  }

  /// Write `value` at address `addr`.
  pub fn wb(&mut self, addr: u16, value: u8) {
    match addr {
      // Cartridge ROM: bank control
      0x0000..=0x7fff => self.cart.wb_rom(addr, value),
      // VRAM
      0x8000..=0x9fff => {
        let idx = self.vram_bank * VRAM_BANK_SIZE + (addr & 0x1fff) as usize;
        self.vram[idx] = value;
      }
      // Cartridge RAM
      0xa000..=0xbfff => self.cart.wb_ram(addr, value),
      // WRAM bank 0
      0xc000..=0xcfff => self.wram[(addr & 0x0fff) as usize] = value,
      // WRAM bank 1-7
      0xd000..=0xdfff => {
        let idx = self.wram_bank * WRAM_BANK_SIZE + (addr & 0x0fff) as usize;
        self.wram[idx] = value;
      }
      // Echo
      0xe000..=0xfdff => trace!("Echo write 0x{:04x} dropped", addr),
      // OAM
      0xfe00..=0xfe9f => self.oam[(addr - 0xfe00) as usize] = value,
      // Unusable
      0xfea0..=0xfeff => trace!("Unusable write 0x{:04x} dropped", addr),
      // I/O
      0xff00..=0xff7f => self.write_io(addr, value),
      // HRAM
      0xff80..=0xfffe => self.hram[(addr & 0x7f) as usize] = value,
      0xffff => self.interrupts.wb(addr, value),
    }
  }

  fn write_io(&mut self, addr: u16, value: u8) {
    match addr {
      P1 => self.key.wb(value),
      SC => {
        self.io[0x02] = value;
        if value & 0x81 == 0x81 {
          self.serial_transfer();
        }
      }
      timer::DIV..=timer::TAC => self.timer.wb(addr, value),
      IF => self.interrupts.wb(addr, value),
      STAT => self.io[0x41] = 0x80 | (value & 0x78) | (self.io[0x41] & 0x07),
      LY => self.io[0x44] = 0,
      DMA => {
        self.io[0x46] = value;
        self.dma(value);
      }
      KEY1 => {
        if self.cgb {
          self.speed_armed = value & 0x1 != 0;
        }
      }
      VBK => {
        if self.cgb && !self.hdma_active {
          self.vram_bank = (value & 0x1) as usize;
        }
      }
      HDMA5 if self.cgb => self.start_vram_dma(value),
      BCPS if self.cgb => self.bg_palette.wb_index(value),
      BCPD if self.cgb => self.bg_palette.wb_data(value),
      OCPS if self.cgb => self.obj_palette.wb_index(value),
      OCPD if self.cgb => self.obj_palette.wb_data(value),
      SVBK => {
        if self.cgb {
          self.wram_bank = match value & 0x7 {
            0 => 1,
            v => v as usize,
          };
        }
      }
      _ => self.io[(addr & 0x7f) as usize] = value,
    }
  }

  /// Write a 2-byte little-endian word to `addr`.
  pub fn ww(&mut self, addr: u16, value: u16) {
    self.wb(addr, (value & 0xff) as u8);
    self.wb(addr.wrapping_add(1), ((value >> 8) & 0xff) as u8);
  }

  /// Write an arbitrary number of bytes to memory.
  pub fn write(&mut self, addr: u16, values: &[u8]) {
    let mut cur = addr;
    for v in values {
      self.wb(cur, *v);
      cur = cur.wrapping_add(1);
    }
  }

  /// Store an I/O register without write side effects. For the video
  /// collaborator, which owns LY and the STAT mode bits.
  pub fn set_io(&mut self, addr: u16, value: u8) {
    if let 0xff00..=0xff7f = addr {
      self.io[(addr & 0x7f) as usize] = value;
    }
  }

  fn dma(&mut self, value: u8) {
    let src = u16::from(value) << 8;
    debug!("OAM DMA from 0x{:04x}", src);
    for i in 0..OAM_SIZE {
      self.oam[i] = self.rb(src.wrapping_add(i as u16));
    }
  }

  fn start_vram_dma(&mut self, value: u8) {
    if self.hdma_active && value & 0x80 == 0 {
      debug!("H-Blank DMA stopped, {} blocks left", (self.io[0x55] & 0x7f) + 1);
      self.hdma_active = false;
      self.io[0x55] |= 0x80;
      return;
    }

    if value & 0x80 == 0 {
      let blocks = u16::from(value & 0x7f) + 1;
      debug!("General DMA of {} blocks", blocks);
      self.vram_dma(blocks * 0x10);
      self.io[0x55] = 0xff;
    } else {
      debug!("H-Blank DMA of {} blocks", (value & 0x7f) + 1);
      self.hdma_active = true;
      self.io[0x55] = value & 0x7f;
    }
  }

  /// Copy the next block of an H-Blank VRAM DMA. The video collaborator
  /// calls this on entering H-Blank.
  pub fn hblank_dma(&mut self) {
    if !self.hdma_active {
      return;
    }
    self.vram_dma(0x10);
    match self.io[0x55] & 0x7f {
      0 => {
        self.hdma_active = false;
        self.io[0x55] = 0xff;
      }
      left => self.io[0x55] = left - 1,
    }
  }

  /// Copy `len` bytes from the HDMA1/2 source to the HDMA3/4 VRAM
  /// destination, leaving both registers pointing past the block.
  fn vram_dma(&mut self, len: u16) {
    let mut src =
      ((u16::from(self.io[0x51]) << 8) | u16::from(self.io[0x52])) & 0xfff0;
    let mut dst =
      ((u16::from(self.io[0x53]) << 8) | u16::from(self.io[0x54])) & 0x1ff0;
    for _ in 0..len {
      let value = self.rb(src);
      self.wb(0x8000 | dst, value);
      src = src.wrapping_add(1);
      dst = (dst + 1) & 0x1fff;
    }
    self.io[0x51] = (src >> 8) as u8;
    self.io[0x52] = src as u8;
    self.io[0x53] = (dst >> 8) as u8;
    self.io[0x54] = dst as u8;
  }

  pub fn bg_palette(&self) -> &Palette {
    &self.bg_palette
  }

  pub fn obj_palette(&self) -> &Palette {
    &self.obj_palette
  }

  fn serial_transfer(&mut self) {
    let byte = self.io[0x01];
    debug!("Serial: 0x{:02x} {:?}", byte, byte as char);
    self.serial.push(byte);
    // No link partner: the incoming bits are all ones.
    self.io[0x01] = 0xff;
    self.io[0x02] &= 0x7f;
    self.interrupts.request(Interrupt::Serial);
  }

  /// Bytes shifted out over the serial port so far.
  pub fn serial_output(&self) -> &[u8] {
    &self.serial
  }

  /// Advance the timer by `t` clocks, raising the timer interrupt on
  /// overflow.
  pub fn step(&mut self, t: u32) {
    if self.timer.tick(t) {
      self.interrupts.request(Interrupt::Timer);
    }
  }

  pub fn double_speed(&self) -> bool {
    self.double_speed
  }

  /// Perform an armed speed switch. Returns true if the speed changed.
  pub fn speed_switch(&mut self) -> bool {
    if !(self.cgb && self.speed_armed) {
      return false;
    }
    self.speed_armed = false;
    self.double_speed = !self.double_speed;
    self.timer.reset_div();
    debug!("Speed switch, double speed = {}", self.double_speed);
    true
  }

  pub fn key_down(&mut self, key: Key) {
    if self.key.key_down(key) {
      self.interrupts.request(Interrupt::Joypad);
    }
  }

  pub fn key_up(&mut self, key: Key) {
    self.key.key_up(key);
  }
}

#[cfg(test)]
pub(crate) fn test_memory(cgb: bool) -> Memory {
  let cart = Cartridge::new(mbc::test_rom(0x00, 2, 0)).unwrap();
  let mut mem = Memory::new(cart, cgb);
  mem.interrupts.flags = 0;
  mem
}
