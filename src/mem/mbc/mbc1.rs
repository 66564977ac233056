use crate::mem::mbc::{ram_index, rom_byte, MBC};

#[derive(Debug)]
pub struct MBC1 {
  rom: Vec<u8>,
  ram: Vec<u8>,

  /// 5-bit low ROM bank register, never 0.
  bank1: u8,
  /// 2-bit register shared between upper ROM bank bits and the RAM bank.
  bank2: u8,
  ram_on: bool,
  mode: Mode,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum Mode {
  ROM,
  RAM,
}

impl MBC1 {
  pub fn new(rom: Vec<u8>, ram: Vec<u8>) -> Self {
    Self {
      rom,
      ram,

      bank1: 1,
      bank2: 0,
      ram_on: false,
      mode: Mode::ROM,
    }
  }

  fn rom_bank(&self) -> usize {
    ((self.bank2 as usize) << 5) | self.bank1 as usize
  }

  fn zero_bank(&self) -> usize {
    match self.mode {
      Mode::ROM => 0,
      Mode::RAM => (self.bank2 as usize) << 5,
    }
  }

  fn ram_bank(&self) -> usize {
    match self.mode {
      Mode::ROM => 0,
      Mode::RAM => self.bank2 as usize,
    }
  }
}

impl MBC for MBC1 {
  fn rb(&self, addr: u16) -> u8 {
    match addr >> 12 {
      0x0..=0x3 => rom_byte(&self.rom, self.zero_bank(), addr as usize),
      0x4..=0x7 => {
        rom_byte(&self.rom, self.rom_bank(), (addr & 0x3fff) as usize)
      }
      0xa..=0xb => {
        if !self.ram_on {
          return 0xff;
        }
        match ram_index(&self.ram, self.ram_bank(), addr) {
          Some(idx) => self.ram[idx],
          None => 0xff,
        }
      }
      _ => 0xff,
    }
  }

  fn wb_rom(&mut self, addr: u16, value: u8) {
    match addr >> 12 {
      0x0..=0x1 => self.ram_on = (value & 0x0f) == 0x0a,
      0x2..=0x3 => {
        self.bank1 = match value & 0x1f {
          0 => 1,
          v => v,
        };
        trace!("MBC1 ROM bank -> {}", self.rom_bank());
      }
      0x4..=0x5 => self.bank2 = value & 0x03,
      0x6..=0x7 => {
        self.mode = if value & 0x1 == 0x0 {
          Mode::ROM
        } else {
          Mode::RAM
        };
      }
      _ => (),
    }
  }

  fn wb_ram(&mut self, addr: u16, value: u8) {
    if !self.ram_on {
      return;
    }
    if let Some(idx) = ram_index(&self.ram, self.ram_bank(), addr) {
      self.ram[idx] = value;
    }
  }

  fn ram(&self) -> &[u8] {
    &self.ram
  }

  fn ram_mut(&mut self) -> &mut [u8] {
    &mut self.ram
  }
}
