use crate::mem::mbc::{ram_index, rom_byte, MBC};

#[derive(Debug)]
pub struct MBC5 {
  rom: Vec<u8>,
  ram: Vec<u8>,

  /// 9-bit ROM bank. Bank 0 can be mapped at 0x4000.
  rom_bank: u16,
  ram_bank: u8,
  ram_on: bool,
}

impl MBC5 {
  pub fn new(rom: Vec<u8>, ram_size: usize) -> Self {
    Self {
      rom,
      ram: vec![0; ram_size],

      rom_bank: 1,
      ram_bank: 0,
      ram_on: false,
    }
  }
}

impl MBC for MBC5 {
  fn rb(&self, addr: u16) -> u8 {
    match addr >> 12 {
      0x0..=0x3 => rom_byte(&self.rom, 0, addr as usize),
      0x4..=0x7 => rom_byte(
        &self.rom,
        self.rom_bank as usize,
        (addr & 0x3fff) as usize,
      ),
      0xa..=0xb => {
        if !self.ram_on {
          return 0xff;
        }
        match ram_index(&self.ram, self.ram_bank as usize, addr) {
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
      0x2 => self.rom_bank = (self.rom_bank & 0x100) | u16::from(value),
      0x3 => {
        self.rom_bank = (self.rom_bank & 0xff) | (u16::from(value & 1) << 8)
      }
      0x4..=0x5 => self.ram_bank = value & 0x0f,
      _ => (),
    }
  }

  fn wb_ram(&mut self, addr: u16, value: u8) {
    if !self.ram_on {
      return;
    }
    if let Some(idx) = ram_index(&self.ram, self.ram_bank as usize, addr) {
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
