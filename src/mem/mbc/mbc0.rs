use crate::mem::mbc::{ram_index, MBC};

/// Fixed mapping: 32K of ROM, optional unbanked RAM.
#[derive(Debug)]
pub struct MBC0 {
  rom: Vec<u8>,
  ram: Vec<u8>,
}

impl MBC0 {
  pub fn new(rom: Vec<u8>, ram_size: usize) -> Self {
    Self {
      rom,
      ram: vec![0; ram_size],
    }
  }
}

impl MBC for MBC0 {
  fn rb(&self, addr: u16) -> u8 {
    match addr >> 12 {
      0x0..=0x7 => self.rom.get(addr as usize).copied().unwrap_or(0xff),
      0xa..=0xb => match ram_index(&self.ram, 0, addr) {
        Some(idx) => self.ram[idx],
        None => 0xff,
      },
      _ => 0xff,
    }
  }

  fn wb_rom(&mut self, _addr: u16, _value: u8) {}

  fn wb_ram(&mut self, addr: u16, value: u8) {
    if let Some(idx) = ram_index(&self.ram, 0, addr) {
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
