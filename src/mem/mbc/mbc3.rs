use crate::mem::mbc::{ram_index, rom_byte, MBC};

/// MBC3. Clock registers can be selected, written and latched, but they
/// never advance on their own.
#[derive(Debug)]
pub struct MBC3 {
  rom: Vec<u8>,
  ram: Vec<u8>,

  rom_bank: u8,
  /// 0x00-0x03 select a RAM bank, 0x08-0x0c a clock register.
  select: u8,
  ram_on: bool,

  rtc: [u8; 5],
  latched: [u8; 5],
  latch_armed: bool,
}

impl MBC3 {
  pub fn new(rom: Vec<u8>, ram_size: usize) -> Self {
    Self {
      rom,
      ram: vec![0; ram_size],

      rom_bank: 1,
      select: 0,
      ram_on: false,

      rtc: [0; 5],
      latched: [0; 5],
      latch_armed: false,
    }
  }
}

impl MBC for MBC3 {
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
        match self.select {
          0x00..=0x03 => {
            match ram_index(&self.ram, self.select as usize, addr) {
              Some(idx) => self.ram[idx],
              None => 0xff,
            }
          }
          0x08..=0x0c => self.latched[(self.select - 0x08) as usize],
          _ => 0xff,
        }
      }
      _ => 0xff,
    }
  }

  fn wb_rom(&mut self, addr: u16, value: u8) {
    match addr >> 12 {
      0x0..=0x1 => self.ram_on = (value & 0x0f) == 0x0a,
      0x2..=0x3 => {
        self.rom_bank = match value & 0x7f {
          0 => 1,
          v => v,
        };
        trace!("MBC3 ROM bank -> {}", self.rom_bank);
      }
      0x4..=0x5 => self.select = value & 0x0f,
      0x6..=0x7 => {
        if self.latch_armed && value == 0x01 {
          self.latched = self.rtc;
        }
        self.latch_armed = value == 0x00;
      }
      _ => (),
    }
  }

  fn wb_ram(&mut self, addr: u16, value: u8) {
    if !self.ram_on {
      return;
    }
    match self.select {
      0x00..=0x03 => {
        if let Some(idx) = ram_index(&self.ram, self.select as usize, addr) {
          self.ram[idx] = value;
        }
      }
      0x08..=0x0c => self.rtc[(self.select - 0x08) as usize] = value,
      _ => (),
    }
  }

  fn ram(&self) -> &[u8] {
    &self.ram
  }

  fn ram_mut(&mut self) -> &mut [u8] {
    &mut self.ram
  }
}
