mod mbc0;
mod mbc1;
mod mbc3;
mod mbc5;

pub use self::mbc0::MBC0;
pub use self::mbc1::MBC1;
pub use self::mbc3::MBC3;
pub use self::mbc5::MBC5;

use crate::error::{Error, Result};

pub const ROM_BANK_SIZE: usize = 0x4000;
pub const RAM_BANK_SIZE: usize = 0x2000;

const HEADER_END: usize = 0x150;

/// Cartridge banking controller.
///
/// `rb` serves both the ROM window (0x0000-0x7fff) and the external RAM
/// window (0xa000-0xbfff). Writes to the ROM window are control register
/// writes, never data.
pub trait MBC {
  fn rb(&self, addr: u16) -> u8;
  fn wb_rom(&mut self, addr: u16, value: u8);
  fn wb_ram(&mut self, addr: u16, value: u8);

  /// External RAM contents, all banks.
  fn ram(&self) -> &[u8];
  fn ram_mut(&mut self) -> &mut [u8];
}

/// Read `rom[bank * ROM_BANK_SIZE + offset]`, wrapping `bank` to the banks
/// present in the image.
pub(crate) fn rom_byte(rom: &[u8], bank: usize, offset: usize) -> u8 {
  let banks = (rom.len() / ROM_BANK_SIZE).max(1);
  let idx = (bank % banks) * ROM_BANK_SIZE + offset;
  rom.get(idx).copied().unwrap_or(0xff)
}

/// Index into external RAM for `bank`, or None when no RAM is fitted.
pub(crate) fn ram_index(ram: &[u8], bank: usize, addr: u16) -> Option<usize> {
  if ram.is_empty() {
    return None;
  }
  let banks = (ram.len() / RAM_BANK_SIZE).max(1);
  let idx = (bank % banks) * RAM_BANK_SIZE + (addr & 0x1fff) as usize;
  if idx < ram.len() {
    Some(idx)
  } else {
    None
  }
}

#[derive(Debug)]
pub enum Controller {
  MBC0(MBC0),
  MBC1(MBC1),
  MBC3(MBC3),
  MBC5(MBC5),
}

macro_rules! dispatch {
  ($self:expr, $m:ident => $e:expr) => {
    match $self {
      Controller::MBC0($m) => $e,
      Controller::MBC1($m) => $e,
      Controller::MBC3($m) => $e,
      Controller::MBC5($m) => $e,
    }
  };
}

impl MBC for Controller {
  fn rb(&self, addr: u16) -> u8 {
    dispatch!(self, m => m.rb(addr))
  }

  fn wb_rom(&mut self, addr: u16, value: u8) {
    dispatch!(self, m => m.wb_rom(addr, value))
  }

  fn wb_ram(&mut self, addr: u16, value: u8) {
    dispatch!(self, m => m.wb_ram(addr, value))
  }

  fn ram(&self) -> &[u8] {
    dispatch!(self, m => m.ram())
  }

  fn ram_mut(&mut self) -> &mut [u8] {
    dispatch!(self, m => m.ram_mut())
  }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum CgbSupport {
  None,
  Dual,
  Only,
}

/// A loaded cartridge: header facts plus the banking controller chosen
/// from the type byte.
#[derive(Debug)]
pub struct Cartridge {
  title: String,
  type_byte: u8,
  cgb: CgbSupport,
  battery: bool,
  controller: Controller,
}

impl Cartridge {
  pub fn new(rom: Vec<u8>) -> Result<Cartridge> {
    if rom.len() < HEADER_END {
      return Err(Error::MalformedRom {
        reason: format!(
          "image is {} bytes, header needs at least {}",
          rom.len(),
          HEADER_END
        ),
      });
    }

    let title = rom[0x134..0x143]
      .iter()
      .take_while(|&&b| b != 0)
      .map(|&b| b as char)
      .collect::<String>()
      .trim()
      .to_string();
    let cgb = match rom[0x143] {
      0x80 => CgbSupport::Dual,
      0xc0 => CgbSupport::Only,
      _ => CgbSupport::None,
    };
    let type_byte = rom[0x147];
    let ram_size = match rom[0x149] {
      0 => 0,
      1 => 0x800,
      2 => 0x2000,
      3 => 0x8000,
      4 => 0x20000,
      5 => 0x10000,
      code => {
        warn!("Unknown RAM size code 0x{:02x}, assuming no RAM", code);
        0
      }
    };
    let battery = matches!(
      type_byte,
      0x03 | 0x09 | 0x0f | 0x10 | 0x13 | 0x1b | 0x1e
    );

    let controller = match type_byte {
      0x00 | 0x08 | 0x09 => Controller::MBC0(MBC0::new(rom, ram_size)),
      0x01..=0x03 => Controller::MBC1(MBC1::new(rom, vec![0; ram_size])),
      0x0f..=0x13 => Controller::MBC3(MBC3::new(rom, ram_size)),
      0x19..=0x1e => Controller::MBC5(MBC5::new(rom, ram_size)),
      _ => return Err(Error::UnsupportedCartridgeType { type_byte }),
    };

    info!(
      "Cartridge {:?}: type=0x{:02x} ram={} battery={} cgb={:?}",
      title, type_byte, ram_size, battery, cgb
    );

    Ok(Cartridge {
      title,
      type_byte,
      cgb,
      battery,
      controller,
    })
  }

  pub fn title(&self) -> &str {
    &self.title
  }

  pub fn type_byte(&self) -> u8 {
    self.type_byte
  }

  pub fn cgb(&self) -> CgbSupport {
    self.cgb
  }

  pub fn has_battery(&self) -> bool {
    self.battery
  }

  /// Copy saved external RAM in. Extra bytes are dropped, missing ones
  /// keep their current value.
  pub fn load_ram(&mut self, data: &[u8]) {
    let ram = self.controller.ram_mut();
    let n = ram.len().min(data.len());
    ram[..n].copy_from_slice(&data[..n]);
  }
}

impl MBC for Cartridge {
  fn rb(&self, addr: u16) -> u8 {
    self.controller.rb(addr)
  }

  fn wb_rom(&mut self, addr: u16, value: u8) {
    self.controller.wb_rom(addr, value)
  }

  fn wb_ram(&mut self, addr: u16, value: u8) {
    self.controller.wb_ram(addr, value)
  }

  fn ram(&self) -> &[u8] {
    self.controller.ram()
  }

  fn ram_mut(&mut self) -> &mut [u8] {
    self.controller.ram_mut()
  }
}

#[cfg(test)]
pub(crate) fn test_rom(type_byte: u8, banks: usize, ram_code: u8) -> Vec<u8> {
  let mut rom = vec![0; banks * ROM_BANK_SIZE];
  rom[0x134..0x138].copy_from_slice(b"TEST");
  rom[0x147] = type_byte;
  rom[0x149] = ram_code;
  // Tag every bank with its own index.
  for bank in 0..banks {
    rom[bank * ROM_BANK_SIZE + 0x200] = bank as u8;
  }
  rom
}
