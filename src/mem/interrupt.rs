//! Interrupt request (IF) and enable (IE) registers.
//!
//! Dispatch itself needs the stack and IME, so it lives on the CPU
//! (`CPU::handle_interrupts`); this side only tracks which sources are
//! pending and picks the one to service.

pub const IF: u16 = 0xff0f;
pub const IE: u16 = 0xffff;

/// Interrupt sources in priority order.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Interrupt {
  VBlank,
  LcdStat,
  Timer,
  Serial,
  Joypad,
}

impl Interrupt {
  pub const ALL: [Interrupt; 5] = [
    Interrupt::VBlank,
    Interrupt::LcdStat,
    Interrupt::Timer,
    Interrupt::Serial,
    Interrupt::Joypad,
  ];

  pub fn bit(self) -> u8 {
    1 << (self as u8)
  }

  /// Service routine address.
  pub fn vector(self) -> u16 {
    0x40 + 8 * (self as u16)
  }
}

#[derive(Debug, Default)]
pub struct Interrupts {
  pub enable: u8,
  pub flags: u8,
}

impl Interrupts {
  pub fn new() -> Interrupts {
    Interrupts::default()
  }

  pub fn request(&mut self, source: Interrupt) {
    self.flags |= source.bit();
  }

  /// Request every source whose bit is set in `mask`.
  pub fn request_mask(&mut self, mask: u8) {
    self.flags |= mask & 0x1f;
  }

  /// Sources both requested and enabled.
  pub fn pending(&self) -> u8 {
    self.flags & self.enable & 0x1f
  }

  /// Highest priority pending source.
  pub fn next(&self) -> Option<Interrupt> {
    let pending = self.pending();
    Interrupt::ALL
      .iter()
      .copied()
      .find(|source| pending & source.bit() != 0)
  }

  pub fn acknowledge(&mut self, source: Interrupt) {
    self.flags &= !source.bit();
  }

  pub fn rb(&self, addr: u16) -> u8 {
    match addr {
      IF => self.flags | 0xe0,
      IE => self.enable,
      _ => 0xff,
    }
  }

  pub fn wb(&mut self, addr: u16, value: u8) {
    match addr {
      IF => self.flags = value & 0x1f,
      IE => self.enable = value,
      _ => (),
    }
  }
}
