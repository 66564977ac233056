mod cpu;
mod reg;

pub use self::reg::{C, H, N, Z};

#[cfg(test)]
mod optest;

pub struct CPU {
  pub regs: Registers,

  /// Interrupt master enable.
  pub ime: bool,
  /// EI/RETI ran: IME turns on once the following instruction completes.
  ei_pending: bool,

  halt: bool,
  /// HALT was skipped with an interrupt pending and IME clear: the next
  /// fetch does not advance PC.
  halt_bug: bool,
}

/// Decoded view of the top nibble of F. F itself is never stored.
#[derive(Debug, Default, Copy, Clone, Eq, PartialEq)]
pub struct Flags {
  /// Zero
  pub z: bool,
  /// Subtract
  pub n: bool,
  /// Half carry
  pub h: bool,
  /// Carry
  pub c: bool,
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Registers {
  /// General-purpose registers.
  pub a: u8,
  pub b: u8,
  pub c: u8,
  pub d: u8,
  pub e: u8,
  pub h: u8,
  pub l: u8,

  pub flags: Flags,

  /// Program counter.
  pub pc: u16,

  /// Stack pointer.
  pub sp: u16,
}
