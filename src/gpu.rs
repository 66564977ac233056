//! Video timing.
//!
//! Pixel output is not part of the core. The scheduler only needs something
//! that consumes clocks, keeps LY and STAT moving and raises the V-Blank and
//! STAT interrupts; `LcdTiming` does exactly that and nothing more.

use crate::mem::{Interrupt, Memory, LCDC, LY, LYC, STAT};

pub const HEIGHT: u8 = 144;
pub const WIDTH: u8 = 160;

/// Clocks per scanline.
pub const LINE_CYCLES: u32 = 456;
/// Scanlines per frame, V-Blank included.
pub const LINES: u8 = 154;

const OAM_SCAN_END: u32 = 80;
const TRANSFER_END: u32 = 252;

pub trait Gpu {
  /// Advance by `cycles` single-speed clocks.
  /// Return the interrupts to request, as IF bits.
  fn step(&mut self, cycles: u32, mem: &mut Memory) -> u8;
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Mode {
  HBlank = 0,
  VBlank = 1,
  OamScan = 2,
  Transfer = 3,
}

impl Mode {
  /// STAT bit that enables an interrupt on entering this mode.
  fn stat_enable(self) -> u8 {
    match self {
      Mode::HBlank => 0x08,
      Mode::VBlank => 0x10,
      Mode::OamScan => 0x20,
      Mode::Transfer => 0,
    }
  }
}

/// Scanline state machine without a renderer.
#[derive(Debug)]
pub struct LcdTiming {
  /// Clocks into the current line.
  clock: u32,
  line: u8,
  mode: Mode,
  frames: u64,
}

impl LcdTiming {
  pub fn new() -> LcdTiming {
    LcdTiming {
      clock: 0,
      line: 0,
      mode: Mode::OamScan,
      frames: 0,
    }
  }

  pub fn line(&self) -> u8 {
    self.line
  }

  pub fn mode(&self) -> Mode {
    self.mode
  }

  /// V-Blank periods entered so far.
  pub fn frames(&self) -> u64 {
    self.frames
  }

  fn current_mode(&self) -> Mode {
    if self.line >= HEIGHT {
      Mode::VBlank
    } else if self.clock < OAM_SCAN_END {
      Mode::OamScan
    } else if self.clock < TRANSFER_END {
      Mode::Transfer
    } else {
      Mode::HBlank
    }
  }

  /// Clock at which the mode can next change.
  fn next_boundary(&self) -> u32 {
    match self.current_mode() {
      Mode::OamScan => OAM_SCAN_END,
      Mode::Transfer => TRANSFER_END,
      Mode::HBlank | Mode::VBlank => LINE_CYCLES,
    }
  }

  fn stat(mem: &Memory) -> u8 {
    mem.rb(STAT)
  }

  fn update_mode(&mut self, mem: &mut Memory) -> u8 {
    let mode = self.current_mode();
    if mode == self.mode {
      return 0;
    }
    self.mode = mode;
    if mode == Mode::HBlank {
      mem.hblank_dma();
    }
    let stat = Self::stat(mem);
    mem.set_io(STAT, (stat & !0x03) | mode as u8);
    if stat & mode.stat_enable() != 0 {
      Interrupt::LcdStat.bit()
    } else {
      0
    }
  }

  fn update_ly(&mut self, mem: &mut Memory) -> u8 {
    mem.set_io(LY, self.line);
    let stat = Self::stat(mem);
    let coincidence = self.line == mem.rb(LYC);
    let stat = if coincidence { stat | 0x04 } else { stat & !0x04 };
    mem.set_io(STAT, stat);
    if coincidence && stat & 0x40 != 0 {
      Interrupt::LcdStat.bit()
    } else {
      0
    }
  }

  /// LCD switched off: LY parks at 0 in H-Blank.
  fn off(&mut self, mem: &mut Memory) {
    if self.line != 0 || self.clock != 0 || self.mode != Mode::HBlank {
      debug!("LCD off at line {}", self.line);
    }
    self.clock = 0;
    self.line = 0;
    self.mode = Mode::HBlank;
    mem.set_io(LY, 0);
    let stat = Self::stat(mem);
    mem.set_io(STAT, stat & !0x03);
  }
}

impl Default for LcdTiming {
  fn default() -> LcdTiming {
    LcdTiming::new()
  }
}

impl Gpu for LcdTiming {
  fn step(&mut self, cycles: u32, mem: &mut Memory) -> u8 {
    if mem.rb(LCDC) & 0x80 == 0 {
      self.off(mem);
      return 0;
    }

    let mut irq = 0;
    let mut remaining = cycles;
    while remaining > 0 {
      let n = remaining.min(self.next_boundary() - self.clock);
      self.clock += n;
      remaining -= n;

      if self.clock == LINE_CYCLES {
        self.clock = 0;
        self.line = (self.line + 1) % LINES;
        if self.line == HEIGHT {
          self.frames += 1;
          irq |= Interrupt::VBlank.bit();
        }
        irq |= self.update_ly(mem);
      }
      irq |= self.update_mode(mem);
    }
    irq
  }
}
