pub const DIV: u16 = 0xff04;
pub const TIMA: u16 = 0xff05;
pub const TMA: u16 = 0xff06;
pub const TAC: u16 = 0xff07;

#[derive(Debug, Default)]
struct Clock {
  /// Free-running divider, advanced every cycle. DIV is the top byte.
  div: u16,
  /// Cycles accumulated towards the next TIMA increment.
  main: u32,
}

#[derive(Debug, Default)]
pub struct Registers {
  pub tima: u8,
  pub tma: u8,
  pub tac: u8,
}

#[derive(Debug, Default)]
pub struct Timer {
  pub reg: Registers,
  clock: Clock,
}

impl Timer {
  pub fn new() -> Timer {
    Timer::default()
  }

  fn enabled(&self) -> bool {
    self.reg.tac & 0x4 != 0
  }

  /// Cycles per TIMA increment for the current frequency select.
  fn threshold(&self) -> u32 {
    match self.reg.tac & 3 {
      0 => 1024,
      1 => 16,
      2 => 64,
      _ => 256,
    }
  }

  /// Advance by `cycles` clocks.
  /// Returns true if TIMA overflowed at least once.
  pub fn tick(&mut self, cycles: u32) -> bool {
    self.clock.div = self.clock.div.wrapping_add(cycles as u16);
    if !self.enabled() {
      return false;
    }

    let mut overflow = false;
    let threshold = self.threshold();
    self.clock.main += cycles;
    while self.clock.main >= threshold {
      self.clock.main -= threshold;
      overflow |= self.step();
    }
    overflow
  }

  /// Increment TIMA. Return true on overflow.
  fn step(&mut self) -> bool {
    match self.reg.tima.checked_add(1) {
      Some(v) => {
        self.reg.tima = v;
        false
      }
      None => {
        self.reg.tima = self.reg.tma;
        true
      }
    }
  }

  pub fn rb(&self, addr: u16) -> u8 {
    match addr {
      DIV => (self.clock.div >> 8) as u8,
      TIMA => self.reg.tima,
      TMA => self.reg.tma,
      TAC => self.reg.tac | 0xf8,
      _ => 0xff,
    }
  }

  pub fn wb(&mut self, addr: u16, value: u8) {
    match addr {
      DIV => self.reset_div(),
      TIMA => self.reg.tima = value,
      TMA => self.reg.tma = value,
      TAC => {
        let old = self.reg.tac & 3;
        self.reg.tac = value & 0x7;
        if old != value & 3 {
          self.clock.main = 0;
        }
      }
      _ => (),
    }
  }

  /// Writing DIV (any value) clears the divider and the TIMA accumulator.
  pub fn reset_div(&mut self) {
    self.clock.div = 0;
    self.clock.main = 0;
  }
}
