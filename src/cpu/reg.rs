use crate::cpu::{Flags, Registers};

pub const Z: u8 = 0x80;
pub const N: u8 = 0x40;
pub const H: u8 = 0x20;
pub const C: u8 = 0x10;

impl Registers {
  /// State left behind by the boot ROM.
  pub fn new(cgb: bool) -> Registers {
    let mut regs = Registers {
      a: 0x01,
      b: 0x00,
      c: 0x13,
      d: 0x00,
      e: 0xd8,
      h: 0x01,
      l: 0x4d,
      flags: Flags::default(),

      sp: 0xfffe,
      pc: 0x100,
    };
    if cgb {
      regs.set_af(0x1180);
      regs.set_bc(0x0000);
      regs.set_de(0xff56);
      regs.set_hl(0x000d);
    } else {
      regs.set_f(0xb0);
    }
    regs
  }

  pub fn f(&self) -> u8 {
    let mut f = 0;
    if self.flags.z {
      f |= Z;
    }
    if self.flags.n {
      f |= N;
    }
    if self.flags.h {
      f |= H;
    }
    if self.flags.c {
      f |= C;
    }
    f
  }

  /// Load F. The low nibble does not exist and is dropped.
  pub fn set_f(&mut self, f: u8) {
    self.flags = Flags {
      z: f & Z != 0,
      n: f & N != 0,
      h: f & H != 0,
      c: f & C != 0,
    };
  }

  pub fn af(&self) -> u16 {
    (u16::from(self.a) << 8) | u16::from(self.f())
  }
  pub fn bc(&self) -> u16 {
    (u16::from(self.b) << 8) | u16::from(self.c)
  }
  pub fn de(&self) -> u16 {
    (u16::from(self.d) << 8) | u16::from(self.e)
  }
  pub fn hl(&self) -> u16 {
    (u16::from(self.h) << 8) | u16::from(self.l)
  }

  pub fn set_af(&mut self, v: u16) {
    self.a = (v >> 8) as u8;
    self.set_f(v as u8);
  }
  pub fn set_bc(&mut self, v: u16) {
    self.b = (v >> 8) as u8;
    self.c = v as u8;
  }
  pub fn set_de(&mut self, v: u16) {
    self.d = (v >> 8) as u8;
    self.e = v as u8;
  }
  pub fn set_hl(&mut self, v: u16) {
    self.h = (v >> 8) as u8;
    self.l = v as u8;
  }

  pub fn hl_inc(&mut self) {
    let hl = self.hl().wrapping_add(1);
    self.set_hl(hl);
  }
  pub fn hl_dec(&mut self) {
    let hl = self.hl().wrapping_sub(1);
    self.set_hl(hl);
  }
}
