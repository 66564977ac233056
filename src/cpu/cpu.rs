use crate::cpu::{Flags, Registers, CPU};
use crate::error::{Error, Result};
use crate::mem::Memory;

/// M-cycles spent pushing PC and jumping to a service routine.
const DISPATCH_CYCLES: u32 = 5;

impl CPU {
  pub fn new(cgb: bool) -> CPU {
    CPU {
      regs: Registers::new(cgb),
      ime: false,
      ei_pending: false,
      halt: false,
      halt_bug: false,
    }
  }

  pub fn halted(&self) -> bool {
    self.halt
  }

  /// Run one instruction.
  /// Return the clocks (T-cycles) it took.
  pub fn step(&mut self, mem: &mut Memory) -> Result<u32> {
    let enable_ime = self.ei_pending;
    let m = self.exec(mem)?;
    // DI in the delay slot clears the pending enable.
    if enable_ime && self.ei_pending {
      self.ei_pending = false;
      self.ime = true;
    }
    Ok(4 * m)
  }

  /// Service the highest priority pending interrupt.
  ///
  /// Any pending interrupt ends HALT, even with IME clear. Returns the
  /// clocks spent when a service routine was entered.
  pub fn handle_interrupts(&mut self, mem: &mut Memory) -> Option<u32> {
    let source = mem.interrupts.next()?;
    self.halt = false;
    if !self.ime {
      return None;
    }

    mem.interrupts.acknowledge(source);
    self.ime = false;
    let pc = self.regs.pc;
    self.push_word(mem, pc);
    self.regs.pc = source.vector();
    trace!("Interrupt {:?} from 0x{:04x}", source, pc);
    Some(4 * DISPATCH_CYCLES)
  }

  fn bump(&mut self, mem: &Memory) -> u8 {
    let result = mem.rb(self.regs.pc);
    if self.halt_bug {
      self.halt_bug = false;
    } else {
      self.regs.pc = self.regs.pc.wrapping_add(1);
    }
    result
  }

  fn push_word(&mut self, mem: &mut Memory, value: u16) {
    let sp = self.regs.sp.wrapping_sub(1);
    mem.wb(sp, (value >> 8) as u8);
    let sp = sp.wrapping_sub(1);
    mem.wb(sp, value as u8);
    self.regs.sp = sp;
  }

  fn pop_word(&mut self, mem: &Memory) -> u16 {
    let lo = mem.rb(self.regs.sp);
    let hi = mem.rb(self.regs.sp.wrapping_add(1));
    self.regs.sp = self.regs.sp.wrapping_add(2);
    (u16::from(hi) << 8) | u16::from(lo)
  }

  /// Operand by its 3-bit encoding: B C D E H L (HL) A.
  fn r8(&self, mem: &Memory, idx: u8) -> u8 {
    match idx {
      0 => self.regs.b,
      1 => self.regs.c,
      2 => self.regs.d,
      3 => self.regs.e,
      4 => self.regs.h,
      5 => self.regs.l,
      6 => mem.rb(self.regs.hl()),
      _ => self.regs.a,
    }
  }

  fn set_r8(&mut self, mem: &mut Memory, idx: u8, value: u8) {
    match idx {
      0 => self.regs.b = value,
      1 => self.regs.c = value,
      2 => self.regs.d = value,
      3 => self.regs.e = value,
      4 => self.regs.h = value,
      5 => self.regs.l = value,
      6 => mem.wb(self.regs.hl(), value),
      _ => self.regs.a = value,
    }
  }

  /// Execute the next opcode.
  /// Return the m-time taken to run that opcode.
  fn exec(&mut self, mem: &mut Memory) -> Result<u32> {
    let pc = self.regs.pc;
    let opcode = self.bump(mem);
    trace!("0x{:04x}: 0x{:02x}", pc, opcode);

    macro_rules! bump {
      () => {
        self.bump(mem)
      };
    }
    macro_rules! xx {
      () => {{
        self.regs.pc = pc;
        return Err(Error::UnimplementedOpcode { opcode, pc });
      }};
    }
    macro_rules! flags {
      ($z:expr, $n:expr, $h:expr, $c:expr) => {
        self.regs.flags = Flags {
          z: $z,
          n: $n,
          h: $h,
          c: $c,
        }
      };
    }

    macro_rules! read_u16_le {
      () => {{
        let a = bump!();
        let b = bump!();
        u16::from(a) | (u16::from(b) << 8)
      }};
    }
    macro_rules! ld_nn_n {
      ($reg:ident) => {{
        self.regs.$reg = bump!();
        2
      }};
    }
    macro_rules! ld_n_nn {
      ($set:ident) => {{
        let nn = read_u16_le!();
        self.regs.$set(nn);
        3
      }};
    }
    macro_rules! ld_r1_r2 {
      ($r1:ident, $r2:ident) => {{
        self.regs.$r1 = self.regs.$r2;
        1
      }};
    }
    macro_rules! ld_r1_r2m {
      ($r1:ident, $r2m:ident) => {{
        self.regs.$r1 = mem.rb(self.regs.$r2m());
        2
      }};
    }
    macro_rules! ld_r1m_r2 {
      ($r1m:ident, $r2:ident) => {{
        mem.wb(self.regs.$r1m(), self.regs.$r2);
        2
      }};
    }

    macro_rules! push {
      ($rr:ident) => {{
        let value = self.regs.$rr();
        self.push_word(mem, value);
        4
      }};
    }
    macro_rules! pop {
      ($set:ident) => {{
        let value = self.pop_word(mem);
        self.regs.$set(value);
        3
      }};
    }

    macro_rules! add_a_n {
      ($n:expr) => {{
        let a = self.regs.a;
        let n = $n;
        let result = a.wrapping_add(n);
        self.regs.a = result;
        flags!(
          result == 0,
          false,
          (a & 0xf) + (n & 0xf) > 0xf,
          u16::from(a) + u16::from(n) > 0xff
        );
        1
      }};
    }
    macro_rules! adc_a_n {
      ($n:expr) => {{
        let a = self.regs.a;
        let n = $n;
        let c = u8::from(self.regs.flags.c);
        let result = a.wrapping_add(n).wrapping_add(c);
        self.regs.a = result;
        flags!(
          result == 0,
          false,
          (a & 0xf) + (n & 0xf) + c > 0xf,
          u16::from(a) + u16::from(n) + u16::from(c) > 0xff
        );
        1
      }};
    }

    macro_rules! sub_a_n {
      ($n:expr) => {{
        let a = self.regs.a;
        let n = $n;
        let result = a.wrapping_sub(n);
        self.regs.a = result;
        flags!(result == 0, true, (a & 0xf) < (n & 0xf), a < n);
        1
      }};
    }
    macro_rules! sbc_a_n {
      ($n:expr) => {{
        let a = self.regs.a;
        let n = $n;
        let c = u8::from(self.regs.flags.c);
        let result = a.wrapping_sub(n).wrapping_sub(c);
        self.regs.a = result;
        flags!(
          result == 0,
          true,
          (a & 0xf) < (n & 0xf) + c,
          u16::from(a) < u16::from(n) + u16::from(c)
        );
        1
      }};
    }

    macro_rules! and_a_n {
      ($n:expr) => {{
        self.regs.a &= $n;
        flags!(self.regs.a == 0, false, true, false);
        1
      }};
    }
    macro_rules! or_a_n {
      ($n:expr) => {{
        self.regs.a |= $n;
        flags!(self.regs.a == 0, false, false, false);
        1
      }};
    }
    macro_rules! xor_a_n {
      ($n:expr) => {{
        self.regs.a ^= $n;
        flags!(self.regs.a == 0, false, false, false);
        1
      }};
    }

    macro_rules! cp_a_n {
      ($n:expr) => {{
        let a = self.regs.a;
        let n = $n;
        flags!(a == n, true, (a & 0xf) < (n & 0xf), a < n);
        1
      }};
    }

    macro_rules! inc {
      ($n:expr) => {{
        let n = $n;
        let result = n.wrapping_add(1);
        $n = result;
        // Preserve C.
        let c = self.regs.flags.c;
        flags!(result == 0, false, n & 0xf == 0xf, c);
        1
      }};
    }
    macro_rules! dec {
      ($n:expr) => {{
        let n = $n;
        let result = n.wrapping_sub(1);
        $n = result;
        // Preserve C.
        let c = self.regs.flags.c;
        flags!(result == 0, true, n & 0xf == 0, c);
        1
      }};
    }

    macro_rules! inc_nn {
      ($get:ident, $set:ident) => {{
        let n = self.regs.$get().wrapping_add(1);
        self.regs.$set(n);
        2
      }};
    }
    macro_rules! dec_nn {
      ($get:ident, $set:ident) => {{
        let n = self.regs.$get().wrapping_sub(1);
        self.regs.$set(n);
        2
      }};
    }

    macro_rules! add_hl_n {
      ($n:expr) => {{
        let hl = self.regs.hl();
        let n = $n;
        let res = hl.wrapping_add(n);
        // Z is untouched.
        let z = self.regs.flags.z;
        flags!(
          z,
          false,
          (hl & 0xfff) + (n & 0xfff) > 0xfff,
          u32::from(hl) + u32::from(n) > 0xffff
        );
        self.regs.set_hl(res);
        2
      }};
    }

    // SP plus a signed immediate. Flags come from the low byte.
    macro_rules! sp_plus_r8 {
      () => {{
        let sp = self.regs.sp;
        let n = bump!() as i8 as u16;
        let res = sp.wrapping_add(n);
        let carries = sp ^ n ^ res;
        flags!(false, false, carries & 0x10 != 0, carries & 0x100 != 0);
        res
      }};
    }

    macro_rules! jp {
      () => {{
        self.regs.pc = read_u16_le!();
        4
      }};
    }
    macro_rules! jpc {
      ($e:expr) => {{
        let target = read_u16_le!();
        if $e {
          self.regs.pc = target;
          4
        } else {
          3
        }
      }};
    }

    macro_rules! jr {
      () => {{
        let n = bump!() as i8;
        self.regs.pc = self.regs.pc.wrapping_add(n as u16);
        3
      }};
    }
    macro_rules! jrc {
      ($e:expr) => {{
        let n = bump!() as i8;
        if $e {
          self.regs.pc = self.regs.pc.wrapping_add(n as u16);
          3
        } else {
          2
        }
      }};
    }

    macro_rules! call {
      () => {{
        let target = read_u16_le!();
        let retaddr = self.regs.pc;
        self.push_word(mem, retaddr);
        self.regs.pc = target;
        6
      }};
    }
    macro_rules! callc {
      ($e:expr) => {{
        let target = read_u16_le!();
        if $e {
          let retaddr = self.regs.pc;
          self.push_word(mem, retaddr);
          self.regs.pc = target;
          6
        } else {
          3
        }
      }};
    }

    macro_rules! rst {
      ($e:expr) => {{
        let retaddr = self.regs.pc;
        self.push_word(mem, retaddr);
        self.regs.pc = $e;
        4
      }};
    }

    macro_rules! ret {
      () => {{
        self.regs.pc = self.pop_word(mem);
        4
      }};
    }
    macro_rules! retc {
      ($e:expr) => {{
        if $e {
          self.regs.pc = self.pop_word(mem);
          5
        } else {
          2
        }
      }};
    }

    let m = match opcode {
      0x00 => 1, // nop
      0x01 => ld_n_nn!(set_bc),
      0x02 => ld_r1m_r2!(bc, a),
      0x03 => inc_nn!(bc, set_bc),
      0x04 => inc!(self.regs.b),
      0x05 => dec!(self.regs.b),
      0x06 => ld_nn_n!(b),
      0x07 => {
        let a = self.regs.a;
        self.regs.a = a.rotate_left(1);
        flags!(false, false, false, a & 0x80 != 0);
        1
      }
      0x08 => {
        let nn = read_u16_le!();
        mem.ww(nn, self.regs.sp);
        5
      }
      0x09 => add_hl_n!(self.regs.bc()),
      0x0a => ld_r1_r2m!(a, bc),
      0x0b => dec_nn!(bc, set_bc),
      0x0c => inc!(self.regs.c),
      0x0d => dec!(self.regs.c),
      0x0e => ld_nn_n!(c),
      0x0f => {
        let a = self.regs.a;
        self.regs.a = a.rotate_right(1);
        flags!(false, false, false, a & 0x01 != 0);
        1
      }

      0x10 => {
        // STOP is followed by a padding byte.
        bump!();
        if !mem.speed_switch() {
          self.halt = true;
        }
        1
      }
      0x11 => ld_n_nn!(set_de),
      0x12 => ld_r1m_r2!(de, a),
      0x13 => inc_nn!(de, set_de),
      0x14 => inc!(self.regs.d),
      0x15 => dec!(self.regs.d),
      0x16 => ld_nn_n!(d),
      0x17 => {
        let a = self.regs.a;
        let c = u8::from(self.regs.flags.c);
        self.regs.a = (a << 1) | c;
        flags!(false, false, false, a & 0x80 != 0);
        1
      }
      0x18 => jr!(),
      0x19 => add_hl_n!(self.regs.de()),
      0x1a => ld_r1_r2m!(a, de),
      0x1b => dec_nn!(de, set_de),
      0x1c => inc!(self.regs.e),
      0x1d => dec!(self.regs.e),
      0x1e => ld_nn_n!(e),
      0x1f => {
        let a = self.regs.a;
        let c = u8::from(self.regs.flags.c);
        self.regs.a = (a >> 1) | (c << 7);
        flags!(false, false, false, a & 0x01 != 0);
        1
      }

      0x20 => jrc!(!self.regs.flags.z),
      0x21 => ld_n_nn!(set_hl),
      0x22 => {
        mem.wb(self.regs.hl(), self.regs.a);
        self.regs.hl_inc();
        2
      }
      0x23 => inc_nn!(hl, set_hl),
      0x24 => inc!(self.regs.h),
      0x25 => dec!(self.regs.h),
      0x26 => ld_nn_n!(h),
      0x27 => {
        let mut a = self.regs.a;
        let Flags { n, h, mut c, .. } = self.regs.flags;
        if !n {
          if c || a > 0x99 {
            a = a.wrapping_add(0x60);
            c = true;
          }
          if h || a & 0x0f > 0x09 {
            a = a.wrapping_add(0x06);
          }
        } else {
          if c {
            a = a.wrapping_sub(0x60);
          }
          if h {
            a = a.wrapping_sub(0x06);
          }
        }
        self.regs.a = a;
        flags!(a == 0, n, false, c);
        1
      }
      0x28 => jrc!(self.regs.flags.z),
      0x29 => add_hl_n!(self.regs.hl()),
      0x2a => {
        self.regs.a = mem.rb(self.regs.hl());
        self.regs.hl_inc();
        2
      }
      0x2b => dec_nn!(hl, set_hl),
      0x2c => inc!(self.regs.l),
      0x2d => dec!(self.regs.l),
      0x2e => ld_nn_n!(l),
      0x2f => {
        self.regs.a = !self.regs.a;
        self.regs.flags.n = true;
        self.regs.flags.h = true;
        1
      }

      0x30 => jrc!(!self.regs.flags.c),
      0x31 => {
        self.regs.sp = read_u16_le!();
        3
      }
      0x32 => {
        mem.wb(self.regs.hl(), self.regs.a);
        self.regs.hl_dec();
        2
      }
      0x33 => {
        self.regs.sp = self.regs.sp.wrapping_add(1);
        2
      }
      0x34 => {
        let hl = self.regs.hl();
        let mut v = mem.rb(hl);
        inc!(v);
        mem.wb(hl, v);
        3
      }
      0x35 => {
        let hl = self.regs.hl();
        let mut v = mem.rb(hl);
        dec!(v);
        mem.wb(hl, v);
        3
      }
      0x36 => {
        let n = bump!();
        mem.wb(self.regs.hl(), n);
        3
      }
      0x37 => {
        let z = self.regs.flags.z;
        flags!(z, false, false, true);
        1
      }
      0x38 => jrc!(self.regs.flags.c),
      0x39 => add_hl_n!(self.regs.sp),
      0x3a => {
        self.regs.a = mem.rb(self.regs.hl());
        self.regs.hl_dec();
        2
      }
      0x3b => {
        self.regs.sp = self.regs.sp.wrapping_sub(1);
        2
      }
      0x3c => inc!(self.regs.a),
      0x3d => dec!(self.regs.a),
      0x3e => ld_nn_n!(a),
      0x3f => {
        let Flags { z, c, .. } = self.regs.flags;
        flags!(z, false, false, !c);
        1
      }

      0x40 => ld_r1_r2!(b, b),
      0x41 => ld_r1_r2!(b, c),
      0x42 => ld_r1_r2!(b, d),
      0x43 => ld_r1_r2!(b, e),
      0x44 => ld_r1_r2!(b, h),
      0x45 => ld_r1_r2!(b, l),
      0x46 => ld_r1_r2m!(b, hl),
      0x47 => ld_r1_r2!(b, a),
      0x48 => ld_r1_r2!(c, b),
      0x49 => ld_r1_r2!(c, c),
      0x4a => ld_r1_r2!(c, d),
      0x4b => ld_r1_r2!(c, e),
      0x4c => ld_r1_r2!(c, h),
      0x4d => ld_r1_r2!(c, l),
      0x4e => ld_r1_r2m!(c, hl),
      0x4f => ld_r1_r2!(c, a),

      0x50 => ld_r1_r2!(d, b),
      0x51 => ld_r1_r2!(d, c),
      0x52 => ld_r1_r2!(d, d),
      0x53 => ld_r1_r2!(d, e),
      0x54 => ld_r1_r2!(d, h),
      0x55 => ld_r1_r2!(d, l),
      0x56 => ld_r1_r2m!(d, hl),
      0x57 => ld_r1_r2!(d, a),
      0x58 => ld_r1_r2!(e, b),
      0x59 => ld_r1_r2!(e, c),
      0x5a => ld_r1_r2!(e, d),
      0x5b => ld_r1_r2!(e, e),
      0x5c => ld_r1_r2!(e, h),
      0x5d => ld_r1_r2!(e, l),
      0x5e => ld_r1_r2m!(e, hl),
      0x5f => ld_r1_r2!(e, a),

      0x60 => ld_r1_r2!(h, b),
      0x61 => ld_r1_r2!(h, c),
      0x62 => ld_r1_r2!(h, d),
      0x63 => ld_r1_r2!(h, e),
      0x64 => ld_r1_r2!(h, h),
      0x65 => ld_r1_r2!(h, l),
      0x66 => ld_r1_r2m!(h, hl),
      0x67 => ld_r1_r2!(h, a),
      0x68 => ld_r1_r2!(l, b),
      0x69 => ld_r1_r2!(l, c),
      0x6a => ld_r1_r2!(l, d),
      0x6b => ld_r1_r2!(l, e),
      0x6c => ld_r1_r2!(l, h),
      0x6d => ld_r1_r2!(l, l),
      0x6e => ld_r1_r2m!(l, hl),
      0x6f => ld_r1_r2!(l, a),

      0x70 => ld_r1m_r2!(hl, b),
      0x71 => ld_r1m_r2!(hl, c),
      0x72 => ld_r1m_r2!(hl, d),
      0x73 => ld_r1m_r2!(hl, e),
      0x74 => ld_r1m_r2!(hl, h),
      0x75 => ld_r1m_r2!(hl, l),
      0x76 => {
        // With EI still pending the interrupt is serviced after HALT
        // instead, so there is no repeated fetch.
        if !self.ime && !self.ei_pending && mem.interrupts.pending() != 0 {
          self.halt_bug = true;
        } else {
          self.halt = true;
        }
        1
      }
      0x77 => ld_r1m_r2!(hl, a),
      0x78 => ld_r1_r2!(a, b),
      0x79 => ld_r1_r2!(a, c),
      0x7a => ld_r1_r2!(a, d),
      0x7b => ld_r1_r2!(a, e),
      0x7c => ld_r1_r2!(a, h),
      0x7d => ld_r1_r2!(a, l),
      0x7e => ld_r1_r2m!(a, hl),
      0x7f => ld_r1_r2!(a, a),

      0x80 => add_a_n!(self.regs.b),
      0x81 => add_a_n!(self.regs.c),
      0x82 => add_a_n!(self.regs.d),
      0x83 => add_a_n!(self.regs.e),
      0x84 => add_a_n!(self.regs.h),
      0x85 => add_a_n!(self.regs.l),
      0x86 => {
        add_a_n!(mem.rb(self.regs.hl()));
        2
      }
      0x87 => add_a_n!(self.regs.a),
      0x88 => adc_a_n!(self.regs.b),
      0x89 => adc_a_n!(self.regs.c),
      0x8a => adc_a_n!(self.regs.d),
      0x8b => adc_a_n!(self.regs.e),
      0x8c => adc_a_n!(self.regs.h),
      0x8d => adc_a_n!(self.regs.l),
      0x8e => {
        adc_a_n!(mem.rb(self.regs.hl()));
        2
      }
      0x8f => adc_a_n!(self.regs.a),

      0x90 => sub_a_n!(self.regs.b),
      0x91 => sub_a_n!(self.regs.c),
      0x92 => sub_a_n!(self.regs.d),
      0x93 => sub_a_n!(self.regs.e),
      0x94 => sub_a_n!(self.regs.h),
      0x95 => sub_a_n!(self.regs.l),
      0x96 => {
        sub_a_n!(mem.rb(self.regs.hl()));
        2
      }
      0x97 => sub_a_n!(self.regs.a),
      0x98 => sbc_a_n!(self.regs.b),
      0x99 => sbc_a_n!(self.regs.c),
      0x9a => sbc_a_n!(self.regs.d),
      0x9b => sbc_a_n!(self.regs.e),
      0x9c => sbc_a_n!(self.regs.h),
      0x9d => sbc_a_n!(self.regs.l),
      0x9e => {
        sbc_a_n!(mem.rb(self.regs.hl()));
        2
      }
      0x9f => sbc_a_n!(self.regs.a),

      0xa0 => and_a_n!(self.regs.b),
      0xa1 => and_a_n!(self.regs.c),
      0xa2 => and_a_n!(self.regs.d),
      0xa3 => and_a_n!(self.regs.e),
      0xa4 => and_a_n!(self.regs.h),
      0xa5 => and_a_n!(self.regs.l),
      0xa6 => {
        and_a_n!(mem.rb(self.regs.hl()));
        2
      }
      0xa7 => and_a_n!(self.regs.a),
      0xa8 => xor_a_n!(self.regs.b),
      0xa9 => xor_a_n!(self.regs.c),
      0xaa => xor_a_n!(self.regs.d),
      0xab => xor_a_n!(self.regs.e),
      0xac => xor_a_n!(self.regs.h),
      0xad => xor_a_n!(self.regs.l),
      0xae => {
        xor_a_n!(mem.rb(self.regs.hl()));
        2
      }
      0xaf => xor_a_n!(self.regs.a),

      0xb0 => or_a_n!(self.regs.b),
      0xb1 => or_a_n!(self.regs.c),
      0xb2 => or_a_n!(self.regs.d),
      0xb3 => or_a_n!(self.regs.e),
      0xb4 => or_a_n!(self.regs.h),
      0xb5 => or_a_n!(self.regs.l),
      0xb6 => {
        or_a_n!(mem.rb(self.regs.hl()));
        2
      }
      0xb7 => or_a_n!(self.regs.a),
      0xb8 => cp_a_n!(self.regs.b),
      0xb9 => cp_a_n!(self.regs.c),
      0xba => cp_a_n!(self.regs.d),
      0xbb => cp_a_n!(self.regs.e),
      0xbc => cp_a_n!(self.regs.h),
      0xbd => cp_a_n!(self.regs.l),
      0xbe => {
        cp_a_n!(mem.rb(self.regs.hl()));
        2
      }
      0xbf => cp_a_n!(self.regs.a),

      0xc0 => retc!(!self.regs.flags.z),
      0xc1 => pop!(set_bc),
      0xc2 => jpc!(!self.regs.flags.z),
      0xc3 => jp!(),
      0xc4 => callc!(!self.regs.flags.z),
      0xc5 => push!(bc),
      0xc6 => {
        add_a_n!(bump!());
        2
      }
      0xc7 => rst!(0x00),
      0xc8 => retc!(self.regs.flags.z),
      0xc9 => ret!(),
      0xca => jpc!(self.regs.flags.z),
      0xcb => self.exec_cb(mem),
      0xcc => callc!(self.regs.flags.z),
      0xcd => call!(),
      0xce => {
        adc_a_n!(bump!());
        2
      }
      0xcf => rst!(0x08),

      0xd0 => retc!(!self.regs.flags.c),
      0xd1 => pop!(set_de),
      0xd2 => jpc!(!self.regs.flags.c),
      0xd3 => xx!(),
      0xd4 => callc!(!self.regs.flags.c),
      0xd5 => push!(de),
      0xd6 => {
        sub_a_n!(bump!());
        2
      }
      0xd7 => rst!(0x10),
      0xd8 => retc!(self.regs.flags.c),
      0xd9 => {
        // RETI enables interrupts on the same delay as EI.
        self.regs.pc = self.pop_word(mem);
        self.ei_pending = true;
        4
      }
      0xda => jpc!(self.regs.flags.c),
      0xdb => xx!(),
      0xdc => callc!(self.regs.flags.c),
      0xdd => xx!(),
      0xde => {
        sbc_a_n!(bump!());
        2
      }
      0xdf => rst!(0x18),

      0xe0 => {
        let n = bump!();
        mem.wb(0xff00 | u16::from(n), self.regs.a);
        3
      }
      0xe1 => pop!(set_hl),
      0xe2 => {
        mem.wb(0xff00 | u16::from(self.regs.c), self.regs.a);
        2
      }
      0xe3 => xx!(),
      0xe4 => xx!(),
      0xe5 => push!(hl),
      0xe6 => {
        and_a_n!(bump!());
        2
      }
      0xe7 => rst!(0x20),
      0xe8 => {
        self.regs.sp = sp_plus_r8!();
        4
      }
      0xe9 => {
        self.regs.pc = self.regs.hl();
        1
      }
      0xea => {
        let nn = read_u16_le!();
        mem.wb(nn, self.regs.a);
        4
      }
      0xeb => xx!(),
      0xec => xx!(),
      0xed => xx!(),
      0xee => {
        xor_a_n!(bump!());
        2
      }
      0xef => rst!(0x28),

      0xf0 => {
        let n = bump!();
        self.regs.a = mem.rb(0xff00 | u16::from(n));
        3
      }
      0xf1 => pop!(set_af),
      0xf2 => {
        self.regs.a = mem.rb(0xff00 | u16::from(self.regs.c));
        2
      }
      0xf3 => {
        self.ime = false;
        self.ei_pending = false;
        1
      }
      0xf4 => xx!(),
      0xf5 => push!(af),
      0xf6 => {
        or_a_n!(bump!());
        2
      }
      0xf7 => rst!(0x30),
      0xf8 => {
        let hl = sp_plus_r8!();
        self.regs.set_hl(hl);
        3
      }
      0xf9 => {
        self.regs.sp = self.regs.hl();
        2
      }
      0xfa => {
        let nn = read_u16_le!();
        self.regs.a = mem.rb(nn);
        4
      }
      0xfb => {
        self.ei_pending = true;
        1
      }
      0xfc => xx!(),
      0xfd => xx!(),
      0xfe => {
        cp_a_n!(bump!());
        2
      }
      0xff => rst!(0x38),
    };
    Ok(m)
  }

  /// Run cb instruction.
  ///
  /// The low three bits pick the operand, the rest pick the operation.
  fn exec_cb(&mut self, mem: &mut Memory) -> u32 {
    let op = self.bump(mem);
    let idx = op & 0x07;
    let value = self.r8(mem, idx);
    let bit = (op >> 3) & 0x07;
    let carry = u8::from(self.regs.flags.c);

    macro_rules! shift {
      ($result:expr, $c:expr) => {{
        let result: u8 = $result;
        self.regs.flags = Flags {
          z: result == 0,
          n: false,
          h: false,
          c: $c,
        };
        Some(result)
      }};
    }

    let result = match op >> 3 {
      0x00 => shift!(value.rotate_left(1), value & 0x80 != 0), // rlc
      0x01 => shift!(value.rotate_right(1), value & 0x01 != 0), // rrc
      0x02 => shift!((value << 1) | carry, value & 0x80 != 0), // rl
      0x03 => shift!((value >> 1) | (carry << 7), value & 0x01 != 0), // rr
      0x04 => shift!(value << 1, value & 0x80 != 0), // sla
      // Sign extend.
      0x05 => shift!(((value as i8) >> 1) as u8, value & 0x01 != 0), // sra
      0x06 => shift!(value.rotate_left(4), false), // swap
      0x07 => shift!(value >> 1, value & 0x01 != 0), // srl
      0x08..=0x0f => {
        // bit: C is untouched.
        self.regs.flags.z = value & (1 << bit) == 0;
        self.regs.flags.n = false;
        self.regs.flags.h = true;
        None
      }
      0x10..=0x17 => Some(value & !(1 << bit)), // res
      _ => Some(value | (1 << bit)),            // set
    };

    match (result, idx) {
      (Some(v), 6) => {
        self.set_r8(mem, idx, v);
        4
      }
      (Some(v), _) => {
        self.set_r8(mem, idx, v);
        2
      }
      (None, 6) => 3,
      (None, _) => 2,
    }
  }
}
