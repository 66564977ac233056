use crate::cpu::CPU;
use crate::error::Error;
use crate::mem::mbc::{test_rom, Cartridge};
use crate::mem::{test_memory, Interrupt, Memory, IE};

fn init() -> (CPU, Memory) {
  let mut cpu = CPU::new(false);
  let mem = test_memory(false);
  // Set the PC to start in WRAM.
  cpu.regs.pc = 0xc000;
  cpu.regs.sp = 0xdff0;
  (cpu, mem)
}

/// Place `code` at PC, run one instruction and check its clocks and length.
fn run(cpu: &mut CPU, mem: &mut Memory, code: &[u8], len: u16, time_expected: u32) {
  let start = cpu.regs.pc;
  mem.write(start, code);
  let time_actual = cpu.step(mem).unwrap();
  // Test time.
  assert_eq!(time_actual, time_expected);
  // Test that the PC was incremented.
  assert_eq!(cpu.regs.pc, start.wrapping_add(len));
}

fn enable_timer_interrupt(mem: &mut Memory) {
  mem.wb(IE, Interrupt::Timer.bit());
  mem.interrupts.request(Interrupt::Timer);
}

#[test]
fn nop() {
  let (mut cpu, mut mem) = init();
  run(&mut cpu, &mut mem, &[0x00], 1, 4);
}

#[test]
fn ld_bc_from_rom() {
  let mut rom = test_rom(0x00, 2, 0);
  rom[0x100..0x103].copy_from_slice(&[0x01, 0x34, 0x12]);
  let mut mem = Memory::new(Cartridge::new(rom).unwrap(), false);
  let mut cpu = CPU::new(false);

  assert_eq!(cpu.step(&mut mem).unwrap(), 12);
  assert_eq!(cpu.regs.bc(), 0x1234);
  assert_eq!(cpu.regs.pc, 0x103);
}

#[test]
fn ld_nn_n() {
  macro_rules! run_test {
    ($reg:ident, $opcode:expr) => {{
      let (mut cpu, mut mem) = init();
      let flags = cpu.regs.flags;
      run(&mut cpu, &mut mem, &[$opcode, 0x42], 2, 8);
      assert_eq!(cpu.regs.flags, flags);
      assert_eq!(cpu.regs.$reg, 0x42);
    }};
  }
  run_test!(b, 0x06);
  run_test!(c, 0x0e);
  run_test!(d, 0x16);
  run_test!(e, 0x1e);
  run_test!(h, 0x26);
  run_test!(l, 0x2e);
  run_test!(a, 0x3e);
}

#[test]
fn ld_r1_r2() {
  macro_rules! reg_reg {
    ($r1:ident, $r2:ident, $opcode:expr) => {{
      let (mut cpu, mut mem) = init();
      cpu.regs.$r2 = 0x42;
      let flags = cpu.regs.flags;
      run(&mut cpu, &mut mem, &[$opcode], 1, 4);
      assert_eq!(cpu.regs.flags, flags);
      assert_eq!(cpu.regs.$r1, 0x42);
      assert_eq!(cpu.regs.$r2, 0x42);
    }};
  }

  reg_reg!(a, a, 0x7f);
  reg_reg!(a, b, 0x78);
  reg_reg!(a, l, 0x7d);
  reg_reg!(b, c, 0x41);
  reg_reg!(c, d, 0x4a);
  reg_reg!(d, e, 0x53);
  reg_reg!(e, h, 0x5c);
  reg_reg!(h, l, 0x65);
  reg_reg!(l, a, 0x6f);
}

#[test]
fn ld_hl_indirect() {
  let (mut cpu, mut mem) = init();
  cpu.regs.set_hl(0xc100);
  cpu.regs.b = 0x99;
  run(&mut cpu, &mut mem, &[0x70], 1, 8);
  assert_eq!(mem.rb(0xc100), 0x99);

  run(&mut cpu, &mut mem, &[0x7e], 1, 8);
  assert_eq!(cpu.regs.a, 0x99);

  // LD (HL+),A then LD A,(HL-)
  run(&mut cpu, &mut mem, &[0x22], 1, 8);
  assert_eq!(cpu.regs.hl(), 0xc101);
  run(&mut cpu, &mut mem, &[0x3a], 1, 8);
  assert_eq!(cpu.regs.hl(), 0xc100);

  run(&mut cpu, &mut mem, &[0x36, 0x07], 2, 12);
  assert_eq!(mem.rb(0xc100), 0x07);
}

#[test]
fn ldh() {
  let (mut cpu, mut mem) = init();
  cpu.regs.a = 0x5a;
  run(&mut cpu, &mut mem, &[0xe0, 0x80], 2, 12);
  assert_eq!(mem.rb(0xff80), 0x5a);

  cpu.regs.a = 0;
  cpu.regs.c = 0x80;
  run(&mut cpu, &mut mem, &[0xf2], 1, 8);
  assert_eq!(cpu.regs.a, 0x5a);

  run(&mut cpu, &mut mem, &[0xea, 0x00, 0xc2], 3, 16);
  assert_eq!(mem.rb(0xc200), 0x5a);
}

#[test]
fn xor_a() {
  let (mut cpu, mut mem) = init();
  cpu.regs.a = 0x5a;
  run(&mut cpu, &mut mem, &[0xaf], 1, 4);
  assert_eq!(cpu.regs.a, 0);
  assert_eq!(cpu.regs.f(), 0x80);
}

#[test]
fn xor_a_every_value() {
  let (mut cpu, mut mem) = init();
  for v in 0..=255u8 {
    cpu.regs.pc = 0xc000;
    cpu.regs.a = v;
    cpu.regs.flags.n = true;
    cpu.regs.flags.h = true;
    cpu.regs.flags.c = true;
    run(&mut cpu, &mut mem, &[0xaf], 1, 4);
    assert_eq!(cpu.regs.a, 0);
    assert_eq!(cpu.regs.f(), 0x80);
  }
}

#[test]
fn inc_dec_round_trip() {
  let (mut cpu, mut mem) = init();
  cpu.regs.b = 0x0f;
  cpu.regs.flags.c = true;

  run(&mut cpu, &mut mem, &[0x04], 1, 4);
  assert_eq!(cpu.regs.b, 0x10);
  assert!(cpu.regs.flags.h);
  assert!(!cpu.regs.flags.n);
  assert!(cpu.regs.flags.c);

  run(&mut cpu, &mut mem, &[0x05], 1, 4);
  assert_eq!(cpu.regs.b, 0x0f);
  assert!(cpu.regs.flags.h);
  assert!(cpu.regs.flags.n);
  assert!(cpu.regs.flags.c);

  cpu.regs.b = 0x01;
  run(&mut cpu, &mut mem, &[0x05], 1, 4);
  assert!(cpu.regs.flags.z);
}

#[test]
fn inc_dec_every_value() {
  let (mut cpu, mut mem) = init();
  for v in 0..=255u8 {
    for &carry in &[false, true] {
      cpu.regs.pc = 0xc000;
      cpu.regs.b = v;
      cpu.regs.flags.c = carry;

      run(&mut cpu, &mut mem, &[0x04], 1, 4);
      let up = v.wrapping_add(1);
      assert_eq!(cpu.regs.b, up);
      assert_eq!(cpu.regs.flags.z, up == 0);
      assert_eq!(cpu.regs.flags.h, v & 0x0f == 0x0f);
      assert!(!cpu.regs.flags.n);
      assert_eq!(cpu.regs.flags.c, carry);

      run(&mut cpu, &mut mem, &[0x05], 1, 4);
      assert_eq!(cpu.regs.b, v);
      assert_eq!(cpu.regs.flags.z, v == 0);
      assert_eq!(cpu.regs.flags.h, up & 0x0f == 0);
      assert!(cpu.regs.flags.n);
      assert_eq!(cpu.regs.flags.c, carry);
    }
  }
}

#[test]
fn inc_hl_indirect() {
  let (mut cpu, mut mem) = init();
  cpu.regs.set_hl(0xc100);
  mem.wb(0xc100, 0xff);
  run(&mut cpu, &mut mem, &[0x34], 1, 12);
  assert_eq!(mem.rb(0xc100), 0x00);
  assert!(cpu.regs.flags.z);
  assert!(cpu.regs.flags.h);
}

#[test]
fn inc_dec_nn_wrap() {
  let (mut cpu, mut mem) = init();
  cpu.regs.set_de(0xffff);
  let flags = cpu.regs.flags;
  run(&mut cpu, &mut mem, &[0x13], 1, 8);
  assert_eq!(cpu.regs.de(), 0);
  run(&mut cpu, &mut mem, &[0x1b], 1, 8);
  assert_eq!(cpu.regs.de(), 0xffff);
  assert_eq!(cpu.regs.flags, flags);
}

#[test]
fn add_hl_flags() {
  let (mut cpu, mut mem) = init();
  cpu.regs.set_hl(0x0fff);
  cpu.regs.set_bc(0x0001);
  cpu.regs.flags.z = true;
  cpu.regs.flags.n = true;
  run(&mut cpu, &mut mem, &[0x09], 1, 8);
  assert_eq!(cpu.regs.hl(), 0x1000);
  assert!(cpu.regs.flags.z);
  assert!(!cpu.regs.flags.n);
  assert!(cpu.regs.flags.h);
  assert!(!cpu.regs.flags.c);

  cpu.regs.set_hl(0x8000);
  run(&mut cpu, &mut mem, &[0x29], 1, 8);
  assert_eq!(cpu.regs.hl(), 0x0000);
  assert!(!cpu.regs.flags.h);
  assert!(cpu.regs.flags.c);
}

#[test]
fn sp_plus_r8() {
  let (mut cpu, mut mem) = init();
  cpu.regs.sp = 0x00ff;
  run(&mut cpu, &mut mem, &[0xf8, 0x01], 2, 12);
  assert_eq!(cpu.regs.hl(), 0x0100);
  assert!(!cpu.regs.flags.z);
  assert!(cpu.regs.flags.h);
  assert!(cpu.regs.flags.c);
  assert_eq!(cpu.regs.sp, 0x00ff);

  cpu.regs.sp = 0xd000;
  run(&mut cpu, &mut mem, &[0xe8, 0xff], 2, 16);
  assert_eq!(cpu.regs.sp, 0xcfff);
  assert!(!cpu.regs.flags.h);
  assert!(!cpu.regs.flags.c);
}

#[test]
fn daa_after_add_and_sub() {
  let (mut cpu, mut mem) = init();
  cpu.regs.a = 0x15;
  run(&mut cpu, &mut mem, &[0xc6, 0x27], 2, 8);
  assert_eq!(cpu.regs.a, 0x3c);
  run(&mut cpu, &mut mem, &[0x27], 1, 4);
  assert_eq!(cpu.regs.a, 0x42);
  assert!(!cpu.regs.flags.c);

  run(&mut cpu, &mut mem, &[0xd6, 0x15], 2, 8);
  assert_eq!(cpu.regs.a, 0x2d);
  run(&mut cpu, &mut mem, &[0x27], 1, 4);
  assert_eq!(cpu.regs.a, 0x27);

  cpu.regs.a = 0x99;
  run(&mut cpu, &mut mem, &[0xc6, 0x01], 2, 8);
  run(&mut cpu, &mut mem, &[0x27], 1, 4);
  assert_eq!(cpu.regs.a, 0x00);
  assert!(cpu.regs.flags.z);
  assert!(cpu.regs.flags.c);
}

fn bcd(n: u32) -> u8 {
  (((n / 10) << 4) | (n % 10)) as u8
}

#[test]
fn daa_every_bcd_pair() {
  let (mut cpu, mut mem) = init();
  for a in 0..100u32 {
    for b in 0..100u32 {
      cpu.regs.pc = 0xc000;
      cpu.regs.a = bcd(a);
      run(&mut cpu, &mut mem, &[0xc6, bcd(b)], 2, 8);
      run(&mut cpu, &mut mem, &[0x27], 1, 4);
      assert_eq!(cpu.regs.a, bcd((a + b) % 100), "{} + {}", a, b);
      assert_eq!(cpu.regs.flags.c, a + b >= 100, "{} + {}", a, b);
      assert_eq!(cpu.regs.flags.z, cpu.regs.a == 0);
      assert!(!cpu.regs.flags.h);

      cpu.regs.pc = 0xc000;
      cpu.regs.a = bcd(a);
      run(&mut cpu, &mut mem, &[0xd6, bcd(b)], 2, 8);
      run(&mut cpu, &mut mem, &[0x27], 1, 4);
      assert_eq!(cpu.regs.a, bcd((a + 100 - b) % 100), "{} - {}", a, b);
      assert_eq!(cpu.regs.flags.c, a < b, "{} - {}", a, b);
      assert!(cpu.regs.flags.n);
    }
  }
}

#[test]
fn sbc_includes_carry_in_half_carry() {
  let (mut cpu, mut mem) = init();
  cpu.regs.a = 0x10;
  cpu.regs.flags.c = true;
  run(&mut cpu, &mut mem, &[0xde, 0x0f], 2, 8);
  assert_eq!(cpu.regs.a, 0x00);
  assert!(cpu.regs.flags.z);
  assert!(cpu.regs.flags.n);
  assert!(cpu.regs.flags.h);
  assert!(!cpu.regs.flags.c);
}

#[test]
fn cp_leaves_a() {
  let (mut cpu, mut mem) = init();
  cpu.regs.a = 0x3c;
  run(&mut cpu, &mut mem, &[0xfe, 0x40], 2, 8);
  assert_eq!(cpu.regs.a, 0x3c);
  assert!(cpu.regs.flags.c);
  assert!(cpu.regs.flags.n);
  assert!(!cpu.regs.flags.z);
}

#[test]
fn rotate_a_clears_z() {
  let (mut cpu, mut mem) = init();
  cpu.regs.a = 0x00;
  cpu.regs.flags.z = true;
  run(&mut cpu, &mut mem, &[0x07], 1, 4);
  assert!(!cpu.regs.flags.z);

  cpu.regs.a = 0x01;
  run(&mut cpu, &mut mem, &[0x1f], 1, 4);
  assert_eq!(cpu.regs.a, 0x00);
  assert!(!cpu.regs.flags.z);
  assert!(cpu.regs.flags.c);
}

#[test]
fn jr() {
  let (mut cpu, mut mem) = init();
  run(&mut cpu, &mut mem, &[0x18, 0xfe], 0, 12);

  cpu.regs.flags.z = true;
  run(&mut cpu, &mut mem, &[0x20, 0x05], 2, 8);
  run(&mut cpu, &mut mem, &[0x28, 0x05], 7, 12);
}

#[test]
fn jp_conditional() {
  let (mut cpu, mut mem) = init();
  cpu.regs.flags.c = false;
  run(&mut cpu, &mut mem, &[0xda, 0x00, 0xd0], 3, 12);
  mem.write(cpu.regs.pc, &[0xd2, 0x00, 0xd0]);
  assert_eq!(cpu.step(&mut mem).unwrap(), 16);
  assert_eq!(cpu.regs.pc, 0xd000);

  cpu.regs.set_hl(0xc000);
  mem.wb(0xd000, 0xe9);
  assert_eq!(cpu.step(&mut mem).unwrap(), 4);
  assert_eq!(cpu.regs.pc, 0xc000);
}

#[test]
fn call_ret() {
  let (mut cpu, mut mem) = init();
  let sp = cpu.regs.sp;
  mem.write(0xc000, &[0xcd, 0x10, 0xc0]);
  mem.wb(0xc010, 0xc9);

  assert_eq!(cpu.step(&mut mem).unwrap(), 24);
  assert_eq!(cpu.regs.pc, 0xc010);
  assert_eq!(cpu.regs.sp, sp - 2);
  assert_eq!(mem.rw(cpu.regs.sp), 0xc003);

  assert_eq!(cpu.step(&mut mem).unwrap(), 16);
  assert_eq!(cpu.regs.pc, 0xc003);
  assert_eq!(cpu.regs.sp, sp);
}

#[test]
fn conditional_call_ret() {
  let (mut cpu, mut mem) = init();
  cpu.regs.flags.z = false;
  run(&mut cpu, &mut mem, &[0xcc, 0x00, 0xd0], 3, 12);
  run(&mut cpu, &mut mem, &[0xc8], 1, 8);

  mem.write(cpu.regs.pc, &[0xc4, 0x00, 0xd0]);
  assert_eq!(cpu.step(&mut mem).unwrap(), 24);
  mem.wb(0xd000, 0xc0);
  assert_eq!(cpu.step(&mut mem).unwrap(), 20);
  assert_eq!(cpu.regs.pc, 0xc007);
}

#[test]
fn rst() {
  let (mut cpu, mut mem) = init();
  mem.wb(0xc000, 0xef);
  assert_eq!(cpu.step(&mut mem).unwrap(), 16);
  assert_eq!(cpu.regs.pc, 0x28);
  assert_eq!(mem.rw(cpu.regs.sp), 0xc001);
}

#[test]
fn push_pop_af_drops_low_nibble() {
  let (mut cpu, mut mem) = init();
  cpu.regs.set_bc(0x12ff);
  run(&mut cpu, &mut mem, &[0xc5], 1, 16);
  run(&mut cpu, &mut mem, &[0xf1], 1, 12);
  assert_eq!(cpu.regs.af(), 0x12f0);
  assert_eq!(cpu.regs.sp, 0xdff0);
}

#[test]
fn ld_a16_sp() {
  let (mut cpu, mut mem) = init();
  cpu.regs.sp = 0xbeef;
  run(&mut cpu, &mut mem, &[0x08, 0x00, 0xc1], 3, 20);
  assert_eq!(mem.rw(0xc100), 0xbeef);
}

#[test]
fn cb_ops() {
  let (mut cpu, mut mem) = init();
  // BIT 7,H keeps C.
  cpu.regs.h = 0x80;
  cpu.regs.flags.c = true;
  run(&mut cpu, &mut mem, &[0xcb, 0x7c], 2, 8);
  assert!(!cpu.regs.flags.z);
  assert!(cpu.regs.flags.h);
  assert!(cpu.regs.flags.c);

  // SWAP (HL) sets flags from the result.
  cpu.regs.set_hl(0xc100);
  mem.wb(0xc100, 0x00);
  run(&mut cpu, &mut mem, &[0xcb, 0x36], 2, 16);
  assert!(cpu.regs.flags.z);
  assert!(!cpu.regs.flags.c);
  mem.wb(0xc100, 0xf1);
  run(&mut cpu, &mut mem, &[0xcb, 0x36], 2, 16);
  assert_eq!(mem.rb(0xc100), 0x1f);

  // BIT n,(HL) only reads.
  run(&mut cpu, &mut mem, &[0xcb, 0x46], 2, 12);
  assert!(!cpu.regs.flags.z);

  // RL C through carry.
  cpu.regs.c = 0x80;
  cpu.regs.flags.c = false;
  run(&mut cpu, &mut mem, &[0xcb, 0x11], 2, 8);
  assert_eq!(cpu.regs.c, 0x00);
  assert!(cpu.regs.flags.z);
  assert!(cpu.regs.flags.c);

  // SRA keeps the sign bit.
  cpu.regs.a = 0x81;
  run(&mut cpu, &mut mem, &[0xcb, 0x2f], 2, 8);
  assert_eq!(cpu.regs.a, 0xc0);
  assert!(cpu.regs.flags.c);

  // RES 0,A / SET 7,B
  run(&mut cpu, &mut mem, &[0xcb, 0x87], 2, 8);
  assert_eq!(cpu.regs.a, 0xc0);
  cpu.regs.b = 0;
  run(&mut cpu, &mut mem, &[0xcb, 0xf8], 2, 8);
  assert_eq!(cpu.regs.b, 0x80);
}

#[test]
fn ei_takes_effect_after_next_instruction() {
  let (mut cpu, mut mem) = init();
  enable_timer_interrupt(&mut mem);
  mem.write(0xc000, &[0xfb, 0x00, 0x00]);

  cpu.step(&mut mem).unwrap();
  assert!(!cpu.ime);
  assert_eq!(cpu.handle_interrupts(&mut mem), None);

  cpu.step(&mut mem).unwrap();
  assert!(cpu.ime);
  assert_eq!(cpu.handle_interrupts(&mut mem), Some(20));
  assert_eq!(cpu.regs.pc, 0x50);
  assert_eq!(mem.rw(cpu.regs.sp), 0xc002);
  assert!(!cpu.ime);
  assert_eq!(mem.interrupts.flags & Interrupt::Timer.bit(), 0);
}

#[test]
fn di_cancels_pending_ei() {
  let (mut cpu, mut mem) = init();
  mem.write(0xc000, &[0xfb, 0xf3, 0x00]);
  for _ in 0..3 {
    cpu.step(&mut mem).unwrap();
  }
  assert!(!cpu.ime);
}

#[test]
fn reti_enables_after_next_instruction() {
  let (mut cpu, mut mem) = init();
  cpu.regs.sp = 0xdfee;
  mem.ww(0xdfee, 0xc100);
  mem.wb(0xc000, 0xd9);

  assert_eq!(cpu.step(&mut mem).unwrap(), 16);
  assert_eq!(cpu.regs.pc, 0xc100);
  assert_eq!(cpu.regs.sp, 0xdff0);
  assert!(!cpu.ime);

  cpu.step(&mut mem).unwrap();
  assert!(cpu.ime);
}

#[test]
fn halt_bug_repeats_next_byte() {
  let (mut cpu, mut mem) = init();
  enable_timer_interrupt(&mut mem);
  cpu.regs.a = 0;
  mem.write(0xc000, &[0x76, 0x3c, 0x00]);

  run(&mut cpu, &mut mem, &[0x76], 1, 4);
  assert!(!cpu.halted());

  run(&mut cpu, &mut mem, &[0x3c], 0, 4);
  run(&mut cpu, &mut mem, &[0x3c], 1, 4);
  assert_eq!(cpu.regs.a, 2);
}

#[test]
fn ei_halt_services_interrupt_once() {
  let (mut cpu, mut mem) = init();
  enable_timer_interrupt(&mut mem);
  mem.write(0xc000, &[0xfb, 0x76]);

  cpu.step(&mut mem).unwrap();
  cpu.step(&mut mem).unwrap();
  assert!(cpu.ime);
  assert!(cpu.halted());
  assert_eq!(cpu.regs.pc, 0xc002);

  assert_eq!(cpu.handle_interrupts(&mut mem), Some(20));
  assert_eq!(cpu.regs.pc, 0x50);
  assert_eq!(mem.rw(cpu.regs.sp), 0xc002);

  // The first handler byte (a NOP in the test ROM) is fetched once.
  let sp = cpu.regs.sp;
  assert_eq!(cpu.step(&mut mem).unwrap(), 4);
  assert_eq!(cpu.regs.pc, 0x51);
  assert_eq!(cpu.regs.sp, sp);
}

#[test]
fn halt_wakes_without_ime() {
  let (mut cpu, mut mem) = init();
  run(&mut cpu, &mut mem, &[0x76], 1, 4);
  assert!(cpu.halted());
  assert_eq!(cpu.handle_interrupts(&mut mem), None);
  assert!(cpu.halted());

  enable_timer_interrupt(&mut mem);
  assert_eq!(cpu.handle_interrupts(&mut mem), None);
  assert!(!cpu.halted());
  assert_eq!(cpu.regs.pc, 0xc001);
  // Not acknowledged.
  assert_ne!(mem.interrupts.flags & Interrupt::Timer.bit(), 0);
}

#[test]
fn halt_with_ime_dispatches() {
  let (mut cpu, mut mem) = init();
  cpu.ime = true;
  run(&mut cpu, &mut mem, &[0x76], 1, 4);
  assert!(cpu.halted());

  mem.wb(IE, 0x1f);
  mem.interrupts.request(Interrupt::Joypad);
  mem.interrupts.request(Interrupt::VBlank);
  assert_eq!(cpu.handle_interrupts(&mut mem), Some(20));
  assert!(!cpu.halted());
  assert_eq!(cpu.regs.pc, 0x40);
  assert_eq!(mem.rw(cpu.regs.sp), 0xc001);
  assert_eq!(mem.interrupts.flags, Interrupt::Joypad.bit());
}

#[test]
fn stop_without_armed_switch_halts() {
  let (mut cpu, mut mem) = init();
  run(&mut cpu, &mut mem, &[0x10, 0x00], 2, 4);
  assert!(cpu.halted());
}

#[test]
fn unimplemented_opcode() {
  for &op in &[0xd3, 0xdb, 0xdd, 0xe3, 0xe4, 0xeb, 0xec, 0xed, 0xf4, 0xfc, 0xfd] {
    let (mut cpu, mut mem) = init();
    mem.wb(0xc000, op);
    assert_eq!(
      cpu.step(&mut mem),
      Err(Error::UnimplementedOpcode {
        opcode: op,
        pc: 0xc000
      })
    );
    assert_eq!(cpu.regs.pc, 0xc000);
  }
}
