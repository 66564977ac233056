use crate::cpu::CPU;
use crate::error::Result;
use crate::gpu::{Gpu, LcdTiming};
use crate::mem::mbc::{Cartridge, CgbSupport};
use crate::mem::{Key, Memory};

/// Clocks per frame at single speed.
pub const CYCLES_PER_FRAME: u32 = 4_194_304 / 60;

/// Clocks burned per iteration while the CPU is halted.
const HALT_CYCLES: u32 = 4;

#[derive(Debug, Copy, Clone, Default)]
pub struct Options {
  /// Run in CGB mode when the cartridge supports it.
  pub cgb: bool,
}

pub struct GameBoy {
  cpu: CPU,
  mem: Memory,
  gpu: Box<dyn Gpu>,
  cycles: u64,
}

impl GameBoy {
  pub fn new(cart: Cartridge, options: Options) -> GameBoy {
    GameBoy::with_gpu(cart, options, Box::new(LcdTiming::new()))
  }

  /// Build a machine driving `gpu` instead of the bare LCD timing.
  pub fn with_gpu(
    cart: Cartridge,
    options: Options,
    gpu: Box<dyn Gpu>,
  ) -> GameBoy {
    let cgb = options.cgb && cart.cgb() != CgbSupport::None;
    info!("Starting {:?}, cgb={}", cart.title(), cgb);
    GameBoy {
      cpu: CPU::new(cgb),
      mem: Memory::new(cart, cgb),
      gpu,
      cycles: 0,
    }
  }

  /// Run one frame's worth of clocks.
  /// Return the clocks actually executed, which overshoot the budget by
  /// at most one instruction plus one dispatch.
  pub fn run_frame(&mut self) -> Result<u32> {
    let budget = if self.mem.double_speed() {
      2 * CYCLES_PER_FRAME
    } else {
      CYCLES_PER_FRAME
    };

    let mut total = 0;
    while total < budget {
      let t = if self.cpu.halted() {
        HALT_CYCLES
      } else {
        self.cpu.step(&mut self.mem)?
      };
      self.tick(t);
      total += t;

      if let Some(t) = self.cpu.handle_interrupts(&mut self.mem) {
        self.tick(t);
        total += t;
      }
    }

    self.cycles += u64::from(total);
    debug!("Frame done: {} clocks, pc=0x{:04x}", total, self.cpu.regs.pc);
    Ok(total)
  }

  /// Feed `t` CPU clocks to the timer and the video collaborator.
  fn tick(&mut self, t: u32) {
    self.mem.step(t);
    // The LCD runs at the same rate in either speed mode.
    let speed = if self.mem.double_speed() { 2 } else { 1 };
    let irq = self.gpu.step(t / speed, &mut self.mem);
    self.mem.interrupts.request_mask(irq);
  }

  /// Clocks executed since power on.
  pub fn cycles(&self) -> u64 {
    self.cycles
  }

  pub fn cgb(&self) -> bool {
    self.mem.cgb()
  }

  pub fn cpu(&self) -> &CPU {
    &self.cpu
  }

  pub fn cpu_mut(&mut self) -> &mut CPU {
    &mut self.cpu
  }

  pub fn mem(&self) -> &Memory {
    &self.mem
  }

  pub fn mem_mut(&mut self) -> &mut Memory {
    &mut self.mem
  }

  pub fn cartridge(&self) -> &Cartridge {
    self.mem.cartridge()
  }

  pub fn serial_output(&self) -> &[u8] {
    self.mem.serial_output()
  }

  pub fn key_down(&mut self, key: Key) {
    self.mem.key_down(key);
  }

  pub fn key_up(&mut self, key: Key) {
    self.mem.key_up(key);
  }
}
