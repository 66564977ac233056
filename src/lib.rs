//! Game Boy and Game Boy Color emulation core: CPU, memory bus, timer,
//! interrupts, cartridge banking and the frame scheduler that ties them
//! together. Rendering and audio are left to the embedder.

#[macro_use]
extern crate log;

pub mod cpu;
pub mod error;
pub mod gameboy;
pub mod gpu;
pub mod mem;

pub use crate::error::{Error, Result};
pub use crate::gameboy::{GameBoy, Options};
