use std::fs;
use std::io::{self, Write};
use std::path::Path;
use std::process;

use anyhow::{anyhow, Context, Result};
use clap::{App, Arg};
use log::{error, info};

use gb_core::mem::mbc::{Cartridge, MBC};
use gb_core::{GameBoy, Options};

fn main() {
  env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

  if let Err(e) = run() {
    error!("{:#}", e);
    eprintln!("error: {:#}", e);
    process::exit(1);
  }
}

fn run() -> Result<()> {
  let matches = App::new("gb-core")
    .version(env!("CARGO_PKG_VERSION"))
    .about("Runs a Game Boy cartridge headless and prints its serial output")
    .arg(
      Arg::with_name("ROM")
        .help("Cartridge image")
        .required(true)
        .index(1),
    )
    .arg(
      Arg::with_name("frames")
        .long("frames")
        .value_name("N")
        .takes_value(true)
        .default_value("600")
        .help("Number of frames to run"),
    )
    .arg(
      Arg::with_name("dmg")
        .long("dmg")
        .help("Run as a monochrome Game Boy even if the cartridge supports CGB"),
    )
    .arg(
      Arg::with_name("save")
        .long("save")
        .help("Load and store battery RAM in <ROM>.sav"),
    )
    .get_matches();

  let rom_path = Path::new(matches.value_of("ROM").context("no ROM given")?);
  let frames: u32 = matches
    .value_of("frames")
    .unwrap_or("600")
    .parse()
    .context("--frames must be a number")?;
  let save_path = rom_path.with_extension("sav");
  let use_save = matches.is_present("save");

  let rom = fs::read(rom_path)
    .with_context(|| format!("reading {}", rom_path.display()))?;
  let mut cart = Cartridge::new(rom)
    .with_context(|| format!("loading {}", rom_path.display()))?;

  if use_save && cart.has_battery() && save_path.exists() {
    let data = fs::read(&save_path)
      .with_context(|| format!("reading {}", save_path.display()))?;
    info!("Loaded {} bytes from {}", data.len(), save_path.display());
    cart.load_ram(&data);
  }

  let options = Options {
    cgb: !matches.is_present("dmg"),
  };
  let mut gb = GameBoy::new(cart, options);

  let mut failure = None;
  for frame in 0..frames {
    if let Err(e) = gb.run_frame() {
      error!("Frame {}: {}", frame, e);
      failure = Some(e);
      break;
    }
  }
  info!(
    "{}: {} clocks executed",
    gb.cartridge().title(),
    gb.cycles()
  );

  let stdout = io::stdout();
  let mut out = stdout.lock();
  out.write_all(gb.serial_output())?;
  out.flush()?;

  if use_save && gb.cartridge().has_battery() {
    fs::write(&save_path, gb.cartridge().ram())
      .with_context(|| format!("writing {}", save_path.display()))?;
    info!("Saved {}", save_path.display());
  }

  match failure {
    Some(e) => Err(anyhow!(e).context("emulation stopped")),
    None => Ok(()),
  }
}
