/// CGB color palette RAM behind an index/data register pair
/// (BCPS/BCPD for the background, OCPS/OCPD for objects).
#[derive(Debug)]
pub struct Palette {
  /// Byte addressed by the data port.
  index: u8,
  /// Advance `index` after each data write.
  auto_increment: bool,
  data: [u8; 64],
}

impl Palette {
  pub fn new() -> Palette {
    Palette {
      index: 0,
      auto_increment: false,
      data: [0; 64],
    }
  }

  pub fn rb_index(&self) -> u8 {
    (u8::from(self.auto_increment) << 7) | 0x40 | self.index
  }

  pub fn wb_index(&mut self, value: u8) {
    self.index = value & 0x3f;
    self.auto_increment = value & 0x80 != 0;
  }

  pub fn rb_data(&self) -> u8 {
    self.data[self.index as usize]
  }

  pub fn wb_data(&mut self, value: u8) {
    self.data[self.index as usize] = value;
    if self.auto_increment {
      self.index = (self.index + 1) & 0x3f;
    }
  }

  /// RGB555 value of `color` (0-3) in `palette` (0-7).
  pub fn color(&self, palette: usize, color: usize) -> u16 {
    let idx = (palette & 7) * 8 + (color & 3) * 2;
    u16::from(self.data[idx]) | (u16::from(self.data[idx + 1]) << 8)
  }
}
