#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Key {
  A,
  B,
  Start,
  Select,
  Left,
  Up,
  Down,
  Right,
}

#[derive(Debug)]
pub struct KeyData {
  /// (buttons, directions), active low.
  rows: (u8, u8),
  column: u8,
}

impl KeyData {
  pub fn new() -> KeyData {
    KeyData {
      rows: (0x0f, 0x0f),
      column: 0x30,
    }
  }

  pub fn rb(&self) -> u8 {
    let mut value = 0x0f;
    if self.column & 0x20 == 0 {
      value &= self.rows.0;
    }
    if self.column & 0x10 == 0 {
      value &= self.rows.1;
    }
    0xc0 | self.column | value
  }

  pub fn wb(&mut self, val: u8) {
    self.column = val & 0x30;
  }

  /// Returns true if the key was not already held.
  pub fn key_down(&mut self, key: Key) -> bool {
    debug!("Pressed {:?}. Key = {:?}", key, &self);
    let before = self.rows;
    match key {
      Key::Right => self.rows.1 &= 0xe,
      Key::Left => self.rows.1 &= 0xd,
      Key::Up => self.rows.1 &= 0xb,
      Key::Down => self.rows.1 &= 0x7,
      Key::A => self.rows.0 &= 0xe,
      Key::B => self.rows.0 &= 0xd,
      Key::Select => self.rows.0 &= 0xb,
      Key::Start => self.rows.0 &= 0x7,
    }
    before != self.rows
  }

  pub fn key_up(&mut self, key: Key) {
    debug!("Released {:?}. Key = {:?}", key, &self);
    match key {
      Key::Right => self.rows.1 |= 0x1,
      Key::Left => self.rows.1 |= 0x2,
      Key::Up => self.rows.1 |= 0x4,
      Key::Down => self.rows.1 |= 0x8,
      Key::A => self.rows.0 |= 0x1,
      Key::B => self.rows.0 |= 0x2,
      Key::Select => self.rows.0 |= 0x4,
      Key::Start => self.rows.0 |= 0x8,
    }
  }
}
