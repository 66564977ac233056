use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
  /// Opcode byte with no handler. `pc` is the address the opcode was
  /// fetched from.
  #[error("unimplemented opcode 0x{opcode:02x} at 0x{pc:04x}")]
  UnimplementedOpcode { opcode: u8, pc: u16 },

  #[error("unsupported cartridge type 0x{type_byte:02x}")]
  UnsupportedCartridgeType { type_byte: u8 },

  #[error("malformed rom: {reason}")]
  MalformedRom { reason: String },
}

pub type Result<T> = std::result::Result<T, Error>;
