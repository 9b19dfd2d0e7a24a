//! [`ModuleError`]: everything that can go wrong decoding a compiled
//! bytecode module from bytes.

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ModuleError {
    #[error("bad magic bytes: not a peglang bytecode module")]
    BadMagic,
    #[error("unsupported bytecode version {0}")]
    UnsupportedVersion(u32),
    #[error("checksum mismatch: expected {expected:#010x}, got {actual:#010x}")]
    ChecksumMismatch { expected: u32, actual: u32 },
    #[error("unexpected end of bytecode stream")]
    Truncated,
    #[error("unknown opcode tag {0}")]
    UnknownOpcode(u8),
    #[error("string table has {0} entries, more than the 16-bit count field allows")]
    StringTableTooLarge(usize),
    #[error("string table entry is {0} bytes, more than the 8-bit length field allows")]
    StringEntryTooLong(usize),
    #[error("entrypoint {0:?} is not defined in this module")]
    UnknownEntrypoint(String),
}
