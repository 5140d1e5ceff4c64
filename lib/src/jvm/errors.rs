use std::io;
use thiserror::Error;

/// Failures while reading a class file or decoding a method body
#[derive(Debug, Error)]
pub enum Error {
    #[error("class file is truncated")]
    Truncated,

    #[error("bad magic number {0:#010x}")]
    BadMagic(u32),

    #[error("unknown constant pool tag {tag} at index {index}")]
    UnknownConstantTag { tag: u8, index: u16 },

    /// Index is zero, past the end of the pool, or the unusable slot after a long/double
    #[error("constant pool index {0} is not valid")]
    BadConstantIndex(u16),

    #[error("constant pool index {index} is not a {expected} constant")]
    WrongConstantKind { index: u16, expected: &'static str },

    #[error("invalid modified UTF-8 string")]
    InvalidUtf8,

    #[error("malformed `{0}` attribute")]
    MalformedAttribute(&'static str),

    #[error("unknown opcode {opcode:#04x} at offset {offset}")]
    UnknownOpcode { opcode: u8, offset: usize },

    #[error("truncated instruction at offset {0}")]
    TruncatedInstruction(usize),

    #[error("`wide` at offset {offset} cannot modify opcode {opcode:#04x}")]
    BadWideOpcode { opcode: u8, offset: usize },

    #[error("switch at offset {0} has a negative case count")]
    BadSwitchBounds(usize),

    /// Jump from the instruction at `offset` lands outside of the method body
    #[error("branch at offset {offset} targets invalid offset {target}")]
    InvalidBranchTarget { offset: usize, target: i64 },

    #[error("IO error: {0}")]
    IoError(io::Error),
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Error {
        if err.kind() == io::ErrorKind::UnexpectedEof {
            Error::Truncated
        } else {
            Error::IoError(err)
        }
    }
}
