//! Target format of the converter: the instruction set and class image of the tiny VM
//!
//! All multi-byte fields are little-endian. Method bodies are sequences of [`Record`]s, whose
//! layout is fixed by the [`Format`] of their opcode.

mod binary_format;
mod class_file;
mod opcode;
mod record;

pub use binary_format::*;
pub use class_file::*;
pub use opcode::*;
pub use record::*;
