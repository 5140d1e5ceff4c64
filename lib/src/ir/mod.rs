//! Intermediate representation shared by the builder, the passes, and the emitter

mod instruction;
mod method;
pub mod passes;

pub use instruction::*;
pub use method::*;
