//! Conversion of JVM classes into tiny classes
//!
//! Per method, the pipeline is: decode the bytecode ([`crate::jvm::bytecode`]), build the IR
//! ([`MethodTranslator`]), optionally run passes ([`crate::ir::passes`]), and emit records
//! ([`emit`]). [`Converter`] runs this for every method of a class and writes the class image.

mod builder;
mod class;
mod emitter;
mod errors;
mod pool;
mod settings;
mod symbols;

pub use builder::*;
pub use class::*;
pub use emitter::*;
pub use errors::*;
pub use pool::*;
pub use settings::*;
pub use symbols::*;
