//! Read JVM classes
//!
//! The reader covers the parts of the [class file format][0] needed for conversion: the constant
//! pool, fields, methods, and the `Code`, `LineNumberTable`, `ConstantValue`, and `SourceFile`
//! attributes. Everything else is kept as raw attributes and ignored.
//!
//! ### Simple example
//!
//! ```no_run
//! use class2tiny::jvm::bytecode::decode;
//! use class2tiny::jvm::class_file::ClassFile;
//! use class2tiny::jvm::Error;
//!
//! # fn list_methods(bytes: &[u8]) -> Result<(), Error> {
//! let class = ClassFile::parse(bytes)?;
//! println!("class {} ({})", class.name()?, class.version);
//! for method in &class.methods {
//!     let signature = method.signature(&class.constants)?;
//!     if let Some(code) = method.code(&class.constants)? {
//!         let lines = code.line_numbers(&class.constants)?;
//!         let decoded = decode(&code.code_array, &lines)?;
//!         println!("  {}: {} instructions", signature, decoded.len());
//!     }
//! }
//! # Ok(())
//! # }
//! ```
//!
//! [0]: https://docs.oracle.com/javase/specs/jvms/se15/html/jvms-4.html

mod access_flags;
pub mod bytecode;
pub mod class_file;
mod errors;

pub use access_flags::*;
pub use errors::*;
