//! Converter from JVM class files to the compact class images of the tiny VM
//!
//! ```no_run
//! let bytes = std::fs::read("Hello.class").unwrap();
//! match class2tiny::convert(&bytes) {
//!     Ok(output) => {
//!         for diagnostic in &output.diagnostics {
//!             eprintln!("skipped {}", diagnostic);
//!         }
//!         std::fs::write("Hello.tcls", &output.bytes).unwrap();
//!     }
//!     Err(diagnostics) => eprintln!("conversion failed: {}", diagnostics[0]),
//! }
//! ```

pub mod ir;
pub mod jvm;
pub mod tiny;
pub mod translate;
pub mod util;

use translate::{Converter, Diagnostic, Settings, SymbolTable, TinyClassBytes};

/// Convert a single class with default settings and a fresh symbol table
pub fn convert(class_bytes: &[u8]) -> Result<TinyClassBytes, Vec<Diagnostic>> {
    let settings = Settings::default();
    let symbols = SymbolTable::new();
    Converter::new(&settings, &symbols).convert_class(class_bytes)
}
