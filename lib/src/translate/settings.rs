/// Options controlling the conversion
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// Run the nop-elimination pass on every method body
    pub eliminate_nops: bool,

    /// Turn `ldc` of an `int` that fits the short immediate field into `const.i` (instead of
    /// `const.w`)
    pub fold_small_constants: bool,

    /// Emit line number tables
    ///
    /// Without them, the output is smaller but runtime errors cannot be traced back to source
    /// lines.
    pub line_numbers: bool,
}

impl Default for Settings {
    fn default() -> Settings {
        Settings {
            eliminate_nops: false,
            fold_small_constants: true,
            line_numbers: true,
        }
    }
}
