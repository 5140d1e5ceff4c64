//! Opcode table of the tiny instruction set
//!
//! Every opcode has exactly one [`Format`], and every format has a fixed record length, so the
//! size of an instruction is known from its opcode alone (switches add one 4-byte record per
//! parameter).

use std::fmt;

/// Record layout shared by a group of opcodes
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Format {
    /// `op`
    Bare,

    /// `op, reg:u8, disp:i16`
    RegDisp,

    /// `op`, then a 24-bit word `imm:s18 << 6 | reg:u6`
    ShortImmReg,

    /// `op, hi:u16, lo:u16`
    Two16,

    /// `op, key:u8, count:u16`, followed by `count` parameter records
    Switch,
}

impl Format {
    /// Byte length of the (header) record
    pub const fn record_len(self) -> usize {
        match self {
            Format::Bare => 1,
            Format::RegDisp => 4,
            Format::ShortImmReg => 4,
            Format::Two16 => 5,
            Format::Switch => 4,
        }
    }
}

macro_rules! define_opcodes {
    (
        $( $(#[$doc:meta])* $name:ident = $opcode:literal, $mnemonic:literal, $format:ident; )*
    ) => {
        /// Tiny VM opcode
        #[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
        #[repr(u8)]
        pub enum Opcode {
            $(
                $(#[$doc])*
                $name = $opcode,
            )*
        }

        impl Opcode {
            /// Every opcode, in ascending byte order
            pub const ALL: &'static [Opcode] = &[$( Opcode::$name, )*];

            pub const fn from_byte(byte: u8) -> Option<Opcode> {
                match byte {
                    $( $opcode => Some(Opcode::$name), )*
                    _ => None,
                }
            }

            /// Mnemonic used in disassembly
            pub const fn mnemonic(self) -> &'static str {
                match self {
                    $( Opcode::$name => $mnemonic, )*
                }
            }

            pub const fn format(self) -> Format {
                match self {
                    $( Opcode::$name => Format::$format, )*
                }
            }
        }
    };
}

define_opcodes! {
    Nop = 0x00, "nop", Bare;
    ConstNull = 0x01, "const.null", Bare;
    ConstL0 = 0x02, "const.l0", Bare;
    ConstL1 = 0x03, "const.l1", Bare;
    ConstF0 = 0x04, "const.f0", Bare;
    ConstF1 = 0x05, "const.f1", Bare;
    ConstF2 = 0x06, "const.f2", Bare;
    ConstD0 = 0x07, "const.d0", Bare;
    ConstD1 = 0x08, "const.d1", Bare;

    ALoadI = 0x10, "aload.i", Bare;
    ALoadL = 0x11, "aload.l", Bare;
    ALoadF = 0x12, "aload.f", Bare;
    ALoadD = 0x13, "aload.d", Bare;
    ALoadA = 0x14, "aload.a", Bare;
    ALoadB = 0x15, "aload.b", Bare;
    ALoadC = 0x16, "aload.c", Bare;
    ALoadS = 0x17, "aload.s", Bare;
    AStoreI = 0x18, "astore.i", Bare;
    AStoreL = 0x19, "astore.l", Bare;
    AStoreF = 0x1a, "astore.f", Bare;
    AStoreD = 0x1b, "astore.d", Bare;
    AStoreA = 0x1c, "astore.a", Bare;
    AStoreB = 0x1d, "astore.b", Bare;
    AStoreC = 0x1e, "astore.c", Bare;
    AStoreS = 0x1f, "astore.s", Bare;

    Pop = 0x20, "pop", Bare;
    Pop2 = 0x21, "pop2", Bare;
    Dup = 0x22, "dup", Bare;
    DupX1 = 0x23, "dup.x1", Bare;
    DupX2 = 0x24, "dup.x2", Bare;
    Dup2 = 0x25, "dup2", Bare;
    Dup2X1 = 0x26, "dup2.x1", Bare;
    Dup2X2 = 0x27, "dup2.x2", Bare;
    Swap = 0x28, "swap", Bare;

    AddI = 0x30, "add.i", Bare;
    AddL = 0x31, "add.l", Bare;
    AddF = 0x32, "add.f", Bare;
    AddD = 0x33, "add.d", Bare;
    SubI = 0x34, "sub.i", Bare;
    SubL = 0x35, "sub.l", Bare;
    SubF = 0x36, "sub.f", Bare;
    SubD = 0x37, "sub.d", Bare;
    MulI = 0x38, "mul.i", Bare;
    MulL = 0x39, "mul.l", Bare;
    MulF = 0x3a, "mul.f", Bare;
    MulD = 0x3b, "mul.d", Bare;
    DivI = 0x3c, "div.i", Bare;
    DivL = 0x3d, "div.l", Bare;
    DivF = 0x3e, "div.f", Bare;
    DivD = 0x3f, "div.d", Bare;
    RemI = 0x40, "rem.i", Bare;
    RemL = 0x41, "rem.l", Bare;
    RemF = 0x42, "rem.f", Bare;
    RemD = 0x43, "rem.d", Bare;
    NegI = 0x44, "neg.i", Bare;
    NegL = 0x45, "neg.l", Bare;
    NegF = 0x46, "neg.f", Bare;
    NegD = 0x47, "neg.d", Bare;
    ShlI = 0x48, "shl.i", Bare;
    ShlL = 0x49, "shl.l", Bare;
    ShrI = 0x4a, "shr.i", Bare;
    ShrL = 0x4b, "shr.l", Bare;
    UShrI = 0x4c, "ushr.i", Bare;
    UShrL = 0x4d, "ushr.l", Bare;
    AndI = 0x4e, "and.i", Bare;
    AndL = 0x4f, "and.l", Bare;
    OrI = 0x50, "or.i", Bare;
    OrL = 0x51, "or.l", Bare;
    XorI = 0x52, "xor.i", Bare;
    XorL = 0x53, "xor.l", Bare;

    I2L = 0x58, "i2l", Bare;
    I2F = 0x59, "i2f", Bare;
    I2D = 0x5a, "i2d", Bare;
    L2I = 0x5b, "l2i", Bare;
    L2F = 0x5c, "l2f", Bare;
    L2D = 0x5d, "l2d", Bare;
    F2I = 0x5e, "f2i", Bare;
    F2L = 0x5f, "f2l", Bare;
    F2D = 0x60, "f2d", Bare;
    D2I = 0x61, "d2i", Bare;
    D2L = 0x62, "d2l", Bare;
    D2F = 0x63, "d2f", Bare;
    I2B = 0x64, "i2b", Bare;
    I2C = 0x65, "i2c", Bare;
    I2S = 0x66, "i2s", Bare;

    CmpL = 0x68, "cmp.l", Bare;
    CmplF = 0x69, "cmpl.f", Bare;
    CmpgF = 0x6a, "cmpg.f", Bare;
    CmplD = 0x6b, "cmpl.d", Bare;
    CmpgD = 0x6c, "cmpg.d", Bare;

    RetI = 0x70, "ret.i", Bare;
    RetL = 0x71, "ret.l", Bare;
    RetF = 0x72, "ret.f", Bare;
    RetD = 0x73, "ret.d", Bare;
    RetA = 0x74, "ret.a", Bare;
    Ret = 0x75, "ret", Bare;
    ArrayLength = 0x76, "array.length", Bare;
    Throw = 0x77, "throw", Bare;
    MonitorEnter = 0x78, "monitor.enter", Bare;
    MonitorExit = 0x79, "monitor.exit", Bare;

    /// `reg` is the local, `disp` is always 0
    LoadI = 0x80, "load.i", RegDisp;
    LoadL = 0x81, "load.l", RegDisp;
    LoadF = 0x82, "load.f", RegDisp;
    LoadD = 0x83, "load.d", RegDisp;
    LoadA = 0x84, "load.a", RegDisp;
    StoreI = 0x85, "store.i", RegDisp;
    StoreL = 0x86, "store.l", RegDisp;
    StoreF = 0x87, "store.f", RegDisp;
    StoreD = 0x88, "store.d", RegDisp;
    StoreA = 0x89, "store.a", RegDisp;
    /// `reg` is the local, `disp` is the signed increment
    Inc = 0x8a, "inc", RegDisp;
    /// `reg` is the program counter, `disp` is the branch
    Goto = 0x8b, "goto", RegDisp;

    /// `reg` is the operand stack, `imm` is the value
    ConstI = 0x90, "const.i", ShortImmReg;
    IfEq = 0x91, "if.eq", ShortImmReg;
    IfNe = 0x92, "if.ne", ShortImmReg;
    IfLt = 0x93, "if.lt", ShortImmReg;
    IfGe = 0x94, "if.ge", ShortImmReg;
    IfGt = 0x95, "if.gt", ShortImmReg;
    IfLe = 0x96, "if.le", ShortImmReg;
    IfICmpEq = 0x97, "if.icmp.eq", ShortImmReg;
    IfICmpNe = 0x98, "if.icmp.ne", ShortImmReg;
    IfICmpLt = 0x99, "if.icmp.lt", ShortImmReg;
    IfICmpGe = 0x9a, "if.icmp.ge", ShortImmReg;
    IfICmpGt = 0x9b, "if.icmp.gt", ShortImmReg;
    IfICmpLe = 0x9c, "if.icmp.le", ShortImmReg;
    IfACmpEq = 0x9d, "if.acmp.eq", ShortImmReg;
    IfACmpNe = 0x9e, "if.acmp.ne", ShortImmReg;
    IfNull = 0x9f, "if.null", ShortImmReg;
    IfNonNull = 0xa0, "if.nonnull", ShortImmReg;

    /// 32-bit int split into `hi` and `lo` halves
    ConstW = 0xa8, "const.w", Two16;
    /// 32-bit float bits split into `hi` and `lo` halves
    ConstFw = 0xa9, "const.fw", Two16;
    /// `hi` is a constant table index
    LdcL = 0xaa, "ldc.l", Two16;
    LdcD = 0xab, "ldc.d", Two16;
    LdcStr = 0xac, "ldc.str", Two16;
    /// `hi` is a class id
    LdcClass = 0xad, "ldc.class", Two16;

    /// `hi` is a class id, `lo` is a member table index
    GetStatic = 0xb0, "get.static", Two16;
    PutStatic = 0xb1, "put.static", Two16;
    GetField = 0xb2, "get.field", Two16;
    PutField = 0xb3, "put.field", Two16;
    InvokeVirtual = 0xb4, "invoke.virtual", Two16;
    InvokeSpecial = 0xb5, "invoke.special", Two16;
    InvokeStatic = 0xb6, "invoke.static", Two16;
    InvokeInterface = 0xb7, "invoke.interface", Two16;

    New = 0xb8, "new", Two16;
    /// `hi` is the primitive element type code
    NewArray = 0xb9, "new.array", Two16;
    ANewArray = 0xba, "anew.array", Two16;
    /// `hi` is a class id, `lo` is the number of dimensions
    MultiANewArray = 0xbb, "multianew.array", Two16;
    CheckCast = 0xbc, "check.cast", Two16;
    InstanceOf = 0xbd, "instance.of", Two16;

    /// Parameters are `[low, high, default, case...]`
    TableSwitch = 0xc0, "table.switch", Switch;
    /// Parameters are `[default, (key, case)...]`
    LookupSwitch = 0xc1, "lookup.switch", Switch;
}

impl Opcode {
    /// Whether the switch parameter at `index` is a jump target (as opposed to values)
    ///
    /// Only meaningful for opcodes with the `Switch` format.
    pub fn switch_param_is_target(self, index: usize) -> bool {
        match self {
            Opcode::TableSwitch => index >= 2,
            _ => index % 2 == 0,
        }
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.mnemonic())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn bytes_round_trip_and_are_sorted() {
        for window in Opcode::ALL.windows(2) {
            assert!((window[0] as u8) < (window[1] as u8));
        }
        for opcode in Opcode::ALL {
            assert_eq!(Opcode::from_byte(*opcode as u8), Some(*opcode));
        }
        assert_eq!(Opcode::from_byte(0x09), None);
        assert_eq!(Opcode::from_byte(0xff), None);
    }

    #[test]
    fn groups_keep_their_formats() {
        assert_eq!(Opcode::XorL as u8, 0x53);
        assert_eq!(Opcode::I2S as u8, 0x66);
        assert_eq!(Opcode::Inc.format(), Format::RegDisp);
        assert_eq!(Opcode::IfNonNull.format(), Format::ShortImmReg);
        assert_eq!(Opcode::InstanceOf.format(), Format::Two16);
        assert_eq!(Opcode::LookupSwitch.format(), Format::Switch);
        assert_eq!(Opcode::DupX2.mnemonic(), "dup.x2");
    }

    #[test]
    fn switch_parameter_kinds() {
        let table: Vec<bool> = (0..5)
            .map(|i| Opcode::TableSwitch.switch_param_is_target(i))
            .collect();
        assert_eq!(table, vec![false, false, true, true, true]);
        let lookup: Vec<bool> = (0..5)
            .map(|i| Opcode::LookupSwitch.switch_param_is_target(i))
            .collect();
        assert_eq!(lookup, vec![true, false, true, false, true]);
    }
}
