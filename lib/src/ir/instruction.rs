use crate::tiny::{Format, Opcode, Record};
use crate::util::Width;
use std::fmt;

/// Reference to an instruction by its position in the method's instruction sequence
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InsnRef(pub usize);

impl fmt::Display for InsnRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "@{}", self.0)
    }
}

/// Register of the tiny VM
///
/// Local variable slots map directly onto registers `0..=253`. The last two register numbers
/// are reserved for the program counter and the top of the operand stack.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct Reg(pub u8);

impl Reg {
    pub const PC: Reg = Reg(254);
    pub const STACK: Reg = Reg(255);

    /// Register for a local variable slot, if the slot is addressable
    pub fn local(slot: u16) -> Option<Reg> {
        if slot < Reg::PC.0 as u16 {
            Some(Reg(slot as u8))
        } else {
            None
        }
    }

    /// Value in the 6-bit register field of `ShortImmReg` records
    pub fn short_field(self) -> Option<u8> {
        if self == Reg::STACK {
            Some(Record::SHORT_REG_MAX)
        } else if self.0 < Record::SHORT_REG_MAX {
            Some(self.0)
        } else {
            None
        }
    }
}

impl fmt::Display for Reg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Reg::PC => f.write_str("pc"),
            Reg::STACK => f.write_str("sp"),
            Reg(n) => write!(f, "r{}", n),
        }
    }
}

/// Signed displacement, either a plain value or a jump to be resolved in the emitter
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Disp {
    Value(i32),
    Branch(InsnRef),
}

impl Disp {
    fn map_target(&self, remap: &mut impl FnMut(InsnRef) -> InsnRef) -> Disp {
        match self {
            Disp::Value(value) => Disp::Value(*value),
            Disp::Branch(target) => Disp::Branch(remap(*target)),
        }
    }
}

impl fmt::Display for Disp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Disp::Value(value) => write!(f, "{}", value),
            Disp::Branch(target) => write!(f, "{}", target),
        }
    }
}

/// One entry inside a multi-target instruction
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Parameter {
    Values(u16, u16),
    Target(InsnRef),
}

impl Parameter {
    /// 32-bit value split into its high and low halves
    pub fn value(value: i32) -> Parameter {
        let bits = value as u32;
        Parameter::Values((bits >> 16) as u16, bits as u16)
    }
}

impl fmt::Display for Parameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Parameter::Values(hi, lo) => {
                write!(f, "{}", (((*hi as u32) << 16) | *lo as u32) as i32)
            }
            Parameter::Target(target) => write!(f, "{}", target),
        }
    }
}

/// Operand payload of an instruction
///
/// Which shape an instruction must have is fixed by the [`Format`] of its opcode.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Shape {
    Bare,
    RegDisp { reg: Reg, disp: Disp },
    ShortImmReg { imm: Disp, reg: Reg },
    Two16 { hi: u16, lo: u16 },
    Switch { key: Reg, params: Vec<Parameter> },
}

impl Shape {
    /// Format this shape is encoded with
    pub fn format(&self) -> Format {
        match self {
            Shape::Bare => Format::Bare,
            Shape::RegDisp { .. } => Format::RegDisp,
            Shape::ShortImmReg { .. } => Format::ShortImmReg,
            Shape::Two16 { .. } => Format::Two16,
            Shape::Switch { .. } => Format::Switch,
        }
    }
}

/// IR instruction
///
/// Instructions are values: rewrites build new instructions (see `with_shape` and
/// `map_targets`) and never mutate shared ones.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Instruction {
    pub opcode: Opcode,

    /// Line in the original source, or 0 when unknown
    pub source_line: u16,
    pub shape: Shape,
}

impl Instruction {
    pub fn new(opcode: Opcode, source_line: u16, shape: Shape) -> Instruction {
        Instruction {
            opcode,
            source_line,
            shape,
        }
    }

    /// Same operation at the same line, but with a different payload
    pub fn with_shape(&self, shape: Shape) -> Instruction {
        Instruction::new(self.opcode, self.source_line, shape)
    }

    /// Copy of the instruction with every instruction reference remapped
    pub fn map_targets(&self, mut remap: impl FnMut(InsnRef) -> InsnRef) -> Instruction {
        let shape = match &self.shape {
            Shape::Bare => Shape::Bare,
            Shape::RegDisp { reg, disp } => Shape::RegDisp {
                reg: *reg,
                disp: disp.map_target(&mut remap),
            },
            Shape::ShortImmReg { imm, reg } => Shape::ShortImmReg {
                imm: imm.map_target(&mut remap),
                reg: *reg,
            },
            Shape::Two16 { hi, lo } => Shape::Two16 { hi: *hi, lo: *lo },
            Shape::Switch { key, params } => Shape::Switch {
                key: *key,
                params: params
                    .iter()
                    .map(|param| match param {
                        Parameter::Values(hi, lo) => Parameter::Values(*hi, *lo),
                        Parameter::Target(target) => Parameter::Target(remap(*target)),
                    })
                    .collect(),
            },
        };
        self.with_shape(shape)
    }

    /// Every instruction referenced by this one, in operand order
    pub fn targets(&self) -> Vec<InsnRef> {
        match &self.shape {
            Shape::RegDisp {
                disp: Disp::Branch(target),
                ..
            }
            | Shape::ShortImmReg {
                imm: Disp::Branch(target),
                ..
            } => vec![*target],
            Shape::Switch { params, .. } => params
                .iter()
                .filter_map(|param| match param {
                    Parameter::Target(target) => Some(*target),
                    Parameter::Values(_, _) => None,
                })
                .collect(),
            _ => vec![],
        }
    }
}

/// Encoded length, derived from the opcode format (plus parameters for switches)
impl Width for Instruction {
    fn width(&self) -> usize {
        match &self.shape {
            Shape::Switch { params, .. } => {
                Format::Switch.record_len() + params.len() * Record::PARAMETER_LEN
            }
            _ => self.opcode.format().record_len(),
        }
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.opcode)?;
        match &self.shape {
            Shape::Bare => Ok(()),
            Shape::RegDisp { reg, disp } => write!(f, " {} {}", reg, disp),
            Shape::ShortImmReg { imm, reg } => write!(f, " {} {}", imm, reg),
            Shape::Two16 { hi, lo } => write!(f, " {} {}", hi, lo),
            Shape::Switch { key, params } => {
                write!(f, " {} [", key)?;
                for (i, param) in params.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", param)?;
                }
                f.write_str("]")
            }
        }
    }
}
