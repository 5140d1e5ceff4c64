//! Decoding of JVM method bodies into a flat list of operations
//!
//! The decoded form is slightly more regular than the raw bytecode:
//!
//!   - The "wide" instruction doesn't show up at all, but instead gets merged into the
//!     instruction it modifies
//!
//!   - Implicit-operand forms (`iload_2`, `astore_0`, ...) become their general form with an
//!     explicit local (`iload 2`, `astore 0`, ...)
//!
//!   - `ldc` becomes `ldc_w`, `goto_w` becomes `goto`, and `jsr_w` becomes `jsr`
//!
//!   - Relative jump offsets become absolute offsets into the code array
//!

use crate::jvm::class_file::LineNumber;
use crate::jvm::Error;
use byteorder::{BigEndian, ReadBytesExt};
use std::fmt;
use std::io::Cursor;

/// How the bytes following an opcode are laid out
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum OperandKind {
    /// No operand bytes
    Simple,

    /// No operand bytes, local index is part of the opcode (eg. `iload_2`)
    ImplicitLocal,

    /// Unsigned byte local index
    Local,

    /// Unsigned byte local index, signed byte increment
    LocalIncrement,

    /// Signed byte immediate
    Byte,

    /// Signed short immediate
    Short,

    /// Unsigned byte primitive array type code
    ArrayType,

    /// Unsigned byte constant pool index
    ConstantByte,

    /// Unsigned short constant pool index
    Constant,

    /// Unsigned short constant pool index, unsigned byte count, zero byte
    InterfaceMethod,

    /// Unsigned short constant pool index, two zero bytes
    DynamicMethod,

    /// Unsigned short constant pool index, unsigned byte dimensions
    MultiArray,

    /// Signed short relative jump
    Branch,

    /// Signed int relative jump
    WideBranch,

    TableSwitch,

    LookupSwitch,

    /// Modifies the next instruction to take wider operands
    Wide,
}

/// Name and operand layout of every defined opcode
pub fn opcode_info(opcode: u8) -> Option<(&'static str, OperandKind)> {
    use OperandKind::*;

    let info = match opcode {
        0x00 => ("nop", Simple),
        0x01 => ("aconst_null", Simple),
        0x02 => ("iconst_m1", Simple),
        0x03 => ("iconst_0", Simple),
        0x04 => ("iconst_1", Simple),
        0x05 => ("iconst_2", Simple),
        0x06 => ("iconst_3", Simple),
        0x07 => ("iconst_4", Simple),
        0x08 => ("iconst_5", Simple),
        0x09 => ("lconst_0", Simple),
        0x0a => ("lconst_1", Simple),
        0x0b => ("fconst_0", Simple),
        0x0c => ("fconst_1", Simple),
        0x0d => ("fconst_2", Simple),
        0x0e => ("dconst_0", Simple),
        0x0f => ("dconst_1", Simple),
        0x10 => ("bipush", Byte),
        0x11 => ("sipush", Short),
        0x12 => ("ldc", ConstantByte),
        0x13 => ("ldc_w", Constant),
        0x14 => ("ldc2_w", Constant),
        0x15 => ("iload", Local),
        0x16 => ("lload", Local),
        0x17 => ("fload", Local),
        0x18 => ("dload", Local),
        0x19 => ("aload", Local),
        0x1a => ("iload_0", ImplicitLocal),
        0x1b => ("iload_1", ImplicitLocal),
        0x1c => ("iload_2", ImplicitLocal),
        0x1d => ("iload_3", ImplicitLocal),
        0x1e => ("lload_0", ImplicitLocal),
        0x1f => ("lload_1", ImplicitLocal),
        0x20 => ("lload_2", ImplicitLocal),
        0x21 => ("lload_3", ImplicitLocal),
        0x22 => ("fload_0", ImplicitLocal),
        0x23 => ("fload_1", ImplicitLocal),
        0x24 => ("fload_2", ImplicitLocal),
        0x25 => ("fload_3", ImplicitLocal),
        0x26 => ("dload_0", ImplicitLocal),
        0x27 => ("dload_1", ImplicitLocal),
        0x28 => ("dload_2", ImplicitLocal),
        0x29 => ("dload_3", ImplicitLocal),
        0x2a => ("aload_0", ImplicitLocal),
        0x2b => ("aload_1", ImplicitLocal),
        0x2c => ("aload_2", ImplicitLocal),
        0x2d => ("aload_3", ImplicitLocal),
        0x2e => ("iaload", Simple),
        0x2f => ("laload", Simple),
        0x30 => ("faload", Simple),
        0x31 => ("daload", Simple),
        0x32 => ("aaload", Simple),
        0x33 => ("baload", Simple),
        0x34 => ("caload", Simple),
        0x35 => ("saload", Simple),
        0x36 => ("istore", Local),
        0x37 => ("lstore", Local),
        0x38 => ("fstore", Local),
        0x39 => ("dstore", Local),
        0x3a => ("astore", Local),
        0x3b => ("istore_0", ImplicitLocal),
        0x3c => ("istore_1", ImplicitLocal),
        0x3d => ("istore_2", ImplicitLocal),
        0x3e => ("istore_3", ImplicitLocal),
        0x3f => ("lstore_0", ImplicitLocal),
        0x40 => ("lstore_1", ImplicitLocal),
        0x41 => ("lstore_2", ImplicitLocal),
        0x42 => ("lstore_3", ImplicitLocal),
        0x43 => ("fstore_0", ImplicitLocal),
        0x44 => ("fstore_1", ImplicitLocal),
        0x45 => ("fstore_2", ImplicitLocal),
        0x46 => ("fstore_3", ImplicitLocal),
        0x47 => ("dstore_0", ImplicitLocal),
        0x48 => ("dstore_1", ImplicitLocal),
        0x49 => ("dstore_2", ImplicitLocal),
        0x4a => ("dstore_3", ImplicitLocal),
        0x4b => ("astore_0", ImplicitLocal),
        0x4c => ("astore_1", ImplicitLocal),
        0x4d => ("astore_2", ImplicitLocal),
        0x4e => ("astore_3", ImplicitLocal),
        0x4f => ("iastore", Simple),
        0x50 => ("lastore", Simple),
        0x51 => ("fastore", Simple),
        0x52 => ("dastore", Simple),
        0x53 => ("aastore", Simple),
        0x54 => ("bastore", Simple),
        0x55 => ("castore", Simple),
        0x56 => ("sastore", Simple),
        0x57 => ("pop", Simple),
        0x58 => ("pop2", Simple),
        0x59 => ("dup", Simple),
        0x5a => ("dup_x1", Simple),
        0x5b => ("dup_x2", Simple),
        0x5c => ("dup2", Simple),
        0x5d => ("dup2_x1", Simple),
        0x5e => ("dup2_x2", Simple),
        0x5f => ("swap", Simple),
        0x60 => ("iadd", Simple),
        0x61 => ("ladd", Simple),
        0x62 => ("fadd", Simple),
        0x63 => ("dadd", Simple),
        0x64 => ("isub", Simple),
        0x65 => ("lsub", Simple),
        0x66 => ("fsub", Simple),
        0x67 => ("dsub", Simple),
        0x68 => ("imul", Simple),
        0x69 => ("lmul", Simple),
        0x6a => ("fmul", Simple),
        0x6b => ("dmul", Simple),
        0x6c => ("idiv", Simple),
        0x6d => ("ldiv", Simple),
        0x6e => ("fdiv", Simple),
        0x6f => ("ddiv", Simple),
        0x70 => ("irem", Simple),
        0x71 => ("lrem", Simple),
        0x72 => ("frem", Simple),
        0x73 => ("drem", Simple),
        0x74 => ("ineg", Simple),
        0x75 => ("lneg", Simple),
        0x76 => ("fneg", Simple),
        0x77 => ("dneg", Simple),
        0x78 => ("ishl", Simple),
        0x79 => ("lshl", Simple),
        0x7a => ("ishr", Simple),
        0x7b => ("lshr", Simple),
        0x7c => ("iushr", Simple),
        0x7d => ("lushr", Simple),
        0x7e => ("iand", Simple),
        0x7f => ("land", Simple),
        0x80 => ("ior", Simple),
        0x81 => ("lor", Simple),
        0x82 => ("ixor", Simple),
        0x83 => ("lxor", Simple),
        0x84 => ("iinc", LocalIncrement),
        0x85 => ("i2l", Simple),
        0x86 => ("i2f", Simple),
        0x87 => ("i2d", Simple),
        0x88 => ("l2i", Simple),
        0x89 => ("l2f", Simple),
        0x8a => ("l2d", Simple),
        0x8b => ("f2i", Simple),
        0x8c => ("f2l", Simple),
        0x8d => ("f2d", Simple),
        0x8e => ("d2i", Simple),
        0x8f => ("d2l", Simple),
        0x90 => ("d2f", Simple),
        0x91 => ("i2b", Simple),
        0x92 => ("i2c", Simple),
        0x93 => ("i2s", Simple),
        0x94 => ("lcmp", Simple),
        0x95 => ("fcmpl", Simple),
        0x96 => ("fcmpg", Simple),
        0x97 => ("dcmpl", Simple),
        0x98 => ("dcmpg", Simple),
        0x99 => ("ifeq", Branch),
        0x9a => ("ifne", Branch),
        0x9b => ("iflt", Branch),
        0x9c => ("ifge", Branch),
        0x9d => ("ifgt", Branch),
        0x9e => ("ifle", Branch),
        0x9f => ("if_icmpeq", Branch),
        0xa0 => ("if_icmpne", Branch),
        0xa1 => ("if_icmplt", Branch),
        0xa2 => ("if_icmpge", Branch),
        0xa3 => ("if_icmpgt", Branch),
        0xa4 => ("if_icmple", Branch),
        0xa5 => ("if_acmpeq", Branch),
        0xa6 => ("if_acmpne", Branch),
        0xa7 => ("goto", Branch),
        0xa8 => ("jsr", Branch),
        0xa9 => ("ret", Local),
        0xaa => ("tableswitch", TableSwitch),
        0xab => ("lookupswitch", LookupSwitch),
        0xac => ("ireturn", Simple),
        0xad => ("lreturn", Simple),
        0xae => ("freturn", Simple),
        0xaf => ("dreturn", Simple),
        0xb0 => ("areturn", Simple),
        0xb1 => ("return", Simple),
        0xb2 => ("getstatic", Constant),
        0xb3 => ("putstatic", Constant),
        0xb4 => ("getfield", Constant),
        0xb5 => ("putfield", Constant),
        0xb6 => ("invokevirtual", Constant),
        0xb7 => ("invokespecial", Constant),
        0xb8 => ("invokestatic", Constant),
        0xb9 => ("invokeinterface", InterfaceMethod),
        0xba => ("invokedynamic", DynamicMethod),
        0xbb => ("new", Constant),
        0xbc => ("newarray", ArrayType),
        0xbd => ("anewarray", Constant),
        0xbe => ("arraylength", Simple),
        0xbf => ("athrow", Simple),
        0xc0 => ("checkcast", Constant),
        0xc1 => ("instanceof", Constant),
        0xc2 => ("monitorenter", Simple),
        0xc3 => ("monitorexit", Simple),
        0xc4 => ("wide", Wide),
        0xc5 => ("multianewarray", MultiArray),
        0xc6 => ("ifnull", Branch),
        0xc7 => ("ifnonnull", Branch),
        0xc8 => ("goto_w", WideBranch),
        0xc9 => ("jsr_w", WideBranch),
        _ => return None,
    };
    Some(info)
}

/// Typed operands of a decoded operation
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Operands {
    None,

    /// Local variable index
    Local(u16),

    /// Local variable index and increment (`iinc`)
    Increment(u16, i16),

    /// Immediate (`bipush`, `sipush`, `newarray`)
    Immediate(i32),

    /// Constant pool index
    Constant(u16),

    /// Constant pool index and argument count (`invokeinterface`)
    Interface(u16, u8),

    /// Constant pool index and dimensions (`multianewarray`)
    MultiArray(u16, u8),

    /// Absolute jump target
    Branch(u32),

    TableSwitch {
        default: u32,
        low: i32,
        targets: Vec<u32>,
    },

    LookupSwitch {
        default: u32,
        pairs: Vec<(i32, u32)>,
    },
}

/// Decoded source operation
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SourceOp {
    /// Canonical opcode (never `wide`, `ldc`, `goto_w`, `jsr_w`, or an implicit-local form)
    pub opcode: u8,
    pub operands: Operands,
}

impl SourceOp {
    pub fn name(&self) -> &'static str {
        opcode_info(self.opcode).map_or("<unknown>", |(name, _)| name)
    }

    /// Every absolute jump target used by the operation
    pub fn jump_targets(&self) -> Vec<u32> {
        match &self.operands {
            Operands::Branch(target) => vec![*target],
            Operands::TableSwitch {
                default, targets, ..
            } => {
                let mut all = vec![*default];
                all.extend(targets.iter().copied());
                all
            }
            Operands::LookupSwitch { default, pairs } => {
                let mut all = vec![*default];
                all.extend(pairs.iter().map(|(_, target)| *target));
                all
            }
            _ => vec![],
        }
    }
}

impl fmt::Display for SourceOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())?;
        match &self.operands {
            Operands::None => Ok(()),
            Operands::Local(local) => write!(f, " {}", local),
            Operands::Increment(local, by) => write!(f, " {} {}", local, by),
            Operands::Immediate(value) => write!(f, " {}", value),
            Operands::Constant(index) => write!(f, " #{}", index),
            Operands::Interface(index, count) => write!(f, " #{} {}", index, count),
            Operands::MultiArray(index, dims) => write!(f, " #{} {}", index, dims),
            Operands::Branch(target) => write!(f, " @{}", target),
            Operands::TableSwitch {
                default,
                low,
                targets,
            } => {
                write!(f, " low={} default=@{}", low, default)?;
                for target in targets {
                    write!(f, " @{}", target)?;
                }
                Ok(())
            }
            Operands::LookupSwitch { default, pairs } => {
                write!(f, " default=@{}", default)?;
                for (key, target) in pairs {
                    write!(f, " {}:@{}", key, target)?;
                }
                Ok(())
            }
        }
    }
}

/// Decoded operation, along with where it came from
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DecodedInsn {
    /// Offset of the first byte (the `wide` prefix, if there is one)
    pub offset: u32,

    /// Source line, or 0 when unknown
    pub line: u16,

    pub op: SourceOp,
}

/// Decode a whole method body
///
/// `lines` must be sorted by `start_pc`. Every jump target is checked to be inside the code
/// array, but not to be at the start of an instruction.
pub fn decode(code: &[u8], lines: &[LineNumber]) -> Result<Vec<DecodedInsn>, Error> {
    let mut cursor = Cursor::new(code);
    let mut decoded = vec![];

    while (cursor.position() as usize) < code.len() {
        let offset = cursor.position() as usize;
        let op = decode_one(&mut cursor, offset).map_err(|err| match err {
            Error::Truncated => Error::TruncatedInstruction(offset),
            other => other,
        })?;
        for target in op.jump_targets() {
            if target as usize >= code.len() {
                return Err(Error::InvalidBranchTarget {
                    offset,
                    target: target as i64,
                });
            }
        }
        decoded.push(DecodedInsn {
            offset: offset as u32,
            line: line_at(lines, offset as u32),
            op,
        });
    }

    Ok(decoded)
}

/// Line of the entry with the greatest `start_pc` at or before `offset`
pub fn line_at(lines: &[LineNumber], offset: u32) -> u16 {
    let after = lines.partition_point(|line| line.start_pc as u32 <= offset);
    if after == 0 {
        0
    } else {
        lines[after - 1].line_number
    }
}

/// Turn a relative jump from `offset` into an absolute one
fn jump(offset: usize, relative: i32) -> Result<u32, Error> {
    let target = offset as i64 + relative as i64;
    u32::try_from(target).map_err(|_| Error::InvalidBranchTarget { offset, target })
}

fn decode_one(cursor: &mut Cursor<&[u8]>, offset: usize) -> Result<SourceOp, Error> {
    let opcode = cursor.read_u8()?;
    let (_, kind) = opcode_info(opcode).ok_or(Error::UnknownOpcode { opcode, offset })?;

    let op = match kind {
        OperandKind::Simple => SourceOp {
            opcode,
            operands: Operands::None,
        },
        OperandKind::ImplicitLocal => {
            // Groups of four, in the same order as the general forms
            let (base, general) = if opcode < 0x3b { (0x1a, 0x15) } else { (0x3b, 0x36) };
            let relative = opcode - base;
            SourceOp {
                opcode: general + relative / 4,
                operands: Operands::Local((relative % 4) as u16),
            }
        }
        OperandKind::Local => SourceOp {
            opcode,
            operands: Operands::Local(cursor.read_u8()? as u16),
        },
        OperandKind::LocalIncrement => {
            let local = cursor.read_u8()? as u16;
            let increment = cursor.read_i8()? as i16;
            SourceOp {
                opcode,
                operands: Operands::Increment(local, increment),
            }
        }
        OperandKind::Byte => SourceOp {
            opcode,
            operands: Operands::Immediate(cursor.read_i8()? as i32),
        },
        OperandKind::Short => SourceOp {
            opcode,
            operands: Operands::Immediate(cursor.read_i16::<BigEndian>()? as i32),
        },
        OperandKind::ArrayType => SourceOp {
            opcode,
            operands: Operands::Immediate(cursor.read_u8()? as i32),
        },
        OperandKind::ConstantByte => SourceOp {
            opcode: 0x13,
            operands: Operands::Constant(cursor.read_u8()? as u16),
        },
        OperandKind::Constant => SourceOp {
            opcode,
            operands: Operands::Constant(cursor.read_u16::<BigEndian>()?),
        },
        OperandKind::InterfaceMethod => {
            let index = cursor.read_u16::<BigEndian>()?;
            let count = cursor.read_u8()?;
            let _zero = cursor.read_u8()?;
            SourceOp {
                opcode,
                operands: Operands::Interface(index, count),
            }
        }
        OperandKind::DynamicMethod => {
            let index = cursor.read_u16::<BigEndian>()?;
            let _zero = cursor.read_u16::<BigEndian>()?;
            SourceOp {
                opcode,
                operands: Operands::Constant(index),
            }
        }
        OperandKind::MultiArray => {
            let index = cursor.read_u16::<BigEndian>()?;
            let dimensions = cursor.read_u8()?;
            SourceOp {
                opcode,
                operands: Operands::MultiArray(index, dimensions),
            }
        }
        OperandKind::Branch => SourceOp {
            opcode,
            operands: Operands::Branch(jump(offset, cursor.read_i16::<BigEndian>()? as i32)?),
        },
        OperandKind::WideBranch => SourceOp {
            // `goto_w` -> `goto`, `jsr_w` -> `jsr`
            opcode: opcode - 0x21,
            operands: Operands::Branch(jump(offset, cursor.read_i32::<BigEndian>()?)?),
        },
        OperandKind::TableSwitch => {
            skip_padding(cursor, offset)?;
            let default = jump(offset, cursor.read_i32::<BigEndian>()?)?;
            let low = cursor.read_i32::<BigEndian>()?;
            let high = cursor.read_i32::<BigEndian>()?;
            if high < low {
                return Err(Error::BadSwitchBounds(offset));
            }
            let mut targets = vec![];
            for _ in low..=high {
                targets.push(jump(offset, cursor.read_i32::<BigEndian>()?)?);
            }
            SourceOp {
                opcode,
                operands: Operands::TableSwitch {
                    default,
                    low,
                    targets,
                },
            }
        }
        OperandKind::LookupSwitch => {
            skip_padding(cursor, offset)?;
            let default = jump(offset, cursor.read_i32::<BigEndian>()?)?;
            let count = cursor.read_i32::<BigEndian>()?;
            if count < 0 {
                return Err(Error::BadSwitchBounds(offset));
            }
            let mut pairs = vec![];
            for _ in 0..count {
                let key = cursor.read_i32::<BigEndian>()?;
                pairs.push((key, jump(offset, cursor.read_i32::<BigEndian>()?)?));
            }
            SourceOp {
                opcode,
                operands: Operands::LookupSwitch { default, pairs },
            }
        }
        OperandKind::Wide => {
            let modified = cursor.read_u8()?;
            match modified {
                0x15..=0x19 | 0x36..=0x3a | 0xa9 => SourceOp {
                    opcode: modified,
                    operands: Operands::Local(cursor.read_u16::<BigEndian>()?),
                },
                0x84 => {
                    let local = cursor.read_u16::<BigEndian>()?;
                    let increment = cursor.read_i16::<BigEndian>()?;
                    SourceOp {
                        opcode: modified,
                        operands: Operands::Increment(local, increment),
                    }
                }
                _ => {
                    return Err(Error::BadWideOpcode {
                        opcode: modified,
                        offset,
                    })
                }
            }
        }
    };
    Ok(op)
}

/// Switch operands start at a multiple of four bytes from the start of the method
fn skip_padding(cursor: &mut Cursor<&[u8]>, offset: usize) -> Result<(), Error> {
    let padding = (4 - (offset + 1) % 4) % 4;
    for _ in 0..padding {
        cursor.read_u8()?;
    }
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;

    fn ops(code: &[u8]) -> Vec<(u32, SourceOp)> {
        decode(code, &[])
            .unwrap()
            .into_iter()
            .map(|insn| (insn.offset, insn.op))
            .collect()
    }

    fn op(opcode: u8, operands: Operands) -> SourceOp {
        SourceOp { opcode, operands }
    }

    #[test]
    fn implicit_locals_are_normalized() {
        let decoded = ops(&[0x1c, 0x2a, 0x4e, 0x47, 0x15, 0x07]);
        assert_eq!(
            decoded,
            vec![
                (0, op(0x15, Operands::Local(2))),
                (1, op(0x19, Operands::Local(0))),
                (2, op(0x3a, Operands::Local(3))),
                (3, op(0x39, Operands::Local(0))),
                (4, op(0x15, Operands::Local(7))),
            ]
        );
    }

    #[test]
    fn wide_forms() {
        let decoded = ops(&[
            0xc4, 0x15, 0x01, 0x00, // wide iload 256
            0xc4, 0x84, 0x00, 0x03, 0xff, 0xfb, // wide iinc 3 -5
            0x84, 0x03, 0xfb, // iinc 3 -5
        ]);
        assert_eq!(
            decoded,
            vec![
                (0, op(0x15, Operands::Local(256))),
                (4, op(0x84, Operands::Increment(3, -5))),
                (10, op(0x84, Operands::Increment(3, -5))),
            ]
        );
        assert!(matches!(
            decode(&[0xc4, 0x60], &[]),
            Err(Error::BadWideOpcode {
                opcode: 0x60,
                offset: 0
            })
        ));
    }

    #[test]
    fn ldc_and_wide_jumps_are_normalized() {
        let decoded = ops(&[
            0x12, 0x05, // ldc #5
            0x13, 0x01, 0x02, // ldc_w #258
            0xc8, 0xff, 0xff, 0xff, 0xfb, // goto_w -5
        ]);
        assert_eq!(
            decoded,
            vec![
                (0, op(0x13, Operands::Constant(5))),
                (2, op(0x13, Operands::Constant(258))),
                (5, op(0xa7, Operands::Branch(0))),
            ]
        );
    }

    #[test]
    fn tableswitch_padding_depends_on_offset() {
        for prefix in 0..4usize {
            let mut code = vec![0x00; prefix];
            code.push(0xaa);
            let padding = (4 - (prefix + 1) % 4) % 4;
            code.extend(vec![0xee; padding]);
            // default, low = 1, high = 2, two targets
            let switch_at = prefix as i32;
            for rel in [-switch_at, 1, 2, -switch_at, -switch_at] {
                code.extend(rel.to_be_bytes());
            }

            let decoded = decode(&code, &[]).unwrap();
            assert_eq!(decoded.len(), prefix + 1);
            let last = decoded.last().unwrap();
            assert_eq!(last.offset, prefix as u32);
            assert_eq!(
                last.op.operands,
                Operands::TableSwitch {
                    default: 0,
                    low: 1,
                    targets: vec![0, 0]
                }
            );
        }
    }

    #[test]
    fn lookupswitch() {
        let mut code = vec![0x00, 0xab, 0x00, 0x00];
        for word in [-1i32, 2, 10, -1, 20, -1] {
            code.extend(word.to_be_bytes());
        }
        assert_eq!(
            ops(&code)[1],
            (
                1,
                op(
                    0xab,
                    Operands::LookupSwitch {
                        default: 0,
                        pairs: vec![(10, 0), (20, 0)]
                    }
                )
            )
        );
    }

    #[test]
    fn negative_switch_counts() {
        let mut code = vec![0xab, 0, 0, 0];
        code.extend(0i32.to_be_bytes());
        code.extend((-1i32).to_be_bytes());
        assert!(matches!(decode(&code, &[]), Err(Error::BadSwitchBounds(0))));
    }

    #[test]
    fn unknown_opcode() {
        assert!(matches!(
            decode(&[0x00, 0xcb], &[]),
            Err(Error::UnknownOpcode {
                opcode: 0xcb,
                offset: 1
            })
        ));
    }

    #[test]
    fn truncated_operand() {
        assert!(matches!(
            decode(&[0x00, 0x11, 0x01], &[]),
            Err(Error::TruncatedInstruction(1))
        ));
    }

    #[test]
    fn branch_outside_code() {
        // goto +3 from a 3 byte method
        assert!(matches!(
            decode(&[0xa7, 0x00, 0x03], &[]),
            Err(Error::InvalidBranchTarget {
                offset: 0,
                target: 3
            })
        ));
        // goto -1
        assert!(matches!(
            decode(&[0xa7, 0xff, 0xff], &[]),
            Err(Error::InvalidBranchTarget {
                offset: 0,
                target: -1
            })
        ));
    }

    #[test]
    fn lines_come_from_the_closest_preceding_entry() {
        let lines = [
            LineNumber {
                start_pc: 1,
                line_number: 10,
            },
            LineNumber {
                start_pc: 3,
                line_number: 12,
            },
        ];
        let decoded = decode(&[0x00, 0x00, 0x00, 0x00, 0xb1], &lines).unwrap();
        let found: Vec<u16> = decoded.iter().map(|insn| insn.line).collect();
        assert_eq!(found, vec![0, 10, 10, 12, 12]);
    }
}
