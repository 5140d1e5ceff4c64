use super::{ClassPool, Error, Settings, SymbolTable};
use crate::ir::{Disp, Handler, InsnRef, Instruction, MethodBody, Parameter, Reg, Shape};
use crate::jvm::bytecode::{self, DecodedInsn, Operands, SourceOp};
use crate::jvm::class_file::{Code, Constant, ConstantIndex, ConstantPool, MemberRef};
use crate::jvm;
use crate::tiny::{ClassId, Opcode, Record, TinyConstant};

/// Context for translating one JVM method body into IR
///
/// Class names go into the process-wide symbol table, everything else the body refers to goes
/// into the per-class pool. The caller is responsible for rolling the pool back if translation
/// fails.
pub struct MethodTranslator<'a> {
    /// Translation settings
    settings: &'a Settings,

    /// Constant pool of the source class
    jvm_constants: &'a ConstantPool,

    /// Tables of the class being produced
    pool: &'a mut ClassPool,

    symbols: &'a SymbolTable,

    /// Offset of every decoded instruction, in order
    offsets: Vec<u32>,

    /// Length of the source code array
    code_len: usize,
}

impl<'a> MethodTranslator<'a> {
    pub fn new(
        settings: &'a Settings,
        jvm_constants: &'a ConstantPool,
        pool: &'a mut ClassPool,
        symbols: &'a SymbolTable,
    ) -> MethodTranslator<'a> {
        MethodTranslator {
            settings,
            jvm_constants,
            pool,
            symbols,
            offsets: vec![],
            code_len: 0,
        }
    }

    /// Translate a whole `Code` attribute
    pub fn translate(&mut self, code: &Code) -> Result<MethodBody, Error> {
        let lines = code.line_numbers(self.jvm_constants)?;
        let decoded = bytecode::decode(&code.code_array, &lines)?;
        self.offsets = decoded.iter().map(|insn| insn.offset).collect();
        self.code_len = code.code_array.len();

        let instructions = decoded
            .iter()
            .map(|insn| self.visit_instruction(insn))
            .collect::<Result<Vec<_>, Error>>()?;

        let mut handlers = vec![];
        for entry in &code.exception_table {
            let at = entry.handler_pc as usize;
            let end = if entry.end_pc as usize == self.code_len {
                InsnRef(instructions.len())
            } else {
                self.resolve(at, entry.end_pc as u32)?
            };
            let catch_type = if entry.catch_type.0 == 0 {
                None
            } else {
                Some(self.class_id(entry.catch_type)?)
            };
            handlers.push(Handler {
                start: self.resolve(at, entry.start_pc as u32)?,
                end,
                handler: self.resolve(at, entry.handler_pc as u32)?,
                catch_type,
            });
        }

        let body = MethodBody {
            instructions,
            handlers,
            max_stack: code.max_stack,
            max_locals: code.max_locals,
        };
        body.validate()?;
        Ok(body)
    }

    /// Position of the instruction starting at byte offset `target`
    fn resolve(&self, offset: usize, target: u32) -> Result<InsnRef, Error> {
        self.offsets
            .binary_search(&target)
            .map(InsnRef)
            .map_err(|_| Error::InvalidBranchTarget {
                offset,
                target: target as i64,
            })
    }

    fn class_id(&self, index: ConstantIndex) -> Result<ClassId, Error> {
        self.symbols.intern(self.jvm_constants.class_name(index)?)
    }

    fn visit_instruction(&mut self, insn: &DecodedInsn) -> Result<Instruction, Error> {
        let constants = self.jvm_constants;
        let DecodedInsn { offset, line, op } = insn;
        let offset = *offset as usize;
        let SourceOp { opcode, operands } = op;
        let opcode = *opcode;

        let (tiny_opcode, shape) = match (opcode, operands) {
            (0x00..=0x01, Operands::None) => (tiny(opcode)?, Shape::Bare),

            // iconst_m1 .. iconst_5
            (0x02..=0x08, Operands::None) => const_int(opcode as i32 - 3),

            // lconst_*, fconst_*, dconst_*
            (0x09..=0x0f, Operands::None) => (tiny(opcode - 0x07)?, Shape::Bare),

            // bipush, sipush
            (0x10..=0x11, Operands::Immediate(value)) => const_int(*value),

            // ldc_w, ldc2_w
            (0x13..=0x14, Operands::Constant(index)) => {
                self.visit_ldc(opcode == 0x14, ConstantIndex(*index))?
            }

            // loads and stores
            (0x15..=0x19, Operands::Local(local)) => load_store(opcode - 0x15 + 0x80, *local)?,
            (0x36..=0x3a, Operands::Local(local)) => load_store(opcode - 0x36 + 0x85, *local)?,

            // array loads and stores
            (0x2e..=0x35, Operands::None) => (tiny(opcode - 0x2e + 0x10)?, Shape::Bare),
            (0x4f..=0x56, Operands::None) => (tiny(opcode - 0x4f + 0x18)?, Shape::Bare),

            // pop .. swap
            (0x57..=0x5f, Operands::None) => (tiny(opcode - 0x57 + 0x20)?, Shape::Bare),

            // iadd .. lxor
            (0x60..=0x83, Operands::None) => (tiny(opcode - 0x60 + 0x30)?, Shape::Bare),

            (0x84, Operands::Increment(local, increment)) => (
                Opcode::Inc,
                Shape::RegDisp {
                    reg: local_reg(*local)?,
                    disp: Disp::Value(*increment as i32),
                },
            ),

            // i2l .. i2s
            (0x85..=0x93, Operands::None) => (tiny(opcode - 0x85 + 0x58)?, Shape::Bare),

            // lcmp .. dcmpg
            (0x94..=0x98, Operands::None) => (tiny(opcode - 0x94 + 0x68)?, Shape::Bare),

            // ifeq .. if_acmpne
            (0x99..=0xa6, Operands::Branch(target)) => {
                self.conditional(tiny(opcode - 0x08)?, offset, *target)?
            }

            (0xa7, Operands::Branch(target)) => (
                Opcode::Goto,
                Shape::RegDisp {
                    reg: Reg::PC,
                    disp: Disp::Branch(self.resolve(offset, *target)?),
                },
            ),

            (0xa8, _) | (0xa9, _) => {
                return Err(Error::UnsupportedConstruct(format!(
                    "subroutine instruction `{}` at offset {}",
                    op.name(),
                    offset
                )))
            }

            (
                0xaa,
                Operands::TableSwitch {
                    default,
                    low,
                    targets,
                },
            ) => {
                let high = (*low as i64 + targets.len() as i64 - 1) as i32;
                let mut params = vec![
                    Parameter::value(*low),
                    Parameter::value(high),
                    Parameter::Target(self.resolve(offset, *default)?),
                ];
                for target in targets {
                    params.push(Parameter::Target(self.resolve(offset, *target)?));
                }
                switch(Opcode::TableSwitch, params)
            }

            (0xab, Operands::LookupSwitch { default, pairs }) => {
                let mut params = vec![Parameter::Target(self.resolve(offset, *default)?)];
                for (key, target) in pairs {
                    params.push(Parameter::value(*key));
                    params.push(Parameter::Target(self.resolve(offset, *target)?));
                }
                switch(Opcode::LookupSwitch, params)
            }

            // ireturn .. return
            (0xac..=0xb1, Operands::None) => (tiny(opcode - 0xac + 0x70)?, Shape::Bare),

            // getstatic .. putfield
            (0xb2..=0xb5, Operands::Constant(index)) => {
                let member = constants.field_ref(ConstantIndex(*index))?;
                (tiny(opcode - 0x02)?, self.member(member)?)
            }

            // invokevirtual .. invokeinterface
            (0xb6..=0xb8, Operands::Constant(index)) | (0xb9, Operands::Interface(index, _)) => {
                let member = constants.method_ref(ConstantIndex(*index))?;
                (tiny(opcode - 0x02)?, self.member(member)?)
            }

            (0xba, _) => {
                return Err(Error::UnsupportedConstruct(format!(
                    "invokedynamic at offset {}",
                    offset
                )))
            }

            (0xbb, Operands::Constant(index)) => self.class_op(Opcode::New, *index, 0)?,
            (0xbc, Operands::Immediate(array_type)) => (
                Opcode::NewArray,
                Shape::Two16 {
                    hi: *array_type as u16,
                    lo: 0,
                },
            ),
            (0xbd, Operands::Constant(index)) => self.class_op(Opcode::ANewArray, *index, 0)?,

            // arraylength, athrow
            (0xbe..=0xbf, Operands::None) => (tiny(opcode - 0x48)?, Shape::Bare),

            (0xc0, Operands::Constant(index)) => self.class_op(Opcode::CheckCast, *index, 0)?,
            (0xc1, Operands::Constant(index)) => self.class_op(Opcode::InstanceOf, *index, 0)?,

            // monitorenter, monitorexit
            (0xc2..=0xc3, Operands::None) => (tiny(opcode - 0x4a)?, Shape::Bare),

            (0xc5, Operands::MultiArray(index, dimensions)) => {
                self.class_op(Opcode::MultiANewArray, *index, *dimensions as u16)?
            }

            // ifnull, ifnonnull
            (0xc6..=0xc7, Operands::Branch(target)) => {
                self.conditional(tiny(opcode - 0x27)?, offset, *target)?
            }

            _ => {
                return Err(Error::UnsupportedConstruct(format!(
                    "`{}` at offset {}",
                    op, offset
                )))
            }
        };

        Ok(Instruction::new(tiny_opcode, *line, shape))
    }

    fn visit_ldc(&mut self, wide: bool, index: ConstantIndex) -> Result<(Opcode, Shape), Error> {
        let constants = self.jvm_constants;
        let constant = constants.get(index)?;
        let translated = match (wide, constant) {
            (false, Constant::Integer(value)) => {
                if self.settings.fold_small_constants
                    && (Record::SHORT_IMM_MIN..=Record::SHORT_IMM_MAX).contains(value)
                {
                    const_int(*value)
                } else {
                    (Opcode::ConstW, split(*value as u32))
                }
            }
            (false, Constant::Float(value)) => (Opcode::ConstFw, split(value.to_bits())),
            (false, Constant::String(string)) => {
                let string = constants.utf8(*string)?;
                let index = self.pool.get_string(string)?;
                (Opcode::LdcStr, Shape::Two16 { hi: index.0, lo: 0 })
            }
            (false, Constant::Class(_)) => self.class_op(Opcode::LdcClass, index.0, 0)?,
            (true, Constant::Long(value)) => {
                let index = self.pool.get_constant(TinyConstant::Long(*value))?;
                (Opcode::LdcL, Shape::Two16 { hi: index.0, lo: 0 })
            }
            (true, Constant::Double(value)) => {
                let index = self.pool.get_constant(TinyConstant::Double(*value))?;
                (Opcode::LdcD, Shape::Two16 { hi: index.0, lo: 0 })
            }
            (
                _,
                Constant::MethodHandle { .. }
                | Constant::MethodType { .. }
                | Constant::Dynamic { .. },
            ) => {
                return Err(Error::UnsupportedConstruct(format!(
                    "loading constant #{} ({})",
                    index.0,
                    constant_kind(constant)
                )))
            }
            _ => {
                return Err(Error::from(jvm::Error::WrongConstantKind {
                    index: index.0,
                    expected: if wide { "Long or Double" } else { "loadable constant" },
                }))
            }
        };
        Ok(translated)
    }

    fn conditional(
        &self,
        opcode: Opcode,
        offset: usize,
        target: u32,
    ) -> Result<(Opcode, Shape), Error> {
        Ok((
            opcode,
            Shape::ShortImmReg {
                imm: Disp::Branch(self.resolve(offset, target)?),
                reg: Reg::STACK,
            },
        ))
    }

    /// Field or method access: class id and member table index
    fn member(&mut self, member: MemberRef<'_>) -> Result<Shape, Error> {
        let class = self.symbols.intern(member.class)?;
        let index = self.pool.get_member(member.name, member.descriptor)?;
        Ok(Shape::Two16 {
            hi: class.0,
            lo: index.0,
        })
    }

    fn class_op(&self, opcode: Opcode, index: u16, lo: u16) -> Result<(Opcode, Shape), Error> {
        let class = self.class_id(ConstantIndex(index))?;
        Ok((opcode, Shape::Two16 { hi: class.0, lo }))
    }
}

/// Tiny opcode at a position computed from a source opcode
fn tiny(byte: u8) -> Result<Opcode, Error> {
    Opcode::from_byte(byte)
        .ok_or_else(|| Error::UnsupportedConstruct(format!("no tiny opcode {:#04x}", byte)))
}

fn const_int(value: i32) -> (Opcode, Shape) {
    (
        Opcode::ConstI,
        Shape::ShortImmReg {
            imm: Disp::Value(value),
            reg: Reg::STACK,
        },
    )
}

fn split(bits: u32) -> Shape {
    Shape::Two16 {
        hi: (bits >> 16) as u16,
        lo: bits as u16,
    }
}

fn local_reg(local: u16) -> Result<Reg, Error> {
    Reg::local(local).ok_or_else(|| {
        Error::UnsupportedConstruct(format!("local {} does not fit in a register", local))
    })
}

fn load_store(byte: u8, local: u16) -> Result<(Opcode, Shape), Error> {
    Ok((
        tiny(byte)?,
        Shape::RegDisp {
            reg: local_reg(local)?,
            disp: Disp::Value(0),
        },
    ))
}

fn switch(opcode: Opcode, params: Vec<Parameter>) -> (Opcode, Shape) {
    (
        opcode,
        Shape::Switch {
            key: Reg::STACK,
            params,
        },
    )
}

fn constant_kind(constant: &Constant) -> &'static str {
    match constant {
        Constant::MethodHandle { .. } => "method handle",
        Constant::MethodType { .. } => "method type",
        Constant::Dynamic { .. } => "dynamic constant",
        _ => "constant",
    }
}
