//! Encoding of IR method bodies into tiny records
//!
//! Every record has a length fixed by its opcode, so encoding takes two passes: the first
//! computes the offset of every instruction, the second writes the records with every
//! instruction reference turned into a byte displacement.

use super::{Error, Settings};
use crate::ir::{Disp, InsnRef, Instruction, MethodBody, Parameter, Shape};
use crate::tiny::{self, Format, LineEntry, Record, Serialize};
use crate::util::{OffsetVec, Width};

/// Encoded method body, with its tables expressed in byte offsets
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmittedCode {
    pub code: Vec<u8>,
    pub lines: Vec<LineEntry>,
    pub handlers: Vec<tiny::Handler>,
}

pub fn emit(body: &MethodBody, settings: &Settings) -> Result<EmittedCode, Error> {
    // Phase 1: offset of every instruction, plus the end of the code
    let mut offsets = Vec::with_capacity(body.instructions.len() + 1);
    let mut end = 0;
    for instruction in &body.instructions {
        offsets.push(end);
        end += instruction.width();
    }
    offsets.push(end);
    if end > u16::MAX as usize {
        return Err(Error::UnsupportedConstruct(format!(
            "method body of {} bytes (at most {} are addressable)",
            end,
            u16::MAX
        )));
    }

    // Phase 2: records
    let mut records: OffsetVec<Record> = OffsetVec::new();
    let mut lines: Vec<LineEntry> = vec![];
    for (position, instruction) in body.instructions.iter().enumerate() {
        let here = offsets[position];
        debug_assert_eq!(records.end_offset().0, here);

        if settings.line_numbers
            && lines.last().map(|entry| entry.line) != Some(instruction.source_line)
        {
            lines.push(LineEntry {
                offset: here as u16,
                line: instruction.source_line,
            });
        }

        let emitter = InstructionEmitter {
            offsets: &offsets,
            here,
        };
        emitter.emit(instruction, &mut records)?;
    }

    let handlers = body
        .handlers
        .iter()
        .map(|handler| tiny::Handler {
            start: offsets[handler.start.0] as u16,
            end: offsets[handler.end.0] as u16,
            handler: offsets[handler.handler.0] as u16,
            catch_type: handler.catch_type,
        })
        .collect();

    let mut code = Vec::with_capacity(end);
    for (_, _, record) in &records {
        record.serialize(&mut code)?;
    }
    log::trace!(
        "emitted {} instructions as {} records ({} bytes)",
        body.instructions.len(),
        records.len(),
        code.len()
    );

    Ok(EmittedCode {
        code,
        lines,
        handlers,
    })
}

/// Emits the records of one instruction at offset `here`
struct InstructionEmitter<'a> {
    offsets: &'a [usize],
    here: usize,
}

impl<'a> InstructionEmitter<'a> {
    fn displacement(&self, target: InsnRef) -> i64 {
        self.offsets[target.0] as i64 - self.here as i64
    }

    fn resolve(&self, disp: Disp) -> i64 {
        match disp {
            Disp::Value(value) => value as i64,
            Disp::Branch(target) => self.displacement(target),
        }
    }

    fn overflow(&self, displacement: i64, bits: u8) -> Error {
        Error::DisplacementOverflow {
            offset: self.here,
            displacement,
            bits,
        }
    }

    fn emit(
        &self,
        instruction: &Instruction,
        records: &mut OffsetVec<Record>,
    ) -> Result<(), Error> {
        let opcode = instruction.opcode;
        let record = match (opcode.format(), &instruction.shape) {
            (Format::Bare, Shape::Bare) => Record::Bare(opcode),

            (Format::RegDisp, Shape::RegDisp { reg, disp }) => {
                let displacement = self.resolve(*disp);
                let disp =
                    i16::try_from(displacement).map_err(|_| self.overflow(displacement, 16))?;
                Record::RegDisp {
                    opcode,
                    reg: reg.0,
                    disp,
                }
            }

            (Format::ShortImmReg, Shape::ShortImmReg { imm, reg }) => {
                let reg = reg.short_field().ok_or_else(|| {
                    Error::UnsupportedConstruct(format!(
                        "register {} in the short register field of `{}`",
                        reg, instruction
                    ))
                })?;
                let displacement = self.resolve(*imm);
                if displacement < Record::SHORT_IMM_MIN as i64
                    || displacement > Record::SHORT_IMM_MAX as i64
                {
                    return Err(self.overflow(displacement, 18));
                }
                Record::ShortImmReg {
                    opcode,
                    imm: displacement as i32,
                    reg,
                }
            }

            (Format::Two16, Shape::Two16 { hi, lo }) => Record::Two16 {
                opcode,
                hi: *hi,
                lo: *lo,
            },

            (Format::Switch, Shape::Switch { key, params }) => {
                let count = u16::try_from(params.len()).map_err(|_| {
                    Error::UnsupportedConstruct(format!("switch with {} parameters", params.len()))
                })?;
                records.push(Record::SwitchHeader {
                    opcode,
                    key: key.0,
                    count,
                });
                for (index, param) in params.iter().enumerate() {
                    let record = match (opcode.switch_param_is_target(index), param) {
                        (false, Parameter::Values(hi, lo)) => Record::Values(*hi, *lo),
                        (true, Parameter::Target(target)) => {
                            let displacement = self.displacement(*target);
                            let disp = i32::try_from(displacement)
                                .map_err(|_| self.overflow(displacement, 32))?;
                            Record::Target(disp)
                        }
                        _ => {
                            return Err(Error::UnsupportedConstruct(format!(
                                "parameter {} of `{}` has the wrong kind",
                                index, instruction
                            )))
                        }
                    };
                    records.push(record);
                }
                return Ok(());
            }

            (format, _) => {
                return Err(Error::UnsupportedConstruct(format!(
                    "`{}` does not have the operands of a {:?} instruction",
                    instruction, format
                )))
            }
        };
        records.push(record);
        Ok(())
    }
}
