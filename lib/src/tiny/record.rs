use crate::tiny::{Format, Opcode, Serialize};
use crate::util::{Offset, OffsetVec, Width};
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::fmt;
use std::io::Cursor;
use thiserror::Error;

/// One encoded unit of a method body
///
/// An instruction is emitted as one record, except for switches: those are a `SwitchHeader`
/// followed by `count` parameter records (`Values` or `Target`).
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Record {
    Bare(Opcode),
    RegDisp {
        opcode: Opcode,
        reg: u8,
        disp: i16,
    },

    /// `imm` must be in `SHORT_IMM_MIN..=SHORT_IMM_MAX` and `reg` at most `SHORT_REG_MAX`
    ShortImmReg {
        opcode: Opcode,
        imm: i32,
        reg: u8,
    },
    Two16 {
        opcode: Opcode,
        hi: u16,
        lo: u16,
    },
    SwitchHeader {
        opcode: Opcode,
        key: u8,
        count: u16,
    },
    Values(u16, u16),

    /// Displacement from the enclosing switch header
    Target(i32),
}

impl Record {
    pub const SHORT_IMM_MIN: i32 = -(1 << 17);
    pub const SHORT_IMM_MAX: i32 = (1 << 17) - 1;
    pub const SHORT_REG_MAX: u8 = 63;

    /// Length of parameter records following a switch header
    pub const PARAMETER_LEN: usize = 4;
}

impl Width for Record {
    fn width(&self) -> usize {
        match self {
            Record::Bare(_) => Format::Bare.record_len(),
            Record::RegDisp { .. } => Format::RegDisp.record_len(),
            Record::ShortImmReg { .. } => Format::ShortImmReg.record_len(),
            Record::Two16 { .. } => Format::Two16.record_len(),
            Record::SwitchHeader { .. } => Format::Switch.record_len(),
            Record::Values(_, _) | Record::Target(_) => Record::PARAMETER_LEN,
        }
    }
}

impl Serialize for Record {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> std::io::Result<()> {
        match self {
            Record::Bare(opcode) => (*opcode as u8).serialize(writer),
            Record::RegDisp { opcode, reg, disp } => {
                (*opcode as u8).serialize(writer)?;
                reg.serialize(writer)?;
                disp.serialize(writer)
            }
            Record::ShortImmReg { opcode, imm, reg } => {
                (*opcode as u8).serialize(writer)?;
                let word = (((*imm as u32) & 0x3FFFF) << 6) | ((*reg as u32) & 0x3F);
                writer.write_u24::<LittleEndian>(word)
            }
            Record::Two16 { opcode, hi, lo } => {
                (*opcode as u8).serialize(writer)?;
                hi.serialize(writer)?;
                lo.serialize(writer)
            }
            Record::SwitchHeader { opcode, key, count } => {
                (*opcode as u8).serialize(writer)?;
                key.serialize(writer)?;
                count.serialize(writer)
            }
            Record::Values(a, b) => {
                a.serialize(writer)?;
                b.serialize(writer)
            }
            Record::Target(disp) => disp.serialize(writer),
        }
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Record::Bare(opcode) => write!(f, "{}", opcode),
            Record::RegDisp { opcode, reg, disp } => write!(f, "{} r{} {:+}", opcode, reg, disp),
            Record::ShortImmReg { opcode, imm, reg } => {
                write!(f, "{} {} r{}", opcode, imm, reg)
            }
            Record::Two16 { opcode, hi, lo } => write!(f, "{} {} {}", opcode, hi, lo),
            Record::SwitchHeader { opcode, key, count } => {
                write!(f, "{} r{} [{}]", opcode, key, count)
            }
            Record::Values(a, b) => write!(f, "  values {} {}", a, b),
            Record::Target(disp) => write!(f, "  target {:+}", disp),
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DisassembleError {
    #[error("unknown tiny opcode {opcode:#04x} at offset {offset}")]
    UnknownOpcode { opcode: u8, offset: usize },

    #[error("truncated record at offset {0}")]
    Truncated(usize),
}

/// Split encoded code back into records
pub fn disassemble(code: &[u8]) -> Result<OffsetVec<Record>, DisassembleError> {
    let mut cursor = Cursor::new(code);
    let mut records = OffsetVec::new();

    while (cursor.position() as usize) < code.len() {
        let offset = cursor.position() as usize;
        let truncated = |_| DisassembleError::Truncated(offset);

        let byte = cursor.read_u8().map_err(truncated)?;
        let opcode = Opcode::from_byte(byte).ok_or(DisassembleError::UnknownOpcode {
            opcode: byte,
            offset,
        })?;
        let record = match opcode.format() {
            Format::Bare => Record::Bare(opcode),
            Format::RegDisp => Record::RegDisp {
                opcode,
                reg: cursor.read_u8().map_err(truncated)?,
                disp: cursor.read_i16::<LittleEndian>().map_err(truncated)?,
            },
            Format::ShortImmReg => {
                let word = cursor.read_u24::<LittleEndian>().map_err(truncated)?;

                // Sign extend the top 18 bits
                let imm = ((word << 8) as i32) >> 14;
                Record::ShortImmReg {
                    opcode,
                    imm,
                    reg: (word & 0x3F) as u8,
                }
            }
            Format::Two16 => Record::Two16 {
                opcode,
                hi: cursor.read_u16::<LittleEndian>().map_err(truncated)?,
                lo: cursor.read_u16::<LittleEndian>().map_err(truncated)?,
            },
            Format::Switch => {
                let key = cursor.read_u8().map_err(truncated)?;
                let count = cursor.read_u16::<LittleEndian>().map_err(truncated)?;
                records.push(Record::SwitchHeader { opcode, key, count });
                for index in 0..count as usize {
                    let offset = cursor.position() as usize;
                    let truncated = |_| DisassembleError::Truncated(offset);
                    let param = if opcode.switch_param_is_target(index) {
                        Record::Target(cursor.read_i32::<LittleEndian>().map_err(truncated)?)
                    } else {
                        Record::Values(
                            cursor.read_u16::<LittleEndian>().map_err(truncated)?,
                            cursor.read_u16::<LittleEndian>().map_err(truncated)?,
                        )
                    };
                    records.push(param);
                }
                continue;
            }
        };
        records.push(record);
    }

    Ok(records)
}

/// Records along with their offsets, in a printable form
pub fn disassembly_listing(records: &OffsetVec<Record>) -> String {
    let mut listing = String::new();
    for (Offset(offset), _, record) in records {
        listing.push_str(&format!("{:>6}: {}\n", offset, record));
    }
    listing
}

#[cfg(test)]
mod test {
    use super::*;

    fn encode(records: &[Record]) -> Vec<u8> {
        let mut out = vec![];
        for record in records {
            record.serialize(&mut out).unwrap();
        }
        out
    }

    #[test]
    fn reg_disp_layout() {
        let bytes = encode(&[Record::RegDisp {
            opcode: Opcode::Inc,
            reg: 3,
            disp: -5,
        }]);
        assert_eq!(bytes, vec![0x8a, 3, 0xfb, 0xff]);
    }

    #[test]
    fn short_imm_reg_layout() {
        let bytes = encode(&[Record::ShortImmReg {
            opcode: Opcode::ConstI,
            imm: -1,
            reg: 63,
        }]);
        assert_eq!(bytes, vec![0x90, 0xff, 0xff, 0xff]);

        let bytes = encode(&[Record::ShortImmReg {
            opcode: Opcode::IfEq,
            imm: 8,
            reg: 63,
        }]);
        // 8 << 6 | 63 = 0x23f
        assert_eq!(bytes, vec![0x91, 0x3f, 0x02, 0x00]);
    }

    #[test]
    fn disassemble_recovers_records_and_offsets() {
        let records = [
            Record::ShortImmReg {
                opcode: Opcode::ConstI,
                imm: Record::SHORT_IMM_MIN,
                reg: 63,
            },
            Record::SwitchHeader {
                opcode: Opcode::TableSwitch,
                key: 255,
                count: 4,
            },
            Record::Values(0, 1),
            Record::Values(0, 1),
            Record::Target(21),
            Record::Target(-4),
            Record::Bare(Opcode::Ret),
            Record::Two16 {
                opcode: Opcode::InvokeStatic,
                hi: 7,
                lo: 2,
            },
        ];
        let decoded = disassemble(&encode(&records)).unwrap();
        let offsets: Vec<usize> = decoded.iter().map(|(off, _, _)| off.0).collect();
        assert_eq!(offsets, vec![0, 4, 8, 12, 16, 20, 24, 25]);
        let found: Vec<Record> = decoded.into_iter().map(|(_, _, r)| r).collect();
        assert_eq!(found, records.to_vec());
    }

    #[test]
    fn disassemble_errors() {
        assert_eq!(
            disassemble(&[0x00, 0x09]),
            Err(DisassembleError::UnknownOpcode {
                opcode: 0x09,
                offset: 1
            })
        );
        assert_eq!(disassemble(&[0x8b, 0xfe]), Err(DisassembleError::Truncated(0)));
    }
}
