use crate::jvm::class_file::{read_bytes, ConstantIndex, ConstantPool, Deserialize};
use crate::jvm::Error;
use byteorder::ReadBytesExt;
use std::io::Cursor;

/// Attributes (used in classes, fields, methods, and even on some attributes)
///
/// Attributes are kept raw when reading, and only the ones the converter cares about get parsed
/// into a typed view (see `AttributeLike`). Unknown attributes are skipped over.
///
/// [0]: https://docs.oracle.com/javase/specs/jvms/se15/html/jvms-4.html#jvms-4.7
#[derive(Debug, Clone)]
pub struct Attribute {
    pub name_index: ConstantIndex,
    pub info: Vec<u8>,
}

impl Deserialize for Attribute {
    fn deserialize<R: ReadBytesExt>(reader: &mut R) -> Result<Self, Error> {
        let name_index = ConstantIndex::deserialize(reader)?;

        // Attribute info length is 4 bytes
        let len = u32::deserialize(reader)?;
        let info = read_bytes(reader, len as usize)?;

        Ok(Attribute { name_index, info })
    }
}

impl Attribute {
    /// Parse the raw info as a typed attribute
    ///
    /// The whole info buffer must be consumed.
    pub fn parse<A: AttributeLike>(&self) -> Result<A, Error> {
        let mut cursor = Cursor::new(&self.info[..]);
        let parsed = A::deserialize(&mut cursor).map_err(|err| match err {
            Error::Truncated => Error::MalformedAttribute(A::NAME),
            other => other,
        })?;
        if cursor.position() as usize != self.info.len() {
            return Err(Error::MalformedAttribute(A::NAME));
        }
        Ok(parsed)
    }
}

/// Attributes are all stored in the same way (see `Attribute`), but internally
/// they represent very different things. This trait is implemented by things
/// which can be read out of attributes.
pub trait AttributeLike: Deserialize {
    /// Name of the attribute
    const NAME: &'static str;
}

/// Find and parse the first attribute with the name of `A`
pub fn find_attribute<A: AttributeLike>(
    attributes: &[Attribute],
    constants: &ConstantPool,
) -> Result<Option<A>, Error> {
    for attribute in attributes {
        if constants.utf8(attribute.name_index)? == A::NAME {
            return attribute.parse::<A>().map(Some);
        }
    }
    Ok(None)
}

/// [0]: https://docs.oracle.com/javase/specs/jvms/se15/html/jvms-4.html#jvms-4.7.2
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConstantValue(pub ConstantIndex);

impl Deserialize for ConstantValue {
    fn deserialize<R: ReadBytesExt>(reader: &mut R) -> Result<Self, Error> {
        Ok(ConstantValue(ConstantIndex::deserialize(reader)?))
    }
}

impl AttributeLike for ConstantValue {
    const NAME: &'static str = "ConstantValue";
}

/// [0]: https://docs.oracle.com/javase/specs/jvms/se15/html/jvms-4.html#jvms-4.7.10
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceFile(pub ConstantIndex);

impl Deserialize for SourceFile {
    fn deserialize<R: ReadBytesExt>(reader: &mut R) -> Result<Self, Error> {
        Ok(SourceFile(ConstantIndex::deserialize(reader)?))
    }
}

impl AttributeLike for SourceFile {
    const NAME: &'static str = "SourceFile";
}

/// [0]: https://docs.oracle.com/javase/specs/jvms/se15/html/jvms-4.html#jvms-4.7.3
#[derive(Debug, Clone)]
pub struct Code {
    pub max_stack: u16,
    pub max_locals: u16,
    pub code_array: Vec<u8>,
    pub exception_table: Vec<ExceptionHandler>,
    pub attributes: Vec<Attribute>,
}

impl Deserialize for Code {
    fn deserialize<R: ReadBytesExt>(reader: &mut R) -> Result<Self, Error> {
        let max_stack = u16::deserialize(reader)?;
        let max_locals = u16::deserialize(reader)?;
        let code_len = u32::deserialize(reader)?;
        let code_array = read_bytes(reader, code_len as usize)?;
        let exception_table = Vec::<ExceptionHandler>::deserialize(reader)?;
        let attributes = Vec::<Attribute>::deserialize(reader)?;
        Ok(Code {
            max_stack,
            max_locals,
            code_array,
            exception_table,
            attributes,
        })
    }
}

impl AttributeLike for Code {
    const NAME: &'static str = "Code";
}

impl Code {
    /// Line numbers of the code, merged across all `LineNumberTable` attributes and sorted by
    /// `start_pc`
    pub fn line_numbers(&self, constants: &ConstantPool) -> Result<Vec<LineNumber>, Error> {
        let mut lines = vec![];
        for attribute in &self.attributes {
            if constants.utf8(attribute.name_index)? == LineNumberTable::NAME {
                lines.extend(attribute.parse::<LineNumberTable>()?.0);
            }
        }
        lines.sort_by_key(|line| line.start_pc);
        Ok(lines)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExceptionHandler {
    /// Start of exception handler range (inclusive)
    pub start_pc: u16,

    /// End of exception handler range (exclusive)
    pub end_pc: u16,

    /// Start of the exception handler
    pub handler_pc: u16,

    /// Class of exceptions caught, or zero for any exception
    pub catch_type: ConstantIndex,
}

impl Deserialize for ExceptionHandler {
    fn deserialize<R: ReadBytesExt>(reader: &mut R) -> Result<Self, Error> {
        Ok(ExceptionHandler {
            start_pc: u16::deserialize(reader)?,
            end_pc: u16::deserialize(reader)?,
            handler_pc: u16::deserialize(reader)?,
            catch_type: ConstantIndex::deserialize(reader)?,
        })
    }
}

/// [0]: https://docs.oracle.com/javase/specs/jvms/se15/html/jvms-4.html#jvms-4.7.12
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineNumberTable(pub Vec<LineNumber>);

impl Deserialize for LineNumberTable {
    fn deserialize<R: ReadBytesExt>(reader: &mut R) -> Result<Self, Error> {
        Ok(LineNumberTable(Vec::deserialize(reader)?))
    }
}

impl AttributeLike for LineNumberTable {
    const NAME: &'static str = "LineNumberTable";
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineNumber {
    pub start_pc: u16,
    pub line_number: u16,
}

impl Deserialize for LineNumber {
    fn deserialize<R: ReadBytesExt>(reader: &mut R) -> Result<Self, Error> {
        Ok(LineNumber {
            start_pc: u16::deserialize(reader)?,
            line_number: u16::deserialize(reader)?,
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn parse_line_number_table() {
        let attribute = Attribute {
            name_index: ConstantIndex(1),
            info: vec![0, 2, 0, 0, 0, 7, 0, 4, 0, 8],
        };
        let table = attribute.parse::<LineNumberTable>().unwrap();
        assert_eq!(
            table.0,
            vec![
                LineNumber {
                    start_pc: 0,
                    line_number: 7
                },
                LineNumber {
                    start_pc: 4,
                    line_number: 8
                },
            ]
        );
    }

    #[test]
    fn short_or_long_info_is_malformed() {
        let short = Attribute {
            name_index: ConstantIndex(1),
            info: vec![0],
        };
        assert!(matches!(
            short.parse::<SourceFile>(),
            Err(Error::MalformedAttribute("SourceFile"))
        ));

        let long = Attribute {
            name_index: ConstantIndex(1),
            info: vec![0, 3, 0],
        };
        assert!(matches!(
            long.parse::<ConstantValue>(),
            Err(Error::MalformedAttribute("ConstantValue"))
        ));
    }
}
