use crate::tiny::Serialize;
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::io::{self, Cursor, Read};

/// Position in the process-wide symbol table
#[derive(Copy, Clone, Hash, Eq, PartialEq, Ord, PartialOrd, Debug)]
pub struct ClassId(pub u16);

/// Index into the name table of a tiny class
#[derive(Copy, Clone, Hash, Eq, PartialEq, Ord, PartialOrd, Debug)]
pub struct NameIndex(pub u16);

/// Index into the constant table of a tiny class
#[derive(Copy, Clone, Hash, Eq, PartialEq, Ord, PartialOrd, Debug)]
pub struct ConstIndex(pub u16);

/// Index into the member table of a tiny class
#[derive(Copy, Clone, Hash, Eq, PartialEq, Ord, PartialOrd, Debug)]
pub struct MemberIndex(pub u16);

macro_rules! serialize_as_u16 {
    ($($index:ident),*) => {
        $(
            impl Serialize for $index {
                fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> io::Result<()> {
                    self.0.serialize(writer)
                }
            }
        )*
    };
}

serialize_as_u16!(ClassId, NameIndex, ConstIndex, MemberIndex);

/// Compact class image consumed by the tiny VM
///
/// Section order is fixed: header, interfaces, names, constants, members, fields, methods.
#[derive(Debug, Clone, PartialEq)]
pub struct TinyClass {
    pub access_flags: u16,
    pub this_class: ClassId,
    pub super_class: Option<ClassId>,
    pub source_file: Option<NameIndex>,
    pub interfaces: Vec<ClassId>,
    pub names: Vec<String>,
    pub constants: Vec<TinyConstant>,
    pub members: Vec<Member>,
    pub fields: Vec<TinyField>,
    pub methods: Vec<TinyMethod>,
}

impl TinyClass {
    pub const MAGIC: [u8; 4] = *b"TINY";
    pub const VERSION: u16 = 1;

    /// Read a serialized class back
    pub fn parse(bytes: &[u8]) -> io::Result<TinyClass> {
        let mut reader = Cursor::new(bytes);

        let mut magic = [0u8; 4];
        reader.read_exact(&mut magic)?;
        let version = reader.read_u16::<LittleEndian>()?;
        if magic != TinyClass::MAGIC || version != TinyClass::VERSION {
            return Err(invalid("bad tiny class header"));
        }

        let access_flags = reader.read_u16::<LittleEndian>()?;
        let this_class = ClassId(reader.read_u16::<LittleEndian>()?);
        let super_class = read_optional(&mut reader)?.map(ClassId);
        let source_file = read_optional(&mut reader)?.map(NameIndex);
        let interfaces = read_seq(&mut reader, |r| Ok(ClassId(r.read_u16::<LittleEndian>()?)))?;
        let names = read_seq(&mut reader, read_string)?;
        let constants = read_seq(&mut reader, TinyConstant::parse)?;
        let members = read_seq(&mut reader, |r| {
            Ok(Member {
                name: NameIndex(r.read_u16::<LittleEndian>()?),
                descriptor: NameIndex(r.read_u16::<LittleEndian>()?),
            })
        })?;
        let fields = read_seq(&mut reader, |r| {
            Ok(TinyField {
                access_flags: r.read_u16::<LittleEndian>()?,
                name: NameIndex(r.read_u16::<LittleEndian>()?),
                descriptor: NameIndex(r.read_u16::<LittleEndian>()?),
                constant_value: read_optional(r)?.map(ConstIndex),
            })
        })?;
        let methods = read_seq(&mut reader, TinyMethod::parse)?;

        Ok(TinyClass {
            access_flags,
            this_class,
            super_class,
            source_file,
            interfaces,
            names,
            constants,
            members,
            fields,
            methods,
        })
    }

    pub fn name(&self, index: NameIndex) -> Option<&str> {
        self.names.get(index.0 as usize).map(String::as_str)
    }

    /// Find a method by name and descriptor
    pub fn method(&self, name: &str, descriptor: &str) -> Option<&TinyMethod> {
        self.methods.iter().find(|method| {
            self.name(method.name) == Some(name) && self.name(method.descriptor) == Some(descriptor)
        })
    }
}

impl Serialize for TinyClass {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> io::Result<()> {
        writer.write_all(&TinyClass::MAGIC)?;
        TinyClass::VERSION.serialize(writer)?;
        self.access_flags.serialize(writer)?;
        self.this_class.serialize(writer)?;
        self.super_class.serialize(writer)?;
        self.source_file.serialize(writer)?;
        self.interfaces.serialize(writer)?;
        self.names.serialize(writer)?;
        self.constants.serialize(writer)?;
        self.members.serialize(writer)?;
        self.fields.serialize(writer)?;
        self.methods.serialize(writer)?;
        Ok(())
    }
}

/// Entry in the constant table
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TinyConstant {
    Int(i32),
    Float(f32),
    Long(i64),
    Double(f64),
    String(NameIndex),
}

impl TinyConstant {
    fn parse(reader: &mut Cursor<&[u8]>) -> io::Result<TinyConstant> {
        let constant = match reader.read_u8()? {
            1 => TinyConstant::Int(reader.read_i32::<LittleEndian>()?),
            2 => TinyConstant::Float(reader.read_f32::<LittleEndian>()?),
            3 => TinyConstant::Long(reader.read_i64::<LittleEndian>()?),
            4 => TinyConstant::Double(reader.read_f64::<LittleEndian>()?),
            5 => TinyConstant::String(NameIndex(reader.read_u16::<LittleEndian>()?)),
            _ => return Err(invalid("unknown constant tag")),
        };
        Ok(constant)
    }
}

impl Serialize for TinyConstant {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> io::Result<()> {
        match self {
            TinyConstant::Int(value) => {
                1u8.serialize(writer)?;
                value.serialize(writer)
            }
            TinyConstant::Float(value) => {
                2u8.serialize(writer)?;
                value.serialize(writer)
            }
            TinyConstant::Long(value) => {
                3u8.serialize(writer)?;
                value.serialize(writer)
            }
            TinyConstant::Double(value) => {
                4u8.serialize(writer)?;
                value.serialize(writer)
            }
            TinyConstant::String(name) => {
                5u8.serialize(writer)?;
                name.serialize(writer)
            }
        }
    }
}

/// Field or method referenced by name and descriptor (the owning class is in the instruction)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Member {
    pub name: NameIndex,
    pub descriptor: NameIndex,
}

impl Serialize for Member {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> io::Result<()> {
        self.name.serialize(writer)?;
        self.descriptor.serialize(writer)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TinyField {
    pub access_flags: u16,
    pub name: NameIndex,
    pub descriptor: NameIndex,
    pub constant_value: Option<ConstIndex>,
}

impl Serialize for TinyField {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> io::Result<()> {
        self.access_flags.serialize(writer)?;
        self.name.serialize(writer)?;
        self.descriptor.serialize(writer)?;
        self.constant_value.serialize(writer)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TinyMethod {
    pub access_flags: u16,
    pub name: NameIndex,
    pub descriptor: NameIndex,
    pub max_stack: u16,
    pub max_locals: u16,

    /// Encoded records, empty for methods without a body
    pub code: Vec<u8>,
    pub lines: Vec<LineEntry>,
    pub handlers: Vec<Handler>,
}

impl TinyMethod {
    fn parse(reader: &mut Cursor<&[u8]>) -> io::Result<TinyMethod> {
        let access_flags = reader.read_u16::<LittleEndian>()?;
        let name = NameIndex(reader.read_u16::<LittleEndian>()?);
        let descriptor = NameIndex(reader.read_u16::<LittleEndian>()?);
        let max_stack = reader.read_u16::<LittleEndian>()?;
        let max_locals = reader.read_u16::<LittleEndian>()?;
        let code_len = reader.read_u32::<LittleEndian>()? as u64;
        let mut code = vec![];
        reader.by_ref().take(code_len).read_to_end(&mut code)?;
        if code.len() as u64 != code_len {
            return Err(io::Error::from(io::ErrorKind::UnexpectedEof));
        }
        let lines = read_seq(reader, |r| {
            Ok(LineEntry {
                offset: r.read_u16::<LittleEndian>()?,
                line: r.read_u16::<LittleEndian>()?,
            })
        })?;
        let handlers = read_seq(reader, |r| {
            Ok(Handler {
                start: r.read_u16::<LittleEndian>()?,
                end: r.read_u16::<LittleEndian>()?,
                handler: r.read_u16::<LittleEndian>()?,
                catch_type: read_optional(r)?.map(ClassId),
            })
        })?;
        Ok(TinyMethod {
            access_flags,
            name,
            descriptor,
            max_stack,
            max_locals,
            code,
            lines,
            handlers,
        })
    }
}

impl Serialize for TinyMethod {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> io::Result<()> {
        self.access_flags.serialize(writer)?;
        self.name.serialize(writer)?;
        self.descriptor.serialize(writer)?;
        self.max_stack.serialize(writer)?;
        self.max_locals.serialize(writer)?;

        // Code length is 4 bytes
        (self.code.len() as u32).serialize(writer)?;
        writer.write_all(&self.code)?;

        self.lines.serialize(writer)?;
        self.handlers.serialize(writer)?;
        Ok(())
    }
}

/// Start of a run of code from the same source line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineEntry {
    pub offset: u16,
    pub line: u16,
}

impl Serialize for LineEntry {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> io::Result<()> {
        self.offset.serialize(writer)?;
        self.line.serialize(writer)
    }
}

/// Source line of the code at `offset`: that of the last entry at or before it
pub fn line_for_offset(lines: &[LineEntry], offset: u16) -> Option<u16> {
    let after = lines.partition_point(|entry| entry.offset <= offset);
    after.checked_sub(1).map(|idx| lines[idx].line)
}

/// Exception handler, with byte offsets into the encoded code
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Handler {
    /// Start of the protected range (inclusive)
    pub start: u16,

    /// End of the protected range (exclusive)
    pub end: u16,
    pub handler: u16,

    /// `None` catches everything
    pub catch_type: Option<ClassId>,
}

impl Serialize for Handler {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> io::Result<()> {
        self.start.serialize(writer)?;
        self.end.serialize(writer)?;
        self.handler.serialize(writer)?;
        self.catch_type.serialize(writer)
    }
}

fn invalid(message: &str) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, message.to_string())
}

fn read_optional<R: ReadBytesExt>(reader: &mut R) -> io::Result<Option<u16>> {
    let value = reader.read_u16::<LittleEndian>()?;
    Ok(if value == u16::MAX { None } else { Some(value) })
}

fn read_string(reader: &mut Cursor<&[u8]>) -> io::Result<String> {
    let len = reader.read_u16::<LittleEndian>()? as usize;
    let mut bytes = vec![0; len];
    reader.read_exact(&mut bytes)?;
    String::from_utf8(bytes).map_err(|_| invalid("name is not UTF-8"))
}

fn read_seq<'a, T>(
    reader: &mut Cursor<&'a [u8]>,
    mut read_one: impl FnMut(&mut Cursor<&'a [u8]>) -> io::Result<T>,
) -> io::Result<Vec<T>> {
    let count = reader.read_u16::<LittleEndian>()?;
    let mut elems = Vec::with_capacity(count as usize);
    for _ in 0..count {
        elems.push(read_one(reader)?);
    }
    Ok(elems)
}
