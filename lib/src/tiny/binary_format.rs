use byteorder::{LittleEndian, WriteBytesExt};
use std::io::{Error, ErrorKind, Result};

/// Utility trait for serializing data inside tiny class files
///
/// The target runtime reads everything with fixed layouts:
///
///   - all numbers are little-endian
///   - tags are always `u8`
///   - when serializing a sequence, the length of the sequence is a `u16` prefix
///   - strings are serialized as `u16` byte length followed by UTF-8
///
pub trait Serialize {
    /// Serialize construct into a binary output stream
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> Result<()>;
}

impl Serialize for u8 {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> Result<()> {
        writer.write_u8(*self)
    }
}

impl Serialize for u16 {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> Result<()> {
        writer.write_u16::<LittleEndian>(*self)
    }
}

impl Serialize for u32 {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> Result<()> {
        writer.write_u32::<LittleEndian>(*self)
    }
}

impl Serialize for i16 {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> Result<()> {
        writer.write_i16::<LittleEndian>(*self)
    }
}

impl Serialize for i32 {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> Result<()> {
        writer.write_i32::<LittleEndian>(*self)
    }
}

impl Serialize for i64 {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> Result<()> {
        writer.write_i64::<LittleEndian>(*self)
    }
}

impl Serialize for f32 {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> Result<()> {
        writer.write_f32::<LittleEndian>(*self)
    }
}

impl Serialize for f64 {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> Result<()> {
        writer.write_f64::<LittleEndian>(*self)
    }
}

impl Serialize for str {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> Result<()> {
        serialize_len(self.len(), writer)?;
        writer.write_all(self.as_bytes())
    }
}

impl Serialize for String {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> Result<()> {
        self.as_str().serialize(writer)
    }
}

impl<A: Serialize> Serialize for Option<A> {
    /// `None` is encoded as `0xFFFF` (so `A` should serialize to a `u16`)
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> Result<()> {
        match self {
            Some(value) => value.serialize(writer),
            None => u16::MAX.serialize(writer),
        }
    }
}

/// Size in `u16` is the first thing serialized
impl<A: Serialize> Serialize for Vec<A> {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> Result<()> {
        serialize_len(self.len(), writer)?;
        for elem in self {
            elem.serialize(writer)?;
        }
        Ok(())
    }
}

/// Write a `u16` length prefix, refusing to silently truncate
fn serialize_len<W: WriteBytesExt>(len: usize, writer: &mut W) -> Result<()> {
    let len = u16::try_from(len).map_err(|_| {
        Error::new(
            ErrorKind::InvalidData,
            format!("sequence of length {} does not fit a u16 prefix", len),
        )
    })?;
    len.serialize(writer)
}
