use crate::jvm::class_file::{read_bytes, Deserialize};
use crate::jvm::Error;
use crate::util::{Offset, OffsetVec, Width};
use byteorder::ReadBytesExt;

/// Index into the constant pool
#[derive(Copy, Clone, Hash, Eq, PartialEq, Ord, PartialOrd, Debug)]
pub struct ConstantIndex(pub u16);

impl Deserialize for ConstantIndex {
    fn deserialize<R: ReadBytesExt>(reader: &mut R) -> Result<Self, Error> {
        Ok(ConstantIndex(u16::deserialize(reader)?))
    }
}

/// Constants as in the constant pool
///
/// [0]: https://docs.oracle.com/javase/specs/jvms/se15/html/jvms-4.html#jvms-4.4
#[derive(Debug, Clone, PartialEq)]
pub enum Constant {
    /// Class or an interface
    Class(ConstantIndex),

    /// Field
    FieldRef {
        class: ConstantIndex,
        name_and_type: ConstantIndex,
    },

    /// Method (this combines `Methodref` and `InterfaceMethodref`)
    MethodRef {
        class: ConstantIndex,
        name_and_type: ConstantIndex,
        is_interface: bool,
    },

    /// Constant object of type `java.lang.String`
    String(ConstantIndex),

    /// Constant primitive of type `int`
    Integer(i32),

    /// Constant primitive of type `float`
    Float(f32),

    /// Constant primitive of type `long`
    Long(i64),

    /// Constant primitive of type `double`
    Double(f64),

    /// Name and a type (eg. for a field or a method)
    NameAndType {
        name: ConstantIndex,
        descriptor: ConstantIndex,
    },

    /// Constant UTF-8 encoded raw string value
    ///
    /// Despite the name, the encoding is not quite UTF-8 (the encoding of the
    /// null character `\u{0000}` and the encoding of supplementary characters
    /// is different). See [`decode_modified_utf8`].
    Utf8(String),

    /// Constant object of type `java.lang.invoke.MethodHandle`
    MethodHandle { handle_kind: u8, member: ConstantIndex },

    /// Method type
    MethodType { descriptor: ConstantIndex },

    /// Dynamically-computed constant
    Dynamic {
        bootstrap_method: u16,
        name_and_type: ConstantIndex,
    },

    /// Dynamically-computed call site
    InvokeDynamic {
        bootstrap_method: u16,
        name_and_type: ConstantIndex,
    },

    Module(ConstantIndex),

    Package(ConstantIndex),
}

impl Constant {
    fn deserialize_at<R: ReadBytesExt>(reader: &mut R, index: u16) -> Result<Constant, Error> {
        let tag = u8::deserialize(reader)?;
        let constant = match tag {
            1 => {
                let len = u16::deserialize(reader)?;
                let bytes = read_bytes(reader, len as usize)?;
                Constant::Utf8(decode_modified_utf8(&bytes)?)
            }
            3 => Constant::Integer(i32::deserialize(reader)?),
            4 => Constant::Float(f32::deserialize(reader)?),
            5 => Constant::Long(i64::deserialize(reader)?),
            6 => Constant::Double(f64::deserialize(reader)?),
            7 => Constant::Class(ConstantIndex::deserialize(reader)?),
            8 => Constant::String(ConstantIndex::deserialize(reader)?),
            9 => Constant::FieldRef {
                class: ConstantIndex::deserialize(reader)?,
                name_and_type: ConstantIndex::deserialize(reader)?,
            },
            10 | 11 => Constant::MethodRef {
                class: ConstantIndex::deserialize(reader)?,
                name_and_type: ConstantIndex::deserialize(reader)?,
                is_interface: tag == 11,
            },
            12 => Constant::NameAndType {
                name: ConstantIndex::deserialize(reader)?,
                descriptor: ConstantIndex::deserialize(reader)?,
            },
            15 => Constant::MethodHandle {
                handle_kind: u8::deserialize(reader)?,
                member: ConstantIndex::deserialize(reader)?,
            },
            16 => Constant::MethodType {
                descriptor: ConstantIndex::deserialize(reader)?,
            },
            17 => Constant::Dynamic {
                bootstrap_method: u16::deserialize(reader)?,
                name_and_type: ConstantIndex::deserialize(reader)?,
            },
            18 => Constant::InvokeDynamic {
                bootstrap_method: u16::deserialize(reader)?,
                name_and_type: ConstantIndex::deserialize(reader)?,
            },
            19 => Constant::Module(ConstantIndex::deserialize(reader)?),
            20 => Constant::Package(ConstantIndex::deserialize(reader)?),
            tag => return Err(Error::UnknownConstantTag { tag, index }),
        };
        Ok(constant)
    }
}

/// Almost all constants have width 1, except for `Constant::Long` and `Constant::Double`. Quoting
/// JVMS §4.4.5:
///
/// > All 8-byte constants take up two entries in the constant_pool table of the class file. If a
/// > CONSTANT_Long_info or CONSTANT_Double_info structure is the item in the constant_pool table
/// > at index n, then the next usable item in the pool is located at index n+2. The constant_pool
/// > index n+1 must be valid but is considered unusable.
impl Width for Constant {
    fn width(&self) -> usize {
        match self {
            Constant::Long(_) | Constant::Double(_) => 2,
            _ => 1,
        }
    }
}

/// Symbolic reference to a field or method, with all of its names resolved
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemberRef<'a> {
    pub class: &'a str,
    pub name: &'a str,
    pub descriptor: &'a str,
}

/// Parsed constant pool of a class file
///
/// Indexing starts at 1, so the underlying [`OffsetVec`] starts at offset 1.
#[derive(Debug, Clone)]
pub struct ConstantPool(OffsetVec<Constant>);

impl ConstantPool {
    /// Number of constants (not slots) in the pool
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate over constants along with their indices
    pub fn iter(&self) -> impl Iterator<Item = (ConstantIndex, &Constant)> + '_ {
        self.0
            .iter()
            .map(|(offset, _, constant)| (ConstantIndex(offset.0 as u16), constant))
    }

    /// Look up a constant by index
    pub fn get(&self, index: ConstantIndex) -> Result<&Constant, Error> {
        self.0
            .lookup(Offset(index.0 as usize))
            .found()
            .ok_or(Error::BadConstantIndex(index.0))
    }

    pub fn utf8(&self, index: ConstantIndex) -> Result<&str, Error> {
        match self.get(index)? {
            Constant::Utf8(string) => Ok(string),
            _ => Err(Error::WrongConstantKind {
                index: index.0,
                expected: "Utf8",
            }),
        }
    }

    /// Binary name of a `CONSTANT_Class_info` (eg. `java/lang/Object` or `[I`)
    pub fn class_name(&self, index: ConstantIndex) -> Result<&str, Error> {
        match self.get(index)? {
            Constant::Class(name) => self.utf8(*name),
            _ => Err(Error::WrongConstantKind {
                index: index.0,
                expected: "Class",
            }),
        }
    }

    pub fn name_and_type(&self, index: ConstantIndex) -> Result<(&str, &str), Error> {
        match self.get(index)? {
            Constant::NameAndType { name, descriptor } => {
                Ok((self.utf8(*name)?, self.utf8(*descriptor)?))
            }
            _ => Err(Error::WrongConstantKind {
                index: index.0,
                expected: "NameAndType",
            }),
        }
    }

    /// Resolve a field reference
    pub fn field_ref(&self, index: ConstantIndex) -> Result<MemberRef<'_>, Error> {
        match self.get(index)? {
            Constant::FieldRef {
                class,
                name_and_type,
            } => self.member_ref(*class, *name_and_type),
            _ => Err(Error::WrongConstantKind {
                index: index.0,
                expected: "Fieldref",
            }),
        }
    }

    /// Resolve a method or interface method reference
    pub fn method_ref(&self, index: ConstantIndex) -> Result<MemberRef<'_>, Error> {
        match self.get(index)? {
            Constant::MethodRef {
                class,
                name_and_type,
                ..
            } => self.member_ref(*class, *name_and_type),
            _ => Err(Error::WrongConstantKind {
                index: index.0,
                expected: "Methodref",
            }),
        }
    }

    fn member_ref(
        &self,
        class: ConstantIndex,
        name_and_type: ConstantIndex,
    ) -> Result<MemberRef<'_>, Error> {
        let (name, descriptor) = self.name_and_type(name_and_type)?;
        Ok(MemberRef {
            class: self.class_name(class)?,
            name,
            descriptor,
        })
    }
}

/// Count of slots is the first thing deserialized, and it is one more than the number of slots
impl Deserialize for ConstantPool {
    fn deserialize<R: ReadBytesExt>(reader: &mut R) -> Result<Self, Error> {
        let count = u16::deserialize(reader)?;
        let mut constants: OffsetVec<Constant> = OffsetVec::starting_at(Offset(1));
        while constants.end_offset().0 < count as usize {
            let index = constants.end_offset().0 as u16;
            constants.push(Constant::deserialize_at(reader, index)?);
        }

        // An 8-byte constant in the last slot would spill past the pool
        if constants.end_offset().0 > count as usize {
            return Err(Error::BadConstantIndex(count));
        }
        Ok(ConstantPool(constants))
    }
}

/// Decode the modified UTF-8 format used in class files.
///
/// See [this `DataInput` section for details][0]. Quoting from that section:
///
/// > The differences between this format and the standard UTF-8 format are the following:
/// >
/// >  * The null byte `\u0000` is encoded in 2-byte format rather than 1-byte, so that the encoded
/// >    strings never have embedded nulls.
/// >  * Only the 1-byte, 2-byte, and 3-byte formats are used.
/// >  * Supplementary characters are represented in the form of surrogate pairs.
///
/// Unpaired surrogates are legal in class files but have no `char` representation, so each one
/// decodes to U+FFFD.
///
/// [0]: https://docs.oracle.com/en/java/javase/17/docs/api/java.base/java/io/DataInput.html#modified-utf-8
pub fn decode_modified_utf8(bytes: &[u8]) -> Result<String, Error> {
    // First pass: bytes to UTF-16 code units
    let mut units: Vec<u16> = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        let b0 = bytes[i] as u16;
        let continuation = |at: usize| -> Result<u16, Error> {
            match bytes.get(at) {
                Some(b) if b & 0b1100_0000 == 0b1000_0000 => Ok((b & 0x3F) as u16),
                _ => Err(Error::InvalidUtf8),
            }
        };
        if b0 & 0b1000_0000 == 0 {
            if b0 == 0 {
                return Err(Error::InvalidUtf8);
            }
            units.push(b0);
            i += 1;
        } else if b0 & 0b1110_0000 == 0b1100_0000 {
            units.push((b0 & 0x1F) << 6 | continuation(i + 1)?);
            i += 2;
        } else if b0 & 0b1111_0000 == 0b1110_0000 {
            units.push((b0 & 0x0F) << 12 | continuation(i + 1)? << 6 | continuation(i + 2)?);
            i += 3;
        } else {
            return Err(Error::InvalidUtf8);
        }
    }

    // Second pass: recombine surrogate pairs
    Ok(char::decode_utf16(units)
        .map(|unit| unit.unwrap_or(char::REPLACEMENT_CHARACTER))
        .collect())
}

#[cfg(test)]
mod decode_modified_utf8_tests {
    use super::*;

    #[test]
    fn containing_null_byte() {
        assert_eq!(decode_modified_utf8(&[97, 192, 128, 97]).unwrap(), "a\x00a");
    }

    #[test]
    fn simple_ascii() {
        assert_eq!(decode_modified_utf8(&[102, 111, 111]).unwrap(), "foo");
        assert_eq!(
            decode_modified_utf8(&[104, 101, 108, 49, 48, 95, 87, 111, 114, 108, 100]).unwrap(),
            "hel10_World"
        );
    }

    #[test]
    fn two_and_three_byte_encodings() {
        assert_eq!(
            decode_modified_utf8(&[196, 132, 199, 141, 211, 146]).unwrap(),
            "ĄǍӒ"
        );
        assert_eq!(
            decode_modified_utf8(&[224, 164, 132, 224, 186, 176, 224, 189, 168]).unwrap(),
            "ऄະཨ"
        );
    }

    #[test]
    fn supplementary_characters() {
        assert_eq!(
            decode_modified_utf8(&[
                237, 160, 128, 237, 176, 128, 237, 172, 191, 237, 191, 191, 237, 175, 191, 237,
                191, 191
            ])
            .unwrap(),
            "\u{10000}\u{dffff}\u{10FFFF}"
        );
    }

    #[test]
    fn rejects_raw_null_and_truncation() {
        assert!(decode_modified_utf8(&[97, 0]).is_err());
        assert!(decode_modified_utf8(&[224, 164]).is_err());
        assert!(decode_modified_utf8(&[237, 160]).is_err());
    }

    #[test]
    fn unpaired_surrogates() {
        // High surrogate alone, then a low surrogate before a high one
        assert_eq!(decode_modified_utf8(&[237, 160, 128]).unwrap(), "\u{FFFD}");
        assert_eq!(
            decode_modified_utf8(&[97, 237, 176, 128, 237, 160, 128, 98]).unwrap(),
            "a\u{FFFD}\u{FFFD}b"
        );
    }
}

#[cfg(test)]
mod constant_pool_tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn two_slot_constants() {
        // count 4: Integer at 1, Long at 2 (and 3)
        let mut bytes = vec![0, 4, 3, 0, 0, 0, 7, 5];
        bytes.extend(9i64.to_be_bytes());
        let pool = ConstantPool::deserialize(&mut Cursor::new(&bytes)).unwrap();
        assert_eq!(pool.len(), 2);
        assert_eq!(pool.get(ConstantIndex(2)).unwrap(), &Constant::Long(9));
        assert!(matches!(pool.get(ConstantIndex(3)), Err(Error::BadConstantIndex(3))));
    }

    #[test]
    fn long_in_the_last_slot() {
        // count 3 leaves one slot after the Integer, too few for a Long
        let mut bytes = vec![0, 3, 3, 0, 0, 0, 7, 5];
        bytes.extend(9i64.to_be_bytes());
        assert!(matches!(
            ConstantPool::deserialize(&mut Cursor::new(&bytes)),
            Err(Error::BadConstantIndex(3))
        ));
    }
}
