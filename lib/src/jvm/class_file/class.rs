use crate::jvm::class_file::{
    find_attribute, Attribute, ConstantIndex, ConstantPool, Deserialize, Field, Method,
    SourceFile, Version,
};
use crate::jvm::{ClassAccessFlags, Error};
use std::io::Cursor;

/// Representation of the [`class` file format of the JVM][0]
///
/// [0]: https://docs.oracle.com/javase/specs/jvms/se15/html/jvms-4.html
#[derive(Debug, Clone)]
pub struct ClassFile {
    pub version: Version,
    pub constants: ConstantPool,
    pub access_flags: ClassAccessFlags,
    pub this_class: ConstantIndex,

    /// Zero only for `java/lang/Object`
    pub super_class: ConstantIndex,
    pub interfaces: Vec<ConstantIndex>,
    pub fields: Vec<Field>,
    pub methods: Vec<Method>,
    pub attributes: Vec<Attribute>,
}

impl ClassFile {
    /// Magic header bytes that go at the front of the serialized class file
    pub const MAGIC: u32 = 0xCAFE_BABE;

    /// Parse a class file from its bytes
    ///
    /// Trailing bytes after the last class attribute are ignored.
    pub fn parse(bytes: &[u8]) -> Result<ClassFile, Error> {
        let mut reader = Cursor::new(bytes);

        let magic = u32::deserialize(&mut reader)?;
        if magic != ClassFile::MAGIC {
            return Err(Error::BadMagic(magic));
        }

        Ok(ClassFile {
            version: Version::deserialize(&mut reader)?,
            constants: ConstantPool::deserialize(&mut reader)?,
            access_flags: ClassAccessFlags::deserialize(&mut reader)?,
            this_class: ConstantIndex::deserialize(&mut reader)?,
            super_class: ConstantIndex::deserialize(&mut reader)?,
            interfaces: Vec::deserialize(&mut reader)?,
            fields: Vec::deserialize(&mut reader)?,
            methods: Vec::deserialize(&mut reader)?,
            attributes: Vec::deserialize(&mut reader)?,
        })
    }

    /// Binary name of the class, eg. `java/util/HashMap$Node`
    pub fn name(&self) -> Result<&str, Error> {
        self.constants.class_name(self.this_class)
    }

    pub fn super_name(&self) -> Result<Option<&str>, Error> {
        if self.super_class.0 == 0 {
            Ok(None)
        } else {
            self.constants.class_name(self.super_class).map(Some)
        }
    }

    pub fn source_file(&self) -> Result<Option<&str>, Error> {
        match find_attribute::<SourceFile>(&self.attributes, &self.constants)? {
            None => Ok(None),
            Some(SourceFile(index)) => self.constants.utf8(index).map(Some),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::jvm::class_file::Constant;

    fn minimal_class() -> Vec<u8> {
        let mut bytes = vec![0xCA, 0xFE, 0xBA, 0xBE, 0, 0, 0, 52];
        // 4 constants: utf8 "Foo", class #1, long (two slots)
        bytes.extend([0, 5]);
        bytes.extend([1, 0, 3, b'F', b'o', b'o']);
        bytes.extend([7, 0, 1]);
        bytes.extend([5, 0, 0, 0, 0, 0, 0, 0, 42]);
        bytes.extend([0, 0x21, 0, 2, 0, 0]);
        bytes.extend([0, 0, 0, 0, 0, 0, 0, 0]);
        bytes
    }

    #[test]
    fn parse_minimal_class() {
        let class = ClassFile::parse(&minimal_class()).unwrap();
        assert_eq!(class.version, Version::JAVA8);
        assert_eq!(class.name().unwrap(), "Foo");
        assert_eq!(class.super_name().unwrap(), None);
        assert_eq!(class.source_file().unwrap(), None);
        assert_eq!(
            class.constants.get(ConstantIndex(3)).unwrap(),
            &Constant::Long(42)
        );
        assert!(matches!(
            class.constants.get(ConstantIndex(4)),
            Err(Error::BadConstantIndex(4))
        ));
        assert!(class.access_flags.contains(ClassAccessFlags::PUBLIC | ClassAccessFlags::SUPER));
    }

    #[test]
    fn bad_magic() {
        let mut bytes = minimal_class();
        bytes[0] = 0xCB;
        assert!(matches!(ClassFile::parse(&bytes), Err(Error::BadMagic(0xCBFE_BABE))));
    }

    #[test]
    fn truncated() {
        let bytes = minimal_class();
        for len in [0, 3, 9, 20, bytes.len() - 1] {
            assert!(
                matches!(ClassFile::parse(&bytes[..len]), Err(Error::Truncated)),
                "prefix of length {}",
                len
            );
        }
    }

    #[test]
    fn unknown_constant_tag() {
        let mut bytes = minimal_class();
        bytes[10] = 2;
        assert!(matches!(
            ClassFile::parse(&bytes),
            Err(Error::UnknownConstantTag { tag: 2, index: 1 })
        ));
    }
}
