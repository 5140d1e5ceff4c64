use crate::jvm::class_file::{
    find_attribute, Attribute, ConstantIndex, ConstantPool, ConstantValue, Deserialize,
};
use crate::jvm::{Error, FieldAccessFlags};
use byteorder::ReadBytesExt;

/// Field declared by a class or interface
///
/// [0]: https://docs.oracle.com/javase/specs/jvms/se15/html/jvms-4.html#jvms-4.5
#[derive(Debug, Clone)]
pub struct Field {
    pub access_flags: FieldAccessFlags,
    pub name_index: ConstantIndex,
    pub descriptor_index: ConstantIndex,
    pub attributes: Vec<Attribute>,
}

impl Deserialize for Field {
    fn deserialize<R: ReadBytesExt>(reader: &mut R) -> Result<Self, Error> {
        Ok(Field {
            access_flags: FieldAccessFlags::deserialize(reader)?,
            name_index: ConstantIndex::deserialize(reader)?,
            descriptor_index: ConstantIndex::deserialize(reader)?,
            attributes: Vec::deserialize(reader)?,
        })
    }
}

impl Field {
    /// Initial value for a `static final` field, if there is one
    pub fn constant_value(&self, constants: &ConstantPool) -> Result<Option<ConstantIndex>, Error> {
        Ok(find_attribute::<ConstantValue>(&self.attributes, constants)?.map(|value| value.0))
    }
}
