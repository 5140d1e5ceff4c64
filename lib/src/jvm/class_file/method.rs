use crate::jvm::class_file::{
    find_attribute, Attribute, Code, ConstantIndex, ConstantPool, Deserialize,
};
use crate::jvm::{Error, MethodAccessFlags};
use byteorder::ReadBytesExt;

/// Method declared by a class or interface
///
/// [0]: https://docs.oracle.com/javase/specs/jvms/se15/html/jvms-4.html#jvms-4.6
#[derive(Debug, Clone)]
pub struct Method {
    pub access_flags: MethodAccessFlags,
    pub name_index: ConstantIndex,
    pub descriptor_index: ConstantIndex,
    pub attributes: Vec<Attribute>,
}

impl Deserialize for Method {
    fn deserialize<R: ReadBytesExt>(reader: &mut R) -> Result<Self, Error> {
        Ok(Method {
            access_flags: MethodAccessFlags::deserialize(reader)?,
            name_index: ConstantIndex::deserialize(reader)?,
            descriptor_index: ConstantIndex::deserialize(reader)?,
            attributes: Vec::deserialize(reader)?,
        })
    }
}

impl Method {
    /// Method body (absent for `abstract` and `native` methods)
    pub fn code(&self, constants: &ConstantPool) -> Result<Option<Code>, Error> {
        find_attribute::<Code>(&self.attributes, constants)
    }

    /// Name followed by descriptor, eg. `main([Ljava/lang/String;)V`
    pub fn signature(&self, constants: &ConstantPool) -> Result<String, Error> {
        Ok(format!(
            "{}{}",
            constants.utf8(self.name_index)?,
            constants.utf8(self.descriptor_index)?
        ))
    }
}
