use crate::jvm::class_file::{ClassFile, Constant};
use crate::tiny::{ClassId, Serialize};
use crate::translate::Error;
use byteorder::WriteBytesExt;
use std::collections::HashMap;
use std::io;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Process-wide table of class names
///
/// Ids are positions in the table, so the table is append-only. Many classes can be converted
/// in parallel against the same table: lookups take a shared lock and only new names take the
/// exclusive one.
#[derive(Debug, Default)]
pub struct SymbolTable {
    inner: RwLock<Symbols>,
}

#[derive(Debug, Default)]
struct Symbols {
    names: Vec<String>,
    ids: HashMap<String, ClassId>,
}

impl SymbolTable {
    pub const MAGIC: [u8; 4] = *b"TSYM";

    pub fn new() -> SymbolTable {
        SymbolTable::default()
    }

    // The table is never left half-updated, so a poisoned lock is still usable
    fn read(&self) -> RwLockReadGuard<'_, Symbols> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Symbols> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Get the id of a class, adding it if it is new
    pub fn intern(&self, name: &str) -> Result<ClassId, Error> {
        if let Some(id) = self.lookup(name) {
            return Ok(id);
        }

        let mut symbols = self.write();
        if let Some(id) = symbols.ids.get(name) {
            return Ok(*id);
        }
        let id = u16::try_from(symbols.names.len())
            .ok()
            .filter(|id| *id != u16::MAX)
            .map(ClassId)
            .ok_or_else(|| Error::UnsupportedConstruct("more than 65535 classes".to_string()))?;
        symbols.names.push(name.to_string());
        symbols.ids.insert(name.to_string(), id);
        Ok(id)
    }

    pub fn lookup(&self, name: &str) -> Option<ClassId> {
        self.read().ids.get(name).copied()
    }

    pub fn name(&self, id: ClassId) -> Option<String> {
        self.read().names.get(id.0 as usize).cloned()
    }

    pub fn len(&self) -> usize {
        self.read().names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Intern every class name a class file refers to, in the order they appear
    ///
    /// Doing this for all inputs (in input order) before converting anything makes ids
    /// independent of the order in which classes are converted.
    pub fn prepopulate(&self, class: &ClassFile) -> Result<(), Error> {
        self.intern(class.name()?)?;
        if let Some(super_name) = class.super_name()? {
            self.intern(super_name)?;
        }
        for interface in &class.interfaces {
            self.intern(class.constants.class_name(*interface)?)?;
        }
        for (_, constant) in class.constants.iter() {
            if let Constant::Class(name) = constant {
                self.intern(class.constants.utf8(*name)?)?;
            }
        }
        Ok(())
    }

    /// Write the table as `magic, u16 count, (u16 length, UTF-8)*`
    pub fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> io::Result<()> {
        writer.write_all(&SymbolTable::MAGIC)?;
        self.read().names.serialize(writer)
    }
}
