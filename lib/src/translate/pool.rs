use crate::tiny::{ConstIndex, Member, MemberIndex, NameIndex, TinyConstant};
use crate::translate::Error;
use std::collections::HashMap;

/// Per-class tables of the tiny class: names, constants, and member references
///
/// Entries are deduplicated. Before converting each method, the builder takes a `Checkpoint`
/// so that a method that fails leaves nothing behind.
#[derive(Debug, Default)]
pub struct ClassPool {
    names: Vec<String>,
    name_indices: HashMap<String, NameIndex>,
    constants: Vec<TinyConstant>,
    constant_indices: HashMap<ConstantKey, ConstIndex>,
    members: Vec<Member>,
    member_indices: HashMap<Member, MemberIndex>,
}

/// Floats are keyed by their bits, so `NaN` and `-0.0` deduplicate sensibly
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum ConstantKey {
    Int(i32),
    Float(u32),
    Long(i64),
    Double(u64),
    String(NameIndex),
}

impl From<TinyConstant> for ConstantKey {
    fn from(constant: TinyConstant) -> ConstantKey {
        match constant {
            TinyConstant::Int(value) => ConstantKey::Int(value),
            TinyConstant::Float(value) => ConstantKey::Float(value.to_bits()),
            TinyConstant::Long(value) => ConstantKey::Long(value),
            TinyConstant::Double(value) => ConstantKey::Double(value.to_bits()),
            TinyConstant::String(name) => ConstantKey::String(name),
        }
    }
}

/// Sizes of the tables at some point
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Checkpoint {
    names: usize,
    constants: usize,
    members: usize,
}

/// Indices are `u16`, and `0xFFFF` is reserved for "none"
fn next_index(len: usize, table: &str) -> Result<u16, Error> {
    u16::try_from(len)
        .ok()
        .filter(|index| *index != u16::MAX)
        .ok_or_else(|| Error::UnsupportedConstruct(format!("{} table overflow", table)))
}

impl ClassPool {
    pub fn new() -> ClassPool {
        ClassPool::default()
    }

    pub fn get_name(&mut self, name: &str) -> Result<NameIndex, Error> {
        if let Some(index) = self.name_indices.get(name) {
            return Ok(*index);
        }
        let index = NameIndex(next_index(self.names.len(), "name")?);
        self.names.push(name.to_string());
        self.name_indices.insert(name.to_string(), index);
        Ok(index)
    }

    pub fn get_constant(&mut self, constant: TinyConstant) -> Result<ConstIndex, Error> {
        let key = ConstantKey::from(constant);
        if let Some(index) = self.constant_indices.get(&key) {
            return Ok(*index);
        }
        let index = ConstIndex(next_index(self.constants.len(), "constant")?);
        self.constants.push(constant);
        self.constant_indices.insert(key, index);
        Ok(index)
    }

    pub fn get_string(&mut self, string: &str) -> Result<ConstIndex, Error> {
        let name = self.get_name(string)?;
        self.get_constant(TinyConstant::String(name))
    }

    pub fn get_member(&mut self, name: &str, descriptor: &str) -> Result<MemberIndex, Error> {
        let member = Member {
            name: self.get_name(name)?,
            descriptor: self.get_name(descriptor)?,
        };
        if let Some(index) = self.member_indices.get(&member) {
            return Ok(*index);
        }
        let index = MemberIndex(next_index(self.members.len(), "member")?);
        self.members.push(member);
        self.member_indices.insert(member, index);
        Ok(index)
    }

    pub fn checkpoint(&self) -> Checkpoint {
        Checkpoint {
            names: self.names.len(),
            constants: self.constants.len(),
            members: self.members.len(),
        }
    }

    /// Forget every entry added since `checkpoint`
    pub fn rollback(&mut self, checkpoint: Checkpoint) {
        self.names.truncate(checkpoint.names);
        self.name_indices
            .retain(|_, index| (index.0 as usize) < checkpoint.names);
        self.constants.truncate(checkpoint.constants);
        self.constant_indices
            .retain(|_, index| (index.0 as usize) < checkpoint.constants);
        self.members.truncate(checkpoint.members);
        self.member_indices
            .retain(|_, index| (index.0 as usize) < checkpoint.members);
    }

    /// Final tables: names, constants, members
    pub fn into_tables(self) -> (Vec<String>, Vec<TinyConstant>, Vec<Member>) {
        (self.names, self.constants, self.members)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn entries_are_deduplicated() {
        let mut pool = ClassPool::new();
        assert_eq!(pool.get_name("run").unwrap(), NameIndex(0));
        assert_eq!(pool.get_member("run", "()V").unwrap(), MemberIndex(0));
        assert_eq!(pool.get_name("()V").unwrap(), NameIndex(1));
        assert_eq!(pool.get_member("run", "()V").unwrap(), MemberIndex(0));
        assert_eq!(pool.get_string("run").unwrap(), ConstIndex(0));
        assert_eq!(
            pool.get_constant(TinyConstant::Double(f64::NAN)).unwrap(),
            ConstIndex(1)
        );
        assert_eq!(
            pool.get_constant(TinyConstant::Double(f64::NAN)).unwrap(),
            ConstIndex(1)
        );
        assert_eq!(
            pool.get_constant(TinyConstant::Int(3)).unwrap(),
            ConstIndex(2)
        );
    }

    #[test]
    fn rollback_forgets_new_entries() {
        let mut pool = ClassPool::new();
        pool.get_member("a", "I").unwrap();
        let checkpoint = pool.checkpoint();

        pool.get_member("b", "J").unwrap();
        pool.get_string("hello").unwrap();
        pool.rollback(checkpoint);
        assert_eq!(pool.checkpoint(), checkpoint);

        // Re-adding gives the same indices as if the rolled back entries never existed
        assert_eq!(pool.get_name("c").unwrap(), NameIndex(2));
        assert_eq!(pool.get_member("a", "I").unwrap(), MemberIndex(0));
        let (names, constants, members) = pool.into_tables();
        assert_eq!(names, vec!["a", "I", "c"]);
        assert!(constants.is_empty());
        assert_eq!(members.len(), 1);
    }
}
