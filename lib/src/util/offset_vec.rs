use std::fmt;
use std::iter::{Enumerate, Zip};
use std::slice::Iter;
use std::vec::IntoIter as VecIntoIter;

/// Byte (or slot) length of an entry
pub trait Width {
    fn width(&self) -> usize;
}

/// Append-only sequence of entries addressed by the sum of the widths before them
///
/// Both sides of the conversion are laid out like this: the JVM constant pool, where `long`
/// and `double` take two slots and indexing starts at 1, and tiny method bodies, where each
/// record kind has its own byte length.
#[derive(Clone)]
pub struct OffsetVec<T> {
    entries: Vec<T>,

    /// `offsets[i]` is where `entries[i]` starts (strictly increasing for non-empty entries)
    offsets: Vec<Offset>,

    /// Where the next entry will start
    end: Offset,
}

/// Position in an `OffsetVec`, in units of width
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
pub struct Offset(pub usize);

/// Outcome of looking an entry up by offset
pub enum Lookup<'a, T> {
    /// An entry starts exactly at the offset
    Found(usize, &'a T),

    /// The offset falls inside the entry at this index
    Inside(usize),

    /// The offset is before the first entry or at/after the end
    Outside,
}

impl<'a, T> Lookup<'a, T> {
    pub fn found(&self) -> Option<&'a T> {
        match self {
            Lookup::Found(_, entry) => Some(entry),
            Lookup::Inside(_) | Lookup::Outside => None,
        }
    }
}

impl<T: Width> OffsetVec<T> {
    pub fn new() -> OffsetVec<T> {
        OffsetVec::starting_at(Offset(0))
    }

    /// Empty vector whose first entry will be at `start`
    pub fn starting_at(start: Offset) -> OffsetVec<T> {
        OffsetVec {
            entries: vec![],
            offsets: vec![],
            end: start,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Offset the next pushed entry will get
    pub fn end_offset(&self) -> Offset {
        self.end
    }

    /// Append an entry, returning its offset
    pub fn push(&mut self, entry: T) -> Offset {
        let offset = self.end;
        self.end.0 += entry.width();
        self.offsets.push(offset);
        self.entries.push(entry);
        offset
    }

    pub fn lookup(&self, offset: Offset) -> Lookup<'_, T> {
        if offset >= self.end {
            return Lookup::Outside;
        }
        match self.offsets.binary_search(&offset) {
            Ok(index) => Lookup::Found(index, &self.entries[index]),
            Err(0) => Lookup::Outside,
            Err(after) => Lookup::Inside(after - 1),
        }
    }

    /// Entry at position `index`, along with its offset
    pub fn get_index(&self, index: usize) -> Option<(Offset, &T)> {
        Some((*self.offsets.get(index)?, self.entries.get(index)?))
    }

    pub fn iter(&self) -> OffsetVecIter<'_, T> {
        self.into_iter()
    }
}

impl<T: Width> Default for OffsetVec<T> {
    fn default() -> Self {
        OffsetVec::new()
    }
}

impl<T: PartialEq> PartialEq for OffsetVec<T> {
    fn eq(&self, other: &Self) -> bool {
        self.offsets == other.offsets && self.entries == other.entries
    }
}

impl<T: Eq> Eq for OffsetVec<T> {}

impl<T: fmt::Debug> fmt::Debug for OffsetVec<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(
                self.offsets
                    .iter()
                    .zip(&self.entries)
                    .map(|(offset, entry)| format!("@{} {:?}", offset.0, entry)),
            )
            .finish()
    }
}

/// Owning iterator yielding `(offset, index, entry)`
pub struct OffsetVecIntoIter<T>(Enumerate<Zip<VecIntoIter<Offset>, VecIntoIter<T>>>);

impl<T> Iterator for OffsetVecIntoIter<T> {
    type Item = (Offset, usize, T);

    fn next(&mut self) -> Option<Self::Item> {
        let (index, (offset, entry)) = self.0.next()?;
        Some((offset, index, entry))
    }
}

impl<T> IntoIterator for OffsetVec<T> {
    type Item = (Offset, usize, T);
    type IntoIter = OffsetVecIntoIter<T>;

    fn into_iter(self) -> OffsetVecIntoIter<T> {
        OffsetVecIntoIter(self.offsets.into_iter().zip(self.entries).enumerate())
    }
}

/// Borrowing iterator yielding `(offset, index, &entry)`
pub struct OffsetVecIter<'a, T>(Enumerate<Zip<Iter<'a, Offset>, Iter<'a, T>>>);

impl<'a, T> Iterator for OffsetVecIter<'a, T> {
    type Item = (Offset, usize, &'a T);

    fn next(&mut self) -> Option<Self::Item> {
        let (index, (offset, entry)) = self.0.next()?;
        Some((*offset, index, entry))
    }
}

impl<'a, T> IntoIterator for &'a OffsetVec<T> {
    type Item = (Offset, usize, &'a T);
    type IntoIter = OffsetVecIter<'a, T>;

    fn into_iter(self) -> OffsetVecIter<'a, T> {
        OffsetVecIter(self.offsets.iter().zip(self.entries.iter()).enumerate())
    }
}
