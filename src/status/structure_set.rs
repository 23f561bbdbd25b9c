//! Small identity set of structures

use crate::heap::Structure;
use std::fmt;

/// Distinct structures referenced by a `Simple` status
///
/// Sets are tiny (bounded by the polymorphic list size), so membership is a
/// linear scan. Equality ignores insertion order.
#[derive(Clone, Default)]
pub struct StructureSet<'a> {
    structures: Vec<&'a Structure>,
}

impl<'a> StructureSet<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn singleton(structure: &'a Structure) -> Self {
        Self {
            structures: vec![structure],
        }
    }

    /// Add a structure. Returns `false` if it was already present.
    pub fn add(&mut self, structure: &'a Structure) -> bool {
        if self.contains(structure) {
            return false;
        }
        self.structures.push(structure);
        true
    }

    pub fn contains(&self, structure: &Structure) -> bool {
        self.structures.iter().any(|s| *s == structure)
    }

    pub fn len(&self) -> usize {
        self.structures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.structures.is_empty()
    }

    pub fn clear(&mut self) {
        self.structures.clear();
    }

    /// The only member, if the set has exactly one
    pub fn singleton_structure(&self) -> Option<&'a Structure> {
        match self.structures.as_slice() {
            [only] => Some(*only),
            _ => None,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &'a Structure> + '_ {
        self.structures.iter().copied()
    }
}

impl PartialEq for StructureSet<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.iter().all(|s| other.contains(s))
    }
}

impl Eq for StructureSet<'_> {}

impl fmt::Debug for StructureSet<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter().map(|s| s.id())).finish()
    }
}

impl fmt::Display for StructureSet<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, structure) in self.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", structure.id())?;
        }
        write!(f, "]")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::heap::{Heap, StructureBuilder};

    #[test]
    fn test_identity_dedup_and_order_free_equality() {
        let mut heap = Heap::new();
        let a = heap.add_structure(StructureBuilder::new().property("x", 0));
        let b = heap.add_structure(StructureBuilder::new().property("x", 0));
        let (a, b) = (heap.structure(a).unwrap(), heap.structure(b).unwrap());

        let mut first = StructureSet::new();
        assert!(first.add(a));
        assert!(!first.add(a));
        assert!(first.add(b));
        assert_eq!(first.len(), 2);
        assert!(first.singleton_structure().is_none());

        let mut second = StructureSet::singleton(b);
        second.add(a);
        assert_eq!(first, second);
        assert_eq!(first.to_string(), "[structure#0, structure#1]");

        second.clear();
        assert!(second.is_empty());
        assert_ne!(first, second);
    }
}
