//! Property lookup on cached structures and prototype chain revalidation
//!
//! Every classifier ends up asking the same question of a structure: where
//! does this name live, and is its value pinned to a specific cell. The
//! prototype-chain helpers first make sure the chain the baseline JIT cached
//! still matches the live prototypes before that question is asked of the
//! structure at the end of it.

use crate::heap::{Cell, Heap, Identifier, PropertyAttributes, PropertyOffset, Structure};

/// Where a property lives on a structure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PropertyAccess<'a> {
    pub offset: PropertyOffset,
    pub attributes: PropertyAttributes,
    /// Known constant value; always `None` on dictionary structures
    pub specific_value: Option<&'a Cell>,
}

impl PropertyAccess<'_> {
    pub fn is_accessor(&self) -> bool {
        self.attributes.contains(PropertyAttributes::ACCESSOR)
    }
}

/// Look a name up directly on `structure`
///
/// A dictionary's layout can change without a structure transition, so a
/// specific value found on one is discarded.
pub fn lookup<'a>(heap: &'a Heap, structure: &'a Structure, name: &Identifier) -> Option<PropertyAccess<'a>> {
    let entry = structure.get(name)?;
    let specific_value = if structure.is_dictionary() {
        None
    } else {
        entry.specific_value.and_then(|id| heap.cell(id))
    };
    Some(PropertyAccess {
        offset: entry.offset,
        attributes: entry.attributes,
        specific_value,
    })
}

/// Revalidate a cached prototype chain and look `name` up at its end
///
/// Starting from `base`, each step moves to the lookup prototype of the
/// current structure; that object must still have exactly the structure
/// cached in `chain` at the same position. Any mismatch, or a missing
/// prototype, rejects the whole chain. An empty chain never validates.
pub fn validate_prototype_chain<'a>(
    heap: &'a Heap,
    base: &'a Structure,
    chain: &[&'a Structure],
    name: &Identifier,
) -> Option<PropertyAccess<'a>> {
    let mut current = base;
    for (depth, &cached) in chain.iter().enumerate() {
        let Some(live) = current.prototype_for_lookup().and_then(|p| heap.structure_of(p)) else {
            tracing::trace!(depth, structure = %current.id(), "prototype chain ends early");
            return None;
        };
        if live != cached {
            tracing::trace!(
                depth,
                cached = %cached.id(),
                live = %live.id(),
                "prototype structure changed since the cache was filled"
            );
            return None;
        }
        current = cached;
    }
    if chain.is_empty() {
        return None;
    }
    lookup(heap, current, name)
}

/// Check that a cached put transition chain still describes the live prototypes
///
/// Direct puts never consult prototypes and are always valid. Otherwise the
/// stored prototype of `previous`, and of every chain entry, must currently
/// have the structure that follows it in `chain`.
pub fn transition_chain_is_still_valid(
    heap: &Heap,
    direct: bool,
    previous: &Structure,
    chain: &[&Structure],
) -> bool {
    if direct {
        return true;
    }
    let links = std::iter::once(previous).chain(chain.iter().copied());
    for (position, structure) in links.enumerate() {
        let Some(prototype) = structure.stored_prototype() else {
            continue;
        };
        let live = heap.structure_of(prototype);
        let expected = chain.get(position).copied();
        match (live, expected) {
            (Some(live), Some(expected)) if live == expected => {}
            _ => {
                tracing::trace!(position, "put transition chain no longer matches");
                return false;
            }
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::heap::{DictionaryKind, StructureBuilder, StructureId};

    /// base -> proto1 -> proto2 (holds "x")
    fn two_level_heap() -> (Heap, StructureId, StructureId, StructureId, crate::heap::CellId) {
        let mut heap = Heap::new();
        let proto2_s = heap.add_structure(StructureBuilder::new().property("x", 4));
        let proto2 = heap.add_object(proto2_s);
        let proto1_s = heap.add_structure(StructureBuilder::new().prototype(proto2));
        let proto1 = heap.add_object(proto1_s);
        let base_s = heap.add_structure(StructureBuilder::new().prototype(proto1));
        (heap, base_s, proto1_s, proto2_s, proto1)
    }

    #[test]
    fn test_valid_chain() {
        let (heap, base, p1, p2, _) = two_level_heap();
        let s = |id| heap.structure(id).unwrap();
        let access = validate_prototype_chain(&heap, s(base), &[s(p1), s(p2)], &"x".into()).unwrap();
        assert_eq!(access.offset, PropertyOffset(4));
        assert!(access.specific_value.is_none());
    }

    #[test]
    fn test_replaced_middle_structure_rejects() {
        let (mut heap, base, p1, p2, proto1) = two_level_heap();
        let replacement = heap.add_structure(StructureBuilder::new().property("y", 0));
        heap.transition(proto1, replacement);
        let s = |id| heap.structure(id).unwrap();
        assert!(validate_prototype_chain(&heap, s(base), &[s(p1), s(p2)], &"x".into()).is_none());
    }

    #[test]
    fn test_missing_property_at_end() {
        let (heap, base, p1, p2, _) = two_level_heap();
        let s = |id| heap.structure(id).unwrap();
        assert!(validate_prototype_chain(&heap, s(base), &[s(p1), s(p2)], &"nope".into()).is_none());
        assert!(validate_prototype_chain(&heap, s(base), &[], &"x".into()).is_none());
    }

    #[test]
    fn test_dictionary_drops_specific_value() {
        let mut heap = Heap::new();
        let fn_s = heap.add_structure(StructureBuilder::new());
        let exec = heap.add_executable("f", crate::heap::ExecutableKind::Host, None);
        let f = heap.add_function(fn_s, exec);
        let plain = heap.add_structure(StructureBuilder::new().specific("f", 0, f));
        let dict = heap.add_structure(
            StructureBuilder::new()
                .specific("f", 0, f)
                .dictionary(DictionaryKind::Cached),
        );
        let name = Identifier::from("f");
        let plain_access = lookup(&heap, heap.structure(plain).unwrap(), &name).unwrap();
        assert_eq!(plain_access.specific_value.map(|c| c.id()), Some(f));
        let dict_access = lookup(&heap, heap.structure(dict).unwrap(), &name).unwrap();
        assert!(dict_access.specific_value.is_none());
    }

    #[test]
    fn test_transition_chain_validity() {
        let (mut heap, base, p1, p2, proto1) = two_level_heap();
        {
            let s = |id| heap.structure(id).unwrap();
            assert!(transition_chain_is_still_valid(&heap, false, s(base), &[s(p1), s(p2)]));
            assert!(!transition_chain_is_still_valid(&heap, false, s(base), &[s(p1)]));
            assert!(transition_chain_is_still_valid(&heap, true, s(base), &[]));
        }
        let replacement = heap.add_structure(StructureBuilder::new());
        heap.transition(proto1, replacement);
        let s = |id| heap.structure(id).unwrap();
        assert!(!transition_chain_is_still_valid(&heap, false, s(base), &[s(p1), s(p2)]));
    }
}
