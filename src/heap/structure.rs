//! Structures (hidden classes) and property lookup
//!
//! A structure describes the property layout shared by every object that
//! acquired the same properties in the same order. The classifiers only ever
//! ask a structure four things: where a property lives, whether the layout is
//! a mutable dictionary, which object is its prototype, and whether property
//! caching is allowed at all.

use super::{CellId, Identifier, StructureId};
use bitflags::bitflags;
use rustc_hash::FxHashMap as HashMap;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Offsets at or above this value live in out-of-line (butterfly) storage
pub const FIRST_OUT_OF_LINE_OFFSET: u32 = 100;

/// Storage slot of a property within an object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PropertyOffset(pub u32);

impl PropertyOffset {
    /// Whether the slot is stored inline in the object cell
    pub fn is_inline(self) -> bool {
        self.0 < FIRST_OUT_OF_LINE_OFFSET
    }

    /// Whether the slot is stored in out-of-line storage
    pub fn is_out_of_line(self) -> bool {
        !self.is_inline()
    }

    /// Index relative to the start of the storage area that holds it
    pub fn index_relative_to_base(self) -> u32 {
        if self.is_inline() {
            self.0
        } else {
            self.0 - FIRST_OUT_OF_LINE_OFFSET
        }
    }
}

impl fmt::Display for PropertyOffset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

bitflags! {
    /// Attributes attached to a property slot
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    #[serde(transparent)]
    pub struct PropertyAttributes: u32 {
        const READ_ONLY = 1 << 1;
        const DONT_ENUM = 1 << 2;
        const DONT_DELETE = 1 << 3;
        const FUNCTION = 1 << 4;
        /// Property is a getter/setter pair; reading it runs code
        const ACCESSOR = 1 << 5;
    }
}

bitflags! {
    /// Type-level behavior flags of a structure
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    #[serde(transparent)]
    pub struct TypeInfoFlags: u32 {
        /// The class implements its own property lookup
        const OVERRIDES_GET_OWN_PROPERTY_SLOT = 1 << 0;
        /// Caches must never remember offsets for this type
        const PROHIBITS_PROPERTY_CACHING = 1 << 1;
        const MASQUERADES_AS_UNDEFINED = 1 << 2;
    }
}

/// How mutable the layout of a structure is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DictionaryKind {
    /// Shared, transition-based layout
    #[default]
    None,
    /// Per-object layout that may still be cached
    Cached,
    /// Per-object layout that must not be cached
    Uncached,
}

/// One entry of a structure's property table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyEntry {
    pub offset: PropertyOffset,
    pub attributes: PropertyAttributes,
    /// A cell every object of this structure is known to hold in the slot
    pub specific_value: Option<CellId>,
}

/// A hidden class
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Structure {
    pub(crate) id: StructureId,
    pub(crate) properties: HashMap<Identifier, PropertyEntry>,
    pub(crate) stored_prototype: Option<CellId>,
    #[serde(default)]
    pub(crate) dictionary_kind: DictionaryKind,
    #[serde(default)]
    pub(crate) type_flags: TypeInfoFlags,
    #[serde(default)]
    pub(crate) transition_watchpoint_invalidated: bool,
}

// Structures are compared by identity.
impl PartialEq for Structure {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Structure {}

impl Structure {
    pub fn id(&self) -> StructureId {
        self.id
    }

    /// Look up a property by name
    pub fn get(&self, name: &Identifier) -> Option<PropertyEntry> {
        self.properties.get(name).copied()
    }

    /// Offset of a property, ignoring attributes and specific values
    pub fn offset_of(&self, name: &Identifier) -> Option<PropertyOffset> {
        self.get(name).map(|entry| entry.offset)
    }

    pub fn is_dictionary(&self) -> bool {
        self.dictionary_kind != DictionaryKind::None
    }

    pub fn dictionary_kind(&self) -> DictionaryKind {
        self.dictionary_kind
    }

    /// The prototype object stored in this structure, if any
    pub fn stored_prototype(&self) -> Option<CellId> {
        self.stored_prototype
    }

    /// The object consulted next when a lookup misses on this structure
    pub fn prototype_for_lookup(&self) -> Option<CellId> {
        self.stored_prototype
    }

    pub fn type_flags(&self) -> TypeInfoFlags {
        self.type_flags
    }

    pub fn overrides_get_own_property_slot(&self) -> bool {
        self.type_flags
            .contains(TypeInfoFlags::OVERRIDES_GET_OWN_PROPERTY_SLOT)
    }

    /// Whether an inline cache may remember offsets for this structure
    pub fn property_accesses_are_cacheable(&self) -> bool {
        self.dictionary_kind != DictionaryKind::Uncached
            && !self
                .type_flags
                .contains(TypeInfoFlags::PROHIBITS_PROPERTY_CACHING)
    }

    /// Whether transitions away from this structure have been observed
    pub fn transition_watchpoint_set_has_been_invalidated(&self) -> bool {
        self.transition_watchpoint_invalidated
    }

    /// Number of properties in the table
    pub fn property_count(&self) -> usize {
        self.properties.len()
    }
}

/// Builder for structures added to a [`Heap`](super::Heap)
#[derive(Debug, Clone, Default)]
pub struct StructureBuilder {
    properties: HashMap<Identifier, PropertyEntry>,
    stored_prototype: Option<CellId>,
    dictionary_kind: DictionaryKind,
    type_flags: TypeInfoFlags,
    transition_watchpoint_invalidated: bool,
}

impl StructureBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a plain data property
    pub fn property(self, name: impl Into<Identifier>, offset: u32) -> Self {
        self.entry(name, offset, PropertyAttributes::empty(), None)
    }

    /// Add a getter/setter property
    pub fn accessor(self, name: impl Into<Identifier>, offset: u32) -> Self {
        self.entry(name, offset, PropertyAttributes::ACCESSOR, None)
    }

    /// Add a property whose value is known to be the given cell
    pub fn specific(self, name: impl Into<Identifier>, offset: u32, value: CellId) -> Self {
        self.entry(name, offset, PropertyAttributes::FUNCTION, Some(value))
    }

    /// Add a property with explicit attributes
    pub fn entry(
        mut self,
        name: impl Into<Identifier>,
        offset: u32,
        attributes: PropertyAttributes,
        specific_value: Option<CellId>,
    ) -> Self {
        self.properties.insert(
            name.into(),
            PropertyEntry {
                offset: PropertyOffset(offset),
                attributes,
                specific_value,
            },
        );
        self
    }

    pub fn prototype(mut self, prototype: CellId) -> Self {
        self.stored_prototype = Some(prototype);
        self
    }

    pub fn dictionary(mut self, kind: DictionaryKind) -> Self {
        self.dictionary_kind = kind;
        self
    }

    pub fn type_flags(mut self, flags: TypeInfoFlags) -> Self {
        self.type_flags = flags;
        self
    }

    /// Mark the transition watchpoint as fired
    pub fn transitioned(mut self) -> Self {
        self.transition_watchpoint_invalidated = true;
        self
    }

    pub(crate) fn build(self, id: StructureId) -> Structure {
        Structure {
            id,
            properties: self.properties,
            stored_prototype: self.stored_prototype,
            dictionary_kind: self.dictionary_kind,
            type_flags: self.type_flags,
            transition_watchpoint_invalidated: self.transition_watchpoint_invalidated,
        }
    }
}
