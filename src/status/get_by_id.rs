//! Property read classification
//!
//! Decides whether a `get_by_id` site can be compiled to a structure check
//! followed by a load from a fixed offset (`Simple`), or whether it has to
//! stay a generic access (`TakesSlowPath`), or a generic access that may run
//! a getter (`MakesCalls`).

use super::chain::{lookup, validate_prototype_chain};
use super::StructureSet;
use crate::bytecode::Instruction;
use crate::heap::{Cell, Heap, Identifier, PropertyOffset, Structure, StructureId};
use crate::profile::{PolymorphicAccessEntry, ProfiledBlock, StubAccess};
use std::fmt;

/// Lattice position of a property read
///
/// `NoInformation < Simple < {TakesSlowPath, MakesCalls}`; the two terminal
/// states are unordered with respect to each other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum GetByIdState {
    /// Nothing was recorded
    #[default]
    NoInformation,
    /// One offset works for every structure in the set
    Simple,
    /// The site is better served by a generic access
    TakesSlowPath,
    /// The access may invoke a getter
    MakesCalls,
}

/// Classification of one property read site
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[must_use]
pub struct GetByIdStatus<'a> {
    state: GetByIdState,
    structure_set: StructureSet<'a>,
    chain: Vec<&'a Structure>,
    specific_value: Option<&'a Cell>,
    offset: Option<PropertyOffset>,
    was_seen_in_jit: bool,
}

impl<'a> GetByIdStatus<'a> {
    /// A non-`Simple` status
    pub fn with_state(state: GetByIdState, was_seen_in_jit: bool) -> Self {
        debug_assert!(state != GetByIdState::Simple);
        Self {
            state,
            was_seen_in_jit,
            ..Self::default()
        }
    }

    /// A `Simple` status
    pub fn simple(
        structure_set: StructureSet<'a>,
        offset: PropertyOffset,
        specific_value: Option<&'a Cell>,
        chain: Vec<&'a Structure>,
        was_seen_in_jit: bool,
    ) -> Self {
        debug_assert!(!structure_set.is_empty());
        Self {
            state: GetByIdState::Simple,
            structure_set,
            chain,
            specific_value,
            offset: Some(offset),
            was_seen_in_jit,
        }
    }

    /// Classify the property read at `bytecode_index`
    pub fn compute_for(block: &ProfiledBlock<'a>, bytecode_index: u32, name: &Identifier) -> Self {
        let status = Self::compute_from_jit(block, bytecode_index, name);
        tracing::debug!(
            block = block.name(),
            bytecode_index,
            %name,
            status = %status,
            "get_by_id status"
        );
        status
    }

    /// Classify a read of `name` from objects known to have `structure`
    ///
    /// Only self accesses are handled; anything that would need a prototype
    /// lookup takes the slow path.
    pub fn compute_for_structure(heap: &'a Heap, structure: &'a Structure, name: &Identifier) -> Self {
        if name.as_index().is_some() {
            return Self::with_state(GetByIdState::TakesSlowPath, false);
        }
        if structure.overrides_get_own_property_slot() {
            return Self::with_state(GetByIdState::TakesSlowPath, false);
        }
        if !structure.property_accesses_are_cacheable() {
            return Self::with_state(GetByIdState::TakesSlowPath, false);
        }

        let Some(access) = lookup(heap, structure, name) else {
            return Self::with_state(GetByIdState::TakesSlowPath, false);
        };
        if access.is_accessor() {
            return Self::with_state(GetByIdState::MakesCalls, false);
        }
        Self::simple(
            StructureSet::singleton(structure),
            access.offset,
            access.specific_value,
            Vec::new(),
            false,
        )
    }

    fn compute_from_llint(block: &ProfiledBlock<'a>, bytecode_index: u32, name: &Identifier) -> Self {
        let cached = match block.instruction(bytecode_index) {
            Some(Instruction::GetById { cached_structure, .. }) => *cached_structure,
            _ => None,
        };
        let Some(structure) = cached.and_then(|id| block.structure(id)) else {
            return Self::with_state(GetByIdState::NoInformation, false);
        };
        match lookup(block.heap(), structure, name) {
            Some(access) if access.is_accessor() => Self::with_state(GetByIdState::MakesCalls, false),
            Some(access) => Self::simple(
                StructureSet::singleton(structure),
                access.offset,
                access.specific_value,
                Vec::new(),
                false,
            ),
            None => Self::with_state(GetByIdState::NoInformation, false),
        }
    }

    fn compute_from_jit(block: &ProfiledBlock<'a>, bytecode_index: u32, name: &Identifier) -> Self {
        if let Some(Instruction::GetArrayLength { .. }) = block.instruction(bytecode_index) {
            return Self::with_state(GetByIdState::NoInformation, false);
        }

        let profile = block.profile();
        if profile.number_of_stub_infos() == 0 {
            return Self::compute_from_llint(block, bytecode_index, name);
        }

        let stub = match profile.stub_info(bytecode_index) {
            Some(stub) if stub.seen => stub,
            _ => return Self::compute_from_llint(block, bytecode_index, name),
        };

        if stub.reset_by_gc {
            return Self::with_state(GetByIdState::TakesSlowPath, true);
        }

        // A getter anywhere in the list could be the one hit at runtime.
        if stub.access.polymorphic_list().iter().any(|entry| !entry.is_direct) {
            return Self::with_state(GetByIdState::MakesCalls, true);
        }

        if block.likely_to_take_slow_case(bytecode_index) {
            return Self::with_state(GetByIdState::TakesSlowPath, true);
        }

        let mut result = Self {
            was_seen_in_jit: true,
            ..Self::default()
        };

        let saw_accessor = match &stub.access {
            StubAccess::Unset => return Self::compute_from_llint(block, bytecode_index, name),
            StubAccess::GetSelf { base } => result.compute_for_self(block, *base, name),
            StubAccess::GetSelfList(list) => result.compute_for_self_list(block, list, name),
            StubAccess::GetProto {
                base,
                prototype_structure,
                is_direct,
            } => {
                if !is_direct {
                    return Self::with_state(GetByIdState::MakesCalls, true);
                }
                result.compute_for_chain(block, *base, &[*prototype_structure], name)
            }
            StubAccess::GetChain {
                base,
                chain,
                is_direct,
            } => {
                if !is_direct {
                    return Self::with_state(GetByIdState::MakesCalls, true);
                }
                result.compute_for_chain(block, *base, chain, name)
            }
            StubAccess::GetProtoList(_)
            | StubAccess::GetArrayLength
            | StubAccess::GetStringLength
            | StubAccess::PutReplace { .. }
            | StubAccess::PutTransition { .. } => false,
        };

        if saw_accessor {
            return Self::with_state(GetByIdState::MakesCalls, true);
        }
        result.finalize()
    }

    /// Returns `true` if the property turned out to be an accessor
    fn compute_for_self(&mut self, block: &ProfiledBlock<'a>, base: StructureId, name: &Identifier) -> bool {
        let Some(structure) = block.structure(base) else {
            return false;
        };
        let Some(access) = lookup(block.heap(), structure, name) else {
            return false;
        };
        if access.is_accessor() {
            return true;
        }
        self.offset = Some(access.offset);
        self.structure_set.add(structure);
        self.specific_value = access.specific_value;
        false
    }

    /// Returns `true` if some list entry turned out to be an accessor
    fn compute_for_self_list(
        &mut self,
        block: &ProfiledBlock<'a>,
        list: &[PolymorphicAccessEntry],
        name: &Identifier,
    ) -> bool {
        for (i, entry) in list.iter().enumerate() {
            debug_assert!(entry.is_direct);
            let Some(structure) = block.structure(entry.base) else {
                self.offset = None;
                break;
            };
            if self.structure_set.contains(structure) {
                continue;
            }

            let Some(access) = lookup(block.heap(), structure, name) else {
                self.offset = None;
                break;
            };
            if access.is_accessor() {
                return true;
            }

            if i == 0 {
                self.offset = Some(access.offset);
                self.specific_value = access.specific_value;
            } else if self.offset != Some(access.offset) {
                tracing::trace!(
                    structure = %structure.id(),
                    offset = %access.offset,
                    "polymorphic offsets disagree"
                );
                // The partial structure set is left for finalize() to clear.
                self.offset = None;
                break;
            } else if self.specific_value != access.specific_value {
                self.specific_value = None;
            }

            self.structure_set.add(structure);
        }
        false
    }

    /// Returns `true` if the property at the end of the chain is an accessor
    fn compute_for_chain(
        &mut self,
        block: &ProfiledBlock<'a>,
        base: StructureId,
        chain: &[StructureId],
        name: &Identifier,
    ) -> bool {
        let Some(chain) = chain
            .iter()
            .map(|id| block.structure(*id))
            .collect::<Option<Vec<_>>>()
        else {
            return false;
        };
        self.chain = chain;

        let Some(base) = block.structure(base) else {
            return false;
        };
        let Some(access) = validate_prototype_chain(block.heap(), base, &self.chain, name) else {
            return false;
        };
        if access.is_accessor() {
            return true;
        }
        self.offset = Some(access.offset);
        self.structure_set.add(base);
        self.specific_value = access.specific_value;
        false
    }

    /// Settle the state; without a valid offset nothing else may remain
    fn finalize(mut self) -> Self {
        match self.offset {
            Some(_) => {
                debug_assert!(!self.structure_set.is_empty());
                self.state = GetByIdState::Simple;
            }
            None => {
                self.state = GetByIdState::TakesSlowPath;
                self.structure_set.clear();
                self.chain.clear();
                self.specific_value = None;
            }
        }
        self
    }

    pub fn state(&self) -> GetByIdState {
        self.state
    }

    pub fn is_set(&self) -> bool {
        self.state != GetByIdState::NoInformation
    }

    pub fn is_simple(&self) -> bool {
        self.state == GetByIdState::Simple
    }

    /// True for both terminal states
    pub fn takes_slow_path(&self) -> bool {
        matches!(self.state, GetByIdState::TakesSlowPath | GetByIdState::MakesCalls)
    }

    pub fn makes_calls(&self) -> bool {
        self.state == GetByIdState::MakesCalls
    }

    pub fn structure_set(&self) -> &StructureSet<'a> {
        &self.structure_set
    }

    /// Prototype structures guarded on the way to the holder
    pub fn chain(&self) -> &[&'a Structure] {
        &self.chain
    }

    pub fn specific_value(&self) -> Option<&'a Cell> {
        self.specific_value
    }

    pub fn offset(&self) -> Option<PropertyOffset> {
        self.offset
    }

    /// Whether the baseline JIT contributed to this result (dumps only)
    pub fn was_seen_in_jit(&self) -> bool {
        self.was_seen_in_jit
    }
}

impl fmt::Display for GetByIdStatus<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.state)?;
        if let Some(offset) = self.offset {
            write!(f, ", structures: {}, offset: {}", self.structure_set, offset)?;
        }
        if let Some(value) = self.specific_value {
            write!(f, ", specific: {}", value.id())?;
        }
        if !self.chain.is_empty() {
            let ids: Vec<String> = self.chain.iter().map(|s| s.id().to_string()).collect();
            write!(f, ", chain: [{}]", ids.join(", "))?;
        }
        if self.was_seen_in_jit {
            write!(f, ", seen in JIT")?;
        }
        Ok(())
    }
}
