//! Property write classification

use super::chain::{lookup, transition_chain_is_still_valid};
use crate::bytecode::{Instruction, LlintPutCache};
use crate::heap::{Heap, Identifier, PropertyOffset, Structure, StructureId};
use crate::profile::{ProfiledBlock, StubAccess};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PutByIdState {
    /// Nothing was recorded
    #[default]
    NoInformation,
    /// Overwrites an existing property at a known offset
    SimpleReplace,
    /// Adds a property, moving the object from one structure to another
    SimpleTransition,
    /// Needs a generic put
    TakesSlowPath,
}

/// Classification of one property write site
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[must_use]
pub struct PutByIdStatus<'a> {
    state: PutByIdState,
    old_structure: Option<&'a Structure>,
    new_structure: Option<&'a Structure>,
    chain: Vec<&'a Structure>,
    offset: Option<PropertyOffset>,
}

impl<'a> PutByIdStatus<'a> {
    pub fn with_state(state: PutByIdState) -> Self {
        debug_assert!(matches!(
            state,
            PutByIdState::NoInformation | PutByIdState::TakesSlowPath
        ));
        Self {
            state,
            ..Self::default()
        }
    }

    pub fn replace(structure: &'a Structure, offset: PropertyOffset) -> Self {
        Self {
            state: PutByIdState::SimpleReplace,
            old_structure: Some(structure),
            new_structure: None,
            chain: Vec::new(),
            offset: Some(offset),
        }
    }

    pub fn transition(
        old_structure: &'a Structure,
        new_structure: &'a Structure,
        chain: Vec<&'a Structure>,
        offset: PropertyOffset,
    ) -> Self {
        Self {
            state: PutByIdState::SimpleTransition,
            old_structure: Some(old_structure),
            new_structure: Some(new_structure),
            chain,
            offset: Some(offset),
        }
    }

    /// Classify the property write at `bytecode_index`
    pub fn compute_for(block: &ProfiledBlock<'a>, bytecode_index: u32, name: &Identifier) -> Self {
        let status = Self::compute_from_jit(block, bytecode_index, name);
        tracing::debug!(
            block = block.name(),
            bytecode_index,
            %name,
            status = %status,
            "put_by_id status"
        );
        status
    }

    fn compute_from_llint(block: &ProfiledBlock<'a>, bytecode_index: u32, name: &Identifier) -> Self {
        let no_information = || Self::with_state(PutByIdState::NoInformation);
        let Some(Instruction::PutById { cache, .. }) = block.instruction(bytecode_index) else {
            return no_information();
        };

        match cache {
            LlintPutCache::Unset => no_information(),
            LlintPutCache::Replace { structure } => {
                let Some(structure) = block.structure(*structure) else {
                    return no_information();
                };
                match lookup(block.heap(), structure, name) {
                    Some(access) => Self::replace(structure, access.offset),
                    None => no_information(),
                }
            }
            LlintPutCache::Transition { old, new, chain } => {
                Self::simple_transition(block, *old, *new, chain, name).unwrap_or_else(no_information)
            }
        }
    }

    fn compute_from_jit(block: &ProfiledBlock<'a>, bytecode_index: u32, name: &Identifier) -> Self {
        let profile = block.profile();
        if profile.number_of_stub_infos() == 0 {
            return Self::compute_from_llint(block, bytecode_index, name);
        }

        if block.likely_to_take_slow_case(bytecode_index) {
            return Self::with_state(PutByIdState::TakesSlowPath);
        }

        let stub = match profile.stub_info(bytecode_index) {
            Some(stub) if stub.seen => stub,
            _ => return Self::compute_from_llint(block, bytecode_index, name),
        };

        let slow_path = || Self::with_state(PutByIdState::TakesSlowPath);
        if stub.reset_by_gc {
            return slow_path();
        }

        match &stub.access {
            // Seen by the JIT but never optimized.
            StubAccess::Unset => slow_path(),
            StubAccess::PutReplace { base } => {
                let Some(structure) = block.structure(*base) else {
                    return slow_path();
                };
                match lookup(block.heap(), structure, name) {
                    Some(access) => Self::replace(structure, access.offset),
                    None => slow_path(),
                }
            }
            StubAccess::PutTransition {
                previous,
                structure,
                chain,
                ..
            } => Self::simple_transition(block, *previous, *structure, chain, name).unwrap_or_else(slow_path),
            _ => slow_path(),
        }
    }

    fn simple_transition(
        block: &ProfiledBlock<'a>,
        old: StructureId,
        new: StructureId,
        chain: &[StructureId],
        name: &Identifier,
    ) -> Option<Self> {
        let old = block.structure(old)?;
        let new = block.structure(new)?;
        let chain = chain
            .iter()
            .map(|id| block.structure(*id))
            .collect::<Option<Vec<_>>>()?;
        let access = lookup(block.heap(), new, name)?;
        Some(Self::transition(old, new, chain, access.offset))
    }

    /// Whether a transition's cached prototype chain still matches the heap
    ///
    /// Non-transition statuses have nothing to revalidate and report `true`.
    pub fn transition_is_still_valid(&self, heap: &Heap, direct: bool) -> bool {
        match (self.state, self.old_structure) {
            (PutByIdState::SimpleTransition, Some(old)) => {
                transition_chain_is_still_valid(heap, direct, old, &self.chain)
            }
            _ => true,
        }
    }

    pub fn state(&self) -> PutByIdState {
        self.state
    }

    pub fn is_set(&self) -> bool {
        self.state != PutByIdState::NoInformation
    }

    pub fn is_simple_replace(&self) -> bool {
        self.state == PutByIdState::SimpleReplace
    }

    pub fn is_simple_transition(&self) -> bool {
        self.state == PutByIdState::SimpleTransition
    }

    pub fn takes_slow_path(&self) -> bool {
        self.state == PutByIdState::TakesSlowPath
    }

    /// The structure the object has before the write
    pub fn old_structure(&self) -> Option<&'a Structure> {
        self.old_structure
    }

    /// The structure after a transition
    pub fn new_structure(&self) -> Option<&'a Structure> {
        self.new_structure
    }

    pub fn structure_chain(&self) -> &[&'a Structure] {
        &self.chain
    }

    pub fn offset(&self) -> Option<PropertyOffset> {
        self.offset
    }
}

impl fmt::Display for PutByIdStatus<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.state)?;
        match (self.old_structure, self.new_structure) {
            (Some(old), Some(new)) => write!(f, ", {} -> {}", old.id(), new.id())?,
            (Some(old), None) => write!(f, ", structure: {}", old.id())?,
            _ => {}
        }
        if let Some(offset) = self.offset {
            write!(f, ", offset: {}", offset)?;
        }
        if !self.chain.is_empty() {
            let ids: Vec<String> = self.chain.iter().map(|s| s.id().to_string()).collect();
            write!(f, ", chain: [{}]", ids.join(", "))?;
        }
        Ok(())
    }
}
