//! Global property resolve classification

use super::chain::lookup;
use crate::bytecode::{ResolveOperation, ResolveOperationKind};
use crate::heap::{Cell, Identifier, PropertyOffset, Structure};
use crate::profile::ProfiledBlock;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ResolveGlobalState {
    #[default]
    NoInformation,
    Simple,
    /// Never produced by the classifier
    TakesSlowPath,
}

/// Classification of a resolve that reads a global object property
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[must_use]
pub struct ResolveGlobalStatus<'a> {
    state: ResolveGlobalState,
    structure: Option<&'a Structure>,
    offset: Option<PropertyOffset>,
    specific_value: Option<&'a Cell>,
}

impl<'a> ResolveGlobalStatus<'a> {
    pub fn simple(structure: &'a Structure, offset: PropertyOffset, specific_value: Option<&'a Cell>) -> Self {
        Self {
            state: ResolveGlobalState::Simple,
            structure: Some(structure),
            offset: Some(offset),
            specific_value,
        }
    }

    pub fn compute_for(
        block: &ProfiledBlock<'a>,
        bytecode_index: u32,
        operation: &ResolveOperation,
        name: &Identifier,
    ) -> Self {
        let status = Self::compute_for_operation(block, operation, name);
        tracing::debug!(
            block = block.name(),
            bytecode_index,
            %name,
            status = %status,
            "resolve_global status"
        );
        status
    }

    fn compute_for_operation(block: &ProfiledBlock<'a>, operation: &ResolveOperation, name: &Identifier) -> Self {
        if operation.kind != ResolveOperationKind::GetAndReturnGlobalProperty {
            return Self::default();
        }
        let Some(structure) = operation.structure.and_then(|id| block.structure(id)) else {
            return Self::default();
        };
        match lookup(block.heap(), structure, name) {
            Some(access) if !access.is_accessor() => {
                Self::simple(structure, access.offset, access.specific_value)
            }
            _ => Self::default(),
        }
    }

    pub fn state(&self) -> ResolveGlobalState {
        self.state
    }

    pub fn is_set(&self) -> bool {
        self.state != ResolveGlobalState::NoInformation
    }

    pub fn is_simple(&self) -> bool {
        self.state == ResolveGlobalState::Simple
    }

    pub fn takes_slow_path(&self) -> bool {
        self.state == ResolveGlobalState::TakesSlowPath
    }

    pub fn structure(&self) -> Option<&'a Structure> {
        self.structure
    }

    pub fn offset(&self) -> Option<PropertyOffset> {
        self.offset
    }

    pub fn specific_value(&self) -> Option<&'a Cell> {
        self.specific_value
    }
}

impl fmt::Display for ResolveGlobalStatus<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.state)?;
        if let (Some(structure), Some(offset)) = (self.structure, self.offset) {
            write!(f, ", structure: {}, offset: {}", structure.id(), offset)?;
        }
        if let Some(value) = self.specific_value {
            write!(f, ", specific: {}", value.id())?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ClassifierConfig;
    use crate::heap::{DictionaryKind, ExecutableKind, Heap, StructureBuilder};
    use crate::profile::CodeBlockProfile;

    #[test]
    fn test_global_property() {
        let mut heap = Heap::new();
        let fs = heap.add_structure(StructureBuilder::new());
        let exec = heap.add_executable("print", ExecutableKind::Host, None);
        let print = heap.add_function(fs, exec);
        let global = heap.add_structure(
            StructureBuilder::new()
                .property("counter", 0)
                .specific("print", 1, print),
        );
        let profile = CodeBlockProfile::new("global");
        let config = ClassifierConfig::default();
        let block = ProfiledBlock::new(&heap, &profile, &config);

        let op = ResolveOperation::global_property(Some(global));
        let counter = ResolveGlobalStatus::compute_for(&block, 0, &op, &"counter".into());
        assert!(counter.is_simple());
        assert_eq!(counter.offset(), Some(PropertyOffset(0)));
        assert!(counter.specific_value().is_none());

        let print_status = ResolveGlobalStatus::compute_for(&block, 0, &op, &"print".into());
        assert_eq!(print_status.specific_value().map(Cell::id), Some(print));
        assert_eq!(
            print_status.to_string(),
            "Simple, structure: structure#1, offset: 1, specific: cell#0"
        );
    }

    #[test]
    fn test_dictionary_global_has_no_specific_value() {
        let mut heap = Heap::new();
        let fs = heap.add_structure(StructureBuilder::new());
        let exec = heap.add_executable("print", ExecutableKind::Host, None);
        let print = heap.add_function(fs, exec);
        let global = heap.add_structure(
            StructureBuilder::new()
                .specific("print", 1, print)
                .dictionary(DictionaryKind::Cached),
        );
        let profile = CodeBlockProfile::new("global");
        let config = ClassifierConfig::default();
        let block = ProfiledBlock::new(&heap, &profile, &config);

        let op = ResolveOperation::global_property(Some(global));
        let status = ResolveGlobalStatus::compute_for(&block, 0, &op, &"print".into());
        assert!(status.is_simple());
        assert!(status.specific_value().is_none());
    }

    #[test]
    fn test_no_information() {
        let mut heap = Heap::new();
        let global = heap.add_structure(StructureBuilder::new().property("x", 0));
        let profile = CodeBlockProfile::new("global");
        let config = ClassifierConfig::default();
        let block = ProfiledBlock::new(&heap, &profile, &config);

        let uncached = ResolveOperation::global_property(None);
        let scoped = ResolveOperation {
            kind: ResolveOperationKind::GetAndReturnScopedVar { depth: 1 },
            structure: Some(global),
        };
        let cached = ResolveOperation::global_property(Some(global));
        for (op, name) in [(&uncached, "x"), (&scoped, "x"), (&cached, "y")] {
            let status = ResolveGlobalStatus::compute_for(&block, 0, op, &name.into());
            assert_eq!(status.state(), ResolveGlobalState::NoInformation);
            assert!(status.structure().is_none());
        }
    }
}
