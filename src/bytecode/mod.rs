//! Profiled bytecode instructions
//!
//! Only the instructions that carry inline-cache feedback are modeled. Each
//! variant owns the interpreter-level cache slot the low-level interpreter
//! fills while running, so a classifier can fall back to it when the
//! baseline JIT has not seen the site yet.

use crate::heap::{CellId, Identifier, StructureId};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Whether code is specialized for calling or for constructing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CodeSpecializationKind {
    Call,
    Construct,
}

/// Interpreter-level call cache: a single "last seen callee" slot
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LlintCallLinkInfo {
    pub last_seen_callee: Option<CellId>,
}

/// Interpreter-level cache of a property write
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum LlintPutCache {
    /// Nothing cached
    #[default]
    Unset,
    /// Overwrite of an existing property on `structure`
    Replace { structure: StructureId },
    /// Property addition moving `old` to `new`
    Transition {
        old: StructureId,
        new: StructureId,
        chain: Vec<StructureId>,
    },
}

/// How a scope resolve finds its value
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResolveOperationKind {
    /// Read a property of the global object
    GetAndReturnGlobalProperty,
    /// Read a global variable slot directly
    GetAndReturnGlobalVar,
    /// Read from an enclosing scope
    GetAndReturnScopedVar { depth: u32 },
}

/// One cached step of a resolve
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolveOperation {
    pub kind: ResolveOperationKind,
    /// Structure of the global object when the operation was cached
    pub structure: Option<StructureId>,
}

impl ResolveOperation {
    pub fn global_property(structure: Option<StructureId>) -> Self {
        Self {
            kind: ResolveOperationKind::GetAndReturnGlobalProperty,
            structure,
        }
    }
}

/// A bytecode instruction with its interpreter-level feedback
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Instruction {
    GetById {
        identifier: Identifier,
        cached_structure: Option<StructureId>,
        #[serde(default)]
        out_of_line: bool,
    },
    /// `length` read on an array; handled by a dedicated fast path
    GetArrayLength { identifier: Identifier },
    PutById {
        identifier: Identifier,
        /// Defines an own property instead of assigning through setters
        direct: bool,
        cache: LlintPutCache,
    },
    Call {
        kind: CodeSpecializationKind,
        link: LlintCallLinkInfo,
    },
    Resolve {
        identifier: Identifier,
        operations: Vec<ResolveOperation>,
    },
}

impl Instruction {
    /// Mnemonic used in dumps
    pub fn name(&self) -> &'static str {
        match self {
            Instruction::GetById { out_of_line: false, .. } => "get_by_id",
            Instruction::GetById { out_of_line: true, .. } => "get_by_id_out_of_line",
            Instruction::GetArrayLength { .. } => "get_array_length",
            Instruction::PutById { cache: LlintPutCache::Transition { .. }, direct: true, .. } => {
                "put_by_id_transition_direct"
            }
            Instruction::PutById { cache: LlintPutCache::Transition { .. }, .. } => {
                "put_by_id_transition_normal"
            }
            Instruction::PutById { .. } => "put_by_id",
            Instruction::Call { kind: CodeSpecializationKind::Call, .. } => "call",
            Instruction::Call { kind: CodeSpecializationKind::Construct, .. } => "construct",
            Instruction::Resolve { .. } => "resolve",
        }
    }

    /// Property or variable name operand, if the instruction has one
    pub fn identifier(&self) -> Option<&Identifier> {
        match self {
            Instruction::GetById { identifier, .. }
            | Instruction::GetArrayLength { identifier }
            | Instruction::PutById { identifier, .. }
            | Instruction::Resolve { identifier, .. } => Some(identifier),
            Instruction::Call { .. } => None,
        }
    }

    pub fn is_property_read(&self) -> bool {
        matches!(self, Instruction::GetById { .. } | Instruction::GetArrayLength { .. })
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.identifier() {
            Some(name) => write!(f, "{:<28} {}", self.name(), name),
            None => write!(f, "{}", self.name()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_instruction_names() {
        let get = Instruction::GetById {
            identifier: "x".into(),
            cached_structure: None,
            out_of_line: false,
        };
        assert_eq!(get.name(), "get_by_id");
        assert_eq!(get.identifier().map(Identifier::as_str), Some("x"));
        assert!(get.is_property_read());

        let put = Instruction::PutById {
            identifier: "y".into(),
            direct: true,
            cache: LlintPutCache::Transition {
                old: StructureId(0),
                new: StructureId(1),
                chain: vec![],
            },
        };
        assert_eq!(put.name(), "put_by_id_transition_direct");

        let construct = Instruction::Call {
            kind: CodeSpecializationKind::Construct,
            link: LlintCallLinkInfo::default(),
        };
        assert_eq!(construct.name(), "construct");
        assert!(construct.identifier().is_none());
    }
}
