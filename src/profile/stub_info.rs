//! Baseline JIT caches: call link infos and structure stub infos

use crate::heap::{CellId, ExecutableId, StructureId};
use serde::{Deserialize, Serialize};

/// Stub emitted once a call site proved a closure-call pairing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClosureCallStub {
    pub executable: ExecutableId,
    pub structure: StructureId,
}

/// Baseline JIT view of a call site
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallLinkInfo {
    pub last_seen_callee: Option<CellId>,
    /// Different closures over the same executable reached this site
    #[serde(default)]
    pub has_seen_closure: bool,
    #[serde(default)]
    pub stub: Option<ClosureCallStub>,
}

impl CallLinkInfo {
    pub fn with_callee(callee: CellId) -> Self {
        Self {
            last_seen_callee: Some(callee),
            ..Self::default()
        }
    }
}

/// One structure in a polymorphic access list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolymorphicAccessEntry {
    pub base: StructureId,
    /// The stub reads a slot directly; `false` means a getter or custom accessor
    pub is_direct: bool,
}

impl PolymorphicAccessEntry {
    pub fn direct(base: StructureId) -> Self {
        Self { base, is_direct: true }
    }

    pub fn accessor(base: StructureId) -> Self {
        Self { base, is_direct: false }
    }
}

/// What the stub cached, with the structures it depends on
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum StubAccess {
    #[default]
    Unset,
    GetSelf { base: StructureId },
    GetSelfList(Vec<PolymorphicAccessEntry>),
    GetProto {
        base: StructureId,
        prototype_structure: StructureId,
        is_direct: bool,
    },
    GetProtoList(Vec<PolymorphicAccessEntry>),
    GetChain {
        base: StructureId,
        chain: Vec<StructureId>,
        is_direct: bool,
    },
    GetArrayLength,
    GetStringLength,
    PutReplace { base: StructureId },
    PutTransition {
        previous: StructureId,
        structure: StructureId,
        chain: Vec<StructureId>,
        direct: bool,
    },
}

impl StubAccess {
    /// Entries of a polymorphic get list, empty for other kinds
    pub fn polymorphic_list(&self) -> &[PolymorphicAccessEntry] {
        match self {
            StubAccess::GetSelfList(list) | StubAccess::GetProtoList(list) => list,
            _ => &[],
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            StubAccess::Unset => "unset",
            StubAccess::GetSelf { .. } => "get_by_id_self",
            StubAccess::GetSelfList(_) => "get_by_id_self_list",
            StubAccess::GetProto { .. } => "get_by_id_proto",
            StubAccess::GetProtoList(_) => "get_by_id_proto_list",
            StubAccess::GetChain { .. } => "get_by_id_chain",
            StubAccess::GetArrayLength => "get_array_length",
            StubAccess::GetStringLength => "get_string_length",
            StubAccess::PutReplace { .. } => "put_by_id_replace",
            StubAccess::PutTransition { direct: true, .. } => "put_by_id_transition_direct",
            StubAccess::PutTransition { .. } => "put_by_id_transition_normal",
        }
    }
}

/// Baseline JIT property cache for one site
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructureStubInfo {
    /// The baseline JIT executed this site at least once
    #[serde(default)]
    pub seen: bool,
    /// A collection cleared the stub; its contents no longer mean anything
    #[serde(default)]
    pub reset_by_gc: bool,
    pub access: StubAccess,
}

impl StructureStubInfo {
    pub fn seen(access: StubAccess) -> Self {
        Self {
            seen: true,
            reset_by_gc: false,
            access,
        }
    }
}
