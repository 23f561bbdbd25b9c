//! Heap cells and executables

use super::{CellId, ExecutableId, StructureId};
use crate::bytecode::CodeSpecializationKind;
use serde::{Deserialize, Serialize};
use std::hash::{Hash, Hasher};

/// Built-in operations the optimizer can emit inline instead of calling
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Intrinsic {
    Abs,
    Min,
    Max,
    Sqrt,
    Pow,
    Floor,
    Ceil,
    Round,
    Exp,
    Log,
    IMul,
    ArrayPush,
    ArrayPop,
    CharCodeAt,
    CharAt,
    FromCharCode,
    RegExpExec,
    RegExpTest,
    StringPrototypeValueOf,
}

/// What kind of code an executable holds
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExecutableKind {
    /// Native function implemented by the host
    Host,
    /// Bytecode function
    Function { parameter_count: u32 },
}

/// Shared code behind one or more function cells
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Executable {
    pub(crate) id: ExecutableId,
    pub(crate) name: String,
    pub(crate) kind: ExecutableKind,
    #[serde(default)]
    pub(crate) intrinsic: Option<Intrinsic>,
}

impl PartialEq for Executable {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Executable {}

impl Executable {
    pub fn id(&self) -> ExecutableId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> &ExecutableKind {
        &self.kind
    }

    pub fn is_host_function(&self) -> bool {
        matches!(self.kind, ExecutableKind::Host)
    }

    /// Declared parameter count, `None` for host functions
    pub fn parameter_count(&self) -> Option<u32> {
        match self.kind {
            ExecutableKind::Host => None,
            ExecutableKind::Function { parameter_count } => Some(parameter_count),
        }
    }

    /// Intrinsic for the given specialization; construction never has one
    pub fn intrinsic_for(&self, kind: CodeSpecializationKind) -> Option<Intrinsic> {
        match kind {
            CodeSpecializationKind::Call => self.intrinsic,
            CodeSpecializationKind::Construct => None,
        }
    }

    /// Stable hash of the code for a specialization, used in dumps
    pub fn hash_for(&self, kind: CodeSpecializationKind) -> u32 {
        let mut hasher = rustc_hash::FxHasher::default();
        self.name.hash(&mut hasher);
        self.kind.parameter_hash(&mut hasher);
        kind.hash(&mut hasher);
        hasher.finish() as u32
    }
}

impl ExecutableKind {
    fn parameter_hash<H: Hasher>(&self, hasher: &mut H) {
        match self {
            ExecutableKind::Host => 0u8.hash(hasher),
            ExecutableKind::Function { parameter_count } => {
                1u8.hash(hasher);
                parameter_count.hash(hasher);
            }
        }
    }
}

/// The class of a heap cell
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CellKind {
    /// Ordinary object
    Object,
    /// JavaScript function bound to an executable
    Function { executable: ExecutableId },
    /// Engine-provided constructor-like object (e.g. `Array`)
    InternalFunction { name: String },
}

/// A garbage-collected cell
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Cell {
    pub(crate) id: CellId,
    pub(crate) structure: StructureId,
    pub(crate) kind: CellKind,
}

impl PartialEq for Cell {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Cell {}

impl Cell {
    pub fn id(&self) -> CellId {
        self.id
    }

    /// The structure this cell currently has
    pub fn structure_id(&self) -> StructureId {
        self.structure
    }

    pub fn kind(&self) -> &CellKind {
        &self.kind
    }

    pub fn is_function(&self) -> bool {
        matches!(self.kind, CellKind::Function { .. })
    }

    pub fn is_internal_function(&self) -> bool {
        matches!(self.kind, CellKind::InternalFunction { .. })
    }

    /// Executable of a function cell
    pub fn executable_id(&self) -> Option<ExecutableId> {
        match self.kind {
            CellKind::Function { executable } => Some(executable),
            _ => None,
        }
    }
}
