//! Heap model consumed by the classifiers
//!
//! The interpreter owns the real heap. The classifiers only need a frozen
//! view of the parts that inline caches point at: structures, the cells
//! that act as prototypes or callees, and executables. Everything is
//! addressed by dense ids so profiling records can refer to heap entities
//! without owning them, and so a [`Heap`] can be written to a snapshot.

mod cell;
mod structure;

pub use cell::{Cell, CellKind, Executable, ExecutableKind, Intrinsic};
pub use structure::{
    DictionaryKind, PropertyAttributes, PropertyEntry, PropertyOffset, Structure,
    StructureBuilder, TypeInfoFlags, FIRST_OUT_OF_LINE_OFFSET,
};

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! heap_id {
    ($(#[$meta:meta])* $name:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub u32);

        impl $name {
            pub fn index(self) -> usize {
                self.0 as usize
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($prefix, "#{}"), self.0)
            }
        }
    };
}

heap_id!(
    /// Identity of a structure
    StructureId,
    "structure"
);
heap_id!(
    /// Identity of a heap cell
    CellId,
    "cell"
);
heap_id!(
    /// Identity of an executable
    ExecutableId,
    "executable"
);

/// A property name
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Identifier(String);

impl Identifier {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The array index this name denotes, if it is a canonical index
    ///
    /// Canonical means decimal digits, no leading zero unless the name is
    /// `"0"`, and a value below `u32::MAX`.
    pub fn as_index(&self) -> Option<u32> {
        let bytes = self.0.as_bytes();
        if bytes.is_empty() || !bytes.iter().all(u8::is_ascii_digit) {
            return None;
        }
        if bytes.len() > 1 && bytes[0] == b'0' {
            return None;
        }
        match self.0.parse::<u32>() {
            Ok(value) if value != u32::MAX => Some(value),
            _ => None,
        }
    }
}

impl From<&str> for Identifier {
    fn from(name: &str) -> Self {
        Self(name.to_string())
    }
}

impl From<String> for Identifier {
    fn from(name: String) -> Self {
        Self(name)
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Arena of structures, cells and executables
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Heap {
    structures: Vec<Structure>,
    cells: Vec<Cell>,
    executables: Vec<Executable>,
}

impl Heap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a structure and return its id
    pub fn add_structure(&mut self, builder: StructureBuilder) -> StructureId {
        let id = StructureId(self.structures.len() as u32);
        self.structures.push(builder.build(id));
        id
    }

    /// Add an ordinary object with the given structure
    pub fn add_object(&mut self, structure: StructureId) -> CellId {
        self.add_cell(structure, CellKind::Object)
    }

    /// Add a function cell bound to an executable
    pub fn add_function(&mut self, structure: StructureId, executable: ExecutableId) -> CellId {
        self.add_cell(structure, CellKind::Function { executable })
    }

    /// Add an internal (engine-provided) function cell
    pub fn add_internal_function(&mut self, structure: StructureId, name: impl Into<String>) -> CellId {
        self.add_cell(structure, CellKind::InternalFunction { name: name.into() })
    }

    fn add_cell(&mut self, structure: StructureId, kind: CellKind) -> CellId {
        let id = CellId(self.cells.len() as u32);
        self.cells.push(Cell { id, structure, kind });
        id
    }

    /// Add an executable and return its id
    pub fn add_executable(
        &mut self,
        name: impl Into<String>,
        kind: ExecutableKind,
        intrinsic: Option<Intrinsic>,
    ) -> ExecutableId {
        let id = ExecutableId(self.executables.len() as u32);
        self.executables.push(Executable {
            id,
            name: name.into(),
            kind,
            intrinsic,
        });
        id
    }

    /// Move a cell to a new structure, as a property addition would
    ///
    /// Returns `false` if the cell does not exist.
    pub fn transition(&mut self, cell: CellId, structure: StructureId) -> bool {
        match self.cells.get_mut(cell.index()) {
            Some(c) => {
                c.structure = structure;
                true
            }
            None => false,
        }
    }

    pub fn structure(&self, id: StructureId) -> Option<&Structure> {
        self.structures.get(id.index())
    }

    pub fn cell(&self, id: CellId) -> Option<&Cell> {
        self.cells.get(id.index())
    }

    pub fn executable(&self, id: ExecutableId) -> Option<&Executable> {
        self.executables.get(id.index())
    }

    /// The structure a cell currently has
    pub fn structure_of(&self, cell: CellId) -> Option<&Structure> {
        self.cell(cell).and_then(|c| self.structure(c.structure))
    }

    pub fn structures(&self) -> impl Iterator<Item = &Structure> {
        self.structures.iter()
    }

    pub fn cells(&self) -> impl Iterator<Item = &Cell> {
        self.cells.iter()
    }

    pub fn executables(&self) -> impl Iterator<Item = &Executable> {
        self.executables.iter()
    }

    /// Check that ids match positions and every reference resolves
    ///
    /// Returns a description of the first problem found.
    pub fn check_integrity(&self) -> std::result::Result<(), String> {
        for (index, structure) in self.structures.iter().enumerate() {
            if structure.id.index() != index {
                return Err(format!("{} stored at position {}", structure.id, index));
            }
            if let Some(proto) = structure.stored_prototype {
                if self.cell(proto).is_none() {
                    return Err(format!("{} has dangling prototype {}", structure.id, proto));
                }
            }
            for (name, entry) in &structure.properties {
                if let Some(value) = entry.specific_value {
                    if self.cell(value).is_none() {
                        return Err(format!(
                            "{} property '{}' has dangling specific value {}",
                            structure.id, name, value
                        ));
                    }
                }
            }
        }
        for (index, cell) in self.cells.iter().enumerate() {
            if cell.id.index() != index {
                return Err(format!("{} stored at position {}", cell.id, index));
            }
            if self.structure(cell.structure).is_none() {
                return Err(format!("{} has dangling {}", cell.id, cell.structure));
            }
            if let Some(executable) = cell.executable_id() {
                if self.executable(executable).is_none() {
                    return Err(format!("{} has dangling {}", cell.id, executable));
                }
            }
        }
        for (index, executable) in self.executables.iter().enumerate() {
            if executable.id.index() != index {
                return Err(format!("{} stored at position {}", executable.id, index));
            }
        }
        Ok(())
    }
}
