//! Profiling data for a code block
//!
//! [`CodeBlockProfile`] is the owned record of what the interpreter and the
//! baseline JIT observed: the instructions with their interpreter-level
//! cache slots, the JIT call link infos and structure stub infos, rare-case
//! counters and the exit profile.
//!
//! [`ProfiledBlock`] is the borrowed view a compilation pass works through.
//! The running interpreter keeps writing its caches while the compiler reads
//! them, so everything reached through a `ProfiledBlock` is a snapshot that
//! may already be stale. Statuses derived from it are advice: consumers must
//! guard every speculation at runtime, and nothing borrowed from the view may
//! outlive the pass.

mod dump;
mod exit_profile;
mod stub_info;

pub use exit_profile::{ExitKind, ExitProfile, FrequentExitSite};
pub use stub_info::{
    CallLinkInfo, ClosureCallStub, PolymorphicAccessEntry, StructureStubInfo, StubAccess,
};

use crate::bytecode::{Instruction, LlintPutCache, ResolveOperation};
use crate::config::ClassifierConfig;
use crate::error::{Error, Result, SiteLocation};
use crate::heap::{Cell, CellId, Executable, ExecutableId, Heap, Structure, StructureId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Everything recorded about one code block
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CodeBlockProfile {
    name: String,
    instructions: BTreeMap<u32, Instruction>,
    #[serde(default)]
    call_link_infos: BTreeMap<u32, CallLinkInfo>,
    #[serde(default)]
    stub_infos: BTreeMap<u32, StructureStubInfo>,
    #[serde(default)]
    rare_case_counts: BTreeMap<u32, u32>,
    #[serde(default)]
    execution_entry_count: u32,
    #[serde(default)]
    exit_profile: ExitProfile,
}

impl CodeBlockProfile {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Place an instruction at a bytecode index
    pub fn add_instruction(&mut self, bytecode_index: u32, instruction: Instruction) -> &mut Self {
        self.instructions.insert(bytecode_index, instruction);
        self
    }

    /// Attach a baseline JIT call link info to a call site
    pub fn set_call_link_info(&mut self, bytecode_index: u32, info: CallLinkInfo) -> &mut Self {
        self.call_link_infos.insert(bytecode_index, info);
        self
    }

    /// Attach a baseline JIT stub info to a property access site
    pub fn set_stub_info(&mut self, bytecode_index: u32, info: StructureStubInfo) -> &mut Self {
        self.stub_infos.insert(bytecode_index, info);
        self
    }

    /// Set the number of times a site took its slow case
    pub fn set_rare_case_count(&mut self, bytecode_index: u32, count: u32) -> &mut Self {
        self.rare_case_counts.insert(bytecode_index, count);
        self
    }

    pub fn set_execution_entry_count(&mut self, count: u32) -> &mut Self {
        self.execution_entry_count = count;
        self
    }

    pub fn exit_profile_mut(&mut self) -> &mut ExitProfile {
        &mut self.exit_profile
    }

    pub fn exit_profile(&self) -> &ExitProfile {
        &self.exit_profile
    }

    pub fn instruction(&self, bytecode_index: u32) -> Option<&Instruction> {
        self.instructions.get(&bytecode_index)
    }

    /// Instructions in bytecode order
    pub fn instructions(&self) -> impl Iterator<Item = (u32, &Instruction)> {
        self.instructions.iter().map(|(index, instr)| (*index, instr))
    }

    pub fn call_link_info(&self, bytecode_index: u32) -> Option<&CallLinkInfo> {
        self.call_link_infos.get(&bytecode_index)
    }

    pub fn stub_info(&self, bytecode_index: u32) -> Option<&StructureStubInfo> {
        self.stub_infos.get(&bytecode_index)
    }

    pub fn number_of_call_link_infos(&self) -> usize {
        self.call_link_infos.len()
    }

    pub fn number_of_stub_infos(&self) -> usize {
        self.stub_infos.len()
    }

    pub fn rare_case_count(&self, bytecode_index: u32) -> u32 {
        self.rare_case_counts.get(&bytecode_index).copied().unwrap_or(0)
    }

    pub fn execution_entry_count(&self) -> u32 {
        self.execution_entry_count
    }

    /// Whether the baseline JIT left any profiling in this block
    pub fn has_baseline_jit_profiling(&self) -> bool {
        !self.call_link_infos.is_empty() || !self.stub_infos.is_empty()
    }

    /// Check every heap reference in the block against `heap`
    pub fn check_integrity(&self, heap: &Heap) -> Result<()> {
        let site = |index: u32| SiteLocation::new(self.name.clone(), index);
        let structure = |index: u32, id: StructureId| -> Result<()> {
            heap.structure(id)
                .map(|_| ())
                .ok_or_else(|| Error::invalid_site(site(index), format!("dangling {}", id)))
        };
        let cell = |index: u32, id: CellId| -> Result<()> {
            heap.cell(id)
                .map(|_| ())
                .ok_or_else(|| Error::invalid_site(site(index), format!("dangling {}", id)))
        };
        let executable = |index: u32, id: ExecutableId| -> Result<()> {
            heap.executable(id)
                .map(|_| ())
                .ok_or_else(|| Error::invalid_site(site(index), format!("dangling {}", id)))
        };

        for (&index, instruction) in &self.instructions {
            match instruction {
                Instruction::GetById { cached_structure, .. } => {
                    if let Some(id) = cached_structure {
                        structure(index, *id)?;
                    }
                }
                Instruction::GetArrayLength { .. } => {}
                Instruction::PutById { cache, .. } => match cache {
                    LlintPutCache::Unset => {}
                    LlintPutCache::Replace { structure: id } => structure(index, *id)?,
                    LlintPutCache::Transition { old, new, chain } => {
                        structure(index, *old)?;
                        structure(index, *new)?;
                        for id in chain {
                            structure(index, *id)?;
                        }
                    }
                },
                Instruction::Call { link, .. } => {
                    if let Some(id) = link.last_seen_callee {
                        cell(index, id)?;
                    }
                }
                Instruction::Resolve { operations, .. } => {
                    for ResolveOperation { structure: cached, .. } in operations {
                        if let Some(id) = cached {
                            structure(index, *id)?;
                        }
                    }
                }
            }
        }

        for (&index, info) in &self.call_link_infos {
            if let Some(id) = info.last_seen_callee {
                cell(index, id)?;
            }
            if let Some(stub) = info.stub {
                executable(index, stub.executable)?;
                structure(index, stub.structure)?;
            }
        }

        for (&index, info) in &self.stub_infos {
            let mut ids: Vec<StructureId> = Vec::new();
            match &info.access {
                StubAccess::Unset
                | StubAccess::GetArrayLength
                | StubAccess::GetStringLength => {}
                StubAccess::GetSelf { base } | StubAccess::PutReplace { base } => ids.push(*base),
                StubAccess::GetSelfList(list) | StubAccess::GetProtoList(list) => {
                    ids.extend(list.iter().map(|entry| entry.base))
                }
                StubAccess::GetProto {
                    base,
                    prototype_structure,
                    ..
                } => ids.extend([*base, *prototype_structure]),
                StubAccess::GetChain { base, chain, .. } => {
                    ids.push(*base);
                    ids.extend(chain.iter().copied());
                }
                StubAccess::PutTransition {
                    previous,
                    structure: next,
                    chain,
                    ..
                } => {
                    ids.extend([*previous, *next]);
                    ids.extend(chain.iter().copied());
                }
            }
            for id in ids {
                structure(index, id)?;
            }
        }

        Ok(())
    }
}

/// Read-only view of a profiled block for one compilation pass
#[derive(Debug, Clone, Copy)]
pub struct ProfiledBlock<'a> {
    heap: &'a Heap,
    profile: &'a CodeBlockProfile,
    config: &'a ClassifierConfig,
}

impl<'a> ProfiledBlock<'a> {
    pub fn new(heap: &'a Heap, profile: &'a CodeBlockProfile, config: &'a ClassifierConfig) -> Self {
        Self {
            heap,
            profile,
            config,
        }
    }

    pub fn heap(&self) -> &'a Heap {
        self.heap
    }

    pub fn profile(&self) -> &'a CodeBlockProfile {
        self.profile
    }

    pub fn config(&self) -> &'a ClassifierConfig {
        self.config
    }

    pub fn name(&self) -> &'a str {
        self.profile.name()
    }

    pub fn instruction(&self, bytecode_index: u32) -> Option<&'a Instruction> {
        self.profile.instruction(bytecode_index)
    }

    /// The slow case was taken often enough that a cache cannot be trusted
    pub fn likely_to_take_slow_case(&self, bytecode_index: u32) -> bool {
        if !self.profile.has_baseline_jit_profiling() {
            return false;
        }
        self.config.is_likely_slow(
            self.profile.rare_case_count(bytecode_index),
            self.profile.execution_entry_count(),
        )
    }

    /// The slow case was taken often enough that it may happen again
    pub fn could_take_slow_case(&self, bytecode_index: u32) -> bool {
        if !self.profile.has_baseline_jit_profiling() {
            return false;
        }
        self.config.is_possibly_slow(
            self.profile.rare_case_count(bytecode_index),
            self.profile.execution_entry_count(),
        )
    }

    pub fn has_exit_site(&self, bytecode_index: u32, kind: ExitKind) -> bool {
        self.profile.exit_profile().has_exit_site(bytecode_index, kind)
    }

    /// Resolve a structure id, logging references the heap cannot satisfy
    pub(crate) fn structure(&self, id: StructureId) -> Option<&'a Structure> {
        let structure = self.heap.structure(id);
        if structure.is_none() {
            tracing::warn!(block = self.name(), %id, "profile refers to a missing structure");
        }
        structure
    }

    pub(crate) fn cell(&self, id: CellId) -> Option<&'a Cell> {
        let cell = self.heap.cell(id);
        if cell.is_none() {
            tracing::warn!(block = self.name(), %id, "profile refers to a missing cell");
        }
        cell
    }

    pub(crate) fn executable(&self, id: ExecutableId) -> Option<&'a Executable> {
        let executable = self.heap.executable(id);
        if executable.is_none() {
            tracing::warn!(block = self.name(), %id, "profile refers to a missing executable");
        }
        executable
    }
}
