//! Call-site classification
//!
//! Tells the optimizer what it may assume about the callee of a call or
//! construct instruction: a known function (guard on identity), a known
//! executable reached through varying closures (guard on structure and
//! executable), or nothing it should speculate on.

use crate::bytecode::{CodeSpecializationKind, Instruction};
use crate::heap::{Cell, Executable, Heap, Intrinsic, Structure};
use crate::profile::{ExitKind, ProfiledBlock};
use std::fmt;

/// What is known about the callees of one call site
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[must_use]
pub struct CallLinkStatus<'a> {
    call_target: Option<&'a Cell>,
    executable: Option<&'a Executable>,
    structure: Option<&'a Structure>,
    could_take_slow_path: bool,
    is_proved: bool,
}

impl<'a> CallLinkStatus<'a> {
    /// Status for a site that has seen exactly this callee
    pub fn from_callee(heap: &'a Heap, callee: &'a Cell) -> Self {
        let structure = heap.structure(callee.structure_id());
        let executable = callee.executable_id().and_then(|id| heap.executable(id));
        Self {
            call_target: Some(callee),
            executable,
            structure,
            ..Self::default()
        }
    }

    /// Status for a callee known at compile time (a constant)
    pub fn proved(heap: &'a Heap, callee: &'a Cell) -> Self {
        let mut status = Self::from_callee(heap, callee);
        status.set_is_proved(true);
        status
    }

    /// Status for closures of one executable sharing one structure
    pub fn closure(executable: &'a Executable, structure: &'a Structure) -> Self {
        Self {
            executable: Some(executable),
            structure: Some(structure),
            ..Self::default()
        }
    }

    pub fn takes_slow_path() -> Self {
        Self {
            could_take_slow_path: true,
            ..Self::default()
        }
    }

    /// Classify the call at `bytecode_index`
    pub fn compute_for(block: &ProfiledBlock<'a>, bytecode_index: u32) -> Self {
        let status = Self::compute_from_jit(block, bytecode_index);
        tracing::debug!(
            block = block.name(),
            bytecode_index,
            status = %status,
            "call link status"
        );
        status
    }

    /// Classify and then apply the block's recorded exit sites
    pub fn compute_with_exit_sites(block: &ProfiledBlock<'a>, bytecode_index: u32) -> Self {
        let mut status = Self::compute_for(block, bytecode_index);
        status.apply_exit_sites(block, bytecode_index);
        status
    }

    fn compute_from_llint(block: &ProfiledBlock<'a>, bytecode_index: u32) -> Self {
        let callee = match block.instruction(bytecode_index) {
            Some(Instruction::Call { link, .. }) => link.last_seen_callee,
            _ => None,
        };
        match callee.and_then(|id| block.cell(id)) {
            Some(cell) => Self::from_callee(block.heap(), cell),
            None => Self::default(),
        }
    }

    fn compute_from_jit(block: &ProfiledBlock<'a>, bytecode_index: u32) -> Self {
        if block.profile().number_of_call_link_infos() == 0 {
            return Self::compute_from_llint(block, bytecode_index);
        }

        if block.could_take_slow_case(bytecode_index) {
            return Self::takes_slow_path();
        }

        let Some(info) = block.profile().call_link_info(bytecode_index) else {
            return Self::compute_from_llint(block, bytecode_index);
        };

        if let Some(stub) = info.stub {
            return match (block.executable(stub.executable), block.structure(stub.structure)) {
                (Some(executable), Some(structure)) => Self::closure(executable, structure),
                _ => Self::takes_slow_path(),
            };
        }

        let Some(target) = info.last_seen_callee.and_then(|id| block.cell(id)) else {
            return Self::compute_from_llint(block, bytecode_index);
        };

        if info.has_seen_closure {
            let executable = target.executable_id().and_then(|id| block.executable(id));
            let structure = block.structure(target.structure_id());
            if let (Some(executable), Some(structure)) = (executable, structure) {
                return Self::closure(executable, structure);
            }
        }

        Self::from_callee(block.heap(), target)
    }

    /// Apply all three exit-site downgrades recorded for this site
    pub fn apply_exit_sites(&mut self, block: &ProfiledBlock<'_>, bytecode_index: u32) -> &mut Self {
        self.set_has_bad_function_exit_site(block.has_exit_site(bytecode_index, ExitKind::BadFunction))
            .set_has_bad_cache_exit_site(block.has_exit_site(bytecode_index, ExitKind::BadCache))
            .set_has_bad_executable_exit_site(block.has_exit_site(bytecode_index, ExitKind::BadExecutable))
    }

    pub fn set_is_proved(&mut self, is_proved: bool) -> &mut Self {
        self.is_proved = is_proved;
        self
    }

    /// A function check failed here before: forget the callee, keep the executable
    pub fn set_has_bad_function_exit_site(&mut self, did_have_exit_site: bool) -> &mut Self {
        debug_assert!(!self.is_proved);
        if did_have_exit_site {
            self.call_target = None;
        }
        self
    }

    /// A structure check failed here before: give up
    pub fn set_has_bad_cache_exit_site(&mut self, did_have_exit_site: bool) -> &mut Self {
        debug_assert!(!self.is_proved);
        if did_have_exit_site {
            *self = Self::takes_slow_path();
        }
        self
    }

    /// An executable check failed here before: give up
    pub fn set_has_bad_executable_exit_site(&mut self, did_have_exit_site: bool) -> &mut Self {
        debug_assert!(!self.is_proved);
        if did_have_exit_site {
            *self = Self::takes_slow_path();
        }
        self
    }

    pub fn is_set(&self) -> bool {
        self.call_target.is_some() || self.executable.is_some() || self.could_take_slow_path
    }

    pub fn could_take_slow_path(&self) -> bool {
        self.could_take_slow_path
    }

    /// An executable is known but the closure object varies
    pub fn is_closure_call(&self) -> bool {
        self.executable.is_some() && self.call_target.is_none()
    }

    pub fn can_optimize(&self) -> bool {
        (self.call_target.is_some() || self.executable.is_some()) && !self.could_take_slow_path
    }

    pub fn call_target(&self) -> Option<&'a Cell> {
        self.call_target
    }

    /// The callee, if it is a JavaScript function
    pub fn function(&self) -> Option<&'a Cell> {
        self.call_target.filter(|cell| cell.is_function())
    }

    /// The callee, if it is an engine-provided function
    pub fn internal_function(&self) -> Option<&'a Cell> {
        self.call_target.filter(|cell| cell.is_internal_function())
    }

    pub fn intrinsic_for(&self, kind: CodeSpecializationKind) -> Option<Intrinsic> {
        self.executable.and_then(|executable| executable.intrinsic_for(kind))
    }

    pub fn executable(&self) -> Option<&'a Executable> {
        self.executable
    }

    pub fn structure(&self) -> Option<&'a Structure> {
        self.structure
    }

    pub fn is_proved(&self) -> bool {
        self.is_proved
    }
}

impl fmt::Display for CallLinkStatus<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.is_set() {
            return write!(f, "Not Set");
        }

        let mut parts = Vec::new();
        if self.is_proved {
            parts.push("Statically Proved".to_string());
        }
        if self.could_take_slow_path {
            parts.push("Could Take Slow Path".to_string());
        }
        if let Some(target) = self.call_target {
            parts.push(format!("Known target: {}", target.id()));
        }
        if let Some(executable) = self.executable {
            parts.push(format!(
                "Executable/CallHash: {}/{:08x}",
                executable.id(),
                executable.hash_for(CodeSpecializationKind::Call)
            ));
        }
        if let Some(structure) = self.structure {
            parts.push(format!("Structure: {}", structure.id()));
        }
        write!(f, "{}", parts.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bytecode::LlintCallLinkInfo;
    use crate::config::ClassifierConfig;
    use crate::heap::{CellId, ExecutableKind, StructureBuilder, StructureId};
    use crate::profile::{CallLinkInfo, ClosureCallStub, CodeBlockProfile};

    struct Fixture {
        heap: Heap,
        function_structure: StructureId,
        callee: CellId,
        other_closure: CellId,
        host: CellId,
    }

    fn fixture() -> Fixture {
        let mut heap = Heap::new();
        let function_structure = heap.add_structure(StructureBuilder::new());
        let exec = heap.add_executable("add", ExecutableKind::Function { parameter_count: 2 }, None);
        let callee = heap.add_function(function_structure, exec);
        let other_closure = heap.add_function(function_structure, exec);
        let max = heap.add_executable("max", ExecutableKind::Host, Some(Intrinsic::Max));
        let host = heap.add_function(function_structure, max);
        Fixture {
            heap,
            function_structure,
            callee,
            other_closure,
            host,
        }
    }

    fn call(last_seen_callee: Option<CellId>) -> Instruction {
        Instruction::Call {
            kind: CodeSpecializationKind::Call,
            link: LlintCallLinkInfo { last_seen_callee },
        }
    }

    #[test]
    fn test_no_information_is_unset() {
        let fx = fixture();
        let config = ClassifierConfig::default();
        let mut profile = CodeBlockProfile::new("f");
        profile.add_instruction(0, call(None));
        let block = ProfiledBlock::new(&fx.heap, &profile, &config);

        let status = CallLinkStatus::compute_for(&block, 0);
        assert!(!status.is_set());
        assert!(!status.can_optimize());
        assert_eq!(status.to_string(), "Not Set");
    }

    #[test]
    fn test_llint_callee() {
        let fx = fixture();
        let config = ClassifierConfig::default();
        let mut profile = CodeBlockProfile::new("f");
        profile.add_instruction(0, call(Some(fx.callee)));
        let block = ProfiledBlock::new(&fx.heap, &profile, &config);

        let status = CallLinkStatus::compute_for(&block, 0);
        assert!(status.can_optimize());
        assert!(!status.is_closure_call());
        assert_eq!(status.function().map(Cell::id), Some(fx.callee));
        assert_eq!(status.structure().map(Structure::id), Some(fx.function_structure));
        assert!(status.internal_function().is_none());
    }

    #[test]
    fn test_slow_case_beats_cached_callee() {
        let fx = fixture();
        let config = ClassifierConfig::default();
        let mut profile = CodeBlockProfile::new("f");
        profile
            .add_instruction(0, call(Some(fx.callee)))
            .set_call_link_info(0, CallLinkInfo::with_callee(fx.callee))
            .set_rare_case_count(0, 50)
            .set_execution_entry_count(100);
        let block = ProfiledBlock::new(&fx.heap, &profile, &config);

        let status = CallLinkStatus::compute_for(&block, 0);
        assert_eq!(status, CallLinkStatus::takes_slow_path());
        assert!(!status.can_optimize());
        assert!(status.is_set());
    }

    #[test]
    fn test_closure_stub() {
        let fx = fixture();
        let config = ClassifierConfig::default();
        let exec = fx.heap.cell(fx.callee).unwrap().executable_id().unwrap();
        let mut profile = CodeBlockProfile::new("f");
        profile.add_instruction(0, call(None)).set_call_link_info(
            0,
            CallLinkInfo {
                last_seen_callee: Some(fx.callee),
                has_seen_closure: false,
                stub: Some(ClosureCallStub {
                    executable: exec,
                    structure: fx.function_structure,
                }),
            },
        );
        let block = ProfiledBlock::new(&fx.heap, &profile, &config);

        let status = CallLinkStatus::compute_for(&block, 0);
        assert!(status.is_closure_call());
        assert!(status.can_optimize());
        assert!(status.call_target().is_none());
        assert_eq!(status.executable().map(Executable::id), Some(exec));
    }

    #[test]
    fn test_seen_closure_classifies_by_executable() {
        let fx = fixture();
        let config = ClassifierConfig::default();
        let mut profile = CodeBlockProfile::new("f");
        profile.add_instruction(0, call(None)).set_call_link_info(
            0,
            CallLinkInfo {
                last_seen_callee: Some(fx.other_closure),
                has_seen_closure: true,
                stub: None,
            },
        );
        let block = ProfiledBlock::new(&fx.heap, &profile, &config);

        let status = CallLinkStatus::compute_for(&block, 0);
        assert!(status.is_closure_call());
        assert_eq!(status.structure().map(Structure::id), Some(fx.function_structure));
    }

    #[test]
    fn test_jit_without_callee_falls_back_to_llint() {
        let fx = fixture();
        let config = ClassifierConfig::default();
        let mut profile = CodeBlockProfile::new("f");
        profile
            .add_instruction(0, call(Some(fx.host)))
            .set_call_link_info(0, CallLinkInfo::default());
        let block = ProfiledBlock::new(&fx.heap, &profile, &config);

        let status = CallLinkStatus::compute_for(&block, 0);
        assert_eq!(status.call_target().map(Cell::id), Some(fx.host));
        assert_eq!(status.intrinsic_for(CodeSpecializationKind::Call), Some(Intrinsic::Max));
        assert_eq!(status.intrinsic_for(CodeSpecializationKind::Construct), None);
    }

    #[test]
    fn test_bad_function_exit_demotes_to_closure_call() {
        let fx = fixture();
        let callee = fx.heap.cell(fx.callee).unwrap();
        let mut status = CallLinkStatus::from_callee(&fx.heap, callee);
        status.set_has_bad_function_exit_site(false);
        assert!(!status.is_closure_call());
        status.set_has_bad_function_exit_site(true);
        assert!(status.is_closure_call());
        assert!(status.can_optimize());
    }

    #[test]
    fn test_bad_cache_and_executable_exits_force_slow_path() {
        let fx = fixture();
        let callee = fx.heap.cell(fx.callee).unwrap();

        let mut status = CallLinkStatus::from_callee(&fx.heap, callee);
        status.set_has_bad_cache_exit_site(true);
        assert_eq!(status, CallLinkStatus::takes_slow_path());

        let mut status = CallLinkStatus::from_callee(&fx.heap, callee);
        status.set_has_bad_executable_exit_site(true);
        assert!(status.could_take_slow_path());
        assert!(status.executable().is_none());
    }

    #[test]
    fn test_downgrades_are_monotonic() {
        let mut status = CallLinkStatus::takes_slow_path();
        status
            .set_has_bad_function_exit_site(true)
            .set_has_bad_cache_exit_site(true)
            .set_has_bad_executable_exit_site(true);
        assert_eq!(status, CallLinkStatus::takes_slow_path());
        assert!(status.could_take_slow_path());
    }

    #[test]
    fn test_exit_profile_applied() {
        let fx = fixture();
        let config = ClassifierConfig::default();
        let mut profile = CodeBlockProfile::new("f");
        profile.add_instruction(4, call(Some(fx.callee)));
        profile.exit_profile_mut().add(4, ExitKind::BadFunction);
        let block = ProfiledBlock::new(&fx.heap, &profile, &config);

        let status = CallLinkStatus::compute_with_exit_sites(&block, 4);
        assert!(status.is_closure_call());
    }

    #[test]
    fn test_widest_parameter_count_classifies_and_prints() {
        let mut heap = Heap::new();
        let structure = heap.add_structure(StructureBuilder::new());
        let exec = heap.add_executable("wide", ExecutableKind::Function { parameter_count: u32::MAX }, None);
        let callee = heap.add_function(structure, exec);
        let config = ClassifierConfig::default();
        let mut profile = CodeBlockProfile::new("f");
        profile.add_instruction(0, call(Some(callee)));
        let block = ProfiledBlock::new(&heap, &profile, &config);

        let status = CallLinkStatus::compute_for(&block, 0);
        assert_eq!(status.call_target().map(Cell::id), Some(callee));
        assert!(status.to_string().contains("Executable/CallHash: executable#0/"));
    }

    #[test]
    fn test_display() {
        let fx = fixture();
        let callee = fx.heap.cell(fx.callee).unwrap();
        let status = CallLinkStatus::proved(&fx.heap, callee);
        let text = status.to_string();
        assert!(text.starts_with("Statically Proved, Known target: cell#0, Executable/CallHash: executable#0/"));
        assert!(text.ends_with("Structure: structure#0"));
        assert_eq!(CallLinkStatus::takes_slow_path().to_string(), "Could Take Slow Path");
    }
}
