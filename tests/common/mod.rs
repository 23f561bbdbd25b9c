//! Shared test helpers for integration tests

use icstatus::bytecode::{
    CodeSpecializationKind, Instruction, LlintCallLinkInfo, LlintPutCache, ResolveOperation,
};
use icstatus::heap::{CellId, ExecutableKind, Intrinsic, StructureId};
use icstatus::profile::{CallLinkInfo, PolymorphicAccessEntry, StructureStubInfo, StubAccess};
use icstatus::{CodeBlockProfile, Heap, ProfileSnapshot, StructureBuilder};

/// Name of the code block built by [`sample_snapshot`]
pub const MAIN: &str = "main";

/// Ids of the interesting heap entities in [`sample_snapshot`]
#[allow(dead_code)]
pub struct Ids {
    pub add: CellId,
    pub max: CellId,
    pub proto1: CellId,
    pub proto1_structure: StructureId,
    pub proto2_structure: StructureId,
    pub base: StructureId,
    pub point_a: StructureId,
    pub point_b: StructureId,
    pub point_c: StructureId,
    pub getter: StructureId,
    pub global: StructureId,
    pub put_old: StructureId,
    pub put_new: StructureId,
}

/// Bytecode indices of the sites in [`sample_snapshot`]
#[allow(dead_code)]
pub mod site {
    pub const SELF_LIST: u32 = 0;
    pub const ACCESSOR_LIST: u32 = 1;
    pub const CHAIN: u32 = 2;
    pub const CALL: u32 = 3;
    pub const RESOLVE: u32 = 4;
    pub const PUT_TRANSITION: u32 = 5;
    pub const DISAGREEING_LIST: u32 = 6;
    pub const UNPROFILED_CALL: u32 = 7;
    pub const PUT_REPLACE: u32 = 8;
}

fn get_by_id(name: &str, cached_structure: Option<StructureId>) -> Instruction {
    Instruction::GetById {
        identifier: name.into(),
        cached_structure,
        out_of_line: false,
    }
}

fn call(last_seen_callee: Option<CellId>) -> Instruction {
    Instruction::Call {
        kind: CodeSpecializationKind::Call,
        link: LlintCallLinkInfo { last_seen_callee },
    }
}

/// A heap with a two-level prototype chain, a few point shapes and a
/// global object, plus one code block exercising every site kind.
pub fn sample_snapshot() -> (ProfileSnapshot, Ids) {
    let mut heap = Heap::new();

    let function_structure = heap.add_structure(StructureBuilder::new());
    let add_exec = heap.add_executable("add", ExecutableKind::Function { parameter_count: 2 }, None);
    let max_exec = heap.add_executable("max", ExecutableKind::Host, Some(Intrinsic::Max));
    let add = heap.add_function(function_structure, add_exec);
    let max = heap.add_function(function_structure, max_exec);

    let proto2_structure = heap.add_structure(StructureBuilder::new().property("x", 4));
    let proto2 = heap.add_object(proto2_structure);
    let proto1_structure = heap.add_structure(StructureBuilder::new().property("y", 0).prototype(proto2));
    let proto1 = heap.add_object(proto1_structure);
    let base = heap.add_structure(StructureBuilder::new().property("a", 0).prototype(proto1));

    let point_a = heap.add_structure(StructureBuilder::new().property("x", 0).property("y", 1));
    let point_b = heap.add_structure(
        StructureBuilder::new()
            .property("x", 0)
            .property("y", 1)
            .property("z", 2),
    );
    let point_c = heap.add_structure(StructureBuilder::new().property("y", 0).property("x", 1));
    let getter = heap.add_structure(StructureBuilder::new().accessor("x", 0));

    let global = heap.add_structure(
        StructureBuilder::new()
            .property("counter", 0)
            .specific("max", 1, max),
    );

    let put_old = heap.add_structure(StructureBuilder::new().prototype(proto1));
    let put_new = heap.add_structure(StructureBuilder::new().property("w", 0).prototype(proto1));

    let mut profile = CodeBlockProfile::new(MAIN);
    profile
        .add_instruction(site::SELF_LIST, get_by_id("x", Some(point_a)))
        .set_stub_info(
            site::SELF_LIST,
            StructureStubInfo::seen(StubAccess::GetSelfList(vec![
                PolymorphicAccessEntry::direct(point_a),
                PolymorphicAccessEntry::direct(point_b),
                PolymorphicAccessEntry::direct(point_a),
            ])),
        )
        .add_instruction(site::ACCESSOR_LIST, get_by_id("x", None))
        .set_stub_info(
            site::ACCESSOR_LIST,
            StructureStubInfo::seen(StubAccess::GetSelfList(vec![
                PolymorphicAccessEntry::direct(point_a),
                PolymorphicAccessEntry::accessor(getter),
            ])),
        )
        .add_instruction(site::CHAIN, get_by_id("x", None))
        .set_stub_info(
            site::CHAIN,
            StructureStubInfo::seen(StubAccess::GetChain {
                base,
                chain: vec![proto1_structure, proto2_structure],
                is_direct: true,
            }),
        )
        .add_instruction(site::CALL, call(Some(add)))
        .set_call_link_info(site::CALL, CallLinkInfo::with_callee(add))
        .add_instruction(
            site::RESOLVE,
            Instruction::Resolve {
                identifier: "counter".into(),
                operations: vec![ResolveOperation::global_property(Some(global))],
            },
        )
        .add_instruction(
            site::PUT_TRANSITION,
            Instruction::PutById {
                identifier: "w".into(),
                direct: false,
                cache: LlintPutCache::Transition {
                    old: put_old,
                    new: put_new,
                    chain: vec![proto1_structure, proto2_structure],
                },
            },
        )
        .set_stub_info(
            site::PUT_TRANSITION,
            StructureStubInfo::seen(StubAccess::PutTransition {
                previous: put_old,
                structure: put_new,
                chain: vec![proto1_structure, proto2_structure],
                direct: false,
            }),
        )
        .add_instruction(site::DISAGREEING_LIST, get_by_id("x", None))
        .set_stub_info(
            site::DISAGREEING_LIST,
            StructureStubInfo::seen(StubAccess::GetSelfList(vec![
                PolymorphicAccessEntry::direct(point_a),
                PolymorphicAccessEntry::direct(point_c),
            ])),
        )
        .add_instruction(site::UNPROFILED_CALL, call(None))
        .add_instruction(
            site::PUT_REPLACE,
            Instruction::PutById {
                identifier: "y".into(),
                direct: false,
                cache: LlintPutCache::Replace { structure: point_c },
            },
        )
        .set_stub_info(
            site::PUT_REPLACE,
            StructureStubInfo::seen(StubAccess::PutReplace { base: point_c }),
        )
        .set_execution_entry_count(1000);

    let mut snapshot = ProfileSnapshot::new(heap);
    snapshot.add_code_block(profile);

    let ids = Ids {
        add,
        max,
        proto1,
        proto1_structure,
        proto2_structure,
        base,
        point_a,
        point_b,
        point_c,
        getter,
        global,
        put_old,
        put_new,
    };
    (snapshot, ids)
}
