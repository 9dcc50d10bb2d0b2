use rivet_asm::Reg;

use crate::test_helpers::AssemblerBuilder;

use super::vm;

#[test]
fn list_dyn_builds_an_untyped_list_and_index_list_reads_it_back() {
    let mut asm = AssemblerBuilder::new();
    asm.const_i8(1, Reg::new(0));
    asm.const_i8(2, Reg::new(1));
    asm.const_i8(3, Reg::new(2));
    asm.list_dyn(0, 3, Reg::new(3));
    asm.const_i8(1, Reg::new(4)); // index
    asm.push(rivet_asm::Instruction::IndexList(rivet_asm::op::IndexList { recv: Reg::new(3), idx: Reg::new(4), dst: Reg::new(5) }));
    asm.ret1(Reg::new(5));
    let chunk = asm.finish();

    let state = vm().eval(&chunk, 0, Vec::new()).unwrap();
    assert_eq!(state.value.as_int(), Some(2));
}

#[test]
fn list_and_array_share_the_same_indexable_representation() {
    let mut asm = AssemblerBuilder::new();
    asm.const_i8(10, Reg::new(0));
    asm.const_i8(20, Reg::new(1));
    asm.list(64, 0, 2, Reg::new(2));
    asm.const_i8(30, Reg::new(3));
    asm.const_i8(40, Reg::new(4));
    asm.array(64, 3, 2, Reg::new(5));
    asm.const_i8(0, Reg::new(6));
    asm.push(rivet_asm::Instruction::IndexList(rivet_asm::op::IndexList { recv: Reg::new(2), idx: Reg::new(6), dst: Reg::new(7) }));
    asm.push(rivet_asm::Instruction::IndexList(rivet_asm::op::IndexList { recv: Reg::new(5), idx: Reg::new(6), dst: Reg::new(8) }));
    asm.add_int(Reg::new(7), Reg::new(8), Reg::new(9));
    asm.ret1(Reg::new(9));
    let chunk = asm.finish();

    let state = vm().eval(&chunk, 0, Vec::new()).unwrap();
    assert_eq!(state.value.as_int(), Some(40)); // list[0]=10, array[0]=30
}

#[test]
fn tuple_round_trips_through_index_tuple() {
    let mut asm = AssemblerBuilder::new();
    asm.const_i8(5, Reg::new(0));
    asm.const_i8(6, Reg::new(1));
    asm.tuple(64, 0, 2, Reg::new(2));
    asm.const_i8(-1i8 as u8, Reg::new(3)); // IndexTuple wraps negative indices
    asm.push(rivet_asm::Instruction::IndexTuple(rivet_asm::op::IndexTuple { recv: Reg::new(2), idx: Reg::new(3), dst: Reg::new(4) }));
    asm.ret1(Reg::new(4));
    let chunk = asm.finish();

    let state = vm().eval(&chunk, 0, Vec::new()).unwrap();
    assert_eq!(state.value.as_int(), Some(6));
}

#[test]
fn map_builds_key_value_entries_and_index_map_reads_them_back() {
    let mut asm = AssemblerBuilder::new();
    asm.const_i8(1, Reg::new(0)); // key
    asm.const_i8(100, Reg::new(1)); // value
    asm.const_i8(2, Reg::new(2)); // key
    asm.const_i8(200, Reg::new(3)); // value
    asm.map(64, 0, 2, Reg::new(4));
    asm.const_i8(2, Reg::new(5));
    asm.push(rivet_asm::Instruction::IndexMap(rivet_asm::op::IndexMap { recv: Reg::new(4), key: Reg::new(5), dst: Reg::new(6) }));
    asm.ret1(Reg::new(6));
    let chunk = asm.finish();

    let state = vm().eval(&chunk, 0, Vec::new()).unwrap();
    assert_eq!(state.value.as_int(), Some(200));
}

#[test]
fn append_list_grows_the_backing_storage_in_place() {
    let mut asm = AssemblerBuilder::new();
    asm.const_i8(1, Reg::new(0));
    asm.list_dyn(0, 1, Reg::new(1));
    asm.const_i8(2, Reg::new(2));
    asm.append_list(Reg::new(1), Reg::new(2));
    asm.const_i8(1, Reg::new(3));
    asm.push(rivet_asm::Instruction::IndexList(rivet_asm::op::IndexList { recv: Reg::new(1), idx: Reg::new(3), dst: Reg::new(4) }));
    asm.ret1(Reg::new(4));
    let chunk = asm.finish();

    let state = vm().eval(&chunk, 0, Vec::new()).unwrap();
    assert_eq!(state.value.as_int(), Some(2));
}
