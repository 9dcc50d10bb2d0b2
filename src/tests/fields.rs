use rivet_asm::Reg;

use crate::test_helpers::AssemblerBuilder;

use super::vm;

#[test]
fn object_small_builds_an_object_and_field_reads_it_back() {
    let mut asm = AssemblerBuilder::new();
    asm.const_i8(7, Reg::new(0));
    asm.const_i8(8, Reg::new(1));
    asm.object_small(64, 0, 2, Reg::new(2));
    asm.field(Reg::new(2), 1, Reg::new(3));
    asm.ret1(Reg::new(3));
    let chunk = asm.finish();

    let state = vm().eval(&chunk, 0, Vec::new()).unwrap();
    assert_eq!(state.value.as_int(), Some(8));
}

#[test]
fn set_field_replaces_the_stored_value() {
    let mut asm = AssemblerBuilder::new();
    asm.const_i8(1, Reg::new(0));
    asm.object_small(64, 0, 1, Reg::new(1));
    asm.const_i8(99, Reg::new(2));
    asm.set_field(Reg::new(1), 0, Reg::new(2));
    asm.field(Reg::new(1), 0, Reg::new(3));
    asm.ret1(Reg::new(3));
    let chunk = asm.finish();

    let state = vm().eval(&chunk, 0, Vec::new()).unwrap();
    assert_eq!(state.value.as_int(), Some(99));
}

/// Loops the same `FieldIC` site twice over receivers of two different
/// nominal types, so the second pass must deoptimize the cache installed by
/// the first rather than trust a stale field offset.
#[test]
fn field_ic_deoptimizes_when_the_receiver_type_changes() {
    use rivet_asm::{op, Instruction};

    let counter = Reg::new(0);
    let object = Reg::new(1);
    let field_val = Reg::new(3);
    let accumulator = Reg::new(4);
    let scratch = Reg::new(7);
    let flag = Reg::new(6);
    let one = Reg::new(8);
    let two = Reg::new(9);
    let keep_looping = Reg::new(10);

    let mut asm = AssemblerBuilder::new();
    asm.const_i8(0, counter);
    asm.const_i8(0, accumulator);

    let loop_start = asm.here();
    asm.const_i8(0, scratch);
    asm.compare_eq(counter, scratch, flag);
    let branch_b_site = asm.here();
    asm.jump_not_cond(flag, 0); // patched: jump to branch B when counter != 0

    asm.const_i8(10, scratch);
    asm.object_small(64, scratch.get() as u8, 1, object);
    let merge_jump_site = asm.here();
    asm.jump(0); // patched: skip branch B

    let branch_b = asm.here();
    asm.const_i8(20, scratch);
    asm.object_small(65, scratch.get() as u8, 1, object);

    let merge = asm.here();
    asm.field_ic(object, 0, field_val);
    asm.add_int(field_val, accumulator, accumulator);
    asm.const_i8(1, one);
    asm.add_int(counter, one, counter);
    asm.const_i8(2, two);
    asm.compare_less(counter, two, keep_looping);
    asm.jump_cond(keep_looping, loop_start);
    asm.ret1(accumulator);
    let mut chunk = asm.finish();

    let patch = |chunk: &mut crate::call::Chunk, site: u32, instr: Instruction| {
        let mut bytes = Vec::new();
        instr.encode(&mut bytes);
        chunk.code[site as usize..site as usize + bytes.len()].copy_from_slice(&bytes);
    };
    patch(&mut chunk, branch_b_site, Instruction::JumpNotCond(op::JumpNotCond { cond: flag, target: branch_b }));
    patch(&mut chunk, merge_jump_site, Instruction::Jump(op::Jump { target: merge }));

    let state = vm().eval(&chunk, 0, Vec::new()).unwrap();
    // First pass reads object 0's field (10) under a cold cache, installing
    // type 64; second pass's object has a different type id (65) so the
    // site must deopt rather than misread with a stale offset.
    assert_eq!(state.value.as_int(), Some(30));
}
