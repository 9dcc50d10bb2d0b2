use rivet_asm::Reg;

use crate::test_helpers::AssemblerBuilder;

use super::vm;

#[test]
fn jump_cond_skips_the_false_branch() {
    let mut asm = AssemblerBuilder::new();
    asm.const_i8(0, Reg::new(0)); // cond = false
    let patch_site = asm.here();
    asm.jump_cond(Reg::new(0), 0); // placeholder target, patched below
    asm.const_i8(1, Reg::new(1));
    asm.ret1(Reg::new(1));
    let taken_target = asm.here();
    asm.const_i8(2, Reg::new(1));
    asm.ret1(Reg::new(1));
    let mut chunk = asm.finish();

    // Patch the jump target now that we know the taken branch's offset.
    let mut patched = Vec::new();
    rivet_asm::Instruction::JumpCond(rivet_asm::op::JumpCond { cond: Reg::new(0), target: taken_target })
        .encode(&mut patched);
    chunk.code[patch_site as usize..patch_site as usize + patched.len()].copy_from_slice(&patched);

    let state = vm().eval(&chunk, 0, Vec::new()).unwrap();
    assert_eq!(state.value.as_int(), Some(1), "false condition must fall through, not jump");
}

#[test]
fn jump_unconditionally_skips_instructions() {
    let mut asm = AssemblerBuilder::new();
    let skip_target;
    {
        // Reserve the jump, then discover where it should land.
        asm.jump(0);
        asm.const_i8(9, Reg::new(0));
        asm.ret1(Reg::new(0));
        skip_target = asm.here();
        asm.const_i8(1, Reg::new(0));
        asm.ret1(Reg::new(0));
    }
    let mut chunk = asm.finish();
    let mut patched = Vec::new();
    rivet_asm::Instruction::Jump(rivet_asm::op::Jump { target: skip_target }).encode(&mut patched);
    chunk.code[0..patched.len()].copy_from_slice(&patched);

    let state = vm().eval(&chunk, 0, Vec::new()).unwrap();
    assert_eq!(state.value.as_int(), Some(1));
}

fn patch(chunk: &mut crate::call::Chunk, site: u32, instruction: rivet_asm::Instruction) {
    let mut bytes = Vec::new();
    instruction.encode(&mut bytes);
    chunk.code[site as usize..site as usize + bytes.len()].copy_from_slice(&bytes);
}

#[test]
fn for_range_runs_the_exact_ascending_iteration_count() {
    use rivet_asm::{op, Instruction};

    let start = Reg::new(0);
    let end = Reg::new(1);
    let acc = Reg::new(2);
    let counter = Reg::new(3);
    let index = Reg::new(4);

    let mut asm = AssemblerBuilder::new();
    asm.const_i8(0, start);
    asm.const_i8(3, end);
    asm.const_i8(0, acc);
    let init_site = asm.here();
    asm.for_range_init(start, end, true, counter, index, 0, 0); // patched below
    let body_target = asm.here();
    asm.add_int(acc, counter, acc);
    let footer_pc = asm.here();
    asm.for_range(end, counter, index, body_target);
    let after_loop = asm.here();
    asm.ret1(acc);
    let mut chunk = asm.finish();

    patch(
        &mut chunk,
        init_site,
        Instruction::ForRangeInit(op::ForRangeInit {
            start,
            end,
            increment: true,
            counter_dst: counter,
            index_dst: index,
            footer_pc,
            skip_target: after_loop,
        }),
    );

    let state = vm().eval(&chunk, 0, Vec::new()).unwrap();
    // Ascending over [0, 3): counters 0, 1, 2 sum to 3.
    assert_eq!(state.value.as_int(), Some(3));
}

#[test]
fn for_range_skips_the_body_entirely_when_the_range_is_empty() {
    use rivet_asm::{op, Instruction};

    let start = Reg::new(0);
    let end = Reg::new(1);
    let touched = Reg::new(2);
    let counter = Reg::new(3);
    let index = Reg::new(4);

    let mut asm = AssemblerBuilder::new();
    asm.const_i8(5, start);
    asm.const_i8(5, end); // empty ascending range
    asm.const_i8(0, touched);
    let init_site = asm.here();
    asm.for_range_init(start, end, true, counter, index, 0, 0); // patched below
    let body_target = asm.here();
    asm.const_i8(9, touched); // would run if the (empty) body were entered
    let footer_pc = asm.here();
    asm.for_range(end, counter, index, body_target);
    let after_loop = asm.here();
    asm.ret1(touched);
    let mut chunk = asm.finish();

    patch(
        &mut chunk,
        init_site,
        Instruction::ForRangeInit(op::ForRangeInit {
            start,
            end,
            increment: true,
            counter_dst: counter,
            index_dst: index,
            footer_pc,
            skip_target: after_loop,
        }),
    );

    let state = vm().eval(&chunk, 0, Vec::new()).unwrap();
    assert_eq!(state.value.as_int(), Some(0), "an empty range must never enter the loop body");
}

#[test]
fn for_range_reverse_steps_backward_without_consulting_the_table() {
    let counter = Reg::new(0);
    let end = Reg::new(1);
    let acc = Reg::new(2);
    let index = Reg::new(3);

    let mut asm = AssemblerBuilder::new();
    asm.const_i8(3, counter);
    asm.const_i8(0, end);
    asm.const_i8(0, acc);
    asm.const_i8(0, index);
    let body_target = asm.here();
    asm.add_int(acc, counter, acc);
    asm.for_range_reverse(end, counter, index, body_target);
    asm.ret1(acc);
    let chunk = asm.finish();

    let state = vm().eval(&chunk, 0, Vec::new()).unwrap();
    // Descending over (0, 3]: counters 3, 2, 1 sum to 6.
    assert_eq!(state.value.as_int(), Some(6));
}

#[test]
fn match_jumps_to_the_case_matching_the_key() {
    use rivet_asm::{op, Instruction};

    let key = Reg::new(0);
    let result = Reg::new(1);

    let mut asm = AssemblerBuilder::new();
    asm.const_i8(2, key);
    let match_site = asm.here();
    asm.match_op(key, 0, vec![(1, 0), (2, 0), (3, 0)]); // patched below
    let case1 = asm.here();
    asm.const_i8(10, result);
    asm.ret1(result);
    let case2 = asm.here();
    asm.const_i8(20, result);
    asm.ret1(result);
    let case3 = asm.here();
    asm.const_i8(30, result);
    asm.ret1(result);
    let default_case = asm.here();
    asm.const_i8(99, result);
    asm.ret1(result);
    let mut chunk = asm.finish();

    patch(
        &mut chunk,
        match_site,
        Instruction::Match(op::Match { val: key, default_target: default_case, cases: vec![(1, case1), (2, case2), (3, case3)] }),
    );

    let state = vm().eval(&chunk, 0, Vec::new()).unwrap();
    assert_eq!(state.value.as_int(), Some(20));
}

#[test]
fn match_falls_back_to_the_default_target_when_no_case_matches() {
    use rivet_asm::{op, Instruction};

    let key = Reg::new(0);
    let result = Reg::new(1);

    let mut asm = AssemblerBuilder::new();
    asm.const_i8(7, key);
    let match_site = asm.here();
    asm.match_op(key, 0, vec![(1, 0), (2, 0)]); // patched below
    let case1 = asm.here();
    asm.const_i8(10, result);
    asm.ret1(result);
    let case2 = asm.here();
    asm.const_i8(20, result);
    asm.ret1(result);
    let default_case = asm.here();
    asm.const_i8(99, result);
    asm.ret1(result);
    let mut chunk = asm.finish();

    patch(
        &mut chunk,
        match_site,
        Instruction::Match(op::Match { val: key, default_target: default_case, cases: vec![(1, case1), (2, case2)] }),
    );

    let state = vm().eval(&chunk, 0, Vec::new()).unwrap();
    assert_eq!(state.value.as_int(), Some(99));
}
