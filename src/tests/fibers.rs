use rivet_asm::Reg;

use crate::call::Const;
use crate::test_helpers::AssemblerBuilder;

use super::vm;

/// Builds a program whose entry point is a `main` that starts a fiber,
/// resumes it once (observing the yielded value) and again (observing the
/// returned value), then sums the two.
fn yield_then_return_chunk() -> (crate::call::Chunk, usize) {
    let mut asm = AssemblerBuilder::new();
    let entry_jump = asm.here();
    asm.jump(0); // patched to `main`'s offset below

    let fiber_entry = asm.here();
    asm.const_i8(1, Reg::new(0)); // slot 0 is the implicit `Coyield` value
    asm.coyield();
    asm.const_i8(2, Reg::new(0));
    asm.coreturn(Reg::new(0));

    let main = asm.here();
    let func_const = Const::FuncId(fiber_entry as u16);
    let mut chunk = asm.finish();
    let func_idx = chunk.push_const(func_const);

    let mut tail = AssemblerBuilder::new();
    tail.const_op(func_idx, Reg::new(0));
    tail.coinit(Reg::new(0), Reg::new(1));
    tail.coresume(Reg::new(1), Reg::new(2));
    tail.coresume(Reg::new(1), Reg::new(3));
    tail.add_int(Reg::new(2), Reg::new(3), Reg::new(4));
    tail.ret1(Reg::new(4));
    let tail_chunk = tail.finish();
    chunk.code.extend_from_slice(&tail_chunk.code);

    let mut patched = Vec::new();
    rivet_asm::Instruction::Jump(rivet_asm::op::Jump { target: main as u32 }).encode(&mut patched);
    chunk.code[entry_jump as usize..entry_jump as usize + patched.len()].copy_from_slice(&patched);

    (chunk, main)
}

#[test]
fn coresume_delivers_the_yielded_value_then_the_returned_value() {
    let (chunk, main) = yield_then_return_chunk();
    let state = vm().eval(&chunk, main, Vec::new()).unwrap();
    assert_eq!(state.value.as_int(), Some(3), "1 (yielded) + 2 (returned) == 3");
}

#[test]
fn resuming_a_fiber_again_after_it_finished_panics() {
    use rivet_asm::PanicReason;

    let mut asm = AssemblerBuilder::new();
    asm.coreturn(Reg::new(0)); // immediately-finished fiber body
    let fiber_entry = 0u16;
    let mut chunk = asm.finish();
    let func_idx = chunk.push_const(Const::FuncId(fiber_entry));

    let mut tail = AssemblerBuilder::new();
    tail.const_op(func_idx, Reg::new(0));
    tail.coinit(Reg::new(0), Reg::new(1));
    tail.coresume(Reg::new(1), Reg::new(2));
    tail.coresume(Reg::new(1), Reg::new(3));
    tail.ret1(Reg::new(3));
    let tail_chunk = tail.finish();
    chunk.code.extend_from_slice(&tail_chunk.code);
    let main = chunk.code.len() - tail_chunk.code.len();

    let state = vm().eval(&chunk, main, Vec::new()).unwrap();
    assert!(super::panics_with(&state, PanicReason::FiberAlreadyDone));
}
