use rivet_asm::{PanicReason, Reg};

use crate::call::Const;
use crate::test_helpers::AssemblerBuilder;

use super::vm;

/// A chunk with one caller (entry point `0`) and one callee, wired through
/// `CallSym`. Mirrors how `fuel-vm`'s call tests lay a callee right after
/// the caller and jump over it on the straight-line path.
fn caller_and_callee() -> (crate::call::Chunk, usize) {
    let mut asm = AssemblerBuilder::new();
    asm.jump(0); // patched below, once the callee's offset is known
    let callee_pc = asm.here();
    // callee: doubles its single argument (receiver slot = CALL_ARG_START)
    asm.add_int(Reg::new(4), Reg::new(4), Reg::new(0));
    asm.ret1(Reg::new(0));
    let caller_pc = asm.here();
    let mut chunk = asm.finish();

    let mut patched = Vec::new();
    rivet_asm::Instruction::Jump(rivet_asm::op::Jump { target: caller_pc as u32 }).encode(&mut patched);
    chunk.code[0..patched.len()].copy_from_slice(&patched);

    (chunk, callee_pc as usize)
}

#[test]
fn call_sym_invokes_callee_and_returns_to_caller() {
    let (mut chunk, callee_pc) = caller_and_callee();
    let callee_const = chunk.push_const(Const::FuncId(callee_pc as u16));

    // The caller body is built separately and appended, since it must live
    // at `chunk`'s current tail rather than at offset 0.
    let arg_reg = Reg::new(4);
    let mut tail = AssemblerBuilder::new();
    tail.const_i8(21, arg_reg);
    tail.call_sym(callee_const, Reg::new(0), 1);
    tail.ret1(Reg::new(0));
    let tail_chunk = tail.finish();
    chunk.code.extend_from_slice(&tail_chunk.code);

    let caller_pc = chunk.code.len() - tail_chunk.code.len();
    let state = vm().eval(&chunk, caller_pc, Vec::new()).unwrap();
    assert_eq!(state.value.as_int(), Some(42));
}

#[test]
fn call_obj_sym_resolves_method_through_name_const() {
    let (mut chunk, callee_pc) = caller_and_callee();
    let name_const = chunk.push_const(Const::FuncId(callee_pc as u16));

    let mut tail = AssemblerBuilder::new();
    let arg_reg = Reg::new(4);
    tail.const_i8(10, Reg::new(1)); // receiver placeholder, unused by callee body
    tail.const_i8(10, arg_reg);
    tail.call_obj_sym(Reg::new(1), name_const, Reg::new(0), 1);
    tail.ret1(Reg::new(0));
    let tail_chunk = tail.finish();
    chunk.code.extend_from_slice(&tail_chunk.code);

    let caller_pc = chunk.code.len() - tail_chunk.code.len();
    let state = vm().eval(&chunk, caller_pc, Vec::new()).unwrap();
    assert_eq!(state.value.as_int(), Some(20));
}

#[test]
fn call_through_a_func_union_wrapped_func_ptr_invokes_the_callee() {
    let (mut chunk, callee_pc) = caller_and_callee();

    let arg_reg = Reg::new(4);
    let mut tail = AssemblerBuilder::new();
    tail.const_i8(21, arg_reg);
    tail.func_ptr(callee_pc as u16, 0, Reg::new(5));
    tail.func_union(Reg::new(5), 0, Reg::new(6));
    tail.call(Reg::new(6), Reg::new(0), 1);
    tail.ret1(Reg::new(0));
    let tail_chunk = tail.finish();
    chunk.code.extend_from_slice(&tail_chunk.code);

    let caller_pc = chunk.code.len() - tail_chunk.code.len();
    let state = vm().eval(&chunk, caller_pc, Vec::new()).unwrap();
    assert_eq!(state.value.as_int(), Some(42));
}

#[test]
fn func_union_panics_when_wrapping_an_already_closure_capable_callable() {
    let mut asm = AssemblerBuilder::new();
    asm.func_ptr(0, 0, Reg::new(0));
    asm.func_union(Reg::new(0), 0, Reg::new(1));
    asm.func_union(Reg::new(1), 0, Reg::new(2));
    asm.ret1(Reg::new(2));
    let chunk = asm.finish();

    let state = vm().eval(&chunk, 0, Vec::new()).unwrap();
    assert!(super::panics_with(&state, PanicReason::ExpectedClosure));
}
