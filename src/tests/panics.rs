use rivet_asm::{PanicReason, Reg};

use crate::test_helpers::AssemblerBuilder;

use super::vm;

#[test]
fn panic_propagates_a_static_message() {
    let mut asm = AssemblerBuilder::new();
    let msg = asm.const_str("boom");
    asm.panic(msg);
    let chunk = asm.finish();

    let state = vm().eval(&chunk, 0, Vec::new()).unwrap();
    assert!(super::panics_with(&state, PanicReason::StaticMessage));
}

#[test]
fn catch_redirects_a_panic_to_the_handler_offset() {
    let mut asm = AssemblerBuilder::new();
    let handler_patch = asm.here();
    asm.catch(0); // patched once the handler's offset is known
    let msg = asm.const_str("unused"); // constant pool entry the Panic references
    asm.panic(msg);
    let handler = asm.here();
    asm.const_i8(7, Reg::new(0));
    asm.ret1(Reg::new(0));
    let mut chunk = asm.finish();

    let mut patched = Vec::new();
    rivet_asm::Instruction::Catch(rivet_asm::op::Catch { target: handler }).encode(&mut patched);
    chunk.code[handler_patch as usize..handler_patch as usize + patched.len()].copy_from_slice(&patched);

    let state = vm().eval(&chunk, 0, Vec::new()).unwrap();
    assert_eq!(state.value.as_int(), Some(7));
}

#[test]
fn unwrap_choice_mismatch_panics_with_the_dedicated_reason() {
    let mut asm = AssemblerBuilder::new();
    asm.const_i8(0, Reg::new(0)); // tag
    asm.const_i8(5, Reg::new(1)); // payload
    asm.object_small(64, 0, 2, Reg::new(2));
    asm.push(rivet_asm::Instruction::UnwrapChoice(rivet_asm::op::UnwrapChoice {
        val: Reg::new(2),
        tag: 1,
        dst: Reg::new(3),
    }));
    asm.ret1(Reg::new(3));
    let chunk = asm.finish();

    let state = vm().eval(&chunk, 0, Vec::new()).unwrap();
    assert!(super::panics_with(&state, PanicReason::UnwrapChoiceMismatch));
}

#[test]
fn throw_on_a_plain_value_panics_with_a_generic_reason() {
    let mut asm = AssemblerBuilder::new();
    let idx = asm.const_int(0);
    asm.const_op(idx, Reg::new(0));
    asm.throw(Reg::new(0));
    let chunk = asm.finish();

    // `Throw` on a plain (non-`Error`) value still panics, just with a
    // generic static message rather than the value's own reason.
    let state = vm().eval(&chunk, 0, Vec::new()).unwrap();
    assert!(super::panics_with(&state, PanicReason::StaticMessage));
}
