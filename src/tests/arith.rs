use rivet_asm::{PanicReason, Reg};

use crate::test_helpers::AssemblerBuilder;

use super::vm;

#[test]
fn add_int_wraps_on_overflow() {
    let mut asm = AssemblerBuilder::new();
    asm.const_i8(1, Reg::new(0));
    asm.const_i8(2, Reg::new(1));
    asm.add_int(Reg::new(0), Reg::new(1), Reg::new(2));
    asm.ret1(Reg::new(2));
    let chunk = asm.finish();

    let state = vm().eval(&chunk, 0, Vec::new()).unwrap();
    assert_eq!(state.value.as_int(), Some(3));
}

#[test]
fn div_int_by_zero_panics() {
    let mut asm = AssemblerBuilder::new();
    asm.const_i8(9, Reg::new(0));
    asm.const_i8(0, Reg::new(1));
    asm.div_int(Reg::new(0), Reg::new(1), Reg::new(2));
    asm.ret1(Reg::new(2));
    let chunk = asm.finish();

    let state = vm().eval(&chunk, 0, Vec::new()).unwrap();
    assert!(super::panics_with(&state, PanicReason::DivideByZero));
}

#[test]
fn pow_int_negative_exponent_follows_base_one_and_minus_one_laws() {
    // Only exponent == -1 special-cases bases +1/-1; any other negative
    // exponent collapses to 0 regardless of base.
    let mut asm = AssemblerBuilder::new();
    asm.const_i8(1, Reg::new(0));
    asm.const_i8((-1i8) as u8, Reg::new(1));
    asm.pow_int(Reg::new(0), Reg::new(1), Reg::new(2));
    asm.ret1(Reg::new(2));
    let chunk = asm.finish();

    let state = vm().eval(&chunk, 0, Vec::new()).unwrap();
    assert_eq!(state.value.as_int(), Some(1));
}

#[test]
fn pow_int_negative_exponent_other_than_minus_one_is_zero() {
    let mut asm = AssemblerBuilder::new();
    asm.const_i8(1, Reg::new(0));
    asm.const_i8((-3i8) as u8, Reg::new(1));
    asm.pow_int(Reg::new(0), Reg::new(1), Reg::new(2));
    asm.ret1(Reg::new(2));
    let chunk = asm.finish();

    let state = vm().eval(&chunk, 0, Vec::new()).unwrap();
    assert_eq!(state.value.as_int(), Some(0));
}

#[test]
fn compare_less_orders_mixed_int_and_float() {
    let mut asm = AssemblerBuilder::new();
    let lo = asm.const_int(1);
    let hi = asm.const_float(2.5);
    asm.const_op(lo, Reg::new(0));
    asm.const_op(hi, Reg::new(1));
    asm.compare_less(Reg::new(0), Reg::new(1), Reg::new(2));
    asm.ret1(Reg::new(2));
    let chunk = asm.finish();

    let state = vm().eval(&chunk, 0, Vec::new()).unwrap();
    assert_eq!(state.value.as_bool(), Some(true));
}

#[test]
fn compare_is_true_for_equal_primitive_values() {
    let mut asm = AssemblerBuilder::new();
    asm.const_i8(7, Reg::new(0));
    asm.const_i8(7, Reg::new(1));
    asm.compare(Reg::new(0), Reg::new(1), Reg::new(2));
    asm.ret1(Reg::new(2));
    let chunk = asm.finish();

    let state = vm().eval(&chunk, 0, Vec::new()).unwrap();
    assert_eq!(state.value.as_bool(), Some(true));
}

#[test]
fn compare_not_is_true_for_unequal_primitive_values() {
    let mut asm = AssemblerBuilder::new();
    asm.const_i8(7, Reg::new(0));
    asm.const_i8(8, Reg::new(1));
    asm.compare_not(Reg::new(0), Reg::new(1), Reg::new(2));
    asm.ret1(Reg::new(2));
    let chunk = asm.finish();

    let state = vm().eval(&chunk, 0, Vec::new()).unwrap();
    assert_eq!(state.value.as_bool(), Some(true));
}

#[test]
fn compare_treats_pointers_by_identity_not_structural_contents() {
    // Two independently built lists with identical contents are distinct
    // heap objects; the identity short-circuit must not conflate them with
    // a deep structural match.
    let mut asm = AssemblerBuilder::new();
    asm.const_i8(1, Reg::new(0));
    asm.list_dyn(0, 1, Reg::new(1));
    asm.const_i8(1, Reg::new(0));
    asm.list_dyn(0, 1, Reg::new(2));
    asm.compare(Reg::new(1), Reg::new(2), Reg::new(3));
    asm.ret1(Reg::new(3));
    let chunk = asm.finish();

    let state = vm().eval(&chunk, 0, Vec::new()).unwrap();
    assert_eq!(state.value.as_bool(), Some(false));
}
