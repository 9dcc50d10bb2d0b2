//! Hand-assembly helpers for building [`Chunk`]s in tests, the way
//! `fuel-vm`'s own test suite hand-assembles `op::*` sequences instead of
//! driving a real compiler.

use rivet_asm::{op, Instruction, PanicReason, Reg};

use crate::call::{Chunk, Const};

/// Fluent builder over a [`Chunk`]: one method per opcode family actually
/// exercised by this crate's tests, plus raw [`push`](Self::push) for
/// anything else.
#[derive(Debug, Default)]
pub struct AssemblerBuilder {
    chunk: Chunk,
}

impl AssemblerBuilder {
    pub fn new() -> Self {
        Self { chunk: Chunk::new() }
    }

    pub fn push(&mut self, instruction: Instruction) -> &mut Self {
        self.chunk.push(&instruction);
        self
    }

    pub fn const_int(&mut self, value: i64) -> u16 {
        self.chunk.push_const(Const::Int(value))
    }

    pub fn const_float(&mut self, value: f64) -> u16 {
        self.chunk.push_const(Const::Float(value))
    }

    pub fn const_str(&mut self, value: impl Into<String>) -> u16 {
        self.chunk.push_const(Const::Str(value.into()))
    }

    pub fn const_func(&mut self, func_id: u16) -> u16 {
        self.chunk.push_const(Const::FuncId(func_id))
    }

    /// Current instruction offset, for patching forward jump targets.
    pub fn here(&self) -> u32 {
        self.chunk.code.len() as u32
    }

    pub fn const_i8(&mut self, val: u8, dst: Reg) -> &mut Self {
        self.push(Instruction::ConstI8(op::ConstI8 { val, dst }))
    }

    pub fn const_op(&mut self, idx: u16, dst: Reg) -> &mut Self {
        self.push(Instruction::ConstOp(op::ConstOp { idx, dst }))
    }

    pub fn add_int(&mut self, left: Reg, right: Reg, dst: Reg) -> &mut Self {
        self.push(Instruction::AddInt(op::AddInt { left, right, dst }))
    }

    pub fn sub_int(&mut self, left: Reg, right: Reg, dst: Reg) -> &mut Self {
        self.push(Instruction::SubInt(op::SubInt { left, right, dst }))
    }

    pub fn mul_int(&mut self, left: Reg, right: Reg, dst: Reg) -> &mut Self {
        self.push(Instruction::MulInt(op::MulInt { left, right, dst }))
    }

    pub fn div_int(&mut self, left: Reg, right: Reg, dst: Reg) -> &mut Self {
        self.push(Instruction::DivInt(op::DivInt { left, right, dst }))
    }

    pub fn pow_int(&mut self, left: Reg, right: Reg, dst: Reg) -> &mut Self {
        self.push(Instruction::PowInt(op::PowInt { left, right, dst }))
    }

    pub fn compare_less(&mut self, left: Reg, right: Reg, dst: Reg) -> &mut Self {
        self.push(Instruction::CompareLess(op::CompareLess { left, right, dst }))
    }

    pub fn compare_eq(&mut self, left: Reg, right: Reg, dst: Reg) -> &mut Self {
        self.push(Instruction::CompareEq(op::CompareEq { left, right, dst }))
    }

    pub fn compare(&mut self, left: Reg, right: Reg, dst: Reg) -> &mut Self {
        self.push(Instruction::Compare(op::Compare { left, right, dst }))
    }

    pub fn compare_not(&mut self, left: Reg, right: Reg, dst: Reg) -> &mut Self {
        self.push(Instruction::CompareNot(op::CompareNot { left, right, dst }))
    }

    pub fn jump(&mut self, target: u32) -> &mut Self {
        self.push(Instruction::Jump(op::Jump { target }))
    }

    pub fn jump_cond(&mut self, cond: Reg, target: u32) -> &mut Self {
        self.push(Instruction::JumpCond(op::JumpCond { cond, target }))
    }

    pub fn jump_not_cond(&mut self, cond: Reg, target: u32) -> &mut Self {
        self.push(Instruction::JumpNotCond(op::JumpNotCond { cond, target }))
    }

    #[allow(clippy::too_many_arguments)]
    pub fn for_range_init(
        &mut self,
        start: Reg,
        end: Reg,
        increment: bool,
        counter_dst: Reg,
        index_dst: Reg,
        footer_pc: u32,
        skip_target: u32,
    ) -> &mut Self {
        self.push(Instruction::ForRangeInit(op::ForRangeInit {
            start,
            end,
            increment,
            counter_dst,
            index_dst,
            footer_pc,
            skip_target,
        }))
    }

    pub fn for_range(&mut self, end: Reg, counter_dst: Reg, index_dst: Reg, body_target: u32) -> &mut Self {
        self.push(Instruction::ForRange(op::ForRange { end, counter_dst, index_dst, body_target }))
    }

    pub fn for_range_reverse(&mut self, end: Reg, counter_dst: Reg, index_dst: Reg, body_target: u32) -> &mut Self {
        self.push(Instruction::ForRangeReverse(op::ForRangeReverse { end, counter_dst, index_dst, body_target }))
    }

    pub fn match_op(&mut self, val: Reg, default_target: u32, cases: Vec<(i64, u32)>) -> &mut Self {
        self.push(Instruction::Match(op::Match { val, default_target, cases }))
    }

    pub fn call_sym(&mut self, callee: u16, ret: Reg, num_args: u8) -> &mut Self {
        self.push(Instruction::CallSym(op::CallSym { callee, ret, num_args }))
    }

    pub fn call(&mut self, callee: Reg, ret: Reg, num_args: u8) -> &mut Self {
        self.push(Instruction::Call(op::Call { callee, ret, num_args }))
    }

    pub fn func_ptr(&mut self, func_id: u16, ptr_type_id: u16, dst: Reg) -> &mut Self {
        self.push(Instruction::FuncPtr(op::FuncPtr { func_id, ptr_type_id, dst }))
    }

    pub fn func_union(&mut self, val: Reg, union_type_id: u16, dst: Reg) -> &mut Self {
        self.push(Instruction::FuncUnion(op::FuncUnion { val, union_type_id, dst }))
    }

    pub fn call_obj_sym(&mut self, recv: Reg, name_idx: u16, ret: Reg, num_args: u8) -> &mut Self {
        self.push(Instruction::CallObjSym(op::CallObjSym { recv, name_idx, ret, num_args }))
    }

    pub fn ret0(&mut self) -> &mut Self {
        self.push(Instruction::Ret0(op::Ret0 {}))
    }

    pub fn ret1(&mut self, val: Reg) -> &mut Self {
        self.push(Instruction::Ret1(op::Ret1 { val }))
    }

    pub fn object_small(&mut self, type_id: u16, start_local: u8, num_fields: u8, dst: Reg) -> &mut Self {
        self.push(Instruction::ObjectSmall(op::ObjectSmall { type_id, start_local, num_fields, dst }))
    }

    pub fn list_dyn(&mut self, start_local: u8, num_items: u8, dst: Reg) -> &mut Self {
        self.push(Instruction::ListDyn(op::ListDyn { start_local, num_items, dst }))
    }

    pub fn list(&mut self, type_id: u16, start_local: u8, num_items: u8, dst: Reg) -> &mut Self {
        self.push(Instruction::List(op::List { type_id, start_local, num_items, dst }))
    }

    pub fn array(&mut self, type_id: u16, start_local: u8, num_items: u8, dst: Reg) -> &mut Self {
        self.push(Instruction::Array(op::Array { type_id, start_local, num_items, dst }))
    }

    pub fn tuple(&mut self, type_id: u16, start_local: u8, num_items: u8, dst: Reg) -> &mut Self {
        self.push(Instruction::Tuple(op::Tuple { type_id, start_local, num_items, dst }))
    }

    pub fn map(&mut self, type_id: u16, start_local: u8, num_entries: u8, dst: Reg) -> &mut Self {
        self.push(Instruction::Map(op::Map { type_id, start_local, num_entries, dst }))
    }

    pub fn append_list(&mut self, list: Reg, val: Reg) -> &mut Self {
        self.push(Instruction::AppendList(op::AppendList { list, val }))
    }

    pub fn field(&mut self, recv: Reg, field_idx: u8, dst: Reg) -> &mut Self {
        self.push(Instruction::Field(op::Field { recv, field_idx, dst }))
    }

    pub fn field_ic(&mut self, recv: Reg, field_idx: u8, dst: Reg) -> &mut Self {
        self.push(Instruction::FieldIC(op::FieldIC {
            recv,
            field_idx,
            dst,
            cache_type_id: 0,
            cache_offset: 0,
        }))
    }

    pub fn set_field(&mut self, recv: Reg, field_idx: u8, val: Reg) -> &mut Self {
        self.push(Instruction::SetField(op::SetField { recv, field_idx, val }))
    }

    pub fn coinit(&mut self, func: Reg, dst: Reg) -> &mut Self {
        self.push(Instruction::Coinit(op::Coinit { func, dst }))
    }

    pub fn coyield(&mut self) -> &mut Self {
        self.push(Instruction::Coyield(op::Coyield {}))
    }

    pub fn coresume(&mut self, fiber: Reg, dst: Reg) -> &mut Self {
        self.push(Instruction::Coresume(op::Coresume { fiber, dst }))
    }

    pub fn coreturn(&mut self, val: Reg) -> &mut Self {
        self.push(Instruction::Coreturn(op::Coreturn { val }))
    }

    pub fn lambda(&mut self, func_id: u16, dst: Reg) -> &mut Self {
        self.push(Instruction::Lambda(op::Lambda { func_id, dst }))
    }

    pub fn closure(&mut self, func_id: u16, captured: Vec<Reg>, dst: Reg) -> &mut Self {
        self.push(Instruction::Closure(op::Closure { func_id, captured, dst }))
    }

    pub fn panic(&mut self, msg_idx: u16) -> &mut Self {
        self.push(Instruction::Panic(op::Panic { msg_idx }))
    }

    pub fn catch(&mut self, target: u32) -> &mut Self {
        self.push(Instruction::Catch(op::Catch { target }))
    }

    pub fn throw(&mut self, val: Reg) -> &mut Self {
        self.push(Instruction::Throw(op::Throw { val }))
    }

    pub fn end(&mut self) -> &mut Self {
        self.push(Instruction::End(op::End {}))
    }

    pub fn finish(&mut self) -> Chunk {
        std::mem::take(&mut self.chunk)
    }
}

/// Confirm a `Vm::eval` call panicked with a given reason: `eval` surfaces a
/// panic as `Ok(ProgramState { code: ResultCode::Panic, .. })`, not `Err`,
/// so assertions check `state.panic` rather than unwrapping an error.
pub fn expect_panic_reason(state: &crate::state::ProgramState, reason: PanicReason) -> bool {
    matches!(&state.panic, Some(payload) if payload.reason == reason)
}
