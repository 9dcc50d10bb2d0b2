//! The dispatch loop: decode one instruction, execute it, repeat.

use rivet_asm::Instruction;

use crate::call::Chunk;
use crate::error::{VmError, VmResult};
use crate::heap::HeapObjectKind;
use crate::host::Host;
use crate::interpreter::alu;
use crate::interpreter::for_range::ForRangeDirection;
use crate::interpreter::ic::IcEntry;
use crate::interpreter::Vm;
use crate::state::{ExecuteState, ProgramState};
use crate::value::Value;

/// Run `chunk` from the active fiber's current `(pc, fp)` until it
/// returns, suspends, or panics past every protected region.
pub fn run<H: Host>(vm: &mut Vm<H>, chunk: &Chunk) -> VmResult<ProgramState> {
    loop {
        let pc = vm.current_pc();
        let (instruction, len) = match chunk.decode_at(pc) {
            Ok(decoded) => decoded,
            Err(err) => return Err(VmError::from(err)),
        };
        let next_pc = pc + len;

        match step(vm, chunk, &instruction, pc, next_pc) {
            Ok(ExecuteState::Proceed) => continue,
            Ok(ExecuteState::Return(value)) => return Ok(ProgramState::success(value)),
            Ok(ExecuteState::Suspend) => return Ok(ProgramState::suspended()),
            Ok(ExecuteState::Panic) => unreachable!("step reports panics as Err, not as a state"),
            Err(err) => match vm.unwind_or_propagate(err)? {
                Some(target) => {
                    vm.set_pc(target);
                    continue;
                }
                None => unreachable!("unwind_or_propagate always errors when no catch exists"),
            },
        }
    }
}

#[tracing::instrument(skip(vm, chunk, instruction), fields(pc))]
fn step<H: Host>(
    vm: &mut Vm<H>,
    chunk: &Chunk,
    instruction: &Instruction,
    pc: usize,
    next_pc: usize,
) -> VmResult<ExecuteState> {
    tracing::trace!(?instruction, "dispatch");

    macro_rules! int_binop {
        ($i:expr, $f:path) => {{
            let left = vm.reg($i.left).as_int().unwrap_or_default();
            let right = vm.reg($i.right).as_int().unwrap_or_default();
            let result = $f(left, right).map_err(|reason| vm.panic(reason, "integer operation failed"))?;
            vm.set_reg($i.dst, Value::Int(result));
        }};
    }
    macro_rules! int_binop_infallible {
        ($i:expr, $f:expr) => {{
            let left = vm.reg($i.left).as_int().unwrap_or_default();
            let right = vm.reg($i.right).as_int().unwrap_or_default();
            vm.set_reg($i.dst, Value::Int($f(left, right)));
        }};
    }
    macro_rules! float_binop {
        ($i:expr, $f:expr) => {{
            let left = vm.reg($i.left).as_float().unwrap_or_default();
            let right = vm.reg($i.right).as_float().unwrap_or_default();
            vm.set_reg($i.dst, Value::Float($f(left, right)));
        }};
    }
    macro_rules! compare {
        ($i:expr, $f:expr) => {{
            let left = vm.reg($i.left);
            let right = vm.reg($i.right);
            vm.set_reg($i.dst, Value::Bool($f(&left, &right)));
        }};
    }

    vm.set_pc(next_pc);

    match instruction {
        Instruction::AddInt(i) => int_binop_infallible!(i, i64::wrapping_add),
        Instruction::SubInt(i) => int_binop_infallible!(i, i64::wrapping_sub),
        Instruction::MulInt(i) => int_binop_infallible!(i, i64::wrapping_mul),
        Instruction::DivInt(i) => int_binop!(i, alu::div_int),
        Instruction::ModInt(i) => int_binop!(i, alu::mod_int),
        Instruction::PowInt(i) => int_binop_infallible!(i, alu::ipow),
        Instruction::AddFloat(i) => float_binop!(i, |a: f64, b: f64| a + b),
        Instruction::SubFloat(i) => float_binop!(i, |a: f64, b: f64| a - b),
        Instruction::MulFloat(i) => float_binop!(i, |a: f64, b: f64| a * b),
        Instruction::DivFloat(i) => float_binop!(i, |a: f64, b: f64| a / b),
        Instruction::PowFloat(i) => float_binop!(i, f64::powf),
        Instruction::BitwiseAnd(i) => int_binop_infallible!(i, |a: i64, b: i64| a & b),
        Instruction::BitwiseOr(i) => int_binop_infallible!(i, |a: i64, b: i64| a | b),
        Instruction::BitwiseXor(i) => int_binop_infallible!(i, |a: i64, b: i64| a ^ b),
        Instruction::BitwiseLeftShift(i) => int_binop!(i, alu::shl),
        Instruction::BitwiseRightShift(i) => int_binop!(i, alu::shr),

        Instruction::CompareEq(i) => compare!(i, values_eq),
        Instruction::CompareNeq(i) => compare!(i, |a: &Value, b: &Value| !values_eq(a, b)),
        Instruction::CompareLess(i) => compare!(i, |a: &Value, b: &Value| numeric_cmp(a, b) == Some(std::cmp::Ordering::Less)),
        Instruction::CompareGreater(i) => compare!(i, |a: &Value, b: &Value| numeric_cmp(a, b) == Some(std::cmp::Ordering::Greater)),
        Instruction::CompareLessEqual(i) => compare!(i, |a: &Value, b: &Value| matches!(numeric_cmp(a, b), Some(std::cmp::Ordering::Less | std::cmp::Ordering::Equal))),
        Instruction::CompareGreaterEqual(i) => compare!(i, |a: &Value, b: &Value| matches!(numeric_cmp(a, b), Some(std::cmp::Ordering::Greater | std::cmp::Ordering::Equal))),
        // Identity short-circuits before falling back to the polymorphic comparator.
        Instruction::Compare(i) => compare!(i, |a: &Value, b: &Value| a == b || values_eq(a, b)),
        Instruction::CompareNot(i) => compare!(i, |a: &Value, b: &Value| !(a == b || values_eq(a, b))),

        Instruction::NegInt(i) => {
            let val = vm.reg(i.val).as_int().unwrap_or_default();
            vm.set_reg(i.dst, Value::Int(val.wrapping_neg()));
        }
        Instruction::NegFloat(i) => {
            let val = vm.reg(i.val).as_float().unwrap_or_default();
            vm.set_reg(i.dst, Value::Float(-val));
        }
        Instruction::Not(i) => {
            let val = vm.reg(i.val).is_truthy();
            vm.set_reg(i.dst, Value::Bool(!val));
        }

        Instruction::Copy(i) => {
            let val = vm.reg(i.src);
            vm.set_reg(i.dst, val);
        }
        Instruction::ConstTrue(i) => vm.set_reg(i.dst, Value::Bool(true)),
        Instruction::ConstFalse(i) => vm.set_reg(i.dst, Value::Bool(false)),
        Instruction::ConstNone(i) => vm.set_reg(i.dst, Value::None),
        Instruction::ConstI8(i) => vm.set_reg(i.dst, Value::Int(i.val as i8 as i64)),
        Instruction::ConstOp(i) => {
            let value = load_const(vm, chunk, i.idx)?;
            vm.set_reg(i.dst, value);
        }

        Instruction::Jump(i) => vm.set_pc(i.target as usize),
        Instruction::JumpCond(i) => {
            if vm.reg(i.cond).is_truthy() {
                vm.set_pc(i.target as usize);
            }
        }
        Instruction::JumpNotCond(i) => {
            if !vm.reg(i.cond).is_truthy() {
                vm.set_pc(i.target as usize);
            }
        }

        Instruction::ForRangeInit(i) => {
            let start = vm.reg(i.start).as_int().unwrap_or_default();
            let end = vm.reg(i.end).as_int().unwrap_or_default();
            vm.set_reg(i.counter_dst, Value::Int(start));
            vm.set_reg(i.index_dst, Value::Int(0));
            let empty = if i.increment { start >= end } else { start <= end };
            if empty {
                vm.set_pc(i.skip_target as usize);
            } else {
                let direction = if i.increment { ForRangeDirection::Forward } else { ForRangeDirection::Reverse };
                vm.for_range.install(i.footer_pc as usize, direction);
            }
        }
        Instruction::ForRange(i) => {
            let direction = vm.for_range.get(pc).unwrap_or(ForRangeDirection::Forward);
            let counter = vm.reg(i.counter_dst).as_int().unwrap_or_default();
            let end = vm.reg(i.end).as_int().unwrap_or_default();
            let (next_counter, keep_going) = match direction {
                ForRangeDirection::Forward => (counter + 1, counter + 1 < end),
                ForRangeDirection::Reverse => (counter - 1, counter - 1 > end),
            };
            vm.set_reg(i.counter_dst, Value::Int(next_counter));
            let index = vm.reg(i.index_dst).as_int().unwrap_or_default();
            vm.set_reg(i.index_dst, Value::Int(index + 1));
            if keep_going {
                vm.set_pc(i.body_target as usize);
            }
        }
        Instruction::ForRangeReverse(i) => {
            let counter = vm.reg(i.counter_dst).as_int().unwrap_or_default();
            let end = vm.reg(i.end).as_int().unwrap_or_default();
            let next_counter = counter - 1;
            vm.set_reg(i.counter_dst, Value::Int(next_counter));
            let index = vm.reg(i.index_dst).as_int().unwrap_or_default();
            vm.set_reg(i.index_dst, Value::Int(index + 1));
            if next_counter > end {
                vm.set_pc(i.body_target as usize);
            }
        }
        Instruction::Match(i) => {
            let key = vm.reg(i.val).as_int().unwrap_or_default();
            let target = i.cases.iter().find(|(tag, _)| *tag == key).map(|(_, target)| *target).unwrap_or(i.default_target);
            vm.set_pc(target as usize);
        }

        Instruction::Retain(i) => {
            let val = vm.reg(i.val);
            vm.retain(val);
        }
        Instruction::Release(i) => {
            let val = vm.reg(i.val);
            vm.release(val);
        }
        Instruction::ReleaseN(i) => {
            for reg in &i.regs {
                let val = vm.reg(*reg);
                vm.release(val);
            }
        }

        Instruction::IndexTuple(i) => {
            let recv = vm.reg(i.recv);
            let idx = vm.reg(i.idx).as_int().unwrap_or_default();
            let value = vm.index_tuple(recv, idx)?;
            vm.set_reg(i.dst, value);
        }
        Instruction::IndexList(i) => {
            let recv = vm.reg(i.recv);
            let idx = vm.reg(i.idx).as_int().unwrap_or_default();
            let value = vm.index_list(recv, idx)?;
            vm.set_reg(i.dst, value);
        }
        Instruction::SetIndexList(i) => {
            let recv = vm.reg(i.recv);
            let idx = vm.reg(i.idx).as_int().unwrap_or_default();
            let val = vm.reg(i.val);
            vm.set_index_list(recv, idx, val)?;
        }
        Instruction::IndexMap(i) => {
            let recv = vm.reg(i.recv);
            let key = vm.reg(i.key);
            let value = vm.index_map(recv, key)?;
            vm.set_reg(i.dst, value);
        }
        Instruction::SetIndexMap(i) => {
            let recv = vm.reg(i.recv);
            let key = vm.reg(i.key);
            let val = vm.reg(i.val);
            vm.set_index_map(recv, key, val)?;
        }
        Instruction::SliceList(i) => {
            let recv = vm.reg(i.recv);
            let start = vm.reg(i.start).as_int().unwrap_or_default();
            let end = vm.reg(i.end).as_int().unwrap_or_default();
            let value = vm.slice_list(recv, start, end)?;
            vm.set_reg(i.dst, value);
        }

        Instruction::Field(i) => {
            let recv = vm.reg(i.recv);
            let value = vm.read_field(recv, i.field_idx)?;
            vm.set_reg(i.dst, value);
        }
        Instruction::FieldStruct(i) => {
            let recv = vm.reg(i.recv);
            let value = vm.read_field(recv, i.field_idx)?;
            vm.set_reg(i.dst, value);
        }
        Instruction::FieldIC(i) => {
            let recv = vm.reg(i.recv);
            let observed = recv.type_id_of(&vm.heap);
            let cached = match vm.ic.get(pc) {
                Some(IcEntry::Field { type_id, field_offset }) if type_id == observed => Some(field_offset),
                Some(_) => {
                    vm.ic.deopt(pc);
                    None
                }
                None => None,
            };
            let field_idx = cached.map(|o| o as u8).unwrap_or(i.field_idx);
            let value = vm.read_field(recv, field_idx)?;
            vm.ic.install(pc, IcEntry::Field { type_id: observed, field_offset: field_idx as u16 });
            vm.set_reg(i.dst, value);
        }
        Instruction::FieldDyn(i) => {
            let recv = vm.reg(i.recv);
            let field_idx = resolve_dyn_field_idx(vm, chunk, i.name_idx)?;
            let value = vm.read_field(recv, field_idx)?;
            vm.set_reg(i.dst, value);
        }
        Instruction::FieldDynIC(i) => {
            let recv = vm.reg(i.recv);
            let observed = recv.type_id_of(&vm.heap);
            let field_idx = match vm.ic.get(pc) {
                Some(IcEntry::Field { type_id, field_offset }) if type_id == observed => {
                    field_offset as u8
                }
                _ => {
                    vm.ic.deopt(pc);
                    let resolved = resolve_dyn_field_idx(vm, chunk, i.name_idx)?;
                    vm.ic.install(pc, IcEntry::Field { type_id: observed, field_offset: resolved as u16 });
                    resolved
                }
            };
            let value = vm.read_field(recv, field_idx)?;
            vm.set_reg(i.dst, value);
        }
        Instruction::SetField(i) => {
            let recv = vm.reg(i.recv);
            let val = vm.reg(i.val);
            vm.write_field(recv, i.field_idx, val)?;
        }
        Instruction::SetFieldIC(i) => {
            let recv = vm.reg(i.recv);
            let val = vm.reg(i.val);
            let observed = recv.type_id_of(&vm.heap);
            vm.ic.install(pc, IcEntry::Field { type_id: observed, field_offset: i.field_idx as u16 });
            vm.write_field(recv, i.field_idx, val)?;
        }
        Instruction::SetFieldDyn(i) => {
            let recv = vm.reg(i.recv);
            let val = vm.reg(i.val);
            let field_idx = resolve_dyn_field_idx(vm, chunk, i.name_idx)?;
            vm.write_field(recv, field_idx, val)?;
        }
        Instruction::SetFieldDynIC(i) => {
            let recv = vm.reg(i.recv);
            let val = vm.reg(i.val);
            let observed = recv.type_id_of(&vm.heap);
            let field_idx = match vm.ic.get(pc) {
                Some(IcEntry::Field { type_id, field_offset }) if type_id == observed => {
                    field_offset as u8
                }
                _ => {
                    vm.ic.deopt(pc);
                    let resolved = resolve_dyn_field_idx(vm, chunk, i.name_idx)?;
                    vm.ic.install(pc, IcEntry::Field { type_id: observed, field_offset: resolved as u16 });
                    resolved
                }
            };
            vm.write_field(recv, field_idx, val)?;
        }

        Instruction::TypeCheck(i) => {
            let val = vm.reg(i.val);
            let observed = val.type_id_of(&vm.heap);
            if observed != i.type_id as u32 {
                return Err(vm.panic(rivet_asm::PanicReason::CastFail, "type check failed"));
            }
        }
        Instruction::TypeCheckOption(i) => {
            let val = vm.reg(i.val);
            if !val.is_none() && val.type_id_of(&vm.heap) != i.type_id as u32 {
                return Err(vm.panic(rivet_asm::PanicReason::CastFail, "type check failed"));
            }
        }
        Instruction::Cast(i) => {
            let val = vm.reg(i.val);
            if val.type_id_of(&vm.heap) != i.exp_type_id as u32 {
                return Err(vm.panic(rivet_asm::PanicReason::CastFail, "cast failed"));
            }
            vm.set_reg(i.dst, val);
        }
        Instruction::CastAbstract(i) => {
            let val = vm.reg(i.val);
            if i.exp_type_id as u32 != crate::value::TypeId::ANY {
                return Err(vm.panic(rivet_asm::PanicReason::CastFail, "abstract cast failed"));
            }
            vm.set_reg(i.dst, val);
        }

        Instruction::CallSym(i) => {
            let func_id = chunk_func_id(chunk, i.callee)?;
            vm.enter_call(func_id, i.ret, next_pc)?;
        }
        Instruction::CallSymIC(i) => {
            let receiver = vm.reg(i.ret).type_id_of(&vm.heap);
            let func_id = vm.resolve_with_ic(pc, receiver, |_| chunk_func_id(chunk, i.callee).map(|v| v as u16))?;
            vm.enter_call(func_id as usize, i.ret, next_pc)?;
        }
        Instruction::CallObjSym(i) => {
            let func_id = resolve_dyn_method(chunk, i.name_idx)?;
            vm.enter_call(func_id, i.ret, next_pc)?;
        }
        Instruction::CallObjSymIC(i) => {
            let recv = vm.reg(i.recv);
            let observed = recv.type_id_of(&vm.heap);
            let func_id = vm.resolve_with_ic(pc, observed, |_| resolve_dyn_method(chunk, i.name_idx).map(|v| v as u16))?;
            vm.enter_call(func_id as usize, i.ret, next_pc)?;
        }
        Instruction::CallObjFuncIC(i) => {
            let recv = vm.reg(i.recv);
            let observed = recv.type_id_of(&vm.heap);
            let func_id = vm.resolve_with_ic(pc, observed, |_| resolve_dyn_method(chunk, i.name_idx).map(|v| v as u16))?;
            vm.enter_call(func_id as usize, i.ret, next_pc)?;
        }
        Instruction::CallNativeFuncIC(i) => {
            let recv = vm.reg(i.recv);
            let observed = recv.type_id_of(&vm.heap);
            let func_id = vm.resolve_with_ic(pc, observed, |_| resolve_dyn_method(chunk, i.name_idx).map(|v| v as u16))?;
            vm.enter_call(func_id as usize, i.ret, next_pc)?;
        }
        Instruction::CallObjNativeFuncIC(i) => {
            let recv = vm.reg(i.recv);
            let observed = recv.type_id_of(&vm.heap);
            let func_id = vm.resolve_with_ic(pc, observed, |_| resolve_dyn_method(chunk, i.name_idx).map(|v| v as u16))?;
            vm.enter_call(func_id as usize, i.ret, next_pc)?;
        }
        Instruction::CallTrait(i) => {
            let recv = vm.reg(i.recv);
            let func_id = recv.type_id_of(&vm.heap) as usize + i.method_idx as usize;
            vm.enter_call(func_id, i.ret, next_pc)?;
        }
        Instruction::CallSymDyn(i) => {
            let func_id = resolve_dyn_method(chunk, i.callee_sym)?;
            vm.enter_call(func_id, i.ret, next_pc)?;
        }
        Instruction::Call(i) => {
            let callee = vm.reg(i.callee);
            let func_id = vm.resolve_callee(callee)?;
            vm.enter_call(func_id, i.ret, next_pc)?;
        }
        Instruction::Ret0(_) => return vm.leave_call(None),
        Instruction::Ret1(i) => {
            let val = vm.reg(i.val);
            return vm.leave_call(Some(val));
        }
        Instruction::RetDyn(i) => {
            let val = vm.reg(i.val);
            return vm.leave_call(Some(val));
        }

        Instruction::ObjectSmall(i) => {
            let fields = read_contiguous(vm, i.start_local, i.num_fields);
            let value = vm.build_object(i.type_id as u32, fields);
            vm.set_reg(i.dst, value);
        }
        Instruction::Object(i) => {
            let fields = read_contiguous(vm, i.start_local, i.num_fields);
            let value = vm.build_object(i.type_id as u32, fields);
            vm.set_reg(i.dst, value);
        }
        Instruction::Struct(s) => {
            let fields = read_contiguous(vm, s.start_local, s.field_sizes.len() as u8);
            let value = vm.build_struct(s.type_id as u32, fields);
            vm.set_reg(s.dst, value);
        }
        Instruction::StructSmall(s) => {
            let fields = read_contiguous(vm, s.start_local, s.field_sizes.len() as u8);
            let value = vm.build_struct(s.type_id as u32, fields);
            vm.set_reg(s.dst, value);
        }
        Instruction::ListDyn(i) => {
            let items = read_contiguous(vm, i.start_local, i.num_items);
            let value = vm.build_list(items);
            vm.set_reg(i.dst, value);
        }
        Instruction::List(i) => {
            let items = read_contiguous(vm, i.start_local, i.num_items);
            let value = vm.build_aggregate(i.type_id as u32, true, items, |items| HeapObjectKind::List { items });
            vm.set_reg(i.dst, value);
        }
        Instruction::Array(i) => {
            let items = read_contiguous(vm, i.start_local, i.num_items);
            let value = vm.build_aggregate(i.type_id as u32, true, items, |items| HeapObjectKind::List { items });
            vm.set_reg(i.dst, value);
        }
        Instruction::Tuple(i) => {
            let items = read_contiguous(vm, i.start_local, i.num_items);
            let value = vm.build_tuple(i.type_id as u32, items);
            vm.set_reg(i.dst, value);
        }
        Instruction::Map(i) => {
            let flat = read_contiguous(vm, i.start_local, i.num_entries.saturating_mul(2));
            let entries = flat.chunks_exact(2).map(|pair| (pair[0], pair[1])).collect();
            let value = vm.build_map(i.type_id as u32, entries);
            vm.set_reg(i.dst, value);
        }
        Instruction::AppendList(i) => {
            let list = vm.reg(i.list);
            let val = vm.reg(i.val);
            vm.retain(val);
            vm.append_list(list, val)?;
        }
        Instruction::Trait(i) => {
            let value = vm.reg(i.val);
            let wrapped = vm.build_aggregate(i.type_id as u32, true, vec![value], |fields| {
                HeapObjectKind::Trait { impl_idx: i.impl_idx, value: fields[0] }
            });
            vm.set_reg(i.dst, wrapped);
        }
        Instruction::Box(i) => {
            let val = vm.reg(i.val).as_int().unwrap_or_default();
            let reference = vm.heap.alloc(crate::value::TypeId::INT, false, HeapObjectKind::BoxedInt { val });
            vm.set_reg(i.dst, Value::Pointer(reference));
        }
        Instruction::Unbox(i) => {
            let val = vm.reg(i.val);
            let reference = val.as_pointer().ok_or_else(|| vm.panic(rivet_asm::PanicReason::ExpectedPointer, "unbox of non-pointer"))?;
            let boxed = match vm.heap.get(reference) {
                Some(obj) => match obj.kind {
                    HeapObjectKind::BoxedInt { val } => val,
                    _ => return Err(vm.panic(rivet_asm::PanicReason::ExpectedPointer, "value is not boxed")),
                },
                None => return Err(vm.panic(rivet_asm::PanicReason::ExpectedPointer, "unbox of freed value")),
            };
            vm.set_reg(i.dst, Value::Int(boxed));
        }
        Instruction::Lambda(i) => {
            let reference = vm.heap.alloc(crate::value::TypeId::ANY, false, HeapObjectKind::FuncPtr { func_id: i.func_id });
            vm.set_reg(i.dst, Value::Pointer(reference));
        }
        Instruction::Closure(c) => {
            let captured = c
                .captured
                .iter()
                .map(|&r| {
                    let v = vm.reg(r);
                    vm.retain(v);
                    v
                })
                .collect();
            let reference = vm.heap.alloc(crate::value::TypeId::ANY, true, HeapObjectKind::Closure { func_id: c.func_id, captured });
            vm.set_reg(c.dst, Value::Pointer(reference));
        }

        Instruction::AddrLocal(i) => {
            let fp = vm.current_fp();
            vm.set_reg(i.dst, Value::Int((fp + i.local.get() as usize) as i64));
        }
        Instruction::AddrConstIndex(i) => {
            let base = vm.reg(i.ptr).as_int().unwrap_or_default();
            vm.set_reg(i.dst, Value::Int(base + i.offset as i64));
        }
        Instruction::AddrIndex(i) => {
            let base = vm.reg(i.ptr).as_int().unwrap_or_default();
            let offset = vm.reg(i.idx).as_int().unwrap_or_default();
            vm.set_reg(i.dst, Value::Int(base + offset));
        }
        Instruction::Deref(i) => {
            let addr = vm.reg(i.ptr).as_int().unwrap_or_default();
            let value = read_abs_slot(vm, addr as usize);
            if i.retain_flag {
                vm.retain(value);
            }
            vm.set_reg(i.dst, value);
        }
        Instruction::DerefStruct(i) => {
            let addr = vm.reg(i.ptr).as_int().unwrap_or_default() as usize;
            let fields: Vec<Value> = (0..i.num_fields as usize).map(|k| read_abs_slot(vm, addr + k)).collect();
            let value = vm.build_object(i.type_id as u32, fields);
            vm.set_reg(i.dst, value);
        }
        Instruction::SetDeref(i) => {
            let addr = vm.reg(i.ptr).as_int().unwrap_or_default() as usize;
            let val = vm.reg(i.val);
            write_abs_slot(vm, addr, val);
        }
        Instruction::SetDerefStruct(i) => {
            let addr = vm.reg(i.ptr).as_int().unwrap_or_default() as usize;
            let recv = vm.reg(i.src);
            let reference = recv.as_pointer().ok_or_else(|| vm.panic(rivet_asm::PanicReason::ExpectedPointer, "struct copy source is not a pointer"))?;
            let fields = match &vm.heap.get(reference).map(|o| o.kind.clone()) {
                Some(HeapObjectKind::Object { fields }) | Some(HeapObjectKind::Struct { fields }) => fields.clone(),
                _ => return Err(vm.panic(rivet_asm::PanicReason::ExpectedPointer, "value has no fields")),
            };
            for (k, field) in fields.into_iter().take(i.num_fields as usize).enumerate() {
                write_abs_slot(vm, addr + k, field);
            }
            vm.release(recv);
        }

        Instruction::Up(i) => {
            let value = vm.reg(i.val);
            let reference = vm.heap.alloc(crate::value::TypeId::ANY, true, HeapObjectKind::UpValue { val: value });
            vm.set_reg(i.dst, Value::Pointer(reference));
        }
        Instruction::UpValue(i) => {
            let up = vm.reg(i.up);
            let reference = up.as_pointer().ok_or_else(|| vm.panic(rivet_asm::PanicReason::ExpectedUpValue, "value is not an up-value box"))?;
            let val = match vm.heap.get(reference) {
                Some(obj) => match &obj.kind {
                    HeapObjectKind::UpValue { val } => *val,
                    _ => return Err(vm.panic(rivet_asm::PanicReason::ExpectedUpValue, "value is not an up-value box")),
                },
                None => return Err(vm.panic(rivet_asm::PanicReason::ExpectedUpValue, "up-value box was freed")),
            };
            vm.set_reg(i.dst, val);
        }
        Instruction::SetUpValue(i) => {
            let up = vm.reg(i.up);
            let val = vm.reg(i.val);
            let reference = up.as_pointer().ok_or_else(|| vm.panic(rivet_asm::PanicReason::ExpectedUpValue, "value is not an up-value box"))?;
            let old = match vm.heap.get_mut(reference) {
                Some(obj) => match &mut obj.kind {
                    HeapObjectKind::UpValue { val: slot } => std::mem::replace(slot, val),
                    _ => return Err(vm.panic(rivet_asm::PanicReason::ExpectedUpValue, "value is not an up-value box")),
                },
                None => return Err(vm.panic(rivet_asm::PanicReason::ExpectedUpValue, "up-value box was freed")),
            };
            if i.release_flag {
                vm.release(old);
            }
        }
        Instruction::Captured(i) => {
            let closure = vm.reg(i.closure);
            let up = captured_slot(vm, closure, i.slot)?;
            let val = match vm.heap.get(up.as_pointer().ok_or_else(|| vm.panic(rivet_asm::PanicReason::ExpectedUpValue, "captured slot is not an up-value box"))?) {
                Some(obj) => match &obj.kind {
                    HeapObjectKind::UpValue { val } => *val,
                    _ => return Err(vm.panic(rivet_asm::PanicReason::ExpectedUpValue, "captured slot is not an up-value box")),
                },
                None => return Err(vm.panic(rivet_asm::PanicReason::ExpectedUpValue, "captured up-value box was freed")),
            };
            if i.retain_flag {
                vm.retain(val);
            }
            vm.set_reg(i.dst, val);
        }
        Instruction::SetCaptured(i) => {
            let closure = vm.reg(i.closure);
            let up = captured_slot(vm, closure, i.slot)?;
            let val = vm.reg(i.val);
            let reference = up.as_pointer().ok_or_else(|| vm.panic(rivet_asm::PanicReason::ExpectedUpValue, "captured slot is not an up-value box"))?;
            let old = match vm.heap.get_mut(reference) {
                Some(obj) => match &mut obj.kind {
                    HeapObjectKind::UpValue { val: slot } => std::mem::replace(slot, val),
                    _ => return Err(vm.panic(rivet_asm::PanicReason::ExpectedUpValue, "captured slot is not an up-value box")),
                },
                None => return Err(vm.panic(rivet_asm::PanicReason::ExpectedUpValue, "captured up-value box was freed")),
            };
            vm.release(old);
        }

        Instruction::TagLit(i) => vm.set_reg(i.dst, Value::TagLit(i.sym)),
        Instruction::Enum(i) => vm.set_reg(i.dst, Value::Enum { tag_id: i.tag_id, val: i.val }),
        Instruction::Symbol(i) => vm.set_reg(i.dst, Value::Symbol(i.sym_id as u32)),
        Instruction::FuncPtr(i) => {
            let reference = vm.heap.alloc(i.ptr_type_id as u32, false, HeapObjectKind::FuncPtr { func_id: i.func_id });
            vm.set_reg(i.dst, Value::Pointer(reference));
        }
        Instruction::FuncUnion(i) => {
            let val = vm.reg(i.val);
            let reference = val.as_pointer().ok_or_else(|| vm.panic(rivet_asm::PanicReason::ExpectedClosure, "expected a function pointer"))?;
            let ptr_kind = vm
                .heap
                .get(reference)
                .map(|o| o.kind.clone())
                .ok_or_else(|| vm.panic(rivet_asm::PanicReason::ExpectedClosure, "function pointer was freed"))?;
            if matches!(ptr_kind, HeapObjectKind::FuncUnion { .. } | HeapObjectKind::Closure { .. }) {
                return Err(vm.panic(rivet_asm::PanicReason::ExpectedClosure, "TODO: cannot promote an already-closure-capable callable to a union"));
            }
            vm.release(val);
            let wrapped = vm.heap.alloc(i.union_type_id as u32, true, HeapObjectKind::FuncUnion { ptr: Box::new(ptr_kind) });
            vm.set_reg(i.dst, Value::Pointer(wrapped));
        }
        Instruction::FuncSym(i) => {
            let reference = vm.heap.alloc(i.sym_type_id as u32, false, HeapObjectKind::FuncSym { func_sym: i.func_sym.0 });
            vm.set_reg(i.dst, Value::Pointer(reference));
        }
        Instruction::StaticVar(i) => {
            let value = vm.statics.get(i.sym_id as usize).copied().unwrap_or(Value::None);
            vm.set_reg(i.dst, value);
        }
        Instruction::SetStaticVar(i) => {
            let val = vm.reg(i.val);
            let idx = i.sym_id as usize;
            if vm.statics.len() <= idx {
                vm.statics.resize(idx + 1, Value::None);
            }
            if i.release_flag {
                let prev = vm.statics[idx];
                vm.release(prev);
            }
            vm.statics[idx] = val;
        }
        Instruction::Context(i) => {
            let value = vm.context_vars.get(i.idx as usize).copied().unwrap_or(Value::None);
            vm.retain(value);
            vm.set_reg(i.dst, value);
        }
        Instruction::Type(i) => {
            let kind = if i.expr_type {
                HeapObjectKind::ExprType { type_id: i.type_id }
            } else {
                HeapObjectKind::Type { type_id: i.type_id }
            };
            let reference = vm.heap.alloc(crate::value::TypeId::ANY, false, kind);
            vm.set_reg(i.dst, Value::Pointer(reference));
        }
        Instruction::StringTemplate(s) => {
            let mut out = String::new();
            let exprs = read_contiguous(vm, s.start_local, s.num_exprs);
            for (idx, const_idx) in s.str_const_idxs.iter().enumerate() {
                if let Const::Str(piece) = const_at(chunk, *const_idx)? {
                    out.push_str(piece);
                }
                if let Some(expr) = exprs.get(idx) {
                    out.push_str(&format!("{expr:?}"));
                }
            }
            let value = vm.build_aggregate(crate::value::TypeId::ANY, false, Vec::new(), |_| {
                HeapObjectKind::String { bytes: out }
            });
            vm.set_reg(s.dst, value);
        }

        Instruction::Coinit(i) => {
            let callee = vm.reg(i.func);
            let value = vm.coinit(callee)?;
            vm.set_reg(i.dst, value);
        }
        Instruction::Coyield(_) => return vm.coyield(),
        Instruction::Coresume(i) => {
            let fiber = vm.reg(i.fiber);
            return vm.coresume(fiber, i.dst);
        }
        Instruction::Coreturn(i) => {
            let val = vm.reg(i.val);
            return vm.coreturn(val);
        }
        Instruction::Await(i) => {
            let future = vm.reg(i.future);
            let value = vm.await_future(future)?;
            vm.set_reg(i.dst, value);
        }
        Instruction::FutureValue(i) => {
            let val = vm.reg(i.val);
            let value = vm.future_value(val);
            vm.set_reg(i.dst, value);
        }

        Instruction::Panic(i) => {
            let message = match const_at(chunk, i.msg_idx)? {
                Const::Str(s) => s.clone(),
                other => format!("{other:?}"),
            };
            return Err(vm.panic(rivet_asm::PanicReason::StaticMessage, message));
        }
        Instruction::PanicFmt(i) => {
            let parts = read_contiguous(vm, i.start_local, i.num_args);
            let fmt = match const_at(chunk, i.fmt_idx)? {
                Const::Str(s) => s.clone(),
                other => format!("{other:?}"),
            };
            let message = format!("{fmt} {parts:?}");
            return Err(vm.panic(rivet_asm::PanicReason::FormattedMessage, message));
        }
        Instruction::Catch(i) => vm.push_catch(i.target as usize),
        Instruction::Throw(i) => {
            let val = vm.reg(i.val);
            return Err(vm.throw(val));
        }
        Instruction::UnwrapChoice(i) => {
            let recv = vm.reg(i.val);
            let value = vm.unwrap_choice(recv, i.tag)?;
            vm.set_reg(i.dst, value);
        }

        Instruction::End(_) => return Ok(ExecuteState::Return(Value::Void)),
    }

    Ok(ExecuteState::Proceed)
}

fn values_eq(a: &Value, b: &Value) -> bool {
    use Value::*;
    match (a, b) {
        (Int(x), Int(y)) => x == y,
        (Float(x), Float(y)) => x == y,
        (Bool(x), Bool(y)) => x == y,
        (Symbol(x), Symbol(y)) => x == y,
        (TagLit(x), TagLit(y)) => x == y,
        (Pointer(x), Pointer(y)) => x == y,
        (None, None) | (Void, Void) => true,
        _ => false,
    }
}

fn numeric_cmp(a: &Value, b: &Value) -> Option<std::cmp::Ordering> {
    match (a, b) {
        (Value::Int(x), Value::Int(y)) => x.partial_cmp(y),
        (Value::Float(x), Value::Float(y)) => x.partial_cmp(y),
        (Value::Int(x), Value::Float(y)) => (*x as f64).partial_cmp(y),
        (Value::Float(x), Value::Int(y)) => x.partial_cmp(&(*y as f64)),
        _ => None,
    }
}

fn read_contiguous<H: Host>(vm: &Vm<H>, start_local: u8, count: u8) -> Vec<Value> {
    (0..count).map(|k| vm.reg(rivet_asm::Reg::new(start_local + k))).collect()
}

fn read_abs_slot<H: Host>(vm: &Vm<H>, addr: usize) -> Value {
    let fiber = vm.fiber_object(vm.active_fiber);
    fiber.stack.get(addr).copied().unwrap_or(Value::Void)
}

fn write_abs_slot<H: Host>(vm: &mut Vm<H>, addr: usize, value: Value) {
    vm.with_active_fiber_mut(|fiber| {
        if addr >= fiber.stack.len() {
            fiber.stack.resize(addr + 1, Value::Void);
        }
        fiber.stack[addr] = value;
    });
}

fn captured_slot<H: Host>(vm: &mut Vm<H>, closure: Value, slot: u8) -> VmResult<Value> {
    let reference = closure
        .as_pointer()
        .ok_or_else(|| vm.panic(rivet_asm::PanicReason::ExpectedClosure, "value is not a closure"))?;
    match vm.heap.get(reference) {
        Some(obj) => match &obj.kind {
            HeapObjectKind::Closure { captured, .. } => captured
                .get(slot as usize)
                .copied()
                .ok_or_else(|| vm.panic(rivet_asm::PanicReason::ExpectedUpValue, "captured slot out of range")),
            _ => Err(vm.panic(rivet_asm::PanicReason::ExpectedClosure, "value is not a closure")),
        },
        None => Err(vm.panic(rivet_asm::PanicReason::ExpectedClosure, "closure was freed")),
    }
}

use crate::call::Const;

fn const_at(chunk: &Chunk, idx: u16) -> VmResult<&Const> {
    chunk
        .consts
        .get(idx as usize)
        .ok_or(VmError::ConstPool { idx, reason: "index out of range" })
}

fn load_const<H: Host>(vm: &mut Vm<H>, chunk: &Chunk, idx: u16) -> VmResult<Value> {
    match const_at(chunk, idx)? {
        Const::Int(i) => Ok(Value::Int(*i)),
        Const::Float(f) => Ok(Value::Float(*f)),
        Const::Str(s) => {
            let s = s.clone();
            Ok(vm.build_aggregate(crate::value::TypeId::ANY, false, Vec::new(), |_| {
                HeapObjectKind::String { bytes: s }
            }))
        }
        Const::FuncId(id) => {
            let reference = vm.heap.alloc(crate::value::TypeId::ANY, false, HeapObjectKind::FuncPtr { func_id: *id });
            Ok(Value::Pointer(reference))
        }
    }
}

fn chunk_func_id(chunk: &Chunk, const_idx: u16) -> VmResult<usize> {
    match const_at(chunk, const_idx)? {
        Const::FuncId(id) => Ok(*id as usize),
        Const::Int(i) => Ok(*i as usize),
        _ => Err(VmError::ConstPool { idx: const_idx, reason: "expected a function id constant" }),
    }
}

/// Dynamic method/field name resolution: the (external) compiler assigns a
/// stable field offset / function entry to every name it emits a
/// `*Dyn`/`*Sym` reference to, recorded directly as the constant pool
/// entry's integer payload — this core has no symbol table of its own to
/// consult.
fn resolve_dyn_field_idx<H: Host>(_vm: &mut Vm<H>, chunk: &Chunk, name_idx: u16) -> VmResult<u8> {
    match const_at(chunk, name_idx)? {
        Const::Int(i) => Ok(*i as u8),
        _ => Err(VmError::ConstPool { idx: name_idx, reason: "expected an integer field offset" }),
    }
}

fn resolve_dyn_method(chunk: &Chunk, name_idx: u16) -> VmResult<usize> {
    match const_at(chunk, name_idx)? {
        Const::FuncId(id) => Ok(*id as usize),
        Const::Int(i) => Ok(*i as usize),
        _ => Err(VmError::ConstPool { idx: name_idx, reason: "expected a function id constant" }),
    }
}
