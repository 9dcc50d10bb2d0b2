//! Call and return: pushing/popping the four-slot frame prologue described
//! in `src/call.rs`.
//!
//! The value stack is one contiguous `Vec<Value>` per fiber; a call does
//! not copy arguments, it just moves the frame pointer forward to the
//! `ret` register the caller designated (arguments were already placed
//! there by the instructions preceding the call).

use rivet_asm::{PanicReason, Reg};

use crate::call::FrameLayout;
use crate::error::VmResult;
use crate::host::Host;
use crate::interpreter::ic::IcEntry;
use crate::state::ExecuteState;
use crate::value::Value;

use super::Vm;

impl<H: Host> Vm<H> {
    /// Push a new frame at `ret` and jump to `callee_pc`, recording
    /// `return_pc` (the instruction immediately after the call site) so
    /// `Ret0`/`Ret1`/`RetDyn` know where to resume the caller.
    pub(crate) fn enter_call(
        &mut self,
        callee_pc: usize,
        ret: Reg,
        return_pc: usize,
    ) -> VmResult<()> {
        let fp = self.current_fp();
        let new_fp = fp + ret.get();
        self.check_stack_growth(new_fp + crate::consts::CALL_ARG_START)?;
        self.with_active_fiber_mut(|fiber| {
            let need = new_fp + crate::consts::CALL_ARG_START;
            if fiber.stack.len() < need {
                fiber.stack.resize(need, Value::Void);
            }
            fiber.stack[new_fp + FrameLayout::SAVED_PC_SLOT] = Value::Int(return_pc as i64);
            fiber.stack[new_fp + FrameLayout::SAVED_FP_SLOT] = Value::Int(fp as i64);
            fiber.fp = new_fp;
            fiber.pc = callee_pc;
        });
        Ok(())
    }

    /// Pop the current frame, optionally storing `value` at the caller's
    /// designated return slot. Returns `ExecuteState::Return` once the
    /// outermost frame (`fp == 0`) returns.
    pub(crate) fn leave_call(&mut self, value: Option<Value>) -> VmResult<ExecuteState> {
        let fp = self.current_fp();
        if fp == 0 {
            return Ok(ExecuteState::Return(value.unwrap_or(Value::Void)));
        }
        let (saved_pc, saved_fp) = self.with_active_fiber_mut(|fiber| {
            let saved_pc = as_usize(fiber.stack[fp + FrameLayout::SAVED_PC_SLOT]);
            let saved_fp = as_usize(fiber.stack[fp + FrameLayout::SAVED_FP_SLOT]);
            (saved_pc, saved_fp)
        });
        if let Some(v) = value {
            let ret_slot = fp + FrameLayout::RETURN_SLOT;
            self.with_active_fiber_mut(|fiber| fiber.stack[ret_slot] = v);
        }
        self.with_active_fiber_mut(|fiber| {
            fiber.fp = saved_fp;
            fiber.pc = saved_pc;
        });
        Ok(ExecuteState::Proceed)
    }

    /// Resolve an indirect callee value (closure, function pointer/union/
    /// symbol) to a bytecode entry point. Since code generation lives
    /// outside this crate, a callable value's entry point is carried
    /// directly as the `func_id`/`ptr`/`captured` payload already recorded
    /// at construction time (`Lambda`/`Closure`/`FuncPtr`), rather than
    /// resolved through a function table this core does not own.
    pub(crate) fn resolve_callee(&mut self, callee: Value) -> VmResult<usize> {
        match callee {
            Value::Pointer(reference) => {
                let object = self.heap.get(reference).ok_or_else(|| {
                    self.panic(PanicReason::ExpectedClosure, "call through freed callable")
                })?;
                let kind = object.kind.clone();
                self.resolve_callee_kind(&kind)
            }
            _ => Err(self.panic(PanicReason::ExpectedClosure, "call on non-pointer value")),
        }
    }

    /// The `HeapObjectKind` half of [`Self::resolve_callee`], split out so
    /// `FuncUnion`'s wrapped payload can recurse through it without going
    /// back through the heap.
    fn resolve_callee_kind(
        &mut self,
        kind: &crate::heap::HeapObjectKind,
    ) -> VmResult<usize> {
        match kind {
            crate::heap::HeapObjectKind::Closure { func_id, .. }
            | crate::heap::HeapObjectKind::FuncPtr { func_id } => Ok(*func_id as usize),
            crate::heap::HeapObjectKind::FuncUnion { ptr } => self.resolve_callee_kind(ptr),
            crate::heap::HeapObjectKind::FuncSym { func_sym } => Ok(*func_sym as usize),
            _ => Err(self.panic(PanicReason::ExpectedClosure, "value is not callable")),
        }
    }

    /// Shared machinery behind `CallSymIC`/`CallObjSymIC`/...: check the
    /// inline cache for this call site, fall through to `resolve` (the
    /// slow path) on a miss, and install what was found.
    pub(crate) fn resolve_with_ic(
        &mut self,
        site_pc: usize,
        observed_type_id: u32,
        resolve: impl FnOnce(&mut Self) -> VmResult<u16>,
    ) -> VmResult<u16> {
        if let Some(IcEntry::Call { type_id, func_id }) = self.ic.get(site_pc) {
            if type_id == observed_type_id {
                return Ok(func_id);
            }
            self.ic.deopt(site_pc);
        }
        let func_id = resolve(self)?;
        self.ic.install(site_pc, IcEntry::Call { type_id: observed_type_id, func_id });
        Ok(func_id)
    }
}

fn as_usize(value: Value) -> usize {
    value.as_int().unwrap_or(0).max(0) as usize
}
