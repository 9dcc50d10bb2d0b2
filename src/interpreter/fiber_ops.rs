//! `Coinit`/`Coyield`/`Coresume`/`Coreturn`/`Await`/`FutureValue`: the
//! cooperative coroutine switch.
//!
//! `Coresume` does not run the target fiber to completion inline — it just
//! switches which fiber is active and lets the shared dispatch loop keep
//! stepping, now inside the target's instruction stream, the same way the
//! call protocol moves `fp`/`pc` rather than recursing into a nested
//! interpreter call. Because of that, the value `Coresume`'s own `dst`
//! register receives cannot be known until the target later yields or
//! returns; `resume_stack` remembers which register is waiting so
//! `Coyield`/`Coreturn` can fill it in at the point control actually comes
//! back.
//!
//! `Coyield`'s implicit yielded value is read from the yielding fiber's own
//! slot `0` (mirroring how `Ret1`/`Coreturn` name an explicit value
//! register, but `Coyield` itself carries none) — the compiler is expected
//! to place the yielded value there before emitting `Coyield`, the same
//! way it places a return value at the callee's return slot before `Ret1`.
//!
//! `Await`/`FutureValue` do not model a host-driven event loop (running
//! one is the embedding host's job, not this core's); a future here is
//! always already resolved, so `Await` only exists to surface an error
//! value as a panic.

use rivet_asm::{PanicReason, Reg};

use crate::error::VmResult;
use crate::fiber::{Fiber, FiberId};
use crate::heap::HeapObjectKind;
use crate::host::Host;
use crate::state::ExecuteState;
use crate::value::Value;

use super::{Vm, FIBER_TYPE_ID};

impl<H: Host> Vm<H> {
    pub(crate) fn coinit(&mut self, callee: Value) -> VmResult<Value> {
        let entry_pc = self.resolve_callee(callee)?;
        let stack = vec![Value::Void; crate::consts::CALL_ARG_START];
        let fiber = Fiber::new(stack, entry_pc);
        let reference = self.heap.alloc(FIBER_TYPE_ID, false, HeapObjectKind::Fiber(fiber));
        Ok(Value::Pointer(reference))
    }

    pub(crate) fn coresume(&mut self, target: Value, dst: Reg) -> VmResult<ExecuteState> {
        let reference = target
            .as_pointer()
            .ok_or_else(|| self.panic(PanicReason::ExpectedClosure, "resume on non-fiber value"))?;
        let target_id = FiberId(reference);
        let resumable = matches!(
            self.heap.get(reference).map(|o| &o.kind),
            Some(HeapObjectKind::Fiber(f)) if f.is_resumable()
        );
        if !resumable {
            return Err(self.panic(PanicReason::FiberAlreadyDone, "fiber is not resumable"));
        }
        self.fiber_object_mut(target_id).resume();
        self.resume_stack.push((self.active_fiber, dst));
        self.active_fiber = target_id;
        Ok(ExecuteState::Proceed)
    }

    pub(crate) fn coyield(&mut self) -> VmResult<ExecuteState> {
        let Some((resumer, dst)) = self.resume_stack.pop() else {
            return Err(self.panic(PanicReason::FiberAlreadyDone, "yield outside a resumed fiber"));
        };
        let value = self.coyield_value();
        self.with_active_fiber_mut(|fiber| fiber.suspend());
        self.active_fiber = resumer;
        self.set_reg(dst, value);
        Ok(ExecuteState::Proceed)
    }

    pub(crate) fn coreturn(&mut self, value: Value) -> VmResult<ExecuteState> {
        self.with_active_fiber_mut(|fiber| fiber.finish(value));
        match self.resume_stack.pop() {
            Some((resumer, dst)) => {
                self.active_fiber = resumer;
                self.set_reg(dst, value);
                Ok(ExecuteState::Proceed)
            }
            None => Ok(ExecuteState::Return(value)),
        }
    }

    fn coyield_value(&self) -> Value {
        let fiber = self.fiber_object(self.active_fiber);
        fiber.stack.first().copied().unwrap_or(Value::Void)
    }

    pub(crate) fn await_future(&mut self, future: Value) -> VmResult<Value> {
        match future {
            Value::Error(reason) => Err(self.panic(reason, "awaited future rejected")),
            other => {
                self.retain(other);
                Ok(other)
            }
        }
    }

    pub(crate) fn future_value(&mut self, value: Value) -> Value {
        self.retain(value);
        value
    }
}
