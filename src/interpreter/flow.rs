//! Control flow: unconditional/conditional jumps and the panic/catch
//! unwind protocol.

use rivet_asm::PanicReason;

use crate::error::{VmError, VmResult};
use crate::host::Host;
use crate::value::Value;

use super::Vm;

impl<H: Host> Vm<H> {
    /// Record a protected region's unwind target; a panic raised before the
    /// matching pop (emitted by the compiler once the region ends) lands
    /// here instead of propagating out of `Vm::eval`.
    pub(crate) fn push_catch(&mut self, target: usize) {
        self.catch_stack.push(target);
    }

    pub(crate) fn pop_catch(&mut self) -> Option<usize> {
        self.catch_stack.pop()
    }

    /// Either produce a jump to the nearest catch target (consuming it) or
    /// propagate the error. Only `VmError::Panic` is catchable — allocator
    /// and stack-overflow failures terminate the fiber unconditionally,
    /// bypassing `catch_stack` entirely.
    pub(crate) fn unwind_or_propagate(&mut self, err: VmError) -> VmResult<Option<usize>> {
        if !matches!(err, VmError::Panic(_)) {
            return Err(err);
        }
        match self.pop_catch() {
            Some(target) => {
                tracing::debug!(target, "panic caught by protected region");
                Ok(Some(target))
            }
            None => Err(err),
        }
    }

    pub(crate) fn throw(&mut self, value: Value) -> VmError {
        let message = match value {
            Value::Error(reason) => return self.panic(reason, "thrown error value"),
            other => format!("{other:?}"),
        };
        self.panic(PanicReason::StaticMessage, message)
    }
}
