//! The public shape of a completed (or suspended) `Vm::eval` call.

use crate::error::{PanicPayload, ResultCode};
use crate::value::Value;

/// What a dispatch step just did, used internally by the executor loop to
/// decide whether to keep stepping or unwind back to `Vm::eval`'s caller.
/// Mirrors the role `fuel_vm::state::ExecuteState` plays around its own
/// instruction loop.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum ExecuteState {
    Proceed,
    Return(Value),
    Suspend,
    Panic,
}

/// The outcome `Vm::eval` hands back to the host: mirrors
/// `fuel_vm::state::ProgramState`, a tagged result a caller switches on
/// without downcasting an error.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgramState {
    pub code: ResultCode,
    pub value: Value,
    /// Set when `code` is `ResultCode::Panic`: why it happened and, for
    /// formatted panics, the rendered message. A host reads this instead of
    /// downcasting an error, the way `PanicPayload` would otherwise only be
    /// reachable through `VmError`.
    pub panic: Option<PanicPayload>,
}

impl ProgramState {
    pub const fn success(value: Value) -> Self {
        Self { code: ResultCode::Success, value, panic: None }
    }

    pub const fn suspended() -> Self {
        Self { code: ResultCode::Await, value: Value::Interrupt, panic: None }
    }

    pub fn panicked(payload: PanicPayload) -> Self {
        Self { code: ResultCode::Panic, value: Value::Error(payload.reason), panic: Some(payload) }
    }

    pub const fn stack_overflow() -> Self {
        Self { code: ResultCode::StackOverflow, value: Value::Interrupt, panic: None }
    }
}
