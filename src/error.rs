//! Error and result types produced by the interpreter.

use derive_more::Display;

use rivet_asm::PanicReason;

/// Outcome tag attached to every completed (or suspended) fiber run.
///
/// Mirrors the `RES_CODE_*` family from the opcode dispatch loop: a small
/// enum a host switches on without needing to downcast an error type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultCode {
    /// The fiber ran to `End`/`Ret0`/`Ret1` without incident.
    Success,
    /// The fiber panicked; the payload is attached to the `VmError` this
    /// accompanies.
    Panic,
    /// The value stack grew past `VmLimits::max_stack_slots`.
    StackOverflow,
    /// The fiber suspended on an `Await` waiting for a future to resolve.
    Await,
    /// A condition the dispatch loop cannot classify more precisely
    /// (reserved for forward compatibility, never produced by this crate).
    Unknown,
}

/// A panic's payload: why it happened and, for formatted panics, the
/// rendered message.
#[derive(Debug, Clone, PartialEq, Eq, Display)]
#[display(fmt = "{reason}: {message}")]
pub struct PanicPayload {
    pub reason: PanicReason,
    pub message: String,
}

impl PanicPayload {
    pub fn new(reason: PanicReason, message: impl Into<String>) -> Self {
        Self { reason, message: message.into() }
    }

    pub fn static_message(reason: PanicReason, message: &'static str) -> Self {
        Self { reason, message: message.to_string() }
    }
}

/// Every way a single instruction dispatch, or a whole `Vm::eval` run, can
/// fail. Mirrors the shape of `fuel_vm::error::InterpreterError`: one
/// `derive_more::Display` enum covering decode errors, VM-detected faults,
/// and faults a `Host` implementation reports back.
#[derive(Debug, Display)]
pub enum VmError {
    #[display(fmt = "malformed instruction stream: {_0}")]
    Decode(rivet_asm::DecodeError),
    #[display(fmt = "panic: {_0}")]
    Panic(PanicPayload),
    #[display(fmt = "value stack exceeded {limit} slots")]
    StackOverflow { limit: usize },
    #[display(fmt = "fiber {fiber:?} is not in a resumable state")]
    FiberNotResumable { fiber: crate::fiber::FiberId },
    #[display(fmt = "host function {symbol} failed: {reason}")]
    HostFailure { symbol: String, reason: String },
    #[display(fmt = "heap exhausted: {_0}")]
    HeapExhausted(String),
    #[display(fmt = "no active fiber to run")]
    NoActiveFiber,
    #[display(fmt = "constant pool index {idx} invalid: {reason}")]
    ConstPool { idx: u16, reason: &'static str },
}

impl std::error::Error for VmError {}

impl From<rivet_asm::DecodeError> for VmError {
    fn from(err: rivet_asm::DecodeError) -> Self {
        Self::Decode(err)
    }
}

pub type VmResult<T> = Result<T, VmError>;
