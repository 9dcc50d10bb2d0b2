//! The embedding seam: everything the interpreter core needs from its host
//! without knowing how the host implements it.
//!
//! Mirrors the role `S: InterpreterStorage` plays for `fuel-vm`'s
//! `Interpreter<S, Tx>`: the VM core is generic over `Host`, so swapping in
//! a different standard-library implementation, logging backend, or
//! embedding runtime never touches `src/interpreter/`.

use crate::value::Value;

/// A host-provided native function identified by a symbol index the
/// compiler assigned. `rivet-vm` does not resolve symbols to function
/// pointers itself — `Host::call_native` is the only place that happens.
pub trait Host {
    /// Invoke the native function bound to `symbol` with `args`, returning
    /// its result or a diagnostic string the interpreter wraps into a
    /// `VmError::HostFailure`.
    fn call_native(&mut self, symbol: u16, args: &[Value]) -> Result<Value, String>;
}

/// A minimal `Host` sufficient to exercise the call protocol in tests:
/// symbol `0` is `print` (writes via `tracing`, returns `Value::Void`),
/// every other symbol reports an "undefined native" failure.
#[derive(Debug, Default)]
pub struct BasicHost {
    pub printed: Vec<String>,
}

impl BasicHost {
    pub const PRINT_SYMBOL: u16 = 0;
}

impl Host for BasicHost {
    fn call_native(&mut self, symbol: u16, args: &[Value]) -> Result<Value, String> {
        match symbol {
            Self::PRINT_SYMBOL => {
                let rendered = args
                    .iter()
                    .map(|v| format!("{v:?}"))
                    .collect::<Vec<_>>()
                    .join(" ");
                tracing::trace!(message = %rendered, "print");
                self.printed.push(rendered);
                Ok(Value::Void)
            }
            other => Err(format!("undefined native function symbol {other}")),
        }
    }
}
