//! Cooperative fibers: the VM's only concurrency primitive.
//!
//! A fiber owns its own value stack and a single `(pc, fp)` cursor; exactly
//! one fiber is active at a time (no OS threads, no preemption). `Coinit`
//! creates a fiber, `Coyield`/`Coresume` cooperatively pass control, and
//! `Coreturn` tears it down. `Await`/`FutureValue` reuse the same
//! suspend/resume machinery for host-driven asynchronous results.

use crate::value::Value;

/// Identifies a fiber's heap object; distinct newtype so fiber handles
/// can't be confused with an arbitrary `HeapRef` at call sites.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FiberId(pub crate::heap::HeapRef);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FiberState {
    /// Freshly created by `Coinit`, never resumed yet.
    Ready,
    /// Currently the active fiber.
    Running,
    /// Suspended at a `Coyield`; resumable via `Coresume`.
    Suspended,
    /// Returned (`Coreturn`) or panicked; `Coresume` on it is an error.
    Done,
}

/// One fiber's execution state.
#[derive(Debug, Clone, PartialEq)]
pub struct Fiber {
    pub stack: Vec<Value>,
    pub pc: usize,
    pub fp: usize,
    pub state: FiberState,
    /// Set once the fiber finishes, so `Coresume`/`Await` on a done fiber
    /// can hand back its last value without re-running anything.
    pub result: Option<Value>,
}

impl Fiber {
    pub fn new(initial_stack: Vec<Value>, entry_pc: usize) -> Self {
        Self {
            stack: initial_stack,
            pc: entry_pc,
            fp: 0,
            state: FiberState::Ready,
            result: None,
        }
    }

    pub fn suspend(&mut self) {
        self.state = FiberState::Suspended;
    }

    pub fn resume(&mut self) {
        self.state = FiberState::Running;
    }

    pub fn finish(&mut self, result: Value) {
        self.state = FiberState::Done;
        self.result = Some(result);
    }

    pub const fn is_resumable(&self) -> bool {
        matches!(self.state, FiberState::Ready | FiberState::Suspended)
    }
}
