//! The interpreter: register-based dispatch loop, generic over the
//! embedding [`Host`].
//!
//! Mirrors `fuel_vm::interpreter::Interpreter<S, Tx>` being generic over
//! its storage backend: here the only external dependency the core takes
//! is `H: Host`, the native-function call seam.

mod aggregate;
mod alu;
mod call_protocol;
pub(crate) mod executors;
mod fiber_ops;
mod flow;
mod for_range;
mod ic;

use rivet_asm::PanicReason;

use crate::call::{Chunk, FrameLayout};
use crate::consts::VmLimits;
use crate::error::{PanicPayload, VmError, VmResult};
use crate::fiber::{Fiber, FiberId};
use crate::heap::{Heap, HeapObjectKind, HeapRef};
use crate::host::Host;
use crate::state::ProgramState;
use crate::value::Value;
use for_range::ForRangeTable;
use ic::IcTable;

/// Reserved type id for the heap's `Fiber` payload kind.
pub const FIBER_TYPE_ID: u32 = 11;

/// A single VM instance: one heap, one host, and the chain of fibers
/// currently suspended waiting to be resumed.
pub struct Vm<H: Host> {
    pub heap: Heap,
    pub host: H,
    pub limits: VmLimits,
    /// Storage behind the `StaticVar`/`SetStaticVar` opcodes.
    pub statics: Vec<Value>,
    /// Storage behind the `Context` opcode.
    pub context_vars: Vec<Value>,
    pub(crate) ic: IcTable,
    pub(crate) for_range: ForRangeTable,
    pub(crate) active_fiber: FiberId,
    /// One entry per suspended `Coresume` call: which fiber to switch back
    /// to and which of its registers the eventual `Coyield`/`Coreturn`
    /// value should land in once that happens.
    pub(crate) resume_stack: Vec<(FiberId, rivet_asm::Reg)>,
    /// Instruction offsets installed by `Catch`, most recently installed
    /// last; a panic unwinds to the top entry instead of propagating past
    /// `Vm::eval` when one is present.
    pub(crate) catch_stack: Vec<usize>,
}

impl<H: Host> Vm<H> {
    pub fn new(host: H, limits: VmLimits) -> Self {
        let mut heap = Heap::new(&limits);
        let root = heap.alloc(FIBER_TYPE_ID, false, HeapObjectKind::Fiber(Fiber::new(Vec::new(), 0)));
        Self {
            heap,
            host,
            limits,
            statics: Vec::new(),
            context_vars: Vec::new(),
            ic: IcTable::new(),
            for_range: ForRangeTable::new(),
            active_fiber: FiberId(root),
            resume_stack: Vec::new(),
            catch_stack: Vec::new(),
        }
    }

    /// Run `chunk` starting at `entry_pc` with `args` already placed as the
    /// call's argument list (the four-slot prologue is synthesized here).
    pub fn eval(&mut self, chunk: &Chunk, entry_pc: usize, args: Vec<Value>) -> VmResult<ProgramState> {
        let mut stack = vec![Value::Void; FrameLayout::arg_slot(0)];
        stack.extend(args);
        self.with_active_fiber_mut(|fiber| {
            fiber.stack = stack;
            fiber.pc = entry_pc;
            fiber.fp = 0;
            fiber.resume();
        });
        match executors::instruction::run(self, chunk) {
            Ok(state) => Ok(state),
            Err(VmError::Panic(payload)) => Ok(ProgramState::panicked(payload)),
            Err(VmError::StackOverflow { .. }) => Ok(ProgramState::stack_overflow()),
            Err(other) => Err(other),
        }
    }

    pub(crate) fn fiber_object(&self, id: FiberId) -> &Fiber {
        match &self.heap.get(id.0).expect("fiber heap object must be live").kind {
            HeapObjectKind::Fiber(f) => f,
            _ => unreachable!("FiberId must always reference a Fiber heap object"),
        }
    }

    pub(crate) fn fiber_object_mut(&mut self, id: FiberId) -> &mut Fiber {
        match &mut self.heap.get_mut(id.0).expect("fiber heap object must be live").kind {
            HeapObjectKind::Fiber(f) => f,
            _ => unreachable!("FiberId must always reference a Fiber heap object"),
        }
    }

    pub(crate) fn with_active_fiber_mut<R>(&mut self, f: impl FnOnce(&mut Fiber) -> R) -> R {
        let active = self.active_fiber;
        f(self.fiber_object_mut(active))
    }

    pub(crate) fn current_pc(&self) -> usize {
        self.fiber_object(self.active_fiber).pc
    }

    pub(crate) fn set_pc(&mut self, pc: usize) {
        self.with_active_fiber_mut(|f| f.pc = pc);
    }

    pub(crate) fn current_fp(&self) -> usize {
        self.fiber_object(self.active_fiber).fp
    }

    pub(crate) fn reg(&self, r: rivet_asm::Reg) -> Value {
        let fiber = self.fiber_object(self.active_fiber);
        fiber.stack[fiber.fp + r.get()]
    }

    pub(crate) fn set_reg(&mut self, r: rivet_asm::Reg, value: Value) {
        let fp = self.current_fp();
        self.with_active_fiber_mut(|fiber| {
            if fiber.fp + r.get() >= fiber.stack.len() {
                fiber.stack.resize(fiber.fp + r.get() + 1, Value::Void);
            }
            fiber.stack[fp + r.get()] = value;
        });
    }

    pub(crate) fn retain(&mut self, value: Value) {
        crate::rc::retain(&mut self.heap, value);
    }

    pub(crate) fn release(&mut self, value: Value) {
        crate::rc::release(&mut self.heap, value);
    }

    pub(crate) fn panic(&self, reason: PanicReason, message: impl Into<String>) -> VmError {
        VmError::Panic(PanicPayload::new(reason, message))
    }

    pub(crate) fn check_stack_growth(&self, needed: usize) -> VmResult<()> {
        if needed > self.limits.max_stack_slots {
            return Err(VmError::StackOverflow { limit: self.limits.max_stack_slots });
        }
        Ok(())
    }
}
