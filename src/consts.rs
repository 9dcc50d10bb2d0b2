//! VM tuning parameters and host-configurable limits.

/// Number of addressable value-stack slots per fiber frame allocation unit.
/// Kept a power of two so growth doubling lands on round numbers.
pub const VM_STACK_CHUNK: usize = 256;

/// Width, in slots, of a call frame's fixed prologue: `[return][call-info]
/// [saved-pc][saved-fp]`. Arguments begin immediately after it.
pub const CALL_ARG_START: usize = 4;

/// The callee's own first argument slot coincides with `CALL_ARG_START`;
/// named separately because call-protocol code reads it as "the receiver
/// slot" rather than "argument zero".
pub const CALLEE_START: usize = CALL_ARG_START;

/// Tunable knobs a host supplies when constructing a [`crate::Vm`].
///
/// Mirrors the role `fuel-vm`'s `consts.rs` constants play, but threaded
/// through as a value instead of global constants, since an embedding host
/// may run multiple VMs with different limits in one process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct VmLimits {
    /// Maximum number of value-stack slots a single fiber may grow to
    /// before `Call`/`CallSym`/... raise `StackOverflow`.
    pub max_stack_slots: usize,
    /// Number of fixed-shape object slots reserved in the heap's pool
    /// region before falling back to the external (`Vec`-backed) region.
    pub pool_slot_count: usize,
    /// Byte size of each pool slot; objects whose inline payload exceeds
    /// this go straight to the external region.
    pub pool_slot_size: usize,
}

impl Default for VmLimits {
    fn default() -> Self {
        Self {
            max_stack_slots: 64 * 1024,
            pool_slot_count: 4096,
            pool_slot_size: 64,
        }
    }
}

static_assertions::const_assert!(CALL_ARG_START >= 1);
