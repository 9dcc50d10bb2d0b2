//! Integration-style tests exercising whole instruction sequences through
//! [`crate::Vm::eval`], one file per opcode family — the way `fuel-vm`
//! groups its own `src/tests/` by opcode group rather than by module.

mod aggregates;
mod arith;
mod calls;
mod fibers;
mod fields;
mod flow;
mod panics;

use crate::consts::VmLimits;
use crate::host::BasicHost;
use crate::test_helpers::expect_panic_reason;
use crate::Vm;

pub(crate) fn vm() -> Vm<BasicHost> {
    Vm::new(BasicHost::default(), VmLimits::default())
}

pub(crate) use expect_panic_reason as panics_with;
