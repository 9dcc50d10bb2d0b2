//! Instruction encoding for the Rivet VM.
//!
//! This crate owns the wire format only: opcode bytes, operand layouts, the
//! call-info word, and panic reason codes. It has no notion of a running
//! interpreter, a value, or a heap — those live in the `rivet-vm` crate,
//! which depends on this one the way `fuel-vm` depends on `fuel-asm`.

#![deny(unsafe_code)]
#![deny(unused_crate_dependencies)]

pub mod call_info;
pub mod instruction;
mod macros;
pub mod op;
pub mod panic_reason;
pub mod reg;

pub use call_info::CallInfo;
pub use instruction::{DecodeError, Instruction, Opcode};
pub use panic_reason::PanicReason;
pub use reg::Reg;
