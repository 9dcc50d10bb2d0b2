//! Inline cache state.
//!
//! The packed instruction encoding reserves cache bytes directly inside an
//! IC opcode's own operand layout (`cache_type_id`/`cache_offset` on
//! `FieldIC`, `cache_type_id`/`cache_func` on the `Call*IC` family) so a
//! from-scratch bytecode format could self-rewrite those bytes in place.
//! This crate keeps `Chunk` immutable instead and records the same
//! information in a side table keyed by call-site `pc`, which gets the
//! identical observable behavior — a cold site falls through to the slow
//! path and installs what it saw, a warm site checks the recorded type id
//! and deoptimizes by evicting the entry when it no longer matches —
//! without `unsafe` self-modifying bytecode.

use std::collections::HashMap;

/// What a field or call inline cache remembers about the last receiver it
/// saw.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IcEntry {
    Field { type_id: u32, field_offset: u16 },
    Call { type_id: u32, func_id: u16 },
}

/// Per-`Vm` inline cache storage, one slot per call-site `pc`.
#[derive(Debug, Default)]
pub struct IcTable {
    entries: HashMap<usize, IcEntry>,
}

impl IcTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, pc: usize) -> Option<IcEntry> {
        self.entries.get(&pc).copied()
    }

    pub fn install(&mut self, pc: usize, entry: IcEntry) {
        self.entries.insert(pc, entry);
    }

    /// Evict a site's cache entry, as if a hot field/call had deoptimized
    /// because the observed receiver type no longer matches what is cached.
    pub fn deopt(&mut self, pc: usize) {
        if self.entries.remove(&pc).is_some() {
            tracing::debug!(pc, "inline cache deoptimized");
        }
    }
}
