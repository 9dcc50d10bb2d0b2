//! Side table behind the `ForRangeInit`/`ForRange` self-rewrite.
//!
//! Mirrors [`super::ic::IcTable`]: rather than literally overwriting the
//! opcode byte at the loop footer's `pc` (the `Chunk` bytes are shared, not
//! owned per-fiber), `ForRangeInit` records which direction this loop steps
//! in here, keyed by the footer's `pc`, and `ForRange` consults it instead
//! of always stepping forward.

use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForRangeDirection {
    Forward,
    Reverse,
}

#[derive(Debug, Default)]
pub struct ForRangeTable {
    entries: HashMap<usize, ForRangeDirection>,
}

impl ForRangeTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, pc: usize) -> Option<ForRangeDirection> {
        self.entries.get(&pc).copied()
    }

    pub fn install(&mut self, pc: usize, direction: ForRangeDirection) {
        self.entries.insert(pc, direction);
    }
}
