//! Register identifiers used by instruction operands.

use core::fmt;

/// Identifies a stack slot relative to the current frame pointer.
///
/// Mirrors `fuel_asm::RegId` in spirit: a thin newtype so operand lists
/// read as registers rather than bare bytes.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Reg(u8);

impl Reg {
    pub const fn new(index: u8) -> Self {
        Self(index)
    }

    pub const fn index(self) -> u8 {
        self.0
    }

    pub const fn get(self) -> usize {
        self.0 as usize
    }
}

impl From<u8> for Reg {
    fn from(v: u8) -> Self {
        Self(v)
    }
}

impl From<Reg> for u8 {
    fn from(r: Reg) -> Self {
        r.0
    }
}

impl fmt::Display for Reg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "r{}", self.0)
    }
}
