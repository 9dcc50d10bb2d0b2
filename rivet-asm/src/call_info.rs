//! Packing/unpacking for the call-info word stored in a callee's frame
//! prologue (the second of the four prologue slots).
//!
//! Bit layout, least-significant bit first:
//! `return-flag:1 | inst-length:7 | numLocals:8 | ret-type-id:31 | box-flag:1 | reserved:16`

const RETURN_FLAG_SHIFT: u32 = 0;
const INST_LENGTH_SHIFT: u32 = 1;
const NUM_LOCALS_SHIFT: u32 = 8;
const RET_TYPE_ID_SHIFT: u32 = 16;
const BOX_FLAG_SHIFT: u32 = 47;

const INST_LENGTH_MASK: u64 = 0x7f;
const NUM_LOCALS_MASK: u64 = 0xff;
const RET_TYPE_ID_MASK: u64 = 0x7fff_ffff;

/// Decoded contents of a call-info word.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CallInfo {
    /// Whether the callee produces a value the caller expects at the return slot.
    pub returns_value: bool,
    /// Length, in instruction words, of the call site's own instruction
    /// (needed to resume the caller's `pc` past any inline cache bytes).
    pub inst_length: u8,
    /// Number of local register slots the callee's frame reserves.
    pub num_locals: u8,
    /// Static type id of the callee's return value, for box/unbox decisions.
    pub ret_type_id: u32,
    /// Whether the return value must be boxed (heap-allocated) before storing.
    pub box_flag: bool,
}

impl CallInfo {
    pub fn pack(self) -> u64 {
        debug_assert!(self.inst_length as u64 <= INST_LENGTH_MASK);
        debug_assert!(self.ret_type_id as u64 <= RET_TYPE_ID_MASK);
        let mut word = 0u64;
        word |= (self.returns_value as u64) << RETURN_FLAG_SHIFT;
        word |= ((self.inst_length as u64) & INST_LENGTH_MASK) << INST_LENGTH_SHIFT;
        word |= ((self.num_locals as u64) & NUM_LOCALS_MASK) << NUM_LOCALS_SHIFT;
        word |= ((self.ret_type_id as u64) & RET_TYPE_ID_MASK) << RET_TYPE_ID_SHIFT;
        word |= (self.box_flag as u64) << BOX_FLAG_SHIFT;
        word
    }

    pub fn unpack(word: u64) -> Self {
        Self {
            returns_value: (word >> RETURN_FLAG_SHIFT) & 1 != 0,
            inst_length: ((word >> INST_LENGTH_SHIFT) & INST_LENGTH_MASK) as u8,
            num_locals: ((word >> NUM_LOCALS_SHIFT) & NUM_LOCALS_MASK) as u8,
            ret_type_id: ((word >> RET_TYPE_ID_SHIFT) & RET_TYPE_ID_MASK) as u32,
            box_flag: (word >> BOX_FLAG_SHIFT) & 1 != 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_u64() {
        let info = CallInfo {
            returns_value: true,
            inst_length: 9,
            num_locals: 200,
            ret_type_id: 123_456,
            box_flag: true,
        };
        assert_eq!(CallInfo::unpack(info.pack()), info);
    }

    #[test]
    fn fields_do_not_bleed_into_neighbors() {
        let info = CallInfo {
            returns_value: false,
            inst_length: 0x7f,
            num_locals: 0xff,
            ret_type_id: 0x7fff_ffff,
            box_flag: false,
        };
        let word = info.pack();
        assert_eq!(word >> 63, 0, "reserved high bit must stay clear");
        assert_eq!(CallInfo::unpack(word), info);
    }
}
