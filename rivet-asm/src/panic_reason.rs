use core::fmt;

use strum::EnumIter;

/// Reason a fiber unwound with `RES_CODE_PANIC`.
///
/// Mirrors the shape of `fuel_asm::PanicReason`: a `repr(u8)` enum with a
/// stable wire encoding, left `non_exhaustive` so new reasons can be added
/// without a breaking change, and a hand-written `TryFrom<u8>` rather than
/// a derive, since the two need to stay in lockstep explicitly.
#[repr(u8)]
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum PanicReason {
    /// Placeholder for a value read out of a freed or never-initialized slot.
    Unknown = 0x00,
    /// Integer division or modulo by zero.
    DivideByZero = 0x01,
    /// `IndexTuple`/`IndexList`/`IndexMap`/`SetIndex*` index fell outside bounds.
    OutOfBounds = 0x02,
    /// `Cast`/`CastAbstract` target type id did not match the value's type id.
    CastFail = 0x03,
    /// A static, compiler-supplied panic message (`Panic` with no format args).
    StaticMessage = 0x04,
    /// A formatted panic message built from interpolated arguments.
    FormattedMessage = 0x05,
    /// Value stack growth would exceed the configured limit.
    StackOverflow = 0x06,
    /// An operand expected to carry a pointer tag did not.
    ExpectedPointer = 0x07,
    /// An operand expected to be a closure was some other callable kind.
    ExpectedClosure = 0x08,
    /// An operand expected to be an up-value box was something else.
    ExpectedUpValue = 0x09,
    /// `UnwrapChoice` observed a tag different from the one it expects.
    UnwrapChoiceMismatch = 0x0a,
    /// A dynamically dispatched call found no matching receiver method.
    MissingMethod = 0x0b,
    /// A call's declared arity did not match the callee's.
    ArityMismatch = 0x0c,
    /// A host-provided native function reported failure.
    NativeFailure = 0x0d,
    /// An `Await` observed a future that resolved to an error value.
    AwaitedError = 0x0e,
    /// Fiber resumed after it already returned or panicked.
    FiberAlreadyDone = 0x0f,
}

impl PanicReason {
    /// Decode a wire byte into a reason, falling back to `Unknown` for
    /// values this build does not recognize yet.
    pub const fn from_u8(value: u8) -> Self {
        match value {
            0x00 => Self::Unknown,
            0x01 => Self::DivideByZero,
            0x02 => Self::OutOfBounds,
            0x03 => Self::CastFail,
            0x04 => Self::StaticMessage,
            0x05 => Self::FormattedMessage,
            0x06 => Self::StackOverflow,
            0x07 => Self::ExpectedPointer,
            0x08 => Self::ExpectedClosure,
            0x09 => Self::ExpectedUpValue,
            0x0a => Self::UnwrapChoiceMismatch,
            0x0b => Self::MissingMethod,
            0x0c => Self::ArityMismatch,
            0x0d => Self::NativeFailure,
            0x0e => Self::AwaitedError,
            0x0f => Self::FiberAlreadyDone,
            _ => Self::Unknown,
        }
    }
}

impl From<u8> for PanicReason {
    fn from(value: u8) -> Self {
        Self::from_u8(value)
    }
}

impl From<PanicReason> for u8 {
    fn from(reason: PanicReason) -> Self {
        reason as u8
    }
}

// `Display` defers to `Debug`: these are developer-facing diagnostic
// identifiers, not user-facing prose (the formatted message, if any, is
// carried separately on the panic payload).
impl fmt::Display for PanicReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn round_trips_through_u8() {
        for reason in PanicReason::iter() {
            let byte: u8 = reason.into();
            assert_eq!(PanicReason::from_u8(byte), reason);
        }
    }

    #[test]
    fn unrecognized_byte_decodes_to_unknown() {
        assert_eq!(PanicReason::from_u8(0xff), PanicReason::Unknown);
    }
}
