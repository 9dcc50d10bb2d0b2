//! The opcode byte, the `Instruction` sum type, and the top-level decoder.

use crate::op;

/// One byte identifying an opcode. Stable wire values: appending new opcodes
/// must only ever add new discriminants at the end.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Opcode {
    AddInt,
    SubInt,
    MulInt,
    DivInt,
    ModInt,
    PowInt,
    AddFloat,
    SubFloat,
    MulFloat,
    DivFloat,
    PowFloat,
    BitwiseAnd,
    BitwiseOr,
    BitwiseXor,
    BitwiseLeftShift,
    BitwiseRightShift,
    CompareEq,
    CompareNeq,
    CompareLess,
    CompareGreater,
    CompareLessEqual,
    CompareGreaterEqual,
    NegInt,
    NegFloat,
    Not,
    Copy,
    ConstTrue,
    ConstFalse,
    ConstNone,
    ConstI8,
    ConstOp,
    Jump,
    JumpCond,
    JumpNotCond,
    Retain,
    Release,
    ReleaseN,
    IndexTuple,
    IndexList,
    SetIndexList,
    IndexMap,
    SetIndexMap,
    SliceList,
    Field,
    FieldIC,
    FieldDyn,
    FieldDynIC,
    SetField,
    SetFieldIC,
    SetFieldDyn,
    SetFieldDynIC,
    FieldStruct,
    TypeCheck,
    TypeCheckOption,
    Cast,
    CastAbstract,
    CallSym,
    CallSymIC,
    CallObjSym,
    CallObjSymIC,
    CallTrait,
    CallSymDyn,
    Call,
    CallObjFuncIC,
    CallNativeFuncIC,
    CallObjNativeFuncIC,
    Ret0,
    Ret1,
    RetDyn,
    ObjectSmall,
    Object,
    Struct,
    StructSmall,
    Trait,
    Box,
    Unbox,
    Lambda,
    Closure,
    AddrLocal,
    AddrConstIndex,
    AddrIndex,
    Deref,
    DerefStruct,
    SetDeref,
    SetDerefStruct,
    Up,
    UpValue,
    SetUpValue,
    Captured,
    SetCaptured,
    TagLit,
    Enum,
    Symbol,
    FuncPtr,
    FuncUnion,
    FuncSym,
    StaticVar,
    SetStaticVar,
    Context,
    Type,
    StringTemplate,
    Coinit,
    Coyield,
    Coresume,
    Coreturn,
    Await,
    FutureValue,
    Panic,
    PanicFmt,
    Catch,
    Throw,
    UnwrapChoice,
    End,
    Compare,
    CompareNot,
    ForRangeInit,
    ForRange,
    ForRangeReverse,
    Match,
    AppendList,
    ListDyn,
    List,
    Array,
    Tuple,
    Map,
}

/// Error returned for an opcode byte with no registered meaning, or a
/// truncated operand buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_more::Display)]
pub enum DecodeError {
    #[display(fmt = "unrecognized opcode byte {_0:#04x}")]
    InvalidOpcode(u8),
    #[display(fmt = "instruction truncated: need at least {need} bytes, have {have}")]
    Truncated { need: usize, have: usize },
}

impl std::error::Error for DecodeError {}

impl TryFrom<u8> for Opcode {
    type Error = DecodeError;

    fn try_from(byte: u8) -> Result<Self, Self::Error> {
        // SAFETY net: bounds-checked against the real variant count rather
        // than transmuted, since new opcodes are appended over time.
        const COUNT: u8 = Opcode::Map as u8 + 1;
        if byte >= COUNT {
            return Err(DecodeError::InvalidOpcode(byte));
        }
        // The enum has no data and is `repr(u8)` with implicit sequential
        // discriminants matching declaration order, so a match table is the
        // straightforward, review-friendly way to invert it.
        Ok(OPCODE_TABLE[byte as usize])
    }
}

macro_rules! opcode_table {
    ($($variant:ident),* $(,)?) => {
        [$(Opcode::$variant),*]
    };
}

const OPCODE_TABLE: [Opcode; Opcode::Map as usize + 1] = opcode_table![
    AddInt, SubInt, MulInt, DivInt, ModInt, PowInt, AddFloat, SubFloat, MulFloat, DivFloat,
    PowFloat, BitwiseAnd, BitwiseOr, BitwiseXor, BitwiseLeftShift, BitwiseRightShift, CompareEq,
    CompareNeq, CompareLess, CompareGreater, CompareLessEqual, CompareGreaterEqual, NegInt,
    NegFloat, Not, Copy, ConstTrue, ConstFalse, ConstNone, ConstI8, ConstOp, Jump, JumpCond,
    JumpNotCond, Retain, Release, ReleaseN, IndexTuple, IndexList, SetIndexList, IndexMap,
    SetIndexMap, SliceList, Field, FieldIC, FieldDyn, FieldDynIC, SetField, SetFieldIC,
    SetFieldDyn, SetFieldDynIC, FieldStruct, TypeCheck, TypeCheckOption, Cast, CastAbstract,
    CallSym, CallSymIC, CallObjSym, CallObjSymIC, CallTrait, CallSymDyn, Call, CallObjFuncIC,
    CallNativeFuncIC, CallObjNativeFuncIC, Ret0, Ret1, RetDyn, ObjectSmall, Object, Struct,
    StructSmall, Trait, Box, Unbox, Lambda, Closure, AddrLocal, AddrConstIndex, AddrIndex, Deref,
    DerefStruct, SetDeref, SetDerefStruct, Up, UpValue, SetUpValue, Captured, SetCaptured, TagLit,
    Enum, Symbol, FuncPtr, FuncUnion, FuncSym, StaticVar, SetStaticVar, Context, Type,
    StringTemplate, Coinit, Coyield, Coresume, Coreturn, Await, FutureValue, Panic, PanicFmt,
    Catch, Throw, UnwrapChoice, End, Compare, CompareNot, ForRangeInit, ForRange, ForRangeReverse,
    Match, AppendList, ListDyn, List, Array, Tuple, Map,
];

/// Decoded instruction, one variant per opcode, each wrapping its `op::*` struct.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Instruction {
    AddInt(op::AddInt),
    SubInt(op::SubInt),
    MulInt(op::MulInt),
    DivInt(op::DivInt),
    ModInt(op::ModInt),
    PowInt(op::PowInt),
    AddFloat(op::AddFloat),
    SubFloat(op::SubFloat),
    MulFloat(op::MulFloat),
    DivFloat(op::DivFloat),
    PowFloat(op::PowFloat),
    BitwiseAnd(op::BitwiseAnd),
    BitwiseOr(op::BitwiseOr),
    BitwiseXor(op::BitwiseXor),
    BitwiseLeftShift(op::BitwiseLeftShift),
    BitwiseRightShift(op::BitwiseRightShift),
    CompareEq(op::CompareEq),
    CompareNeq(op::CompareNeq),
    CompareLess(op::CompareLess),
    CompareGreater(op::CompareGreater),
    CompareLessEqual(op::CompareLessEqual),
    CompareGreaterEqual(op::CompareGreaterEqual),
    NegInt(op::NegInt),
    NegFloat(op::NegFloat),
    Not(op::Not),
    Copy(op::Copy),
    ConstTrue(op::ConstTrue),
    ConstFalse(op::ConstFalse),
    ConstNone(op::ConstNone),
    ConstI8(op::ConstI8),
    ConstOp(op::ConstOp),
    Jump(op::Jump),
    JumpCond(op::JumpCond),
    JumpNotCond(op::JumpNotCond),
    Retain(op::Retain),
    Release(op::Release),
    ReleaseN(op::ReleaseN),
    IndexTuple(op::IndexTuple),
    IndexList(op::IndexList),
    SetIndexList(op::SetIndexList),
    IndexMap(op::IndexMap),
    SetIndexMap(op::SetIndexMap),
    SliceList(op::SliceList),
    Field(op::Field),
    FieldIC(op::FieldIC),
    FieldDyn(op::FieldDyn),
    FieldDynIC(op::FieldDynIC),
    SetField(op::SetField),
    SetFieldIC(op::SetFieldIC),
    SetFieldDyn(op::SetFieldDyn),
    SetFieldDynIC(op::SetFieldDynIC),
    FieldStruct(op::FieldStruct),
    TypeCheck(op::TypeCheck),
    TypeCheckOption(op::TypeCheckOption),
    Cast(op::Cast),
    CastAbstract(op::CastAbstract),
    CallSym(op::CallSym),
    CallSymIC(op::CallSymIC),
    CallObjSym(op::CallObjSym),
    CallObjSymIC(op::CallObjSymIC),
    CallTrait(op::CallTrait),
    CallSymDyn(op::CallSymDyn),
    Call(op::Call),
    CallObjFuncIC(op::CallObjFuncIC),
    CallNativeFuncIC(op::CallNativeFuncIC),
    CallObjNativeFuncIC(op::CallObjNativeFuncIC),
    Ret0(op::Ret0),
    Ret1(op::Ret1),
    RetDyn(op::RetDyn),
    ObjectSmall(op::ObjectSmall),
    Object(op::Object),
    Struct(op::Struct),
    StructSmall(op::StructSmall),
    Trait(op::Trait),
    Box(op::Box),
    Unbox(op::Unbox),
    Lambda(op::Lambda),
    Closure(op::Closure),
    AddrLocal(op::AddrLocal),
    AddrConstIndex(op::AddrConstIndex),
    AddrIndex(op::AddrIndex),
    Deref(op::Deref),
    DerefStruct(op::DerefStruct),
    SetDeref(op::SetDeref),
    SetDerefStruct(op::SetDerefStruct),
    Up(op::Up),
    UpValue(op::UpValue),
    SetUpValue(op::SetUpValue),
    Captured(op::Captured),
    SetCaptured(op::SetCaptured),
    TagLit(op::TagLit),
    Enum(op::Enum),
    Symbol(op::Symbol),
    FuncPtr(op::FuncPtr),
    FuncUnion(op::FuncUnion),
    FuncSym(op::FuncSym),
    StaticVar(op::StaticVar),
    SetStaticVar(op::SetStaticVar),
    Context(op::Context),
    Type(op::Type),
    StringTemplate(op::StringTemplate),
    Coinit(op::Coinit),
    Coyield(op::Coyield),
    Coresume(op::Coresume),
    Coreturn(op::Coreturn),
    Await(op::Await),
    FutureValue(op::FutureValue),
    Panic(op::Panic),
    PanicFmt(op::PanicFmt),
    Catch(op::Catch),
    Throw(op::Throw),
    UnwrapChoice(op::UnwrapChoice),
    End(op::End),
    Compare(op::Compare),
    CompareNot(op::CompareNot),
    ForRangeInit(op::ForRangeInit),
    ForRange(op::ForRange),
    ForRangeReverse(op::ForRangeReverse),
    Match(op::Match),
    AppendList(op::AppendList),
    ListDyn(op::ListDyn),
    List(op::List),
    Array(op::Array),
    Tuple(op::Tuple),
    Map(op::Map),
}

impl Instruction {
    /// Decode one instruction starting at `bytes[0]` (the opcode byte).
    /// Returns the instruction and the total number of bytes it occupies,
    /// including the opcode byte.
    pub fn decode(bytes: &[u8]) -> Result<(Self, usize), DecodeError> {
        let Some(&opcode_byte) = bytes.first() else {
            return Err(DecodeError::Truncated { need: 1, have: 0 });
        };
        let opcode = Opcode::try_from(opcode_byte)?;
        let body = &bytes[1..];

        macro_rules! fixed {
            ($variant:ident) => {{
                let need = op::$variant::LEN;
                if body.len() < need {
                    return Err(DecodeError::Truncated { need: need + 1, have: bytes.len() });
                }
                (Instruction::$variant(op::$variant::decode(body)), 1 + need)
            }};
        }
        macro_rules! varlen {
            ($variant:ident) => {{
                let decoded = op::$variant::decode(body);
                let total = 1 + decoded.len();
                (Instruction::$variant(decoded), total)
            }};
        }

        let result = match opcode {
            Opcode::AddInt => fixed!(AddInt),
            Opcode::SubInt => fixed!(SubInt),
            Opcode::MulInt => fixed!(MulInt),
            Opcode::DivInt => fixed!(DivInt),
            Opcode::ModInt => fixed!(ModInt),
            Opcode::PowInt => fixed!(PowInt),
            Opcode::AddFloat => fixed!(AddFloat),
            Opcode::SubFloat => fixed!(SubFloat),
            Opcode::MulFloat => fixed!(MulFloat),
            Opcode::DivFloat => fixed!(DivFloat),
            Opcode::PowFloat => fixed!(PowFloat),
            Opcode::BitwiseAnd => fixed!(BitwiseAnd),
            Opcode::BitwiseOr => fixed!(BitwiseOr),
            Opcode::BitwiseXor => fixed!(BitwiseXor),
            Opcode::BitwiseLeftShift => fixed!(BitwiseLeftShift),
            Opcode::BitwiseRightShift => fixed!(BitwiseRightShift),
            Opcode::CompareEq => fixed!(CompareEq),
            Opcode::CompareNeq => fixed!(CompareNeq),
            Opcode::CompareLess => fixed!(CompareLess),
            Opcode::CompareGreater => fixed!(CompareGreater),
            Opcode::CompareLessEqual => fixed!(CompareLessEqual),
            Opcode::CompareGreaterEqual => fixed!(CompareGreaterEqual),
            Opcode::NegInt => fixed!(NegInt),
            Opcode::NegFloat => fixed!(NegFloat),
            Opcode::Not => fixed!(Not),
            Opcode::Copy => fixed!(Copy),
            Opcode::ConstTrue => fixed!(ConstTrue),
            Opcode::ConstFalse => fixed!(ConstFalse),
            Opcode::ConstNone => fixed!(ConstNone),
            Opcode::ConstI8 => fixed!(ConstI8),
            Opcode::ConstOp => fixed!(ConstOp),
            Opcode::Jump => fixed!(Jump),
            Opcode::JumpCond => fixed!(JumpCond),
            Opcode::JumpNotCond => fixed!(JumpNotCond),
            Opcode::Retain => fixed!(Retain),
            Opcode::Release => fixed!(Release),
            Opcode::ReleaseN => varlen!(ReleaseN),
            Opcode::IndexTuple => fixed!(IndexTuple),
            Opcode::IndexList => fixed!(IndexList),
            Opcode::SetIndexList => fixed!(SetIndexList),
            Opcode::IndexMap => fixed!(IndexMap),
            Opcode::SetIndexMap => fixed!(SetIndexMap),
            Opcode::SliceList => fixed!(SliceList),
            Opcode::Field => fixed!(Field),
            Opcode::FieldIC => fixed!(FieldIC),
            Opcode::FieldDyn => fixed!(FieldDyn),
            Opcode::FieldDynIC => fixed!(FieldDynIC),
            Opcode::SetField => fixed!(SetField),
            Opcode::SetFieldIC => fixed!(SetFieldIC),
            Opcode::SetFieldDyn => fixed!(SetFieldDyn),
            Opcode::SetFieldDynIC => fixed!(SetFieldDynIC),
            Opcode::FieldStruct => fixed!(FieldStruct),
            Opcode::TypeCheck => fixed!(TypeCheck),
            Opcode::TypeCheckOption => fixed!(TypeCheckOption),
            Opcode::Cast => fixed!(Cast),
            Opcode::CastAbstract => fixed!(CastAbstract),
            Opcode::CallSym => fixed!(CallSym),
            Opcode::CallSymIC => fixed!(CallSymIC),
            Opcode::CallObjSym => fixed!(CallObjSym),
            Opcode::CallObjSymIC => fixed!(CallObjSymIC),
            Opcode::CallTrait => fixed!(CallTrait),
            Opcode::CallSymDyn => fixed!(CallSymDyn),
            Opcode::Call => fixed!(Call),
            Opcode::CallObjFuncIC => fixed!(CallObjFuncIC),
            Opcode::CallNativeFuncIC => fixed!(CallNativeFuncIC),
            Opcode::CallObjNativeFuncIC => fixed!(CallObjNativeFuncIC),
            Opcode::Ret0 => fixed!(Ret0),
            Opcode::Ret1 => fixed!(Ret1),
            Opcode::RetDyn => fixed!(RetDyn),
            Opcode::ObjectSmall => fixed!(ObjectSmall),
            Opcode::Object => fixed!(Object),
            Opcode::Struct => varlen!(Struct),
            Opcode::StructSmall => varlen!(StructSmall),
            Opcode::Trait => fixed!(Trait),
            Opcode::Box => fixed!(Box),
            Opcode::Unbox => fixed!(Unbox),
            Opcode::Lambda => fixed!(Lambda),
            Opcode::Closure => varlen!(Closure),
            Opcode::AddrLocal => fixed!(AddrLocal),
            Opcode::AddrConstIndex => fixed!(AddrConstIndex),
            Opcode::AddrIndex => fixed!(AddrIndex),
            Opcode::Deref => fixed!(Deref),
            Opcode::DerefStruct => {
                let need = op::DerefStruct::LEN;
                if body.len() < need {
                    return Err(DecodeError::Truncated { need: need + 1, have: bytes.len() });
                }
                (Instruction::DerefStruct(op::DerefStruct::decode(body)), 1 + need)
            }
            Opcode::SetDeref => fixed!(SetDeref),
            Opcode::SetDerefStruct => fixed!(SetDerefStruct),
            Opcode::Up => fixed!(Up),
            Opcode::UpValue => fixed!(UpValue),
            Opcode::SetUpValue => fixed!(SetUpValue),
            Opcode::Captured => fixed!(Captured),
            Opcode::SetCaptured => fixed!(SetCaptured),
            Opcode::TagLit => fixed!(TagLit),
            Opcode::Enum => fixed!(Enum),
            Opcode::Symbol => fixed!(Symbol),
            Opcode::FuncPtr => fixed!(FuncPtr),
            Opcode::FuncUnion => fixed!(FuncUnion),
            Opcode::FuncSym => fixed!(FuncSym),
            Opcode::StaticVar => fixed!(StaticVar),
            Opcode::SetStaticVar => fixed!(SetStaticVar),
            Opcode::Context => fixed!(Context),
            Opcode::Type => fixed!(Type),
            Opcode::StringTemplate => varlen!(StringTemplate),
            Opcode::Coinit => fixed!(Coinit),
            Opcode::Coyield => fixed!(Coyield),
            Opcode::Coresume => fixed!(Coresume),
            Opcode::Coreturn => fixed!(Coreturn),
            Opcode::Await => fixed!(Await),
            Opcode::FutureValue => fixed!(FutureValue),
            Opcode::Panic => fixed!(Panic),
            Opcode::PanicFmt => fixed!(PanicFmt),
            Opcode::Catch => fixed!(Catch),
            Opcode::Throw => fixed!(Throw),
            Opcode::UnwrapChoice => fixed!(UnwrapChoice),
            Opcode::End => fixed!(End),
            Opcode::Compare => fixed!(Compare),
            Opcode::CompareNot => fixed!(CompareNot),
            Opcode::ForRangeInit => fixed!(ForRangeInit),
            Opcode::ForRange => fixed!(ForRange),
            Opcode::ForRangeReverse => fixed!(ForRangeReverse),
            Opcode::Match => varlen!(Match),
            Opcode::AppendList => fixed!(AppendList),
            Opcode::ListDyn => fixed!(ListDyn),
            Opcode::List => fixed!(List),
            Opcode::Array => fixed!(Array),
            Opcode::Tuple => fixed!(Tuple),
            Opcode::Map => fixed!(Map),
        };
        Ok(result)
    }

    /// Append this instruction's wire encoding (opcode byte + operands) to `buf`.
    pub fn encode(&self, buf: &mut Vec<u8>) {
        macro_rules! emit {
            ($opcode:expr, $inner:expr) => {{
                buf.push($opcode as u8);
                $inner.encode(buf);
            }};
        }
        match self {
            Instruction::AddInt(i) => emit!(Opcode::AddInt, i),
            Instruction::SubInt(i) => emit!(Opcode::SubInt, i),
            Instruction::MulInt(i) => emit!(Opcode::MulInt, i),
            Instruction::DivInt(i) => emit!(Opcode::DivInt, i),
            Instruction::ModInt(i) => emit!(Opcode::ModInt, i),
            Instruction::PowInt(i) => emit!(Opcode::PowInt, i),
            Instruction::AddFloat(i) => emit!(Opcode::AddFloat, i),
            Instruction::SubFloat(i) => emit!(Opcode::SubFloat, i),
            Instruction::MulFloat(i) => emit!(Opcode::MulFloat, i),
            Instruction::DivFloat(i) => emit!(Opcode::DivFloat, i),
            Instruction::PowFloat(i) => emit!(Opcode::PowFloat, i),
            Instruction::BitwiseAnd(i) => emit!(Opcode::BitwiseAnd, i),
            Instruction::BitwiseOr(i) => emit!(Opcode::BitwiseOr, i),
            Instruction::BitwiseXor(i) => emit!(Opcode::BitwiseXor, i),
            Instruction::BitwiseLeftShift(i) => emit!(Opcode::BitwiseLeftShift, i),
            Instruction::BitwiseRightShift(i) => emit!(Opcode::BitwiseRightShift, i),
            Instruction::CompareEq(i) => emit!(Opcode::CompareEq, i),
            Instruction::CompareNeq(i) => emit!(Opcode::CompareNeq, i),
            Instruction::CompareLess(i) => emit!(Opcode::CompareLess, i),
            Instruction::CompareGreater(i) => emit!(Opcode::CompareGreater, i),
            Instruction::CompareLessEqual(i) => emit!(Opcode::CompareLessEqual, i),
            Instruction::CompareGreaterEqual(i) => emit!(Opcode::CompareGreaterEqual, i),
            Instruction::NegInt(i) => emit!(Opcode::NegInt, i),
            Instruction::NegFloat(i) => emit!(Opcode::NegFloat, i),
            Instruction::Not(i) => emit!(Opcode::Not, i),
            Instruction::Copy(i) => emit!(Opcode::Copy, i),
            Instruction::ConstTrue(i) => emit!(Opcode::ConstTrue, i),
            Instruction::ConstFalse(i) => emit!(Opcode::ConstFalse, i),
            Instruction::ConstNone(i) => emit!(Opcode::ConstNone, i),
            Instruction::ConstI8(i) => emit!(Opcode::ConstI8, i),
            Instruction::ConstOp(i) => emit!(Opcode::ConstOp, i),
            Instruction::Jump(i) => emit!(Opcode::Jump, i),
            Instruction::JumpCond(i) => emit!(Opcode::JumpCond, i),
            Instruction::JumpNotCond(i) => emit!(Opcode::JumpNotCond, i),
            Instruction::Retain(i) => emit!(Opcode::Retain, i),
            Instruction::Release(i) => emit!(Opcode::Release, i),
            Instruction::ReleaseN(i) => emit!(Opcode::ReleaseN, i),
            Instruction::IndexTuple(i) => emit!(Opcode::IndexTuple, i),
            Instruction::IndexList(i) => emit!(Opcode::IndexList, i),
            Instruction::SetIndexList(i) => emit!(Opcode::SetIndexList, i),
            Instruction::IndexMap(i) => emit!(Opcode::IndexMap, i),
            Instruction::SetIndexMap(i) => emit!(Opcode::SetIndexMap, i),
            Instruction::SliceList(i) => emit!(Opcode::SliceList, i),
            Instruction::Field(i) => emit!(Opcode::Field, i),
            Instruction::FieldIC(i) => emit!(Opcode::FieldIC, i),
            Instruction::FieldDyn(i) => emit!(Opcode::FieldDyn, i),
            Instruction::FieldDynIC(i) => emit!(Opcode::FieldDynIC, i),
            Instruction::SetField(i) => emit!(Opcode::SetField, i),
            Instruction::SetFieldIC(i) => emit!(Opcode::SetFieldIC, i),
            Instruction::SetFieldDyn(i) => emit!(Opcode::SetFieldDyn, i),
            Instruction::SetFieldDynIC(i) => emit!(Opcode::SetFieldDynIC, i),
            Instruction::FieldStruct(i) => emit!(Opcode::FieldStruct, i),
            Instruction::TypeCheck(i) => emit!(Opcode::TypeCheck, i),
            Instruction::TypeCheckOption(i) => emit!(Opcode::TypeCheckOption, i),
            Instruction::Cast(i) => emit!(Opcode::Cast, i),
            Instruction::CastAbstract(i) => emit!(Opcode::CastAbstract, i),
            Instruction::CallSym(i) => emit!(Opcode::CallSym, i),
            Instruction::CallSymIC(i) => emit!(Opcode::CallSymIC, i),
            Instruction::CallObjSym(i) => emit!(Opcode::CallObjSym, i),
            Instruction::CallObjSymIC(i) => emit!(Opcode::CallObjSymIC, i),
            Instruction::CallTrait(i) => emit!(Opcode::CallTrait, i),
            Instruction::CallSymDyn(i) => emit!(Opcode::CallSymDyn, i),
            Instruction::Call(i) => emit!(Opcode::Call, i),
            Instruction::CallObjFuncIC(i) => emit!(Opcode::CallObjFuncIC, i),
            Instruction::CallNativeFuncIC(i) => emit!(Opcode::CallNativeFuncIC, i),
            Instruction::CallObjNativeFuncIC(i) => emit!(Opcode::CallObjNativeFuncIC, i),
            Instruction::Ret0(i) => emit!(Opcode::Ret0, i),
            Instruction::Ret1(i) => emit!(Opcode::Ret1, i),
            Instruction::RetDyn(i) => emit!(Opcode::RetDyn, i),
            Instruction::ObjectSmall(i) => emit!(Opcode::ObjectSmall, i),
            Instruction::Object(i) => emit!(Opcode::Object, i),
            Instruction::Struct(i) => emit!(Opcode::Struct, i),
            Instruction::StructSmall(i) => emit!(Opcode::StructSmall, i),
            Instruction::Trait(i) => emit!(Opcode::Trait, i),
            Instruction::Box(i) => emit!(Opcode::Box, i),
            Instruction::Unbox(i) => emit!(Opcode::Unbox, i),
            Instruction::Lambda(i) => emit!(Opcode::Lambda, i),
            Instruction::Closure(i) => emit!(Opcode::Closure, i),
            Instruction::AddrLocal(i) => emit!(Opcode::AddrLocal, i),
            Instruction::AddrConstIndex(i) => emit!(Opcode::AddrConstIndex, i),
            Instruction::AddrIndex(i) => emit!(Opcode::AddrIndex, i),
            Instruction::Deref(i) => emit!(Opcode::Deref, i),
            Instruction::DerefStruct(i) => emit!(Opcode::DerefStruct, i),
            Instruction::SetDeref(i) => emit!(Opcode::SetDeref, i),
            Instruction::SetDerefStruct(i) => emit!(Opcode::SetDerefStruct, i),
            Instruction::Up(i) => emit!(Opcode::Up, i),
            Instruction::UpValue(i) => emit!(Opcode::UpValue, i),
            Instruction::SetUpValue(i) => emit!(Opcode::SetUpValue, i),
            Instruction::Captured(i) => emit!(Opcode::Captured, i),
            Instruction::SetCaptured(i) => emit!(Opcode::SetCaptured, i),
            Instruction::TagLit(i) => emit!(Opcode::TagLit, i),
            Instruction::Enum(i) => emit!(Opcode::Enum, i),
            Instruction::Symbol(i) => emit!(Opcode::Symbol, i),
            Instruction::FuncPtr(i) => emit!(Opcode::FuncPtr, i),
            Instruction::FuncUnion(i) => emit!(Opcode::FuncUnion, i),
            Instruction::FuncSym(i) => emit!(Opcode::FuncSym, i),
            Instruction::StaticVar(i) => emit!(Opcode::StaticVar, i),
            Instruction::SetStaticVar(i) => emit!(Opcode::SetStaticVar, i),
            Instruction::Context(i) => emit!(Opcode::Context, i),
            Instruction::Type(i) => emit!(Opcode::Type, i),
            Instruction::StringTemplate(i) => emit!(Opcode::StringTemplate, i),
            Instruction::Coinit(i) => emit!(Opcode::Coinit, i),
            Instruction::Coyield(i) => emit!(Opcode::Coyield, i),
            Instruction::Coresume(i) => emit!(Opcode::Coresume, i),
            Instruction::Coreturn(i) => emit!(Opcode::Coreturn, i),
            Instruction::Await(i) => emit!(Opcode::Await, i),
            Instruction::FutureValue(i) => emit!(Opcode::FutureValue, i),
            Instruction::Panic(i) => emit!(Opcode::Panic, i),
            Instruction::PanicFmt(i) => emit!(Opcode::PanicFmt, i),
            Instruction::Catch(i) => emit!(Opcode::Catch, i),
            Instruction::Throw(i) => emit!(Opcode::Throw, i),
            Instruction::UnwrapChoice(i) => emit!(Opcode::UnwrapChoice, i),
            Instruction::End(i) => emit!(Opcode::End, i),
            Instruction::Compare(i) => emit!(Opcode::Compare, i),
            Instruction::CompareNot(i) => emit!(Opcode::CompareNot, i),
            Instruction::ForRangeInit(i) => emit!(Opcode::ForRangeInit, i),
            Instruction::ForRange(i) => emit!(Opcode::ForRange, i),
            Instruction::ForRangeReverse(i) => emit!(Opcode::ForRangeReverse, i),
            Instruction::Match(i) => emit!(Opcode::Match, i),
            Instruction::AppendList(i) => emit!(Opcode::AppendList, i),
            Instruction::ListDyn(i) => emit!(Opcode::ListDyn, i),
            Instruction::List(i) => emit!(Opcode::List, i),
            Instruction::Array(i) => emit!(Opcode::Array, i),
            Instruction::Tuple(i) => emit!(Opcode::Tuple, i),
            Instruction::Map(i) => emit!(Opcode::Map, i),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_a_fixed_shape_instruction() {
        let original = Instruction::AddInt(op::AddInt {
            left: crate::reg::Reg::new(1),
            right: crate::reg::Reg::new(2),
            dst: crate::reg::Reg::new(3),
        });
        let mut buf = Vec::new();
        original.encode(&mut buf);
        let (decoded, len) = Instruction::decode(&buf).unwrap();
        assert_eq!(decoded, original);
        assert_eq!(len, buf.len());
    }

    #[test]
    fn round_trips_a_variable_length_instruction() {
        let original = Instruction::ReleaseN(op::ReleaseN {
            regs: vec![crate::reg::Reg::new(4), crate::reg::Reg::new(5)],
        });
        let mut buf = Vec::new();
        original.encode(&mut buf);
        let (decoded, len) = Instruction::decode(&buf).unwrap();
        assert_eq!(decoded, original);
        assert_eq!(len, buf.len());
    }

    #[test]
    fn rejects_unknown_opcode_byte() {
        let err = Instruction::decode(&[0xfe]).unwrap_err();
        assert_eq!(err, DecodeError::InvalidOpcode(0xfe));
    }

    #[test]
    fn rejects_truncated_operands() {
        let err = Instruction::decode(&[Opcode::AddInt as u8, 1]).unwrap_err();
        assert!(matches!(err, DecodeError::Truncated { .. }));
    }
}
