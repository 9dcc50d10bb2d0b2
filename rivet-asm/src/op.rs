//! One Rust type per opcode.
//!
//! Fixed-shape opcodes (the large majority) are declared through the
//! [`instr!`](crate::macros::instr) macro, which gives each a `LEN`,
//! `encode`, and `decode`. A handful of opcodes are variable length because
//! one of their own fields (a count byte) determines how many further bytes
//! follow; those are written out by hand at the bottom of this file.

use crate::call_info::CallInfo;
use crate::macros::{instr, Operand, U48};
use crate::reg::Reg;

instr! {
    // ----- arithmetic / bitwise binops: (left, right, dst) -----
    /// `dst = left + right`, both operands integers.
    AddInt { left: Reg, right: Reg, dst: Reg }
    SubInt { left: Reg, right: Reg, dst: Reg }
    MulInt { left: Reg, right: Reg, dst: Reg }
    DivInt { left: Reg, right: Reg, dst: Reg }
    ModInt { left: Reg, right: Reg, dst: Reg }
    /// `dst = left ** right` via exponentiation by squaring; see `ipow` in `interpreter/alu.rs`.
    PowInt { left: Reg, right: Reg, dst: Reg }
    AddFloat { left: Reg, right: Reg, dst: Reg }
    SubFloat { left: Reg, right: Reg, dst: Reg }
    MulFloat { left: Reg, right: Reg, dst: Reg }
    DivFloat { left: Reg, right: Reg, dst: Reg }
    PowFloat { left: Reg, right: Reg, dst: Reg }
    BitwiseAnd { left: Reg, right: Reg, dst: Reg }
    BitwiseOr { left: Reg, right: Reg, dst: Reg }
    BitwiseXor { left: Reg, right: Reg, dst: Reg }
    /// Rejects `right == 64`; see the asymmetry note on `BitwiseRightShift`.
    BitwiseLeftShift { left: Reg, right: Reg, dst: Reg }
    /// Unlike `BitwiseLeftShift`, a shift of exactly 64 is allowed (clears to zero).
    BitwiseRightShift { left: Reg, right: Reg, dst: Reg }

    // ----- comparisons: (left, right, dst) -----
    CompareEq { left: Reg, right: Reg, dst: Reg }
    CompareNeq { left: Reg, right: Reg, dst: Reg }
    CompareLess { left: Reg, right: Reg, dst: Reg }
    CompareGreater { left: Reg, right: Reg, dst: Reg }
    CompareLessEqual { left: Reg, right: Reg, dst: Reg }
    CompareGreaterEqual { left: Reg, right: Reg, dst: Reg }
    /// Polymorphic comparator; identity (`left` and `right` the same value)
    /// short-circuits to `true` without dispatching to it.
    Compare { left: Reg, right: Reg, dst: Reg }
    /// Like `Compare`, identity short-circuits to `false`.
    CompareNot { left: Reg, right: Reg, dst: Reg }

    // ----- unary ops: (val, dst) -----
    NegInt { val: Reg, dst: Reg }
    NegFloat { val: Reg, dst: Reg }
    Not { val: Reg, dst: Reg }

    // ----- moves / literals -----
    Copy { src: Reg, dst: Reg }
    ConstTrue { dst: Reg }
    ConstFalse { dst: Reg }
    ConstNone { dst: Reg }
    /// Small integer immediate that fits in one byte, sign-extended.
    ConstI8 { val: u8, dst: Reg }
    /// Constant-pool reference; `idx` indexes the owning chunk's pool.
    ConstOp { idx: u16, dst: Reg }

    // ----- jumps / branches: target is a chunk-relative instruction offset -----
    Jump { target: u32 }
    JumpCond { cond: Reg, target: u32 }
    JumpNotCond { cond: Reg, target: u32 }

    // ----- bounded loops: self-rewriting direction dispatch -----
    /// Seeds `counter_dst`/`index_dst` with `start`, then either jumps past
    /// an empty range (to `skip_target`) or installs this loop's direction
    /// at `footer_pc` (consulted by the `ForRange` landing there) and falls
    /// through into the loop body.
    ForRangeInit { start: Reg, end: Reg, increment: bool, counter_dst: Reg, index_dst: Reg, footer_pc: u32, skip_target: u32 }
    /// Loop footer: steps the counter according to whichever direction the
    /// matching `ForRangeInit` installed (ascending if none was installed),
    /// looping back to `body_target` until `end` is reached.
    ForRange { end: Reg, counter_dst: Reg, index_dst: Reg, body_target: u32 }
    /// Like `ForRange`, but always steps backward regardless of what any
    /// `ForRangeInit` installed — used when the compiler already knows the
    /// direction statically and has no use for the rewrite.
    ForRangeReverse { end: Reg, counter_dst: Reg, index_dst: Reg, body_target: u32 }

    // ----- refcounting -----
    Retain { val: Reg }
    Release { val: Reg }

    // ----- tuple / list / map indexing -----
    /// Negative indices wrap (`idx = len + idx`).
    IndexTuple { recv: Reg, idx: Reg, dst: Reg }
    /// Negative indices do NOT wrap, unlike `IndexTuple`.
    IndexList { recv: Reg, idx: Reg, dst: Reg }
    /// Same no-wrap behavior as `IndexList`.
    SetIndexList { recv: Reg, idx: Reg, val: Reg }
    IndexMap { recv: Reg, key: Reg, dst: Reg }
    SetIndexMap { recv: Reg, key: Reg, val: Reg }
    SliceList { recv: Reg, start: Reg, end: Reg, dst: Reg }
    /// Push `val` onto `list`'s backing storage.
    AppendList { list: Reg, val: Reg }

    // ----- field access with inline caches -----
    Field { recv: Reg, field_idx: u8, dst: Reg }
    /// Cache byte pair reserved inline: observed type id (2 bytes) + field offset (1 byte).
    FieldIC { recv: Reg, field_idx: u8, dst: Reg, cache_type_id: u16, cache_offset: u8 }
    FieldDyn { recv: Reg, name_idx: u16, dst: Reg }
    FieldDynIC { recv: Reg, name_idx: u16, dst: Reg, cache_type_id: u16, cache_offset: u8 }
    SetField { recv: Reg, field_idx: u8, val: Reg }
    SetFieldIC { recv: Reg, field_idx: u8, val: Reg, cache_type_id: u16, cache_offset: u8 }
    SetFieldDyn { recv: Reg, name_idx: u16, val: Reg }
    SetFieldDynIC { recv: Reg, name_idx: u16, val: Reg, cache_type_id: u16, cache_offset: u8 }
    FieldStruct { recv: Reg, field_idx: u8, dst: Reg }

    // ----- type checks -----
    TypeCheck { val: Reg, type_id: u16 }
    TypeCheckOption { val: Reg, type_id: u16 }
    Cast { val: Reg, exp_type_id: u16, dst: Reg }
    CastAbstract { val: Reg, exp_type_id: u16, dst: Reg }

    // ----- call protocol -----
    /// Static symbol call: `callee` is a constant-pool function index, args
    /// already placed starting at `ret + CALL_ARG_START`.
    CallSym { callee: u16, ret: Reg, num_args: u8 }
    /// Like `CallSym`, but installs/deoptimizes an inline receiver-type cache.
    CallSymIC { callee: u16, ret: Reg, num_args: u8, cache_type_id: u16 }
    /// Method call on an object receiver, resolved dynamically by name.
    CallObjSym { recv: Reg, name_idx: u16, ret: Reg, num_args: u8 }
    CallObjSymIC { recv: Reg, name_idx: u16, ret: Reg, num_args: u8, cache_type_id: u16, cache_func: u16 }
    /// Trait-dispatched call through a vtable slot.
    CallTrait { recv: Reg, method_idx: u8, ret: Reg, num_args: u8 }
    /// Fully dynamic call where the callee symbol itself is resolved at runtime.
    CallSymDyn { callee_sym: u16, ret: Reg, num_args: u8 }
    /// Indirect call through a callable value already sitting in a register
    /// (closure, bound method, or function pointer/union/symbol).
    Call { callee: Reg, ret: Reg, num_args: u8 }
    CallObjFuncIC { recv: Reg, name_idx: u16, ret: Reg, num_args: u8, cache_type_id: u16, cache_func: u16 }
    CallNativeFuncIC { recv: Reg, name_idx: u16, ret: Reg, num_args: u8, cache_type_id: u16, cache_func: u16 }
    CallObjNativeFuncIC { recv: Reg, name_idx: u16, ret: Reg, num_args: u8, cache_type_id: u16, cache_func: u16 }
    /// Return with no value; the caller's return slot is left untouched.
    Ret0 {}
    /// Return the value in `val`.
    Ret1 { val: Reg }
    /// Return whose value slot is determined dynamically by the callee's call-info word.
    RetDyn { val: Reg }

    // ----- aggregate construction -----
    ObjectSmall { type_id: u16, start_local: u8, num_fields: u8, dst: Reg }
    Object { type_id: u16, start_local: u8, num_fields: u8, dst: Reg }
    Trait { type_id: u16, impl_idx: u16, val: Reg, dst: Reg }
    Box { val: Reg, dst: Reg }
    Unbox { val: Reg, dst: Reg }
    Lambda { func_id: u16, dst: Reg }
    /// Untyped list literal from `num_items` contiguous registers.
    ListDyn { start_local: u8, num_items: u8, dst: Reg }
    /// Typed list literal; `type_id` is recorded on the heap header.
    List { type_id: u16, start_local: u8, num_items: u8, dst: Reg }
    /// Fixed-size array literal; same backing representation as `List`.
    Array { type_id: u16, start_local: u8, num_items: u8, dst: Reg }
    /// Tuple literal from `num_items` contiguous registers.
    Tuple { type_id: u16, start_local: u8, num_items: u8, dst: Reg }
    /// Map literal from `num_entries` contiguous `(key, value)` register pairs.
    Map { type_id: u16, start_local: u8, num_entries: u8, dst: Reg }

    // ----- address / pointer arithmetic over stack slots -----
    AddrLocal { local: Reg, dst: Reg }
    AddrConstIndex { ptr: Reg, offset: u8, dst: Reg }
    AddrIndex { ptr: Reg, idx: Reg, dst: Reg }
    Deref { ptr: Reg, retain_flag: bool, dst: Reg }
    SetDeref { ptr: Reg, val: Reg }
    SetDerefStruct { ptr: Reg, num_fields: u8, src: Reg }

    // ----- closures / upvalues -----
    Up { val: Reg, dst: Reg }
    UpValue { up: Reg, dst: Reg }
    SetUpValue { up: Reg, val: Reg, release_flag: bool }
    Captured { closure: Reg, slot: u8, retain_flag: bool, dst: Reg }
    SetCaptured { closure: Reg, slot: u8, val: Reg }

    // ----- symbolic / nominal literals -----
    TagLit { sym: u8, dst: Reg }
    Enum { tag_id: u8, val: u8, dst: Reg }
    Symbol { sym_id: u8, dst: Reg }
    FuncPtr { func_id: u16, ptr_type_id: u16, dst: Reg }
    FuncUnion { val: Reg, union_type_id: u16, dst: Reg }
    FuncSym { sym_type_id: u16, func_sym: U48, dst: Reg }
    StaticVar { sym_id: u16, dst: Reg }
    SetStaticVar { sym_id: u16, release_flag: bool, val: Reg }
    Context { idx: u8, dst: Reg }
    Type { type_id: u32, expr_type: bool, dst: Reg }

    // ----- fibers -----
    Coinit { func: Reg, dst: Reg }
    Coyield {}
    Coresume { fiber: Reg, dst: Reg }
    Coreturn { val: Reg }
    Await { future: Reg, dst: Reg }
    FutureValue { val: Reg, dst: Reg }

    // ----- panics / unwind targets -----
    /// Static, compiler-supplied message indexed into the constant pool.
    Panic { msg_idx: u16 }
    /// Message built from `num_args` interpolated registers starting at `start_local`.
    PanicFmt { fmt_idx: u16, start_local: u8, num_args: u8 }
    /// Marks a protected region the unwinder may land on; `target` is the handler offset.
    Catch { target: u32 }
    Throw { val: Reg }
    /// `tag` is the expected choice tag; panics with `UnwrapChoiceMismatch` on mismatch.
    UnwrapChoice { val: Reg, tag: u8, dst: Reg }

    End {}
}

/// Release `count` consecutive local registers starting at `start`.
///
/// Variable length: the instruction stream holds `start`, `count`, then
/// `count` further register bytes naming exactly which locals to drop
/// (they need not be contiguous in register index, only in instruction
/// position), so this cannot be expressed as a fixed `instr!` shape.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ReleaseN {
    pub regs: Vec<Reg>,
}

impl ReleaseN {
    pub fn len(&self) -> usize {
        1 + self.regs.len()
    }

    pub fn encode(&self, buf: &mut Vec<u8>) {
        buf.push(self.regs.len() as u8);
        for r in &self.regs {
            r.write(buf);
        }
    }

    pub fn decode(bytes: &[u8]) -> Self {
        let count = bytes[0] as usize;
        let regs = bytes[1..1 + count].iter().map(|&b| Reg::new(b)).collect();
        Self { regs }
    }
}

/// Allocate a struct (copying fields inline by value, not by reference).
///
/// Variable length: a leading field count is followed by that many
/// per-field byte sizes (used to `memcpy` nested inline struct fields),
/// then the destination register.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Struct {
    pub type_id: u16,
    pub start_local: u8,
    pub field_sizes: Vec<u8>,
    pub dst: Reg,
}

impl Struct {
    pub fn len(&self) -> usize {
        2 + 1 + 1 + self.field_sizes.len() + 1
    }

    pub fn encode(&self, buf: &mut Vec<u8>) {
        self.type_id.write(buf);
        self.start_local.write(buf);
        buf.push(self.field_sizes.len() as u8);
        buf.extend_from_slice(&self.field_sizes);
        self.dst.write(buf);
    }

    pub fn decode(bytes: &[u8]) -> Self {
        let type_id = u16::read(&bytes[0..2]);
        let start_local = bytes[2];
        let nfields = bytes[3] as usize;
        let field_sizes = bytes[4..4 + nfields].to_vec();
        let dst = Reg::new(bytes[4 + nfields]);
        Self { type_id, start_local, field_sizes, dst }
    }
}

/// Same as [`Struct`], used when the compiler can prove four or fewer
/// fields, to avoid touching the pool allocator's large-object path.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StructSmall {
    pub type_id: u16,
    pub start_local: u8,
    pub field_sizes: Vec<u8>,
    pub dst: Reg,
}

impl StructSmall {
    pub fn len(&self) -> usize {
        2 + 1 + 1 + self.field_sizes.len() + 1
    }

    pub fn encode(&self, buf: &mut Vec<u8>) {
        self.type_id.write(buf);
        self.start_local.write(buf);
        buf.push(self.field_sizes.len() as u8);
        buf.extend_from_slice(&self.field_sizes);
        self.dst.write(buf);
    }

    pub fn decode(bytes: &[u8]) -> Self {
        let type_id = u16::read(&bytes[0..2]);
        let start_local = bytes[2];
        let nfields = bytes[3] as usize;
        let field_sizes = bytes[4..4 + nfields].to_vec();
        let dst = Reg::new(bytes[4 + nfields]);
        Self { type_id, start_local, field_sizes, dst }
    }
}

/// Build a heap object from a pointer to `nfields` contiguous source values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DerefStruct {
    pub ptr: Reg,
    pub type_id: u16,
    pub num_fields: u8,
    pub dst: Reg,
}

impl DerefStruct {
    pub const LEN: usize = 1 + 2 + 1 + 1;

    pub fn encode(&self, buf: &mut Vec<u8>) {
        self.ptr.write(buf);
        self.type_id.write(buf);
        self.num_fields.write(buf);
        self.dst.write(buf);
    }

    pub fn decode(bytes: &[u8]) -> Self {
        Self {
            ptr: Reg::read(&bytes[0..1]),
            type_id: u16::read(&bytes[1..3]),
            num_fields: bytes[3],
            dst: Reg::read(&bytes[4..5]),
        }
    }
}

/// Concatenate `str_count = num_exprs + 1` literal strings with interpolated
/// expression values read from `start_local..start_local + num_exprs`.
///
/// Variable length: `str_count` constant-pool indices follow the header.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StringTemplate {
    pub start_local: u8,
    pub num_exprs: u8,
    pub dst: Reg,
    pub str_const_idxs: Vec<u16>,
}

impl StringTemplate {
    pub fn len(&self) -> usize {
        1 + 1 + 1 + self.str_const_idxs.len() * 2
    }

    pub fn encode(&self, buf: &mut Vec<u8>) {
        buf.push(self.start_local);
        buf.push(self.num_exprs);
        self.dst.write(buf);
        for idx in &self.str_const_idxs {
            idx.write(buf);
        }
    }

    pub fn decode(bytes: &[u8]) -> Self {
        let start_local = bytes[0];
        let num_exprs = bytes[1];
        let dst = Reg::new(bytes[2]);
        let str_count = num_exprs as usize + 1;
        let str_const_idxs = bytes[3..3 + str_count * 2]
            .chunks_exact(2)
            .map(u16::read)
            .collect();
        Self { start_local, num_exprs, dst, str_const_idxs }
    }
}

/// Captured-variable up-value allocation for a closure literal.
///
/// Variable length: `num_captured` local register bytes follow the header,
/// naming which enclosing locals to box as up-values.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Closure {
    pub func_id: u16,
    pub captured: Vec<Reg>,
    pub dst: Reg,
}

impl Closure {
    pub fn len(&self) -> usize {
        2 + 1 + self.captured.len() + 1
    }

    pub fn encode(&self, buf: &mut Vec<u8>) {
        self.func_id.write(buf);
        buf.push(self.captured.len() as u8);
        for r in &self.captured {
            r.write(buf);
        }
        self.dst.write(buf);
    }

    pub fn decode(bytes: &[u8]) -> Self {
        let func_id = u16::read(&bytes[0..2]);
        let ncap = bytes[2] as usize;
        let captured = bytes[3..3 + ncap].iter().map(|&b| Reg::new(b)).collect();
        let dst = Reg::new(bytes[3 + ncap]);
        Self { func_id, captured, dst }
    }
}

/// Delegated tabled match: compares `val` against each `(tag, target)` pair
/// in order and jumps to the first match, falling through to
/// `default_target` if none match.
///
/// Variable length: a leading case count is followed by that many
/// `(i64, u32)` pairs.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Match {
    pub val: Reg,
    pub default_target: u32,
    pub cases: Vec<(i64, u32)>,
}

impl Match {
    pub fn len(&self) -> usize {
        1 + 4 + 2 + self.cases.len() * (8 + 4)
    }

    pub fn encode(&self, buf: &mut Vec<u8>) {
        self.val.write(buf);
        self.default_target.write(buf);
        (self.cases.len() as u16).write(buf);
        for (tag, target) in &self.cases {
            buf.extend_from_slice(&tag.to_be_bytes());
            target.write(buf);
        }
    }

    pub fn decode(bytes: &[u8]) -> Self {
        let val = Reg::read(&bytes[0..1]);
        let default_target = u32::read(&bytes[1..5]);
        let count = u16::read(&bytes[5..7]) as usize;
        let mut cases = Vec::with_capacity(count);
        let mut offset = 7;
        for _ in 0..count {
            let tag = i64::from_be_bytes(bytes[offset..offset + 8].try_into().unwrap());
            let target = u32::read(&bytes[offset + 8..offset + 12]);
            cases.push((tag, target));
            offset += 12;
        }
        Self { val, default_target, cases }
    }
}

/// Exposes the call-info word's packed fields on the two call-protocol ops
/// that read it directly off the callee's frame prologue rather than off
/// their own operand bytes.
pub fn decode_call_info(word: u64) -> CallInfo {
    CallInfo::unpack(word)
}
