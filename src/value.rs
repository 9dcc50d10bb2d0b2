//! The tagged value representation.
//!
//! The bytecode's own design notes license replacing a NaN-boxed 64-bit
//! word with "a tagged union whose discriminant is the primitive/variant
//! kind" — this is that union, expressed as a safe Rust enum rather than
//! bit-twiddled pointers. Every tag class the packed representation would
//! have distinguished is a variant here, and the struct stays `Copy` so
//! passing a `Value` around is exactly as cheap as passing the 64-bit word
//! would have been.

use rivet_asm::PanicReason;

use crate::heap::HeapRef;

/// A single VM register/stack-slot value.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Value {
    /// Absence of a value a program can observe (`ConstNone`).
    None,
    /// Absence of a value in slots the program never reads (uninitialized
    /// locals prior to their first write, or a call with no return value).
    Void,
    Bool(bool),
    /// Fits the common case of a boxed-free small integer; same role as
    /// the packed representation's small-int tag.
    Int(i64),
    Float(f64),
    /// Interned symbol id (`Symbol` opcode).
    Symbol(u32),
    /// Bare literal tag value with no payload (`TagLit` opcode).
    TagLit(u8),
    /// A value of a sum/choice type: which arm (`tag_id`) and its
    /// discriminant payload (`val`) (`Enum` opcode).
    Enum { tag_id: u8, val: u8 },
    /// A reference-counted heap object.
    Pointer(HeapRef),
    /// A suspended-fiber marker produced where a `Coyield`/`Await` left off;
    /// distinct from `None` so a host can tell "no value yet" from "paused".
    Interrupt,
    /// An error value, as produced by an awaited future that rejected.
    Error(PanicReason),
}

impl Value {
    pub const fn is_pointer(&self) -> bool {
        matches!(self, Value::Pointer(_))
    }

    pub const fn is_float(&self) -> bool {
        matches!(self, Value::Float(_))
    }

    pub const fn is_int(&self) -> bool {
        matches!(self, Value::Int(_))
    }

    pub const fn is_none(&self) -> bool {
        matches!(self, Value::None)
    }

    pub const fn is_boolean(&self) -> bool {
        matches!(self, Value::Bool(_))
    }

    pub const fn is_error(&self) -> bool {
        matches!(self, Value::Error(_))
    }

    /// The heap object this pointer resolves to, or `None` for a non-pointer
    /// value or a reference to a freed slot.
    pub fn as_heap<'a>(&self, heap: &'a crate::heap::Heap) -> Option<&'a crate::heap::HeapObjectKind> {
        self.as_pointer().and_then(|r| heap.get(r)).map(|o| &o.kind)
    }

    pub fn is_upvalue(&self, heap: &crate::heap::Heap) -> bool {
        matches!(self.as_heap(heap), Some(crate::heap::HeapObjectKind::UpValue { .. }))
    }

    pub fn is_closure(&self, heap: &crate::heap::Heap) -> bool {
        matches!(self.as_heap(heap), Some(crate::heap::HeapObjectKind::Closure { .. }))
    }

    pub const fn as_pointer(&self) -> Option<HeapRef> {
        match self {
            Value::Pointer(r) => Some(*r),
            _ => None,
        }
    }

    pub const fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub const fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub const fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Truthiness used by `JumpCond`/`JumpNotCond`: only `Bool(false)` and
    /// `None` are falsy, matching the original interpreter's branch tests.
    pub const fn is_truthy(&self) -> bool {
        !matches!(self, Value::Bool(false) | Value::None)
    }

    /// A coarse "kind" discriminant, distinct from a heap object's nominal
    /// type id, used by `Cast`/`CastAbstract` to compare a primitive value
    /// against an expected type id recorded in the constant pool.
    pub fn type_id_of(&self, heap: &crate::heap::Heap) -> u32 {
        match self {
            Value::None => TypeId::NONE,
            Value::Void => TypeId::VOID,
            Value::Bool(_) => TypeId::BOOL,
            Value::Int(_) => TypeId::INT,
            Value::Float(_) => TypeId::FLOAT,
            Value::Symbol(_) => TypeId::SYMBOL,
            Value::TagLit(_) => TypeId::TAG_LIT,
            Value::Enum { .. } => TypeId::ENUM,
            Value::Interrupt => TypeId::INTERRUPT,
            Value::Error(_) => TypeId::ERROR,
            Value::Pointer(r) => heap.type_id_of(*r).unwrap_or(TypeId::ANY),
        }
    }
}

/// Reserved low type ids for primitive kinds; heap object nominal types
/// start at [`TypeId::FIRST_USER`] and are assigned by the (external)
/// compiler/type checker.
pub struct TypeId;

impl TypeId {
    pub const NONE: u32 = 0;
    pub const VOID: u32 = 1;
    pub const BOOL: u32 = 2;
    pub const INT: u32 = 3;
    pub const FLOAT: u32 = 4;
    pub const SYMBOL: u32 = 5;
    pub const TAG_LIT: u32 = 6;
    pub const ENUM: u32 = 7;
    pub const INTERRUPT: u32 = 8;
    pub const ERROR: u32 = 9;
    pub const ANY: u32 = 10;
    pub const FIRST_USER: u32 = 64;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_false_and_none_are_falsy() {
        assert!(!Value::Bool(false).is_truthy());
        assert!(!Value::None.is_truthy());
        assert!(Value::Int(0).is_truthy());
        assert!(Value::Void.is_truthy());
    }

    #[test]
    fn is_boolean_and_is_error_match_their_variants() {
        assert!(Value::Bool(true).is_boolean());
        assert!(!Value::Int(0).is_boolean());
        assert!(Value::Error(PanicReason::DivideByZero).is_error());
        assert!(!Value::None.is_error());
    }

    #[test]
    fn is_upvalue_and_is_closure_inspect_the_pointed_to_heap_object() {
        let mut heap = crate::heap::Heap::new(&crate::consts::VmLimits::default());
        let upvalue_ref = heap.alloc(TypeId::ANY, true, crate::heap::HeapObjectKind::UpValue { val: Value::Int(1) });
        let closure_ref = heap.alloc(TypeId::ANY, true, crate::heap::HeapObjectKind::Closure { func_id: 0, captured: Vec::new() });

        let upvalue = Value::Pointer(upvalue_ref);
        let closure = Value::Pointer(closure_ref);

        assert!(upvalue.is_upvalue(&heap));
        assert!(!upvalue.is_closure(&heap));
        assert!(closure.is_closure(&heap));
        assert!(!closure.is_upvalue(&heap));
        assert!(Value::Int(0).as_heap(&heap).is_none());
    }
}
