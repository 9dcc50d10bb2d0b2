//! Reference counting over [`crate::heap::Heap`].
//!
//! `retain`/`release`/`release_object` are the three primitives every other
//! module calls instead of touching a `HeapObject`'s header directly. The
//! `rc-trace` feature gates a global live-object counter plus double-free
//! and dangling-reference assertions, mirroring the `#if TRACE` blocks
//! around refcount mutation in the original dispatch loop.

use crate::heap::{Heap, HeapObjectKind, HeapRef};
use crate::value::Value;

#[cfg(feature = "rc-trace")]
use std::sync::atomic::{AtomicI64, Ordering};

#[cfg(feature = "rc-trace")]
pub static GLOBAL_RC: AtomicI64 = AtomicI64::new(0);

/// Increment a value's refcount if it is a pointer; a no-op for every other
/// value kind.
pub fn retain(heap: &mut Heap, value: Value) {
    let Value::Pointer(reference) = value else { return };
    retain_ref(heap, reference);
}

pub fn retain_ref(heap: &mut Heap, reference: HeapRef) {
    #[cfg(feature = "rc-trace")]
    assert!(heap.is_live(reference), "retain on a dangling reference");

    if let Some(object) = heap.get_mut(reference) {
        object.header.refcount += 1;
        #[cfg(feature = "rc-trace")]
        GLOBAL_RC.fetch_add(1, Ordering::Relaxed);
    }
}

/// Decrement a value's refcount if it is a pointer, freeing and
/// recursively releasing its children once it reaches zero.
pub fn release(heap: &mut Heap, value: Value) {
    let Value::Pointer(reference) = value else { return };
    release_ref(heap, reference);
}

pub fn release_ref(heap: &mut Heap, reference: HeapRef) {
    #[cfg(feature = "rc-trace")]
    assert!(heap.is_live(reference), "release on a dangling reference");

    let Some(object) = heap.get_mut(reference) else {
        return;
    };
    debug_assert!(object.header.refcount > 0, "double free of {reference:?}");
    object.header.refcount -= 1;
    #[cfg(feature = "rc-trace")]
    GLOBAL_RC.fetch_sub(1, Ordering::Relaxed);

    if object.header.refcount == 0 {
        release_object(heap, reference);
    }
}

/// Free an object unconditionally (its refcount has already reached zero)
/// and release every child value it owns.
pub fn release_object(heap: &mut Heap, reference: HeapRef) {
    let Some(object) = heap.free(reference) else {
        return;
    };
    for child in children_of(object.kind) {
        release(heap, child);
    }
}

/// Enumerate the direct child values an object's payload owns a reference
/// to, consuming the payload (its containers are dropped here).
fn children_of(kind: HeapObjectKind) -> Vec<Value> {
    match kind {
        HeapObjectKind::Object { fields }
        | HeapObjectKind::Struct { fields } => fields,
        HeapObjectKind::Tuple { items } | HeapObjectKind::List { items } => items,
        HeapObjectKind::Map { entries } => entries
            .into_iter()
            .flat_map(|(k, v)| [k, v])
            .collect(),
        HeapObjectKind::Trait { value, .. } => vec![value],
        HeapObjectKind::Closure { captured, .. } => captured,
        HeapObjectKind::UpValue { val } => vec![val],
        HeapObjectKind::FuncUnion { ptr } => children_of(*ptr),
        HeapObjectKind::String { .. }
        | HeapObjectKind::Range { .. }
        | HeapObjectKind::FuncPtr { .. }
        | HeapObjectKind::FuncSym { .. }
        | HeapObjectKind::Type { .. }
        | HeapObjectKind::ExprType { .. }
        | HeapObjectKind::Fiber(_)
        | HeapObjectKind::BoxedInt { .. } => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::VmLimits;

    fn heap() -> Heap {
        Heap::new(&VmLimits::default())
    }

    #[test]
    fn release_frees_at_zero_refcount() {
        let mut h = heap();
        let r = h.alloc(1, false, HeapObjectKind::List { items: vec![] });
        release_ref(&mut h, r);
        assert!(!h.is_live(r));
    }

    #[test]
    fn retain_then_two_releases_frees_exactly_once() {
        let mut h = heap();
        let r = h.alloc(1, false, HeapObjectKind::List { items: vec![] });
        retain_ref(&mut h, r);
        assert_eq!(h.refcount_of(r), Some(2));
        release_ref(&mut h, r);
        assert!(h.is_live(r));
        release_ref(&mut h, r);
        assert!(!h.is_live(r));
    }

    #[test]
    fn releasing_a_list_recursively_releases_pointer_elements() {
        let mut h = heap();
        let inner = h.alloc(2, false, HeapObjectKind::List { items: vec![] });
        let outer = h.alloc(
            1,
            true,
            HeapObjectKind::List { items: vec![Value::Pointer(inner)] },
        );
        release_ref(&mut h, outer);
        assert!(!h.is_live(outer));
        assert!(!h.is_live(inner));
    }
}
