//! Aggregate construction (struct/object/tuple/list/map/trait/closure) and
//! the field/index accessors over them.
//!
//! Convention followed throughout, mirrored from the up-value setters in
//! the source interpreter this core's semantics are grounded on: a read
//! that hands a value to a *new* owner (a register, a freshly built
//! aggregate) retains it; a write that replaces a value already owned by
//! an aggregate releases the old value and stores the new one raw, relying
//! on the caller (ultimately the compiler) to have already arranged the
//! incoming value's ownership.

use rivet_asm::PanicReason;

use crate::error::VmResult;
use crate::heap::HeapObjectKind;
use crate::host::Host;
use crate::value::Value;

use super::Vm;

impl<H: Host> Vm<H> {
    pub(crate) fn build_aggregate(
        &mut self,
        type_id: u32,
        may_cycle: bool,
        fields: Vec<Value>,
        wrap: impl FnOnce(Vec<Value>) -> HeapObjectKind,
    ) -> Value {
        for field in &fields {
            self.retain(*field);
        }
        let reference = self.heap.alloc(type_id, may_cycle, wrap(fields));
        Value::Pointer(reference)
    }

    pub(crate) fn build_object(&mut self, type_id: u32, fields: Vec<Value>) -> Value {
        self.build_aggregate(type_id, true, fields, |fields| HeapObjectKind::Object { fields })
    }

    pub(crate) fn build_struct(&mut self, type_id: u32, fields: Vec<Value>) -> Value {
        self.build_aggregate(type_id, true, fields, |fields| HeapObjectKind::Struct { fields })
    }

    pub(crate) fn build_tuple(&mut self, type_id: u32, items: Vec<Value>) -> Value {
        self.build_aggregate(type_id, true, items, |items| HeapObjectKind::Tuple { items })
    }

    pub(crate) fn build_list(&mut self, items: Vec<Value>) -> Value {
        self.build_aggregate(crate::value::TypeId::ANY, true, items, |items| {
            HeapObjectKind::List { items }
        })
    }

    pub(crate) fn build_map(&mut self, type_id: u32, entries: Vec<(Value, Value)>) -> Value {
        for (k, v) in &entries {
            self.retain(*k);
            self.retain(*v);
        }
        let reference = self.heap.alloc(type_id, true, HeapObjectKind::Map { entries });
        Value::Pointer(reference)
    }

    /// `AppendList`: pushes `val` onto `list`'s backing storage in place.
    pub(crate) fn append_list(&mut self, list: Value, val: Value) -> VmResult<()> {
        let items = self.list_slot(list)?;
        items.push(val);
        Ok(())
    }

    fn field_slot<'a>(&'a mut self, recv: Value, field_idx: u8) -> VmResult<(&'a mut Vec<Value>, usize)> {
        let reference = recv
            .as_pointer()
            .ok_or_else(|| self.panic(PanicReason::ExpectedPointer, "field access on non-pointer value"))?;
        let object = self
            .heap
            .get_mut(reference)
            .ok_or_else(|| self.panic(PanicReason::ExpectedPointer, "field access on freed object"))?;
        let fields = match &mut object.kind {
            HeapObjectKind::Object { fields } | HeapObjectKind::Struct { fields } => fields,
            _ => return Err(self.panic(PanicReason::ExpectedPointer, "value has no fields")),
        };
        let idx = field_idx as usize;
        if idx >= fields.len() {
            return Err(self.panic(PanicReason::OutOfBounds, "field index out of bounds"));
        }
        Ok((fields, idx))
    }

    pub(crate) fn read_field(&mut self, recv: Value, field_idx: u8) -> VmResult<Value> {
        let (fields, idx) = self.field_slot(recv, field_idx)?;
        let value = fields[idx];
        self.retain(value);
        Ok(value)
    }

    pub(crate) fn write_field(&mut self, recv: Value, field_idx: u8, new_value: Value) -> VmResult<()> {
        let (fields, idx) = self.field_slot(recv, field_idx)?;
        let old = fields[idx];
        fields[idx] = new_value;
        self.release(old);
        Ok(())
    }

    fn list_slot<'a>(&'a mut self, recv: Value) -> VmResult<&'a mut Vec<Value>> {
        let reference = recv
            .as_pointer()
            .ok_or_else(|| self.panic(PanicReason::ExpectedPointer, "index access on non-pointer value"))?;
        let object = self
            .heap
            .get_mut(reference)
            .ok_or_else(|| self.panic(PanicReason::ExpectedPointer, "index access on freed object"))?;
        match &mut object.kind {
            HeapObjectKind::List { items } | HeapObjectKind::Tuple { items } => Ok(items),
            _ => Err(self.panic(PanicReason::ExpectedPointer, "value is not indexable")),
        }
    }

    /// `IndexTuple`: negative indices wrap (`idx = len + idx`).
    pub(crate) fn index_tuple(&mut self, recv: Value, idx: i64) -> VmResult<Value> {
        let items = self.list_slot(recv)?;
        let len = items.len() as i64;
        let resolved = if idx < 0 { len + idx } else { idx };
        if resolved < 0 || resolved >= len {
            return Err(self.panic(PanicReason::OutOfBounds, "tuple index out of bounds"));
        }
        let value = items[resolved as usize];
        self.retain(value);
        Ok(value)
    }

    /// `IndexList`: unlike `IndexTuple`, negative indices are NOT wrapped.
    pub(crate) fn index_list(&mut self, recv: Value, idx: i64) -> VmResult<Value> {
        let items = self.list_slot(recv)?;
        if idx < 0 || idx as usize >= items.len() {
            return Err(self.panic(PanicReason::OutOfBounds, "list index out of bounds"));
        }
        let value = items[idx as usize];
        self.retain(value);
        Ok(value)
    }

    /// `SetIndexList`: matches `IndexList`, negative indices are rejected
    /// rather than wrapped.
    pub(crate) fn set_index_list(&mut self, recv: Value, idx: i64, new_value: Value) -> VmResult<()> {
        let items = self.list_slot(recv)?;
        if idx < 0 || idx as usize >= items.len() {
            return Err(self.panic(PanicReason::OutOfBounds, "list index out of bounds"));
        }
        let old = items[idx as usize];
        items[idx as usize] = new_value;
        self.release(old);
        Ok(())
    }

    pub(crate) fn slice_list(&mut self, recv: Value, start: i64, end: i64) -> VmResult<Value> {
        let items = self.list_slot(recv)?;
        let len = items.len() as i64;
        if start < 0 || end > len || start > end {
            return Err(self.panic(PanicReason::OutOfBounds, "slice bounds out of range"));
        }
        let slice = items[start as usize..end as usize].to_vec();
        Ok(self.build_list(slice))
    }

    fn map_slot<'a>(&'a mut self, recv: Value) -> VmResult<&'a mut Vec<(Value, Value)>> {
        let reference = recv
            .as_pointer()
            .ok_or_else(|| self.panic(PanicReason::ExpectedPointer, "map access on non-pointer value"))?;
        let object = self
            .heap
            .get_mut(reference)
            .ok_or_else(|| self.panic(PanicReason::ExpectedPointer, "map access on freed object"))?;
        match &mut object.kind {
            HeapObjectKind::Map { entries } => Ok(entries),
            _ => Err(self.panic(PanicReason::ExpectedPointer, "value is not a map")),
        }
    }

    pub(crate) fn index_map(&mut self, recv: Value, key: Value) -> VmResult<Value> {
        let entries = self.map_slot(recv)?;
        let found = entries.iter().find(|(k, _)| values_eq(*k, key)).map(|(_, v)| *v);
        match found {
            Some(value) => {
                self.retain(value);
                Ok(value)
            }
            None => Err(self.panic(PanicReason::MissingMethod, "key not present in map")),
        }
    }

    pub(crate) fn set_index_map(&mut self, recv: Value, key: Value, new_value: Value) -> VmResult<()> {
        let entries = self.map_slot(recv)?;
        if let Some(slot) = entries.iter_mut().find(|(k, _)| values_eq(*k, key)) {
            let old = slot.1;
            slot.1 = new_value;
            self.release(old);
        } else {
            entries.push((key, new_value));
        }
        Ok(())
    }

    pub(crate) fn unwrap_choice(&mut self, recv: Value, expected_tag: u8) -> VmResult<Value> {
        let reference = recv
            .as_pointer()
            .ok_or_else(|| self.panic(PanicReason::ExpectedPointer, "unwrap on non-pointer value"))?;
        let object = self
            .heap
            .get(reference)
            .ok_or_else(|| self.panic(PanicReason::ExpectedPointer, "unwrap on freed object"))?;
        let fields = match &object.kind {
            HeapObjectKind::Object { fields } | HeapObjectKind::Struct { fields } => fields,
            _ => return Err(self.panic(PanicReason::ExpectedPointer, "value is not a choice")),
        };
        let tag = fields.first().and_then(Value::as_int).unwrap_or(-1);
        if tag != expected_tag as i64 {
            return Err(self.panic(PanicReason::UnwrapChoiceMismatch, "choice tag mismatch"));
        }
        let value = fields.get(1).copied().unwrap_or(Value::None);
        self.retain(value);
        Ok(value)
    }
}

/// Structural equality used for map key lookup; pointer values compare by
/// identity (same heap slot), matching reference-type semantics elsewhere
/// in the interpreter.
fn values_eq(a: Value, b: Value) -> bool {
    match (a, b) {
        (Value::Int(x), Value::Int(y)) => x == y,
        (Value::Float(x), Value::Float(y)) => x == y,
        (Value::Bool(x), Value::Bool(y)) => x == y,
        (Value::Symbol(x), Value::Symbol(y)) => x == y,
        (Value::TagLit(x), Value::TagLit(y)) => x == y,
        (Value::Pointer(x), Value::Pointer(y)) => x == y,
        (Value::None, Value::None) | (Value::Void, Value::Void) => true,
        _ => false,
    }
}
