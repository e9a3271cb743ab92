//! `Value` -> displayed-text formatting, used by `OpPrint`, the disassembler,
//! and runtime-error messages. Lives outside `value.rs` because rendering an
//! object payload needs a `&Heap` lookup that the value encodings themselves
//! don't have access to.

use crate::heap::Heap;
use crate::object::ObjKind;
use crate::value::Value;

pub fn format_value(value: Value, heap: &Heap) -> String {
    if value.is_nil() {
        return "nil".to_string();
    }
    if let Some(b) = value.as_bool() {
        return b.to_string();
    }
    if let Some(n) = value.as_number() {
        return format_number(n);
    }
    if let Some(r) = value.as_object() {
        return format_object(r.kind, r.index, heap);
    }
    unreachable!("value is neither nil, bool, number, nor object")
}

/// Integral finite doubles print via `itoa` (no trailing `.0`, matching the
/// reference interpreter's `printf("%.14g", ...)` for whole numbers); every
/// other case falls back to `f64`'s own `Display`, which already spells
/// `NaN`/`inf`/`-inf` the way tests expect.
fn format_number(n: f64) -> String {
    if n.is_finite() && n.fract() == 0.0 && n.abs() < 1e15 {
        let mut buf = itoa::Buffer::new();
        buf.format(n as i64).to_string()
    } else if n.is_nan() {
        "nan".to_string()
    } else if n.is_infinite() {
        if n > 0.0 { "inf".to_string() } else { "-inf".to_string() }
    } else {
        n.to_string()
    }
}

fn format_object(kind: ObjKind, index: u32, heap: &Heap) -> String {
    match kind {
        ObjKind::Str => heap.strings.get(index).as_str().to_string(),
        ObjKind::Func => match heap.functions.get(index).name {
            Some(name) => format!("<fn {}>", heap.strings.get(name).as_str()),
            None => "<script>".to_string(),
        },
        ObjKind::Native => format!("<native fn {}>", heap.strings.get(heap.natives.get(index).name).as_str()),
        ObjKind::Closure => {
            let function = heap.closures.get(index).function;
            match heap.functions.get(function).name {
                Some(name) => format!("<fn {}>", heap.strings.get(name).as_str()),
                None => "<script>".to_string(),
            }
        }
        ObjKind::Class => format!("{}", heap.strings.get(heap.classes.get(index).name).as_str()),
        ObjKind::Instance => {
            let class = heap.instances.get(index).class;
            format!("{} instance", heap.strings.get(heap.classes.get(class).name).as_str())
        }
        ObjKind::Bound => {
            let method = heap.bounds.get(index).method;
            let function = heap.closures.get(method).function;
            match heap.functions.get(function).name {
                Some(name) => format!("<fn {}>", heap.strings.get(name).as_str()),
                None => "<script>".to_string(),
            }
        }
    }
}
