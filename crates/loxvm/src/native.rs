//! Host-provided builtins installed into every fresh `Vm`: `clock` and
//! `has_field`. Additional builtins can be registered the same way via
//! `Vm::define_native`.

use crate::heap::Heap;
use crate::object::{ObjKind, StrId};
use crate::value::Value;
use std::time::Instant;

/// `clock() -> number`: seconds elapsed since an unspecified but stable
/// epoch (VM process start), backed by `Instant` for monotonic behavior.
pub fn clock(_heap: &Heap, args: &[Value]) -> Result<Value, String> {
    if !args.is_empty() {
        return Err("Expected 0 arguments.".to_string());
    }
    thread_local! {
        static START: Instant = Instant::now();
    }
    let secs = START.with(|start| start.elapsed().as_secs_f64());
    Ok(Value::number(secs))
}

/// `has_field(instance, name) -> bool`: true if `instance` has a field
/// (not a method) with the given name. Exists mainly so embedders and tests
/// can probe instance shape without triggering `OpGetProperty`'s "Undefined
/// property" error on a miss.
pub fn has_field(heap: &Heap, args: &[Value]) -> Result<Value, String> {
    let [instance, name] = args else {
        return Err("Expected 2 arguments.".to_string());
    };
    let Some(instance_ref) = instance.as_object().filter(|r| r.kind == ObjKind::Instance) else {
        return Err("First argument must be an instance.".to_string());
    };
    let Some(name_ref) = name.as_object().filter(|r| r.kind == ObjKind::Str) else {
        return Err("Second argument must be a string.".to_string());
    };
    let name_id: StrId = name_ref.index;
    let hash = heap.strings.get(name_id).hash;
    let instance_obj = heap.instances.get(instance_ref.index);
    Ok(Value::bool(instance_obj.fields.contains(name_id, hash)))
}
