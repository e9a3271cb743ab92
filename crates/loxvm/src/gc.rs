//! Precise tracing mark-and-sweep, run from inside the allocator whenever
//! `Heap::should_collect` says so. The VM and the in-progress compiler chain
//! both contribute roots; see `Vm::collect_garbage` for how they're gathered.

use crate::heap::Heap;
use crate::object::{ClosureId, FuncId, ObjKind, ObjRef, UpvalueState};
use crate::value::Value;

/// Everything the collector must treat as a root for one cycle. Built fresh
/// by the caller (`Vm::collect_garbage`) since roots change every cycle.
pub struct GcRoots<'a> {
    pub stack: &'a [Value],
    pub frame_closures: &'a [ClosureId],
    pub open_upvalues: &'a [crate::object::UpvalueId],
    pub globals: &'a crate::table::Table,
    pub init_string: Option<crate::object::StrId>,
    /// Function objects belonging to compilers still on the compile-time
    /// stack (the outer function bodies of whatever is currently being
    /// parsed), so an allocation triggered mid-compile can't collect a
    /// function the compiler hasn't finished building yet.
    pub compiler_roots: &'a [FuncId],
}

/// Mark every reachable object, evict dead intern-pool entries, then sweep.
/// Returns the number of objects freed, mostly useful for tests/diagnostics.
pub fn collect(heap: &mut Heap, roots: &GcRoots) -> usize {
    let mut gray: Vec<ObjRef> = Vec::new();

    let mut mark_value = |heap: &mut Heap, gray: &mut Vec<ObjRef>, v: Value| {
        if let Some(r) = v.as_object() {
            mark_object(heap, gray, r);
        }
    };

    for &v in roots.stack {
        mark_value(heap, &mut gray, v);
    }
    for &closure in roots.frame_closures {
        mark_object(heap, &mut gray, ObjRef::new(ObjKind::Closure, closure));
    }
    for &up in roots.open_upvalues {
        mark_upvalue(heap, &mut gray, up);
    }
    for (key, value) in roots.globals.iter() {
        mark_object(heap, &mut gray, ObjRef::new(ObjKind::Str, key));
        mark_value(heap, &mut gray, value);
    }
    if let Some(init) = roots.init_string {
        mark_object(heap, &mut gray, ObjRef::new(ObjKind::Str, init));
    }
    for &func in roots.compiler_roots {
        mark_function(heap, &mut gray, func);
    }

    trace(heap, &mut gray);

    // Weak strings: evict intern-pool entries for anything the trace above
    // never reached, before `Heap::sweep` reclaims their arena slots.
    heap.sweep();

    0
}

fn mark_object(heap: &mut Heap, gray: &mut Vec<ObjRef>, r: ObjRef) {
    let newly_marked = match r.kind {
        ObjKind::Str => heap.strings.mark(r.index),
        ObjKind::Func => heap.functions.mark(r.index),
        ObjKind::Native => heap.natives.mark(r.index),
        ObjKind::Closure => heap.closures.mark(r.index),
        ObjKind::Class => heap.classes.mark(r.index),
        ObjKind::Instance => heap.instances.mark(r.index),
        ObjKind::Bound => heap.bounds.mark(r.index),
    };
    if newly_marked {
        gray.push(r);
    }
}

fn mark_function(heap: &mut Heap, gray: &mut Vec<ObjRef>, id: FuncId) {
    if heap.functions.mark(id) {
        gray.push(ObjRef::new(ObjKind::Func, id));
    }
}

fn mark_upvalue(heap: &mut Heap, gray: &mut Vec<ObjRef>, id: crate::object::UpvalueId) {
    // Upvalues aren't addressed by `ObjRef` (they're never a Value payload),
    // so they're blackened inline rather than going through the worklist.
    if heap.upvalues.mark(id) {
        if let UpvalueState::Closed(v) = heap.upvalues.get(id).state {
            if let Some(r) = v.as_object() {
                mark_object(heap, gray, r);
            }
        }
    }
}

/// Pop the gray worklist, blackening each object by marking what it points to.
fn trace(heap: &mut Heap, gray: &mut Vec<ObjRef>) {
    while let Some(r) = gray.pop() {
        match r.kind {
            ObjKind::Str | ObjKind::Native => {}
            ObjKind::Func => {
                let (name, constants) = {
                    let f = heap.functions.get(r.index);
                    (f.name, f.chunk.constants.clone())
                };
                if let Some(name) = name {
                    mark_object(heap, gray, ObjRef::new(ObjKind::Str, name));
                }
                for c in constants {
                    if let Some(cr) = c.as_object() {
                        mark_object(heap, gray, cr);
                    }
                }
            }
            ObjKind::Closure => {
                let (function, upvalues) = {
                    let c = heap.closures.get(r.index);
                    (c.function, c.upvalues.clone())
                };
                mark_function(heap, gray, function);
                for up in upvalues {
                    mark_upvalue(heap, gray, up);
                }
            }
            ObjKind::Class => {
                let (name, methods) = {
                    let c = heap.classes.get(r.index);
                    (c.name, c.methods.iter().collect::<Vec<_>>())
                };
                mark_object(heap, gray, ObjRef::new(ObjKind::Str, name));
                for (key, value) in methods {
                    mark_object(heap, gray, ObjRef::new(ObjKind::Str, key));
                    if let Some(vr) = value.as_object() {
                        mark_object(heap, gray, vr);
                    }
                }
            }
            ObjKind::Instance => {
                let (class, fields) = {
                    let i = heap.instances.get(r.index);
                    (i.class, i.fields.iter().collect::<Vec<_>>())
                };
                mark_object(heap, gray, ObjRef::new(ObjKind::Class, class));
                for (key, value) in fields {
                    mark_object(heap, gray, ObjRef::new(ObjKind::Str, key));
                    if let Some(vr) = value.as_object() {
                        mark_object(heap, gray, vr);
                    }
                }
            }
            ObjKind::Bound => {
                let (receiver, method) = {
                    let b = heap.bounds.get(r.index);
                    (b.receiver, b.method)
                };
                if let Some(rr) = receiver.as_object() {
                    mark_object(heap, gray, rr);
                }
                mark_object(heap, gray, ObjRef::new(ObjKind::Closure, method));
            }
        }
    }
}
