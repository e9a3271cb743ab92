//! Heap object layer: the payload types that live inside the VM's [`crate::heap::Heap`]
//! arenas, plus the type-erased [`ObjRef`] handle used wherever a [`crate::value::Value`]
//! needs to point at one of them.
//!
//! Every handle is a small index into a per-kind arena rather than a pointer, so the
//! collector is free to move or reuse storage without invalidating anything a live
//! Rust reference holds on to (see [`crate::heap`]).

use crate::chunk::Chunk;
use crate::table::Table;
use crate::value::Value;
use std::rc::Rc;

/// Discriminant for the kind of object an [`ObjRef`] points at.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Hash)]
#[repr(u8)]
pub enum ObjKind {
    Str = 0,
    Func = 1,
    Native = 2,
    Closure = 3,
    Class = 4,
    Instance = 5,
    Bound = 6,
}

/// A generationless handle into one of the heap's per-kind arenas: a tag plus
/// a small-integer index, never a raw pointer.
#[derive(Copy, Clone, PartialEq, Eq, Hash)]
pub struct ObjRef {
    pub kind: ObjKind,
    pub index: u32,
}

impl ObjRef {
    pub fn new(kind: ObjKind, index: u32) -> Self {
        Self { kind, index }
    }
}

impl std::fmt::Debug for ObjRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}({})", self.kind, self.index)
    }
}

/// Index into the string arena. Tables and name fields reference strings by
/// this bare index rather than a full [`ObjRef`] since the kind is implied.
pub type StrId = u32;
pub type FuncId = u32;
pub type NativeId = u32;
pub type ClosureId = u32;
pub type UpvalueId = u32;
pub type ClassId = u32;
pub type InstanceId = u32;
pub type BoundId = u32;

/// Interned string: length, FNV-1a hash, and bytes. `Rc<str>` backs the bytes
/// so a `&str` can be borrowed out independent of the arena's own borrow.
pub struct StrObj {
    pub hash: u32,
    pub chars: Rc<str>,
}

impl StrObj {
    pub fn as_str(&self) -> &str {
        &self.chars
    }
}

/// A compiled function body: arity, captured-upvalue count, optional name
/// (top-level script bodies are anonymous), and its owned [`Chunk`].
pub struct FuncObj {
    pub arity: u8,
    pub upvalue_count: u8,
    pub name: Option<StrId>,
    pub chunk: Chunk,
}

impl FuncObj {
    pub fn new(name: Option<StrId>) -> Self {
        Self { arity: 0, upvalue_count: 0, name, chunk: Chunk::new() }
    }
}

/// Natives get read-only heap access (to resolve strings/instances in their
/// arguments) but never a mutable borrow — they run synchronously inside a
/// single dispatch step and must not themselves allocate or call back into
/// `interpret`.
pub type NativeFn = Rc<dyn Fn(&crate::heap::Heap, &[Value]) -> Result<Value, String>>;

/// A host-provided builtin. Carries its own name (mostly for error messages
/// and `Display`) and the closure invoked by `OpCall`.
pub struct NativeObj {
    pub name: StrId,
    pub arity: Option<u8>,
    pub func: NativeFn,
}

/// A variable captured by a nested function. While the captured stack slot
/// is still live the upvalue is `Open`, identified by its stack index rather
/// than a raw address (see design note on pointer-free upvalues); once the
/// slot leaves scope it becomes `Closed`, owning the value directly.
pub enum UpvalueState {
    Open(usize),
    Closed(Value),
}

pub struct UpvalueObj {
    pub state: UpvalueState,
}

/// A callable pairing a compiled [`FuncObj`] with the upvalues it captured
/// at the point `OpClosure` ran.
pub struct ClosureObj {
    pub function: FuncId,
    pub upvalues: Vec<UpvalueId>,
}

/// A class: its name, its method table (name -> `Value::Object(Closure)`),
/// and a cache of the `init` method's handle so instance construction does
/// not need to probe the method table by name on every call.
pub struct ClassObj {
    pub name: StrId,
    pub methods: Table,
    pub init: Option<ClosureId>,
}

impl ClassObj {
    pub fn new(name: StrId) -> Self {
        Self { name, methods: Table::new(), init: None }
    }
}

/// An instance of a class: a back-reference to the class and a per-instance
/// field table, both consulted by `OpGetProperty`/`OpSetField`.
pub struct InstanceObj {
    pub class: ClassId,
    pub fields: Table,
}

impl InstanceObj {
    pub fn new(class: ClassId) -> Self {
        Self { class, fields: Table::new() }
    }
}

/// A method closure bound to the receiver it was looked up on, produced by
/// `OpGetProperty` when the name resolves to a method rather than a field.
pub struct BoundMethodObj {
    pub receiver: Value,
    pub method: ClosureId,
}
