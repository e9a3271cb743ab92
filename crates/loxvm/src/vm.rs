//! The bytecode interpreter proper: call-frame/value stacks, the dispatch
//! loop, and every runtime operation an `OpCode` can trigger (arithmetic,
//! globals, closures/upvalues, classes, and native calls).

use std::cell::RefCell;
use std::io::Write;
use std::rc::Rc;

use crate::chunk::OpCode;
use crate::compiler;
use crate::config::VmOptions;
use crate::error::{InterpretError, InterpretResult, RuntimeError};
use crate::gc::{self, GcRoots};
use crate::heap::Heap;
use crate::native;
use crate::object::{
    BoundMethodObj, ClassObj, ClosureId, ClosureObj, FuncId, InstanceObj, NativeFn, ObjKind, ObjRef,
    StrId, UpvalueId, UpvalueObj, UpvalueState,
};
use crate::print::format_value;
use crate::table::Table;
use crate::value::Value;

struct CallFrame {
    closure: ClosureId,
    ip: usize,
    /// Index into `Vm::stack` of this frame's slot 0 (the called closure
    /// itself, or `this` for a bound method call).
    slot_base: usize,
}

/// Where `OpPrint` writes. Defaults to stdout; tests swap in a shared buffer
/// so end-to-end scenarios can assert on exactly what a program printed
/// without shelling out to a subprocess.
#[derive(Clone)]
pub enum PrintSink {
    Stdout,
    Buffer(Rc<RefCell<Vec<u8>>>),
}

impl PrintSink {
    fn write_line(&self, text: &str) {
        match self {
            PrintSink::Stdout => println!("{text}"),
            PrintSink::Buffer(buf) => {
                let mut buf = buf.borrow_mut();
                let _ = writeln!(buf, "{text}");
            }
        }
    }
}

/// A single Lox interpreter instance: its own heap, globals, and call stack.
/// Nothing here is shared across instances, so two `Vm`s can run concurrently.
pub struct Vm {
    heap: Heap,
    stack: Vec<Value>,
    frames: Vec<CallFrame>,
    globals: Table,
    /// Upvalues still pointing at a live stack slot. Unordered: both
    /// `capture_upvalue` and `close_upvalues` scan the whole list, so there's
    /// no invariant to maintain beyond "every open upvalue appears once".
    open_upvalues: Vec<UpvalueId>,
    init_string: StrId,
    options: VmOptions,
    output: PrintSink,
}

impl Vm {
    pub fn new(options: VmOptions) -> Self {
        Self::with_output(options, PrintSink::Stdout)
    }

    /// Construct a `Vm` that writes `print` output to `output` instead of
    /// stdout. Exists so tests can assert on exactly what a program printed.
    pub fn with_output(options: VmOptions, output: PrintSink) -> Self {
        let mut heap = Heap::new(options.initial_gc_threshold);
        let init_string = heap.intern("init");
        let mut vm = Self {
            heap,
            stack: Vec::with_capacity(options.stack_capacity()),
            frames: Vec::with_capacity(options.frame_capacity),
            globals: Table::new(),
            open_upvalues: Vec::new(),
            init_string,
            options,
            output,
        };
        vm.define_native("clock", Some(0), Rc::new(native::clock));
        vm.define_native("has_field", Some(2), Rc::new(native::has_field));
        vm
    }

    pub fn define_native(&mut self, name: &str, arity: Option<u8>, func: NativeFn) {
        let name_id = self.heap.intern(name);
        let native_id = self.heap.alloc_native(crate::object::NativeObj { name: name_id, arity, func });
        let hash = self.heap.strings.get(name_id).hash;
        self.globals.insert(name_id, hash, Value::object(ObjRef::new(ObjKind::Native, native_id)));
    }

    pub fn interpret(&mut self, source: &str) -> InterpretResult {
        let func_id = compiler::compile(source, &mut self.heap).map_err(InterpretError::Compile)?;
        let closure_id = self.heap.alloc_closure(ClosureObj { function: func_id, upvalues: Vec::new() });
        self.stack.push(Value::object(ObjRef::new(ObjKind::Closure, closure_id)));
        self.frames.push(CallFrame { closure: closure_id, ip: 0, slot_base: 0 });
        let result = self.run();
        if result.is_err() {
            // A runtime error unwinds past however many frames were active;
            // leaving them would corrupt slot_base bookkeeping for whatever
            // the embedder runs next.
            self.stack.clear();
            self.frames.clear();
            self.open_upvalues.clear();
        }
        result
    }

    // ----- dispatch loop -------------------------------------------------

    fn run(&mut self) -> InterpretResult {
        loop {
            let frame_index = self.frames.len() - 1;
            let closure = self.frames[frame_index].closure;
            let function = self.heap.closures.get(closure).function;

            #[cfg(feature = "trace")]
            {
                let ip = self.frames[frame_index].ip;
                crate::disasm::disassemble_instruction(&self.heap.functions.get(function).chunk, ip, &self.heap);
            }

            let byte = self.read_byte(frame_index, function);
            let op = OpCode::from_u8(byte);

            match op {
                OpCode::Constant => {
                    let idx = self.read_byte(frame_index, function);
                    let value = self.heap.functions.get(function).chunk.constants[idx as usize];
                    self.stack.push(value);
                }
                OpCode::Nil => self.stack.push(Value::nil()),
                OpCode::True => self.stack.push(Value::bool(true)),
                OpCode::False => self.stack.push(Value::bool(false)),
                OpCode::Pop => {
                    self.stack.pop();
                }
                OpCode::ReadLocal => {
                    let slot = self.read_byte(frame_index, function) as usize;
                    let slot_base = self.frames[frame_index].slot_base;
                    self.stack.push(self.stack[slot_base + slot]);
                }
                OpCode::AssignLocal => {
                    let slot = self.read_byte(frame_index, function) as usize;
                    let slot_base = self.frames[frame_index].slot_base;
                    self.stack[slot_base + slot] = *self.stack.last().unwrap();
                }
                OpCode::ReadUpvalue => {
                    let slot = self.read_byte(frame_index, function);
                    let value = self.read_upvalue(closure, slot);
                    self.stack.push(value);
                }
                OpCode::AssignUpvalue => {
                    let slot = self.read_byte(frame_index, function);
                    let value = *self.stack.last().unwrap();
                    self.write_upvalue(closure, slot, value);
                }
                OpCode::ReadGlobal => {
                    let name_id = self.read_name(frame_index, function);
                    let hash = self.heap.strings.get(name_id).hash;
                    match self.globals.get(name_id, hash) {
                        Some(v) => self.stack.push(v),
                        None => return Err(self.undefined_variable(name_id)),
                    }
                }
                OpCode::DefineGlobal => {
                    let name_id = self.read_name(frame_index, function);
                    let hash = self.heap.strings.get(name_id).hash;
                    let value = self.stack.pop().unwrap();
                    self.globals.insert(name_id, hash, value);
                }
                OpCode::AssignGlobal => {
                    let name_id = self.read_name(frame_index, function);
                    let hash = self.heap.strings.get(name_id).hash;
                    let value = *self.stack.last().unwrap();
                    if !self.globals.contains(name_id, hash) {
                        return Err(self.undefined_variable(name_id));
                    }
                    self.globals.insert(name_id, hash, value);
                }
                OpCode::GetProperty => {
                    let name_id = self.read_name(frame_index, function);
                    if let Err(e) = self.get_property(name_id) {
                        return Err(self.runtime_error(e));
                    }
                }
                OpCode::SetField => {
                    let name_id = self.read_name(frame_index, function);
                    if let Err(e) = self.set_field(name_id) {
                        return Err(self.runtime_error(e));
                    }
                }
                OpCode::GetSuper => {
                    let name_id = self.read_name(frame_index, function);
                    let superclass = self.stack.pop().unwrap();
                    let class_id = match superclass.as_object().filter(|r| r.kind == ObjKind::Class) {
                        Some(r) => r.index,
                        None => return Err(self.runtime_error("Superclass must be a class.")),
                    };
                    if let Err(e) = self.bind_method(class_id, name_id) {
                        return Err(self.runtime_error(e));
                    }
                }
                OpCode::Equal => {
                    let b = self.stack.pop().unwrap();
                    let a = self.stack.pop().unwrap();
                    self.stack.push(Value::bool(a == b));
                }
                OpCode::Greater => {
                    if let Err(e) = self.number_binary(|a, b| Value::bool(a > b)) {
                        return Err(self.runtime_error(e));
                    }
                }
                OpCode::Less => {
                    if let Err(e) = self.number_binary(|a, b| Value::bool(a < b)) {
                        return Err(self.runtime_error(e));
                    }
                }
                OpCode::Add => {
                    if let Err(e) = self.add() {
                        return Err(self.runtime_error(e));
                    }
                }
                OpCode::Subtract => {
                    if let Err(e) = self.number_binary(|a, b| Value::number(a - b)) {
                        return Err(self.runtime_error(e));
                    }
                }
                OpCode::Multiply => {
                    if let Err(e) = self.number_binary(|a, b| Value::number(a * b)) {
                        return Err(self.runtime_error(e));
                    }
                }
                OpCode::Divide => {
                    if let Err(e) = self.number_binary(|a, b| Value::number(a / b)) {
                        return Err(self.runtime_error(e));
                    }
                }
                OpCode::Not => {
                    let v = self.stack.pop().unwrap();
                    self.stack.push(Value::bool(v.is_falsey()));
                }
                OpCode::Negate => {
                    let v = *self.stack.last().unwrap();
                    match v.as_number() {
                        Some(n) => {
                            self.stack.pop();
                            self.stack.push(Value::number(-n));
                        }
                        None => return Err(self.runtime_error("Operand must be a number.")),
                    }
                }
                OpCode::Print => {
                    let v = self.stack.pop().unwrap();
                    let text = format_value(v, &self.heap);
                    self.output.write_line(&text);
                }
                OpCode::Jump => {
                    let offset = self.read_u16(frame_index, function);
                    self.frames[frame_index].ip += offset as usize;
                }
                OpCode::JumpIfFalse => {
                    let offset = self.read_u16(frame_index, function);
                    if self.stack.last().unwrap().is_falsey() {
                        self.frames[frame_index].ip += offset as usize;
                    }
                }
                OpCode::Loop => {
                    let offset = self.read_u16(frame_index, function);
                    self.frames[frame_index].ip -= offset as usize;
                }
                OpCode::Call => {
                    let arg_count = self.read_byte(frame_index, function);
                    let callee = self.stack[self.stack.len() - 1 - arg_count as usize];
                    if let Err(e) = self.call_value(callee, arg_count) {
                        return Err(self.runtime_error(e));
                    }
                }
                OpCode::Invoke => {
                    let name_id = self.read_name(frame_index, function);
                    let arg_count = self.read_byte(frame_index, function);
                    if let Err(e) = self.invoke(name_id, arg_count) {
                        return Err(self.runtime_error(e));
                    }
                }
                OpCode::SuperInvoke => {
                    let name_id = self.read_name(frame_index, function);
                    let arg_count = self.read_byte(frame_index, function);
                    let superclass = self.stack.pop().unwrap();
                    let class_id = match superclass.as_object().filter(|r| r.kind == ObjKind::Class) {
                        Some(r) => r.index,
                        None => return Err(self.runtime_error("Superclass must be a class.")),
                    };
                    if let Err(e) = self.invoke_from_class(class_id, name_id, arg_count) {
                        return Err(self.runtime_error(e));
                    }
                }
                OpCode::Closure => {
                    let idx = self.read_byte(frame_index, function);
                    let value = self.heap.functions.get(function).chunk.constants[idx as usize];
                    let func_id = value.as_object().unwrap().index;
                    let upvalue_count = self.heap.functions.get(func_id).upvalue_count;
                    let slot_base = self.frames[frame_index].slot_base;
                    let mut upvalues = Vec::with_capacity(upvalue_count as usize);
                    for _ in 0..upvalue_count {
                        let is_local = self.read_byte(frame_index, function) != 0;
                        let index = self.read_byte(frame_index, function);
                        if is_local {
                            upvalues.push(self.capture_upvalue(slot_base + index as usize));
                        } else {
                            upvalues.push(self.heap.closures.get(closure).upvalues[index as usize]);
                        }
                    }
                    let closure_id = self.heap.alloc_closure(ClosureObj { function: func_id, upvalues });
                    self.stack.push(Value::object(ObjRef::new(ObjKind::Closure, closure_id)));
                    self.collect_if_needed();
                }
                OpCode::CloseUpvalue => {
                    self.close_upvalues(self.stack.len() - 1);
                    self.stack.pop();
                }
                OpCode::Return => {
                    let result = self.stack.pop().unwrap();
                    let frame = self.frames.pop().unwrap();
                    self.close_upvalues(frame.slot_base);
                    self.stack.truncate(frame.slot_base);
                    if self.frames.is_empty() {
                        return Ok(());
                    }
                    self.stack.push(result);
                }
                OpCode::Class => {
                    let name_id = self.read_name(frame_index, function);
                    let class_id = self.heap.alloc_class(ClassObj::new(name_id));
                    self.stack.push(Value::object(ObjRef::new(ObjKind::Class, class_id)));
                    self.collect_if_needed();
                }
                OpCode::Inherit => {
                    if let Err(e) = self.inherit() {
                        return Err(self.runtime_error(e));
                    }
                }
                OpCode::Method => {
                    let name_id = self.read_name(frame_index, function);
                    self.define_method(name_id);
                }
            }
        }
    }

    // ----- operand decoding ----------------------------------------------

    fn read_byte(&mut self, frame_index: usize, function: FuncId) -> u8 {
        let ip = self.frames[frame_index].ip;
        let byte = self.heap.functions.get(function).chunk.code[ip];
        self.frames[frame_index].ip += 1;
        byte
    }

    fn read_u16(&mut self, frame_index: usize, function: FuncId) -> u16 {
        let hi = self.read_byte(frame_index, function);
        let lo = self.read_byte(frame_index, function);
        u16::from_be_bytes([hi, lo])
    }

    /// Read a one-byte constant index and return the `StrId` it names.
    /// Every opcode that carries a name operand (globals, properties,
    /// methods, invoke) points at an already-interned string constant.
    fn read_name(&mut self, frame_index: usize, function: FuncId) -> StrId {
        let idx = self.read_byte(frame_index, function);
        let value = self.heap.functions.get(function).chunk.constants[idx as usize];
        value.as_object().expect("name constant must be a string").index
    }

    // ----- arithmetic / comparison ----------------------------------------

    fn number_binary(&mut self, f: impl Fn(f64, f64) -> Value) -> Result<(), String> {
        let b = *self.stack.last().unwrap();
        let a = self.stack[self.stack.len() - 2];
        match (a.as_number(), b.as_number()) {
            (Some(x), Some(y)) => {
                self.stack.pop();
                self.stack.pop();
                self.stack.push(f(x, y));
                Ok(())
            }
            _ => Err("Operands must be numbers.".to_string()),
        }
    }

    fn add(&mut self) -> Result<(), String> {
        let b = *self.stack.last().unwrap();
        let a = self.stack[self.stack.len() - 2];
        if let (Some(x), Some(y)) = (a.as_number(), b.as_number()) {
            self.stack.pop();
            self.stack.pop();
            self.stack.push(Value::number(x + y));
            return Ok(());
        }
        if a.is_object_kind(ObjKind::Str) && b.is_object_kind(ObjKind::Str) {
            let sa = self.heap.strings.get(a.as_object().unwrap().index).as_str().to_string();
            let sb = self.heap.strings.get(b.as_object().unwrap().index).as_str().to_string();
            self.stack.pop();
            self.stack.pop();
            let id = self.heap.intern(&(sa + &sb));
            self.stack.push(Value::object(self.heap.str_ref(id)));
            self.collect_if_needed();
            return Ok(());
        }
        Err("Operands must be two numbers or two strings.".to_string())
    }

    // ----- calls -----------------------------------------------------------

    fn call_value(&mut self, callee: Value, arg_count: u8) -> Result<(), String> {
        match callee.as_object() {
            Some(r) if r.kind == ObjKind::Closure => self.call_closure(r.index, arg_count),
            Some(r) if r.kind == ObjKind::Native => self.call_native(r.index, arg_count),
            Some(r) if r.kind == ObjKind::Class => self.call_class(r.index, arg_count),
            Some(r) if r.kind == ObjKind::Bound => self.call_bound(r.index, arg_count),
            _ => Err("Can only call functions and classes.".to_string()),
        }
    }

    fn call_closure(&mut self, closure_id: ClosureId, arg_count: u8) -> Result<(), String> {
        let function = self.heap.closures.get(closure_id).function;
        let arity = self.heap.functions.get(function).arity;
        if arg_count != arity {
            return Err(format!("Expected {arity} arguments but got {arg_count}."));
        }
        if self.frames.len() >= self.options.frame_capacity {
            return Err("Stack overflow.".to_string());
        }
        let slot_base = self.stack.len() - arg_count as usize - 1;
        self.frames.push(CallFrame { closure: closure_id, ip: 0, slot_base });
        Ok(())
    }

    fn call_native(&mut self, native_id: crate::object::NativeId, arg_count: u8) -> Result<(), String> {
        let native = self.heap.natives.get(native_id);
        if let Some(arity) = native.arity {
            if arity != arg_count {
                return Err(format!("Expected {arity} arguments but got {arg_count}."));
            }
        }
        let func = native.func.clone();
        let start = self.stack.len() - arg_count as usize;
        let args: Vec<Value> = self.stack[start..].to_vec();
        let result = func(&self.heap, &args)?;
        self.stack.truncate(start - 1);
        self.stack.push(result);
        Ok(())
    }

    fn call_class(&mut self, class_id: crate::object::ClassId, arg_count: u8) -> Result<(), String> {
        let instance_id = self.heap.alloc_instance(InstanceObj::new(class_id));
        let callee_slot = self.stack.len() - arg_count as usize - 1;
        self.stack[callee_slot] = Value::object(ObjRef::new(ObjKind::Instance, instance_id));
        self.collect_if_needed();
        match self.heap.classes.get(class_id).init {
            Some(init) => self.call_closure(init, arg_count),
            None if arg_count != 0 => Err(format!("Expected 0 arguments but got {arg_count}.")),
            None => Ok(()),
        }
    }

    fn call_bound(&mut self, bound_id: crate::object::BoundId, arg_count: u8) -> Result<(), String> {
        let (receiver, method) = {
            let b = self.heap.bounds.get(bound_id);
            (b.receiver, b.method)
        };
        let callee_slot = self.stack.len() - arg_count as usize - 1;
        self.stack[callee_slot] = receiver;
        self.call_closure(method, arg_count)
    }

    // ----- properties / methods --------------------------------------------

    fn get_property(&mut self, name_id: StrId) -> Result<(), String> {
        let instance = *self.stack.last().unwrap();
        let instance_ref = match instance.as_object().filter(|r| r.kind == ObjKind::Instance) {
            Some(r) => r,
            None => return Err("Only instances have properties.".to_string()),
        };
        let hash = self.heap.strings.get(name_id).hash;
        let field = self.heap.instances.get(instance_ref.index).fields.get(name_id, hash);
        if let Some(value) = field {
            self.stack.pop();
            self.stack.push(value);
            return Ok(());
        }
        let class_id = self.heap.instances.get(instance_ref.index).class;
        self.bind_method(class_id, name_id)
    }

    fn set_field(&mut self, name_id: StrId) -> Result<(), String> {
        let value = self.stack.pop().unwrap();
        let instance = self.stack.pop().unwrap();
        let instance_ref = match instance.as_object().filter(|r| r.kind == ObjKind::Instance) {
            Some(r) => r,
            None => return Err("Only instances have fields.".to_string()),
        };
        let hash = self.heap.strings.get(name_id).hash;
        self.heap.instances.get_mut(instance_ref.index).fields.insert(name_id, hash, value);
        self.stack.push(value);
        Ok(())
    }

    /// Look up `name` as a method on `class_id`, bind it to the receiver
    /// currently on top of the stack, and replace it there with the bound
    /// method. Used by `OpGetProperty` (field miss) and `OpGetSuper`.
    fn bind_method(&mut self, class_id: crate::object::ClassId, name_id: StrId) -> Result<(), String> {
        let hash = self.heap.strings.get(name_id).hash;
        let method = self.heap.classes.get(class_id).methods.get(name_id, hash);
        let method_closure = match method.and_then(|v| v.as_object()) {
            Some(r) => r.index,
            None => {
                let name = self.heap.strings.get(name_id).as_str().to_string();
                return Err(format!("Undefined property '{name}'."));
            }
        };
        let receiver = self.stack.pop().unwrap();
        let bound_id = self.heap.alloc_bound(BoundMethodObj { receiver, method: method_closure });
        self.stack.push(Value::object(ObjRef::new(ObjKind::Bound, bound_id)));
        self.collect_if_needed();
        Ok(())
    }

    fn invoke(&mut self, name_id: StrId, arg_count: u8) -> Result<(), String> {
        let receiver_slot = self.stack.len() - arg_count as usize - 1;
        let receiver = self.stack[receiver_slot];
        let instance_ref = match receiver.as_object().filter(|r| r.kind == ObjKind::Instance) {
            Some(r) => r,
            None => return Err("Only instances have methods.".to_string()),
        };
        let hash = self.heap.strings.get(name_id).hash;
        let field = self.heap.instances.get(instance_ref.index).fields.get(name_id, hash);
        if let Some(value) = field {
            self.stack[receiver_slot] = value;
            return self.call_value(value, arg_count);
        }
        let class_id = self.heap.instances.get(instance_ref.index).class;
        self.invoke_from_class(class_id, name_id, arg_count)
    }

    fn invoke_from_class(
        &mut self,
        class_id: crate::object::ClassId,
        name_id: StrId,
        arg_count: u8,
    ) -> Result<(), String> {
        let hash = self.heap.strings.get(name_id).hash;
        let method = self.heap.classes.get(class_id).methods.get(name_id, hash);
        let closure_id = match method.and_then(|v| v.as_object()) {
            Some(r) => r.index,
            None => {
                let name = self.heap.strings.get(name_id).as_str().to_string();
                return Err(format!("Undefined property '{name}'."));
            }
        };
        self.call_closure(closure_id, arg_count)
    }

    fn inherit(&mut self) -> Result<(), String> {
        let subclass_val = *self.stack.last().unwrap();
        let superclass_val = self.stack[self.stack.len() - 2];
        let super_ref = match superclass_val.as_object().filter(|r| r.kind == ObjKind::Class) {
            Some(r) => r,
            None => return Err("Superclass must be a class.".to_string()),
        };
        let sub_id = subclass_val.as_object().unwrap().index;
        let methods: Vec<(StrId, Value)> = self.heap.classes.get(super_ref.index).methods.iter().collect();
        for (key, value) in methods {
            let hash = self.heap.strings.get(key).hash;
            self.heap.classes.get_mut(sub_id).methods.insert(key, hash, value);
        }
        // The `init` cache isn't part of the method table, so a subclass
        // that doesn't define its own `init` would otherwise construct with
        // no initializer at all.
        let super_init = self.heap.classes.get(super_ref.index).init;
        self.heap.classes.get_mut(sub_id).init = super_init;
        self.stack.pop();
        Ok(())
    }

    fn define_method(&mut self, name_id: StrId) {
        let method_val = self.stack.pop().unwrap();
        let closure_id = method_val.as_object().unwrap().index;
        let class_val = *self.stack.last().unwrap();
        let class_id = class_val.as_object().unwrap().index;
        let hash = self.heap.strings.get(name_id).hash;
        self.heap.classes.get_mut(class_id).methods.insert(name_id, hash, method_val);
        if name_id == self.init_string {
            self.heap.classes.get_mut(class_id).init = Some(closure_id);
        }
    }

    // ----- upvalues ----------------------------------------------------------

    fn read_upvalue(&self, closure_id: ClosureId, slot: u8) -> Value {
        let up_id = self.heap.closures.get(closure_id).upvalues[slot as usize];
        match self.heap.upvalues.get(up_id).state {
            UpvalueState::Open(idx) => self.stack[idx],
            UpvalueState::Closed(v) => v,
        }
    }

    fn write_upvalue(&mut self, closure_id: ClosureId, slot: u8, value: Value) {
        let up_id = self.heap.closures.get(closure_id).upvalues[slot as usize];
        match self.heap.upvalues.get(up_id).state {
            UpvalueState::Open(idx) => self.stack[idx] = value,
            UpvalueState::Closed(_) => self.heap.upvalues.get_mut(up_id).state = UpvalueState::Closed(value),
        }
    }

    fn capture_upvalue(&mut self, stack_index: usize) -> UpvalueId {
        for &id in &self.open_upvalues {
            if let UpvalueState::Open(idx) = self.heap.upvalues.get(id).state {
                if idx == stack_index {
                    return id;
                }
            }
        }
        let id = self.heap.alloc_upvalue(UpvalueObj { state: UpvalueState::Open(stack_index) });
        self.open_upvalues.push(id);
        self.collect_if_needed();
        id
    }

    /// Close every open upvalue pointing at or above `from`, copying the
    /// stack slot's current value into the upvalue itself.
    fn close_upvalues(&mut self, from: usize) {
        let mut i = 0;
        while i < self.open_upvalues.len() {
            let id = self.open_upvalues[i];
            let idx = match self.heap.upvalues.get(id).state {
                UpvalueState::Open(idx) => idx,
                UpvalueState::Closed(_) => {
                    i += 1;
                    continue;
                }
            };
            if idx >= from {
                let value = self.stack[idx];
                self.heap.upvalues.get_mut(id).state = UpvalueState::Closed(value);
                self.open_upvalues.swap_remove(i);
            } else {
                i += 1;
            }
        }
    }

    // ----- GC ---------------------------------------------------------------

    /// Called right after every allocation that can grow the heap, once the
    /// new object is already reachable from a root (pushed on the stack,
    /// linked into `open_upvalues`, or installed into an already-reachable
    /// container). The compiler never calls this — see `DESIGN.md`.
    fn collect_if_needed(&mut self) {
        if !self.heap.should_collect(self.options.stress_gc) {
            return;
        }
        let frame_closures: Vec<ClosureId> = self.frames.iter().map(|f| f.closure).collect();
        let roots = GcRoots {
            stack: &self.stack,
            frame_closures: &frame_closures,
            open_upvalues: &self.open_upvalues,
            globals: &self.globals,
            init_string: Some(self.init_string),
            compiler_roots: &[],
        };
        gc::collect(&mut self.heap, &roots);
        self.heap.grow_threshold(self.options.gc_heap_grow_factor);
    }

    // ----- errors -------------------------------------------------------------

    fn build_trace(&self) -> Vec<String> {
        self.frames
            .iter()
            .rev()
            .map(|frame| {
                let function = self.heap.closures.get(frame.closure).function;
                let func_obj = self.heap.functions.get(function);
                let line = func_obj.chunk.line_for(frame.ip.saturating_sub(1));
                let name = match func_obj.name {
                    Some(n) => format!("{}()", self.heap.strings.get(n).as_str()),
                    None => "script".to_string(),
                };
                format!("[line {line}] in {name}")
            })
            .collect()
    }

    fn runtime_error(&mut self, message: impl Into<String>) -> InterpretError {
        InterpretError::Runtime(RuntimeError::new(message, self.build_trace()))
    }

    fn undefined_variable(&mut self, name_id: StrId) -> InterpretError {
        let name = self.heap.strings.get(name_id).as_str().to_string();
        self.runtime_error(format!("Undefined variable '{name}'."))
    }
}

impl Default for Vm {
    fn default() -> Self {
        Self::new(VmOptions::default())
    }
}
