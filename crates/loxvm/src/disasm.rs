//! Bytecode disassembler, ported from the reference interpreter's `debug.c`.
//! Always compiled in (the `dump-bytecode` CLI subcommand needs it
//! unconditionally); the VM's per-instruction execution trace additionally
//! calls into `disassemble_instruction` on every dispatch step, but only
//! when built with the `trace` feature.

use crate::chunk::{Chunk, OpCode};
use crate::heap::Heap;
use crate::print::format_value;

pub fn disassemble_chunk(chunk: &Chunk, name: &str, heap: &Heap) {
    println!("== {name} ==");
    let mut offset = 0;
    while offset < chunk.len() {
        offset = disassemble_instruction(chunk, offset, heap);
    }
}

/// Print one instruction at `offset` and return the offset of the next one.
pub fn disassemble_instruction(chunk: &Chunk, offset: usize, heap: &Heap) -> usize {
    print!("{offset:04} ");
    if offset > 0 && chunk.line_for(offset) == chunk.line_for(offset - 1) {
        print!("   | ");
    } else {
        print!("{:4} ", chunk.line_for(offset));
    }

    let op = OpCode::from_u8(chunk.code[offset]);
    match op {
        OpCode::Constant => constant_instruction("OP_CONSTANT", chunk, offset, heap),
        OpCode::Nil => simple_instruction("OP_NIL", offset),
        OpCode::True => simple_instruction("OP_TRUE", offset),
        OpCode::False => simple_instruction("OP_FALSE", offset),
        OpCode::Pop => simple_instruction("OP_POP", offset),
        OpCode::ReadLocal => byte_instruction("OP_READ_LOCAL", chunk, offset),
        OpCode::AssignLocal => byte_instruction("OP_ASSIGN_LOCAL", chunk, offset),
        OpCode::ReadUpvalue => byte_instruction("OP_READ_UPVALUE", chunk, offset),
        OpCode::AssignUpvalue => byte_instruction("OP_ASSIGN_UPVALUE", chunk, offset),
        OpCode::ReadGlobal => constant_instruction("OP_READ_GLOBAL", chunk, offset, heap),
        OpCode::DefineGlobal => constant_instruction("OP_DEFINE_GLOBAL", chunk, offset, heap),
        OpCode::AssignGlobal => constant_instruction("OP_ASSIGN_GLOBAL", chunk, offset, heap),
        OpCode::GetProperty => constant_instruction("OP_GET_PROPERTY", chunk, offset, heap),
        OpCode::SetField => constant_instruction("OP_SET_FIELD", chunk, offset, heap),
        OpCode::GetSuper => constant_instruction("OP_GET_SUPER", chunk, offset, heap),
        OpCode::Equal => simple_instruction("OP_EQUAL", offset),
        OpCode::Greater => simple_instruction("OP_GREATER", offset),
        OpCode::Less => simple_instruction("OP_LESS", offset),
        OpCode::Add => simple_instruction("OP_ADD", offset),
        OpCode::Subtract => simple_instruction("OP_SUBTRACT", offset),
        OpCode::Multiply => simple_instruction("OP_MULTIPLY", offset),
        OpCode::Divide => simple_instruction("OP_DIVIDE", offset),
        OpCode::Not => simple_instruction("OP_NOT", offset),
        OpCode::Negate => simple_instruction("OP_NEGATE", offset),
        OpCode::Print => simple_instruction("OP_PRINT", offset),
        OpCode::Jump => jump_instruction("OP_JUMP", 1, chunk, offset),
        OpCode::JumpIfFalse => jump_instruction("OP_JUMP_IF_FALSE", 1, chunk, offset),
        OpCode::Loop => jump_instruction("OP_LOOP", -1, chunk, offset),
        OpCode::Call => byte_instruction("OP_CALL", chunk, offset),
        OpCode::Invoke => invoke_instruction("OP_INVOKE", chunk, offset, heap),
        OpCode::SuperInvoke => invoke_instruction("OP_SUPER_INVOKE", chunk, offset, heap),
        OpCode::Closure => return closure_instruction(chunk, offset, heap),
        OpCode::CloseUpvalue => simple_instruction("OP_CLOSE_UPVALUE", offset),
        OpCode::Return => simple_instruction("OP_RETURN", offset),
        OpCode::Class => constant_instruction("OP_CLASS", chunk, offset, heap),
        OpCode::Inherit => simple_instruction("OP_INHERIT", offset),
        OpCode::Method => constant_instruction("OP_METHOD", chunk, offset, heap),
    }
}

fn simple_instruction(name: &str, offset: usize) -> usize {
    println!("{name}");
    offset + 1
}

fn byte_instruction(name: &str, chunk: &Chunk, offset: usize) -> usize {
    let slot = chunk.code[offset + 1];
    println!("{name:-16} {slot:4}");
    offset + 2
}

fn constant_instruction(name: &str, chunk: &Chunk, offset: usize, heap: &Heap) -> usize {
    let idx = chunk.code[offset + 1];
    let value = chunk.constants[idx as usize];
    println!("{name:-16} {idx:4} '{}'", format_value(value, heap));
    offset + 2
}

fn invoke_instruction(name: &str, chunk: &Chunk, offset: usize, heap: &Heap) -> usize {
    let idx = chunk.code[offset + 1];
    let argc = chunk.code[offset + 2];
    let value = chunk.constants[idx as usize];
    println!("{name:-16} ({argc} args) {idx:4} '{}'", format_value(value, heap));
    offset + 3
}

fn jump_instruction(name: &str, sign: i32, chunk: &Chunk, offset: usize) -> usize {
    let jump = u16::from_be_bytes([chunk.code[offset + 1], chunk.code[offset + 2]]) as i32;
    let target = offset as i32 + 3 + sign * jump;
    println!("{name:-16} {offset:4} -> {target}");
    offset + 3
}

fn closure_instruction(chunk: &Chunk, offset: usize, heap: &Heap) -> usize {
    let idx = chunk.code[offset + 1];
    let value = chunk.constants[idx as usize];
    println!("{:-16} {idx:4} '{}'", "OP_CLOSURE", format_value(value, heap));
    let mut next = offset + 2;
    if let Some(r) = value.as_object() {
        if r.kind == crate::object::ObjKind::Func {
            let upvalue_count = heap.functions.get(r.index).upvalue_count;
            for _ in 0..upvalue_count {
                let is_local = chunk.code[next];
                let index = chunk.code[next + 1];
                println!(
                    "{next:04}    |                     {} {index}",
                    if is_local != 0 { "local" } else { "upvalue" }
                );
                next += 2;
            }
        }
    }
    next
}
