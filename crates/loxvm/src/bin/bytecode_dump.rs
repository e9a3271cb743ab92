//! Compile a source file and print its disassembled chunks without running
//! them: the top-level script, then every nested function found in a
//! chunk's constant pool, recursively.

use loxvm::config::VmOptions;
use loxvm::disasm::disassemble_chunk;
use loxvm::heap::Heap;
use loxvm::object::{FuncId, ObjKind};
use std::env;
use std::fs;
use std::process::ExitCode;

fn main() -> ExitCode {
    let args: Vec<String> = env::args().collect();
    if args.len() != 2 {
        eprintln!("usage: bytecode_dump <path>");
        return ExitCode::from(64);
    }

    let source = match fs::read_to_string(&args[1]) {
        Ok(source) => source,
        Err(err) => {
            eprintln!("bytecode_dump: could not read '{}': {err}", args[1]);
            return ExitCode::from(74);
        }
    };

    let mut heap = Heap::new(VmOptions::default().initial_gc_threshold);
    let func_id = match loxvm::compiler::compile(&source, &mut heap) {
        Ok(id) => id,
        Err(errors) => {
            for err in errors {
                eprintln!("{err}");
            }
            return ExitCode::from(65);
        }
    };

    dump_function(func_id, &heap);
    ExitCode::SUCCESS
}

fn dump_function(func_id: FuncId, heap: &Heap) {
    let function = heap.functions.get(func_id);
    let name = match function.name {
        Some(name_id) => heap.strings.get(name_id).as_str().to_string(),
        None => "<script>".to_string(),
    };
    disassemble_chunk(&function.chunk, &name, heap);

    for constant in &function.chunk.constants {
        if let Some(object) = constant.as_object() {
            if object.kind == ObjKind::Func {
                dump_function(object.index, heap);
            }
        }
    }
}
