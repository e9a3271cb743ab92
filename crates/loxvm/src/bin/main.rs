use loxvm::{InterpretError, Vm};
use std::env;
use std::fs;
use std::io::{self, BufRead, Write};
use std::process::ExitCode;

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

fn print_usage() {
    eprintln!("usage: lox [path]");
}

fn main() -> ExitCode {
    let args: Vec<String> = env::args().collect();
    match args.len() {
        1 => {
            run_repl();
            ExitCode::SUCCESS
        }
        2 => run_file(&args[1]),
        _ => {
            print_usage();
            ExitCode::from(64)
        }
    }
}

fn run_repl() {
    let mut vm = Vm::default();
    let stdin = io::stdin();
    let mut stdout = io::stdout();
    loop {
        print!("> ");
        let _ = stdout.flush();
        let mut line = String::new();
        match stdin.lock().read_line(&mut line) {
            Ok(0) => {
                println!();
                break;
            }
            Ok(_) => {
                if let Err(err) = vm.interpret(&line) {
                    eprintln!("{err}");
                }
            }
            Err(err) => {
                eprintln!("lox: {err}");
                break;
            }
        }
    }
}

fn run_file(path: &str) -> ExitCode {
    let source = match fs::read_to_string(path) {
        Ok(source) => source,
        Err(err) => {
            eprintln!("lox: could not read '{path}': {err}");
            return ExitCode::from(74);
        }
    };

    let mut vm = Vm::default();
    match vm.interpret(&source) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err @ InterpretError::Compile(_)) => {
            eprintln!("{err}");
            ExitCode::from(65)
        }
        Err(err @ InterpretError::Runtime(_)) => {
            eprintln!("{err}");
            ExitCode::from(70)
        }
    }
}
