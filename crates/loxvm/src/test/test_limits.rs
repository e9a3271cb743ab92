use super::Captured;
use crate::config::VmOptions;
use crate::error::InterpretError;

fn params(n: usize) -> String {
    (0..n).map(|i| format!("p{i}")).collect::<Vec<_>>().join(", ")
}

fn args(n: usize) -> String {
    (0..n).map(|i| i.to_string()).collect::<Vec<_>>().join(", ")
}

#[test]
fn two_hundred_fifty_five_parameters_compile() {
    let mut cap = Captured::new();
    let source = format!("fun f({}) {{ return p0; }}", params(255));
    let result = cap.vm.interpret(&source);
    assert!(result.is_ok());
}

#[test]
fn two_hundred_fifty_six_parameters_is_a_compile_error() {
    let mut cap = Captured::new();
    let source = format!("fun f({}) {{ return p0; }}", params(256));
    let result = cap.vm.interpret(&source);
    match result {
        Err(InterpretError::Compile(errors)) => {
            assert!(errors.iter().any(|e| e.message.contains("Can't have more than 255 parameters.")));
        }
        other => panic!("expected a compile error, got {other:?}"),
    }
}

#[test]
fn two_hundred_fifty_five_arguments_call_successfully() {
    let mut cap = Captured::new();
    let source = format!("fun f({}) {{ return p0; }}\nprint f({});", params(255), args(255));
    let result = cap.vm.interpret(&source);
    assert!(result.is_ok());
    assert_eq!(cap.output(), "0\n");
}

#[test]
fn two_hundred_fifty_six_arguments_is_a_compile_error() {
    let mut cap = Captured::new();
    let source = format!("fun f() {{}}\nf({});", args(256));
    let result = cap.vm.interpret(&source);
    match result {
        Err(InterpretError::Compile(errors)) => {
            assert!(errors.iter().any(|e| e.message.contains("Can't have more than 255 arguments.")));
        }
        other => panic!("expected a compile error, got {other:?}"),
    }
}

#[test]
fn loop_body_within_sixteen_bit_offset_compiles() {
    let mut cap = Captured::new();
    // A loop body just under the 16-bit backward-jump limit still compiles;
    // each `nil;` statement emits OpNil + OpPop (2 bytes).
    let body: String = "nil;\n".repeat(2000);
    let source = format!("while (false) {{\n{body}}}\nprint \"done\";");
    let result = cap.vm.interpret(&source);
    assert!(result.is_ok());
    assert_eq!(cap.output(), "done\n");
}

#[test]
fn exceeding_the_frame_limit_is_a_stack_overflow_runtime_error() {
    let options = VmOptions { frame_capacity: 4, ..VmOptions::default() };
    let mut cap = Captured::with_options(options);
    let result = cap.vm.interpret(
        r#"
        fun recurse(n) {
            return recurse(n + 1);
        }
        recurse(0);
        "#,
    );
    match result {
        Err(InterpretError::Runtime(err)) => {
            assert_eq!(err.message, "Stack overflow.");
        }
        other => panic!("expected a stack overflow runtime error, got {other:?}"),
    }
}

#[test]
fn exceeding_the_constant_pool_limit_is_a_compile_error() {
    let mut cap = Captured::new();
    let source: String = (0..257).map(|i| format!("print {i};\n")).collect();
    let result = cap.vm.interpret(&source);
    match result {
        Err(InterpretError::Compile(errors)) => {
            assert!(errors.iter().any(|e| e.message.contains("Too many constants in one chunk.")));
        }
        other => panic!("expected a compile error, got {other:?}"),
    }
}

#[test]
fn two_hundred_fifty_six_constants_fit_in_one_chunk() {
    let mut cap = Captured::new();
    let source: String = (0..256).map(|i| format!("print {i};\n")).collect();
    let result = cap.vm.interpret(&source);
    assert!(result.is_ok());
}
