use super::Captured;
use crate::error::InterpretError;

#[test]
fn calling_a_non_callable_is_a_runtime_error_with_traceback() {
    let mut cap = Captured::new();
    let result = cap.vm.interpret("var a; a();");
    match result {
        Err(InterpretError::Runtime(err)) => {
            assert_eq!(err.message, "Can only call functions and classes.");
            assert_eq!(err.trace.len(), 1);
        }
        other => panic!("expected a runtime error, got {other:?}"),
    }
}

#[test]
fn adding_incompatible_types_is_a_runtime_error() {
    let mut cap = Captured::new();
    let result = cap.vm.interpret(r#"print 1 + "two";"#);
    assert!(matches!(result, Err(InterpretError::Runtime(_))));
}

#[test]
fn reading_an_undefined_global_is_a_runtime_error() {
    let mut cap = Captured::new();
    let result = cap.vm.interpret("print nope;");
    match result {
        Err(InterpretError::Runtime(err)) => {
            assert_eq!(err.message, "Undefined variable 'nope'.");
        }
        other => panic!("expected a runtime error, got {other:?}"),
    }
}

#[test]
fn assigning_an_undefined_global_is_a_runtime_error() {
    let mut cap = Captured::new();
    let result = cap.vm.interpret("nope = 1;");
    assert!(matches!(result, Err(InterpretError::Runtime(_))));
}

#[test]
fn compile_errors_accumulate_and_report_every_one() {
    let mut cap = Captured::new();
    let result = cap.vm.interpret("print 1 +;\nvar = 2;");
    match result {
        Err(InterpretError::Compile(errors)) => {
            assert!(errors.len() >= 2);
        }
        other => panic!("expected a compile error, got {other:?}"),
    }
}

#[test]
fn invalid_assignment_target_is_a_compile_error() {
    let mut cap = Captured::new();
    let result = cap.vm.interpret("var a; var b; a + b = 1;");
    assert!(matches!(result, Err(InterpretError::Compile(_))));
}

#[test]
fn a_failed_script_does_not_poison_the_next_interpret_call() {
    let mut cap = Captured::new();
    assert!(cap.vm.interpret("1 + nil;").is_err());
    let result = cap.vm.interpret("print 1 + 1;");
    assert!(result.is_ok());
    assert_eq!(cap.output(), "2\n");
}
