use super::Captured;

#[test]
fn content_equal_strings_compare_equal() {
    let mut cap = Captured::new();
    let result = cap.vm.interpret(
        r#"
        var a = "foo" + "bar";
        var b = "foobar";
        print a == b;
        "#,
    );
    assert!(result.is_ok());
    assert_eq!(cap.output(), "true\n");
}

#[test]
fn distinct_strings_compare_unequal() {
    let mut cap = Captured::new();
    let result = cap.vm.interpret(r#"print "foo" == "bar";"#);
    assert!(result.is_ok());
    assert_eq!(cap.output(), "false\n");
}

#[test]
fn whole_number_doubles_print_without_trailing_zero() {
    let mut cap = Captured::new();
    let result = cap.vm.interpret("print 10 / 2;");
    assert!(result.is_ok());
    assert_eq!(cap.output(), "5\n");
}

#[test]
fn fractional_doubles_print_with_decimals() {
    let mut cap = Captured::new();
    let result = cap.vm.interpret("print 1 / 4;");
    assert!(result.is_ok());
    assert_eq!(cap.output(), "0.25\n");
}
