use super::Captured;

#[test]
fn arithmetic_precedence() {
    let mut cap = Captured::new();
    let result = cap.vm.interpret("print 1 + 2 * 3;");
    assert!(result.is_ok());
    assert_eq!(cap.output(), "7\n");
}

#[test]
fn grouping_overrides_precedence() {
    let mut cap = Captured::new();
    let result = cap.vm.interpret("print (1 + 2) * 3;");
    assert!(result.is_ok());
    assert_eq!(cap.output(), "9\n");
}

#[test]
fn string_concatenation() {
    let mut cap = Captured::new();
    let result = cap.vm.interpret(r#"print "foo" + "bar";"#);
    assert!(result.is_ok());
    assert_eq!(cap.output(), "foobar\n");
}

#[test]
fn falsey_values() {
    let mut cap = Captured::new();
    let result = cap.vm.interpret(
        r#"
        print !nil;
        print !false;
        print !0;
        print !"";
        "#,
    );
    assert!(result.is_ok());
    assert_eq!(cap.output(), "true\ntrue\nfalse\nfalse\n");
}

#[test]
fn globals_and_locals() {
    let mut cap = Captured::new();
    let result = cap.vm.interpret(
        r#"
        var a = 1;
        {
            var a = 2;
            print a;
        }
        print a;
        "#,
    );
    assert!(result.is_ok());
    assert_eq!(cap.output(), "2\n1\n");
}

#[test]
fn control_flow() {
    let mut cap = Captured::new();
    let result = cap.vm.interpret(
        r#"
        var total = 0;
        for (var i = 0; i < 5; i = i + 1) {
            if (i == 2) {
                total = total + 10;
            } else {
                total = total + 1;
            }
        }
        print total;
        "#,
    );
    assert!(result.is_ok());
    assert_eq!(cap.output(), "14\n");
}
