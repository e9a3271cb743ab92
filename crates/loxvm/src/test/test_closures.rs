use super::Captured;

#[test]
fn closure_captures_and_mutates_upvalue() {
    let mut cap = Captured::new();
    let result = cap.vm.interpret(
        r#"
        fun makeCounter() {
            var count = 0;
            fun increment() {
                count = count + 1;
                return count;
            }
            return increment;
        }

        var counter = makeCounter();
        print counter();
        print counter();
        print counter();
        "#,
    );
    assert!(result.is_ok());
    assert_eq!(cap.output(), "1\n2\n3\n");
}

#[test]
fn independent_closures_do_not_share_state() {
    let mut cap = Captured::new();
    let result = cap.vm.interpret(
        r#"
        fun makeCounter() {
            var count = 0;
            fun increment() {
                count = count + 1;
                return count;
            }
            return increment;
        }

        var a = makeCounter();
        var b = makeCounter();
        a();
        a();
        print a();
        print b();
        "#,
    );
    assert!(result.is_ok());
    assert_eq!(cap.output(), "3\n1\n");
}

#[test]
fn closed_upvalue_survives_enclosing_return() {
    let mut cap = Captured::new();
    let result = cap.vm.interpret(
        r#"
        var global;

        fun outer() {
            var x = "captured";
            fun inner() {
                print x;
            }
            global = inner;
        }

        outer();
        global();
        "#,
    );
    assert!(result.is_ok());
    assert_eq!(cap.output(), "captured\n");
}
