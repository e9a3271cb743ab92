use super::Captured;

#[test]
fn init_and_method_call() {
    let mut cap = Captured::new();
    let result = cap.vm.interpret(
        r#"
        class Counter {
            init(start) {
                this.value = start;
            }

            increment() {
                this.value = this.value + 1;
                return this.value;
            }
        }

        var c = Counter(10);
        print c.increment();
        print c.increment();
        "#,
    );
    assert!(result.is_ok());
    assert_eq!(cap.output(), "11\n12\n");
}

#[test]
fn inheritance_and_super() {
    let mut cap = Captured::new();
    let result = cap.vm.interpret(
        r#"
        class Animal {
            speak() {
                print "...";
            }

            describe() {
                this.speak();
            }
        }

        class Dog < Animal {
            speak() {
                super.speak();
                print "Woof!";
            }
        }

        var d = Dog();
        d.describe();
        "#,
    );
    assert!(result.is_ok());
    assert_eq!(cap.output(), "...\nWoof!\n");
}

#[test]
fn subclass_without_its_own_init_inherits_the_superclass_initializer() {
    let mut cap = Captured::new();
    let result = cap.vm.interpret(
        r#"
        class Point {
            init(x, y) {
                this.x = x;
                this.y = y;
            }
        }

        class Point3D < Point {}

        var p = Point3D(1, 2);
        print p.x;
        print p.y;
        "#,
    );
    assert!(result.is_ok());
    assert_eq!(cap.output(), "1\n2\n");
}

#[test]
fn subclass_without_its_own_init_runs_the_superclass_zero_arg_initializer() {
    let mut cap = Captured::new();
    let result = cap.vm.interpret(
        r#"
        class Base {
            init() {
                this.ready = true;
            }
        }

        class Derived < Base {}

        var d = Derived();
        print d.ready;
        "#,
    );
    assert!(result.is_ok());
    assert_eq!(cap.output(), "true\n");
}

#[test]
fn methods_are_bound_when_stored() {
    let mut cap = Captured::new();
    let result = cap.vm.interpret(
        r#"
        class Greeter {
            init(name) {
                this.name = name;
            }

            greet() {
                print "Hello, " + this.name + "!";
            }
        }

        var greeter = Greeter("Ada");
        var bound = greeter.greet;
        bound();
        "#,
    );
    assert!(result.is_ok());
    assert_eq!(cap.output(), "Hello, Ada!\n");
}

#[test]
fn init_with_no_args_requires_zero_argument_call() {
    let mut cap = Captured::new();
    let result = cap.vm.interpret(
        r#"
        class Empty {
            init() {}
        }

        Empty(1);
        "#,
    );
    assert!(matches!(result, Err(crate::error::InterpretError::Runtime(_))));
}

#[test]
fn undefined_property_is_a_runtime_error() {
    let mut cap = Captured::new();
    let result = cap.vm.interpret(
        r#"
        class Box {}
        var b = Box();
        print b.missing;
        "#,
    );
    assert!(matches!(result, Err(crate::error::InterpretError::Runtime(_))));
}
