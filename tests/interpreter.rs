#[cfg(test)]
mod interpreter_tests {
    use std::cell::RefCell;
    use std::io::{self, Write};
    use std::rc::Rc;

    use pretty_assertions::assert_eq;

    use lamscript::error::{LamError, RuntimeErrorKind};
    use lamscript::session::{RunError, Session};

    /// In-memory `print` target shared with the test.
    #[derive(Clone, Default)]
    struct Captured(Rc<RefCell<Vec<u8>>>);

    impl Write for Captured {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.borrow_mut().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl Captured {
        fn text(&self) -> String {
            String::from_utf8_lossy(&self.0.borrow()).into_owned()
        }
    }

    fn session() -> (Session, Captured) {
        let out = Captured::default();
        (Session::with_output(Box::new(out.clone())), out)
    }

    /// Runs `source` and returns everything it printed.
    fn output_of(source: &str) -> String {
        let (mut session, out) = session();

        if let Err(e) = session.run(source) {
            panic!("program failed: {:?}\noutput so far:\n{}", e, out.text());
        }

        out.text()
    }

    /// Runs `source`, expecting a runtime error; returns it with the output.
    fn runtime_error_of(source: &str) -> (RuntimeErrorKind, usize, String) {
        let (mut session, out) = session();

        match session.run(source) {
            Err(RunError::Runtime(LamError::Runtime(e))) => (e.kind, e.token.line, out.text()),
            other => panic!("expected runtime error, got {:?}", other),
        }
    }

    #[test]
    fn precedence() {
        assert_eq!(output_of("print 1 + 2 * 3;"), "7\n");
        assert_eq!(output_of("print (1 + 2) * 3;"), "9\n");
        assert_eq!(output_of("print -2 * -(1 + 1) - 10 / 4;"), "1.5\n");
    }

    #[test]
    fn short_circuit_skips_the_right_operand() {
        assert_eq!(output_of("print false and (1/0);"), "false\n");
        assert_eq!(output_of("print true or (1/0);"), "true\n");
        assert_eq!(output_of("print nil or \"default\";"), "default\n");
        assert_eq!(output_of("print 1 and 2;"), "2\n");
    }

    #[test]
    fn division_by_zero_is_a_runtime_error() {
        let (kind, line, _) = runtime_error_of("var a = 1;\nprint a / 0;");

        assert_eq!(kind, RuntimeErrorKind::DivisionByZero);
        assert_eq!(line, 2);
    }

    #[test]
    fn truthiness_and_equality() {
        let source = r#"
            if (0) print "zero is truthy";
            if ("") print "empty string is truthy";
            if (nil) print "unreachable"; else print "nil is falsy";
            print !nil;
            print nil == nil;
            print nil == false;
            print 1 == "1";
            print "a" == "a";
            print 2 != 3;
        "#;

        assert_eq!(
            output_of(source),
            "zero is truthy\nempty string is truthy\nnil is falsy\ntrue\ntrue\nfalse\nfalse\ntrue\ntrue\n"
        );
    }

    #[test]
    fn string_concatenation_and_mixed_operands() {
        assert_eq!(output_of("print \"foo\" + \"bar\";"), "foobar\n");

        let (kind, _, _) = runtime_error_of("print \"n = \" + 1;");
        assert_eq!(kind, RuntimeErrorKind::OperandsMustBeNumbersOrStrings);

        let (kind, _, _) = runtime_error_of("print -\"x\";");
        assert_eq!(kind, RuntimeErrorKind::OperandMustBeNumber);

        let (kind, _, _) = runtime_error_of("print 1 < \"2\";");
        assert_eq!(kind, RuntimeErrorKind::OperandsMustBeNumbers);
    }

    #[test]
    fn number_formatting() {
        assert_eq!(output_of("print 7; print 2.5; print 10 / 4; print -3;"), "7\n2.5\n2.5\n-3\n");
    }

    #[test]
    fn large_and_non_finite_numbers() {
        let source = r#"
            print 1000000 * 1000000 * 1000;
            var big = 1000000 * 1000000 * 1000000 * 1000;
            print big;
            var huge = big;
            for (var i = 0; i < 20; i = i + 1) huge = huge * big;
            print huge;
            print -huge;
            print huge - huge;
        "#;

        assert_eq!(
            output_of(source),
            "1000000000000000\n1000000000000000000000\nInfinity\n-Infinity\nNaN\n"
        );
    }

    #[test]
    fn shadowing_in_blocks() {
        assert_eq!(
            output_of("var x = 1; { var x = 2; print x; } print x;"),
            "2\n1\n"
        );
    }

    #[test]
    fn assignment_reaches_enclosing_scope() {
        assert_eq!(
            output_of("var x = 1; { x = 2; { x = x + 1; } } print x; print x = 5;"),
            "3\n5\n"
        );
    }

    #[test]
    fn closures_share_one_binding() {
        let source = r#"
            fun makeCounter() {
                var count = 0;
                return fun () {
                    count = count + 1;
                    return count;
                };
            }
            var counter = makeCounter();
            print counter();
            print counter();
            var other = makeCounter();
            print other();
        "#;

        assert_eq!(output_of(source), "1\n2\n1\n");
    }

    #[test]
    fn two_closures_over_the_same_frame() {
        let source = r#"
            var get;
            var set;
            {
                var shared = "before";
                get = fun () { return shared; };
                set = fun (v) { shared = v; };
            }
            set("after");
            print get();
        "#;

        assert_eq!(output_of(source), "after\n");
    }

    #[test]
    fn closures_bind_at_definition_not_call() {
        let source = r#"
            var a = "global";
            {
                fun showA() { print a; }
                showA();
                var a = "block";
                showA();
                print a;
            }
        "#;

        assert_eq!(output_of(source), "global\nglobal\nblock\n");
    }

    #[test]
    fn recursion_through_own_name() {
        let source = r#"
            fun fib(n) {
                if (n < 2) return n;
                return fib(n - 1) + fib(n - 2);
            }
            print fib(15);

            fun fact(n) { if (n <= 1) return 1; return n * fact(n - 1); }
            print fact(5);
        "#;

        assert_eq!(output_of(source), "610\n120\n");
    }

    #[test]
    fn return_unwinds_out_of_loops_and_blocks() {
        let source = r#"
            fun firstOver(limit) {
                var i = 0;
                while (true) {
                    {
                        if (i > limit) return i;
                    }
                    i = i + 1;
                }
            }
            print firstOver(3);

            fun nothing() { return; }
            print nothing();

            fun noReturn() { var x = 1; }
            print noReturn();
        "#;

        assert_eq!(output_of(source), "4\nnil\nnil\n");
    }

    #[test]
    fn deep_recursion_completes() {
        let source = r#"
            fun depth(n) {
                if (n > 0) return depth(n - 1) + 1;
                return 0;
            }
            print depth(2000);
        "#;

        assert_eq!(output_of(source), "2000\n");
    }

    #[test]
    fn unbounded_recursion_is_a_runtime_error() {
        let (kind, line, _) = runtime_error_of("fun f() {\n    f();\n}\nf();");

        assert_eq!(kind, RuntimeErrorKind::StackOverflow);
        assert_eq!(line, 2);
    }

    #[test]
    fn session_recovers_after_stack_overflow() {
        let (mut session, out) = session();

        let failed = session.run("fun forever(n) { return forever(n + 1); } forever(0);");
        assert!(matches!(
            failed,
            Err(RunError::Runtime(LamError::Runtime(ref e))) if e.kind == RuntimeErrorKind::StackOverflow
        ));

        assert!(session
            .run("fun count(n) { if (n == 0) return 0; return count(n - 1) + 1; } print count(100);")
            .is_ok());
        assert_eq!(out.text(), "100\n");
    }

    #[test]
    fn for_loops() {
        let source = r#"
            var sum = 0;
            for (var i = 1; i <= 4; i = i + 1) sum = sum + i;
            print sum;

            var fns = nil;
            for (var j = 0; j < 1; j = j + 1) { fns = fun () { return j; }; }
            print fns();
        "#;

        assert_eq!(output_of(source), "10\n1\n");
    }

    #[test]
    fn callables_print_their_kind() {
        let source = r#"
            fun named() {}
            class Point {}
            print named;
            print fun () {};
            print Point;
            print Point();
            print clock;
        "#;

        assert_eq!(
            output_of(source),
            "<fn named>\n<lambda>\nPoint\nPoint instance\n<native fn clock>\n"
        );
    }

    #[test]
    fn clock_returns_a_number() {
        assert_eq!(output_of("print clock() > 0;"), "true\n");
    }

    #[test]
    fn fields_methods_and_this() {
        let source = r#"
            class Counter {
                init(start) { this.value = start; }
                bump() { this.value = this.value + 1; return this; }
            }
            var c = Counter(10);
            c.bump().bump();
            print c.value;

            var bump = c.bump;
            bump();
            print c.value;

            c.label = "dynamic";
            print c.label;
        "#;

        assert_eq!(output_of(source), "12\n13\ndynamic\n");
    }

    #[test]
    fn initializer_always_yields_the_instance() {
        let source = r#"
            class Thing {
                init() { this.ready = true; return; }
            }
            var t = Thing();
            print t.init() == t;
            print t.ready;
        "#;

        assert_eq!(output_of(source), "true\ntrue\n");
    }

    #[test]
    fn fields_shadow_methods() {
        let source = r#"
            class A { name() { return "method"; } }
            var a = A();
            print a.name();
            a.name = fun () { return "field"; };
            print a.name();
        "#;

        assert_eq!(output_of(source), "method\nfield\n");
    }

    #[test]
    fn super_calls_the_superclass_method_on_this_instance() {
        let source = r#"
            class Animal {
                init(name) { this.name = name; }
                describe() { return this.name + " the animal"; }
            }
            class Dog < Animal {
                describe() { return super.describe() + " (a dog)"; }
            }
            class Puppy < Dog {
                describe() { return "little " + super.describe(); }
            }
            print Dog("Rex").describe();
            print Puppy("Bit").describe();
        "#;

        assert_eq!(
            output_of(source),
            "Rex the animal (a dog)\nlittle Bit the animal (a dog)\n"
        );
    }

    #[test]
    fn inherited_methods_and_initializer() {
        let source = r#"
            class Base {
                init(x) { this.x = x; }
                twice() { return this.x * 2; }
            }
            class Derived < Base {}
            print Derived(21).twice();
        "#;

        assert_eq!(output_of(source), "42\n");
    }

    #[test]
    fn undefined_variable_reports_its_line() {
        let (kind, line, _) = runtime_error_of("var a = 1;\n\nundefinedName = 2;");

        assert_eq!(kind, RuntimeErrorKind::UndefinedVariable("undefinedName".into()));
        assert_eq!(line, 3);

        let (kind, line, _) = runtime_error_of("print 1;\nprint missing;");
        assert_eq!(kind, RuntimeErrorKind::UndefinedVariable("missing".into()));
        assert_eq!(line, 2);
    }

    #[test]
    fn runtime_error_stops_the_program() {
        let (_, _, output) = runtime_error_of("print \"before\";\nnil();\nprint \"after\";");

        assert_eq!(output, "before\n");
    }

    #[test]
    fn calling_a_non_callable() {
        let (kind, _, _) = runtime_error_of("\"text\"();");
        assert_eq!(kind, RuntimeErrorKind::NotCallable);

        let (kind, _, _) = runtime_error_of("class A {} A()();");
        assert_eq!(kind, RuntimeErrorKind::NotCallable);
    }

    #[test]
    fn arity_must_match() {
        let (kind, _, _) = runtime_error_of("fun f(a, b) {} f(1);");
        assert_eq!(kind, RuntimeErrorKind::ArityMismatch { expected: 2, got: 1 });

        let (kind, _, _) = runtime_error_of("class P { init(x) {} } P();");
        assert_eq!(kind, RuntimeErrorKind::ArityMismatch { expected: 1, got: 0 });

        let (kind, _, _) = runtime_error_of("clock(1);");
        assert_eq!(kind, RuntimeErrorKind::ArityMismatch { expected: 0, got: 1 });
    }

    #[test]
    fn property_errors() {
        let (kind, _, _) = runtime_error_of("class A {} print A().missing;");
        assert_eq!(kind, RuntimeErrorKind::UndefinedProperty("missing".into()));

        let (kind, _, _) = runtime_error_of("var n = 3; print n.field;");
        assert_eq!(kind, RuntimeErrorKind::NotAnInstance);

        let (kind, _, _) = runtime_error_of("var n = 3; n.field = 1;");
        assert_eq!(kind, RuntimeErrorKind::NotAnInstance);
    }

    #[test]
    fn superclass_must_be_a_class() {
        let (kind, line, _) = runtime_error_of("var NotAClass = \"nope\";\nclass A < NotAClass {}");

        assert_eq!(kind, RuntimeErrorKind::InvalidSuperclass);
        assert_eq!(line, 2);
    }

    #[test]
    fn session_keeps_globals_and_recovers_scope_after_errors() {
        let (mut session, out) = session();

        assert!(session.run("var a = \"outer\";").is_ok());

        let failed = session.run("{ var a = \"inner\"; a(); }");
        assert!(matches!(failed, Err(RunError::Runtime(_))));

        assert!(session.run("print a;").is_ok());
        assert!(session.run("fun f() { return a; } print f();").is_ok());

        assert_eq!(out.text(), "outer\nouter\n");
    }

    /// Rejects every write.
    struct ClosedOutput;

    impl Write for ClosedOutput {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "output closed"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn write_failure_reports_the_print_line() {
        let mut session = Session::with_output(Box::new(ClosedOutput));

        match session.run("var a = 1;\n\nprint 1;") {
            Err(RunError::Runtime(LamError::Runtime(e))) => {
                assert!(matches!(e.kind, RuntimeErrorKind::Output(_)), "got {:?}", e.kind);
                assert_eq!(e.token.line, 3);
            }
            other => panic!("expected output error, got {:?}", other),
        }
    }

    #[test]
    fn static_errors_prevent_execution() {
        let (mut session, out) = session();

        let result = session.run("print \"should not print\";\nvar = 1;");
        assert!(matches!(&result, Err(RunError::Static(errors)) if errors.len() == 1));
        assert_eq!(result.map_err(|e| e.exit_code()), Err(65));

        let result = session.run("print \"nor this\";\nreturn 1;");
        assert!(matches!(result, Err(RunError::Static(_))));

        assert_eq!(out.text(), "");
    }
}
