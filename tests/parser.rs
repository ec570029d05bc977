#[cfg(test)]
mod parser_tests {
    use std::collections::HashSet;

    use pretty_assertions::assert_eq;

    use lamscript::ast::{Expr, ExprKind, LiteralValue, Stmt};
    use lamscript::ast_printer::AstPrinter;
    use lamscript::error::LamError;
    use lamscript::parser::{Parsed, Parser};
    use lamscript::scanner::scan;
    use lamscript::token::TokenType;

    fn parse(source: &str) -> Parsed {
        let (tokens, errors) = scan(source);
        assert!(errors.is_empty(), "lex errors: {:?}", errors);
        Parser::new(tokens).parse()
    }

    fn parse_ok(source: &str) -> Vec<Stmt> {
        match parse(source).into_result() {
            Ok(statements) => statements,
            Err(errors) => panic!("parse errors for {:?}: {:?}", source, errors),
        }
    }

    fn single_expr(source: &str) -> Expr {
        match parse_ok(source).remove(0) {
            Stmt::Expression(expr) => expr,
            other => panic!("expected expression statement, got {:?}", other),
        }
    }

    fn number(expr: &Expr) -> f64 {
        match &expr.kind {
            ExprKind::Literal(LiteralValue::Number(n)) => *n,
            other => panic!("expected number literal, got {:?}", other),
        }
    }

    #[test]
    fn factor_binds_tighter_than_term() {
        let expr = single_expr("1 + 2 * 3;");

        let ExprKind::Binary {
            left,
            operator,
            right,
        } = &expr.kind
        else {
            panic!("expected binary, got {:?}", expr);
        };

        assert_eq!(operator.token_type, TokenType::PLUS);
        assert_eq!(number(left), 1.0);

        let ExprKind::Binary { operator, .. } = &right.kind else {
            panic!("expected nested binary, got {:?}", right);
        };
        assert_eq!(operator.token_type, TokenType::STAR);
    }

    #[test]
    fn binary_operators_are_left_associative() {
        let expr = single_expr("8 - 4 - 2;");

        let ExprKind::Binary { left, right, .. } = &expr.kind else {
            panic!("expected binary");
        };

        assert!(matches!(left.kind, ExprKind::Binary { .. }));
        assert_eq!(number(right), 2.0);
    }

    #[test]
    fn assignment_is_right_associative() {
        let expr = single_expr("a = b = 3;");

        let ExprKind::Assign { name, value } = &expr.kind else {
            panic!("expected assign");
        };

        assert_eq!(name.lexeme, "a");
        assert!(matches!(&value.kind, ExprKind::Assign { name, .. } if name.lexeme == "b"));
    }

    #[test]
    fn property_assignment_becomes_set() {
        let expr = single_expr("a.b.c = 1;");

        let ExprKind::Set { object, name, .. } = &expr.kind else {
            panic!("expected set, got {:?}", expr);
        };

        assert_eq!(name.lexeme, "c");
        assert!(matches!(&object.kind, ExprKind::Get { name, .. } if name.lexeme == "b"));
    }

    #[test]
    fn invalid_assignment_target_is_reported_at_equals() {
        let parsed = parse("1 + 2 = 3;");

        assert_eq!(parsed.errors.len(), 1);
        assert!(matches!(
            &parsed.errors[0],
            LamError::Parse { message, location, line: 1 }
                if message == "Invalid assignment target." && location == " at '='"
        ));
    }

    #[test]
    fn dangling_else_binds_to_nearest_if() {
        let statements = parse_ok("if (a) if (b) print 1; else print 2;");

        let Stmt::If {
            then_branch,
            else_branch,
            ..
        } = &statements[0]
        else {
            panic!("expected if");
        };

        assert!(else_branch.is_none());
        assert!(matches!(
            then_branch.as_ref(),
            Stmt::If {
                else_branch: Some(_),
                ..
            }
        ));
    }

    #[test]
    fn for_loop_desugars_to_while() {
        let statements = parse_ok("for (var i = 0; i < 3; i = i + 1) print i;");

        let Stmt::Block(outer) = &statements[0] else {
            panic!("expected block, got {:?}", statements[0]);
        };

        assert!(matches!(&outer[0], Stmt::Var { name, .. } if name.lexeme == "i"));

        let Stmt::While { body, .. } = &outer[1] else {
            panic!("expected while");
        };

        let Stmt::Block(inner) = body.as_ref() else {
            panic!("expected loop body block");
        };

        assert!(matches!(inner[0], Stmt::Print { .. }));
        assert!(matches!(inner[1], Stmt::Expression(_)));
    }

    #[test]
    fn for_loop_without_condition_loops_on_true() {
        let statements = parse_ok("for (;;) print 1;");

        let Stmt::While { condition, .. } = &statements[0] else {
            panic!("expected bare while, got {:?}", statements[0]);
        };

        assert_eq!(condition.kind, ExprKind::Literal(LiteralValue::True));
    }

    #[test]
    fn lambda_in_expression_position() {
        let statements = parse_ok("var add = fun (a, b) { return a + b; };");

        let Stmt::Var {
            initializer: Some(init),
            ..
        } = &statements[0]
        else {
            panic!("expected var");
        };

        let ExprKind::Lambda(declaration) = &init.kind else {
            panic!("expected lambda");
        };

        assert_eq!(declaration.params.len(), 2);
        assert_eq!(declaration.body.len(), 1);
    }

    #[test]
    fn class_with_superclass_and_methods() {
        let statements = parse_ok("class B < A { init(x) { this.x = x; } get() { return super.get(); } }");

        let Stmt::Class {
            name,
            superclass,
            methods,
        } = &statements[0]
        else {
            panic!("expected class");
        };

        assert_eq!(name.lexeme, "B");
        assert!(matches!(
            superclass.as_ref().map(|e| &e.kind),
            Some(ExprKind::Variable(t)) if t.lexeme == "A"
        ));

        let names: Vec<&str> = methods.iter().map(|m| m.name.lexeme.as_str()).collect();
        assert_eq!(names, vec!["init", "get"]);
    }

    #[test]
    fn independent_errors_are_all_reported() {
        let parsed = parse("var = 1; print ;\nprint \"fine\";");

        assert_eq!(parsed.errors.len(), 2);
        assert_eq!(parsed.statements.len(), 1);
        assert!(matches!(
            &parsed.errors[1],
            LamError::Parse { message, location, .. }
                if message == "Expect expression." && location == " at ';'"
        ));
    }

    #[test]
    fn error_inside_block_does_not_lose_the_rest() {
        let parsed = parse("{ var x = ; print 1; }\nprint 2;");

        assert_eq!(parsed.errors.len(), 1);
        assert_eq!(parsed.statements.len(), 2);
    }

    #[test]
    fn missing_semicolon_at_eof_reports_at_end() {
        let parsed = parse("print 1");

        assert!(parsed.had_error());
        assert!(matches!(
            &parsed.errors[0],
            LamError::Parse { location, .. } if location == " at end"
        ));
    }

    #[test]
    fn too_many_arguments_is_an_error() {
        let args: Vec<String> = (0..256).map(|i| i.to_string()).collect();
        let parsed = parse(&format!("f({});", args.join(", ")));

        assert_eq!(parsed.errors.len(), 1);
        assert!(parsed.errors[0].to_string().contains("255 arguments"));
    }

    #[test]
    fn expression_ids_are_unique() {
        let statements = parse_ok("var a = 1; a = a + a; print a;");

        let mut ids = HashSet::new();
        let mut stack: Vec<&Expr> = Vec::new();

        for stmt in &statements {
            match stmt {
                Stmt::Var {
                    initializer: Some(e),
                    ..
                }
                | Stmt::Expression(e)
                | Stmt::Print { value: e, .. } => stack.push(e),
                _ => {}
            }
        }

        while let Some(expr) = stack.pop() {
            assert!(ids.insert(expr.id), "duplicate id {:?}", expr.id);

            match &expr.kind {
                ExprKind::Assign { value, .. } => stack.push(value),
                ExprKind::Binary { left, right, .. } => {
                    stack.push(left);
                    stack.push(right);
                }
                _ => {}
            }
        }

        assert_eq!(ids.len(), 6);
    }

    #[test]
    fn pretty_printed_program_reparses_to_the_same_tree() {
        let source = r#"
            var greeting = "hi";
            fun fib(n) {
                if (n < 2) return n;
                return fib(n - 1) + fib(n - 2);
            }
            class Animal {
                init(name) { this.name = name; }
                speak() { return this.name + " makes a sound"; }
            }
            class Dog < Animal {
                speak() { return super.speak() + "!"; }
            }
            var f = fun (x) { return -(x * 2.5) / 3; };
            for (var i = 0; i < 3; i = i + 1) {
                if (i == 1 and !false or nil) print i; else { print f(i); }
            }
            while (true) {}
            Dog("rex").name = greeting;
        "#;

        let original = parse_ok(source);
        let printed = AstPrinter.print(&original);
        let reparsed = parse_ok(&printed);

        assert_eq!(original, reparsed);
        assert_eq!(printed, AstPrinter.print(&reparsed));
    }

    #[test]
    fn deeply_nested_source_parses_and_prints() {
        let depth: usize = 1000;
        let source = format!(
            "print {}1{};\n{}print 2;{}",
            "(".repeat(depth),
            ")".repeat(depth),
            "{ ".repeat(depth),
            " }".repeat(depth)
        );

        let statements = parse_ok(&source);
        assert_eq!(statements.len(), 2);

        let printed = AstPrinter.print(&statements);
        assert_eq!(parse_ok(&printed), statements);
    }

    #[test]
    fn parse_expression_rejects_trailing_tokens() {
        let (tokens, _) = scan("1 + 2 3");

        assert!(Parser::new(tokens).parse_expression().is_err());
    }
}
