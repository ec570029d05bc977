//! Renders a parsed program back to Lamscript source.
//!
//! Groupings keep their parentheses and nothing else is added, so the output
//! re-parses to a structurally equal tree.

use crate::ast::{Expr, ExprKind, FunctionDecl, LiteralValue, Stmt};
use crate::stack::ensure_sufficient_stack;

const INDENT: &str = "    ";

pub struct AstPrinter;

impl AstPrinter {
    /// One statement per line, nested blocks indented.
    pub fn print(&self, statements: &[Stmt]) -> String {
        statements
            .iter()
            .map(|stmt| self.stmt(stmt, 0))
            .collect::<Vec<String>>()
            .join("\n")
    }

    pub fn expr(&self, expr: &Expr) -> String {
        ensure_sufficient_stack(|| self.render_expr(expr))
    }

    fn render_expr(&self, expr: &Expr) -> String {
        match &expr.kind {
            ExprKind::Literal(literal) => literal_source(literal),

            ExprKind::Grouping(inner) => format!("({})", self.expr(inner)),

            ExprKind::Unary { operator, right } => {
                format!("{}{}", operator.lexeme, self.expr(right))
            }

            ExprKind::Binary {
                left,
                operator,
                right,
            }
            | ExprKind::Logical {
                left,
                operator,
                right,
            } => format!(
                "{} {} {}",
                self.expr(left),
                operator.lexeme,
                self.expr(right)
            ),

            ExprKind::Variable(name) => name.lexeme.clone(),

            ExprKind::Assign { name, value } => format!("{} = {}", name.lexeme, self.expr(value)),

            ExprKind::Call {
                callee, arguments, ..
            } => {
                let args: Vec<String> = arguments.iter().map(|arg| self.expr(arg)).collect();
                format!("{}({})", self.expr(callee), args.join(", "))
            }

            ExprKind::Lambda(declaration) => format!("fun {}", self.function(declaration, 0)),

            ExprKind::Get { object, name } => format!("{}.{}", self.expr(object), name.lexeme),

            ExprKind::Set {
                object,
                name,
                value,
            } => format!(
                "{}.{} = {}",
                self.expr(object),
                name.lexeme,
                self.expr(value)
            ),

            ExprKind::This(_) => "this".to_string(),

            ExprKind::Super { method, .. } => format!("super.{}", method.lexeme),
        }
    }

    fn stmt(&self, stmt: &Stmt, depth: usize) -> String {
        ensure_sufficient_stack(|| self.render_stmt(stmt, depth))
    }

    /// Statement text without leading indentation; continuation lines are
    /// indented to `depth`.
    fn render_stmt(&self, stmt: &Stmt, depth: usize) -> String {
        match stmt {
            Stmt::Expression(expr) => format!("{};", self.expr(expr)),

            Stmt::Print { value, .. } => format!("print {};", self.expr(value)),

            Stmt::Var {
                name,
                initializer: Some(init),
            } => format!("var {} = {};", name.lexeme, self.expr(init)),

            Stmt::Var {
                name,
                initializer: None,
            } => format!("var {};", name.lexeme),

            Stmt::Block(statements) => self.block(statements, depth),

            Stmt::If {
                condition,
                then_branch,
                else_branch,
            } => {
                let mut out: String = format!(
                    "if ({}) {}",
                    self.expr(condition),
                    self.stmt(then_branch, depth)
                );

                if let Some(else_branch) = else_branch {
                    out.push_str(" else ");
                    out.push_str(&self.stmt(else_branch, depth));
                }

                out
            }

            Stmt::While { condition, body } => {
                format!("while ({}) {}", self.expr(condition), self.stmt(body, depth))
            }

            Stmt::Function(declaration) => format!("fun {}", self.function(declaration, depth)),

            Stmt::Return { value: Some(v), .. } => format!("return {};", self.expr(v)),

            Stmt::Return { value: None, .. } => "return;".to_string(),

            Stmt::Class {
                name,
                superclass,
                methods,
            } => {
                let mut out: String = format!("class {}", name.lexeme);

                if let Some(superclass) = superclass {
                    out.push_str(&format!(" < {}", self.expr(superclass)));
                }

                if methods.is_empty() {
                    out.push_str(" {}");
                    return out;
                }

                out.push_str(" {\n");
                for method in methods {
                    out.push_str(&INDENT.repeat(depth + 1));
                    out.push_str(&self.function(method, depth + 1));
                    out.push('\n');
                }
                out.push_str(&INDENT.repeat(depth));
                out.push('}');

                out
            }
        }
    }

    fn block(&self, statements: &[Stmt], depth: usize) -> String {
        if statements.is_empty() {
            return "{}".to_string();
        }

        let mut out: String = String::from("{\n");

        for stmt in statements {
            out.push_str(&INDENT.repeat(depth + 1));
            out.push_str(&self.stmt(stmt, depth + 1));
            out.push('\n');
        }

        out.push_str(&INDENT.repeat(depth));
        out.push('}');

        out
    }

    /// `name(params) { body }`; lambdas have no name.
    fn function(&self, declaration: &FunctionDecl, depth: usize) -> String {
        let params: Vec<&str> = declaration
            .params
            .iter()
            .map(|p| p.lexeme.as_str())
            .collect();

        let name: &str = match declaration.name.token_type {
            crate::token::TokenType::FUN => "",
            _ => declaration.name.lexeme.as_str(),
        };

        format!(
            "{}({}) {}",
            name,
            params.join(", "),
            self.block(&declaration.body, depth)
        )
    }
}

fn literal_source(literal: &LiteralValue) -> String {
    match literal {
        LiteralValue::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => {
            format!("{}", *n as i64)
        }
        LiteralValue::Number(n) => format!("{}", n),
        LiteralValue::Str(s) => format!("\"{}\"", s),
        LiteralValue::True => "true".to_string(),
        LiteralValue::False => "false".to_string(),
        LiteralValue::Nil => "nil".to_string(),
    }
}
